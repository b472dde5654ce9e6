/*!
    Decoded video frames.
*/

use crate::PixelFormat;

/**
    Round `row_bytes` up to a multiple of `align`. An alignment of 0 or 1 leaves it unchanged.
*/
pub const fn align_stride(row_bytes: usize, align: usize) -> usize {
    if align <= 1 {
        row_bytes
    } else {
        row_bytes.div_ceil(align) * align
    }
}

/**
    One color component of a frame, stored row-major with a stride.

    The stride may exceed the row width; the bytes past the row width are
    padding and carry no pixel data.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Plane {
    pub data: Vec<u8>,
    /// Distance in bytes between the starts of consecutive rows.
    pub stride: usize,
}

impl Plane {
    pub fn new(data: Vec<u8>, stride: usize) -> Self {
        Self { data, stride }
    }

    /**
        A zero-filled plane of `rows` rows.
    */
    pub fn zeroed(stride: usize, rows: usize) -> Self {
        Self {
            data: vec![0; stride * rows],
            stride,
        }
    }
}

/**
    A decoded video frame.

    Frames carry their planes by value. Whoever holds the frame owns its
    buffers; handing the frame back to the decoder via `recycle` lets the
    buffers be reused for the next decode.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoFrame {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Pixel format.
    pub format: PixelFormat,
    /// Plane buffers, `format.plane_count()` of them.
    pub planes: Vec<Plane>,
    /// Presentation timestamp, in the stream's time base.
    pub pts: Option<i64>,
    /// Position in the decoder's output, starting at 1. Zero until assigned.
    pub sequence: u64,
    pub is_keyframe: bool,
}

impl VideoFrame {
    /**
        Allocate a zero-filled frame with each plane's stride aligned to `align` bytes.
    */
    pub fn new_zeroed(width: u32, height: u32, format: PixelFormat, align: usize) -> Self {
        let planes = (0..format.plane_count())
            .map(|plane| {
                let (row_bytes, rows) = format.plane_size(plane, width, height);
                Plane::zeroed(align_stride(row_bytes, align), rows)
            })
            .collect();

        Self::from_planes(width, height, format, planes)
    }

    /**
        Build a frame from existing plane buffers.
    */
    pub fn from_planes(width: u32, height: u32, format: PixelFormat, planes: Vec<Plane>) -> Self {
        Self {
            width,
            height,
            format,
            planes,
            pts: None,
            sequence: 0,
            is_keyframe: false,
        }
    }

    /**
        Build a frame from tightly packed plane data, as found in raw video payloads.

        Returns `None` if `data` is not exactly `format.frame_size(width, height)` bytes.
    */
    pub fn from_packed(
        width: u32,
        height: u32,
        format: PixelFormat,
        data: &[u8],
        align: usize,
    ) -> Option<Self> {
        if data.len() != format.frame_size(width, height) {
            return None;
        }

        let mut frame = Self::new_zeroed(width, height, format, align);
        let mut offset = 0;
        for plane in 0..format.plane_count() {
            let (row_bytes, rows) = format.plane_size(plane, width, height);
            for y in 0..rows {
                frame
                    .row_mut(plane, y)
                    .copy_from_slice(&data[offset..offset + row_bytes]);
                offset += row_bytes;
            }
        }

        Some(frame)
    }

    pub fn with_pts(mut self, pts: Option<i64>) -> Self {
        self.pts = pts;
        self
    }

    pub fn with_keyframe(mut self, is_keyframe: bool) -> Self {
        self.is_keyframe = is_keyframe;
        self
    }

    pub fn plane(&self, index: usize) -> &Plane {
        &self.planes[index]
    }

    /**
        Visible bytes per row and row count of one plane.
    */
    pub fn plane_size(&self, plane: usize) -> (usize, usize) {
        self.format.plane_size(plane, self.width, self.height)
    }

    /**
        The visible bytes of row `y` in `plane`, excluding stride padding.
    */
    pub fn row(&self, plane: usize, y: usize) -> &[u8] {
        let (row_bytes, _) = self.plane_size(plane);
        let p = &self.planes[plane];
        let start = y * p.stride;
        &p.data[start..start + row_bytes]
    }

    pub fn row_mut(&mut self, plane: usize, y: usize) -> &mut [u8] {
        let (row_bytes, _) = self.plane_size(plane);
        let p = &mut self.planes[plane];
        let start = y * p.stride;
        &mut p.data[start..start + row_bytes]
    }

    /**
        Copy one plane's visible bytes, without stride padding.
    */
    pub fn packed_plane(&self, plane: usize) -> Vec<u8> {
        let (row_bytes, rows) = self.plane_size(plane);
        let mut output = Vec::with_capacity(row_bytes * rows);
        for y in 0..rows {
            output.extend_from_slice(self.row(plane, y));
        }
        output
    }

    /**
        Copy all planes' visible bytes into one contiguous buffer.
    */
    pub fn to_packed(&self) -> Vec<u8> {
        let mut output = Vec::with_capacity(self.format.frame_size(self.width, self.height));
        for plane in 0..self.planes.len() {
            output.extend(self.packed_plane(plane));
        }
        output
    }

    /**
        Returns true if every plane buffer is large enough for its stride and row count.
    */
    pub fn is_well_formed(&self) -> bool {
        self.planes.len() == self.format.plane_count()
            && self.planes.iter().enumerate().all(|(i, plane)| {
                let (row_bytes, rows) = self.plane_size(i);
                plane.stride >= row_bytes
                    && (rows == 0 || plane.data.len() >= plane.stride * (rows - 1) + row_bytes)
            })
    }

    /**
        Give up the plane buffers for reuse.
    */
    pub fn into_planes(self) -> Vec<Plane> {
        self.planes
    }
}
