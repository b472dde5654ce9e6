/*!
    Reusable frame buffers.
*/

use media_types::{Plane, PixelFormat, VideoFrame, align_stride};

/**
    Plane buffers returned by the consumer, kept for the next decoded frame.

    The pool is local to one decoder, so no locking is needed.
*/
#[derive(Debug, Default)]
pub struct FramePool {
    free: Vec<Vec<Plane>>,
    capacity: usize,
    reused: u64,
}

impl FramePool {
    pub fn new(capacity: usize) -> Self {
        Self {
            free: Vec::with_capacity(capacity),
            capacity,
            reused: 0,
        }
    }

    /**
        A frame with each plane's stride aligned to `align` bytes.
    */
    pub fn acquire(
        &mut self,
        width: u32,
        height: u32,
        format: PixelFormat,
        align: usize,
    ) -> VideoFrame {
        let strides: Vec<usize> = (0..format.plane_count())
            .map(|plane| align_stride(format.plane_size(plane, width, height).0, align))
            .collect();
        self.acquire_with_strides(width, height, format, &strides)
    }

    /**
        A frame with the given per-plane strides.

        Pooled buffers are reused when the plane count matches; their
        contents are unspecified and must be overwritten by the caller.
    */
    pub fn acquire_with_strides(
        &mut self,
        width: u32,
        height: u32,
        format: PixelFormat,
        strides: &[usize],
    ) -> VideoFrame {
        let planes = match self.free.iter().position(|p| p.len() == strides.len()) {
            Some(index) => {
                self.reused += 1;
                let mut planes = self.free.swap_remove(index);
                for (i, plane) in planes.iter_mut().enumerate() {
                    let (_, rows) = format.plane_size(i, width, height);
                    plane.stride = strides[i];
                    plane.data.resize(strides[i] * rows, 0);
                }
                planes
            }
            None => strides
                .iter()
                .enumerate()
                .map(|(i, &stride)| Plane::zeroed(stride, format.plane_size(i, width, height).1))
                .collect(),
        };

        VideoFrame::from_planes(width, height, format, planes)
    }

    /**
        Take back a frame's buffers. Dropped if the pool is full.
    */
    pub fn release(&mut self, frame: VideoFrame) {
        if self.free.len() < self.capacity {
            self.free.push(frame.into_planes());
        }
    }

    /**
        Free every pooled buffer.
    */
    pub fn clear(&mut self) {
        self.free.clear();
    }

    pub fn available(&self) -> usize {
        self.free.len()
    }

    /**
        How many frames were built from pooled buffers.
    */
    pub fn reused(&self) -> u64 {
        self.reused
    }
}
