/*!
    Pixel format types.
*/

use std::fmt;
use std::str::FromStr;

use crate::ParseError;

/// Largest picture, in bytes, accepted from a container header.
pub const MAX_FRAME_BYTES: usize = 1 << 30;

/**
    Video pixel formats.

    This is the subset of formats the pipeline can carry through conversion
    and into the sinks. All formats use 8 bits per sample.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum PixelFormat {
    /// Single luma plane, 8bpp
    Gray8,
    /// Planar YUV 4:2:0, 12bpp (most common video format)
    Yuv420p,
    /// Planar YUV 4:2:2, 16bpp
    Yuv422p,
    /// Planar YUV 4:4:4, 24bpp
    Yuv444p,
    /// Semi-planar YUV 4:2:0, 12bpp (common hardware decoder output)
    Nv12,
    /// Packed RGB, 24bpp
    Rgb24,
    /// Packed BGR, 24bpp
    Bgr24,
    /// Packed RGBA, 32bpp
    Rgba,
    /// Packed BGRA, 32bpp
    Bgra,
}

impl PixelFormat {
    pub const ALL: [PixelFormat; 9] = [
        Self::Gray8,
        Self::Yuv420p,
        Self::Yuv422p,
        Self::Yuv444p,
        Self::Nv12,
        Self::Rgb24,
        Self::Bgr24,
        Self::Rgba,
        Self::Bgra,
    ];

    /**
        Returns the number of bits per pixel for this format.

        For subsampled formats, this is the average bits per pixel.
    */
    pub const fn bits_per_pixel(self) -> u32 {
        match self {
            Self::Gray8 => 8,
            Self::Yuv420p | Self::Nv12 => 12,
            Self::Yuv422p => 16,
            Self::Rgb24 | Self::Bgr24 | Self::Yuv444p => 24,
            Self::Bgra | Self::Rgba => 32,
        }
    }

    /**
        Returns the number of planes a frame of this format carries.
    */
    pub const fn plane_count(self) -> usize {
        match self {
            Self::Yuv420p | Self::Yuv422p | Self::Yuv444p => 3,
            Self::Nv12 => 2,
            Self::Gray8 | Self::Rgb24 | Self::Bgr24 | Self::Rgba | Self::Bgra => 1,
        }
    }

    /**
        Returns true if this is a planar format.
    */
    pub const fn is_planar(self) -> bool {
        match self {
            Self::Yuv420p | Self::Yuv422p | Self::Yuv444p => true,
            Self::Nv12 => true, // semi-planar counts as planar
            Self::Gray8 | Self::Bgra | Self::Rgba | Self::Rgb24 | Self::Bgr24 => false,
        }
    }

    /**
        Returns true for formats carrying luma (and possibly chroma) samples.
    */
    pub const fn is_yuv(self) -> bool {
        matches!(
            self,
            Self::Gray8 | Self::Yuv420p | Self::Yuv422p | Self::Yuv444p | Self::Nv12
        )
    }

    /**
        Bytes per pixel in the first plane.
    */
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Gray8 | Self::Yuv420p | Self::Yuv422p | Self::Yuv444p | Self::Nv12 => 1,
            Self::Rgb24 | Self::Bgr24 => 3,
            Self::Rgba | Self::Bgra => 4,
        }
    }

    /**
        Horizontal and vertical chroma subsampling shifts, `(x, y)`.

        Returns `None` for formats without separate chroma samples.
    */
    pub const fn chroma_shift(self) -> Option<(u32, u32)> {
        match self {
            Self::Yuv420p | Self::Nv12 => Some((1, 1)),
            Self::Yuv422p => Some((1, 0)),
            Self::Yuv444p => Some((0, 0)),
            Self::Gray8 | Self::Rgb24 | Self::Bgr24 | Self::Rgba | Self::Bgra => None,
        }
    }

    /**
        Size of one plane as `(bytes_per_row, rows)`, without padding.

        Chroma dimensions round up for odd sizes, as FFmpeg does.
    */
    pub const fn plane_size(self, plane: usize, width: u32, height: u32) -> (usize, usize) {
        let (w, h) = (width as usize, height as usize);
        if plane == 0 {
            return (w * self.bytes_per_pixel(), h);
        }
        match self.chroma_shift() {
            Some((sx, sy)) => {
                let cw = (w + (1 << sx) - 1) >> sx;
                let ch = (h + (1 << sy) - 1) >> sy;
                match self {
                    Self::Nv12 => (cw * 2, ch),
                    _ => (cw, ch),
                }
            }
            None => (0, 0),
        }
    }

    /**
        Total bytes of a tightly packed frame of this format.
    */
    pub const fn frame_size(self, width: u32, height: u32) -> usize {
        let mut total = 0;
        let mut plane = 0;
        while plane < self.plane_count() {
            let (row, rows) = self.plane_size(plane, width, height);
            total += row * rows;
            plane += 1;
        }
        total
    }

    /**
        [`frame_size`](Self::frame_size) for untrusted dimensions: `None`
        if the size does not fit in `usize`.
    */
    pub fn checked_frame_size(self, width: u32, height: u32) -> Option<usize> {
        let (w, h) = (width as usize, height as usize);
        let luma = w.checked_mul(self.bytes_per_pixel())?.checked_mul(h)?;
        let chroma = match self.chroma_shift() {
            // U and V, planar or interleaved
            Some((sx, sy)) => w
                .div_ceil(1 << sx)
                .checked_mul(h.div_ceil(1 << sy))?
                .checked_mul(2)?,
            None => 0,
        };
        luma.checked_add(chroma)
    }

    /**
        Short lowercase name, matching FFmpeg's pixel format names.
    */
    pub const fn name(self) -> &'static str {
        match self {
            Self::Gray8 => "gray",
            Self::Yuv420p => "yuv420p",
            Self::Yuv422p => "yuv422p",
            Self::Yuv444p => "yuv444p",
            Self::Nv12 => "nv12",
            Self::Rgb24 => "rgb24",
            Self::Bgr24 => "bgr24",
            Self::Rgba => "rgba",
            Self::Bgra => "bgra",
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PixelFormat {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        if lower == "gray8" {
            return Ok(Self::Gray8);
        }
        Self::ALL
            .into_iter()
            .find(|format| format.name() == lower)
            .ok_or_else(|| ParseError {
                kind: "pixel format",
                value: s.to_string(),
            })
    }
}
