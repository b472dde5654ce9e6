/*!
    Frame conversion for the media decode pipeline.

    Converts decoded video frames between pixel formats and sizes in pure
    Rust, so the same input always produces the same bytes.
*/

mod colour;
mod scale;
mod video;

pub use video::{ScalingAlgorithm, VideoTransform, VideoTransformConfig, convert};

// Re-export types commonly used with this crate
pub use media_types::{Error, PixelFormat, Result, VideoFrame};
