/*!
    Shared types for the media decode pipeline.

    This crate defines the vocabulary of the pipeline: the types that cross crate
    boundaries. It has no dependency on FFmpeg, making it lightweight and enabling
    consumers to depend on it without pulling in FFmpeg bindings.
*/

mod codec;
mod error;
mod format;
mod frame;
mod packet;
mod rational;
mod stream;

pub use codec::CodecId;
pub use error::{Error, ErrorKind, ErrorScope, ParseError, Result};
pub use format::{MAX_FRAME_BYTES, PixelFormat};
pub use frame::{Plane, VideoFrame, align_stride};
pub use packet::Packet;
pub use rational::Rational;
pub use stream::{MediaKind, SourceInfo, StreamDescriptor, StreamParams};
