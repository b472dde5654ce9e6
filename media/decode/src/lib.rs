/*!
    Media decoding for the media decode pipeline.

    This crate transforms encoded packets into raw frames. A codec registry
    maps codec ids to decoder factories; [`VideoDecoder`] drives the chosen
    backend through the two-phase submit/receive protocol and owns the
    decoder state machine.

    Raw video is decoded natively. Compressed codecs are decoded through
    FFmpeg when the `ffmpeg` feature is enabled.
*/

mod backend;
mod config;
#[cfg(feature = "ffmpeg")]
mod ffmpeg;
mod pool;
mod raw;
mod registry;
mod video;

pub use backend::{DecodeBackend, Decoded, SendStatus};
pub use config::DecoderConfig;
#[cfg(feature = "ffmpeg")]
pub use ffmpeg::{FfmpegVideoDecoder, FfmpegVideoFactory};
pub use pool::FramePool;
pub use raw::{RawVideoDecoder, RawVideoFactory};
pub use registry::{CodecDescriptor, CodecRegistry, DecoderFactory, Registry};
pub use video::{DecoderState, DecoderStats, VideoDecoder, open_decoder};

// Re-export types that consumers need
pub use media_types::{CodecId, Error, Packet, PixelFormat, Result, StreamDescriptor, VideoFrame};
