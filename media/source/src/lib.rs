/*!
    Media source and demuxing for the media decode pipeline.

    This crate handles the input side of the pipeline. It opens a container,
    discovers its streams, picks the stream to decode and produces encoded
    packets that the decode crate turns into frames.

    Y4M files are demuxed natively. Other containers are opened through
    FFmpeg when the `ffmpeg` feature is enabled.
*/

#[cfg(feature = "ffmpeg")]
pub mod convert;
#[cfg(feature = "ffmpeg")]
mod ffmpeg;
mod memory;
mod probe;
mod select;
mod source;
mod y4m;

#[cfg(feature = "ffmpeg")]
pub use ffmpeg::FfmpegDemuxer;
pub use memory::{MemoryDemuxer, gradient};
pub use probe::probe;
pub use select::{
    SelectionPolicy, select_best_stream, select_best_stream_by, select_best_stream_where,
};
pub use source::{Demux, Source, SourceConfig, open};
pub use y4m::{Y4M_MAGIC, Y4mDemuxer, Y4mHeader, Y4mWriter, colour_space_tag};

// Re-export types that consumers need
pub use media_types::{
    CodecId, Error, MediaKind, Packet, PixelFormat, Rational, Result, SourceInfo,
    StreamDescriptor, StreamParams,
};
