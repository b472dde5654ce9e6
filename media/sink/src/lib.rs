/*!
    Frame output for the media decode pipeline.

    This crate handles the output side of the pipeline. It takes decoded
    frames and writes them as byte-exact raw images: one binary PGM per
    frame, or planar YUV 4:2:0 appended to a single running file.
*/

mod config;
mod pgm;
mod sink;
mod yuv;

pub use config::{OutputFormat, SinkConfig};
pub use pgm::{PgmHeader, PgmSequenceSink, read_pgm, read_pgm_header, write_pgm};
pub use sink::{FrameSink, open_sink};
pub use yuv::YuvFileSink;

// Re-export types commonly used with this crate
pub use media_types::{Error, Result, VideoFrame};
