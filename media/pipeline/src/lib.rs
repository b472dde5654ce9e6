/*!
    The media frame decode pipeline.

    Opens a source, picks a stream, pumps its packets through a decoder,
    optionally converts each frame and hands it to a sink, until the input
    ends or the frame budget is spent.

    # Example

    ```ignore
    let config = PipelineConfig::default()
        .with_max_frames(5)
        .with_output(SinkConfig::new("frames"));
    let report = Pipeline::new(config).run("clip.y4m")?;
    println!("wrote {} frames", report.frames_written);
    ```
*/

mod batch;
mod config;
mod pipeline;
mod streams;

pub use batch::{BatchItem, failures, run_batch, source_output};
pub use config::PipelineConfig;
pub use pipeline::{Pipeline, PipelineReport};
pub use streams::{StreamEntry, enumerate_streams};

// Re-export the pieces a caller needs to configure a run
pub use media_decode::{CodecRegistry, DecoderConfig, Registry};
pub use media_sink::{OutputFormat, SinkConfig};
pub use media_source::{SelectionPolicy, Source, SourceConfig};
pub use media_transform::{ScalingAlgorithm, VideoTransformConfig};
pub use media_types::{
    CodecId, Error, ErrorKind, ErrorScope, MediaKind, PixelFormat, Result, SourceInfo,
    StreamDescriptor, StreamParams,
};
