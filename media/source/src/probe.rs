/*!
    Probing functionality for extracting media metadata.
*/

use std::path::Path;

use tracing::info;

use media_types::{Result, SourceInfo, StreamDescriptor, StreamParams};

use crate::source::{Source, SourceConfig};

/**
    Probe a media file for its container and stream information.

    Opens the file, runs stream discovery and closes it again without
    reading any packets.

    # Example

    ```ignore
    let info = probe("clip.y4m", SourceConfig::default())?;
    for stream in info.streams() {
        println!("#{} {}", stream.index, stream.codec_id);
    }
    ```
*/
pub fn probe<P: AsRef<Path>>(path: P, config: SourceConfig) -> Result<SourceInfo> {
    let mut source = Source::open(path, config)?;
    Ok(source.discover_streams()?.clone())
}

/**
    Log the container and one line per stream.
*/
pub(crate) fn log_stream_info(label: &str, info: &SourceInfo) {
    info!(
        source = label,
        format = %info.format_name,
        streams = info.streams().len(),
        duration = ?info.duration,
        bitrate = ?info.bitrate,
        "discovered streams"
    );

    for stream in info.streams() {
        log_stream(label, stream);
    }
}

fn log_stream(label: &str, stream: &StreamDescriptor) {
    match &stream.params {
        StreamParams::Video {
            width,
            height,
            pixel_format,
        } => info!(
            source = label,
            index = stream.index,
            codec = %stream.codec_id,
            time_base = %stream.time_base,
            frame_rate = ?stream.frame_rate.map(|r| r.to_string()),
            duration = ?stream.duration,
            width,
            height,
            pixel_format = ?pixel_format.map(|f| f.name()),
            "video stream"
        ),
        StreamParams::Audio {
            channels,
            sample_rate,
        } => info!(
            source = label,
            index = stream.index,
            codec = %stream.codec_id,
            time_base = %stream.time_base,
            duration = ?stream.duration,
            channels,
            sample_rate,
            "audio stream"
        ),
        StreamParams::Other => info!(
            source = label,
            index = stream.index,
            codec = %stream.codec_id,
            time_base = %stream.time_base,
            "data stream"
        ),
    }
}
