use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use media_pipeline::{
    Registry, Source, SourceConfig, SourceInfo, StreamEntry, StreamParams, enumerate_streams,
};

#[derive(Parser, Debug)]
pub struct ProbeCommand {
    /// Media file to inspect
    pub input: PathBuf,

    /// Bytes the container probe may read ahead
    #[arg(long)]
    pub probe_size: Option<u64>,
}

impl ProbeCommand {
    pub fn run(self) -> Result<()> {
        let mut config = SourceConfig::default();
        if let Some(bytes) = self.probe_size {
            config = config.with_probe_size(bytes);
        }

        let mut source = Source::open(&self.input, config)
            .with_context(|| format!("failed to open {}", self.input.display()))?;
        source
            .discover_streams()
            .with_context(|| format!("failed to read streams of {}", self.input.display()))?;

        let registry = Registry::default_for_build();
        let entries = enumerate_streams(&source, &registry)?;

        println!("{}", container_line(source.label(), source.info()?));
        for entry in &entries {
            println!("  {}", stream_line(entry));
        }
        Ok(())
    }
}

fn container_line(label: &str, info: &SourceInfo) -> String {
    let mut line = format!(
        "{label}: {}, {} stream(s)",
        info.format_name,
        info.streams().len()
    );
    if let Some(duration) = info.duration {
        line.push_str(&format!(", {:.3}s", duration.as_secs_f64()));
    }
    if let Some(bitrate) = info.bitrate {
        line.push_str(&format!(", {} kb/s", bitrate / 1000));
    }
    line
}

fn stream_line(entry: &StreamEntry) -> String {
    let stream = &entry.descriptor;
    let mut line = format!("#{} {} {}", stream.index, stream.kind, stream.codec_id);

    match &stream.params {
        StreamParams::Video {
            width,
            height,
            pixel_format,
        } => {
            line.push_str(&format!(" {width}x{height}"));
            if let Some(format) = pixel_format {
                line.push_str(&format!(" {format}"));
            }
            if let Some(rate) = stream.frame_rate {
                line.push_str(&format!(" {rate} fps"));
            }
        }
        StreamParams::Audio {
            channels,
            sample_rate,
        } => line.push_str(&format!(" {channels}ch {sample_rate} Hz")),
        StreamParams::Other => {}
    }

    line.push_str(&format!(" tb={}", stream.time_base));
    match &entry.decoder {
        Some(decoder) => line.push_str(&format!(" [{decoder}]")),
        None => line.push_str(" [unsupported]"),
    }
    line
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use media_pipeline::{CodecId, StreamDescriptor};

    use super::*;

    #[test]
    fn stream_lines_mark_unsupported_codecs() {
        let audio = StreamEntry {
            descriptor: StreamDescriptor::audio(1, CodecId::Aac, 2, 48_000),
            decoder: None,
        };
        assert_eq!(
            stream_line(&audio),
            "#1 audio aac 2ch 48000 Hz tb=1/48000 [unsupported]"
        );
    }

    #[test]
    fn container_line_includes_known_totals() {
        let mut info = SourceInfo::new("yuv4mpegpipe", vec![]);
        assert_eq!(container_line("a.y4m", &info), "a.y4m: yuv4mpegpipe, 0 stream(s)");

        info.duration = Some(Duration::from_millis(2000));
        info.bitrate = Some(1_536_000);
        assert_eq!(
            container_line("a.y4m", &info),
            "a.y4m: yuv4mpegpipe, 0 stream(s), 2.000s, 1536 kb/s"
        );
    }
}
