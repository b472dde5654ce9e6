/*!
    One pipeline run: probe, select, decode, convert, write.
*/

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use media_decode::{CodecRegistry, Decoded, Registry, VideoDecoder, open_decoder};
use media_sink::{FrameSink, OutputFormat, SinkConfig, open_sink};
use media_source::{Source, select_best_stream, select_best_stream_where};
use media_transform::{VideoTransform, VideoTransformConfig};
use media_types::{Error, ErrorScope, PixelFormat, Result, StreamDescriptor, VideoFrame};

use crate::config::PipelineConfig;

/**
    What a run did.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineReport {
    /// Index of the decoded stream.
    pub stream_index: usize,
    pub packets_read: u64,
    pub packets_submitted: u64,
    /// Packets of other streams, never submitted.
    pub packets_skipped: u64,
    pub frames_decoded: u64,
    pub frames_written: u64,
    /// Frames dropped after a conversion or write error.
    pub frames_failed: u64,
    /// The run stopped at the frame budget rather than at end of input.
    pub budget_exhausted: bool,
}

/**
    Decodes one stream of a source into frame artifacts.

    A pipeline holds no per-run state, so one instance can serve any
    number of runs, including concurrent ones.
*/
pub struct Pipeline {
    config: PipelineConfig,
    registry: Arc<dyn CodecRegistry>,
}

impl Pipeline {
    /**
        A pipeline using the richest codec registry of this build.
    */
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            registry: Arc::new(Registry::default_for_build()),
        }
    }

    pub fn with_registry(mut self, registry: Arc<dyn CodecRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn registry(&self) -> &dyn CodecRegistry {
        self.registry.as_ref()
    }

    /**
        The same pipeline writing to `output`.
    */
    pub(crate) fn with_output(&self, output: SinkConfig) -> Self {
        Self {
            config: PipelineConfig {
                output,
                ..self.config.clone()
            },
            registry: Arc::clone(&self.registry),
        }
    }

    /**
        Open the media file at `path` and run it.
    */
    pub fn run(&self, path: impl AsRef<Path>) -> Result<PipelineReport> {
        let source = Source::open(path, self.config.source.clone())?;
        self.run_source(source)
    }

    /**
        Run an opened source to the end of its input or the frame budget.

        Errors that end the run still tear everything down: the decoder is
        closed first, then frame buffers and the sink are released, then
        the source.
    */
    pub fn run_source(&self, mut source: Source) -> Result<PipelineReport> {
        source.discover_streams()?;
        let stream = self.select_stream(&source)?;
        let mut report = PipelineReport {
            stream_index: stream.index,
            ..PipelineReport::default()
        };

        info!(
            source = source.label(),
            stream = stream.index,
            codec = %stream.codec_id,
            budget = ?self.config.max_frames,
            "decoding stream"
        );

        let decoder = open_decoder(self.registry.as_ref(), stream, self.config.decoder.clone())?;
        let frames = FrameStage::new(
            self.config.effective_conversion(),
            self.config.output.format,
            open_sink(&self.config.output)?,
        );
        let mut session = Session {
            decoder,
            frames,
            source,
        };

        let outcome = session.pump(&self.config, &mut report);
        let closed = session.close();
        outcome?;
        closed?;

        info!(
            read = report.packets_read,
            submitted = report.packets_submitted,
            skipped = report.packets_skipped,
            decoded = report.frames_decoded,
            written = report.frames_written,
            failed = report.frames_failed,
            "pipeline finished"
        );
        Ok(report)
    }

    /**
        The configured stream, or the best decodable stream of the
        configured kind.

        Streams without a decoder are skipped. If every stream of the kind
        is undecodable, the policy's pick is returned and fails to open
        with `UnsupportedCodec`.
    */
    fn select_stream(&self, source: &Source) -> Result<StreamDescriptor> {
        let info = source.info()?;
        let (kind, policy) = (self.config.kind, self.config.selection);
        let index = match self.config.stream {
            Some(index) => index,
            None => {
                let decodable = |stream: &StreamDescriptor| {
                    let supported = self.registry.supports(&stream.codec_id);
                    if !supported {
                        warn!(
                            stream = stream.index,
                            codec = %stream.codec_id,
                            "unsupported codec, skipping stream"
                        );
                    }
                    supported
                };
                match select_best_stream_where(info, kind, policy, decodable) {
                    Err(Error::NoMatchingStream(_)) => select_best_stream(info, kind, policy)?,
                    selected => selected?,
                }
            }
        };

        info.stream(index)
            .filter(|stream| stream.kind == self.config.kind)
            .cloned()
            .ok_or(Error::NoMatchingStream(self.config.kind))
    }
}

/// How a receive loop ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Drain {
    NeedsInput,
    Finished,
    BudgetSpent,
}

/**
    Resources of one run.

    Fields drop in declaration order: decoder, then frames, then source.
*/
struct Session {
    decoder: VideoDecoder,
    frames: FrameStage,
    source: Source,
}

impl Session {
    fn pump(&mut self, config: &PipelineConfig, report: &mut PipelineReport) -> Result<()> {
        if config.max_frames == Some(0) {
            report.budget_exhausted = true;
            return Ok(());
        }

        let selected = self.decoder.stream().index;
        while let Some(packet) = self.source.read_packet()? {
            report.packets_read += 1;
            if packet.stream_index != selected {
                report.packets_skipped += 1;
                continue;
            }

            self.decoder.submit(packet)?;
            report.packets_submitted += 1;
            if self.drain(config, report)? == Drain::BudgetSpent {
                return Ok(());
            }
        }

        debug!(packets = report.packets_read, "input exhausted, flushing decoder");
        self.decoder.flush()?;
        self.drain(config, report)?;
        Ok(())
    }

    /**
        Receive until the decoder needs input, ends, or the budget is spent.
    */
    fn drain(&mut self, config: &PipelineConfig, report: &mut PipelineReport) -> Result<Drain> {
        loop {
            match self.decoder.receive()? {
                Decoded::Frame(frame) => {
                    report.frames_decoded += 1;
                    self.deliver(frame, config, report)?;

                    if config.max_frames.is_some_and(|max| report.frames_decoded >= max) {
                        debug!(frames = report.frames_decoded, "frame budget reached");
                        report.budget_exhausted = true;
                        return Ok(Drain::BudgetSpent);
                    }
                }
                Decoded::Pending => return Ok(Drain::NeedsInput),
                Decoded::EndOfStream => return Ok(Drain::Finished),
            }
        }
    }

    fn deliver(
        &mut self,
        frame: VideoFrame,
        config: &PipelineConfig,
        report: &mut PipelineReport,
    ) -> Result<()> {
        let sequence = frame.sequence;
        let written = self.frames.write(&frame);
        self.decoder.recycle(frame);

        match written {
            Ok(()) => {
                report.frames_written += 1;
                Ok(())
            }
            Err(e) if !config.fail_fast && e.kind().scope() == ErrorScope::Frame => {
                warn!(sequence, error = %e, "skipping frame");
                report.frames_failed += 1;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn close(self) -> Result<()> {
        let Session {
            mut decoder,
            mut frames,
            source,
        } = self;

        decoder.close();
        drop(decoder);
        let finished = frames.finish();
        drop(frames);
        drop(source);
        finished
    }
}

/**
    Everything between decoder output and disk.
*/
struct FrameStage {
    transform: Option<VideoTransform>,
    /// Greymap output of frames that have no luma plane.
    luma: Option<VideoTransform>,
    sink: Box<dyn FrameSink>,
}

impl FrameStage {
    fn new(
        conversion: Option<VideoTransformConfig>,
        format: OutputFormat,
        sink: Box<dyn FrameSink>,
    ) -> Self {
        let luma = (format == OutputFormat::Pgm)
            .then(|| VideoTransform::new(VideoTransformConfig::new(PixelFormat::Gray8)));

        Self {
            transform: conversion.map(VideoTransform::new),
            luma,
            sink,
        }
    }

    fn write(&mut self, frame: &VideoFrame) -> Result<()> {
        let converted = match self.transform.as_mut() {
            Some(transform) => Some(transform.transform(frame)?),
            None => None,
        };
        let frame = converted.as_ref().unwrap_or(frame);

        match self.luma.as_mut() {
            Some(luma) if !frame.format.is_yuv() => self.sink.write_frame(&luma.transform(frame)?),
            _ => self.sink.write_frame(frame),
        }
    }

    fn finish(&mut self) -> Result<()> {
        self.sink.finish()
    }
}

#[cfg(test)]
mod tests {
    use media_source::MemoryDemuxer;
    use media_types::{ErrorKind, MediaKind, Rational};

    use super::*;

    fn pipeline(dir: &Path) -> Pipeline {
        Pipeline::new(PipelineConfig::default().with_output(SinkConfig::new(dir)))
            .with_registry(Arc::new(Registry::builtin()))
    }

    fn memory(format: PixelFormat, count: usize) -> Source {
        Source::from_demuxer(Box::new(MemoryDemuxer::raw_video(
            8,
            6,
            format,
            Rational::new(25, 1),
            count,
        )))
    }

    #[test]
    fn decodes_every_frame_without_budget() {
        let dir = tempfile::tempdir().unwrap();
        let report = pipeline(dir.path())
            .run_source(memory(PixelFormat::Yuv420p, 4))
            .unwrap();

        assert_eq!(report.frames_decoded, 4);
        assert_eq!(report.frames_written, 4);
        assert!(!report.budget_exhausted);
        assert!(dir.path().join("frame-4.pgm").is_file());
    }

    #[test]
    fn rgb_frames_become_greymaps() {
        let dir = tempfile::tempdir().unwrap();
        let report = pipeline(dir.path())
            .run_source(memory(PixelFormat::Rgb24, 2))
            .unwrap();
        assert_eq!(report.frames_written, 2);
        assert_eq!(report.frames_failed, 0);
    }

    #[test]
    fn zero_budget_decodes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::default()
            .with_output(SinkConfig::new(dir.path()))
            .with_max_frames(0);
        let report = Pipeline::new(config)
            .with_registry(Arc::new(Registry::builtin()))
            .run_source(memory(PixelFormat::Gray8, 3))
            .unwrap();

        assert_eq!(report.packets_read, 0);
        assert!(report.budget_exhausted);
    }

    #[test]
    fn explicit_stream_must_have_requested_kind() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::default()
            .with_output(SinkConfig::new(dir.path()))
            .with_stream(3);
        let err = Pipeline::new(config)
            .with_registry(Arc::new(Registry::builtin()))
            .run_source(memory(PixelFormat::Gray8, 1))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoMatchingStream);
    }

    #[test]
    fn missing_kind_is_no_matching_stream() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::default()
            .with_output(SinkConfig::new(dir.path()))
            .with_kind(MediaKind::Audio);
        let err = Pipeline::new(config)
            .with_registry(Arc::new(Registry::builtin()))
            .run_source(memory(PixelFormat::Gray8, 1))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoMatchingStream);
    }
}
