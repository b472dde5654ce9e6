//! End-to-end runs of the pipeline over synthetic sources.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use media_decode::{
    CodecDescriptor, CodecRegistry, DecodeBackend, Decoded, DecoderConfig, DecoderFactory,
    FramePool, RawVideoFactory, SendStatus,
};
use media_pipeline::{OutputFormat, Pipeline, PipelineConfig, SinkConfig};
use media_sink::read_pgm;
use media_source::{MemoryDemuxer, Source, Y4mWriter, gradient};
use media_types::{
    CodecId, ErrorKind, MediaKind, Packet, PixelFormat, Rational, Result, SourceInfo,
    StreamDescriptor,
};

const FPS: Rational = Rational::new(25, 1);

/// Counts what the pipeline does with its decoders.
#[derive(Default)]
struct Counters {
    lookups: AtomicUsize,
    created: AtomicUsize,
    dropped: AtomicUsize,
    sends: AtomicUsize,
}

struct TrackedBackend {
    inner: Box<dyn DecodeBackend>,
    counters: Arc<Counters>,
}

impl DecodeBackend for TrackedBackend {
    fn send(&mut self, packet: Packet) -> Result<SendStatus> {
        self.counters.sends.fetch_add(1, Ordering::SeqCst);
        self.inner.send(packet)
    }

    fn send_eof(&mut self) -> Result<()> {
        self.inner.send_eof()
    }

    fn receive(&mut self, pool: &mut FramePool) -> Result<Decoded> {
        self.inner.receive(pool)
    }
}

impl Drop for TrackedBackend {
    fn drop(&mut self) {
        self.counters.dropped.fetch_add(1, Ordering::SeqCst);
    }
}

struct TrackedFactory {
    counters: Arc<Counters>,
}

impl DecoderFactory for TrackedFactory {
    fn name(&self) -> &str {
        "tracked-rawvideo"
    }

    fn kind(&self) -> MediaKind {
        MediaKind::Video
    }

    fn create(
        &self,
        stream: &StreamDescriptor,
        config: &DecoderConfig,
    ) -> Result<Box<dyn DecodeBackend>> {
        let inner = RawVideoFactory.create(stream, config)?;
        self.counters.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(TrackedBackend {
            inner,
            counters: Arc::clone(&self.counters),
        }))
    }
}

struct TrackedRegistry {
    factory: TrackedFactory,
}

impl TrackedRegistry {
    fn new() -> (Arc<Self>, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let registry = Arc::new(Self {
            factory: TrackedFactory {
                counters: Arc::clone(&counters),
            },
        });
        (registry, counters)
    }
}

impl CodecRegistry for TrackedRegistry {
    fn find_decoder(&self, codec: &CodecId) -> Option<&dyn DecoderFactory> {
        self.factory.counters.lookups.fetch_add(1, Ordering::SeqCst);
        (*codec == CodecId::RawVideo).then_some(&self.factory as &dyn DecoderFactory)
    }

    fn decoders(&self) -> Vec<CodecDescriptor> {
        vec![CodecDescriptor {
            name: self.factory.name().to_string(),
            codec_id: CodecId::RawVideo,
            kind: MediaKind::Video,
        }]
    }
}

fn write_y4m(dir: &Path, frames: usize, width: u32, height: u32) -> PathBuf {
    let path = dir.join("input.y4m");
    let file = File::create(&path).unwrap();
    let mut writer = Y4mWriter::new(file, width, height, PixelFormat::Yuv420p, FPS).unwrap();
    for i in 0..frames {
        writer
            .write_frame(&gradient(width, height, PixelFormat::Yuv420p, i))
            .unwrap();
    }
    writer.into_inner().unwrap();
    path
}

fn list_dir(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn frame_budget_stops_after_five_frames() {
    let input_dir = tempfile::tempdir().unwrap();
    let output_dir = tempfile::tempdir().unwrap();
    // Two seconds at 25 fps
    let input = write_y4m(input_dir.path(), 50, 32, 24);

    let (registry, counters) = TrackedRegistry::new();
    let config = PipelineConfig::default()
        .with_max_frames(5)
        .with_output(SinkConfig::new(output_dir.path()));
    let report = Pipeline::new(config)
        .with_registry(registry)
        .run(&input)
        .unwrap();

    assert_eq!(report.frames_decoded, 5);
    assert_eq!(report.frames_written, 5);
    assert!(report.budget_exhausted);
    assert_eq!(report.packets_submitted, 5);
    assert_eq!(
        list_dir(output_dir.path()),
        vec![
            "frame-1.pgm",
            "frame-2.pgm",
            "frame-3.pgm",
            "frame-4.pgm",
            "frame-5.pgm"
        ]
    );

    // The decoder was torn down
    assert_eq!(counters.created.load(Ordering::SeqCst), 1);
    assert_eq!(counters.dropped.load(Ordering::SeqCst), 1);
}

#[test]
fn greymaps_carry_the_luma_plane() {
    let input_dir = tempfile::tempdir().unwrap();
    let output_dir = tempfile::tempdir().unwrap();
    let input = write_y4m(input_dir.path(), 3, 10, 6);

    let config = PipelineConfig::default().with_output(SinkConfig::new(output_dir.path()));
    let report = Pipeline::new(config).run(&input).unwrap();
    assert_eq!(report.frames_written, 3);

    for i in 0..3 {
        let path = output_dir.path().join(format!("frame-{}.pgm", i + 1));
        let (header, raster) = read_pgm(&mut BufReader::new(File::open(path).unwrap())).unwrap();
        assert_eq!((header.width, header.height, header.max_value), (10, 6, 255));
        assert_eq!(raster, gradient(10, 6, PixelFormat::Yuv420p, i)[..60].to_vec());
    }
}

#[test]
fn never_matching_stream_submits_nothing() {
    let output_dir = tempfile::tempdir().unwrap();
    let raw = |index| {
        StreamDescriptor::video(index, CodecId::RawVideo, 4, 4, Some(PixelFormat::Gray8), FPS)
    };
    let info = SourceInfo::new("memory", vec![raw(0), raw(1)]);
    let packets = (0..10)
        .map(|i| Packet::new(vec![i as u8; 16], 0).with_timestamps(Some(i), Some(i)))
        .collect();
    let source = Source::from_demuxer(Box::new(MemoryDemuxer::new(info, packets)));

    let (registry, counters) = TrackedRegistry::new();
    let config = PipelineConfig::default()
        .with_stream(1)
        .with_output(SinkConfig::new(output_dir.path()));
    let report = Pipeline::new(config)
        .with_registry(registry)
        .run_source(source)
        .unwrap();

    assert_eq!(report.stream_index, 1);
    assert_eq!(report.packets_read, 10);
    assert_eq!(report.packets_skipped, 10);
    assert_eq!(report.packets_submitted, 0);
    assert_eq!(report.frames_decoded, 0);
    assert_eq!(counters.sends.load(Ordering::SeqCst), 0);
    assert!(list_dir(output_dir.path()).is_empty());
}

#[test]
fn source_without_video_never_reaches_a_decoder() {
    let output_dir = tempfile::tempdir().unwrap();
    let info = SourceInfo::new("memory", vec![StreamDescriptor::audio(0, CodecId::Aac, 2, 48_000)]);
    let packets = vec![Packet::new(vec![0; 8], 0); 4];
    let source = Source::from_demuxer(Box::new(MemoryDemuxer::new(info, packets)));

    let (registry, counters) = TrackedRegistry::new();
    let config = PipelineConfig::default().with_output(SinkConfig::new(output_dir.path()));
    let err = Pipeline::new(config)
        .with_registry(registry)
        .run_source(source)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NoMatchingStream);
    assert_eq!(counters.lookups.load(Ordering::SeqCst), 0);
    assert_eq!(counters.created.load(Ordering::SeqCst), 0);
}

#[test]
fn unsupported_selected_codec_is_fatal() {
    let output_dir = tempfile::tempdir().unwrap();
    let info = SourceInfo::new(
        "memory",
        vec![StreamDescriptor::video(0, CodecId::H264, 64, 48, None, FPS)],
    );
    let source = Source::from_demuxer(Box::new(MemoryDemuxer::new(info, vec![])));

    let (registry, _) = TrackedRegistry::new();
    let config = PipelineConfig::default().with_output(SinkConfig::new(output_dir.path()));
    let err = Pipeline::new(config)
        .with_registry(registry)
        .run_source(source)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedCodec);
}

fn undecodable_then_raw() -> Source {
    let info = SourceInfo::new(
        "memory",
        vec![
            StreamDescriptor::video(0, CodecId::H264, 4, 4, None, FPS),
            StreamDescriptor::video(1, CodecId::RawVideo, 4, 4, Some(PixelFormat::Gray8), FPS),
        ],
    );
    let packets = (0..3)
        .map(|i| Packet::new(gradient(4, 4, PixelFormat::Gray8, i), 1))
        .collect();
    Source::from_demuxer(Box::new(MemoryDemuxer::new(info, packets)))
}

#[test]
fn selection_skips_streams_without_a_decoder() {
    let output_dir = tempfile::tempdir().unwrap();
    let (registry, _) = TrackedRegistry::new();
    let config = PipelineConfig::default().with_output(SinkConfig::new(output_dir.path()));
    let report = Pipeline::new(config)
        .with_registry(registry)
        .run_source(undecodable_then_raw())
        .unwrap();

    assert_eq!(report.stream_index, 1);
    assert_eq!(report.frames_written, 3);
    assert_eq!(list_dir(output_dir.path()).len(), 3);
}

#[test]
fn pinned_undecodable_stream_is_fatal() {
    let output_dir = tempfile::tempdir().unwrap();
    let (registry, _) = TrackedRegistry::new();
    let config = PipelineConfig::default()
        .with_stream(0)
        .with_output(SinkConfig::new(output_dir.path()));
    let err = Pipeline::new(config)
        .with_registry(registry)
        .run_source(undecodable_then_raw())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedCodec);
}

#[test]
fn delayed_frames_are_flushed_at_end_of_input() {
    let output_dir = tempfile::tempdir().unwrap();
    let source = Source::from_demuxer(Box::new(MemoryDemuxer::raw_video(
        8,
        8,
        PixelFormat::Gray8,
        FPS,
        10,
    )));

    let (registry, counters) = TrackedRegistry::new();
    let config = PipelineConfig::default()
        .with_decoder(DecoderConfig::default().with_frame_delay(3))
        .with_output(SinkConfig::new(output_dir.path()));
    let report = Pipeline::new(config)
        .with_registry(registry)
        .run_source(source)
        .unwrap();

    assert_eq!(report.packets_submitted, 10);
    assert_eq!(report.frames_decoded, 10);
    assert!(!report.budget_exhausted);
    assert_eq!(list_dir(output_dir.path()).len(), 10);
    assert_eq!(counters.dropped.load(Ordering::SeqCst), 1);
}

#[test]
fn failed_frame_write_is_skipped() {
    let output_dir = tempfile::tempdir().unwrap();
    // A directory where the second artifact should go
    fs::create_dir(output_dir.path().join("frame-2.pgm")).unwrap();
    let source = || {
        Source::from_demuxer(Box::new(MemoryDemuxer::raw_video(
            4,
            4,
            PixelFormat::Gray8,
            FPS,
            4,
        )))
    };

    let config = PipelineConfig::default().with_output(SinkConfig::new(output_dir.path()));
    let (registry, _) = TrackedRegistry::new();
    let report = Pipeline::new(config.clone())
        .with_registry(registry)
        .run_source(source())
        .unwrap();
    assert_eq!(report.frames_decoded, 4);
    assert_eq!(report.frames_written, 3);
    assert_eq!(report.frames_failed, 1);

    let (registry, counters) = TrackedRegistry::new();
    let err = Pipeline::new(config.with_fail_fast(true))
        .with_registry(registry)
        .run_source(source())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IoFailed);
    assert_eq!(counters.dropped.load(Ordering::SeqCst), 1);
}

#[test]
fn yuv_output_appends_converted_frames() {
    let output_dir = tempfile::tempdir().unwrap();
    let output = output_dir.path().join("video.yuv");
    let source = Source::from_demuxer(Box::new(MemoryDemuxer::raw_video(
        8,
        6,
        PixelFormat::Gray8,
        FPS,
        3,
    )));

    let config = PipelineConfig::default()
        .with_output(SinkConfig::new(&output).with_format(OutputFormat::Yuv));
    let (registry, _) = TrackedRegistry::new();
    let report = Pipeline::new(config)
        .with_registry(registry)
        .run_source(source)
        .unwrap();
    assert_eq!(report.frames_written, 3);

    let bytes = fs::read(&output).unwrap();
    let frame_size = PixelFormat::Yuv420p.frame_size(8, 6);
    assert_eq!(bytes.len(), 3 * frame_size);

    // Grey input: luma copied through, chroma neutral
    let first = &bytes[..frame_size];
    assert_eq!(&first[..48], &gradient(8, 6, PixelFormat::Gray8, 0)[..]);
    assert!(first[48..].iter().all(|&c| c == 128));
}
