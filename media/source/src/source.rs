/*!
    Media source implementation.
*/

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{debug, info, trace};

use media_types::{Error, MediaKind, Packet, Result, SourceInfo};

use crate::probe::log_stream_info;
use crate::select::{SelectionPolicy, select_best_stream};
use crate::y4m::{Y4M_MAGIC, Y4mDemuxer};

/**
    A container demultiplexer.

    `discover` reads whatever header data is needed to describe the
    streams; `read_packet` then produces packets in container order until
    it returns `Ok(None)`.
*/
pub trait Demux: Send {
    /// Short name of the container format.
    fn format_name(&self) -> &str;

    /// Read stream information. Called once, before any packet is read.
    fn discover(&mut self) -> Result<SourceInfo>;

    /// Read the next packet, or `None` at end of input.
    fn read_packet(&mut self) -> Result<Option<Packet>>;
}

/**
    Configuration for opening a media source.
*/
#[derive(Clone, Debug, Default)]
pub struct SourceConfig {
    /// Upper bound on the bytes read ahead during stream discovery.
    /// Only the FFmpeg backend reads ahead; `None` keeps its default.
    pub probe_size: Option<u64>,
}

impl SourceConfig {
    pub fn with_probe_size(mut self, bytes: u64) -> Self {
        self.probe_size = Some(bytes);
        self
    }
}

/**
    A media source that produces encoded packets.

    Created by [`Source::open`] or [`Source::from_demuxer`]. Stream
    information is not available until [`Source::discover_streams`] has
    completed; after that the stream table is fixed.
*/
pub struct Source {
    demuxer: Box<dyn Demux>,
    info: Option<SourceInfo>,
    /// Name used in log events (a path, or the format name).
    label: String,
    packets_read: u64,
}

impl Source {
    /**
        Open a media file.

        The container is detected from its first bytes. Y4M is handled
        natively; anything else needs the `ffmpeg` feature.

        # Example

        ```ignore
        let mut source = Source::open("clip.y4m", SourceConfig::default())?;
        let info = source.discover_streams()?;
        println!("{} streams", info.streams().len());
        ```
    */
    pub fn open<P: AsRef<Path>>(path: P, config: SourceConfig) -> Result<Self> {
        let path = path.as_ref();
        let label = path.display().to_string();

        let file = File::open(path).map_err(|e| Error::open_failed(format!("{label}: {e}")))?;
        let total_len = file.metadata().map(|m| m.len()).ok();
        let mut reader = BufReader::new(file);
        let head = reader
            .fill_buf()
            .map_err(|e| Error::open_failed(format!("{label}: {e}")))?;
        let is_y4m = head.starts_with(Y4M_MAGIC);
        let is_empty = head.is_empty();

        if is_y4m {
            debug!(path = %label, "detected Y4M container");
            let mut demuxer = Y4mDemuxer::new(reader);
            if let Some(len) = total_len {
                demuxer = demuxer.with_total_len(len);
            }
            return Ok(Self::with_label(Box::new(demuxer), label));
        }

        if is_empty {
            return Err(Error::open_failed(format!("{label}: file is empty")));
        }

        Self::open_other(path, label, &config)
    }

    #[cfg(feature = "ffmpeg")]
    fn open_other(path: &Path, label: String, config: &SourceConfig) -> Result<Self> {
        let demuxer = crate::ffmpeg::FfmpegDemuxer::open(path, config)?;
        Ok(Self::with_label(Box::new(demuxer), label))
    }

    #[cfg(not(feature = "ffmpeg"))]
    fn open_other(_path: &Path, label: String, _config: &SourceConfig) -> Result<Self> {
        Err(Error::open_failed(format!(
            "{label}: unrecognized container (built without FFmpeg support)"
        )))
    }

    /**
        Wrap a caller-supplied demuxer.
    */
    pub fn from_demuxer(demuxer: Box<dyn Demux>) -> Self {
        let label = demuxer.format_name().to_string();
        Self::with_label(demuxer, label)
    }

    fn with_label(demuxer: Box<dyn Demux>, label: String) -> Self {
        Self {
            demuxer,
            info: None,
            label,
            packets_read: 0,
        }
    }

    /**
        Read stream information from the container.

        Calling this again after it succeeded returns the same information
        without touching the input.
    */
    pub fn discover_streams(&mut self) -> Result<&SourceInfo> {
        if self.info.is_none() {
            let info = self.demuxer.discover()?;
            if info.streams().is_empty() {
                return Err(Error::no_stream_info(format!(
                    "{}: container has no streams",
                    self.label
                )));
            }
            log_stream_info(&self.label, &info);
            self.info = Some(info);
        }

        self.info()
    }

    /**
        Stream information, once discovered.
    */
    pub fn info(&self) -> Result<&SourceInfo> {
        self.info.as_ref().ok_or_else(|| {
            Error::no_stream_info(format!("{}: streams not discovered yet", self.label))
        })
    }

    pub fn is_discovered(&self) -> bool {
        self.info.is_some()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /**
        Number of packets handed out so far.
    */
    pub fn packets_read(&self) -> u64 {
        self.packets_read
    }

    /**
        Pick the best stream of `kind`. See [`select_best_stream`].
    */
    pub fn select_best_stream(&self, kind: MediaKind, policy: SelectionPolicy) -> Result<usize> {
        select_best_stream(self.info()?, kind, policy)
    }

    /**
        Read the next packet from the source.

        Returns `Ok(Some(packet))` for each packet and `Ok(None)` at end of
        input. Packets come in container order, interleaved between streams;
        every packet's `stream_index` names a discovered stream.
    */
    pub fn read_packet(&mut self) -> Result<Option<Packet>> {
        let stream_count = self.info()?.streams().len();

        loop {
            let Some(packet) = self.demuxer.read_packet()? else {
                return Ok(None);
            };

            // Streams that appear after discovery are not part of the table
            if packet.stream_index >= stream_count {
                trace!(
                    stream = packet.stream_index,
                    "dropping packet for undiscovered stream"
                );
                continue;
            }

            self.packets_read += 1;
            return Ok(Some(packet));
        }
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Source")
            .field("label", &self.label)
            .field("format", &self.demuxer.format_name())
            .field("discovered", &self.info.is_some())
            .field("packets_read", &self.packets_read)
            .finish()
    }
}

impl Drop for Source {
    fn drop(&mut self) {
        info!(
            source = %self.label,
            packets = self.packets_read,
            "closing source"
        );
    }
}

/**
    Open a media file with default configuration.
*/
pub fn open<P: AsRef<Path>>(path: P) -> Result<Source> {
    Source::open(path, SourceConfig::default())
}

/**
    Iterator adapter for Source that yields packets.

    Yields nothing useful before discovery: the first item is the
    `NoStreamInfo` error.
*/
impl Iterator for Source {
    type Item = Result<Packet>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_packet().transpose()
    }
}

#[cfg(test)]
mod tests {
    use media_types::{CodecId, ErrorKind, PixelFormat, Rational, StreamDescriptor};

    use super::*;
    use crate::memory::MemoryDemuxer;
    use crate::y4m::Y4mWriter;

    fn write_y4m(dir: &Path, frames: usize) -> std::path::PathBuf {
        let path = dir.join("clip.y4m");
        let file = File::create(&path).unwrap();
        let mut writer =
            Y4mWriter::new(file, 16, 8, PixelFormat::Yuv420p, Rational::new(25, 1)).unwrap();
        for i in 0..frames {
            writer
                .write_frame(&vec![i as u8; PixelFormat::Yuv420p.frame_size(16, 8)])
                .unwrap();
        }
        writer.into_inner().unwrap();
        path
    }

    #[test]
    fn open_missing_file_fails() {
        let err = Source::open("/nonexistent/clip.y4m", SourceConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OpenFailed);
    }

    #[test]
    fn open_empty_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.bin");
        File::create(&path).unwrap();

        let err = Source::open(&path, SourceConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OpenFailed);
    }

    #[cfg(not(feature = "ffmpeg"))]
    #[test]
    fn unknown_container_fails_without_ffmpeg() {
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        File::create(&path)
            .unwrap()
            .write_all(b"\0\0\0\x18ftypmp42")
            .unwrap();

        let err = Source::open(&path, SourceConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OpenFailed);
    }

    #[test]
    fn info_requires_discovery() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_y4m(dir.path(), 2);

        let mut source = Source::open(&path, SourceConfig::default()).unwrap();
        assert_eq!(source.info().unwrap_err().kind(), ErrorKind::NoStreamInfo);
        assert_eq!(
            source.read_packet().unwrap_err().kind(),
            ErrorKind::NoStreamInfo
        );

        let info = source.discover_streams().unwrap();
        assert_eq!(info.format_name, "yuv4mpegpipe");
        assert_eq!(info.streams().len(), 1);
        assert!(source.is_discovered());
    }

    #[test]
    fn reads_all_packets_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_y4m(dir.path(), 4);

        let mut source = open(&path).unwrap();
        source.discover_streams().unwrap();
        let packets: Vec<_> = source.by_ref().collect::<Result<_>>().unwrap();
        assert_eq!(packets.len(), 4);
        assert_eq!(source.packets_read(), 4);
        assert_eq!(packets[3].pts, Some(3));
    }

    #[test]
    fn discovery_is_stable() {
        let demuxer = MemoryDemuxer::raw_video(4, 4, PixelFormat::Gray8, Rational::new(25, 1), 1);
        let mut source = Source::from_demuxer(Box::new(demuxer));
        let first = source.discover_streams().unwrap().clone();
        let second = source.discover_streams().unwrap().clone();
        assert_eq!(first, second);
    }

    #[test]
    fn source_without_streams_has_no_stream_info() {
        let demuxer = MemoryDemuxer::new(SourceInfo::new("memory", Vec::new()), Vec::new());
        let mut source = Source::from_demuxer(Box::new(demuxer));
        assert_eq!(
            source.discover_streams().unwrap_err().kind(),
            ErrorKind::NoStreamInfo
        );
    }

    #[test]
    fn packets_for_unknown_streams_are_dropped() {
        let info = SourceInfo::new("memory", vec![StreamDescriptor::audio(0, CodecId::Aac, 2, 48000)]);
        let packets = vec![
            Packet::new(vec![1], 5),
            Packet::new(vec![2], 0),
        ];
        let mut source = Source::from_demuxer(Box::new(MemoryDemuxer::new(info, packets)));
        source.discover_streams().unwrap();

        let packet = source.read_packet().unwrap().unwrap();
        assert_eq!(packet.data, vec![2]);
        assert!(source.read_packet().unwrap().is_none());
        assert_eq!(source.packets_read(), 1);
    }

    #[test]
    fn select_through_source() {
        let demuxer = MemoryDemuxer::raw_video(4, 4, PixelFormat::Gray8, Rational::new(25, 1), 1);
        let mut source = Source::from_demuxer(Box::new(demuxer));
        assert_eq!(
            source
                .select_best_stream(MediaKind::Video, SelectionPolicy::First)
                .unwrap_err()
                .kind(),
            ErrorKind::NoStreamInfo
        );

        source.discover_streams().unwrap();
        assert_eq!(
            source
                .select_best_stream(MediaKind::Video, SelectionPolicy::First)
                .unwrap(),
            0
        );
        assert_eq!(
            source
                .select_best_stream(MediaKind::Audio, SelectionPolicy::First)
                .unwrap_err()
                .kind(),
            ErrorKind::NoMatchingStream
        );
    }
}
