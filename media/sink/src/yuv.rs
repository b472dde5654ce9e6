/*!
    Planar YUV 4:2:0 running file.
*/

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use tracing::{debug, info, warn};

use media_types::{Error, PixelFormat, Result, VideoFrame};

use crate::sink::FrameSink;

/**
    Appends frames to one stream as luma, then U, then V.

    Each chroma plane is `ceil(w/2) * ceil(h/2)` bytes, a quarter of the
    luma plane for even sizes. No header or framing is written.

    A frame is handed to the writer in a single `write_all`. Once a write
    fails the output can no longer be trusted to sit on a frame boundary,
    so every later write and `finish` fail too.
*/
#[derive(Debug)]
pub struct YuvFileSink<W: Write = BufWriter<File>> {
    writer: W,
    scratch: Vec<u8>,
    broken: bool,
    frames: u64,
    bytes: u64,
}

impl YuvFileSink {
    /**
        Create (or truncate) the output file, creating its parent directory.
    */
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        info!(path = %path.display(), "writing yuv420p");

        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> YuvFileSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            scratch: Vec::new(),
            broken: false,
            frames: 0,
            bytes: 0,
        }
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn check_usable(&self) -> Result<()> {
        if self.broken {
            return Err(Error::Io(io::Error::other(
                "yuv output is incomplete after an earlier write error",
            )));
        }
        Ok(())
    }
}

impl<W: Write + Send> FrameSink for YuvFileSink<W> {
    fn write_frame(&mut self, frame: &VideoFrame) -> Result<()> {
        self.check_usable()?;
        if frame.format != PixelFormat::Yuv420p {
            return Err(Error::conversion_failed(format!(
                "yuv output needs yuv420p frames, got {}",
                frame.format
            )));
        }
        if !frame.is_well_formed() {
            return Err(Error::conversion_failed("frame planes are malformed"));
        }

        self.scratch.clear();
        for plane in 0..3 {
            let (_, rows) = frame.plane_size(plane);
            for y in 0..rows {
                self.scratch.extend_from_slice(frame.row(plane, y));
            }
        }

        if let Err(e) = self.writer.write_all(&self.scratch) {
            warn!(sequence = frame.sequence, error = %e, "yuv write failed, output abandoned");
            self.broken = true;
            return Err(e.into());
        }

        self.bytes += self.scratch.len() as u64;
        self.frames += 1;
        debug!(sequence = frame.sequence, pts = ?frame.pts, "appended yuv frame");
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.check_usable()?;
        if let Err(e) = self.writer.flush() {
            self.broken = true;
            return Err(e.into());
        }
        Ok(())
    }

    fn frames_written(&self) -> u64 {
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use media_types::ErrorKind;

    use super::*;

    fn filled(width: u32, height: u32, values: [u8; 3]) -> VideoFrame {
        let mut frame = VideoFrame::new_zeroed(width, height, PixelFormat::Yuv420p, 16);
        for (plane, value) in values.into_iter().enumerate() {
            let (_, rows) = frame.plane_size(plane);
            for y in 0..rows {
                frame.row_mut(plane, y).fill(value);
            }
        }
        frame
    }

    #[test]
    fn appends_planes_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("video.yuv");
        let mut sink = YuvFileSink::create(&path).unwrap();

        sink.write_frame(&filled(4, 2, [1, 2, 3])).unwrap();
        sink.write_frame(&filled(4, 2, [4, 5, 6])).unwrap();
        sink.finish().unwrap();

        let bytes = fs::read(&path).unwrap();
        let mut expected = vec![1; 8];
        expected.extend([2, 2, 3, 3]);
        expected.extend([4; 8]);
        expected.extend([5, 5, 6, 6]);
        assert_eq!(bytes, expected);
        assert_eq!(sink.frames_written(), 2);
        assert_eq!(sink.bytes_written(), 24);
    }

    #[test]
    fn chroma_is_a_quarter_of_luma() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("video.yuv");
        let mut sink = YuvFileSink::create(&path).unwrap();
        sink.write_frame(&filled(16, 8, [0, 0, 0])).unwrap();
        sink.finish().unwrap();

        assert_eq!(fs::metadata(&path).unwrap().len(), 16 * 8 + 2 * (16 * 8 / 4));
    }

    #[test]
    fn other_formats_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = YuvFileSink::create(dir.path().join("video.yuv")).unwrap();

        let gray = VideoFrame::new_zeroed(4, 4, PixelFormat::Gray8, 1);
        let err = sink.write_frame(&gray).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConversionFailed);
        assert_eq!(sink.frames_written(), 0);
    }

    /// Accepts `room` bytes, then refuses everything.
    struct ShortWriter {
        data: Vec<u8>,
        room: usize,
    }

    impl Write for ShortWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.room == 0 {
                return Err(io::Error::new(io::ErrorKind::StorageFull, "disk full"));
            }
            let n = buf.len().min(self.room);
            self.data.extend_from_slice(&buf[..n]);
            self.room -= n;
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_error_stops_all_later_output() {
        // Room for one 4x2 frame (12 bytes) and part of the next.
        let writer = ShortWriter {
            data: Vec::new(),
            room: 17,
        };
        let mut sink = YuvFileSink::new(writer);

        sink.write_frame(&filled(4, 2, [1, 2, 3])).unwrap();
        let err = sink.write_frame(&filled(4, 2, [4, 5, 6])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IoFailed);

        let err = sink.write_frame(&filled(4, 2, [7, 8, 9])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IoFailed);
        assert_eq!(sink.finish().unwrap_err().kind(), ErrorKind::IoFailed);

        assert_eq!(sink.frames_written(), 1);
        assert_eq!(sink.bytes_written(), 12);
        let data = sink.into_inner().data;
        assert_eq!(&data[..12], &[1, 1, 1, 1, 1, 1, 1, 1, 2, 2, 3, 3]);
        assert!(!data[12..].contains(&7));
    }

    #[test]
    fn frames_are_written_whole() {
        let mut sink = YuvFileSink::new(Vec::new());
        sink.write_frame(&filled(3, 3, [9, 8, 7])).unwrap();
        sink.finish().unwrap();

        // 3x3 luma, 2x2 chroma planes.
        let mut expected = vec![9; 9];
        expected.extend([8; 4]);
        expected.extend([7; 4]);
        assert_eq!(sink.into_inner(), expected);
    }
}
