/*!
    YUV4MPEG2 (Y4M) container support.

    Y4M is a plain header line followed by `FRAME` records, each carrying
    one tightly packed raw picture. It needs no external library, which
    makes it the built-in container of the pipeline.
*/

use std::io::{BufRead, Read, Write};
use std::time::Duration;

use tracing::{debug, warn};

use media_types::{
    CodecId, Error, MAX_FRAME_BYTES, Packet, PixelFormat, Rational, Result, SourceInfo,
    StreamDescriptor,
};

use crate::source::Demux;

/// Magic bytes at the start of every Y4M stream.
pub const Y4M_MAGIC: &[u8] = b"YUV4MPEG2";

const FRAME_MARKER: &[u8] = b"FRAME";
const MAX_HEADER_LEN: usize = 4096;
const DEFAULT_FRAME_RATE: Rational = Rational::new(25, 1);

/**
    Stream parameters carried by a Y4M header line.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Y4mHeader {
    pub width: u32,
    pub height: u32,
    pub frame_rate: Rational,
    pub format: PixelFormat,
    /// Interlacing tag (`p`, `t`, `b`, `m`), if given.
    pub interlace: Option<char>,
    /// Pixel aspect ratio, if given.
    pub aspect: Option<Rational>,
    /// Length of the header line including its newline.
    pub len: usize,
}

impl Y4mHeader {
    /**
        Parse a header line, with or without its trailing newline.
    */
    pub fn parse(line: &[u8]) -> Result<Self> {
        let len = line.len();
        let text = std::str::from_utf8(line)
            .map_err(|_| Error::no_stream_info("Y4M header is not ASCII"))?
            .trim_end_matches('\n');

        let mut tokens = text.split(' ');
        if tokens.next().map(str::as_bytes) != Some(Y4M_MAGIC) {
            return Err(Error::no_stream_info("missing YUV4MPEG2 signature"));
        }

        let mut width = None;
        let mut height = None;
        let mut frame_rate = None;
        let mut format = PixelFormat::Yuv420p;
        let mut interlace = None;
        let mut aspect = None;

        for token in tokens.filter(|t| !t.is_empty()) {
            let mut chars = token.chars();
            let tag = chars.next();
            let value = chars.as_str();
            match tag {
                Some('W') => width = Some(parse_dimension(value, "width")?),
                Some('H') => height = Some(parse_dimension(value, "height")?),
                Some('F') => frame_rate = Some(parse_ratio(value, "frame rate")?),
                Some('I') => interlace = value.chars().next(),
                Some('A') => aspect = Some(parse_ratio(value, "aspect ratio")?),
                Some('C') => format = colour_space(value)?,
                // Extension tags carry nothing the decoder needs
                Some('X') => {}
                _ => debug!(token, "ignoring unknown Y4M header tag"),
            }
        }

        let width = width.ok_or_else(|| Error::no_stream_info("Y4M header has no width"))?;
        let height = height.ok_or_else(|| Error::no_stream_info("Y4M header has no height"))?;
        if !format
            .checked_frame_size(width, height)
            .is_some_and(|size| size <= MAX_FRAME_BYTES)
        {
            return Err(Error::no_stream_info(format!(
                "Y4M picture of {width}x{height} {format} is too large"
            )));
        }

        Ok(Self {
            width,
            height,
            frame_rate: frame_rate
                .filter(|r| r.num > 0 && r.den > 0)
                .unwrap_or(DEFAULT_FRAME_RATE),
            format,
            interlace,
            aspect,
            len,
        })
    }

    /**
        Bytes of one picture payload.
    */
    pub fn frame_size(&self) -> usize {
        self.format.frame_size(self.width, self.height)
    }

    /**
        Describe the single raw video stream of this file.
    */
    pub fn descriptor(&self) -> StreamDescriptor {
        StreamDescriptor::video(
            0,
            CodecId::RawVideo,
            self.width,
            self.height,
            Some(self.format),
            self.frame_rate,
        )
    }
}

fn parse_dimension(value: &str, what: &str) -> Result<u32> {
    match value.parse::<u32>() {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(Error::no_stream_info(format!(
            "invalid Y4M {what} '{value}'"
        ))),
    }
}

fn parse_ratio(value: &str, what: &str) -> Result<Rational> {
    let invalid = || Error::no_stream_info(format!("invalid Y4M {what} '{value}'"));
    let (num, den) = value.split_once(':').ok_or_else(invalid)?;
    let num = num.parse::<i32>().map_err(|_| invalid())?;
    let den = den.parse::<i32>().map_err(|_| invalid())?;
    Ok(Rational::new(num, den))
}

fn colour_space(value: &str) -> Result<PixelFormat> {
    match value {
        "420jpeg" | "420paldv" | "420mpeg2" | "420" => Ok(PixelFormat::Yuv420p),
        "422" => Ok(PixelFormat::Yuv422p),
        "444" => Ok(PixelFormat::Yuv444p),
        "mono" => Ok(PixelFormat::Gray8),
        other => Err(Error::no_stream_info(format!(
            "unsupported Y4M colour space '{other}'"
        ))),
    }
}

/**
    Y4M colour space tag for a pixel format, if Y4M can carry it.
*/
pub fn colour_space_tag(format: PixelFormat) -> Option<&'static str> {
    match format {
        PixelFormat::Yuv420p => Some("420jpeg"),
        PixelFormat::Yuv422p => Some("422"),
        PixelFormat::Yuv444p => Some("444"),
        PixelFormat::Gray8 => Some("mono"),
        _ => None,
    }
}

/**
    Demuxer for Y4M streams.

    Produces one packet per `FRAME` record on stream 0, with
    `pts = dts = frame index` in a time base of one frame.
*/
pub struct Y4mDemuxer<R> {
    reader: R,
    header: Option<Y4mHeader>,
    /// Total byte length of the input, when known.
    total_len: Option<u64>,
    frame_index: i64,
    finished: bool,
    line: Vec<u8>,
}

impl<R: BufRead + Send> Y4mDemuxer<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            header: None,
            total_len: None,
            frame_index: 0,
            finished: false,
            line: Vec::with_capacity(64),
        }
    }

    /**
        Declare the input length so duration and bitrate can be computed.
    */
    pub fn with_total_len(mut self, total_len: u64) -> Self {
        self.total_len = Some(total_len);
        self
    }

    pub fn header(&self) -> Option<&Y4mHeader> {
        self.header.as_ref()
    }

    fn read_header(&mut self) -> Result<Y4mHeader> {
        let mut line = Vec::new();
        (&mut self.reader)
            .take(MAX_HEADER_LEN as u64)
            .read_until(b'\n', &mut line)?;

        if line.last() != Some(&b'\n') {
            return Err(Error::no_stream_info("unterminated Y4M header line"));
        }
        Y4mHeader::parse(&line)
    }

    /**
        Duration and bitrate, when the input length holds a whole number of frames.
    */
    fn totals(&self, header: &Y4mHeader) -> (Option<Duration>, Option<u64>) {
        let Some(total_len) = self.total_len else {
            return (None, None);
        };

        let record = (FRAME_MARKER.len() + 1 + header.frame_size()) as u64;
        let body = total_len.saturating_sub(header.len as u64);
        if body == 0 || body % record != 0 {
            return (None, None);
        }

        let frames = body / record;
        let seconds = frames as f64 / header.frame_rate.to_f64();
        if !seconds.is_finite() || seconds <= 0.0 {
            return (None, None);
        }

        let bitrate = (total_len as f64 * 8.0 / seconds) as u64;
        (Some(Duration::from_secs_f64(seconds)), Some(bitrate))
    }

    /**
        Fill `buf` completely, returning how many bytes were available.
    */
    fn read_payload(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(filled)
    }
}

impl<R: BufRead + Send> Demux for Y4mDemuxer<R> {
    fn format_name(&self) -> &str {
        "yuv4mpegpipe"
    }

    fn discover(&mut self) -> Result<SourceInfo> {
        let header = match &self.header {
            Some(header) => header.clone(),
            None => {
                let header = self.read_header()?;
                self.header = Some(header.clone());
                header
            }
        };

        let (duration, bitrate) = self.totals(&header);
        let mut stream = header.descriptor();
        stream.duration = duration;
        stream.bitrate = bitrate;

        Ok(SourceInfo::new(self.format_name(), vec![stream])
            .with_duration(duration)
            .with_bitrate(bitrate))
    }

    fn read_packet(&mut self) -> Result<Option<Packet>> {
        let Some(frame_size) = self.header.as_ref().map(Y4mHeader::frame_size) else {
            return Err(Error::no_stream_info("Y4M header has not been read"));
        };
        if self.finished {
            return Ok(None);
        }

        self.line.clear();
        let n = (&mut self.reader)
            .take(MAX_HEADER_LEN as u64)
            .read_until(b'\n', &mut self.line)?;
        if n == 0 {
            self.finished = true;
            return Ok(None);
        }
        if !self.line.starts_with(FRAME_MARKER) {
            return Err(Error::open_failed(format!(
                "malformed Y4M frame marker after frame {}",
                self.frame_index
            )));
        }
        if self.line.last() != Some(&b'\n') {
            warn!(frame = self.frame_index, "Y4M stream ends inside a frame header");
            self.finished = true;
            return Ok(None);
        }

        let mut data = vec![0; frame_size];
        let filled = self.read_payload(&mut data)?;
        if filled < frame_size {
            warn!(
                frame = self.frame_index,
                expected = frame_size,
                got = filled,
                "truncated Y4M frame at end of stream"
            );
            self.finished = true;
            return Ok(None);
        }

        let index = self.frame_index;
        self.frame_index += 1;

        Ok(Some(
            Packet::new(data, 0)
                .with_timestamps(Some(index), Some(index))
                .with_duration(1)
                .with_keyframe(true),
        ))
    }
}

/**
    Writes Y4M streams, frame by frame.
*/
pub struct Y4mWriter<W: Write> {
    writer: W,
    frame_size: usize,
}

impl<W: Write> Y4mWriter<W> {
    /**
        Write the header line and return a writer for the frames.
    */
    pub fn new(
        mut writer: W,
        width: u32,
        height: u32,
        format: PixelFormat,
        frame_rate: Rational,
    ) -> Result<Self> {
        let tag = colour_space_tag(format).ok_or_else(|| {
            Error::conversion_failed(format!("{format} cannot be stored in Y4M"))
        })?;

        writeln!(
            writer,
            "YUV4MPEG2 W{width} H{height} F{}:{} Ip A1:1 C{tag}",
            frame_rate.num, frame_rate.den
        )?;

        let frame_size = format
            .checked_frame_size(width, height)
            .filter(|&size| size <= MAX_FRAME_BYTES)
            .ok_or_else(|| {
                Error::conversion_failed(format!("{width}x{height} pictures are too large"))
            })?;

        Ok(Self { writer, frame_size })
    }

    /**
        Append one tightly packed picture.
    */
    pub fn write_frame(&mut self, data: &[u8]) -> Result<()> {
        if data.len() != self.frame_size {
            return Err(Error::conversion_failed(format!(
                "frame is {} bytes, expected {}",
                data.len(),
                self.frame_size
            )));
        }
        self.writer.write_all(FRAME_MARKER)?;
        self.writer.write_all(b"\n")?;
        self.writer.write_all(data)?;
        Ok(())
    }

    pub fn into_inner(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}
