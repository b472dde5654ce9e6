/*!
    Stream information types.
*/

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::{CodecId, ParseError, PixelFormat, Rational};

/**
    The kind of media an elementary stream carries.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum MediaKind {
    #[default]
    Video,
    Audio,
    Other,
}

impl MediaKind {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MediaKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "video" | "v" => Ok(Self::Video),
            "audio" | "a" => Ok(Self::Audio),
            "other" | "data" => Ok(Self::Other),
            _ => Err(ParseError {
                kind: "media kind",
                value: s.to_string(),
            }),
        }
    }
}

/**
    Kind-specific stream parameters.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamParams {
    Video {
        width: u32,
        height: u32,
        /// Pixel format, if the decoder output format is one we know.
        pixel_format: Option<PixelFormat>,
    },
    Audio {
        channels: u16,
        sample_rate: u32,
    },
    Other,
}

/**
    Description of one elementary stream, populated from the container header.
*/
#[derive(Clone, Debug, PartialEq)]
pub struct StreamDescriptor {
    /// Position of this stream in the container.
    pub index: usize,
    pub kind: MediaKind,
    pub codec_id: CodecId,
    pub params: StreamParams,
    /// Time base for packet timestamps.
    pub time_base: Rational,
    /// Frame rate (may be unavailable).
    pub frame_rate: Option<Rational>,
    /// Declared bitrate in bits per second (if known).
    pub bitrate: Option<u64>,
    /// Stream duration (may be unavailable).
    pub duration: Option<Duration>,
    /// Codec extradata (SPS/PPS for H.264, VPS/SPS/PPS for H.265, etc.).
    pub extradata: Option<Vec<u8>>,
}

impl StreamDescriptor {
    /**
        Describe a video stream.
    */
    pub fn video(
        index: usize,
        codec_id: CodecId,
        width: u32,
        height: u32,
        pixel_format: Option<PixelFormat>,
        frame_rate: Rational,
    ) -> Self {
        Self {
            index,
            kind: MediaKind::Video,
            codec_id,
            params: StreamParams::Video {
                width,
                height,
                pixel_format,
            },
            time_base: frame_rate.invert(),
            frame_rate: Some(frame_rate),
            bitrate: None,
            duration: None,
            extradata: None,
        }
    }

    /**
        Describe an audio stream.
    */
    pub fn audio(index: usize, codec_id: CodecId, channels: u16, sample_rate: u32) -> Self {
        Self {
            index,
            kind: MediaKind::Audio,
            codec_id,
            params: StreamParams::Audio {
                channels,
                sample_rate,
            },
            time_base: Rational::new(1, sample_rate as i32),
            frame_rate: None,
            bitrate: None,
            duration: None,
            extradata: None,
        }
    }

    pub fn with_bitrate(mut self, bitrate: u64) -> Self {
        self.bitrate = Some(bitrate);
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /**
        Returns `(width, height)` for video streams.
    */
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match self.params {
            StreamParams::Video { width, height, .. } => Some((width, height)),
            _ => None,
        }
    }

    /**
        Returns the pixel format for video streams, if known.
    */
    pub fn pixel_format(&self) -> Option<PixelFormat> {
        match self.params {
            StreamParams::Video { pixel_format, .. } => pixel_format,
            _ => None,
        }
    }

    /**
        Returns the frame rate as fps, if available.
    */
    pub fn fps(&self) -> Option<f64> {
        self.frame_rate.map(|r| r.to_f64())
    }
}

/**
    Container-level information about a media source.

    The stream list is fixed once stream discovery completes.
*/
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SourceInfo {
    /// Short name of the container format.
    pub format_name: String,
    /// Total duration of the media (may be unavailable).
    pub duration: Option<Duration>,
    /// Overall bitrate in bits per second (if known).
    pub bitrate: Option<u64>,
    streams: Vec<StreamDescriptor>,
}

impl SourceInfo {
    pub fn new(format_name: impl Into<String>, streams: Vec<StreamDescriptor>) -> Self {
        Self {
            format_name: format_name.into(),
            duration: None,
            bitrate: None,
            streams,
        }
    }

    pub fn with_duration(mut self, duration: Option<Duration>) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_bitrate(mut self, bitrate: Option<u64>) -> Self {
        self.bitrate = bitrate;
        self
    }

    pub fn streams(&self) -> &[StreamDescriptor] {
        &self.streams
    }

    pub fn stream(&self, index: usize) -> Option<&StreamDescriptor> {
        self.streams.get(index)
    }

    /**
        Iterate over streams of one kind, in container order.
    */
    pub fn streams_of(&self, kind: MediaKind) -> impl Iterator<Item = &StreamDescriptor> {
        self.streams.iter().filter(move |s| s.kind == kind)
    }

    pub fn has_video(&self) -> bool {
        self.streams_of(MediaKind::Video).next().is_some()
    }

    pub fn has_audio(&self) -> bool {
        self.streams_of(MediaKind::Audio).next().is_some()
    }
}
