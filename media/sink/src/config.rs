/*!
    Sink configuration.
*/

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use media_types::{ParseError, PixelFormat};

/// File name prefix of per-frame artifacts.
pub const DEFAULT_PREFIX: &str = "frame";

/**
    On-disk artifact format.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    /// One binary greymap per frame, from the luma plane.
    #[default]
    Pgm,
    /// Planar YUV 4:2:0 frames appended to one file.
    Yuv,
}

impl OutputFormat {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Pgm => "pgm",
            Self::Yuv => "yuv",
        }
    }

    /**
        The pixel format frames must be converted to before writing, if any.

        PGM reads the first plane of any grey or YUV frame as is.
    */
    pub const fn required_pixel_format(self) -> Option<PixelFormat> {
        match self {
            Self::Pgm => None,
            Self::Yuv => Some(PixelFormat::Yuv420p),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OutputFormat {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pgm" => Ok(Self::Pgm),
            "yuv" | "yuv420p" => Ok(Self::Yuv),
            _ => Err(ParseError {
                kind: "output format",
                value: s.to_string(),
            }),
        }
    }
}

/**
    Where and how frames are written.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SinkConfig {
    pub format: OutputFormat,
    /// Output directory for PGM, output file for YUV.
    pub path: PathBuf,
    /// PGM file name prefix.
    pub prefix: String,
}

impl SinkConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            format: OutputFormat::default(),
            path: path.into(),
            prefix: DEFAULT_PREFIX.to_string(),
        }
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self::new(".")
    }
}
