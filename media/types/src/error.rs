/*!
    Error types shared by every crate in the pipeline.
*/

use std::fmt;

use thiserror::Error;

use crate::{CodecId, MediaKind};

/**
    Errors produced while probing, decoding, converting or writing frames.

    `Pending` and `EndOfStream` are not errors; they are outcomes of
    the decode protocol and live on the decoder's result type instead.
*/
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to open source: {0}")]
    OpenFailed(String),

    #[error("no stream information: {0}")]
    NoStreamInfo(String),

    #[error("no {0} stream in source")]
    NoMatchingStream(MediaKind),

    #[error("no decoder for codec {0}")]
    UnsupportedCodec(CodecId),

    #[error("decoder rejected packet: {0}")]
    DecodeRejected(String),

    #[error("decoding failed: {0}")]
    DecodeFailed(String),

    #[error("frame conversion failed: {0}")]
    ConversionFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn open_failed(msg: impl Into<String>) -> Self {
        Self::OpenFailed(msg.into())
    }

    pub fn no_stream_info(msg: impl Into<String>) -> Self {
        Self::NoStreamInfo(msg.into())
    }

    pub fn decode_rejected(msg: impl Into<String>) -> Self {
        Self::DecodeRejected(msg.into())
    }

    pub fn decode_failed(msg: impl Into<String>) -> Self {
        Self::DecodeFailed(msg.into())
    }

    pub fn conversion_failed(msg: impl Into<String>) -> Self {
        Self::ConversionFailed(msg.into())
    }

    /**
        Returns the fieldless classification of this error.
    */
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::OpenFailed(_) => ErrorKind::OpenFailed,
            Self::NoStreamInfo(_) => ErrorKind::NoStreamInfo,
            Self::NoMatchingStream(_) => ErrorKind::NoMatchingStream,
            Self::UnsupportedCodec(_) => ErrorKind::UnsupportedCodec,
            Self::DecodeRejected(_) => ErrorKind::DecodeRejected,
            Self::DecodeFailed(_) => ErrorKind::DecodeFailed,
            Self::ConversionFailed(_) => ErrorKind::ConversionFailed,
            Self::Io(_) => ErrorKind::IoFailed,
        }
    }
}

/**
    Fieldless error classification, one per error variant.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    OpenFailed,
    NoStreamInfo,
    NoMatchingStream,
    UnsupportedCodec,
    DecodeRejected,
    DecodeFailed,
    ConversionFailed,
    IoFailed,
}

impl ErrorKind {
    /**
        How far an error of this kind propagates.
    */
    pub const fn scope(self) -> ErrorScope {
        match self {
            Self::OpenFailed | Self::NoStreamInfo | Self::NoMatchingStream => ErrorScope::Fatal,
            Self::UnsupportedCodec => ErrorScope::Stream,
            Self::DecodeRejected | Self::DecodeFailed => ErrorScope::Source,
            Self::ConversionFailed | Self::IoFailed => ErrorScope::Frame,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::OpenFailed => "open failed",
            Self::NoStreamInfo => "no stream info",
            Self::NoMatchingStream => "no matching stream",
            Self::UnsupportedCodec => "unsupported codec",
            Self::DecodeRejected => "decode rejected",
            Self::DecodeFailed => "decode failed",
            Self::ConversionFailed => "conversion failed",
            Self::IoFailed => "I/O failed",
        };
        f.write_str(name)
    }
}

/**
    Propagation scope of an error.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorScope {
    /// Nothing to work with; the whole pipeline stops.
    Fatal,
    /// Skip the stream when enumerating; fatal for the selected stream.
    Stream,
    /// Ends the decode loop for one source; a batch continues with the next.
    Source,
    /// Skip the frame unless fail-fast is configured.
    Frame,
}

/// Type alias for results that may return an [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/**
    Error returned by `FromStr` implementations on enum types.
*/
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseError {
    pub kind: &'static str,
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scopes_follow_propagation_policy() {
        assert_eq!(ErrorKind::OpenFailed.scope(), ErrorScope::Fatal);
        assert_eq!(ErrorKind::NoStreamInfo.scope(), ErrorScope::Fatal);
        assert_eq!(ErrorKind::NoMatchingStream.scope(), ErrorScope::Fatal);
        assert_eq!(ErrorKind::UnsupportedCodec.scope(), ErrorScope::Stream);
        assert_eq!(ErrorKind::DecodeRejected.scope(), ErrorScope::Source);
        assert_eq!(ErrorKind::DecodeFailed.scope(), ErrorScope::Source);
        assert_eq!(ErrorKind::ConversionFailed.scope(), ErrorScope::Frame);
        assert_eq!(ErrorKind::IoFailed.scope(), ErrorScope::Frame);
    }

    #[test]
    fn io_errors_convert() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::WriteZero, "short write").into();
        assert_eq!(err.kind(), ErrorKind::IoFailed);
        assert!(err.to_string().contains("short write"));
    }

    #[test]
    fn messages_name_the_subject() {
        let err = Error::NoMatchingStream(MediaKind::Video);
        assert_eq!(err.to_string(), "no video stream in source");

        let err = Error::UnsupportedCodec(CodecId::H264);
        assert_eq!(err.to_string(), "no decoder for codec h264");
    }
}
