/*!
    Codec identifiers.
*/

use std::fmt;

use crate::MediaKind;

/**
    Identifies the codec of an elementary stream.

    This is a subset of codecs commonly encountered in containers; anything
    else is carried by name in [`CodecId::Unknown`].
*/
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CodecId {
    /// Uncompressed video, one frame per packet.
    RawVideo,
    H264,
    Hevc,
    Vp8,
    Vp9,
    Av1,
    Mpeg4,
    Mpeg2Video,
    Mjpeg,
    Aac,
    Mp3,
    Opus,
    Vorbis,
    Flac,
    Pcm,
    /// A codec outside the known set, by its short name.
    Unknown(String),
}

impl CodecId {
    /**
        Short lowercase codec name, matching the names FFmpeg uses.
    */
    pub fn name(&self) -> &str {
        match self {
            Self::RawVideo => "rawvideo",
            Self::H264 => "h264",
            Self::Hevc => "hevc",
            Self::Vp8 => "vp8",
            Self::Vp9 => "vp9",
            Self::Av1 => "av1",
            Self::Mpeg4 => "mpeg4",
            Self::Mpeg2Video => "mpeg2video",
            Self::Mjpeg => "mjpeg",
            Self::Aac => "aac",
            Self::Mp3 => "mp3",
            Self::Opus => "opus",
            Self::Vorbis => "vorbis",
            Self::Flac => "flac",
            Self::Pcm => "pcm",
            Self::Unknown(name) => name,
        }
    }

    /**
        Map a short codec name to an id. Unrecognized names become `Unknown`.
    */
    pub fn from_name(name: &str) -> Self {
        match name {
            "rawvideo" => Self::RawVideo,
            "h264" => Self::H264,
            "hevc" | "h265" => Self::Hevc,
            "vp8" => Self::Vp8,
            "vp9" => Self::Vp9,
            "av1" => Self::Av1,
            "mpeg4" => Self::Mpeg4,
            "mpeg2video" => Self::Mpeg2Video,
            "mjpeg" => Self::Mjpeg,
            "aac" => Self::Aac,
            "mp3" => Self::Mp3,
            "opus" => Self::Opus,
            "vorbis" => Self::Vorbis,
            "flac" => Self::Flac,
            name if name.starts_with("pcm") => Self::Pcm,
            other => Self::Unknown(other.to_string()),
        }
    }

    /**
        The media kind this codec produces, if known.
    */
    pub fn kind(&self) -> MediaKind {
        match self {
            Self::RawVideo
            | Self::H264
            | Self::Hevc
            | Self::Vp8
            | Self::Vp9
            | Self::Av1
            | Self::Mpeg4
            | Self::Mpeg2Video
            | Self::Mjpeg => MediaKind::Video,
            Self::Aac | Self::Mp3 | Self::Opus | Self::Vorbis | Self::Flac | Self::Pcm => {
                MediaKind::Audio
            }
            Self::Unknown(_) => MediaKind::Other,
        }
    }
}

impl fmt::Display for CodecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
