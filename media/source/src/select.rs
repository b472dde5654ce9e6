/*!
    Stream selection.
*/

use std::fmt;
use std::str::FromStr;

use media_types::{Error, MediaKind, ParseError, Result, SourceInfo, StreamDescriptor};

/**
    How to choose among several streams of the requested kind.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SelectionPolicy {
    /// The first stream in container order.
    #[default]
    First,
    /// The stream with the most pixels per frame.
    HighestResolution,
    /// The stream with the highest declared bitrate.
    HighestBitrate,
}

impl SelectionPolicy {
    pub const fn name(self) -> &'static str {
        match self {
            Self::First => "first",
            Self::HighestResolution => "resolution",
            Self::HighestBitrate => "bitrate",
        }
    }
}

impl fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SelectionPolicy {
    type Err = ParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "first" => Ok(Self::First),
            "resolution" | "highest-resolution" => Ok(Self::HighestResolution),
            "bitrate" | "highest-bitrate" => Ok(Self::HighestBitrate),
            _ => Err(ParseError {
                kind: "selection policy",
                value: s.to_string(),
            }),
        }
    }
}

/**
    Pick the best stream of `kind` according to `policy`.

    Returns the container index of the chosen stream, or
    [`Error::NoMatchingStream`] if the source has no stream of that kind.
*/
pub fn select_best_stream(
    info: &SourceInfo,
    kind: MediaKind,
    policy: SelectionPolicy,
) -> Result<usize> {
    select_best_stream_where(info, kind, policy, |_| true)
}

/**
    Like [`select_best_stream`], considering only the streams `accept` admits.

    Used to skip streams no decoder can handle.
*/
pub fn select_best_stream_where<A>(
    info: &SourceInfo,
    kind: MediaKind,
    policy: SelectionPolicy,
    accept: A,
) -> Result<usize>
where
    A: Fn(&StreamDescriptor) -> bool,
{
    let candidates = info.streams_of(kind).filter(|stream| accept(*stream));
    match policy {
        SelectionPolicy::First => best_of(candidates, kind, |_| 0u64),
        SelectionPolicy::HighestResolution => best_of(candidates, kind, |stream| {
            stream
                .dimensions()
                .map_or(0, |(w, h)| u64::from(w) * u64::from(h))
        }),
        SelectionPolicy::HighestBitrate => {
            best_of(candidates, kind, |stream| stream.bitrate.unwrap_or(0))
        }
    }
}

/**
    Pick the stream of `kind` with the highest `score`.

    Ties go to the stream that comes first in the container.
*/
pub fn select_best_stream_by<K, F>(info: &SourceInfo, kind: MediaKind, score: F) -> Result<usize>
where
    K: Ord,
    F: Fn(&StreamDescriptor) -> K,
{
    best_of(info.streams_of(kind), kind, score)
}

fn best_of<'a, I, K, F>(streams: I, kind: MediaKind, score: F) -> Result<usize>
where
    I: Iterator<Item = &'a StreamDescriptor>,
    K: Ord,
    F: Fn(&StreamDescriptor) -> K,
{
    let mut best: Option<(&StreamDescriptor, K)> = None;
    for stream in streams {
        let value = score(stream);
        if best.as_ref().is_none_or(|(_, current)| value > *current) {
            best = Some((stream, value));
        }
    }

    best.map(|(stream, _)| stream.index)
        .ok_or(Error::NoMatchingStream(kind))
}
