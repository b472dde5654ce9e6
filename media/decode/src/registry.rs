/*!
    Codec registry: which decoder handles which codec.
*/

use std::fmt;
use std::sync::Arc;

use media_types::{CodecId, MediaKind, Result, StreamDescriptor};

use crate::backend::DecodeBackend;
use crate::config::DecoderConfig;
use crate::raw::RawVideoFactory;

/**
    Creates decoder backends for one family of codecs.
*/
pub trait DecoderFactory: Send + Sync {
    /// Decoder name, as shown in capability listings.
    fn name(&self) -> &str;

    /// Media kind this decoder produces.
    fn kind(&self) -> MediaKind;

    /// Open a backend for `stream`.
    fn create(
        &self,
        stream: &StreamDescriptor,
        config: &DecoderConfig,
    ) -> Result<Box<dyn DecodeBackend>>;
}

/**
    One entry of a registry's capability listing.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodecDescriptor {
    pub name: String,
    pub codec_id: CodecId,
    pub kind: MediaKind,
}

impl fmt::Display for CodecDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} {})", self.codec_id, self.kind, self.name)
    }
}

/**
    Read-only lookup of decoders by codec id.
*/
pub trait CodecRegistry: Send + Sync {
    /// The decoder for `codec`, if one is registered.
    fn find_decoder(&self, codec: &CodecId) -> Option<&dyn DecoderFactory>;

    /// Every registered decoder.
    fn decoders(&self) -> Vec<CodecDescriptor>;

    fn supports(&self, codec: &CodecId) -> bool {
        self.find_decoder(codec).is_some()
    }
}

/**
    The default registry: a list of codec ids with their factories.
*/
#[derive(Clone, Default)]
pub struct Registry {
    entries: Vec<(CodecId, Arc<dyn DecoderFactory>)>,
}

impl Registry {
    /**
        An empty registry.
    */
    pub fn new() -> Self {
        Self::default()
    }

    /**
        The decoders that need no external library: raw video.
    */
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(CodecId::RawVideo, Arc::new(RawVideoFactory));
        registry
    }

    /**
        Built-in decoders plus FFmpeg decoders for the compressed video
        codecs this FFmpeg build can decode.
    */
    #[cfg(feature = "ffmpeg")]
    pub fn with_ffmpeg() -> Result<Self> {
        use crate::ffmpeg::FfmpegVideoFactory;

        ffmpeg_next::init().map_err(|e| media_types::Error::open_failed(e.to_string()))?;

        let mut registry = Self::builtin();
        for codec in [
            CodecId::H264,
            CodecId::Hevc,
            CodecId::Vp8,
            CodecId::Vp9,
            CodecId::Av1,
            CodecId::Mpeg4,
            CodecId::Mpeg2Video,
            CodecId::Mjpeg,
        ] {
            if let Some(factory) = FfmpegVideoFactory::for_codec(&codec) {
                registry.register(codec, Arc::new(factory));
            }
        }
        Ok(registry)
    }

    /**
        The richest registry this build offers.
    */
    pub fn default_for_build() -> Self {
        #[cfg(feature = "ffmpeg")]
        match Self::with_ffmpeg() {
            Ok(registry) => return registry,
            Err(e) => tracing::warn!(error = %e, "FFmpeg unavailable, using built-in decoders"),
        }
        Self::builtin()
    }

    /**
        Register `factory` for `codec`, replacing any previous entry.
    */
    pub fn register(&mut self, codec: CodecId, factory: Arc<dyn DecoderFactory>) {
        match self.entries.iter_mut().find(|(id, _)| *id == codec) {
            Some(entry) => entry.1 = factory,
            None => self.entries.push((codec, factory)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CodecRegistry for Registry {
    fn find_decoder(&self, codec: &CodecId) -> Option<&dyn DecoderFactory> {
        self.entries
            .iter()
            .find(|(id, _)| id == codec)
            .map(|(_, factory)| factory.as_ref())
    }

    fn decoders(&self) -> Vec<CodecDescriptor> {
        self.entries
            .iter()
            .map(|(codec, factory)| CodecDescriptor {
                name: factory.name().to_string(),
                codec_id: codec.clone(),
                kind: factory.kind(),
            })
            .collect()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(codec, _)| codec))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_has_raw_video() {
        let registry = Registry::builtin();
        assert!(registry.supports(&CodecId::RawVideo));
        assert!(!registry.supports(&CodecId::H264));
        assert_eq!(
            registry.decoders(),
            vec![CodecDescriptor {
                name: "rawvideo".to_string(),
                codec_id: CodecId::RawVideo,
                kind: MediaKind::Video,
            }]
        );
    }

    #[test]
    fn register_replaces_existing_entry() {
        let mut registry = Registry::builtin();
        registry.register(CodecId::RawVideo, Arc::new(RawVideoFactory));
        assert_eq!(registry.len(), 1);

        registry.register(CodecId::Unknown("v210".to_string()), Arc::new(RawVideoFactory));
        assert_eq!(registry.len(), 2);
        assert!(registry.supports(&CodecId::Unknown("v210".to_string())));
    }

    #[test]
    fn empty_registry_finds_nothing() {
        let registry = Registry::new();
        assert!(registry.is_empty());
        assert!(registry.find_decoder(&CodecId::RawVideo).is_none());
    }
}
