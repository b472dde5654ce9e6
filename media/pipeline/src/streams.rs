/*!
    Stream enumeration against a codec registry.
*/

use tracing::{info, warn};

use media_decode::CodecRegistry;
use media_source::Source;
use media_types::{Result, StreamDescriptor};

/**
    One stream of a source and the decoder that would handle it.
*/
#[derive(Clone, Debug, PartialEq)]
pub struct StreamEntry {
    pub descriptor: StreamDescriptor,
    /// Registered decoder name, or `None` if the codec is unsupported.
    pub decoder: Option<String>,
}

impl StreamEntry {
    pub fn is_supported(&self) -> bool {
        self.decoder.is_some()
    }
}

/**
    List every stream of a discovered source with its decoder.

    Streams whose codec has no decoder are logged and reported as
    unsupported; they do not stop the enumeration.
*/
pub fn enumerate_streams(source: &Source, registry: &dyn CodecRegistry) -> Result<Vec<StreamEntry>> {
    let info = source.info()?;

    let entries = info
        .streams()
        .iter()
        .map(|stream| {
            let decoder = registry
                .find_decoder(&stream.codec_id)
                .map(|factory| factory.name().to_string());
            match &decoder {
                Some(name) => info!(
                    stream = stream.index,
                    kind = %stream.kind,
                    codec = %stream.codec_id,
                    decoder = %name,
                    "decodable stream"
                ),
                None => warn!(
                    stream = stream.index,
                    kind = %stream.kind,
                    codec = %stream.codec_id,
                    "unsupported codec, skipping stream"
                ),
            }
            StreamEntry {
                descriptor: stream.clone(),
                decoder,
            }
        })
        .collect();

    Ok(entries)
}
