/*!
    Pipeline configuration.
*/

use media_decode::DecoderConfig;
use media_sink::SinkConfig;
use media_source::{SelectionPolicy, SourceConfig};
use media_transform::VideoTransformConfig;
use media_types::MediaKind;

/**
    Everything a pipeline run needs besides its input.
*/
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Media kind of the stream to decode.
    pub kind: MediaKind,
    /// How to pick among several streams of `kind`.
    pub selection: SelectionPolicy,
    /// Decode this stream index instead of selecting one.
    pub stream: Option<usize>,
    /// Stop after this many decoded frames. `None` decodes everything.
    pub max_frames: Option<u64>,
    pub output: SinkConfig,
    /// Convert frames before writing. YUV output always converts to yuv420p.
    pub conversion: Option<VideoTransformConfig>,
    pub source: SourceConfig,
    pub decoder: DecoderConfig,
    /// Abort on the first frame that fails to convert or write.
    pub fail_fast: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            kind: MediaKind::Video,
            selection: SelectionPolicy::default(),
            stream: None,
            max_frames: None,
            output: SinkConfig::default(),
            conversion: None,
            source: SourceConfig::default(),
            decoder: DecoderConfig::default(),
            fail_fast: false,
        }
    }
}

impl PipelineConfig {
    pub fn with_kind(mut self, kind: MediaKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_selection(mut self, selection: SelectionPolicy) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_stream(mut self, index: usize) -> Self {
        self.stream = Some(index);
        self
    }

    pub fn with_max_frames(mut self, frames: u64) -> Self {
        self.max_frames = Some(frames);
        self
    }

    pub fn with_output(mut self, output: SinkConfig) -> Self {
        self.output = output;
        self
    }

    pub fn with_conversion(mut self, conversion: VideoTransformConfig) -> Self {
        self.conversion = Some(conversion);
        self
    }

    pub fn with_source(mut self, source: SourceConfig) -> Self {
        self.source = source;
        self
    }

    pub fn with_decoder(mut self, decoder: DecoderConfig) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /**
        The conversion applied before the sink, after reconciling the
        configured conversion with the pixel format the output requires.
    */
    pub fn effective_conversion(&self) -> Option<VideoTransformConfig> {
        match (self.conversion, self.output.format.required_pixel_format()) {
            (Some(conversion), Some(format)) => Some(VideoTransformConfig {
                format,
                ..conversion
            }),
            (None, Some(format)) => Some(VideoTransformConfig::new(format)),
            (conversion, None) => conversion,
        }
    }
}

#[cfg(test)]
mod tests {
    use media_sink::OutputFormat;
    use media_transform::ScalingAlgorithm;
    use media_types::PixelFormat;

    use super::*;

    #[test]
    fn pgm_output_converts_only_on_request() {
        let config = PipelineConfig::default();
        assert_eq!(config.effective_conversion(), None);

        let config = config.with_conversion(VideoTransformConfig::new(PixelFormat::Gray8));
        assert_eq!(
            config.effective_conversion().map(|c| c.format),
            Some(PixelFormat::Gray8)
        );
    }

    #[test]
    fn yuv_output_forces_yuv420p() {
        let output = SinkConfig::new("out.yuv").with_format(OutputFormat::Yuv);
        let config = PipelineConfig::default().with_output(output.clone());
        assert_eq!(
            config.effective_conversion(),
            Some(VideoTransformConfig::new(PixelFormat::Yuv420p))
        );

        let requested = VideoTransformConfig::new(PixelFormat::Rgb24)
            .with_size(32, 16)
            .with_algorithm(ScalingAlgorithm::Bicubic);
        let config = PipelineConfig::default()
            .with_output(output)
            .with_conversion(requested);
        assert_eq!(
            config.effective_conversion(),
            Some(
                VideoTransformConfig::new(PixelFormat::Yuv420p)
                    .with_size(32, 16)
                    .with_algorithm(ScalingAlgorithm::Bicubic)
            )
        );
    }
}
