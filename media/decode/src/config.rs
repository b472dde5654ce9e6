/*!
    Decoder configuration.
*/

/**
    Configuration for opening a video decoder.

    # Example

    ```ignore
    let config = DecoderConfig::default()
        .with_stride_align(64)
        .with_frame_delay(2);
    ```
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Row alignment in bytes for decoded planes. Strides are rounded up to
    /// a multiple of this, so a stride may exceed the visible row width.
    pub stride_align: usize,
    /// Maximum number of packets a backend holds before it reports `Full`.
    pub queue_depth: usize,
    /// Frames withheld until more input or end of stream arrives
    /// (raw decoder only; models reference frame buffering).
    pub frame_delay: usize,
    /// Decoder threads (FFmpeg only; `None` lets FFmpeg decide).
    pub threads: Option<usize>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            stride_align: 32,
            queue_depth: 16,
            frame_delay: 0,
            threads: None,
        }
    }
}

impl DecoderConfig {
    pub fn with_stride_align(mut self, align: usize) -> Self {
        self.stride_align = align;
        self
    }

    pub fn with_queue_depth(mut self, depth: usize) -> Self {
        self.queue_depth = depth;
        self
    }

    pub fn with_frame_delay(mut self, frames: usize) -> Self {
        self.frame_delay = frames;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }
}
