/*!
    Frame sink trait.
*/

use media_types::{Result, VideoFrame};

use crate::config::{OutputFormat, SinkConfig};
use crate::pgm::PgmSequenceSink;
use crate::yuv::YuvFileSink;

/**
    Destination for decoded frames.

    A failed `write_frame` affects only that frame; the sink stays usable.
*/
pub trait FrameSink: Send {
    /// Write one frame.
    fn write_frame(&mut self, frame: &VideoFrame) -> Result<()>;

    /// Flush buffered output. Called once after the last frame.
    fn finish(&mut self) -> Result<()>;

    /// Frames written so far.
    fn frames_written(&self) -> u64;
}

/**
    Open the sink described by `config`, creating its directory or file.
*/
pub fn open_sink(config: &SinkConfig) -> Result<Box<dyn FrameSink>> {
    Ok(match config.format {
        OutputFormat::Pgm => {
            Box::new(PgmSequenceSink::create(&config.path)?.with_prefix(&config.prefix))
        }
        OutputFormat::Yuv => Box::new(YuvFileSink::create(&config.path)?),
    })
}

#[cfg(test)]
mod tests {
    use media_types::PixelFormat;

    use super::*;

    #[test]
    fn opens_sink_for_format() {
        let dir = tempfile::tempdir().unwrap();
        let frame = VideoFrame::new_zeroed(4, 2, PixelFormat::Yuv420p, 1);

        let mut pgm = open_sink(&SinkConfig::new(dir.path().join("frames"))).unwrap();
        let mut numbered = frame.clone();
        numbered.sequence = 1;
        pgm.write_frame(&numbered).unwrap();
        pgm.finish().unwrap();
        assert!(dir.path().join("frames/frame-1.pgm").is_file());

        let yuv_config = SinkConfig::new(dir.path().join("out.yuv")).with_format(OutputFormat::Yuv);
        let mut yuv = open_sink(&yuv_config).unwrap();
        yuv.write_frame(&frame).unwrap();
        yuv.finish().unwrap();
        assert_eq!(yuv.frames_written(), 1);
        assert_eq!(std::fs::metadata(dir.path().join("out.yuv")).unwrap().len(), 12);
    }
}
