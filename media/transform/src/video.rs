/*!
    Video frame transformation.
*/

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use media_types::{Error, ParseError, PixelFormat, Result, VideoFrame};

use crate::colour::{Family, component_sizes, compose, convert_family, decompose};
use crate::scale::PlaneScaler;

/**
    Scaling algorithm for video resizing.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ScalingAlgorithm {
    /// Nearest neighbor - fastest, lowest quality.
    Nearest,
    /// Bilinear interpolation - fast, acceptable quality.
    Bilinear,
    /// Bicubic interpolation - sharper, may ring on hard edges.
    Bicubic,
    /// Area averaging - the best choice for downscaling.
    #[default]
    Area,
}

impl ScalingAlgorithm {
    pub const ALL: [ScalingAlgorithm; 4] = [Self::Nearest, Self::Bilinear, Self::Bicubic, Self::Area];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Nearest => "nearest",
            Self::Bilinear => "bilinear",
            Self::Bicubic => "bicubic",
            Self::Area => "area",
        }
    }
}

impl fmt::Display for ScalingAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScalingAlgorithm {
    type Err = ParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|algorithm| algorithm.name() == lower)
            .ok_or_else(|| ParseError {
                kind: "scaling algorithm",
                value: s.to_string(),
            })
    }
}

/**
    Configuration for video transformation.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VideoTransformConfig {
    /// Target width and height in pixels. `None` keeps the source size.
    pub size: Option<(u32, u32)>,
    /// Target pixel format.
    pub format: PixelFormat,
    /// Scaling algorithm to use.
    pub algorithm: ScalingAlgorithm,
}

impl VideoTransformConfig {
    /**
        Convert to `format`, keeping the source size.
    */
    pub fn new(format: PixelFormat) -> Self {
        Self {
            size: None,
            format,
            algorithm: ScalingAlgorithm::default(),
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = Some((width, height));
        self
    }

    /**
        Set the scaling algorithm.
    */
    pub fn with_algorithm(mut self, algorithm: ScalingAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /**
        Output size for a `width` x `height` input.
    */
    pub fn target_size(&self, width: u32, height: u32) -> (u32, u32) {
        self.size.unwrap_or((width, height))
    }
}

/**
    Video frame transformer.

    Converts video frames between formats, handling:
    - Pixel format conversion (YUV to RGB, grey to YUV, NV12 to planar, etc.)
    - Scaling to different dimensions
    - Stride handling

    The scale context is lazily built on first use and rebuilt whenever
    the input size or format changes.
*/
#[derive(Debug)]
pub struct VideoTransform {
    config: VideoTransformConfig,
    /// Cached scale context and the input format it was built for.
    context: Option<ScaleContext>,
    rebuilds: usize,
}

/**
    Per-component filters for one source/target pairing.
*/
#[derive(Debug)]
struct ScaleContext {
    src_width: u32,
    src_height: u32,
    src_format: PixelFormat,
    dst_width: u32,
    dst_height: u32,
    dst_format: PixelFormat,
    scalers: Vec<PlaneScaler>,
}

impl ScaleContext {
    fn new(frame: &VideoFrame, config: &VideoTransformConfig) -> Self {
        let (dst_width, dst_height) = config.target_size(frame.width, frame.height);
        let from = Family::of(frame.format);
        let to = Family::of(config.format);

        // Component sizes after colour conversion, before scaling
        let intermediate = if from == to {
            component_sizes(frame.format, frame.width, frame.height)
        } else {
            vec![(frame.width as usize, frame.height as usize); to.components()]
        };
        let target = component_sizes(config.format, dst_width, dst_height);

        let scalers = intermediate
            .into_iter()
            .zip(target)
            .map(|(src, dst)| PlaneScaler::new(src, dst, config.algorithm))
            .collect();

        Self {
            src_width: frame.width,
            src_height: frame.height,
            src_format: frame.format,
            dst_width,
            dst_height,
            dst_format: config.format,
            scalers,
        }
    }

    fn matches(&self, frame: &VideoFrame) -> bool {
        self.src_width == frame.width
            && self.src_height == frame.height
            && self.src_format == frame.format
    }

    fn run(&self, frame: &VideoFrame) -> Result<VideoFrame> {
        let components = convert_family(
            decompose(frame)?,
            Family::of(self.src_format),
            Family::of(self.dst_format),
            (self.src_width as usize, self.src_height as usize),
        );

        let scaled = components
            .iter()
            .zip(&self.scalers)
            .map(|(component, scaler)| {
                if (component.width, component.height) != scaler.source_size() {
                    return Err(Error::conversion_failed(format!(
                        "component is {}x{}, scaler expects {:?}",
                        component.width,
                        component.height,
                        scaler.source_size()
                    )));
                }
                Ok(scaler.scale(component))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut output = compose(self.dst_format, self.dst_width, self.dst_height, scaled)?
            .with_pts(frame.pts)
            .with_keyframe(frame.is_keyframe);
        output.sequence = frame.sequence;
        Ok(output)
    }
}

impl VideoTransform {
    /**
        Create a new video transformer with the given configuration.
    */
    pub fn new(config: VideoTransformConfig) -> Self {
        Self {
            config,
            context: None,
            rebuilds: 0,
        }
    }

    /**
        Get the target configuration.
    */
    pub fn config(&self) -> &VideoTransformConfig {
        &self.config
    }

    /**
        Number of scale contexts built so far.
    */
    pub fn rebuild_count(&self) -> usize {
        self.rebuilds
    }

    /**
        Transform a video frame to the target format.

        The source frame is left untouched. When its size and format
        already match the target, an identical copy is returned without
        building a context.
    */
    pub fn transform(&mut self, frame: &VideoFrame) -> Result<VideoFrame> {
        if frame.width == 0 || frame.height == 0 {
            return Err(Error::conversion_failed("input frame has zero dimensions"));
        }
        if !frame.is_well_formed() {
            return Err(Error::conversion_failed(format!(
                "input frame planes do not fit {}x{} {}",
                frame.width, frame.height, frame.format
            )));
        }

        let (width, height) = self.config.target_size(frame.width, frame.height);
        if width == 0 || height == 0 {
            return Err(Error::conversion_failed("target size has zero dimensions"));
        }

        if (frame.width, frame.height, frame.format) == (width, height, self.config.format) {
            return Ok(frame.clone());
        }

        let context = match self.context.take() {
            Some(context) if context.matches(frame) => context,
            _ => {
                debug!(
                    src_width = frame.width,
                    src_height = frame.height,
                    src_format = %frame.format,
                    width,
                    height,
                    format = %self.config.format,
                    algorithm = %self.config.algorithm,
                    "building scale context"
                );
                self.rebuilds += 1;
                ScaleContext::new(frame, &self.config)
            }
        };

        let result = context.run(frame);
        self.context = Some(context);
        result
    }
}

/**
    Convert `frame` to `format` at its own size with the default algorithm.
*/
pub fn convert(frame: &VideoFrame, format: PixelFormat) -> Result<VideoFrame> {
    VideoTransform::new(VideoTransformConfig::new(format)).transform(frame)
}

#[cfg(test)]
mod tests {
    use media_types::{ErrorKind, Plane};

    use super::*;

    fn gray(width: u32, height: u32, data: Vec<u8>) -> VideoFrame {
        VideoFrame::from_packed(width, height, PixelFormat::Gray8, &data, 1).unwrap()
    }

    #[test]
    fn same_format_returns_identical_planes() {
        let data: Vec<u8> = (0..PixelFormat::Yuv420p.frame_size(6, 4))
            .map(|i| i as u8)
            .collect();
        let frame = VideoFrame::from_packed(6, 4, PixelFormat::Yuv420p, &data, 32)
            .unwrap()
            .with_pts(Some(7));

        let out = convert(&frame, PixelFormat::Yuv420p).unwrap();
        assert_eq!(out, frame);
        assert_eq!(out.plane(0).stride, 32);
    }

    #[test]
    fn convert_to_own_format_is_identity_for_every_format() {
        for format in PixelFormat::ALL {
            let data: Vec<u8> = (0..format.frame_size(5, 3)).map(|i| (i * 7) as u8).collect();
            let frame = VideoFrame::from_packed(5, 3, format, &data, 16).unwrap();
            assert_eq!(convert(&frame, format).unwrap(), frame, "{format}");
        }
    }

    #[test]
    fn identity_builds_no_context() {
        let mut transform = VideoTransform::new(VideoTransformConfig::new(PixelFormat::Gray8));
        transform.transform(&gray(2, 2, vec![1, 2, 3, 4])).unwrap();
        assert_eq!(transform.rebuild_count(), 0);
    }

    #[test]
    fn context_rebuilt_only_on_input_change() {
        let config = VideoTransformConfig::new(PixelFormat::Yuv420p);
        let mut transform = VideoTransform::new(config);

        transform.transform(&gray(4, 4, vec![50; 16])).unwrap();
        transform.transform(&gray(4, 4, vec![60; 16])).unwrap();
        assert_eq!(transform.rebuild_count(), 1);

        transform.transform(&gray(8, 2, vec![50; 16])).unwrap();
        assert_eq!(transform.rebuild_count(), 2);

        let rgb = VideoFrame::from_packed(8, 2, PixelFormat::Rgb24, &[0; 48], 1).unwrap();
        transform.transform(&rgb).unwrap();
        assert_eq!(transform.rebuild_count(), 3);
    }

    #[test]
    fn grey_to_yuv420p_has_neutral_chroma() {
        let luma: Vec<u8> = (0..16).map(|i| i * 10).collect();
        let out = convert(&gray(4, 4, luma.clone()), PixelFormat::Yuv420p).unwrap();

        assert_eq!(out.format, PixelFormat::Yuv420p);
        assert_eq!(out.packed_plane(0), luma);
        assert_eq!(out.packed_plane(1), vec![128; 4]);
        assert_eq!(out.packed_plane(2), vec![128; 4]);
    }

    #[test]
    fn yuv_to_grey_keeps_luma() {
        let data: Vec<u8> = (0..PixelFormat::Yuv420p.frame_size(4, 2))
            .map(|i| i as u8)
            .collect();
        let frame = VideoFrame::from_packed(4, 2, PixelFormat::Yuv420p, &data, 16).unwrap();

        let out = convert(&frame, PixelFormat::Gray8).unwrap();
        assert_eq!(out.packed_plane(0), data[..8].to_vec());
    }

    #[test]
    fn nv12_deinterleaves_to_planar() {
        let mut data = vec![0u8; 8];
        data.extend([10, 20, 30, 40]);
        let frame = VideoFrame::from_packed(4, 2, PixelFormat::Nv12, &data, 1).unwrap();

        let out = convert(&frame, PixelFormat::Yuv420p).unwrap();
        assert_eq!(out.packed_plane(1), vec![10, 30]);
        assert_eq!(out.packed_plane(2), vec![20, 40]);

        let back = convert(&out, PixelFormat::Nv12).unwrap();
        assert_eq!(back.to_packed(), data);
    }

    #[test]
    fn white_and_black_survive_yuv_round_trip() {
        let pixels = [255u8, 255, 255, 0, 0, 0];
        let frame = VideoFrame::from_packed(2, 1, PixelFormat::Rgb24, &pixels, 1).unwrap();

        let yuv = convert(&frame, PixelFormat::Yuv444p).unwrap();
        assert_eq!(yuv.packed_plane(0), vec![235, 16]);

        let back = convert(&yuv, PixelFormat::Rgb24).unwrap();
        assert_eq!(back.to_packed(), pixels);
    }

    #[test]
    fn area_downscale_averages_blocks() {
        #[rustfmt::skip]
        let data = vec![
            10, 10, 20, 20,
            10, 10, 20, 20,
            30, 30, 40, 40,
            30, 30, 40, 40,
        ];
        let config = VideoTransformConfig::new(PixelFormat::Gray8).with_size(2, 2);
        let out = VideoTransform::new(config)
            .transform(&gray(4, 4, data))
            .unwrap();
        assert_eq!((out.width, out.height), (2, 2));
        assert_eq!(out.packed_plane(0), vec![10, 20, 30, 40]);
    }

    #[test]
    fn timing_and_sequence_carry_over() {
        let mut frame = gray(2, 2, vec![0; 4]).with_pts(Some(42)).with_keyframe(true);
        frame.sequence = 3;

        let out = convert(&frame, PixelFormat::Bgra).unwrap();
        assert_eq!(out.pts, Some(42));
        assert_eq!(out.sequence, 3);
        assert!(out.is_keyframe);
        assert!(out.is_well_formed());
    }

    #[test]
    fn empty_frames_fail() {
        let frame = VideoFrame::from_planes(0, 0, PixelFormat::Gray8, vec![Plane::new(vec![], 0)]);
        let err = convert(&frame, PixelFormat::Yuv420p).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConversionFailed);

        let frame = VideoFrame::from_planes(4, 4, PixelFormat::Yuv420p, vec![]);
        let err = convert(&frame, PixelFormat::Gray8).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConversionFailed);
    }

    #[test]
    fn zero_target_size_fails() {
        let config = VideoTransformConfig::new(PixelFormat::Gray8).with_size(0, 4);
        let err = VideoTransform::new(config)
            .transform(&gray(2, 2, vec![0; 4]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConversionFailed);
    }

    #[test]
    fn algorithm_names() {
        for algorithm in ScalingAlgorithm::ALL {
            assert_eq!(algorithm.name().parse::<ScalingAlgorithm>(), Ok(algorithm));
        }
        assert_eq!(ScalingAlgorithm::default(), ScalingAlgorithm::Area);
        assert!("lanczos".parse::<ScalingAlgorithm>().is_err());
    }
}
