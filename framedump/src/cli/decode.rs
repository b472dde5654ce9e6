use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::warn;

use media_pipeline::{
    DecoderConfig, MediaKind, OutputFormat, Pipeline, PipelineConfig, PipelineReport, PixelFormat,
    ScalingAlgorithm, SelectionPolicy, SinkConfig, SourceConfig, VideoTransformConfig, failures,
    run_batch, source_output,
};

#[derive(Parser, Debug)]
pub struct DecodeCommand {
    /// Media files to decode
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Kind of stream to decode
    #[arg(long, default_value = "video")]
    pub kind: MediaKind,

    /// Stop after this many decoded frames
    #[arg(short = 'n', long)]
    pub frames: Option<u64>,

    /// Output directory, or the output file for yuv
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,

    /// Artifact format: pgm (one greymap per frame) or yuv (one raw 4:2:0 file)
    #[arg(short, long, default_value = "pgm")]
    pub format: OutputFormat,

    /// Convert frames to this pixel format before writing
    #[arg(long)]
    pub pixel_format: Option<PixelFormat>,

    /// Scale frames to WIDTHxHEIGHT
    #[arg(long, value_parser = parse_size)]
    pub size: Option<(u32, u32)>,

    /// Scaling filter
    #[arg(long, default_value = "area")]
    pub scaler: ScalingAlgorithm,

    /// Stream selection: first, resolution or bitrate
    #[arg(long, default_value = "first")]
    pub select: SelectionPolicy,

    /// Decode this stream index instead of selecting one
    #[arg(long)]
    pub stream: Option<usize>,

    /// Greymap file name prefix
    #[arg(long, default_value = "frame")]
    pub prefix: String,

    /// Frames the decoder holds back before output
    #[arg(long, default_value_t = 0)]
    pub frame_delay: usize,

    /// Decoder threads per source (FFmpeg codecs only)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Bytes the container probe may read ahead
    #[arg(long)]
    pub probe_size: Option<u64>,

    /// Stop at the first frame that fails to convert or write
    #[arg(long)]
    pub fail_fast: bool,

    /// Sources decoded in parallel
    #[arg(short, long, default_value_t = 1)]
    pub jobs: usize,
}

impl DecodeCommand {
    pub fn run(self) -> Result<()> {
        if self.inputs.len() == 1 {
            return self.run_single(&self.inputs[0]);
        }

        let pipeline = Pipeline::new(self.config(SinkConfig::new(&self.output)));
        let items = run_batch(&pipeline, &self.inputs, self.jobs);

        for item in &items {
            match &item.result {
                Ok(report) => print_report(&item.path, &item.output, report),
                Err(e) => println!("{}: failed: {e}", item.path.display()),
            }
        }

        let failed = failures(&items);
        if failed > 0 {
            bail!("{failed} of {} sources failed", items.len());
        }
        Ok(())
    }

    fn run_single(&self, input: &Path) -> Result<()> {
        let output = self.single_output(input);
        let path = output.path.clone();
        let report = Pipeline::new(self.config(output))
            .run(input)
            .with_context(|| format!("failed to decode {}", input.display()))?;

        print_report(input, &path, &report);
        Ok(())
    }

    /**
        Greymaps go into the output directory. YUV goes to the output path
        itself if it names a `.yuv` file, else to `<dir>/<stem>.yuv`.
    */
    fn single_output(&self, input: &Path) -> SinkConfig {
        let output = SinkConfig::new(&self.output)
            .with_format(self.format)
            .with_prefix(&self.prefix);

        let names_file = self.output.extension().is_some_and(|ext| ext == "yuv");
        if self.format == OutputFormat::Pgm || names_file {
            return output;
        }

        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        source_output(&output, &stem)
    }

    fn config(&self, output: SinkConfig) -> PipelineConfig {
        let mut source = SourceConfig::default();
        if let Some(bytes) = self.probe_size {
            source = source.with_probe_size(bytes);
        }

        let mut decoder = DecoderConfig::default().with_frame_delay(self.frame_delay);
        if let Some(threads) = self.threads {
            decoder = decoder.with_threads(threads);
        }

        let mut config = PipelineConfig::default()
            .with_kind(self.kind)
            .with_selection(self.select)
            .with_output(output.with_format(self.format).with_prefix(&self.prefix))
            .with_source(source)
            .with_decoder(decoder)
            .with_fail_fast(self.fail_fast);

        if let Some(frames) = self.frames {
            config = config.with_max_frames(frames);
        }
        if let Some(index) = self.stream {
            config = config.with_stream(index);
        }
        if let Some(conversion) = self.conversion() {
            config = config.with_conversion(conversion);
        }
        config
    }

    fn conversion(&self) -> Option<VideoTransformConfig> {
        let required = self.format.required_pixel_format();
        if let (Some(requested), Some(required)) = (self.pixel_format, required) {
            if requested != required {
                warn!(%requested, %required, output = %self.format, "ignoring --pixel-format");
            }
        }

        if self.pixel_format.is_none() && self.size.is_none() && required.is_none() {
            return None;
        }

        let format = required
            .or(self.pixel_format)
            .unwrap_or(PixelFormat::Gray8);
        let mut conversion = VideoTransformConfig::new(format).with_algorithm(self.scaler);
        if let Some((width, height)) = self.size {
            conversion = conversion.with_size(width, height);
        }
        Some(conversion)
    }
}

fn print_report(input: &Path, output: &Path, report: &PipelineReport) {
    let mut line = format!(
        "{}: stream #{}, {} frames written to {}",
        input.display(),
        report.stream_index,
        report.frames_written,
        output.display()
    );
    if report.frames_failed > 0 {
        line.push_str(&format!(", {} failed", report.frames_failed));
    }
    if report.budget_exhausted {
        line.push_str(" (frame limit reached)");
    }
    println!("{line}");
}

fn parse_size(s: &str) -> std::result::Result<(u32, u32), String> {
    let (width, height) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<u32>()
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(|| format!("invalid dimension '{v}'"))
    };
    Ok((parse(width)?, parse(height)?))
}
