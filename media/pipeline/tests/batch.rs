use std::fs::{self, File};
use std::path::{Path, PathBuf};

use media_pipeline::{
    ErrorKind, OutputFormat, Pipeline, PipelineConfig, PixelFormat, SinkConfig, failures,
    run_batch,
};
use media_source::{Y4mWriter, gradient};
use media_types::Rational;

fn write_y4m(path: &Path, frames: usize) {
    let file = File::create(path).unwrap();
    let mut writer =
        Y4mWriter::new(file, 16, 8, PixelFormat::Gray8, Rational::new(30, 1)).unwrap();
    for i in 0..frames {
        writer
            .write_frame(&gradient(16, 8, PixelFormat::Gray8, i))
            .unwrap();
    }
    writer.into_inner().unwrap();
}

fn inputs(dir: &Path) -> Vec<PathBuf> {
    let first = dir.join("first.y4m");
    let second = dir.join("second.y4m");
    write_y4m(&first, 3);
    write_y4m(&second, 6);
    vec![first, dir.join("missing.y4m"), second]
}

#[test]
fn failing_source_does_not_stop_the_batch() {
    let input_dir = tempfile::tempdir().unwrap();
    let output_dir = tempfile::tempdir().unwrap();
    let paths = inputs(input_dir.path());

    let pipeline =
        Pipeline::new(PipelineConfig::default().with_output(SinkConfig::new(output_dir.path())));
    let items = run_batch(&pipeline, &paths, 2);

    assert_eq!(items.len(), 3);
    assert_eq!(failures(&items), 1);
    for (item, path) in items.iter().zip(&paths) {
        assert_eq!(&item.path, path);
    }

    assert_eq!(items[0].result.as_ref().unwrap().frames_written, 3);
    assert_eq!(
        items[1].result.as_ref().unwrap_err().kind(),
        ErrorKind::OpenFailed
    );
    assert_eq!(items[2].result.as_ref().unwrap().frames_written, 6);

    assert_eq!(items[0].output, output_dir.path().join("first"));
    assert_eq!(fs::read_dir(&items[0].output).unwrap().count(), 3);
    assert_eq!(fs::read_dir(&items[2].output).unwrap().count(), 6);
}

#[test]
fn batch_writes_one_raw_file_per_source() {
    let input_dir = tempfile::tempdir().unwrap();
    let output_dir = tempfile::tempdir().unwrap();
    let paths = inputs(input_dir.path());

    let output = SinkConfig::new(output_dir.path()).with_format(OutputFormat::Yuv);
    let pipeline = Pipeline::new(PipelineConfig::default().with_output(output).with_max_frames(2));
    let items = run_batch(&pipeline, &paths, 8);

    assert_eq!(failures(&items), 1);
    let frame_size = PixelFormat::Yuv420p.frame_size(16, 8) as u64;
    for item in [&items[0], &items[2]] {
        assert!(item.result.as_ref().unwrap().budget_exhausted);
        assert_eq!(fs::metadata(&item.output).unwrap().len(), 2 * frame_size);
    }
}

#[test]
fn single_worker_runs_sources_in_order() {
    let input_dir = tempfile::tempdir().unwrap();
    let output_dir = tempfile::tempdir().unwrap();
    let paths = inputs(input_dir.path());

    let pipeline =
        Pipeline::new(PipelineConfig::default().with_output(SinkConfig::new(output_dir.path())));
    let items = run_batch(&pipeline, &paths, 0);

    let written: Vec<Option<u64>> = items
        .iter()
        .map(|item| item.result.as_ref().ok().map(|report| report.frames_written))
        .collect();
    assert_eq!(written, vec![Some(3), None, Some(6)]);
}
