/*!
    Batch decoding of independent sources on a worker pool.
*/

use std::collections::HashMap;
use std::path::PathBuf;

use crossbeam::channel;
use tracing::{info, info_span, warn};

use media_sink::{OutputFormat, SinkConfig};
use media_types::{Error, Result};

use crate::pipeline::{Pipeline, PipelineReport};

/**
    Outcome of one source in a batch.
*/
#[derive(Debug)]
pub struct BatchItem {
    pub path: PathBuf,
    /// Where this source's frames went.
    pub output: PathBuf,
    pub result: Result<PipelineReport>,
}

/**
    Per-source output under the batch output directory `output.path`:
    `<dir>/<name>/` for greymaps, `<dir>/<name>.yuv` for YUV.
*/
pub fn source_output(output: &SinkConfig, name: &str) -> SinkConfig {
    let path = match output.format {
        OutputFormat::Pgm => output.path.join(name),
        OutputFormat::Yuv => output.path.join(format!("{name}.yuv")),
    };
    SinkConfig {
        path,
        ..output.clone()
    }
}

/**
    Output names from file stems, suffixed `-2`, `-3`, ... when stems repeat.
*/
fn output_names(paths: &[PathBuf]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    paths
        .iter()
        .map(|path| {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "source".to_string());
            let count = seen.entry(stem.clone()).or_insert(0);
            *count += 1;
            match *count {
                1 => stem,
                n => format!("{stem}-{n}"),
            }
        })
        .collect()
}

/**
    Run `pipeline` over every path with up to `jobs` sources in flight.

    Each source gets its own decoder and output; a failing source does not
    stop the others. Results come back in input order.
*/
pub fn run_batch(pipeline: &Pipeline, paths: &[PathBuf], jobs: usize) -> Vec<BatchItem> {
    let jobs = jobs.clamp(1, paths.len().max(1));
    let outputs: Vec<SinkConfig> = output_names(paths)
        .iter()
        .map(|name| source_output(&pipeline.config().output, name))
        .collect();

    info!(sources = paths.len(), jobs, "starting batch");

    let (task_tx, task_rx) = channel::unbounded::<usize>();
    for slot in 0..paths.len() {
        // The receiver is alive until the workers finish
        let _ = task_tx.send(slot);
    }
    drop(task_tx);

    let (done_tx, done_rx) = channel::unbounded::<(usize, Result<PipelineReport>)>();
    let scoped = crossbeam::scope(|scope| {
        for worker in 0..jobs {
            let task_rx = task_rx.clone();
            let done_tx = done_tx.clone();
            let outputs = &outputs;
            scope.spawn(move |_| {
                for slot in task_rx.iter() {
                    let path = &paths[slot];
                    let _span = info_span!("source", worker, path = %path.display()).entered();

                    let result = pipeline.with_output(outputs[slot].clone()).run(path);
                    if let Err(e) = &result {
                        warn!(error = %e, scope = ?e.kind().scope(), "source failed");
                    }
                    if done_tx.send((slot, result)).is_err() {
                        break;
                    }
                }
            });
        }
    });
    drop(done_tx);

    let mut results: Vec<Option<Result<PipelineReport>>> = paths.iter().map(|_| None).collect();
    for (slot, result) in done_rx.iter() {
        results[slot] = Some(result);
    }
    if scoped.is_err() {
        warn!("a batch worker panicked");
    }

    paths
        .iter()
        .zip(outputs)
        .zip(results)
        .map(|((path, output), result)| BatchItem {
            path: path.clone(),
            output: output.path,
            result: result.unwrap_or_else(|| {
                Err(Error::decode_failed("worker stopped before this source"))
            }),
        })
        .collect()
}

/**
    Number of items that failed.
*/
pub fn failures(items: &[BatchItem]) -> usize {
    items.iter().filter(|item| item.result.is_err()).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_stems_get_suffixes() {
        let paths = vec![
            PathBuf::from("a/clip.y4m"),
            PathBuf::from("b/clip.y4m"),
            PathBuf::from("other.mkv"),
        ];
        assert_eq!(output_names(&paths), vec!["clip", "clip-2", "other"]);
    }

    #[test]
    fn outputs_follow_format() {
        let pgm = SinkConfig::new("out");
        assert_eq!(source_output(&pgm, "clip").path, PathBuf::from("out/clip"));

        let yuv = SinkConfig::new("out").with_format(OutputFormat::Yuv);
        assert_eq!(source_output(&yuv, "clip").path, PathBuf::from("out/clip.yuv"));
    }
}
