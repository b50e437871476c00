use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};

use rayon::prelude::*;
use serde::Serialize;

use crate::assets::PreparedImage;
use crate::assets::decode::load_image_file;
use crate::assets::fonts::FontBook;
use crate::encode::{QUALITY_RANGE, encode};
use crate::foundation::config::EngineOpts;
use crate::foundation::core::{OutputFormat, Rgba8};
use crate::foundation::error::{FramekitError, FramekitResult};
use crate::render::FieldValues;
use crate::render::compositor::Compositor;
use crate::session::events::{
    BatchEvent, BatchRequest, CancelledNotice, CompletionNotice, ErrorNotice, EventSink,
    PreviewRequest, ProgressEvent, ProgressStatus, display_name, sanitize_error,
};
use crate::session::output::write_output;
use crate::template::model::Template;
use crate::template::store::TemplateStore;

/// Shared cancellation flag for one run. Cancelling is idempotent.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Create an unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; takes effect at the next item boundary.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Return `true` once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One failed item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemFailure {
    /// Position in the request's product list.
    pub index: usize,
    /// Product file name.
    pub filename: String,
    /// Sanitized failure description.
    pub message: String,
}

/// Outcome of a run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    /// Items in the request.
    pub total: usize,
    /// Items written successfully.
    pub processed: usize,
    /// Items that failed.
    pub failed: usize,
    /// Per-item failures in completion order.
    pub failures: Vec<ItemFailure>,
    /// Written files in completion order.
    pub outputs: Vec<PathBuf>,
    /// `true` when the run stopped early.
    pub cancelled: bool,
}

impl BatchSummary {
    /// A finished run is a failure only when nothing could be processed.
    pub fn is_failure(&self) -> bool {
        !self.cancelled && self.processed == 0 && self.total > 0
    }
}

/// Immutable inputs shared by every item of a run.
#[derive(Debug)]
pub(crate) struct RunInputs {
    pub(crate) template: Arc<Template>,
    pub(crate) frame: PreparedImage,
    pub(crate) fonts: FontBook,
    pub(crate) values: FieldValues,
    pub(crate) format: OutputFormat,
    pub(crate) quality: u8,
    pub(crate) jpeg_background: Rgba8,
    pub(crate) max_image_dim: u32,
}

/// A validated batch, ready to run.
#[derive(Debug)]
pub(crate) struct PreparedBatch {
    pub(crate) paths: Vec<PathBuf>,
    pub(crate) output_dir: PathBuf,
    pub(crate) inputs: RunInputs,
}

/// Validate a preview request and load everything an item needs.
///
/// Checks run in order: quality, template, field values, fonts, frame.
pub(crate) fn prepare_inputs(
    req: &PreviewRequest,
    opts: &EngineOpts,
    templates: &TemplateStore,
) -> FramekitResult<RunInputs> {
    if req.format.takes_quality() && !QUALITY_RANGE.contains(&req.quality) {
        return Err(FramekitError::config(format!(
            "quality {} is outside 1..=100",
            req.quality
        )));
    }

    let template = templates.load(&req.template_path)?;
    for name in template.field_names() {
        let present = req
            .field_values
            .get(&name)
            .is_some_and(|v| !v.trim().is_empty());
        if !present {
            return Err(FramekitError::MissingField(name));
        }
    }

    let fonts = FontBook::resolve(&template, opts.default_font.as_deref(), opts.system_fonts)?;
    let frame =
        load_image_file(&req.frame_path, opts.max_image_dim).map_err(FramekitError::Frame)?;

    Ok(RunInputs {
        template,
        frame,
        fonts,
        values: req.field_values.clone(),
        format: req.format,
        quality: req.quality,
        jpeg_background: opts.jpeg_background,
        max_image_dim: opts.max_image_dim,
    })
}

/// Validate a batch request. Nothing is written except the output directory, created last.
pub(crate) fn prepare_batch(
    req: &BatchRequest,
    opts: &EngineOpts,
    templates: &TemplateStore,
) -> FramekitResult<PreparedBatch> {
    if req.product_paths.is_empty() {
        return Err(FramekitError::config("no product images were given"));
    }
    if req.product_paths.len() > opts.max_batch_size {
        return Err(FramekitError::config(format!(
            "{} product images exceed the batch limit of {}",
            req.product_paths.len(),
            opts.max_batch_size
        )));
    }
    let mut seen = HashSet::with_capacity(req.product_paths.len());
    for p in &req.product_paths {
        if !seen.insert(p) {
            return Err(FramekitError::config(format!(
                "duplicate product image '{}'",
                p.display()
            )));
        }
    }

    let inputs = prepare_inputs(&PreviewRequest::from(req), opts, templates)?;

    if req.output_dir.as_os_str().is_empty() {
        return Err(FramekitError::config("output directory is empty"));
    }
    std::fs::create_dir_all(&req.output_dir).map_err(|e| {
        FramekitError::config(format!(
            "cannot create output directory '{}': {e}",
            req.output_dir.display()
        ))
    })?;

    Ok(PreparedBatch {
        paths: req.product_paths.clone(),
        output_dir: req.output_dir.clone(),
        inputs,
    })
}

/// Load, composite and encode one product image.
pub(crate) fn render_item(
    compositor: &mut Compositor,
    inputs: &RunInputs,
    product_path: &Path,
) -> FramekitResult<Vec<u8>> {
    let product = load_image_file(product_path, inputs.max_image_dim)?;
    let composite = compositor.compose(
        &inputs.frame,
        &product,
        &inputs.template,
        &inputs.values,
        &inputs.fonts,
    )?;
    Ok(encode(
        &composite,
        inputs.format,
        inputs.quality,
        inputs.jpeg_background,
    )?)
}

fn process_item(
    compositor: &mut Compositor,
    batch: &PreparedBatch,
    product_path: &Path,
) -> FramekitResult<PathBuf> {
    let bytes = render_item(compositor, &batch.inputs, product_path)?;
    Ok(write_output(
        &batch.output_dir,
        product_path,
        batch.inputs.format,
        &bytes,
    )?)
}

/// Mutable bookkeeping of one run; owns the progress counter.
struct BatchJob<'s> {
    sink: &'s mut dyn EventSink,
    summary: BatchSummary,
    current: usize,
}

impl<'s> BatchJob<'s> {
    fn new(total: usize, sink: &'s mut dyn EventSink) -> Self {
        Self {
            sink,
            summary: BatchSummary {
                total,
                ..BatchSummary::default()
            },
            current: 0,
        }
    }

    fn started(&mut self, path: &Path) {
        tracing::debug!(file = %path.display(), current = self.current, "processing item");
        self.sink.emit(BatchEvent::Progress(ProgressEvent {
            current: self.current,
            total: self.summary.total,
            filename: display_name(path),
            status: ProgressStatus::Processing,
            message: None,
            output: None,
        }));
    }

    fn finished(&mut self, index: usize, path: &Path, result: FramekitResult<PathBuf>) {
        self.current += 1;
        let filename = display_name(path);
        let (status, message, output) = match result {
            Ok(out) => {
                self.summary.processed += 1;
                self.summary.outputs.push(out.clone());
                (ProgressStatus::Success, None, Some(out))
            }
            Err(err) => {
                tracing::warn!(file = %filename, error = %err, "item failed");
                let message = sanitize_error(&err, path);
                self.summary.failed += 1;
                self.summary.failures.push(ItemFailure {
                    index,
                    filename: filename.clone(),
                    message: message.clone(),
                });
                (ProgressStatus::Error, Some(message), None)
            }
        };
        self.sink.emit(BatchEvent::Progress(ProgressEvent {
            current: self.current,
            total: self.summary.total,
            filename,
            status,
            message,
            output,
        }));
    }

    fn cancelled(mut self) -> BatchSummary {
        tracing::info!(current = self.current, "batch cancelled");
        self.summary.cancelled = true;
        self.sink.emit(BatchEvent::Cancelled(CancelledNotice {
            current: self.current,
        }));
        self.summary
    }

    fn completed(self) -> BatchSummary {
        let summary = self.summary;
        if summary.is_failure() {
            self.sink.emit(BatchEvent::Error(ErrorNotice {
                message: format!("none of the {} images could be processed", summary.total),
            }));
        }
        self.sink.emit(BatchEvent::Complete(CompletionNotice {
            processed_count: summary.processed,
            failed_count: summary.failed,
        }));
        tracing::info!(
            processed = summary.processed,
            failed = summary.failed,
            "batch finished"
        );
        summary
    }
}

/// Run a prepared batch to completion or cancellation.
pub(crate) fn run_prepared(
    batch: &PreparedBatch,
    opts: &EngineOpts,
    cancel: &CancelFlag,
    sink: &mut dyn EventSink,
) -> FramekitResult<BatchSummary> {
    tracing::info!(
        total = batch.paths.len(),
        parallel = opts.parallel,
        output_dir = %batch.output_dir.display(),
        "batch started"
    );
    if opts.parallel {
        run_parallel(batch, opts.threads, cancel, sink)
    } else {
        Ok(run_sequential(batch, cancel, sink))
    }
}

fn run_sequential(
    batch: &PreparedBatch,
    cancel: &CancelFlag,
    sink: &mut dyn EventSink,
) -> BatchSummary {
    let mut job = BatchJob::new(batch.paths.len(), sink);
    let mut compositor = Compositor::new();
    for (index, path) in batch.paths.iter().enumerate() {
        if cancel.is_cancelled() {
            return job.cancelled();
        }
        job.started(path);
        let result = process_item(&mut compositor, batch, path);
        job.finished(index, path, result);
    }
    job.completed()
}

enum ItemMsg {
    Started(usize),
    Finished(usize, FramekitResult<PathBuf>),
    Skipped,
}

// Workers report over a channel; the calling thread owns the sink and the counter, so progress
// arrives in completion order with a monotonic `current`.
fn run_parallel(
    batch: &PreparedBatch,
    threads: Option<usize>,
    cancel: &CancelFlag,
    sink: &mut dyn EventSink,
) -> FramekitResult<BatchSummary> {
    let pool = build_thread_pool(threads)?;
    let mut job = BatchJob::new(batch.paths.len(), sink);

    let skipped = std::thread::scope(|scope| -> FramekitResult<usize> {
        let (tx, rx) = mpsc::channel::<ItemMsg>();

        let producer = scope.spawn(move || {
            pool.install(|| {
                batch.paths.par_iter().enumerate().for_each_init(
                    || (Compositor::new(), tx.clone()),
                    |(compositor, tx), (index, path)| {
                        if cancel.is_cancelled() {
                            let _ = tx.send(ItemMsg::Skipped);
                            return;
                        }
                        let _ = tx.send(ItemMsg::Started(index));
                        let result = process_item(compositor, batch, path);
                        let _ = tx.send(ItemMsg::Finished(index, result));
                    },
                );
            });
        });

        let mut skipped = 0usize;
        for msg in rx {
            match msg {
                ItemMsg::Started(index) => job.started(&batch.paths[index]),
                ItemMsg::Finished(index, result) => {
                    job.finished(index, &batch.paths[index], result)
                }
                ItemMsg::Skipped => skipped += 1,
            }
        }

        producer
            .join()
            .map_err(|_| FramekitError::Other(anyhow::anyhow!("batch worker pool panicked")))?;
        Ok(skipped)
    })?;

    if skipped > 0 {
        Ok(job.cancelled())
    } else {
        Ok(job.completed())
    }
}

fn build_thread_pool(threads: Option<usize>) -> FramekitResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(FramekitError::config(
            "batch threading 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("framekit-{i}"));
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| FramekitError::Other(anyhow::anyhow!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/session/batch.rs"]
mod tests;
