use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError, mpsc};
use std::thread::JoinHandle;

use anyhow::Context;

use crate::foundation::config::EngineOpts;
use crate::foundation::error::{FramekitError, FramekitResult};
use crate::session::batch::{BatchSummary, CancelFlag, prepare_batch, run_prepared};
use crate::session::events::{
    BatchEvent, BatchRequest, ChannelSink, EventSink, PreviewRequest,
};
use crate::session::preview::render_preview;
use crate::template::store::TemplateStore;

type ActiveRun = Arc<Mutex<Option<CancelFlag>>>;

/// Entry point for previews and batch runs.
///
/// At most one batch runs per engine at a time; previews and field queries are always allowed.
pub struct Engine {
    opts: EngineOpts,
    templates: TemplateStore,
    active: ActiveRun,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineOpts::default())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("opts", &self.opts)
            .field("busy", &self.is_busy())
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Create an engine with the given options.
    pub fn new(opts: EngineOpts) -> Self {
        Self {
            opts,
            templates: TemplateStore::new(),
            active: Arc::new(Mutex::new(None)),
        }
    }

    /// Create an engine configured from `FRAMEKIT_*` environment variables.
    pub fn from_env() -> Self {
        Self::new(EngineOpts::from_env())
    }

    /// Options this engine runs with.
    pub fn opts(&self) -> &EngineOpts {
        &self.opts
    }

    /// Return `true` while a batch is running.
    pub fn is_busy(&self) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Field names declared by a template, in declaration order.
    pub fn template_fields(&self, template_path: &Path) -> FramekitResult<Vec<String>> {
        Ok(self.templates.fields(template_path)?)
    }

    /// Render the first product image of `req` and return the encoded bytes.
    ///
    /// The bytes are identical to what a batch run writes for that image.
    pub fn preview(&self, req: &PreviewRequest) -> FramekitResult<Vec<u8>> {
        render_preview(req, &self.opts, &self.templates)
    }

    /// Run a batch on the calling thread, reporting to `sink`.
    ///
    /// Request problems are returned before any event is emitted. Per-item failures are
    /// reported through events and counted in the summary.
    #[tracing::instrument(level = "debug", skip_all, fields(total = req.product_paths.len()))]
    pub fn run_batch(
        &self,
        req: &BatchRequest,
        sink: &mut dyn EventSink,
    ) -> FramekitResult<BatchSummary> {
        let (_guard, cancel) = self.begin_run()?;
        let batch = prepare_batch(req, &self.opts, &self.templates)?;
        run_prepared(&batch, &self.opts, &cancel, sink)
    }

    /// Validate `req`, then run it on a dedicated worker thread.
    ///
    /// Events are delivered through the returned handle's channel, which closes when the run
    /// ends.
    #[tracing::instrument(level = "debug", skip_all, fields(total = req.product_paths.len()))]
    pub fn start_batch(&self, req: &BatchRequest) -> FramekitResult<BatchHandle> {
        let (guard, cancel) = self.begin_run()?;
        let batch = prepare_batch(req, &self.opts, &self.templates)?;

        let (tx, rx) = mpsc::channel();
        let opts = self.opts.clone();
        let flag = cancel.clone();
        let worker = std::thread::Builder::new()
            .name("framekit-batch".to_owned())
            .spawn(move || {
                let _guard = guard;
                let mut sink = ChannelSink::new(tx);
                run_prepared(&batch, &opts, &flag, &mut sink)
            })
            .context("failed to spawn batch worker thread")?;

        Ok(BatchHandle {
            events: rx,
            cancel,
            worker,
        })
    }

    /// Ask the active batch, if any, to stop at the next item boundary.
    pub fn cancel(&self) {
        if let Some(flag) = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            tracing::debug!("cancellation requested");
            flag.cancel();
        }
    }

    fn begin_run(&self) -> FramekitResult<(ActiveRunGuard, CancelFlag)> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if active.is_some() {
            return Err(FramekitError::Busy);
        }
        let flag = CancelFlag::new();
        *active = Some(flag.clone());
        Ok((ActiveRunGuard(self.active.clone()), flag))
    }
}

/// Clears the engine's active-run slot when the run ends, however it ends.
struct ActiveRunGuard(ActiveRun);

impl Drop for ActiveRunGuard {
    fn drop(&mut self) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Handle to a batch running on a worker thread.
#[derive(Debug)]
pub struct BatchHandle {
    events: mpsc::Receiver<BatchEvent>,
    cancel: CancelFlag,
    worker: JoinHandle<FramekitResult<BatchSummary>>,
}

impl BatchHandle {
    /// Receiving half of the event channel.
    pub fn events(&self) -> &mpsc::Receiver<BatchEvent> {
        &self.events
    }

    /// Ask the run to stop at the next item boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the run to end and return its summary. Undelivered events are dropped.
    pub fn wait(self) -> FramekitResult<BatchSummary> {
        drop(self.events);
        self.worker
            .join()
            .map_err(|_| FramekitError::Other(anyhow::anyhow!("batch worker panicked")))?
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/engine.rs"]
mod tests;
