use std::path::{Path, PathBuf};
use std::sync::mpsc;

use serde::{Deserialize, Serialize};

use crate::foundation::core::OutputFormat;
use crate::render::FieldValues;

/// Longest error message forwarded to event consumers, in characters.
pub const MAX_EVENT_MESSAGE_CHARS: usize = 200;

fn default_quality() -> u8 {
    90
}

/// Request to frame every product image and write the results to `output_dir`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    /// Product photos, processed in this order.
    pub product_paths: Vec<PathBuf>,
    /// Frame graphic (raster or SVG).
    pub frame_path: PathBuf,
    /// Template JSON file.
    pub template_path: PathBuf,
    /// Text per template field.
    #[serde(default)]
    pub field_values: FieldValues,
    /// Directory outputs are written to; created when missing.
    pub output_dir: PathBuf,
    /// Output encoding.
    pub format: OutputFormat,
    /// Lossy quality, 1..=100.
    #[serde(default = "default_quality")]
    pub quality: u8,
}

/// Request to render the first product image without writing anything.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRequest {
    /// Product photos; only the first is rendered.
    pub product_paths: Vec<PathBuf>,
    /// Frame graphic (raster or SVG).
    pub frame_path: PathBuf,
    /// Template JSON file.
    pub template_path: PathBuf,
    /// Text per template field.
    #[serde(default)]
    pub field_values: FieldValues,
    /// Output encoding.
    pub format: OutputFormat,
    /// Lossy quality, 1..=100.
    #[serde(default = "default_quality")]
    pub quality: u8,
}

impl From<&BatchRequest> for PreviewRequest {
    fn from(req: &BatchRequest) -> Self {
        Self {
            product_paths: req.product_paths.clone(),
            frame_path: req.frame_path.clone(),
            template_path: req.template_path.clone(),
            field_values: req.field_values.clone(),
            format: req.format,
            quality: req.quality,
        }
    }
}

/// Per-item status carried by a [`ProgressEvent`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    /// The item is about to be processed.
    Processing,
    /// The item's output was written.
    Success,
    /// The item failed; see `message`.
    Error,
}

/// Progress of one item within a run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    /// Items finished so far.
    pub current: usize,
    /// Items in the run.
    pub total: usize,
    /// File name of the product image, without directories.
    pub filename: String,
    /// Item status.
    pub status: ProgressStatus,
    /// Sanitized failure description when `status` is `error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Written file when `status` is `success`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
}

/// Final counts of a run that was not cancelled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionNotice {
    /// Items written successfully.
    pub processed_count: usize,
    /// Items that failed.
    pub failed_count: usize,
}

/// Emitted instead of a completion notice when a run stops early.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelledNotice {
    /// Items finished before the run stopped.
    pub current: usize,
}

/// Run-level failure, emitted right before the completion notice.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorNotice {
    /// Human-readable description.
    pub message: String,
}

/// Everything a run reports to its consumer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum BatchEvent {
    /// Per-item progress.
    Progress(ProgressEvent),
    /// Run finished.
    Complete(CompletionNotice),
    /// Nothing could be processed.
    Error(ErrorNotice),
    /// Run stopped at an item boundary.
    Cancelled(CancelledNotice),
}

impl BatchEvent {
    /// Borrow the progress payload, if this is a progress event.
    pub fn as_progress(&self) -> Option<&ProgressEvent> {
        match self {
            Self::Progress(p) => Some(p),
            _ => None,
        }
    }
}

/// Consumer of run events.
///
/// Events arrive in emission order from a single thread. Implementations must not block for
/// long; the run waits for `emit` to return.
///
/// Every item that starts produces two [`ProgressEvent`]s: a `processing` event when work
/// begins, with `current` still counting only finished items, then a `success` or `error` event
/// once it ends, with `current` incremented. Count only the second kind to get one event per
/// processed item. A run then ends with exactly one of `complete` (preceded by `error` when no
/// item succeeded) or `cancelled`.
pub trait EventSink {
    /// Deliver one event.
    fn emit(&mut self, event: BatchEvent);
}

impl<F: FnMut(BatchEvent)> EventSink for F {
    fn emit(&mut self, event: BatchEvent) {
        self(event)
    }
}

/// Sink that records every event, for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemoryEvents {
    events: Vec<BatchEvent>,
}

impl InMemoryEvents {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrow the recorded events.
    pub fn events(&self) -> &[BatchEvent] {
        &self.events
    }

    /// Recorded progress events, in order.
    pub fn progress(&self) -> impl Iterator<Item = &ProgressEvent> {
        self.events.iter().filter_map(BatchEvent::as_progress)
    }
}

impl EventSink for InMemoryEvents {
    fn emit(&mut self, event: BatchEvent) {
        self.events.push(event);
    }
}

/// Sink that forwards events over an `mpsc` channel.
///
/// Events sent after the receiver is dropped are discarded.
#[derive(Debug)]
pub struct ChannelSink {
    tx: mpsc::Sender<BatchEvent>,
}

impl ChannelSink {
    /// Wrap the sending half of a channel.
    pub fn new(tx: mpsc::Sender<BatchEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelSink {
    fn emit(&mut self, event: BatchEvent) {
        let _ = self.tx.send(event);
    }
}

/// File name component of `path` for display.
pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Render `err` for event consumers: directories of `path` are stripped and the result is
/// capped at [`MAX_EVENT_MESSAGE_CHARS`].
pub(crate) fn sanitize_error(err: &dyn std::fmt::Display, path: &Path) -> String {
    let mut msg = err.to_string();
    let full = path.display().to_string();
    if !full.is_empty() {
        msg = msg.replace(&full, &display_name(path));
    }
    if let Some(parent) = path.parent() {
        let dir = parent.display().to_string();
        if !dir.is_empty() {
            msg = msg.replace(&format!("{dir}{}", std::path::MAIN_SEPARATOR), "");
        }
    }
    truncate_chars(&msg, MAX_EVENT_MESSAGE_CHARS)
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_owned();
    }
    let mut out: String = s.chars().take(max.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
#[path = "../../tests/unit/session/events.rs"]
mod tests;
