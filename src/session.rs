//! Batch runs, previews and the events they report.

pub(crate) mod batch;
pub(crate) mod engine;
pub(crate) mod events;
pub(crate) mod output;
pub(crate) mod preview;
