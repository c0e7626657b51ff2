use std::path::PathBuf;

use tokio_util::sync::CancellationToken;

use crate::error::RestoreError;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum RestoreState {
    #[default]
    Queued,
    InProgress,
    Success,
    Error,
    Cancelled,
}

/// One unit of work in a restore batch, identified by its metadata file
/// location. The error is written once, when processing completes; absence
/// marks success or a not yet processed entry.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SourceItem {
    pub location: PathBuf,
    pub error: Option<RestoreError>,
}

/// Where an entry was, or would have been, restored to. The destination is
/// recorded even on failure when one was computed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OutputItem {
    pub destination: Option<PathBuf>,
    pub error: Option<RestoreError>,
}

/// Snapshot of a restore batch. Grows one output per processed item, in
/// item order; items and outputs never diverge in length beyond the entry
/// currently in flight.
#[derive(Clone, Debug, Default)]
pub struct RestoreBatch {
    pub state: RestoreState,
    pub items: Vec<SourceItem>,
    pub outputs: Vec<OutputItem>,
    pub current_index: usize,
    pub active_operation: Option<CancellationToken>,
}
