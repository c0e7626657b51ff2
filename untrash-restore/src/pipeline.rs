use std::{
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use tokio::{fs, sync::mpsc::UnboundedSender};
use tokio_util::sync::CancellationToken;

use crate::{
    error::{AppError, RestoreError},
    fsops::FileOps,
    metadata,
    model::{OutputItem, RestoreBatch, RestoreState, SourceItem},
    path,
    trashroots::TrashRoot,
};

/// Snapshot events handed to the owner: one progress per completed non
/// final item and exactly one completion carrying the terminal state.
#[derive(Clone, Debug)]
pub enum RestoreEvent {
    Progress(RestoreBatch),
    Complete(RestoreBatch),
}

enum Step {
    ValidateTrashInfo,
    ParseMetadata {
        root: TrashRoot,
        trashed_content: PathBuf,
    },
    EnsureTargetFolder {
        root: TrashRoot,
        trashed_content: PathBuf,
        restore_path: PathBuf,
    },
    GenerateDestination {
        trashed_content: PathBuf,
        target: PathBuf,
    },
    RestoreContent {
        trashed_content: PathBuf,
        target: PathBuf,
    },
    DeleteMetadata,
}

/// Drives a batch of trashed entries back to their recorded locations,
/// one entry at a time. All batch state is mutated on the executing task;
/// workers only ever hand results back over channels.
pub struct RestorePipeline {
    batch: Mutex<RestoreBatch>,
    roots: Vec<TrashRoot>,
    base: Option<PathBuf>,
    ops: FileOps,
    cancellation: CancellationToken,
}

impl RestorePipeline {
    pub fn new(items: Vec<PathBuf>, roots: Vec<TrashRoot>, base: Option<PathBuf>) -> Self {
        let cancellation = CancellationToken::new();
        let items = items
            .into_iter()
            .map(|location| SourceItem {
                location,
                error: None,
            })
            .collect();

        Self {
            batch: Mutex::new(RestoreBatch {
                items,
                ..Default::default()
            }),
            roots,
            ops: FileOps::new(base.clone(), cancellation.clone()),
            base,
            cancellation,
        }
    }

    /// Clone of the current batch for external readers.
    pub fn snapshot(&self) -> RestoreBatch {
        self.lock_batch().clone()
    }

    /// Marks the batch as cancelled for external readers. The running
    /// execution is not interrupted and the computed terminal state
    /// overwrites this value on completion; only dropping the pipeline
    /// aborts an outstanding file operation.
    pub fn cancel(&self) {
        let mut batch = self.lock_batch();
        match batch.state {
            RestoreState::Queued | RestoreState::InProgress => {
                tracing::debug!("cancelling restore batch");
                batch.state = RestoreState::Cancelled;
            }
            RestoreState::Success | RestoreState::Error | RestoreState::Cancelled => (),
        }
    }

    pub async fn execute(&self, events: UnboundedSender<RestoreEvent>) -> Result<(), AppError> {
        let locations = {
            let mut batch = self.lock_batch();
            if batch.state != RestoreState::Queued {
                return Err(AppError::RestoreAlreadyStarted);
            }

            batch.state = RestoreState::InProgress;
            batch
                .items
                .iter()
                .map(|item| item.location.clone())
                .collect::<Vec<_>>()
        };

        if locations.is_empty() {
            self.complete(RestoreState::Success, &events);
            return Ok(());
        }

        let last = locations.len() - 1;
        for (index, location) in locations.iter().enumerate() {
            self.lock_batch().current_index = index;

            let (destination, result) = self.restore_item(location).await;
            self.restore_complete(index, index == last, destination, result, &events);
        }

        Ok(())
    }

    async fn restore_item(
        &self,
        location: &Path,
    ) -> (Option<PathBuf>, Result<(), RestoreError>) {
        let mut destination = None;
        let mut step = Step::ValidateTrashInfo;
        loop {
            step = match step {
                Step::ValidateTrashInfo => {
                    if path::strip_metadata_suffix(location).is_none() {
                        return (destination, Err(RestoreError::InvalidUrl));
                    }

                    let root = match path::find_enclosing_root(&self.roots, location) {
                        Some(it) => it.clone(),
                        None => return (destination, Err(RestoreError::InvalidOperation)),
                    };

                    let trashed_content = match path::trashed_content_path(&root, location) {
                        Some(it) => it,
                        None => return (destination, Err(RestoreError::InvalidUrl)),
                    };

                    if !self.ops.exists(&self.ops_path(&trashed_content)).await {
                        return (destination, Err(RestoreError::NotFound));
                    }

                    Step::ParseMetadata {
                        root,
                        trashed_content,
                    }
                }
                Step::ParseMetadata {
                    root,
                    trashed_content,
                } => {
                    let file = match fs::File::open(location).await {
                        Ok(it) => it,
                        Err(err) => return (destination, Err(RestoreError::Io(err.kind()))),
                    };

                    let info = match metadata::parse(file).await {
                        Ok(it) => it,
                        Err(err) => {
                            tracing::debug!("parsing metadata failed: {:?}", err);
                            return (destination, Err(RestoreError::InvalidUrl));
                        }
                    };

                    if info.restore_path.as_os_str().is_empty() || !info.restore_path.is_absolute()
                    {
                        return (destination, Err(RestoreError::InvalidUrl));
                    }

                    tracing::trace!("restoring entry deleted at {}", info.deleted_at);

                    Step::EnsureTargetFolder {
                        root,
                        trashed_content,
                        restore_path: info.restore_path,
                    }
                }
                Step::EnsureTargetFolder {
                    root,
                    trashed_content,
                    restore_path,
                } => {
                    let target = path::restore_target(&root, &restore_path);
                    let parent = match target.parent() {
                        Some(it) => it.to_path_buf(),
                        None => return (destination, Err(RestoreError::InvalidUrl)),
                    };

                    if let Err(err) = self.ops.create_directories(&self.ops_path(&parent)).await {
                        return (destination, Err(err));
                    }

                    Step::GenerateDestination {
                        trashed_content,
                        target,
                    }
                }
                Step::GenerateDestination {
                    trashed_content,
                    target,
                } => {
                    let parent = match target.parent() {
                        Some(it) => it.to_path_buf(),
                        None => return (destination, Err(RestoreError::InvalidUrl)),
                    };

                    let desired = match target.file_name().and_then(|name| name.to_str()) {
                        Some(it) => it.to_string(),
                        None => return (destination, Err(RestoreError::InvalidUrl)),
                    };

                    let unique = match self
                        .ops
                        .generate_unique_name(&self.ops_path(&parent), &desired)
                        .await
                    {
                        Ok(it) => it,
                        Err(err) => return (destination, Err(err)),
                    };

                    destination = Some(unique.clone());

                    Step::RestoreContent {
                        trashed_content,
                        target: unique,
                    }
                }
                Step::RestoreContent {
                    trashed_content,
                    target,
                } => {
                    let cancellation = self.begin_operation();
                    let result = self
                        .ops
                        .move_entry(
                            &self.ops_path(&trashed_content),
                            &self.ops_path(&target),
                            cancellation,
                        )
                        .await;

                    if let Err(err) = result {
                        return (destination, Err(err));
                    }

                    Step::DeleteMetadata
                }
                Step::DeleteMetadata => {
                    let cancellation = self.begin_operation();
                    let result = self.ops.delete(&self.ops_path(location), cancellation).await;

                    return (destination, result);
                }
            };
        }
    }

    fn restore_complete(
        &self,
        index: usize,
        is_last: bool,
        destination: Option<PathBuf>,
        result: Result<(), RestoreError>,
        events: &UnboundedSender<RestoreEvent>,
    ) {
        let snapshot = {
            let mut batch = self.lock_batch();
            batch.active_operation = None;

            let error = result.err();
            if let Some(item) = batch.items.get_mut(index) {
                item.error = error;
            }

            batch.outputs.push(OutputItem { destination, error });
            batch.clone()
        };

        if let Some(error) = result.err() {
            tracing::debug!("restoring entry {} failed: {:?}", index, error);
        }

        if is_last {
            let failed = snapshot.items.iter().any(|item| item.error.is_some());
            let state = if failed {
                RestoreState::Error
            } else {
                RestoreState::Success
            };

            self.complete(state, events);
        } else if events.send(RestoreEvent::Progress(snapshot)).is_err() {
            tracing::debug!("restore progress dropped: {}", index);
        }
    }

    fn complete(&self, state: RestoreState, events: &UnboundedSender<RestoreEvent>) {
        let snapshot = {
            let mut batch = self.lock_batch();
            batch.state = state;
            batch.clone()
        };

        tracing::debug!("restore batch finished: {:?}", snapshot.state);

        if events.send(RestoreEvent::Complete(snapshot)).is_err() {
            tracing::debug!("restore completion dropped");
        }
    }

    fn begin_operation(&self) -> CancellationToken {
        let cancellation = self.cancellation.child_token();
        self.lock_batch().active_operation = Some(cancellation.clone());

        cancellation
    }

    /// Strips the configured base so the file operation layer receives
    /// relative inputs; the layer re-applies the base before touching
    /// disk, leaving the addressed file unchanged.
    fn ops_path(&self, path: &Path) -> PathBuf {
        match &self.base {
            Some(base) => {
                path::make_relative(base, path).unwrap_or_else(|| path.to_path_buf())
            }
            None => path.to_path_buf(),
        }
    }

    fn lock_batch(&self) -> MutexGuard<'_, RestoreBatch> {
        match self.batch.lock() {
            Ok(it) => it,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Drop for RestorePipeline {
    fn drop(&mut self) {
        self.cancellation.cancel();
    }
}
