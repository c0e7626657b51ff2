use std::{
    io,
    path::{Path, PathBuf},
    time::SystemTime,
};

use tokio::{
    fs,
    sync::{
        mpsc::{self, UnboundedSender},
        oneshot,
    },
};
use tokio_util::sync::CancellationToken;

use crate::error::RestoreError;

const MAX_UNIQUE_NAMES: u32 = 100;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Operation {
    Move(PathBuf, PathBuf),
    Delete(PathBuf),
}

struct QueuedOperation {
    operation: Operation,
    cancellation: CancellationToken,
    reply: oneshot::Sender<Result<(), RestoreError>>,
}

/// Executes move and delete operations on a dedicated runner task. Each
/// operation carries its own cancellation token and answers over a oneshot
/// channel, so callers stay on their own sequence and an abandoned reply
/// never blocks the runner.
pub struct OperationRunner {
    sender: UnboundedSender<QueuedOperation>,
}

impl OperationRunner {
    pub fn new(cancellation: CancellationToken) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<QueuedOperation>();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancellation.cancelled() => break,
                    queued = receiver.recv() => {
                        let queued = match queued {
                            Some(it) => it,
                            None => break,
                        };

                        tracing::debug!("handling operation: {:?}", queued.operation);

                        let result = if queued.cancellation.is_cancelled() {
                            Err(RestoreError::Aborted)
                        } else {
                            tokio::select! {
                                _ = queued.cancellation.cancelled() => Err(RestoreError::Aborted),
                                result = execute_operation(&queued.operation) => result,
                            }
                        };

                        if queued.reply.send(result).is_err() {
                            tracing::debug!("operation result dropped: {:?}", queued.operation);
                        }
                    }
                }
            }
        });

        Self { sender }
    }

    pub async fn run(
        &self,
        operation: Operation,
        cancellation: CancellationToken,
    ) -> Result<(), RestoreError> {
        let (reply, receiver) = oneshot::channel();
        let queued = QueuedOperation {
            operation,
            cancellation,
            reply,
        };

        if self.sender.send(queued).is_err() {
            return Err(RestoreError::Aborted);
        }

        receiver.await.unwrap_or(Err(RestoreError::Aborted))
    }
}

async fn execute_operation(operation: &Operation) -> Result<(), RestoreError> {
    match operation {
        Operation::Move(source, target) => move_with_timestamp(source, target).await,
        Operation::Delete(path) => match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(err) => Err(RestoreError::Io(err.kind())),
        },
    }
}

// rename keeps the modified timestamp on the same filesystem; the copy
// fallback restores it by hand
async fn move_with_timestamp(source: &Path, target: &Path) -> Result<(), RestoreError> {
    let modified = match fs::metadata(source).await {
        Ok(metadata) => metadata.modified().ok(),
        Err(err) => return Err(RestoreError::Io(err.kind())),
    };

    match fs::rename(source, target).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::CrossesDevices => {
            copy_with_timestamp(source, target, modified).await
        }
        Err(err) => Err(RestoreError::Io(err.kind())),
    }
}

async fn copy_with_timestamp(
    source: &Path,
    target: &Path,
    modified: Option<SystemTime>,
) -> Result<(), RestoreError> {
    if let Err(err) = fs::copy(source, target).await {
        return Err(RestoreError::Io(err.kind()));
    }

    if let Some(modified) = modified {
        if let Err(err) = set_modified(target.to_path_buf(), modified).await {
            return Err(RestoreError::Io(err.kind()));
        }
    }

    match fs::remove_file(source).await {
        Ok(()) => Ok(()),
        Err(err) => Err(RestoreError::Io(err.kind())),
    }
}

async fn set_modified(target: PathBuf, modified: SystemTime) -> io::Result<()> {
    let result = tokio::task::spawn_blocking(move || {
        let file = std::fs::File::options().write(true).open(target)?;
        file.set_modified(modified)
    })
    .await;

    match result {
        Ok(it) => it,
        Err(err) => {
            tracing::error!("restoring timestamp failed: {:?}", err);
            Err(io::Error::from(io::ErrorKind::Interrupted))
        }
    }
}

/// Async wrappers around the file system primitives the restore pipeline
/// depends on. A configured base is re-applied to relative inputs for
/// layers that hand over relative paths.
pub struct FileOps {
    base: Option<PathBuf>,
    runner: OperationRunner,
}

impl FileOps {
    pub fn new(base: Option<PathBuf>, cancellation: CancellationToken) -> Self {
        Self {
            base,
            runner: OperationRunner::new(cancellation),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    pub async fn exists(&self, path: &Path) -> bool {
        fs::try_exists(self.resolve(path)).await.unwrap_or(false)
    }

    pub async fn create_directories(&self, path: &Path) -> Result<(), RestoreError> {
        match fs::create_dir_all(self.resolve(path)).await {
            Ok(()) => Ok(()),
            Err(err) => Err(RestoreError::Io(err.kind())),
        }
    }

    /// Returns a path for the desired name that is free within the parent
    /// folder. Collisions count upward with a " (N)" suffix in front of
    /// the extension until the attempt limit is reached.
    pub async fn generate_unique_name(
        &self,
        parent: &Path,
        desired: &str,
    ) -> Result<PathBuf, RestoreError> {
        let parent = self.resolve(parent);

        let candidate = parent.join(desired);
        if !fs::try_exists(&candidate).await.unwrap_or(false) {
            return Ok(candidate);
        }

        let (stem, extension) = split_name(desired);
        for counter in 1..=MAX_UNIQUE_NAMES {
            let candidate = parent.join(format!("{} ({}){}", stem, counter, extension));
            if !fs::try_exists(&candidate).await.unwrap_or(false) {
                return Ok(candidate);
            }
        }

        Err(RestoreError::Io(io::ErrorKind::AlreadyExists))
    }

    pub async fn move_entry(
        &self,
        source: &Path,
        target: &Path,
        cancellation: CancellationToken,
    ) -> Result<(), RestoreError> {
        let operation = Operation::Move(self.resolve(source), self.resolve(target));
        self.runner.run(operation, cancellation).await
    }

    pub async fn delete(
        &self,
        path: &Path,
        cancellation: CancellationToken,
    ) -> Result<(), RestoreError> {
        let operation = Operation::Delete(self.resolve(path));
        self.runner.run(operation, cancellation).await
    }
}

fn split_name(name: &str) -> (&str, String) {
    let path = Path::new(name);
    let stem = path.file_stem().and_then(|it| it.to_str());
    let extension = path.extension().and_then(|it| it.to_str());

    match (stem, extension) {
        (Some(stem), Some(extension)) => (stem, format!(".{}", extension)),
        _ => (name, String::new()),
    }
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;

    use tokio_util::sync::CancellationToken;

    use crate::error::RestoreError;

    use super::{FileOps, Operation, OperationRunner};

    #[test]
    fn split_name_variants() {
        assert_eq!(("notes", ".txt".to_string()), super::split_name("notes.txt"));
        assert_eq!((".direnv", String::new()), super::split_name(".direnv"));
        assert_eq!(("notes", String::new()), super::split_name("notes"));
        assert_eq!(
            ("archive.tar", ".gz".to_string()),
            super::split_name("archive.tar.gz")
        );
    }

    #[tokio::test]
    async fn generate_unique_name_without_collision() {
        let directory = tempfile::tempdir().unwrap();
        let ops = FileOps::new(None, CancellationToken::new());

        let unique = ops
            .generate_unique_name(directory.path(), "notes.txt")
            .await
            .unwrap();

        assert_eq!(directory.path().join("notes.txt"), unique);
    }

    #[tokio::test]
    async fn generate_unique_name_counts_collisions_upward() {
        let directory = tempfile::tempdir().unwrap();
        std::fs::write(directory.path().join("notes.txt"), "first").unwrap();
        std::fs::write(directory.path().join("notes (1).txt"), "second").unwrap();

        let ops = FileOps::new(None, CancellationToken::new());
        let unique = ops
            .generate_unique_name(directory.path(), "notes.txt")
            .await
            .unwrap();

        assert_eq!(directory.path().join("notes (2).txt"), unique);
    }

    #[tokio::test]
    async fn generate_unique_name_keeps_dotfile_names() {
        let directory = tempfile::tempdir().unwrap();
        std::fs::write(directory.path().join(".direnv"), "first").unwrap();

        let ops = FileOps::new(None, CancellationToken::new());
        let unique = ops
            .generate_unique_name(directory.path(), ".direnv")
            .await
            .unwrap();

        assert_eq!(directory.path().join(".direnv (1)"), unique);
    }

    #[tokio::test]
    async fn create_directories_is_idempotent() {
        let directory = tempfile::tempdir().unwrap();
        let target = directory.path().join("deeply/nested/folder");

        let ops = FileOps::new(None, CancellationToken::new());
        ops.create_directories(&target).await.unwrap();
        ops.create_directories(&target).await.unwrap();

        assert!(target.is_dir());
    }

    #[tokio::test]
    async fn move_entry_keeps_modified_timestamp() {
        let directory = tempfile::tempdir().unwrap();
        let source = directory.path().join("notes.txt");
        let target = directory.path().join("restored.txt");
        std::fs::write(&source, "content").unwrap();
        let modified = std::fs::metadata(&source).unwrap().modified().unwrap();

        let ops = FileOps::new(None, CancellationToken::new());
        ops.move_entry(&source, &target, CancellationToken::new())
            .await
            .unwrap();

        assert!(!source.exists());
        assert_eq!(
            modified,
            std::fs::metadata(&target).unwrap().modified().unwrap()
        );
    }

    #[tokio::test]
    async fn run_with_cancelled_token_aborts() {
        let runner = OperationRunner::new(CancellationToken::new());

        let cancellation = CancellationToken::new();
        cancellation.cancel();

        let result = runner
            .run(
                Operation::Delete(PathBuf::from("/nonexistent/entry")),
                cancellation,
            )
            .await;

        assert_eq!(Err(RestoreError::Aborted), result);
    }

    #[tokio::test]
    async fn resolve_reapplies_base_to_relative_inputs() {
        let directory = tempfile::tempdir().unwrap();
        std::fs::write(directory.path().join("notes.txt"), "content").unwrap();

        let ops = FileOps::new(
            Some(directory.path().to_path_buf()),
            CancellationToken::new(),
        );

        assert!(ops.exists(&PathBuf::from("notes.txt")).await);
        assert!(ops.exists(&directory.path().join("notes.txt")).await);
        assert!(!ops.exists(&PathBuf::from("missing.txt")).await);
    }
}
