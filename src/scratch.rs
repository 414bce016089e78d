use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use uuid::Uuid;

/// Scratch files older than this are removed by the startup sweep.
pub const STALE_AFTER: Duration = Duration::from_secs(60 * 60);

/// Receives cleanup failures that are otherwise swallowed. Cleanup problems
/// never fail a test, but they should not vanish either.
pub trait CleanupObserver: std::fmt::Debug + Send + Sync {
    fn cleanup_failed(&self, path: &Path, error: &std::io::Error);
}

/// Default observer: logs and moves on.
#[derive(Debug, Default)]
pub struct TracingCleanupObserver;

impl CleanupObserver for TracingCleanupObserver {
    fn cleanup_failed(&self, path: &Path, error: &std::io::Error) {
        tracing::warn!(path = %path.display(), %error, "failed to remove scratch file");
    }
}

/// Owner of the scratch directory used for staging submissions. Injected
/// into the subprocess executor at construction so tests can run against
/// isolated directories. Paths it mints are collision-free under concurrent
/// test cases: a millisecond timestamp plus a v4 UUID.
#[derive(Debug, Clone)]
pub struct ScratchDir {
    root: PathBuf,
    observer: Arc<dyn CleanupObserver>,
}

impl ScratchDir {
    pub fn new<P: AsRef<Path>>(root: P) -> std::io::Result<Self> {
        Self::with_observer(root, Arc::new(TracingCleanupObserver))
    }

    pub fn with_observer<P: AsRef<Path>>(
        root: P,
        observer: Arc<dyn CleanupObserver>,
    ) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        let dir = Self { root, observer };
        dir.sweep_stale(STALE_AFTER);
        Ok(dir)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn unique_path(&self, prefix: &str, extension: &str) -> PathBuf {
        let stamp = chrono::Utc::now().timestamp_millis();
        self.root
            .join(format!("{prefix}_{stamp}_{}.{extension}", Uuid::new_v4()))
    }

    /// Best-effort removal. A missing file is fine (nothing to clean up);
    /// any other failure goes to the observer and is swallowed.
    pub async fn remove(&self, path: &Path) {
        if let Err(error) = tokio::fs::remove_file(path).await {
            if error.kind() != std::io::ErrorKind::NotFound {
                self.observer.cleanup_failed(path, &error);
            }
        }
    }

    /// Leak-safety net: removes scratch files older than `max_age`. Runs at
    /// construction, independent of any single execution.
    pub fn sweep_stale(&self, max_age: Duration) {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(error) => {
                tracing::warn!(root = %self.root.display(), %error, "scratch sweep skipped");
                return;
            }
        };

        let now = SystemTime::now();
        for entry in entries.flatten() {
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }
            let Ok(modified) = metadata.modified() else {
                continue;
            };
            let stale = now
                .duration_since(modified)
                .map(|age| age > max_age)
                .unwrap_or(false);
            if stale {
                if let Err(error) = std::fs::remove_file(entry.path()) {
                    self.observer.cleanup_failed(&entry.path(), &error);
                }
            }
        }
    }
}
