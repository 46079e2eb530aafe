use crate::services::retention::RetentionSlot;
use crate::services::storage::{StorageError, StorageService};
use std::io::ErrorKind;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::watch;
use tokio::time::sleep;

/// Outcome of one sweep pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub removed: usize,
    /// Listed, then deleted by someone else before the sweep got to it
    pub already_gone: usize,
    pub failed: usize,
}

/// Reclaims staged files whose request never finished.
pub struct BackgroundWorker {
    storage: Arc<dyn StorageService>,
    retention: Arc<dyn RetentionSlot>,
    max_age: Duration,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
}

impl BackgroundWorker {
    pub fn new(
        storage: Arc<dyn StorageService>,
        retention: Arc<dyn RetentionSlot>,
        max_age: Duration,
        interval: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            storage,
            retention,
            max_age,
            interval,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        tracing::info!("🚀 Background worker started");

        loop {
            tokio::select! {
                _ = self.shutdown.changed() => {
                    tracing::info!("🛑 Background worker shutting down");
                    break;
                }
                _ = sleep(self.interval) => {
                    self.sweep_orphans().await;
                }
            }
        }
    }

    /// Deletes every file older than `max_age` except the published one.
    pub async fn sweep_orphans(&self) -> SweepReport {
        let mut report = SweepReport::default();

        let entries = match self.storage.list_files().await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!("Orphan sweep could not list uploads: {}", e);
                return report;
            }
        };

        // Read after listing: a file published in between is still protected.
        let published = self.retention.current().await.map(|f| f.path);
        let now = SystemTime::now();

        for entry in entries {
            if published.as_deref() == Some(entry.path.as_path()) {
                continue;
            }

            let age = now.duration_since(entry.modified).unwrap_or_default();
            if age < self.max_age {
                continue;
            }

            match self.storage.delete_file(&entry.path).await {
                Ok(()) => {
                    tracing::info!("Removed orphaned upload {}", entry.file_name);
                    report.removed += 1;
                }
                // Evicted by an upload between listing and now.
                Err(StorageError::Delete { source, .. }) if source.kind() == ErrorKind::NotFound => {
                    tracing::debug!("{} already removed", entry.file_name);
                    report.already_gone += 1;
                }
                Err(e) => {
                    tracing::error!("Failed to remove orphan {}: {}", entry.file_name, e);
                    report.failed += 1;
                }
            }
        }

        if report.removed > 0 {
            tracing::info!("✅ Orphan sweep removed {} file(s)", report.removed);
        }
        report
    }
}
