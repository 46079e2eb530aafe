use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::models::PublishedFile;

/// Holds the one file every client is served.
///
/// `publish` swaps atomically and hands back what it replaced. It never
/// deletes anything: removing the superseded file is the caller's job, once
/// the replacement has passed every check.
#[async_trait]
pub trait RetentionSlot: Send + Sync {
    async fn publish(&self, file: PublishedFile) -> Option<PublishedFile>;
    async fn current(&self) -> Option<PublishedFile>;
}

/// Process-lifetime slot, empty at startup.
#[derive(Debug, Default)]
pub struct MemoryRetentionSlot {
    slot: Mutex<Option<PublishedFile>>,
}

impl MemoryRetentionSlot {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RetentionSlot for MemoryRetentionSlot {
    async fn publish(&self, file: PublishedFile) -> Option<PublishedFile> {
        self.slot.lock().await.replace(file)
    }

    async fn current(&self) -> Option<PublishedFile> {
        self.slot.lock().await.clone()
    }
}
