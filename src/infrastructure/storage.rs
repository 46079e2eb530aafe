use crate::config::{EXPECTED_EXTENSION, UploadConfig};
use crate::services::storage::{LocalStorageService, StorageService};
use anyhow::Context;
use std::sync::Arc;
use tracing::info;

pub async fn setup_storage(config: &UploadConfig) -> anyhow::Result<Arc<LocalStorageService>> {
    let storage = LocalStorageService::new(
        config.upload_dir.clone(),
        config.public_path.as_str(),
        config.field_name.as_str(),
        EXPECTED_EXTENSION,
    )
    .await
    .with_context(|| {
        format!(
            "Failed to prepare upload directory {}",
            config.upload_dir.display()
        )
    })?;

    info!(
        "💾 Upload storage: {} (served at {})",
        storage.root().display(),
        config.public_path
    );

    Ok(Arc::new(storage))
}
