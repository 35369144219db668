use crate::{S3Storage, Storage, StorageResult};
use docvault_core::Config;
use std::sync::Arc;

/// Create the object-store backend from configuration.
pub async fn create_storage(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    let storage = S3Storage::new(
        config.s3_bucket().to_string(),
        config.s3_region().to_string(),
        config.s3_endpoint().map(String::from),
    )
    .await?;

    Ok(Arc::new(storage))
}
