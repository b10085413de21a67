use shopflow_bucket::BucketStore;
use tracing::info;

use crate::error::{PipelineError, Result};

/// Confirms the bucket is reachable before a stage starts its per-object work.
pub async fn probe_bucket(store: &dyn BucketStore) -> Result<()> {
    if store.bucket_exists().await? {
        Ok(())
    } else {
        Err(PipelineError::BucketMissing(store.bucket().to_string()))
    }
}

/// Creates the bucket when it does not exist. Returns whether it was created.
pub async fn ensure_bucket(store: &dyn BucketStore, region: &str) -> Result<bool> {
    if store.bucket_exists().await? {
        info!(bucket = %store.bucket(), "bucket exists");
        return Ok(false);
    }

    info!(bucket = %store.bucket(), region, "creating bucket");
    store.create_bucket(region).await?;
    Ok(true)
}
