//! Uploads local raw CSV files into the bucket the pipeline reads from.

use bytes::Bytes;
use serde::Serialize;
use shopflow_bucket::BucketStore;
use tracing::{info, warn};

use crate::codec::CSV_CONTENT_TYPE;
use crate::datasets::{Dataset, RAW_PREFIX};
use crate::error::Result;
use crate::gateway::ensure_bucket;
use crate::summary::{ItemFailure, ItemSuccess, ItemSummary};

#[derive(Debug, Clone)]
pub struct SeedFile {
    pub file_name: String,
    pub contents: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeedReport {
    pub bucket_created: bool,
    pub uploads: ItemSummary,
    /// Keys under the raw prefix after uploading.
    pub listed: Vec<String>,
    /// Expected datasets with no object under the raw prefix.
    pub missing: Vec<Dataset>,
}

pub async fn seed_raw_data(
    store: &dyn BucketStore,
    region: &str,
    files: Vec<SeedFile>,
) -> Result<SeedReport> {
    let bucket_created = ensure_bucket(store, region).await?;
    let mut uploads = ItemSummary::default();

    for file in files {
        let key = format!("{RAW_PREFIX}{}", file.file_name);
        let rows = String::from_utf8_lossy(&file.contents)
            .lines()
            .count()
            .saturating_sub(1);
        let outcome = match store
            .put_object(&key, Bytes::from(file.contents), CSV_CONTENT_TYPE)
            .await
        {
            Ok(()) => {
                info!(key = %key, "uploaded raw file");
                Ok(ItemSuccess { key, rows })
            }
            Err(err) => {
                warn!(key = %key, error = %err, "failed to upload raw file");
                Err(ItemFailure {
                    key,
                    reason: err.to_string(),
                })
            }
        };
        uploads.record(outcome);
    }

    let listed = store.list_objects(RAW_PREFIX).await?;
    let missing = Dataset::ALL
        .into_iter()
        .filter(|dataset| !listed.contains(&dataset.raw_key()))
        .collect();

    Ok(SeedReport {
        bucket_created,
        uploads,
        listed,
        missing,
    })
}
