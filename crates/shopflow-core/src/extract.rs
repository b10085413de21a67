use polars::prelude::DataFrame;
use shopflow_bucket::BucketStore;
use tracing::{info, warn};

use crate::codec::read_csv;
use crate::datasets::{Dataset, RawTables};
use crate::error::{PipelineError, Result};
use crate::gateway::probe_bucket;
use crate::summary::{ItemFailure, ItemSuccess, ItemSummary};

#[derive(Debug, Default)]
pub struct Extraction {
    pub tables: RawTables,
    pub summary: ItemSummary,
}

/// Fetches and parses every expected raw dataset. A dataset that cannot be
/// fetched or parsed is logged and left out; only a failed bucket probe fails
/// the stage.
pub async fn extract_datasets(store: &dyn BucketStore) -> Result<Extraction> {
    probe_bucket(store).await?;

    let mut extraction = Extraction::default();

    for dataset in Dataset::ALL {
        let key = dataset.raw_key();
        let outcome = match fetch_dataset(store, dataset, &key).await {
            Ok(df) => {
                let rows = df.height();
                info!(dataset = %dataset, key = %key, rows, "loaded dataset");
                extraction.tables.insert(dataset, df);
                Ok(ItemSuccess { key, rows })
            }
            Err(err) => {
                warn!(dataset = %dataset, key = %key, error = %err, "failed to extract dataset; skipping");
                Err(ItemFailure {
                    key,
                    reason: err.to_string(),
                })
            }
        };
        extraction.summary.record(outcome);
    }

    Ok(extraction)
}

async fn fetch_dataset(store: &dyn BucketStore, dataset: Dataset, key: &str) -> Result<DataFrame> {
    let bytes = store.get_object(key).await?;
    read_csv(&bytes).map_err(|source| PipelineError::Parse { dataset, source })
}
