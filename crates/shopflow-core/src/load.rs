use bytes::Bytes;
use polars::prelude::DataFrame;
use shopflow_bucket::BucketStore;
use tracing::{info, warn};

use crate::codec::{write_csv, CSV_CONTENT_TYPE};
use crate::datasets::{CleanTables, MetricTables};
use crate::error::Result;
use crate::gateway::probe_bucket;
use crate::summary::{ItemFailure, ItemSuccess, ItemSummary};

/// Destination key and table for one output of the run.
pub struct Output<'a> {
    pub name: String,
    pub key: String,
    pub table: &'a DataFrame,
}

/// Every clean table followed by every metric, in catalogue order.
pub fn planned_outputs<'a>(clean: &'a CleanTables, metrics: &'a MetricTables) -> Vec<Output<'a>> {
    let datasets = clean.iter().map(|(dataset, table)| Output {
        name: dataset.clean_name(),
        key: dataset.clean_key(),
        table,
    });
    let metrics = metrics.iter().map(|(metric, table)| Output {
        name: metric.name().to_string(),
        key: metric.key(),
        table,
    });
    datasets.chain(metrics).collect()
}

/// Stores each output independently. Failed uploads are recorded and do not
/// stop the remaining ones; objects already stored are left in place.
pub async fn load_outputs(
    store: &dyn BucketStore,
    clean: &CleanTables,
    metrics: &MetricTables,
) -> Result<ItemSummary> {
    probe_bucket(store).await?;

    let mut summary = ItemSummary::default();

    for output in planned_outputs(clean, metrics) {
        let rows = output.table.height();
        let outcome = match store_table(store, &output.key, output.table).await {
            Ok(()) => {
                info!(output = %output.name, key = %output.key, rows, "uploaded output");
                Ok(ItemSuccess {
                    key: output.key,
                    rows,
                })
            }
            Err(err) => {
                warn!(output = %output.name, key = %output.key, error = %err, "failed to upload output");
                Err(ItemFailure {
                    key: output.key,
                    reason: err.to_string(),
                })
            }
        };
        summary.record(outcome);
    }

    Ok(summary)
}

async fn store_table(store: &dyn BucketStore, key: &str, table: &DataFrame) -> Result<()> {
    let bytes = write_csv(table)?;
    store
        .put_object(key, Bytes::from(bytes), CSV_CONTENT_TYPE)
        .await?;
    Ok(())
}
