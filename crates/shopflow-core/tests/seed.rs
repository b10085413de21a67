mod common;

use anyhow::Result;
use shopflow_bucket::MemoryBucketStore;
use shopflow_core::seed::{seed_raw_data, SeedFile};
use shopflow_core::Dataset;

use common::{fixture, BUCKET};

fn seed_file(dataset: Dataset) -> SeedFile {
    SeedFile {
        file_name: dataset.file_name(),
        contents: fixture(&dataset.file_name()),
    }
}

#[tokio::test]
async fn seeding_creates_the_bucket_and_reports_gaps() -> Result<()> {
    let store = MemoryBucketStore::missing(BUCKET);
    let files = vec![seed_file(Dataset::Customers), seed_file(Dataset::Orders)];

    let report = seed_raw_data(&store, "eu-west-1", files).await?;

    assert!(report.bucket_created);
    assert_eq!(report.uploads.succeeded_count(), 2);
    assert_eq!(report.uploads.succeeded[0].key, "raw-data/customers.csv");
    assert_eq!(report.uploads.succeeded[0].rows, 3);
    assert_eq!(
        report.listed,
        vec!["raw-data/customers.csv", "raw-data/orders.csv"]
    );
    assert_eq!(
        report.missing,
        vec![Dataset::Products, Dataset::OrderItems, Dataset::Reviews]
    );
    Ok(())
}

#[tokio::test]
async fn seeding_an_existing_bucket_keeps_going_past_failed_uploads() -> Result<()> {
    let store = MemoryBucketStore::new(BUCKET);
    store.fail_put("raw-data/reviews.csv");
    let files = Dataset::ALL.into_iter().map(seed_file).collect();

    let report = seed_raw_data(&store, "us-east-1", files).await?;

    assert!(!report.bucket_created);
    assert_eq!(report.uploads.succeeded_count(), 4);
    assert_eq!(report.uploads.failed[0].key, "raw-data/reviews.csv");
    assert_eq!(report.missing, vec![Dataset::Reviews]);
    Ok(())
}
