#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use polars::prelude::*;
use shopflow_bucket::MemoryBucketStore;
use shopflow_core::codec::read_csv;
use shopflow_core::retry::RetrySettings;
use shopflow_core::{Dataset, Pipeline, PipelineConfig};

pub const BUCKET: &str = "shop-data";

pub fn fixture(name: &str) -> Vec<u8> {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/data")
        .join(name);
    std::fs::read(path).expect("read fixture")
}

pub fn raw_table(dataset: Dataset) -> PolarsResult<DataFrame> {
    read_csv(&fixture(&dataset.file_name()))
}

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
}

/// A bucket holding every raw fixture under its expected key.
pub fn seeded_store() -> Arc<MemoryBucketStore> {
    let store = Arc::new(MemoryBucketStore::new(BUCKET));
    for dataset in Dataset::ALL {
        store.insert(dataset.raw_key(), fixture(&dataset.file_name()));
    }
    store
}

pub fn pipeline(store: Arc<MemoryBucketStore>) -> Pipeline {
    let config = PipelineConfig::new(BUCKET).with_retry(RetrySettings::immediate());
    Pipeline::new(store, config).with_today(today())
}

pub fn strings(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<String>>> {
    let column = df.column(name)?.cast(&DataType::String)?;
    Ok(column
        .str()?
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect())
}

pub fn floats(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<f64>>> {
    let column = df.column(name)?.cast(&DataType::Float64)?;
    Ok(column.f64()?.into_iter().collect())
}

pub fn ints(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<i64>>> {
    let column = df.column(name)?.cast(&DataType::Int64)?;
    Ok(column.i64()?.into_iter().collect())
}
