mod common;

use polars::prelude::*;
use shopflow_core::codec::{read_csv, write_csv};
use shopflow_core::transform::{clean_order_items, clean_orders};
use shopflow_core::Dataset;

use common::{fixture, raw_table, strings};

#[test]
fn clean_tables_survive_a_csv_round_trip() -> PolarsResult<()> {
    let clean = clean_order_items(&raw_table(Dataset::OrderItems)?)?;

    let written = write_csv(&clean)?;
    let reread = read_csv(&written)?;

    assert_eq!(reread.height(), clean.height());
    assert_eq!(reread.get_column_names(), clean.get_column_names());
    assert_eq!(
        reread.column("total_price")?.null_count(),
        clean.column("total_price")?.null_count()
    );
    assert_eq!(write_csv(&reread)?, written);
    Ok(())
}

#[test]
fn dates_are_written_as_iso_days() -> PolarsResult<()> {
    let clean = clean_orders(&raw_table(Dataset::Orders)?)?;

    let reread = read_csv(&write_csv(&clean)?)?;

    assert_eq!(
        strings(&reread, "order_date")?[0],
        Some("2024-01-05".to_string())
    );
    Ok(())
}

#[test]
fn late_text_values_widen_the_inferred_column() -> PolarsResult<()> {
    let df = read_csv(&fixture("products.csv"))?;

    assert_eq!(df.column("price")?.dtype(), &DataType::String);
    assert_eq!(df.column("product_id")?.dtype(), &DataType::Int64);
    Ok(())
}
