use polars::prelude::*;
use tracing::{debug, info};

use crate::datasets::{CleanTables, Dataset, Metric, MetricTables};

/// Builds every metric whose input tables are available. A metric with a
/// missing input is left out of the result.
pub fn build_metrics(clean: &CleanTables) -> PolarsResult<MetricTables> {
    let mut metrics = MetricTables::new();

    for metric in Metric::ALL {
        let Some(table) = build_metric(metric, clean)? else {
            debug!(metric = %metric, requires = ?metric.requires(), "inputs unavailable; skipping metric");
            continue;
        };
        info!(metric = %metric, rows = table.height(), "created metric");
        metrics.insert(metric, table);
    }

    Ok(metrics)
}

pub fn build_metric(metric: Metric, clean: &CleanTables) -> PolarsResult<Option<DataFrame>> {
    match metric {
        Metric::CustomerMetrics => {
            match (clean.get(&Dataset::Customers), clean.get(&Dataset::Orders)) {
                (Some(customers), Some(orders)) => customer_metrics(customers, orders).map(Some),
                _ => Ok(None),
            }
        }
        Metric::ProductMetrics => {
            match (clean.get(&Dataset::Products), clean.get(&Dataset::OrderItems)) {
                (Some(products), Some(items)) => product_metrics(products, items).map(Some),
                _ => Ok(None),
            }
        }
        Metric::MonthlySales => clean
            .get(&Dataset::Orders)
            .map(monthly_sales)
            .transpose(),
    }
}

/// Lifetime value per customer. Orders whose customer is unknown are dropped
/// by the inner join.
pub fn customer_metrics(customers: &DataFrame, orders: &DataFrame) -> PolarsResult<DataFrame> {
    let (customers, orders) = align_join_key(customers, orders, "customer_id")?;

    let per_customer = orders
        .lazy()
        .group_by([col("customer_id")])
        .agg([
            col("total_amount").sum().alias("total_spent"),
            col("total_amount").count().alias("order_count"),
            col("total_amount").mean().alias("ave_order_value"),
            col("order_date").min().alias("first_order"),
            col("order_date").max().alias("last_order"),
        ]);

    let age_groups = customers
        .lazy()
        .select([col("customer_id"), col("age_group")]);

    let df = per_customer
        .join(
            age_groups,
            [col("customer_id")],
            [col("customer_id")],
            JoinArgs::new(JoinType::Inner),
        )
        .sort(["customer_id"], SortMultipleOptions::default())
        .collect()?;

    round_columns(df, &["total_spent", "ave_order_value"])
}

pub fn product_metrics(products: &DataFrame, order_items: &DataFrame) -> PolarsResult<DataFrame> {
    let (products, order_items) = align_join_key(products, order_items, "product_id")?;

    let per_product = order_items
        .lazy()
        .group_by([col("product_id")])
        .agg([
            col("quantity").sum().alias("total_quantity_sold"),
            col("total_price").sum().alias("total_revenue"),
            col("product_id").len().alias("number_of_orders"),
        ]);

    let details = products.lazy().select([
        col("product_id"),
        col("product_name"),
        col("category"),
        col("price"),
    ]);

    let df = per_product
        .join(
            details,
            [col("product_id")],
            [col("product_id")],
            JoinArgs::new(JoinType::Inner),
        )
        .sort(["product_id"], SortMultipleOptions::default())
        .collect()?;

    round_columns(df, &["total_quantity_sold", "total_revenue"])
}

pub fn monthly_sales(orders: &DataFrame) -> PolarsResult<DataFrame> {
    let df = orders
        .clone()
        .lazy()
        .filter(
            col("order_year")
                .is_not_null()
                .and(col("order_month").is_not_null()),
        )
        .group_by([col("order_year"), col("order_month")])
        .agg([
            col("total_amount").sum().alias("total_revenue"),
            col("total_amount").len().alias("order_count"),
        ])
        .sort(["order_year", "order_month"], SortMultipleOptions::default())
        .collect()?;

    round_columns(df, &["total_revenue"])
}

/// Brings `key` to one dtype on both sides. Key columns are inferred per file,
/// so a header-only file or a stray `N/A` leaves one side as text. Integer ids
/// win when either side has them; cells that are not ids become null and drop
/// out of the inner join.
fn align_join_key(
    left: &DataFrame,
    right: &DataFrame,
    key: &str,
) -> PolarsResult<(DataFrame, DataFrame)> {
    let left_dtype = left.column(key)?.dtype().clone();
    let right_dtype = right.column(key)?.dtype().clone();
    if left_dtype == right_dtype {
        return Ok((left.clone(), right.clone()));
    }

    let target = if left_dtype.is_integer() || right_dtype.is_integer() {
        DataType::Int64
    } else {
        DataType::String
    };
    debug!(key, left = %left_dtype, right = %right_dtype, target = %target, "aligning join key dtypes");
    Ok((cast_column(left, key, &target)?, cast_column(right, key, &target)?))
}

fn cast_column(df: &DataFrame, name: &str, dtype: &DataType) -> PolarsResult<DataFrame> {
    let cast = df.column(name)?.cast(dtype)?;
    let mut output = df.clone();
    output.with_column(cast)?;
    Ok(output)
}

pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round_columns(mut df: DataFrame, names: &[&str]) -> PolarsResult<DataFrame> {
    for &name in names {
        let rounded: Float64Chunked = df
            .column(name)?
            .f64()?
            .into_iter()
            .map(|value| value.map(round_cents))
            .collect();
        df.with_column(rounded.with_name(name.into()).into_series())?;
    }
    Ok(df)
}
