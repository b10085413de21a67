use std::collections::BTreeMap;
use std::fmt;

use polars::prelude::DataFrame;
use serde::Serialize;

pub const RAW_PREFIX: &str = "raw-data/";
pub const PROCESSED_PREFIX: &str = "processed/";
pub const METRICS_PREFIX: &str = "processed/metrics/";
pub const CSV_EXTENSION: &str = ".csv";

/// Source datasets, in the order they are fetched and stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dataset {
    Customers,
    Products,
    Orders,
    OrderItems,
    Reviews,
}

impl Dataset {
    pub const ALL: [Dataset; 5] = [
        Dataset::Customers,
        Dataset::Products,
        Dataset::Orders,
        Dataset::OrderItems,
        Dataset::Reviews,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Dataset::Customers => "customers",
            Dataset::Products => "products",
            Dataset::Orders => "orders",
            Dataset::OrderItems => "order_items",
            Dataset::Reviews => "reviews",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}{CSV_EXTENSION}", self.name())
    }

    /// Resolves a raw object file name such as `orders.csv` back to its dataset.
    pub fn from_file_name(file_name: &str) -> Option<Dataset> {
        let stem = file_name.strip_suffix(CSV_EXTENSION).unwrap_or(file_name);
        Dataset::ALL.into_iter().find(|dataset| dataset.name() == stem)
    }

    pub fn raw_key(&self) -> String {
        format!("{RAW_PREFIX}{}", self.file_name())
    }

    pub fn clean_name(&self) -> String {
        format!("{}_clean", self.name())
    }

    pub fn clean_key(&self) -> String {
        format!("{PROCESSED_PREFIX}{}{CSV_EXTENSION}", self.clean_name())
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    CustomerMetrics,
    ProductMetrics,
    MonthlySales,
}

impl Metric {
    pub const ALL: [Metric; 3] = [
        Metric::CustomerMetrics,
        Metric::ProductMetrics,
        Metric::MonthlySales,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Metric::CustomerMetrics => "customer_metrics",
            Metric::ProductMetrics => "product_metrics",
            Metric::MonthlySales => "monthly_sales",
        }
    }

    /// Clean tables that must all be present for this metric to be built.
    pub fn requires(&self) -> &'static [Dataset] {
        match self {
            Metric::CustomerMetrics => &[Dataset::Customers, Dataset::Orders],
            Metric::ProductMetrics => &[Dataset::Products, Dataset::OrderItems],
            Metric::MonthlySales => &[Dataset::Orders],
        }
    }

    pub fn key(&self) -> String {
        format!("{METRICS_PREFIX}{}{CSV_EXTENSION}", self.name())
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub type RawTables = BTreeMap<Dataset, DataFrame>;
pub type CleanTables = BTreeMap<Dataset, DataFrame>;
pub type MetricTables = BTreeMap<Metric, DataFrame>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_follow_the_bucket_layout() {
        assert_eq!(Dataset::OrderItems.raw_key(), "raw-data/order_items.csv");
        assert_eq!(
            Dataset::OrderItems.clean_key(),
            "processed/order_items_clean.csv"
        );
        assert_eq!(
            Metric::MonthlySales.key(),
            "processed/metrics/monthly_sales.csv"
        );
    }

    #[test]
    fn file_names_strip_the_extension() {
        assert_eq!(Dataset::from_file_name("reviews.csv"), Some(Dataset::Reviews));
        assert_eq!(Dataset::from_file_name("orders"), Some(Dataset::Orders));
        assert_eq!(Dataset::from_file_name("inventory.csv"), None);
    }
}
