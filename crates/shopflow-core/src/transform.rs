use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use tracing::info;

use crate::datasets::{CleanTables, Dataset, RawTables};

/// Days between 0001-01-01 and 1970-01-01, the epoch of polars `Date` columns.
const EPOCH_DAYS_FROM_CE: i32 = 719_163;
const DAYS_PER_YEAR: i64 = 365;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Applies the per-dataset cleaning rules to every dataset present in `raw`.
/// Datasets missing from the input are missing from the output.
pub fn transform_datasets(raw: &RawTables, today: NaiveDate) -> PolarsResult<CleanTables> {
    let mut clean = CleanTables::new();

    for (&dataset, df) in raw {
        let cleaned = match dataset {
            Dataset::Customers => clean_customers(df, today)?,
            Dataset::Products => clean_products(df)?,
            Dataset::Orders => clean_orders(df)?,
            Dataset::OrderItems => clean_order_items(df)?,
            Dataset::Reviews => clean_reviews(df)?,
        };
        info!(dataset = %dataset.clean_name(), rows = cleaned.height(), "processed dataset");
        clean.insert(dataset, cleaned);
    }

    Ok(clean)
}

pub fn clean_customers(df: &DataFrame, today: NaiveDate) -> PolarsResult<DataFrame> {
    let emails: Vec<Option<String>> = text_values(df, "email")?
        .into_iter()
        .map(|value| value.map(|email| email.trim().to_lowercase()))
        .collect();
    let birth_dates = date_values(df, "date_of_birth")?;
    let registration_dates = date_values(df, "registration_date")?;

    let ages: Vec<Option<i64>> = birth_dates
        .iter()
        .map(|dob| dob.map(|dob| age_in_years(dob, today)))
        .collect();
    let groups: Vec<Option<&str>> = ages
        .iter()
        .map(|age| age.and_then(age_group))
        .collect();

    let mut output = df.clone();
    output.with_column(Series::new("email".into(), emails))?;
    output.with_column(date_series("date_of_birth", &birth_dates)?)?;
    output.with_column(date_series("registration_date", &registration_dates)?)?;
    output.with_column(Series::new("age".into(), ages))?;
    output.with_column(Series::new("age_group".into(), groups))?;
    Ok(output)
}

pub fn clean_products(df: &DataFrame) -> PolarsResult<DataFrame> {
    let names: Vec<Option<String>> = text_values(df, "product_name")?
        .into_iter()
        .map(|value| value.map(|name| name.trim().to_string()))
        .collect();
    let prices = numeric_values(df, "price")?;
    let categories: Vec<Option<&str>> = prices
        .iter()
        .map(|price| price.and_then(price_category))
        .collect();

    let mut output = df.clone();
    output.with_column(Series::new("product_name".into(), names))?;
    output.with_column(Series::new("price".into(), prices))?;
    output.with_column(Series::new("price_category".into(), categories))?;
    Ok(output)
}

pub fn clean_orders(df: &DataFrame) -> PolarsResult<DataFrame> {
    let order_dates = date_values(df, "order_date")?;
    let amounts = numeric_values(df, "total_amount")?;
    let months: Vec<Option<i32>> = order_dates
        .iter()
        .map(|date| date.map(|date| date.month() as i32))
        .collect();
    let years: Vec<Option<i32>> = order_dates
        .iter()
        .map(|date| date.map(|date| date.year()))
        .collect();

    let mut output = df.clone();
    output.with_column(date_series("order_date", &order_dates)?)?;
    output.with_column(Series::new("total_amount".into(), amounts))?;
    output.with_column(Series::new("order_month".into(), months))?;
    output.with_column(Series::new("order_year".into(), years))?;
    Ok(output)
}

pub fn clean_order_items(df: &DataFrame) -> PolarsResult<DataFrame> {
    let quantities = numeric_values(df, "quantity")?;
    let unit_prices = numeric_values(df, "unit_price")?;
    let totals: Vec<Option<f64>> = quantities
        .iter()
        .zip(&unit_prices)
        .map(|(quantity, price)| match (quantity, price) {
            (Some(quantity), Some(price)) => Some(quantity * price),
            _ => None,
        })
        .collect();

    let mut output = df.clone();
    output.with_column(Series::new("quantity".into(), quantities))?;
    output.with_column(Series::new("unit_price".into(), unit_prices))?;
    output.with_column(Series::new("total_price".into(), totals))?;
    Ok(output)
}

pub fn clean_reviews(df: &DataFrame) -> PolarsResult<DataFrame> {
    let review_dates = date_values(df, "review_date")?;
    let ratings = numeric_values(df, "rating")?;
    let categories: Vec<&str> = ratings.iter().copied().map(rating_category).collect();

    let mut output = df.clone();
    output.with_column(date_series("review_date", &review_dates)?)?;
    output.with_column(Series::new("rating".into(), ratings))?;
    output.with_column(Series::new("rating_category".into(), categories))?;
    Ok(output)
}

/// Whole years between `date_of_birth` and `today`, counting every year as 365 days.
pub fn age_in_years(date_of_birth: NaiveDate, today: NaiveDate) -> i64 {
    (today - date_of_birth).num_days().div_euclid(DAYS_PER_YEAR)
}

/// Upper-inclusive bins (0,25], (25,35], (35,50], (50,65], (65,100].
pub fn age_group(age: i64) -> Option<&'static str> {
    match age {
        1..=25 => Some("18-25"),
        26..=35 => Some("26-35"),
        36..=50 => Some("36-50"),
        51..=65 => Some("51-65"),
        66..=100 => Some("65+"),
        _ => None,
    }
}

/// Upper-inclusive bins (0,50], (50,150], (150,500], (500,inf).
pub fn price_category(price: f64) -> Option<&'static str> {
    if price <= 0.0 {
        None
    } else if price <= 50.0 {
        Some("Budget")
    } else if price <= 150.0 {
        Some("Mid-range")
    } else if price <= 500.0 {
        Some("Premium")
    } else {
        Some("Luxury")
    }
}

pub fn rating_category(rating: Option<f64>) -> &'static str {
    match rating {
        Some(rating) if rating >= 4.5 => "Excellent",
        Some(rating) if rating >= 3.5 => "Good",
        Some(rating) if rating >= 2.5 => "Average",
        _ => "Poor",
    }
}

/// Lenient numeric parse: anything that is not a finite number becomes `None`.
pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
                .map(|datetime| datetime.date())
        })
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|datetime| datetime.date_naive())
        })
}

fn text_values(df: &DataFrame, name: &str) -> PolarsResult<StringChunked> {
    let column = df.column(name)?.cast(&DataType::String)?;
    Ok(column.str()?.clone())
}

fn numeric_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<f64>>> {
    Ok(text_values(df, name)?
        .into_iter()
        .map(|value| value.and_then(parse_number))
        .collect())
}

fn date_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<NaiveDate>>> {
    Ok(text_values(df, name)?
        .into_iter()
        .map(|value| value.and_then(parse_date))
        .collect())
}

fn date_series(name: &str, dates: &[Option<NaiveDate>]) -> PolarsResult<Series> {
    let days: Vec<Option<i32>> = dates
        .iter()
        .map(|date| date.map(|date| date.num_days_from_ce() - EPOCH_DAYS_FROM_CE))
        .collect();
    Series::new(name.into(), days).cast(&DataType::Date)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn age_counts_whole_365_day_years() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let dob = NaiveDate::from_ymd_opt(2000, 6, 1).unwrap();
        assert_eq!(age_in_years(dob, today), 25);
        let just_short = today - chrono::Duration::days(365 * 30 - 1);
        assert_eq!(age_in_years(just_short, today), 29);
    }

    #[test]
    fn age_bins_are_upper_inclusive() {
        assert_eq!(age_group(0), None);
        assert_eq!(age_group(25), Some("18-25"));
        assert_eq!(age_group(26), Some("26-35"));
        assert_eq!(age_group(50), Some("36-50"));
        assert_eq!(age_group(65), Some("51-65"));
        assert_eq!(age_group(100), Some("65+"));
        assert_eq!(age_group(101), None);
    }

    #[test]
    fn dates_accept_common_layouts() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9);
        assert_eq!(parse_date("2024-03-09"), expected);
        assert_eq!(parse_date("03/09/2024"), expected);
        assert_eq!(parse_date("2024-03-09 14:05:00"), expected);
        assert_eq!(parse_date("2024-03-09T14:05:00.250"), expected);
        assert_eq!(parse_date("2024-03-09T14:05:00+02:00"), expected);
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date("  "), None);
    }

    #[test]
    fn numbers_never_fail() {
        assert_eq!(parse_number(" 12.50 "), Some(12.5));
        assert_eq!(parse_number("N/A"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number(""), None);
    }
}
