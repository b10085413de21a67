use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use shopflow_core::ItemSummary;

/// One row per attempted object: stored rows or the failure reason.
pub fn outputs_table(summary: &ItemSummary) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Key", "Status", "Rows / Reason"]);

    for success in &summary.succeeded {
        table.add_row(vec![
            Cell::new(&success.key),
            Cell::new("stored"),
            Cell::new(success.rows),
        ]);
    }
    for failure in &summary.failed {
        table.add_row(vec![
            Cell::new(&failure.key),
            Cell::new("failed"),
            Cell::new(&failure.reason),
        ]);
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopflow_core::{ItemFailure, ItemSuccess};

    #[test]
    fn table_lists_successes_then_failures() {
        let mut summary = ItemSummary::default();
        summary.record(Err(ItemFailure {
            key: "processed/metrics/product_metrics.csv".into(),
            reason: "upload reset".into(),
        }));
        summary.record(Ok(ItemSuccess {
            key: "processed/orders_clean.csv".into(),
            rows: 4,
        }));

        let rendered = outputs_table(&summary).to_string();

        let stored = rendered.find("orders_clean").unwrap();
        let failed = rendered.find("product_metrics").unwrap();
        assert!(stored < failed);
        assert!(rendered.contains("upload reset"));
    }
}
