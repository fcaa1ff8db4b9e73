//! JSON payload shaping for the dataset push and cube refresh workflows.
//!
//! The column list and its order are part of the wire contract with the
//! remote server: the definition and every data row must agree positionally.
//! Both are produced from the same `DATASET_COLUMNS` table so they cannot
//! drift apart.

use analytics::FinancialMetrics;
use core_types::Transaction;
use serde::Serialize;
use serde_json::json;

/// The fixed dataset schema: two identifier columns, then the derived
/// metrics, all DOUBLE. Order is positional and must not change.
const DATASET_COLUMNS: [(&str, &str); 15] = [
    ("Period", "STRING"),
    ("CompanyID", "STRING"),
    ("Revenue", "DOUBLE"),
    ("GrossProfit", "DOUBLE"),
    ("GrossMargin", "DOUBLE"),
    ("EBITDA", "DOUBLE"),
    ("EBIT", "DOUBLE"),
    ("NetIncome", "DOUBLE"),
    ("NetMargin", "DOUBLE"),
    ("WorkingCapital", "DOUBLE"),
    ("CurrentRatio", "DOUBLE"),
    ("QuickRatio", "DOUBLE"),
    ("DebtToEquity", "DOUBLE"),
    ("ROA", "DOUBLE"),
    ("ROE", "DOUBLE"),
];

#[derive(Serialize)]
struct ColumnHeader {
    name: &'static str,
    #[serde(rename = "dataType")]
    data_type: &'static str,
}

#[derive(Serialize)]
struct TableDefinition<'a> {
    name: &'a str,
    #[serde(rename = "columnHeaders")]
    column_headers: Vec<ColumnHeader>,
}

#[derive(Serialize)]
struct DatasetDefinition<'a> {
    name: &'a str,
    description: &'a str,
    tables: Vec<TableDefinition<'a>>,
}

/// Builds the dataset definition payload for the create-dataset call.
pub fn dataset_definition_json(name: &str, description: &str, table_name: &str) -> String {
    let definition = DatasetDefinition {
        name,
        description,
        tables: vec![TableDefinition {
            name: table_name,
            column_headers: DATASET_COLUMNS
                .iter()
                .map(|(name, data_type)| ColumnHeader { name, data_type })
                .collect(),
        }],
    };
    // Serializing a static structure cannot fail.
    serde_json::to_string(&definition).unwrap_or_default()
}

/// Rounds to four decimal places; ratio values are display artifacts, not
/// accounting figures, and the server stores them as DOUBLE anyway.
fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Builds the row payload for the upload and cube-refresh calls: one
/// positional array per metrics entry, aligned with `DATASET_COLUMNS`.
pub fn dataset_data_json(metrics: &[FinancialMetrics]) -> String {
    let rows: Vec<serde_json::Value> = metrics
        .iter()
        .map(|m| {
            json!([
                m.record.period,
                m.record.company_id,
                round4(m.record.revenue),
                round4(m.gross_profit()),
                round4(m.gross_margin()),
                round4(m.ebitda()),
                round4(m.ebit()),
                round4(m.net_income()),
                round4(m.net_margin()),
                round4(m.working_capital()),
                round4(m.current_ratio()),
                round4(m.quick_ratio()),
                round4(m.debt_to_equity()),
                round4(m.return_on_assets()),
                round4(m.return_on_equity()),
            ])
        })
        .collect();

    json!({ "data": rows }).to_string()
}

/// Named-field rendering of the full metrics set, for display and export.
/// Carries two ratios (`operating_margin`, `debt_ratio`) that the dataset
/// schema does not.
pub fn metrics_to_json(metrics: &[FinancialMetrics]) -> String {
    let entries: Vec<serde_json::Value> = metrics
        .iter()
        .map(|m| {
            json!({
                "period": m.record.period,
                "company_id": m.record.company_id,
                "revenue": round4(m.record.revenue),
                "gross_profit": round4(m.gross_profit()),
                "gross_margin": round4(m.gross_margin()),
                "ebitda": round4(m.ebitda()),
                "ebit": round4(m.ebit()),
                "net_income": round4(m.net_income()),
                "net_margin": round4(m.net_margin()),
                "operating_margin": round4(m.operating_margin()),
                "working_capital": round4(m.working_capital()),
                "current_ratio": round4(m.current_ratio()),
                "quick_ratio": round4(m.quick_ratio()),
                "debt_to_equity": round4(m.debt_to_equity()),
                "debt_ratio": round4(m.debt_ratio()),
                "roa": round4(m.return_on_assets()),
                "roe": round4(m.return_on_equity()),
            })
        })
        .collect();

    json!({ "metrics": entries }).to_string()
}

/// Export rendering of a transaction listing.
pub fn transactions_to_json(transactions: &[Transaction]) -> String {
    json!({ "transactions": transactions }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::FinancialRecord;

    fn metrics(period: &str, revenue: f64) -> FinancialMetrics {
        FinancialMetrics::from(FinancialRecord {
            period: period.to_string(),
            company_id: "ACME".to_string(),
            revenue,
            cogs: revenue * 0.4,
            operating_expenses: revenue * 0.2,
            total_assets: revenue * 2.0,
            total_liabilities: revenue * 0.8,
            ..FinancialRecord::default()
        })
    }

    #[test]
    fn definition_preserves_the_column_order() {
        let json = dataset_definition_json("Financial Metrics", "quarterly", "financials");
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed["name"], "Financial Metrics");
        assert_eq!(parsed["tables"][0]["name"], "financials");

        let headers = parsed["tables"][0]["columnHeaders"].as_array().unwrap();
        let names: Vec<&str> = headers.iter().map(|h| h["name"].as_str().unwrap()).collect();
        assert_eq!(
            names,
            vec![
                "Period", "CompanyID", "Revenue", "GrossProfit", "GrossMargin", "EBITDA",
                "EBIT", "NetIncome", "NetMargin", "WorkingCapital", "CurrentRatio",
                "QuickRatio", "DebtToEquity", "ROA", "ROE",
            ]
        );
        assert_eq!(headers[0]["dataType"], "STRING");
        assert_eq!(headers[1]["dataType"], "STRING");
        assert!(headers[2..].iter().all(|h| h["dataType"] == "DOUBLE"));
    }

    #[test]
    fn data_rows_align_with_the_definition() {
        let json = dataset_data_json(&[metrics("2024-Q1", 1000.0), metrics("2024-Q2", 1200.0)]);
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        let rows = parsed["data"].as_array().unwrap();
        assert_eq!(rows.len(), 2);
        for row in rows {
            assert_eq!(row.as_array().unwrap().len(), 15);
        }
        assert_eq!(rows[0][0], "2024-Q1");
        assert_eq!(rows[0][1], "ACME");
        assert_eq!(rows[0][2], 1000.0);
        // GrossProfit = revenue - cogs.
        assert_eq!(rows[0][3], 600.0);
        assert_eq!(rows[0][4], 0.6);
    }

    #[test]
    fn empty_metrics_produce_an_empty_data_array() {
        let parsed: serde_json::Value =
            serde_json::from_str(&dataset_data_json(&[])).unwrap();
        assert_eq!(parsed["data"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn named_rendering_carries_the_extra_ratios() {
        let json = metrics_to_json(&[metrics("2024-Q1", 1000.0)]);
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        let entry = &parsed["metrics"][0];
        assert_eq!(entry["period"], "2024-Q1");
        assert!(entry.get("operating_margin").is_some());
        assert!(entry.get("debt_ratio").is_some());
    }

    #[test]
    fn ratios_are_rounded_to_four_places() {
        // revenue 3: gross margin = (3 - 1.2) / 3 = 0.6 exactly; use an
        // uneven revenue instead to exercise the rounding.
        let m = FinancialMetrics::from(FinancialRecord {
            period: "2024-Q1".to_string(),
            company_id: "ACME".to_string(),
            revenue: 3.0,
            cogs: 1.0,
            ..FinancialRecord::default()
        });
        let parsed: serde_json::Value =
            serde_json::from_str(&dataset_data_json(&[m])).unwrap();
        // (3 - 1) / 3 = 0.6666...
        assert_eq!(parsed["data"][0][4], 0.6667);
    }
}
