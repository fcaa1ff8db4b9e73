use serde::{Deserialize, Serialize};

/// A single operational spending transaction as landed in the warehouse by
/// the ETL seed step. Read-only from the perspective of this system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    /// Transaction date as an opaque `YYYY-MM-DD` string; dates travel
    /// through the whole pipeline unparsed.
    pub date: String,
    pub department: String,
    pub category: String,
    pub vendor: String,
    pub amount: f64,
    pub status: String,
    /// Originating system of record (e.g. "PeopleSoft", "Coupa", "SAP").
    pub source_system: String,
}

/// One raw financial reporting period for one company.
///
/// Keyed by `(company_id, period)` by convention; uniqueness is the storage
/// layer's concern, not enforced here. All monetary fields are plain `f64`
/// because the upstream dataset schema types them `DOUBLE` and rows are
/// serialized as bare JSON numbers. Sample data is non-negative by
/// construction, but nothing downstream may assume that.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FinancialRecord {
    pub period: String,
    pub company_id: String,
    pub revenue: f64,
    pub cogs: f64,
    pub operating_expenses: f64,
    pub depreciation: f64,
    pub amortization: f64,
    pub interest: f64,
    pub taxes: f64,
    pub current_assets: f64,
    pub current_liabilities: f64,
    pub inventory: f64,
    pub total_assets: f64,
    pub total_liabilities: f64,
}
