use crate::error::DbError;
use crate::{DepartmentSpending, FinStore, SourceSystemCount};
use async_trait::async_trait;
use core_types::{FinancialRecord, Transaction};
use rand::Rng;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;

/// Embedded SQLite backend.
///
/// Owns its schema: `connect` creates the tables if missing and, when the
/// transaction table is empty, seeds a 50-row sample set so a fresh install
/// has data to summarize and push. Suitable for local and demo use.
pub struct SqliteStore {
    pool: SqlitePool,
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    date TEXT NOT NULL,
    department TEXT NOT NULL,
    category TEXT NOT NULL,
    vendor TEXT NOT NULL,
    amount REAL NOT NULL,
    status TEXT NOT NULL,
    source_system TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS financial_records (
    period TEXT NOT NULL,
    company_id TEXT NOT NULL,
    revenue REAL NOT NULL,
    cogs REAL NOT NULL,
    operating_expenses REAL NOT NULL,
    depreciation REAL NOT NULL,
    amortization REAL NOT NULL,
    interest REAL NOT NULL,
    taxes REAL NOT NULL,
    current_assets REAL NOT NULL,
    current_liabilities REAL NOT NULL,
    inventory REAL NOT NULL,
    total_assets REAL NOT NULL,
    total_liabilities REAL NOT NULL
);
";

impl SqliteStore {
    /// Opens (creating if needed) the database at `connection` — a file path
    /// or `:memory:` — then bootstraps the schema and sample data.
    pub async fn connect(connection: &str) -> Result<Self, DbError> {
        let options = SqliteConnectOptions::from_str(connection)
            .map_err(|e| DbError::ConnectionConfigError(e.to_string()))?
            .create_if_missing(true);

        // An in-memory database exists per connection, so the pool must stay
        // at a single connection for the schema to be visible everywhere.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.bootstrap().await?;
        Ok(store)
    }

    async fn bootstrap(&self) -> Result<(), DbError> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;

        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions")
            .fetch_one(&self.pool)
            .await?;
        if existing == 0 {
            self.seed_sample_transactions().await?;
            tracing::info!("seeded sample transactions into empty sqlite store");
        }
        Ok(())
    }

    /// Inserts 50 randomized sample transactions across fixed departments,
    /// categories, vendors and source systems.
    async fn seed_sample_transactions(&self) -> Result<(), DbError> {
        const DEPARTMENTS: [&str; 5] =
            ["Finance", "Engineering", "Marketing", "Operations", "HR"];
        const CATEGORIES: [&str; 5] =
            ["Software", "Travel", "Hardware", "Consulting", "Office Supplies"];
        const VENDORS: [&str; 5] =
            ["Acme Corp", "Globex", "Initech", "Umbrella Supplies", "Stark Industries"];
        const STATUSES: [&str; 2] = ["Posted", "Pending"];
        const SOURCE_SYSTEMS: [&str; 3] = ["SAP", "Oracle", "Workday"];

        let mut rng = rand::thread_rng();

        for _ in 0..50 {
            let date = format!(
                "2024-{:02}-{:02}",
                rng.gen_range(1..=12),
                rng.gen_range(1..=28)
            );
            let amount = (rng.gen_range(50.0..20_000.0_f64) * 100.0).round() / 100.0;

            sqlx::query(
                "INSERT INTO transactions \
                 (date, department, category, vendor, amount, status, source_system) \
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&date)
            .bind(DEPARTMENTS[rng.gen_range(0..DEPARTMENTS.len())])
            .bind(CATEGORIES[rng.gen_range(0..CATEGORIES.len())])
            .bind(VENDORS[rng.gen_range(0..VENDORS.len())])
            .bind(amount)
            .bind(STATUSES[rng.gen_range(0..STATUSES.len())])
            .bind(SOURCE_SYSTEMS[rng.gen_range(0..SOURCE_SYSTEMS.len())])
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }
}

fn transaction_from_row(row: &SqliteRow) -> Result<Transaction, sqlx::Error> {
    Ok(Transaction {
        id: row.try_get("id")?,
        date: row.try_get("date")?,
        department: row.try_get("department")?,
        category: row.try_get("category")?,
        vendor: row.try_get("vendor")?,
        amount: row.try_get("amount")?,
        status: row.try_get("status")?,
        source_system: row.try_get("source_system")?,
    })
}

fn record_from_row(row: &SqliteRow) -> Result<FinancialRecord, sqlx::Error> {
    Ok(FinancialRecord {
        period: row.try_get("period")?,
        company_id: row.try_get("company_id")?,
        revenue: row.try_get("revenue")?,
        cogs: row.try_get("cogs")?,
        operating_expenses: row.try_get("operating_expenses")?,
        depreciation: row.try_get("depreciation")?,
        amortization: row.try_get("amortization")?,
        interest: row.try_get("interest")?,
        taxes: row.try_get("taxes")?,
        current_assets: row.try_get("current_assets")?,
        current_liabilities: row.try_get("current_liabilities")?,
        inventory: row.try_get("inventory")?,
        total_assets: row.try_get("total_assets")?,
        total_liabilities: row.try_get("total_liabilities")?,
    })
}

#[async_trait]
impl FinStore for SqliteStore {
    async fn get_all_transactions(&self) -> Result<Vec<Transaction>, DbError> {
        let rows = sqlx::query(
            "SELECT id, date, department, category, vendor, amount, status, source_system \
             FROM transactions ORDER BY date DESC LIMIT 100",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| transaction_from_row(row).map_err(DbError::from))
            .collect()
    }

    async fn get_department_spending(&self) -> Result<Vec<DepartmentSpending>, DbError> {
        let rows = sqlx::query(
            "SELECT department, SUM(amount) AS total FROM transactions \
             GROUP BY department ORDER BY total DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(DepartmentSpending {
                    department: row.try_get("department")?,
                    total: row.try_get("total")?,
                })
            })
            .collect()
    }

    async fn get_source_system_counts(&self) -> Result<Vec<SourceSystemCount>, DbError> {
        let rows = sqlx::query(
            "SELECT source_system, COUNT(*) AS count FROM transactions \
             GROUP BY source_system ORDER BY count DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(SourceSystemCount {
                    source_system: row.try_get("source_system")?,
                    count: row.try_get("count")?,
                })
            })
            .collect()
    }

    async fn get_total_spending(&self) -> Result<f64, DbError> {
        let total: Option<f64> = sqlx::query_scalar("SELECT SUM(amount) FROM transactions")
            .fetch_one(&self.pool)
            .await?;
        Ok(total.unwrap_or(0.0))
    }

    async fn get_financial_records(&self) -> Result<Vec<FinancialRecord>, DbError> {
        let rows = sqlx::query(
            "SELECT * FROM financial_records ORDER BY period ASC, company_id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| record_from_row(row).map_err(DbError::from))
            .collect()
    }

    async fn get_financial_records_by_company(
        &self,
        company_id: &str,
    ) -> Result<Vec<FinancialRecord>, DbError> {
        let rows = sqlx::query(
            "SELECT * FROM financial_records WHERE company_id = ? ORDER BY period ASC",
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| record_from_row(row).map_err(DbError::from))
            .collect()
    }

    async fn insert_financial_record(&self, record: &FinancialRecord) -> Result<(), DbError> {
        sqlx::query(
            "INSERT INTO financial_records \
             (period, company_id, revenue, cogs, operating_expenses, depreciation, \
              amortization, interest, taxes, current_assets, current_liabilities, \
              inventory, total_assets, total_liabilities) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.period)
        .bind(&record.company_id)
        .bind(record.revenue)
        .bind(record.cogs)
        .bind(record.operating_expenses)
        .bind(record.depreciation)
        .bind(record.amortization)
        .bind(record.interest)
        .bind(record.taxes)
        .bind(record.current_assets)
        .bind(record.current_liabilities)
        .bind(record.inventory)
        .bind(record.total_assets)
        .bind(record.total_liabilities)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn is_open(&self) -> bool {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> SqliteStore {
        SqliteStore::connect(":memory:").await.unwrap()
    }

    fn record(period: &str, company_id: &str, revenue: f64) -> FinancialRecord {
        FinancialRecord {
            period: period.to_string(),
            company_id: company_id.to_string(),
            revenue,
            cogs: revenue * 0.4,
            operating_expenses: revenue * 0.2,
            total_assets: revenue * 2.0,
            total_liabilities: revenue * 0.8,
            ..FinancialRecord::default()
        }
    }

    #[tokio::test]
    async fn fresh_store_is_seeded_with_fifty_transactions() {
        let store = store().await;
        let transactions = store.get_all_transactions().await.unwrap();
        assert_eq!(transactions.len(), 50);
        assert!(transactions.iter().all(|t| t.amount > 0.0));
    }

    #[tokio::test]
    async fn transactions_come_back_newest_first() {
        let store = store().await;
        let transactions = store.get_all_transactions().await.unwrap();
        for pair in transactions.windows(2) {
            assert!(pair[0].date >= pair[1].date);
        }
    }

    #[tokio::test]
    async fn seeding_runs_only_on_an_empty_store() {
        let store = store().await;
        // A second bootstrap over the same pool must not double the data.
        store.bootstrap().await.unwrap();
        assert_eq!(store.get_all_transactions().await.unwrap().len(), 50);
    }

    #[tokio::test]
    async fn department_spending_is_sorted_descending() {
        let store = store().await;
        let spending = store.get_department_spending().await.unwrap();
        assert!(!spending.is_empty());
        for pair in spending.windows(2) {
            assert!(pair[0].total >= pair[1].total);
        }
    }

    #[tokio::test]
    async fn total_spending_matches_the_department_breakdown() {
        let store = store().await;
        let total = store.get_total_spending().await.unwrap();
        let by_department: f64 = store
            .get_department_spending()
            .await
            .unwrap()
            .iter()
            .map(|d| d.total)
            .sum();
        assert!((total - by_department).abs() < 1e-6);
    }

    #[tokio::test]
    async fn source_system_counts_cover_every_row() {
        let store = store().await;
        let counts = store.get_source_system_counts().await.unwrap();
        let total: i64 = counts.iter().map(|c| c.count).sum();
        assert_eq!(total, 50);
    }

    #[tokio::test]
    async fn financial_records_round_trip() {
        let store = store().await;
        store
            .insert_financial_record(&record("2024-Q1", "ACME", 1000.0))
            .await
            .unwrap();
        store
            .insert_financial_record(&record("2024-Q2", "ACME", 1100.0))
            .await
            .unwrap();

        let records = store.get_financial_records().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].period, "2024-Q1");
        assert_eq!(records[0].revenue, 1000.0);
    }

    #[tokio::test]
    async fn company_filter_only_returns_that_company() {
        let store = store().await;
        store
            .insert_financial_record(&record("2024-Q1", "ACME", 1000.0))
            .await
            .unwrap();
        store
            .insert_financial_record(&record("2024-Q1", "GLOBEX", 500.0))
            .await
            .unwrap();

        let records = store
            .get_financial_records_by_company("ACME")
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].company_id, "ACME");
    }

    #[tokio::test]
    async fn open_store_reports_open() {
        let store = store().await;
        assert!(store.is_open().await);
        assert_eq!(store.backend_name(), "sqlite");
    }
}
