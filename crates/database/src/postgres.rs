use crate::error::DbError;
use crate::{DepartmentSpending, FinStore, SourceSystemCount};
use async_trait::async_trait;
use core_types::{FinancialRecord, Transaction};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::time::Duration;

/// PostgreSQL backend for a shared server deployment.
///
/// Same schema and query surface as the SQLite store, but without sample
/// seeding: a shared server's data is owned by its operators, not by this
/// client. The schema is still created if missing so a pointed-at empty
/// database works.
pub struct PostgresStore {
    pool: PgPool,
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS transactions (
    id BIGSERIAL PRIMARY KEY,
    date TEXT NOT NULL,
    department TEXT NOT NULL,
    category TEXT NOT NULL,
    vendor TEXT NOT NULL,
    amount DOUBLE PRECISION NOT NULL,
    status TEXT NOT NULL,
    source_system TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS financial_records (
    period TEXT NOT NULL,
    company_id TEXT NOT NULL,
    revenue DOUBLE PRECISION NOT NULL,
    cogs DOUBLE PRECISION NOT NULL,
    operating_expenses DOUBLE PRECISION NOT NULL,
    depreciation DOUBLE PRECISION NOT NULL,
    amortization DOUBLE PRECISION NOT NULL,
    interest DOUBLE PRECISION NOT NULL,
    taxes DOUBLE PRECISION NOT NULL,
    current_assets DOUBLE PRECISION NOT NULL,
    current_liabilities DOUBLE PRECISION NOT NULL,
    inventory DOUBLE PRECISION NOT NULL,
    total_assets DOUBLE PRECISION NOT NULL,
    total_liabilities DOUBLE PRECISION NOT NULL
);
";

impl PostgresStore {
    /// Connects a pool to the given `postgres://` URL and ensures the schema
    /// exists.
    pub async fn connect(connection: &str) -> Result<Self, DbError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(5))
            .connect(connection)
            .await?;

        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        tracing::info!("postgres store connected");
        Ok(Self { pool })
    }
}

fn transaction_from_row(row: &PgRow) -> Result<Transaction, sqlx::Error> {
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

fn record_from_row(row: &PgRow) -> Result<FinancialRecord, sqlx::Error> {
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
impl FinStore for PostgresStore {
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
            "SELECT * FROM financial_records WHERE company_id = $1 ORDER BY period ASC",
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
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
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
        "postgres"
    }
}
