//! # Finmart Database Crate
//!
//! This crate is the storage adapter: the rest of the application talks to a
//! [`FinStore`] trait object and never sees SQL or a concrete driver. Two
//! backends implement the trait — an embedded SQLite store that bootstraps
//! its own schema and sample data (local / demo mode), and a PostgreSQL store
//! for a shared server. The active backend is a configuration value resolved
//! once at startup by [`connect`].
//!
//! ## Public API
//!
//! - `FinStore`: the storage trait every backend implements.
//! - `StorageBackend` + `connect`: backend selection and pool construction.
//! - `DbError`: the specific error types that can be returned from this crate.

use async_trait::async_trait;
use core_types::{FinancialRecord, Transaction};
use std::str::FromStr;

pub mod error;
pub mod postgres;
pub mod sqlite;

pub use error::DbError;
pub use postgres::PostgresStore;
pub use sqlite::SqliteStore;

/// Spending aggregated per department, largest first.
#[derive(Debug, Clone, PartialEq)]
pub struct DepartmentSpending {
    pub department: String,
    pub total: f64,
}

/// Row counts per originating source system.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSystemCount {
    pub source_system: String,
    pub count: i64,
}

/// The storage seam between the orchestrator and a concrete database.
///
/// All methods are read/append only; nothing here mutates existing rows. A
/// backend owns its connection pool, so trait objects are cheap to share.
#[async_trait]
pub trait FinStore: Send + Sync {
    /// The most recent transactions, newest first, capped at 100 rows.
    async fn get_all_transactions(&self) -> Result<Vec<Transaction>, DbError>;

    /// Total spend per department, highest spend first.
    async fn get_department_spending(&self) -> Result<Vec<DepartmentSpending>, DbError>;

    /// Transaction counts per source system.
    async fn get_source_system_counts(&self) -> Result<Vec<SourceSystemCount>, DbError>;

    /// Sum of all transaction amounts; `0.0` for an empty store.
    async fn get_total_spending(&self) -> Result<f64, DbError>;

    /// Every stored financial record, ordered by period then company.
    async fn get_financial_records(&self) -> Result<Vec<FinancialRecord>, DbError>;

    /// Financial records for one company, ordered by period.
    async fn get_financial_records_by_company(
        &self,
        company_id: &str,
    ) -> Result<Vec<FinancialRecord>, DbError>;

    /// Appends one financial record.
    async fn insert_financial_record(&self, record: &FinancialRecord) -> Result<(), DbError>;

    /// Whether the pool can currently serve queries.
    async fn is_open(&self) -> bool;

    /// Stable backend label for logs and status output.
    fn backend_name(&self) -> &'static str;
}

/// Which storage implementation to run against. Resolved from configuration,
/// never from a compile-time switch, so one build serves both deployments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Sqlite,
    Postgres,
}

impl FromStr for StorageBackend {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(StorageBackend::Sqlite),
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            other => Err(DbError::UnknownBackend(other.to_string())),
        }
    }
}

/// Connects the configured backend and returns it behind the trait.
///
/// `connection` is a driver connection string: a file path or `:memory:` for
/// SQLite, a `postgres://` URL for PostgreSQL. The SQLite backend also
/// bootstraps its schema and sample data here, so a first run needs no
/// external setup.
pub async fn connect(
    backend: StorageBackend,
    connection: &str,
) -> Result<Box<dyn FinStore>, DbError> {
    match backend {
        StorageBackend::Sqlite => {
            let store = SqliteStore::connect(connection).await?;
            Ok(Box::new(store))
        }
        StorageBackend::Postgres => {
            let store = PostgresStore::connect(connection).await?;
            Ok(Box::new(store))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_names_parse_case_insensitively() {
        assert_eq!("sqlite".parse::<StorageBackend>().unwrap(), StorageBackend::Sqlite);
        assert_eq!("SQLite".parse::<StorageBackend>().unwrap(), StorageBackend::Sqlite);
        assert_eq!(
            "postgresql".parse::<StorageBackend>().unwrap(),
            StorageBackend::Postgres
        );
    }

    #[test]
    fn unknown_backend_is_rejected() {
        assert!(matches!(
            "oracle".parse::<StorageBackend>(),
            Err(DbError::UnknownBackend(_))
        ));
    }

    #[tokio::test]
    async fn factory_builds_a_working_sqlite_store() {
        let store = connect(StorageBackend::Sqlite, ":memory:").await.unwrap();
        assert_eq!(store.backend_name(), "sqlite");
        assert!(store.is_open().await);
        // Bootstrap seeds the sample set on an empty store.
        assert!(store.get_total_spending().await.unwrap() > 0.0);
    }
}
