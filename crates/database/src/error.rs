use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Invalid storage configuration: {0}")]
    ConnectionConfigError(String),

    #[error("Unknown storage backend '{0}' (expected 'sqlite' or 'postgres')")]
    UnknownBackend(String),

    #[error("Database operation failed: {0}")]
    QueryError(#[from] sqlx::Error),
}
