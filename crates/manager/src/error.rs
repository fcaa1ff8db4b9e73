use api_client::error::ApiError;
use api_client::push::PushError;
use database::DbError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManagerError {
    #[error("API call failed: {0}")]
    Api(#[from] ApiError),

    #[error("Dataset push failed: {0}")]
    Push(#[from] PushError),

    #[error("Storage operation failed: {0}")]
    Storage(#[from] DbError),

    #[error("No storage backend attached (call connect_store first)")]
    StoreNotConnected,
}
