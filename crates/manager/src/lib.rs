//! # Finmart Manager Crate
//!
//! The orchestration layer. [`DataManager`] owns the API session, the
//! protocol client and the storage backend, and composes them into the two
//! application flows:
//!
//! 1. **ETL pull**: authenticate, select a project, pull financial data from
//!    the remote server or the local store, derive metrics, summarize.
//! 2. **Push/publish**: serialize metrics to the fixed dataset schema and
//!    run the multi-step publish chain (or refresh an existing cube).
//!
//! Errors from the protocol, push and storage layers are converted into
//! [`ManagerError`] at this boundary; nothing here panics on a failed call.

pub mod dataset;
pub mod error;
mod manager;

pub use dataset::{dataset_data_json, dataset_definition_json, metrics_to_json, transactions_to_json};
pub use error::ManagerError;
pub use manager::DataManager;
