use crate::error::ApiError;
use crate::{MstrClient, Session};
use thiserror::Error;

/// Where a dataset push currently stands. Strictly forward-only:
/// `Created` → `SessionOpened` → `DataUploaded` → `Published`, and a failed
/// step leaves the state where it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushState {
    /// The dataset exists on the server; no upload session yet.
    Created,
    /// An upload session is open and waiting for data.
    SessionOpened,
    /// Row data has been staged but not committed.
    DataUploaded,
    /// The staged data is live. Terminal.
    Published,
}

impl PushState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PushState::Created => "created",
            PushState::SessionOpened => "session opened",
            PushState::DataUploaded => "data uploaded",
            PushState::Published => "published",
        }
    }
}

/// A push step failed; carries which step, the state the push is still in,
/// and the underlying protocol error.
#[derive(Debug, Error)]
#[error("dataset push failed at {step} (state: {})", state.as_str())]
pub struct PushError {
    pub step: &'static str,
    pub state: PushState,
    #[source]
    pub source: ApiError,
}

/// Drives the multi-step publish of one dataset.
///
/// Each step validates the current state, performs one API round-trip, and
/// only then advances. Calling a step out of order is a `PushError` with no
/// network traffic, so a failed chain can be retried from exactly where it
/// stopped.
#[derive(Debug)]
pub struct DatasetPush {
    dataset_id: String,
    upload_id: Option<String>,
    state: PushState,
}

impl DatasetPush {
    /// Begins a push for a dataset that already exists on the server.
    pub fn new(dataset_id: String) -> Self {
        Self {
            dataset_id,
            upload_id: None,
            state: PushState::Created,
        }
    }

    pub fn dataset_id(&self) -> &str {
        &self.dataset_id
    }

    pub fn upload_id(&self) -> Option<&str> {
        self.upload_id.as_deref()
    }

    pub fn state(&self) -> PushState {
        self.state
    }

    fn expect_state(&self, step: &'static str, expected: PushState) -> Result<(), PushError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(PushError {
                step,
                state: self.state,
                source: ApiError::Request(format!(
                    "step requires state '{}', push is in '{}'",
                    expected.as_str(),
                    self.state.as_str()
                )),
            })
        }
    }

    /// Step 1: open an upload session. `Created` → `SessionOpened`.
    pub async fn open_session(
        &mut self,
        client: &MstrClient,
        session: &Session,
    ) -> Result<(), PushError> {
        self.expect_state("open_session", PushState::Created)?;

        let upload_id = client
            .create_upload_session(session, &self.dataset_id)
            .await
            .map_err(|source| PushError {
                step: "open_session",
                state: self.state,
                source,
            })?;

        tracing::info!(dataset_id = %self.dataset_id, upload_id, "upload session opened");
        self.upload_id = Some(upload_id);
        self.state = PushState::SessionOpened;
        Ok(())
    }

    /// Step 2: stage the row data. `SessionOpened` → `DataUploaded`.
    pub async fn upload(
        &mut self,
        client: &MstrClient,
        session: &Session,
        table_name: &str,
        json_rows: &str,
    ) -> Result<(), PushError> {
        self.expect_state("upload", PushState::SessionOpened)?;

        // expect_state guarantees open_session has run.
        let upload_id = self.upload_id.clone().ok_or_else(|| PushError {
            step: "upload",
            state: self.state,
            source: ApiError::Request("upload session id missing".to_string()),
        })?;

        client
            .upload_data(session, &self.dataset_id, &upload_id, table_name, json_rows)
            .await
            .map_err(|source| PushError {
                step: "upload",
                state: self.state,
                source,
            })?;

        tracing::info!(dataset_id = %self.dataset_id, table_name, "data staged");
        self.state = PushState::DataUploaded;
        Ok(())
    }

    /// Step 3: commit. `DataUploaded` → `Published`.
    pub async fn publish(
        &mut self,
        client: &MstrClient,
        session: &Session,
    ) -> Result<(), PushError> {
        self.expect_state("publish", PushState::DataUploaded)?;

        let upload_id = self.upload_id.clone().ok_or_else(|| PushError {
            step: "publish",
            state: self.state,
            source: ApiError::Request("upload session id missing".to_string()),
        })?;

        client
            .publish_dataset(session, &self.dataset_id, &upload_id)
            .await
            .map_err(|source| PushError {
                step: "publish",
                state: self.state,
                source,
            })?;

        tracing::info!(dataset_id = %self.dataset_id, "dataset published");
        self.state = PushState::Published;
        Ok(())
    }
}
