use serde::Deserialize;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api: ApiSettings,
    pub storage: StorageSettings,
    pub push: PushSettings,
}

/// Connection parameters for the remote BI server.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiSettings {
    /// Library base URL, e.g. `https://bi.example.com/MicroStrategyLibrary`.
    pub base_url: String,
    pub username: String,
    pub password: String,
    /// Project every authenticated call is scoped to. May be empty for
    /// server-level calls only.
    #[serde(default)]
    pub project_id: String,
    /// Default report for `report` commands.
    #[serde(default)]
    pub report_id: String,
    /// Default cube for `sync` and `update-cube` commands.
    #[serde(default)]
    pub cube_id: String,
}

/// Which local store to run against and how to reach it.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// `"sqlite"` or `"postgres"`. A runtime value, so one build serves both
    /// deployments.
    pub backend: String,
    /// Driver connection string: a file path / `:memory:` for SQLite, a
    /// `postgres://` URL for PostgreSQL.
    pub connection: String,
}

/// Identity of the dataset created by the push workflow.
#[derive(Debug, Clone, Deserialize)]
pub struct PushSettings {
    pub dataset_name: String,
    #[serde(default)]
    pub dataset_description: String,
    /// Table name inside the dataset; also the `tableName` query parameter
    /// of the upload step.
    pub table_name: String,
}
