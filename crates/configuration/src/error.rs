use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read finmart configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Rejected configuration value: {0}")]
    ValidationError(String),
}
