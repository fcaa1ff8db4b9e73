use crate::error::ConfigError;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use settings::{ApiSettings, Config, PushSettings, StorageSettings};

/// Loads the application configuration from `finmart.toml`, with environment
/// overrides.
///
/// Any value can be overridden via `FINMART_`-prefixed variables with `__` as
/// the section separator, e.g. `FINMART_API__PASSWORD` — credentials in
/// particular should come from the environment rather than the file.
pub fn load_config() -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::with_name("finmart"))
        .add_source(config::Environment::with_prefix("FINMART").separator("__"))
        .build()?;

    let config = builder.try_deserialize::<Config>()?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.api.base_url.is_empty() {
        return Err(ConfigError::ValidationError(
            "api.base_url must not be empty".to_string(),
        ));
    }
    if config.storage.connection.is_empty() {
        return Err(ConfigError::ValidationError(
            "storage.connection must not be empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    const SAMPLE: &str = r#"
        [api]
        base_url = "https://bi.example.com/MicroStrategyLibrary"
        username = "admin"
        password = "secret"
        project_id = "B7CA92F04B9FAE8D941C3E9B7E0CD754"

        [storage]
        backend = "sqlite"
        connection = "finmart.db"

        [push]
        dataset_name = "Financial Metrics"
        table_name = "financials"
    "#;

    fn parse(toml: &str) -> Result<Config, ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize::<Config>()?;
        validate(&config)?;
        Ok(config)
    }

    #[test]
    fn parses_a_complete_file() {
        let config = parse(SAMPLE).unwrap();
        assert_eq!(config.api.username, "admin");
        assert_eq!(config.storage.backend, "sqlite");
        assert_eq!(config.push.table_name, "financials");
        // Optional fields default to empty.
        assert_eq!(config.api.report_id, "");
        assert_eq!(config.push.dataset_description, "");
    }

    #[test]
    fn empty_base_url_fails_validation() {
        let toml = SAMPLE.replace(
            "base_url = \"https://bi.example.com/MicroStrategyLibrary\"",
            "base_url = \"\"",
        );
        assert!(matches!(
            parse(&toml),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn missing_section_is_a_load_error() {
        let toml = "[api]\nbase_url = \"x\"\nusername = \"u\"\npassword = \"p\"";
        assert!(matches!(parse(toml), Err(ConfigError::LoadError(_))));
    }
}
