//! # Config Loader
//!
//! Loads the target selector configuration.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate ranges, identifiers and listener layout
//! - Produce a `SelectorConfig`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_from_path(Path::new("selector.toml")).unwrap();
//! println!("Bus: {}", config.bus.url);
//! ```

mod parser;
mod validator;

pub use contracts::SelectorConfig;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file path
    ///
    /// The format is taken from the file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<SelectorConfig, ContractError> {
        let format = Self::detect_format(path)?;
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from a string
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<SelectorConfig, ContractError> {
        let config = parser::parse(content, format)?;
        validator::validate(&config)?;
        Ok(config)
    }

    /// Defaults, validated
    pub fn load_default() -> Result<SelectorConfig, ContractError> {
        let config = SelectorConfig::default();
        validator::validate(&config)?;
        Ok(config)
    }

    /// Re-run validation after fields were overridden
    pub fn validate(config: &SelectorConfig) -> Result<(), ContractError> {
        validator::validate(config)
    }

    pub fn to_toml(config: &SelectorConfig) -> Result<String, ContractError> {
        toml::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    pub fn to_json(config: &SelectorConfig) -> Result<String, ContractError> {
        serde_json::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }

    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SELECTOR_TOML: &str = r#"
[bus]
url = "redis://bus.example:6379"
result_channel = "targets"

[catalog]
url = "postgres://catalog.example/targets"
timeout_ms = 2500

[[listeners]]
name = "control"
patterns = ["alerts"]

[[listeners]]
name = "telemetry"
patterns = ["sensor_alerts"]

[triage]
beam_radius_deg = 0.5
bands = "S BAND"
mode = 2
"#;

    #[test]
    fn test_load_from_path_toml() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(SELECTOR_TOML.as_bytes()).unwrap();

        let config = ConfigLoader::load_from_path(file.path()).unwrap();
        assert_eq!(config.bus.result_channel, "targets");
        assert_eq!(config.catalog.timeout_ms, 2500);
        assert_eq!(config.triage.bands, "S BAND");
        assert_eq!(config.triage.mode, 2);
    }

    #[test]
    fn test_load_from_path_unknown_extension() {
        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        let err = ConfigLoader::load_from_path(file.path()).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConfigLoader::load_from_path(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ContractError::Io(_)));
    }

    #[test]
    fn test_round_trip_json() {
        let config = ConfigLoader::load_from_str(SELECTOR_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&config).unwrap();
        let back = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(back.bus.url, config.bus.url);
        assert_eq!(back.listeners, config.listeners);
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let content = r#"
[[listeners]]
name = "control"
patterns = ["alerts", "sensor_alerts"]

[[listeners]]
name = "control"
patterns = ["alerts"]
"#;
        let err = ConfigLoader::load_from_str(content, ConfigFormat::Toml).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_load_default() {
        let config = ConfigLoader::load_default().unwrap();
        assert_eq!(config.catalog.max_connections, 4);
    }
}
