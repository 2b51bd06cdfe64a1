//! Configuration parsing
//!
//! TOML is the primary format; JSON is accepted as well.

use contracts::{ContractError, SelectorConfig};

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML (recommended)
    Toml,
    Json,
}

impl ConfigFormat {
    /// Infer the format from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

pub fn parse_toml(content: &str) -> Result<SelectorConfig, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

pub fn parse_json(content: &str) -> Result<SelectorConfig, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

pub fn parse(content: &str, format: ConfigFormat) -> Result<SelectorConfig, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::PublishColumn;

    #[test]
    fn test_parse_toml_partial() {
        let content = r#"
[bus]
url = "redis://bus.example:6379"

[catalog]
source_table = "gaia_targets"

[triage]
beam_radius_deg = 0.25
publish_columns = ["source_id", "ra", "decl"]
"#;
        let config = parse_toml(content).unwrap();
        assert_eq!(config.bus.url, "redis://bus.example:6379");
        assert_eq!(config.bus.control_channel, "alerts");
        assert_eq!(config.catalog.source_table, "gaia_targets");
        assert_eq!(config.catalog.observation_table, "observation_status");
        assert_eq!(config.triage.beam_radius_deg, 0.25);
        assert_eq!(
            config.triage.publish_columns,
            vec![PublishColumn::SourceId, PublishColumn::Ra, PublishColumn::Decl]
        );
        assert_eq!(config.listeners.len(), 2);
    }

    #[test]
    fn test_parse_json_listeners() {
        let content = r#"{
            "listeners": [
                { "name": "everything", "patterns": ["alerts", "sensor_*"] }
            ]
        }"#;
        let config = parse_json(content).unwrap();
        assert_eq!(config.listeners.len(), 1);
        assert_eq!(config.listeners[0].patterns, vec!["alerts", "sensor_*"]);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let err = parse_toml("invalid toml [[[").unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_unknown_publish_column_rejected() {
        let err = parse_toml("[triage]\npublish_columns = [\"magnitude\"]\n").unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_extension("toml"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("TOML"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("json"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
