//! Configuration validation
//!
//! Rules:
//! - field ranges declared on the config types (`validator` derive)
//! - table names are plain SQL identifiers
//! - listener names are unique
//! - publish columns are unique
//! - the control and telemetry channels are covered by some listener

use std::collections::HashSet;

use contracts::{ContractError, SelectorConfig};
use regex::Regex;
use validator::Validate;

/// Validate a parsed config
///
/// Returns the first error encountered.
pub fn validate(config: &SelectorConfig) -> Result<(), ContractError> {
    config
        .validate()
        .map_err(|e| ContractError::config_validation("config", e.to_string()))?;
    validate_table_names(config)?;
    validate_listener_names(config)?;
    validate_publish_columns(config)?;
    validate_channel_coverage(config)?;
    Ok(())
}

fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Table names are interpolated into queries, so only bare identifiers are allowed
fn validate_table_names(config: &SelectorConfig) -> Result<(), ContractError> {
    let tables = [
        ("catalog.source_table", &config.catalog.source_table),
        ("catalog.observation_table", &config.catalog.observation_table),
    ];
    for (field, name) in tables {
        if !is_sql_identifier(name) {
            return Err(ContractError::config_validation(
                field,
                format!("'{name}' is not a valid table name"),
            ));
        }
    }
    Ok(())
}

fn validate_listener_names(config: &SelectorConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for listener in &config.listeners {
        if !seen.insert(listener.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("listeners[name={}]", listener.name),
                "duplicate listener name",
            ));
        }
        if let Some(idx) = listener.patterns.iter().position(|p| p.is_empty()) {
            return Err(ContractError::config_validation(
                format!("listeners[{}].patterns[{idx}]", listener.name),
                "pattern cannot be empty",
            ));
        }
    }
    Ok(())
}

fn validate_publish_columns(config: &SelectorConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for column in &config.triage.publish_columns {
        if !seen.insert(column) {
            return Err(ContractError::config_validation(
                "triage.publish_columns",
                format!("duplicate column '{}'", column.name()),
            ));
        }
    }
    Ok(())
}

/// A channel nobody subscribes to would silently drop its events
fn validate_channel_coverage(config: &SelectorConfig) -> Result<(), ContractError> {
    let channels = [
        ("bus.control_channel", &config.bus.control_channel),
        ("bus.telemetry_channel", &config.bus.telemetry_channel),
    ];
    for (field, channel) in channels {
        let covered = config
            .listeners
            .iter()
            .flat_map(|l| l.patterns.iter())
            .any(|p| glob_matches(p, channel));
        if !covered {
            return Err(ContractError::config_validation(
                field,
                format!("no listener subscribes to '{channel}'"),
            ));
        }
    }
    Ok(())
}

/// Bus-style glob match (`*` and `?` only)
fn glob_matches(pattern: &str, text: &str) -> bool {
    let mut expr = String::from("^");
    for c in pattern.chars() {
        match c {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            other => expr.push_str(&regex::escape(other.encode_utf8(&mut [0u8; 4]))),
        }
    }
    expr.push('$');
    Regex::new(&expr).is_ok_and(|re| re.is_match(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ListenerConfig, PublishColumn};

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&SelectorConfig::default()).is_ok());
    }

    #[test]
    fn test_bad_table_name() {
        let mut config = SelectorConfig::default();
        config.catalog.source_table = "targets; DROP TABLE x".into();
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("not a valid table name"), "got: {err}");
    }

    #[test]
    fn test_duplicate_listener_name() {
        let mut config = SelectorConfig::default();
        config.listeners[1].name = config.listeners[0].name.clone();
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("duplicate listener name"), "got: {err}");
    }

    #[test]
    fn test_duplicate_publish_column() {
        let mut config = SelectorConfig::default();
        config.triage.publish_columns = vec![PublishColumn::Ra, PublishColumn::Ra];
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("duplicate column 'ra'"), "got: {err}");
    }

    #[test]
    fn test_uncovered_telemetry_channel() {
        let mut config = SelectorConfig::default();
        config.listeners = vec![ListenerConfig::new("control", vec!["alerts".into()])];
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("sensor_alerts"), "got: {err}");
    }

    #[test]
    fn test_wildcard_listener_covers_both_channels() {
        let mut config = SelectorConfig::default();
        config.listeners = vec![ListenerConfig::new("all", vec!["*alerts".into()])];
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_range_errors_surface_as_validation() {
        let mut config = SelectorConfig::default();
        config.triage.beam_radius_deg = -1.0;
        let err = validate(&config).unwrap_err();
        assert!(matches!(err, ContractError::ConfigValidation { .. }));
    }

    #[test]
    fn test_glob_matches() {
        assert!(glob_matches("sensor_*", "sensor_alerts"));
        assert!(glob_matches("alert?", "alerts"));
        assert!(!glob_matches("alerts", "sensor_alerts"));
        assert!(glob_matches("*", ""));
    }
}
