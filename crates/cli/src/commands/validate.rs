//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::SelectorConfig;
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    bus_url: String,
    result_channel: String,
    listeners: Vec<String>,
    beam_radius_deg: f64,
    publish_columns: Vec<&'static str>,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", config.version),
                    bus_url: config.bus.url.clone(),
                    result_channel: config.bus.result_channel.clone(),
                    listeners: config.listeners.iter().map(|l| l.name.clone()).collect(),
                    beam_radius_deg: config.triage.beam_radius_deg,
                    publish_columns: config
                        .triage
                        .publish_columns
                        .iter()
                        .map(|c| c.name())
                        .collect(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &SelectorConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    let result = &config.bus.result_channel;
    if config
        .listeners
        .iter()
        .any(|l| l.patterns.iter().any(|p| p == result))
    {
        warnings.push(format!(
            "A listener subscribes to the result channel '{result}' - announcements will be re-ingested"
        ));
    }

    if config.triage.beam_radius_deg > 5.0 {
        warnings.push(format!(
            "beam_radius_deg = {} is unusually wide - catalog queries may be slow",
            config.triage.beam_radius_deg
        ));
    }

    if config.catalog.timeout_ms < 100 {
        warnings.push(format!(
            "catalog.timeout_ms = {} - most pointings will time out",
            config.catalog.timeout_ms
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Bus: {}", summary.bus_url);
            println!("  Result channel: {}", summary.result_channel);
            println!("  Listeners: {}", summary.listeners.join(", "));
            println!("  Beam radius: {}°", summary.beam_radius_deg);
            println!("  Published columns: {}", summary.publish_columns.join(", "));
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args_for(content: &str) -> (tempfile::NamedTempFile, ValidateArgs) {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: true,
        };
        (file, args)
    }

    #[test]
    fn test_valid_file_has_summary() {
        let (_file, args) = args_for("[triage]\nbeam_radius_deg = 0.5\n");
        let result = validate_config(&args);
        assert!(result.valid);
        let summary = result.summary.unwrap();
        assert_eq!(summary.listeners, vec!["control", "telemetry"]);
        assert_eq!(summary.publish_columns, vec!["ra", "decl", "priority"]);
    }

    #[test]
    fn test_invalid_file_reports_error() {
        let (_file, args) = args_for("[catalog]\nsource_table = \"bad table\"\n");
        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("table name"));
    }

    #[test]
    fn test_wide_beam_warns() {
        let (_file, args) = args_for("[triage]\nbeam_radius_deg = 10.0\n");
        let result = validate_config(&args);
        assert!(result.valid);
        assert_eq!(result.warnings.unwrap().len(), 1);
    }
}
