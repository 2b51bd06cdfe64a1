//! `query` command implementation.

use anyhow::{Context, Result};
use contracts::{PointingRequest, SelectorConfig, TargetSet};
use tracing::info;

use crate::cli::QueryArgs;
use crate::error::CliError;

/// Execute the `query` command
pub async fn run_query(args: &QueryArgs) -> Result<()> {
    let config = super::load_config(args.config.as_deref(), &args.connection)?;
    let pointing = pointing_from_args(args, &config)?;

    info!(
        ra = pointing.ra,
        dec = pointing.dec,
        beam_radius = pointing.beam_radius,
        "Selecting targets"
    );

    let targets = select(&config, &pointing).await?;

    if args.json {
        let json =
            serde_json::to_string_pretty(&targets).context("Failed to serialize target set")?;
        println!("{json}");
    } else {
        print_targets(&targets);
    }
    Ok(())
}

fn pointing_from_args(args: &QueryArgs, config: &SelectorConfig) -> Result<PointingRequest> {
    let ra = geometry::parse_right_ascension(&args.ra)
        .map_err(|e| CliError::invalid_coordinate(&args.ra, e))?;
    let dec = geometry::parse_declination(&args.dec)
        .map_err(|e| CliError::invalid_coordinate(&args.dec, e))?;

    let radius_deg = args.radius_deg.unwrap_or(config.triage.beam_radius_deg);
    if !(radius_deg > 0.0 && radius_deg <= 90.0) {
        return Err(CliError::InvalidRadius(radius_deg).into());
    }
    Ok(PointingRequest::new(ra, dec, radius_deg.to_radians()))
}

#[cfg(feature = "live")]
async fn select(config: &SelectorConfig, pointing: &PointingRequest) -> Result<TargetSet> {
    use backends::PostgresCatalog;
    use std::time::Duration;
    use triage::CatalogQueryEngine;

    let catalog = PostgresCatalog::connect(&config.catalog)
        .await
        .map_err(CliError::catalog_connection)?;
    let engine = CatalogQueryEngine::new(catalog)
        .with_timeout(Duration::from_millis(config.catalog.timeout_ms));
    engine
        .select_targets(pointing)
        .await
        .context("Target selection failed")
}

#[cfg(not(feature = "live"))]
async fn select(_config: &SelectorConfig, _pointing: &PointingRequest) -> Result<TargetSet> {
    Err(CliError::LiveBackendsDisabled.into())
}

fn print_targets(targets: &TargetSet) {
    println!("\n=== {} target(s) in beam ===\n", targets.len());
    println!("{:>12}  {:>11}  {:>11}  {:>8}  project", "source_id", "ra", "decl", "priority");
    for target in &targets.targets {
        println!(
            "{:>12}  {:>11.6}  {:>11.6}  {:>8}  {}",
            target.source_id, target.ra, target.decl, target.priority, target.project
        );
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ConnectionArgs;

    fn query(ra: &str, dec: &str, radius_deg: Option<f64>) -> QueryArgs {
        QueryArgs {
            config: None,
            connection: ConnectionArgs::default(),
            ra: ra.into(),
            dec: dec.into(),
            radius_deg,
            json: false,
        }
    }

    #[test]
    fn test_pointing_uses_configured_radius() {
        let config = SelectorConfig::default();
        let pointing = pointing_from_args(&query("05h34m31.94s", "+22d00m52.2s", None), &config)
            .unwrap();
        assert!((pointing.beam_radius - 0.5_f64.to_radians()).abs() < 1e-12);
        assert!((pointing.ra.to_degrees() - 83.633).abs() < 1e-3);
        assert!((pointing.dec.to_degrees() - 22.0145).abs() < 1e-3);
    }

    #[test]
    fn test_pointing_rejects_bad_input() {
        let config = SelectorConfig::default();
        assert!(pointing_from_args(&query("25:00:00", "0", None), &config).is_err());
        assert!(pointing_from_args(&query("05:00:00", "0", Some(0.0)), &config).is_err());
        assert!(pointing_from_args(&query("05:00:00", "north", None), &config).is_err());
    }
}
