//! # Settings Loading
//!
//! ## Load Order (later overrides earlier)
//! 1. Default values
//! 2. Settings embedded in the snapshot
//! 3. Settings file (`--settings` or `MERIDIAN_SETTINGS`)
//! 4. Environment variables
//!
//! ```text
//! MERIDIAN_SETTINGS=./pricing.toml
//! MERIDIAN_PRECISION=3
//! MERIDIAN_PF_PERCENTAGE=5
//! MERIDIAN_ROUNDING=true
//! ```

use std::path::{Path, PathBuf};

use meridian_core::{PricingSettings, Rate};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::error::{CliError, CliResult};

pub const SETTINGS_ENV: &str = "MERIDIAN_SETTINGS";
const PRECISION_ENV: &str = "MERIDIAN_PRECISION";
const PF_PERCENTAGE_ENV: &str = "MERIDIAN_PF_PERCENTAGE";
const ROUNDING_ENV: &str = "MERIDIAN_ROUNDING";

/// Resolves the settings file path: flag first, then environment.
pub fn settings_path(flag: Option<PathBuf>) -> Option<PathBuf> {
    flag.or_else(|| std::env::var_os(SETTINGS_ENV).map(PathBuf::from))
}

/// Loads settings over `base` and applies process environment overrides.
pub fn load(path: Option<&Path>, base: PricingSettings) -> CliResult<PricingSettings> {
    let mut settings = base;

    if let Some(path) = path {
        info!(?path, "Loading pricing settings from file");
        let text = std::fs::read_to_string(path).map_err(|source| CliError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        settings = PricingSettings::from_toml_str(&text)?;
    }

    apply_env_overrides(&mut settings, |name| std::env::var(name).ok())?;
    settings.validate()?;
    Ok(settings)
}

/// Applies `MERIDIAN_*` overrides read through `lookup`.
pub fn apply_env_overrides(
    settings: &mut PricingSettings,
    lookup: impl Fn(&str) -> Option<String>,
) -> CliResult<()> {
    if let Some(value) = lookup(PRECISION_ENV) {
        settings.precision = value.trim().parse().map_err(|_| CliError::InvalidEnv {
            name: PRECISION_ENV,
            value: value.clone(),
        })?;
        debug!(precision = settings.precision, "Overriding precision from environment");
    }

    if let Some(value) = lookup(PF_PERCENTAGE_ENV) {
        let percent: Decimal = value.trim().parse().map_err(|_| CliError::InvalidEnv {
            name: PF_PERCENTAGE_ENV,
            value: value.clone(),
        })?;
        settings.pf_percentage = Some(Rate::from_percent(percent));
        debug!(%percent, "Overriding P&F percentage from environment");
    }

    if let Some(value) = lookup(ROUNDING_ENV) {
        settings.rounding_adjustment = match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => {
                return Err(CliError::InvalidEnv {
                    name: ROUNDING_ENV,
                    value,
                })
            }
        };
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = PricingSettings::default();
        apply_env_overrides(
            &mut settings,
            env(&[
                ("MERIDIAN_PRECISION", "3"),
                ("MERIDIAN_PF_PERCENTAGE", "2.5"),
                ("MERIDIAN_ROUNDING", "on"),
            ]),
        )
        .unwrap();
        assert_eq!(settings.precision, 3);
        assert_eq!(settings.pf_percentage, Some(Rate::from_percent("2.5".parse().unwrap())));
        assert!(settings.rounding_adjustment);
    }

    #[test]
    fn test_bad_env_value_is_reported() {
        let mut settings = PricingSettings::default();
        let err = apply_env_overrides(&mut settings, env(&[("MERIDIAN_ROUNDING", "maybe")])).unwrap_err();
        assert!(matches!(err, CliError::InvalidEnv { name: "MERIDIAN_ROUNDING", .. }));
    }

    #[test]
    fn test_no_env_keeps_base() {
        let base = PricingSettings {
            precision: 4,
            ..Default::default()
        };
        let mut settings = base.clone();
        apply_env_overrides(&mut settings, env(&[])).unwrap();
        assert_eq!(settings, base);
    }
}
