//! Engine configuration: noise bands, seasonal profile and default scenarios.
//!
//! Every field has a default so a partial YAML document (or none at all) is
//! a valid configuration.

use crate::{AnalyticsError, ScenarioSpec};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Range the per-step forecast baseline is drawn from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastCfg {
    pub base_min: f64,
    pub base_max: f64,
}

impl Default for ForecastCfg {
    fn default() -> Self {
        Self {
            base_min: 800.0,
            base_max: 1200.0,
        }
    }
}

/// Backfill shape: where the walk starts relative to the anchor and how
/// much each intermediate point may wobble.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoricalCfg {
    /// First value as a fraction of the anchor.
    pub start_fraction: f64,
    /// Max relative perturbation of intermediate points, e.g. 0.05 = ±5%.
    pub noise_band: f64,
}

impl Default for HistoricalCfg {
    fn default() -> Self {
        Self {
            start_fraction: 0.7,
            noise_band: 0.05,
        }
    }
}

/// Multiplier bands for the first and last calendar quarters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonalCfg {
    pub q1_min: f64,
    pub q1_max: f64,
    pub q4_min: f64,
    pub q4_max: f64,
}

impl Default for SeasonalCfg {
    fn default() -> Self {
        Self {
            q1_min: 0.8,
            q1_max: 0.9,
            q4_min: 1.2,
            q4_max: 1.5,
        }
    }
}

impl SeasonalCfg {
    /// Seasonality switched off: every month has factor 1.
    pub fn neutral() -> Self {
        Self {
            q1_min: 1.0,
            q1_max: 1.0,
            q4_min: 1.0,
            q4_max: 1.0,
        }
    }
}

/// Top-level engine configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seed for the deterministic RNG streams; a request seed overrides it.
    pub seed: u64,
    pub forecast: ForecastCfg,
    pub historical: HistoricalCfg,
    pub seasonal: SeasonalCfg,
    /// Scenarios used when a forecast request does not name its own.
    pub scenarios: Vec<ScenarioSpec>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            forecast: ForecastCfg::default(),
            historical: HistoricalCfg::default(),
            seasonal: SeasonalCfg::default(),
            scenarios: default_scenarios(),
        }
    }
}

/// Base Case (0.6, ×1.0), Optimistic (0.2, ×1.5), Pessimistic (0.2, ×0.5).
pub fn default_scenarios() -> Vec<ScenarioSpec> {
    vec![
        ScenarioSpec::new("Base Case", 0.6, 1.0),
        ScenarioSpec::new("Optimistic", 0.2, 1.5),
        ScenarioSpec::new("Pessimistic", 0.2, 0.5),
    ]
}

fn check_range(name: &str, lo: f64, hi: f64) -> Result<(), AnalyticsError> {
    if !(lo.is_finite() && hi.is_finite()) {
        return Err(AnalyticsError::InvalidConfig(format!("{name}: non-finite bound")));
    }
    if lo > hi {
        return Err(AnalyticsError::InvalidConfig(format!(
            "{name}: min {lo} exceeds max {hi}"
        )));
    }
    Ok(())
}

impl EngineConfig {
    /// Parse a YAML document and validate it.
    pub fn from_yaml_str(text: &str) -> Result<Self, AnalyticsError> {
        let cfg: EngineConfig =
            serde_yaml::from_str(text).map_err(|e| AnalyticsError::InvalidConfig(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load and validate a YAML config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, AnalyticsError> {
        let text = fs::read_to_string(path.as_ref()).map_err(|e| {
            AnalyticsError::InvalidConfig(format!("{}: {e}", path.as_ref().display()))
        })?;
        Self::from_yaml_str(&text)
    }

    pub fn validate(&self) -> Result<(), AnalyticsError> {
        check_range("forecast.base", self.forecast.base_min, self.forecast.base_max)?;
        if self.forecast.base_min < 0.0 {
            return Err(AnalyticsError::InvalidConfig(
                "forecast.base_min must be >= 0".into(),
            ));
        }
        let h = &self.historical;
        if !(h.start_fraction.is_finite() && h.start_fraction >= 0.0) {
            return Err(AnalyticsError::InvalidConfig(
                "historical.start_fraction must be finite and >= 0".into(),
            ));
        }
        if !(0.0..1.0).contains(&h.noise_band) {
            return Err(AnalyticsError::InvalidConfig(
                "historical.noise_band must be within [0, 1)".into(),
            ));
        }
        check_range("seasonal.q1", self.seasonal.q1_min, self.seasonal.q1_max)?;
        check_range("seasonal.q4", self.seasonal.q4_min, self.seasonal.q4_max)?;
        for (name, min) in [
            ("seasonal.q1_min", self.seasonal.q1_min),
            ("seasonal.q4_min", self.seasonal.q4_min),
        ] {
            if min < 0.0 {
                return Err(AnalyticsError::InvalidConfig(format!("{name} must be >= 0")));
            }
        }
        for s in &self.scenarios {
            if !(s.probability_weight.is_finite() && s.growth_adjustment_factor.is_finite()) {
                return Err(AnalyticsError::InvalidConfig(format!(
                    "scenario {}: non-finite weight or factor",
                    s.name
                )));
            }
        }
        Ok(())
    }
}
