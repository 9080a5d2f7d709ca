//! Store configuration
//!
//! All sections have defaults, so an empty YAML document is a valid
//! configuration.

use crate::error::{Result, StoreError};
use crate::instrument::{HeaderPolicy, RiskTier};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Complete store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub decay: DecayConfig,

    #[serde(default)]
    pub planner: PlannerConfig,

    /// Seed for ranking tie-breaks and allocation draws (None = entropy)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub random_seed: Option<u64>,
}

/// Catalog ingestion configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Maximum number of instruments a load may carry
    #[serde(default = "default_max_instruments")]
    pub max_instruments: usize,

    /// Field delimiter for delimited text input
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Treatment of the first row of delimited text input
    #[serde(default)]
    pub header: HeaderPolicy,
}

/// Decay period and factor for one risk tier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecaySchedule {
    /// Decay fires when the tier's counter is a multiple of this
    pub period: u32,

    /// Multiplier applied to every expected return when decay fires
    pub factor: f64,
}

/// When the per-tier decay counters start over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DecayLifecycle {
    /// Counters live as long as the store
    #[default]
    PerProcess,
    /// Counters reset at the start of every session
    PerSession,
}

/// Risk decay configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecayConfig {
    #[serde(default = "default_low_decay")]
    pub low: DecaySchedule,

    #[serde(default = "default_medium_decay")]
    pub medium: DecaySchedule,

    #[serde(default = "default_high_decay")]
    pub high: DecaySchedule,

    #[serde(default)]
    pub lifecycle: DecayLifecycle,
}

impl DecayConfig {
    pub fn schedule(&self, tier: RiskTier) -> DecaySchedule {
        match tier {
            RiskTier::Low => self.low,
            RiskTier::Medium => self.medium,
            RiskTier::High => self.high,
        }
    }
}

/// Order in which automatic mode visits candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CandidateOrder {
    /// One uniform random draw (with replacement) per catalog slot
    #[default]
    RandomPick,
    /// Each instrument once, in the catalog's current view order
    Ranked,
}

/// Allocation planner configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    #[serde(default)]
    pub candidate_order: CandidateOrder,

    /// Smallest share of the remaining budget offered to one pick, in percent
    #[serde(default = "default_min_fraction_pct")]
    pub min_fraction_pct: u32,

    /// Largest share of the remaining budget offered to one pick, in percent
    #[serde(default = "default_max_fraction_pct")]
    pub max_fraction_pct: u32,

    /// Reject manual selections whose tier differs from the session's
    #[serde(default)]
    pub enforce_risk_match_in_manual_mode: bool,
}

/// How a session builds its portfolio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionMode {
    Recommend,
    Choose,
}

impl FromStr for SelectionMode {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "recommend" => Ok(SelectionMode::Recommend),
            "choose" => Ok(SelectionMode::Choose),
            other => Err(StoreError::ConfigError(format!(
                "unknown selection mode {:?} (expected recommend or choose)",
                other
            ))),
        }
    }
}

// Default value functions
fn default_max_instruments() -> usize {
    1000
}

fn default_delimiter() -> char {
    ','
}

fn default_low_decay() -> DecaySchedule {
    DecaySchedule {
        period: 9,
        factor: 0.9,
    }
}

fn default_medium_decay() -> DecaySchedule {
    DecaySchedule {
        period: 4,
        factor: 0.75,
    }
}

fn default_high_decay() -> DecaySchedule {
    DecaySchedule {
        period: 2,
        factor: 0.5,
    }
}

fn default_min_fraction_pct() -> u32 {
    15
}

fn default_max_fraction_pct() -> u32 {
    25
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            max_instruments: default_max_instruments(),
            delimiter: default_delimiter(),
            header: HeaderPolicy::default(),
        }
    }
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            low: default_low_decay(),
            medium: default_medium_decay(),
            high: default_high_decay(),
            lifecycle: DecayLifecycle::default(),
        }
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            candidate_order: CandidateOrder::default(),
            min_fraction_pct: default_min_fraction_pct(),
            max_fraction_pct: default_max_fraction_pct(),
            enforce_risk_match_in_manual_mode: false,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            catalog: CatalogConfig::default(),
            decay: DecayConfig::default(),
            planner: PlannerConfig::default(),
            random_seed: None,
        }
    }
}

impl StoreConfig {
    /// Load configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: StoreConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| StoreError::ConfigError(format!("{}: {}", path, e)))?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let config: StoreConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.catalog.max_instruments == 0 {
            return Err(StoreError::ConfigError(
                "catalog.max_instruments must be at least 1".to_string(),
            ));
        }

        for tier in RiskTier::ALL {
            let schedule = self.decay.schedule(tier);
            if schedule.period == 0 {
                return Err(StoreError::ConfigError(format!(
                    "decay period for {} must be at least 1",
                    tier
                )));
            }
            if !(schedule.factor > 0.0 && schedule.factor <= 1.0) {
                return Err(StoreError::ConfigError(format!(
                    "decay factor for {} must be in (0, 1], got {}",
                    tier, schedule.factor
                )));
            }
        }

        let planner = &self.planner;
        if planner.min_fraction_pct > planner.max_fraction_pct || planner.max_fraction_pct > 100 {
            return Err(StoreError::ConfigError(format!(
                "planner fraction bounds {}..={} must be ordered and at most 100",
                planner.min_fraction_pct, planner.max_fraction_pct
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.catalog.max_instruments, 1000);
        assert_eq!(config.catalog.delimiter, ',');
        assert_eq!(config.decay.schedule(RiskTier::Low).period, 9);
        assert_eq!(config.decay.schedule(RiskTier::Medium).factor, 0.75);
        assert_eq!(config.decay.schedule(RiskTier::High).factor, 0.5);
        assert_eq!(config.decay.lifecycle, DecayLifecycle::PerProcess);
        assert_eq!(config.planner.min_fraction_pct, 15);
        assert_eq!(config.planner.max_fraction_pct, 25);
        assert!(!config.planner.enforce_risk_match_in_manual_mode);
        assert!(config.random_seed.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config = StoreConfig::from_yaml("{}").unwrap();
        assert_eq!(config, StoreConfig::default());
    }

    #[test]
    fn test_partial_yaml() {
        let yaml = r#"
catalog:
  max_instruments: 50
  delimiter: ";"
  header: Skip
decay:
  high:
    period: 3
    factor: 0.8
  lifecycle: PerSession
planner:
  candidate_order: Ranked
  enforce_risk_match_in_manual_mode: true
random_seed: 42
"#;
        let config = StoreConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.catalog.max_instruments, 50);
        assert_eq!(config.catalog.delimiter, ';');
        assert_eq!(config.catalog.header, HeaderPolicy::Skip);
        assert_eq!(config.decay.high.period, 3);
        assert_eq!(config.decay.low.period, 9);
        assert_eq!(config.decay.lifecycle, DecayLifecycle::PerSession);
        assert_eq!(config.planner.candidate_order, CandidateOrder::Ranked);
        assert_eq!(config.planner.max_fraction_pct, 25);
        assert!(config.planner.enforce_risk_match_in_manual_mode);
        assert_eq!(config.random_seed, Some(42));
    }

    #[test]
    fn test_json_config() {
        let json = r#"{ "catalog": { "max_instruments": 10 }, "random_seed": 7 }"#;
        let config = StoreConfig::from_json(json).unwrap();
        assert_eq!(config.catalog.max_instruments, 10);
        assert_eq!(config.random_seed, Some(7));
    }

    #[test]
    fn test_yaml_round_trip() {
        let mut config = StoreConfig::default();
        config.random_seed = Some(1);
        let yaml = config.to_yaml().unwrap();
        assert!(yaml.contains("catalog:"));
        assert!(yaml.contains("planner:"));
        assert_eq!(StoreConfig::from_yaml(&yaml).unwrap(), config);
    }

    #[test]
    fn test_validation_failures() {
        assert!(StoreConfig::from_yaml("catalog:\n  max_instruments: 0\n").is_err());
        let zero_period = "decay:\n  low:\n    period: 0\n    factor: 0.9\n";
        assert!(StoreConfig::from_yaml(zero_period).is_err());
        let growing = "decay:\n  low:\n    period: 2\n    factor: 1.5\n";
        assert!(StoreConfig::from_yaml(growing).is_err());
        assert!(StoreConfig::from_yaml("planner:\n  min_fraction_pct: 30\n").is_err());
        assert!(matches!(
            StoreConfig::from_yaml("catalog: [1, 2]"),
            Err(StoreError::YamlError(_))
        ));
    }

    #[test]
    fn test_selection_mode_parsing() {
        assert_eq!("recommend".parse::<SelectionMode>().unwrap(), SelectionMode::Recommend);
        assert_eq!("Choose".parse::<SelectionMode>().unwrap(), SelectionMode::Choose);
        assert!("pick".parse::<SelectionMode>().is_err());
    }
}
