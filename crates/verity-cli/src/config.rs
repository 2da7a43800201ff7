// crates/verity-cli/src/config.rs
//
// Runtime configuration for the Verity CLI.
// Loaded from a TOML file or populated with the engine defaults.

use serde::Deserialize;
use std::fs;
use std::time::Duration;

use verity_core::{ConsensusConfig, TrustWeights, VerityError};
use verity_reputation::ReputationConfig;

/// Runtime configuration for the CLI.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VerityConfig {
    /// Log level when RUST_LOG is unset: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Minimum opinions before a claim can be decided.
    #[serde(default = "default_min_opinions")]
    pub min_opinions: usize,

    /// Trust-weighted share of "true" votes needed to accept a claim.
    #[serde(default = "default_consensus_threshold")]
    pub consensus_threshold: f64,

    /// Global deadline for a validator fan-out, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Factor weights for the trust recompute.
    #[serde(default)]
    pub weights: TrustWeights,

    /// Accuracy history decay per day.
    #[serde(default = "default_decay_rate_per_day")]
    pub decay_rate_per_day: f64,

    /// Blend weight applied when consensus outcomes feed back into scores.
    #[serde(default = "default_nudge_weight")]
    pub nudge_weight: f64,

    /// Default trend horizon in days.
    #[serde(default = "default_trend_days_ahead")]
    pub trend_days_ahead: f64,

    /// Cap on stored accuracy records per participant. Unset keeps everything.
    #[serde(default)]
    pub max_history: Option<usize>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_min_opinions() -> usize {
    ConsensusConfig::default().min_opinions
}

fn default_consensus_threshold() -> f64 {
    ConsensusConfig::default().threshold
}

fn default_timeout_secs() -> u64 {
    ConsensusConfig::default().timeout.as_secs()
}

fn default_decay_rate_per_day() -> f64 {
    ReputationConfig::default().decay_rate_per_day
}

fn default_nudge_weight() -> f64 {
    ReputationConfig::default().nudge_weight
}

fn default_trend_days_ahead() -> f64 {
    ReputationConfig::default().trend_days_ahead
}

impl Default for VerityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            min_opinions: default_min_opinions(),
            consensus_threshold: default_consensus_threshold(),
            timeout_secs: default_timeout_secs(),
            weights: TrustWeights::default(),
            decay_rate_per_day: default_decay_rate_per_day(),
            nudge_weight: default_nudge_weight(),
            trend_days_ahead: default_trend_days_ahead(),
            max_history: None,
        }
    }
}

impl VerityConfig {
    /// Load configuration from a TOML file at the given path.
    ///
    /// Returns an error if the file cannot be read, cannot be parsed, or
    /// carries out-of-range values.
    pub fn load(path: &str) -> Result<Self, VerityError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| VerityError::Config(format!("{}: {}", path, e)))?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, VerityError> {
        let config: VerityConfig =
            toml::from_str(contents).map_err(|e| VerityError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), VerityError> {
        self.consensus_config().validate()?;
        if self.timeout_secs == 0 {
            return Err(VerityError::invalid("timeout_secs must be positive"));
        }
        if !(self.decay_rate_per_day.is_finite() && self.decay_rate_per_day >= 0.0) {
            return Err(VerityError::invalid(format!(
                "decay_rate_per_day must be a non-negative number, got {}",
                self.decay_rate_per_day
            )));
        }
        if !(0.0..=1.0).contains(&self.nudge_weight) {
            return Err(VerityError::invalid(format!(
                "nudge_weight must be in [0, 1], got {}",
                self.nudge_weight
            )));
        }
        if !(self.trend_days_ahead.is_finite() && self.trend_days_ahead >= 0.0) {
            return Err(VerityError::invalid("trend_days_ahead must be a non-negative number"));
        }
        let w = &self.weights;
        if [w.accuracy, w.consistency, w.validation]
            .iter()
            .any(|v| !v.is_finite() || *v < 0.0)
        {
            return Err(VerityError::invalid("weights must be non-negative numbers"));
        }
        Ok(())
    }

    pub fn consensus_config(&self) -> ConsensusConfig {
        ConsensusConfig {
            min_opinions: self.min_opinions,
            threshold: self.consensus_threshold,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }

    pub fn reputation_config(&self) -> ReputationConfig {
        ReputationConfig {
            decay_rate_per_day: self.decay_rate_per_day,
            weights: self.weights,
            nudge_weight: self.nudge_weight,
            trend_days_ahead: self.trend_days_ahead,
            max_history: self.max_history,
        }
    }
}
