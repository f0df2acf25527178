use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::types::Importance;
use super::{Error, Result};

/// Tuning parameters of the filter chain and the coupling schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncParameters {
    /// Fraction of samples trimmed from both ends of the sorted sample set
    pub alpha: f64,
    /// Longest tolerated round trip in milliseconds
    pub tolerated_duration_maximum_millis: u64,
    /// Tolerated offset deviation before decay sets in (milliseconds)
    pub tolerated_deviation_start_millis: u64,
    /// Floor of the tolerated offset deviation (milliseconds)
    pub tolerated_deviation_minimum_millis: u64,
    /// Node age after which the tolerated deviation starts to decay
    pub start_decay_after_round: u64,
    /// Exponential decay strength of the tolerated deviation
    pub decay_strength: f64,
    /// Coupling used by young nodes
    pub coupling_start: f64,
    /// Floor of the coupling
    pub coupling_minimum: f64,
    /// Exponential decay strength of the coupling
    pub coupling_decay_strength: f64,
    /// Node age after which the coupling starts to decay
    pub start_coupling_decay_after_round: u64,
}

impl Default for SyncParameters {
    fn default() -> Self {
        SyncParameters {
            alpha: super::ALPHA,
            tolerated_duration_maximum_millis: super::TOLERATED_DURATION_MAXIMUM_MILLIS,
            tolerated_deviation_start_millis: super::TOLERATED_DEVIATION_START_MILLIS,
            tolerated_deviation_minimum_millis: super::TOLERATED_DEVIATION_MINIMUM_MILLIS,
            start_decay_after_round: super::START_DECAY_AFTER_ROUND,
            decay_strength: super::DECAY_STRENGTH,
            coupling_start: super::COUPLING_START,
            coupling_minimum: super::COUPLING_MINIMUM,
            coupling_decay_strength: super::COUPLING_DECAY_STRENGTH,
            start_coupling_decay_after_round: super::START_COUPLING_DECAY_AFTER_ROUND,
        }
    }
}

impl SyncParameters {
    /// Checks that the parameters describe a usable filter chain and coupling schedule
    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.alpha) {
            return Err(Error::config(format!("alpha must be in [0, 1), got {}", self.alpha)));
        }

        if !is_non_negative(self.decay_strength) || !is_non_negative(self.coupling_decay_strength) {
            return Err(Error::config("Decay strengths must be finite and non-negative"));
        }

        if !is_non_negative(self.coupling_minimum) || !is_non_negative(self.coupling_start) {
            return Err(Error::config("Coupling bounds must be finite and non-negative"));
        }

        if self.coupling_minimum > self.coupling_start {
            return Err(Error::config(format!(
                "coupling minimum {} exceeds coupling start {}",
                self.coupling_minimum, self.coupling_start
            )));
        }

        if self.tolerated_deviation_minimum_millis > self.tolerated_deviation_start_millis {
            return Err(Error::config(format!(
                "tolerated deviation minimum {} exceeds tolerated deviation start {}",
                self.tolerated_deviation_minimum_millis, self.tolerated_deviation_start_millis
            )));
        }

        Ok(())
    }
}

fn is_non_negative(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

/// Configuration of the time synchronization service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeSyncConfig {
    /// Maximum number of nodes sampled per round
    pub max_nodes: usize,
    /// Minimum importance a node needs to be sampled
    pub min_importance: Importance,
    /// Total importance of all accounts in the chain
    pub total_chain_importance: Importance,
    /// Sample offsets above this magnitude are logged as warnings
    pub warning_threshold_millis: i64,
    /// Estimates at or below this magnitude are not applied to the clock
    pub clock_adjustment_threshold_millis: u64,
    /// Distance between the unix epoch and the network epoch
    #[serde(serialize_with = "super::serde::serialize_millis")]
    #[serde(deserialize_with = "super::serde::deserialize_millis")]
    pub epoch_adjustment: Duration,
    /// Interval between synchronization rounds
    #[serde(serialize_with = "super::serde::serialize_duration")]
    #[serde(deserialize_with = "super::serde::deserialize_duration")]
    pub round_interval: Duration,
    /// Timeout of a single network time request
    #[serde(serialize_with = "super::serde::serialize_duration")]
    #[serde(deserialize_with = "super::serde::deserialize_duration")]
    pub request_timeout: Duration,
    /// Filter and coupling tuning
    pub parameters: SyncParameters,
}

impl Default for TimeSyncConfig {
    fn default() -> Self {
        TimeSyncConfig {
            max_nodes: super::DEFAULT_MAX_NODES,
            min_importance: Importance(10_000),
            total_chain_importance: Importance(8_999_999_998_000_000),
            warning_threshold_millis: 5_000,
            clock_adjustment_threshold_millis: 85,
            epoch_adjustment: Duration::from_millis(1_615_853_185_000),
            round_interval: Duration::from_secs(60),
            request_timeout: Duration::from_secs(5),
            parameters: SyncParameters::default(),
        }
    }
}

impl TimeSyncConfig {
    /// Checks that the configuration can drive synchronization rounds
    pub fn validate(&self) -> Result<()> {
        if self.max_nodes == 0 {
            return Err(Error::config("max_nodes must be positive"));
        }

        if self.total_chain_importance.0 == 0 {
            return Err(Error::config("total_chain_importance must be positive"));
        }

        if self.warning_threshold_millis < 0 {
            return Err(Error::config("warning_threshold_millis must be non-negative"));
        }

        if self.round_interval.is_zero() {
            return Err(Error::config("round_interval must be positive"));
        }

        if self.request_timeout.is_zero() {
            return Err(Error::config("request_timeout must be positive"));
        }

        self.parameters.validate()
    }
}
