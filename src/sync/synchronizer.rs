//! Importance-weighted offset estimation
//!
//! The synchronizer filters a round's samples, weights the remaining offsets by
//! the importance of the sampled accounts and damps the result with a coupling
//! factor that shrinks as the node ages.

use tracing::{debug, trace, warn};

use crate::core::{Height, Importance, NodeAge, SyncParameters, TimeOffset, TimeSyncConfig};
use super::aggregate::AggregateSynchronizationFilter;
use super::importance::ImportanceView;
use super::sample::{TimeSynchronizationSample, TimeSynchronizationSamples};

/// Calculates the time offset of a node from the samples of one round
pub struct TimeSynchronizer {
    filter: AggregateSynchronizationFilter,
    total_chain_importance: Importance,
    warning_threshold_millis: i64,
    coupling_start: f64,
    coupling_minimum: f64,
    coupling_decay_strength: f64,
    start_coupling_decay_after_round: u64,
}

impl TimeSynchronizer {
    /// Creates a synchronizer with the default coupling schedule
    pub fn new(
        filter: AggregateSynchronizationFilter,
        total_chain_importance: Importance,
        warning_threshold_millis: i64,
    ) -> Self {
        Self::with_parameters(filter, total_chain_importance, warning_threshold_millis, &SyncParameters::default())
    }

    /// Creates a synchronizer taking its coupling schedule from `parameters`
    pub fn with_parameters(
        filter: AggregateSynchronizationFilter,
        total_chain_importance: Importance,
        warning_threshold_millis: i64,
        parameters: &SyncParameters,
    ) -> Self {
        TimeSynchronizer {
            filter,
            total_chain_importance,
            warning_threshold_millis,
            coupling_start: parameters.coupling_start,
            coupling_minimum: parameters.coupling_minimum,
            coupling_decay_strength: parameters.coupling_decay_strength,
            start_coupling_decay_after_round: parameters.start_coupling_decay_after_round,
        }
    }

    /// Creates a synchronizer with the standard filter chain described by `config`
    pub fn from_config(config: &TimeSyncConfig) -> Self {
        Self::with_parameters(
            AggregateSynchronizationFilter::from_parameters(&config.parameters),
            config.total_chain_importance,
            config.warning_threshold_millis,
            &config.parameters,
        )
    }

    /// Damping factor applied to the weighted offset at `node_age`
    pub fn coupling(&self, node_age: NodeAge) -> f64 {
        let age_to_use = node_age.rounds_after(self.start_coupling_decay_after_round) as f64;
        let decayed = (-self.coupling_decay_strength * age_to_use).exp() * self.coupling_start;
        decayed.max(self.coupling_minimum)
    }

    /// Calculates the offset this node should apply to its clock
    ///
    /// Degenerate rounds (no usable samples, no importance behind the samples,
    /// no eligible accounts) yield a zero offset.
    pub fn calculate_time_offset<V>(
        &self,
        view: &V,
        height: Height,
        mut samples: TimeSynchronizationSamples,
        node_age: NodeAge,
    ) -> TimeOffset
    where
        V: ImportanceView + ?Sized,
    {
        self.filter.apply(&mut samples, node_age);
        if samples.is_empty() {
            debug!(node_age = node_age.0, "no samples available for time synchronization");
            return TimeOffset(0);
        }

        let weighted: Vec<(&TimeSynchronizationSample, u64)> = samples
            .iter()
            .map(|sample| (sample, view.importance(sample.identity(), height).0))
            .collect();

        let cumulative_importance = weighted
            .iter()
            .fold(0u64, |sum, (_, importance)| sum.saturating_add(*importance));
        if cumulative_importance == 0 {
            debug!(
                num_samples = samples.len(),
                "cumulative importance of samples is zero, skipping time synchronization"
            );
            return TimeOffset(0);
        }

        let num_eligible = view.high_value_account_count();
        if num_eligible == 0 || self.total_chain_importance.0 == 0 {
            debug!(
                num_eligible,
                total_chain_importance = self.total_chain_importance.0,
                "no eligible accounts, skipping time synchronization"
            );
            return TimeOffset(0);
        }

        let total_importance = self.total_chain_importance.0 as f64;
        let view_percentage = samples.len() as f64 / num_eligible as f64;
        let importance_percentage = cumulative_importance as f64 / total_importance;
        let scaling = if importance_percentage > view_percentage {
            1.0 / importance_percentage
        } else {
            1.0 / view_percentage
        };

        let sum: f64 = weighted
            .iter()
            .map(|(sample, importance)| {
                let offset = sample.time_offset_to_remote();
                self.log_sample_offset(sample, offset);
                scaling * (offset as f64 * *importance as f64 / total_importance)
            })
            .sum();

        let coupling = self.coupling(node_age);
        // truncates toward zero
        let time_offset = TimeOffset((coupling * sum) as i64);
        debug!(
            num_samples = samples.len(),
            num_eligible,
            scaling,
            coupling,
            offset = time_offset.0,
            "calculated time offset"
        );
        time_offset
    }

    fn log_sample_offset(&self, sample: &TimeSynchronizationSample, offset: i64) {
        if offset.unsigned_abs() > self.warning_threshold_millis.unsigned_abs() {
            warn!(peer = %sample.identity(), offset, "peer reported a large time offset");
        } else {
            trace!(peer = %sample.identity(), offset, "peer time offset");
        }
    }
}
