//! Sample filters
//!
//! A filter inspects one sample together with the node age and decides whether
//! the sample is untrustworthy. Filters return `true` to reject.

use crate::core::{NodeAge, SyncParameters};
use super::sample::TimeSynchronizationSample;

/// Predicate rejecting untrustworthy samples
pub trait SynchronizationFilter: Send + Sync {
    /// Returns true if the sample should be discarded
    fn is_rejected(&self, sample: &TimeSynchronizationSample, node_age: NodeAge) -> bool;

    /// Short name used in diagnostics
    fn name(&self) -> &'static str {
        "custom"
    }
}

impl<F> SynchronizationFilter for F
where
    F: Fn(&TimeSynchronizationSample, NodeAge) -> bool + Send + Sync,
{
    fn is_rejected(&self, sample: &TimeSynchronizationSample, node_age: NodeAge) -> bool {
        self(sample, node_age)
    }
}

/// Rejects samples whose timestamps run backwards
#[derive(Debug, Clone, Copy, Default)]
pub struct ReversedTimestampsFilter;

impl SynchronizationFilter for ReversedTimestampsFilter {
    fn is_rejected(&self, sample: &TimeSynchronizationSample, _node_age: NodeAge) -> bool {
        let local = sample.local_timestamps();
        let remote = sample.remote_timestamps();
        local.receive < local.send || remote.send < remote.receive
    }

    fn name(&self) -> &'static str {
        "reversed timestamps"
    }
}

/// Rejects samples whose round trip took too long
#[derive(Debug, Clone, Copy)]
pub struct ResponseDelayDetectionFilter {
    tolerated_duration_maximum_millis: u64,
}

impl ResponseDelayDetectionFilter {
    pub fn new(tolerated_duration_maximum_millis: u64) -> Self {
        ResponseDelayDetectionFilter { tolerated_duration_maximum_millis }
    }
}

impl Default for ResponseDelayDetectionFilter {
    fn default() -> Self {
        Self::new(crate::core::TOLERATED_DURATION_MAXIMUM_MILLIS)
    }
}

impl SynchronizationFilter for ResponseDelayDetectionFilter {
    fn is_rejected(&self, sample: &TimeSynchronizationSample, _node_age: NodeAge) -> bool {
        sample.duration() > self.tolerated_duration_maximum_millis
    }

    fn name(&self) -> &'static str {
        "response delay"
    }
}

/// Rejects samples whose offset exceeds a tolerance that shrinks with node age
#[derive(Debug, Clone, Copy)]
pub struct ClampingFilter {
    tolerated_deviation_start_millis: u64,
    tolerated_deviation_minimum_millis: u64,
    start_decay_after_round: u64,
    decay_strength: f64,
}

impl ClampingFilter {
    pub fn new(parameters: &SyncParameters) -> Self {
        ClampingFilter {
            tolerated_deviation_start_millis: parameters.tolerated_deviation_start_millis,
            tolerated_deviation_minimum_millis: parameters.tolerated_deviation_minimum_millis,
            start_decay_after_round: parameters.start_decay_after_round,
            decay_strength: parameters.decay_strength,
        }
    }

    /// Largest offset magnitude (milliseconds) accepted at the given node age
    pub fn tolerated_deviation(&self, node_age: NodeAge) -> f64 {
        let age_to_use = node_age.rounds_after(self.start_decay_after_round) as f64;
        let decayed = (-self.decay_strength * age_to_use).exp() * self.tolerated_deviation_start_millis as f64;
        decayed.max(self.tolerated_deviation_minimum_millis as f64)
    }
}

impl Default for ClampingFilter {
    fn default() -> Self {
        Self::new(&SyncParameters::default())
    }
}

impl SynchronizationFilter for ClampingFilter {
    fn is_rejected(&self, sample: &TimeSynchronizationSample, node_age: NodeAge) -> bool {
        sample.time_offset_to_remote().unsigned_abs() as f64 > self.tolerated_deviation(node_age)
    }

    fn name(&self) -> &'static str {
        "clamping"
    }
}

/// The standard filters in evaluation order
pub fn default_filters(parameters: &SyncParameters) -> Vec<Box<dyn SynchronizationFilter>> {
    vec![
        Box::new(ReversedTimestampsFilter),
        Box::new(ResponseDelayDetectionFilter::new(parameters.tolerated_duration_maximum_millis)),
        Box::new(ClampingFilter::new(parameters)),
    ]
}
