use tracing::trace;

use crate::core::{NodeAge, SyncParameters};
use super::filter::{default_filters, SynchronizationFilter};
use super::sample::TimeSynchronizationSamples;

/// Applies an ordered filter chain and then alpha-trims the surviving samples
pub struct AggregateSynchronizationFilter {
    filters: Vec<Box<dyn SynchronizationFilter>>,
    alpha: f64,
}

impl AggregateSynchronizationFilter {
    /// Creates an aggregate filter over `filters` using the default alpha
    pub fn new(filters: Vec<Box<dyn SynchronizationFilter>>) -> Self {
        Self::with_alpha(filters, crate::core::ALPHA)
    }

    /// Creates an aggregate filter over `filters` trimming `alpha` of the samples
    pub fn with_alpha(filters: Vec<Box<dyn SynchronizationFilter>>, alpha: f64) -> Self {
        AggregateSynchronizationFilter { filters, alpha }
    }

    /// Creates an aggregate filter with the standard filter chain
    pub fn from_parameters(parameters: &SyncParameters) -> Self {
        Self::with_alpha(default_filters(parameters), parameters.alpha)
    }

    /// Removes rejected samples, then trims the extremes of what remains
    pub fn apply(&self, samples: &mut TimeSynchronizationSamples, node_age: NodeAge) {
        samples.retain(|sample| {
            let rejected_by = self.filters.iter().find(|filter| filter.is_rejected(sample, node_age));
            match rejected_by {
                Some(filter) => {
                    trace!(
                        peer = %sample.identity(),
                        offset = sample.time_offset_to_remote(),
                        filter = filter.name(),
                        "sample rejected"
                    );
                    false
                }
                None => true,
            }
        });

        let num_trimmed = (samples.len() as f64 * self.alpha / 2.0).floor() as usize;
        samples.trim(num_trimmed);
    }
}

impl Default for AggregateSynchronizationFilter {
    fn default() -> Self {
        Self::from_parameters(&SyncParameters::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CommunicationTimestamps;
    use crate::sync::sample::test_util::{key, sample_with_offset};
    use crate::sync::sample::TimeSynchronizationSample;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_filter(calls: Arc<AtomicUsize>, reject: bool) -> Box<dyn SynchronizationFilter> {
        Box::new(move |_: &TimeSynchronizationSample, _: NodeAge| {
            calls.fetch_add(1, Ordering::SeqCst);
            reject
        })
    }

    fn offsets(samples: &TimeSynchronizationSamples) -> Vec<i64> {
        samples.iter().map(|sample| sample.time_offset_to_remote()).collect()
    }

    fn samples_with_offsets(range: std::ops::Range<i64>) -> TimeSynchronizationSamples {
        range.map(|i| sample_with_offset(key(i as u8), i)).collect()
    }

    #[test]
    fn test_every_sample_is_passed_to_filters() {
        let calls = Arc::new(AtomicUsize::new(0));
        let filter = AggregateSynchronizationFilter::new(vec![counting_filter(calls.clone(), false)]);
        let mut samples = samples_with_offsets(0..3);

        filter.apply(&mut samples, NodeAge(0));

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(samples.len(), 3);
    }

    #[test]
    fn test_filter_chain_short_circuits() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let filter = AggregateSynchronizationFilter::new(vec![
            counting_filter(first.clone(), true),
            counting_filter(second.clone(), false),
        ]);
        let mut samples = samples_with_offsets(0..4);

        filter.apply(&mut samples, NodeAge(0));

        assert_eq!(first.load(Ordering::SeqCst), 4);
        assert_eq!(second.load(Ordering::SeqCst), 0);
        assert!(samples.is_empty());
    }

    #[test]
    fn test_alpha_trimming_keeps_middle_samples() {
        let filter = AggregateSynchronizationFilter::new(Vec::new());
        let mut samples = samples_with_offsets(0..10);

        filter.apply(&mut samples, NodeAge(0));

        assert_eq!(offsets(&samples), vec![2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_small_sets_are_not_trimmed() {
        let filter = AggregateSynchronizationFilter::new(Vec::new());
        let mut samples = samples_with_offsets(0..3);

        filter.apply(&mut samples, NodeAge(0));

        assert_eq!(offsets(&samples), vec![0, 1, 2]);
    }

    #[test]
    fn test_zero_alpha_disables_trimming() {
        let filter = AggregateSynchronizationFilter::with_alpha(Vec::new(), 0.0);
        let mut samples = samples_with_offsets(0..20);

        filter.apply(&mut samples, NodeAge(0));

        assert_eq!(samples.len(), 20);
    }

    #[test]
    fn test_trimming_runs_after_rejection() {
        // 10 samples, 5 of which are rejected: only the surviving 5 are trimmed (k = 1)
        let reject_odd: Box<dyn SynchronizationFilter> = Box::new(|sample: &TimeSynchronizationSample, _: NodeAge| {
            sample.time_offset_to_remote() % 2 == 1
        });
        let filter = AggregateSynchronizationFilter::new(vec![reject_odd]);
        let mut samples = samples_with_offsets(0..10);

        filter.apply(&mut samples, NodeAge(0));

        assert_eq!(offsets(&samples), vec![2, 4, 6]);
    }

    #[test]
    fn test_default_chain_rejects_reversed_timestamps() {
        let filter = AggregateSynchronizationFilter::default();
        let mut samples = TimeSynchronizationSamples::new();
        samples.insert(TimeSynchronizationSample::new(
            key(1),
            CommunicationTimestamps::new(100, 90),
            CommunicationTimestamps::new(50, 50),
        ));
        samples.insert(TimeSynchronizationSample::new(
            key(2),
            CommunicationTimestamps::new(100, 100),
            CommunicationTimestamps::new(40, 50),
        ));
        samples.insert(TimeSynchronizationSample::new(
            key(3),
            CommunicationTimestamps::new(100, 110),
            CommunicationTimestamps::new(55, 50),
        ));

        filter.apply(&mut samples, NodeAge(0));

        assert_eq!(samples.identities(), vec![key(3)]);
    }

    #[test]
    fn test_default_chain_clamps_mature_nodes() {
        let filter = AggregateSynchronizationFilter::default();
        let mut samples: TimeSynchronizationSamples = vec![
            sample_with_offset(key(1), 100),
            sample_with_offset(key(2), 90_000),
            sample_with_offset(key(3), -200),
        ]
        .into_iter()
        .collect();

        filter.apply(&mut samples, NodeAge(100));

        assert_eq!(offsets(&samples), vec![-200, 100]);
    }
}
