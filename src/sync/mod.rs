//! Synchronization module
//!
//! This module turns network time samples into a clock correction: samples are
//! filtered, weighted by the importance of the sampled accounts, damped by the
//! node's coupling and finally folded into the synchronization state.

pub mod aggregate;
pub mod filter;
pub mod importance;
pub mod sample;
pub mod selector;
pub mod state;
pub mod synchronizer;
pub mod task;

pub use self::aggregate::AggregateSynchronizationFilter;
pub use self::filter::{
    default_filters, ClampingFilter, ResponseDelayDetectionFilter, ReversedTimestampsFilter, SynchronizationFilter,
};
pub use self::importance::{ImportanceSnapshot, ImportanceView};
pub use self::sample::{TimeSynchronizationSample, TimeSynchronizationSamples};
pub use self::selector::{ImportanceAwareNodeSelector, NodeCandidate, NodeSource, WeightedCandidate};
pub use self::state::TimeSynchronizationState;
pub use self::synchronizer::TimeSynchronizer;
pub use self::task::{
    retrieve_samples, ChainView, RoundReport, SampleRequester, TimeSyncCounters, TimeSyncTask, UnreachableRequester,
};
