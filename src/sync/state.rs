use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::core::{NodeAge, TimeOffset, TimeOffsetDirection, Timestamp};
use crate::time::{LocalClock, SystemClock};

/// Accumulated clock correction of this node
///
/// Readers may query the state from any thread. `update` performs two separate
/// atomic writes, so only one round driver may call it at a time.
pub struct TimeSynchronizationState {
    epoch_adjustment: Duration,
    clock_adjustment_threshold_millis: u64,
    offset: AtomicI64,
    node_age: AtomicU64,
    clock: Arc<dyn LocalClock>,
}

impl TimeSynchronizationState {
    /// Creates a state reading local time from the system clock
    pub fn new(epoch_adjustment: Duration, clock_adjustment_threshold_millis: u64) -> Self {
        Self::with_clock(epoch_adjustment, clock_adjustment_threshold_millis, Arc::new(SystemClock))
    }

    /// Creates a state reading local time from `clock`
    pub fn with_clock(
        epoch_adjustment: Duration,
        clock_adjustment_threshold_millis: u64,
        clock: Arc<dyn LocalClock>,
    ) -> Self {
        TimeSynchronizationState {
            epoch_adjustment,
            clock_adjustment_threshold_millis,
            offset: AtomicI64::new(0),
            node_age: AtomicU64::new(0),
            clock,
        }
    }

    /// Current accumulated offset
    pub fn offset(&self) -> TimeOffset {
        TimeOffset(self.offset.load(Ordering::Acquire))
    }

    /// Magnitude of the accumulated offset
    pub fn absolute_offset(&self) -> u64 {
        self.offset().abs()
    }

    /// Direction of the accumulated offset
    pub fn offset_direction(&self) -> TimeOffsetDirection {
        self.offset().direction()
    }

    /// Number of completed rounds
    pub fn node_age(&self) -> NodeAge {
        NodeAge(self.node_age.load(Ordering::Acquire))
    }

    pub fn epoch_adjustment(&self) -> Duration {
        self.epoch_adjustment
    }

    /// Local time corrected by the accumulated offset
    pub fn network_time(&self) -> Timestamp {
        self.clock.now(self.epoch_adjustment).offset_by(self.offset())
    }

    /// Completes a round, applying `offset` if it exceeds the adjustment threshold
    ///
    /// Returns true if the offset was applied. The node ages by one round either way.
    pub fn update(&self, offset: TimeOffset) -> bool {
        let applied = offset.abs() > self.clock_adjustment_threshold_millis;
        if applied {
            let previous = self.offset.fetch_add(offset.0, Ordering::AcqRel);
            debug!(previous, adjustment = offset.0, "adjusted network time offset");
        }

        self.node_age.fetch_add(1, Ordering::AcqRel);
        applied
    }
}

impl fmt::Debug for TimeSynchronizationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeSynchronizationState")
            .field("epoch_adjustment", &self.epoch_adjustment)
            .field("clock_adjustment_threshold_millis", &self.clock_adjustment_threshold_millis)
            .field("offset", &self.offset())
            .field("node_age", &self.node_age())
            .finish()
    }
}
