use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;

use crate::core::Timestamp;

/// Source of local wall clock time
pub trait LocalClock: Send + Sync {
    /// Current local time in milliseconds since the network epoch
    fn now(&self, epoch_adjustment: Duration) -> Timestamp;
}

/// Wall clock of the host system
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl LocalClock for SystemClock {
    fn now(&self, epoch_adjustment: Duration) -> Timestamp {
        let unix_millis = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        let adjustment = u64::try_from(epoch_adjustment.as_millis()).unwrap_or(u64::MAX);
        Timestamp(unix_millis.saturating_sub(adjustment))
    }
}

/// Clock that only moves when told to
///
/// The stored value is already relative to the network epoch, so the epoch
/// adjustment is ignored.
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicU64,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        ManualClock {
            millis: AtomicU64::new(start.0),
        }
    }

    pub fn set(&self, timestamp: Timestamp) {
        self.millis.store(timestamp.0, Ordering::SeqCst);
    }

    pub fn advance(&self, duration: Duration) {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }
}

impl LocalClock for ManualClock {
    fn now(&self, _epoch_adjustment: Duration) -> Timestamp {
        Timestamp(self.millis.load(Ordering::SeqCst))
    }
}
