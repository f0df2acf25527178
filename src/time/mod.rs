//! Local time sources
//!
//! Network time is always derived from a local clock plus the offset agreed on
//! with the network. This module provides the local half:
//!
//! - [`SystemClock`] reads the host wall clock and shifts it to the network epoch
//! - [`ManualClock`] is driven explicitly, for simulations and tests
//!
//! # Examples
//!
//! ```
//! use stake_timesync::time::{LocalClock, ManualClock};
//! use stake_timesync::core::Timestamp;
//! use std::time::Duration;
//!
//! let clock = ManualClock::new(Timestamp(1_000));
//! clock.advance(Duration::from_millis(500));
//! assert_eq!(clock.now(Duration::ZERO), Timestamp(1_500));
//! ```

mod clock;

pub use self::clock::{LocalClock, ManualClock, SystemClock};
