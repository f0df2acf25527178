//! Core types and constants for stake-weighted time synchronization
//!
//! This module contains the fundamental building blocks used throughout the library.

pub mod config;
pub mod error;
pub mod types;
pub mod serde;

pub use self::config::{SyncParameters, TimeSyncConfig};
pub use self::error::{Error, Result};
pub use self::types::{
    CommunicationTimestamps,
    Height,
    Importance,
    NodeAge,
    PeerKey,
    TimeOffset,
    TimeOffsetDirection,
    Timestamp,
};

/// Fraction of samples discarded by alpha trimming (split evenly between both ends)
pub const ALPHA: f64 = 0.4;

/// Longest tolerated round trip of a single exchange
pub const TOLERATED_DURATION_MAXIMUM_MILLIS: u64 = 1_000;

/// Tolerated clock deviation of a young node (120 minutes)
pub const TOLERATED_DEVIATION_START_MILLIS: u64 = 120 * 60 * 1_000;

/// Tolerated clock deviation of a mature node (1 minute)
pub const TOLERATED_DEVIATION_MINIMUM_MILLIS: u64 = 60 * 1_000;

/// Node age after which the tolerated deviation decays
pub const START_DECAY_AFTER_ROUND: u64 = 5;

/// Decay strength of the tolerated deviation
pub const DECAY_STRENGTH: f64 = 0.3;

/// Coupling of a young node
pub const COUPLING_START: f64 = 1.0;

/// Coupling of a mature node
pub const COUPLING_MINIMUM: f64 = 0.1;

/// Decay strength of the coupling
pub const COUPLING_DECAY_STRENGTH: f64 = 0.3;

/// Node age after which the coupling decays.
/// Kept separate from `START_DECAY_AFTER_ROUND` even though both are 5.
pub const START_COUPLING_DECAY_AFTER_ROUND: u64 = 5;

/// Default number of nodes sampled per round
pub const DEFAULT_MAX_NODES: usize = 5;
