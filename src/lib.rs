//! Stake-weighted network time synchronization
//!
//! Nodes periodically sample the network time of a handful of peers, drop
//! implausible samples, and move their own clock offset towards the importance
//! weighted mean of what remains. The correction shrinks as a node ages so that
//! established nodes only drift slowly with the network.

pub mod core;
pub mod protocol;
pub mod sync;
pub mod time;

// Re-export commonly used items
pub use crate::core::{
    CommunicationTimestamps, Error, Height, Importance, NodeAge, PeerKey, Result, SyncParameters, TimeOffset,
    TimeSyncConfig, Timestamp,
};
pub use crate::sync::{TimeSyncTask, TimeSynchronizationState, TimeSynchronizer};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
