use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{Error, Result};

/// Size in bytes of a peer identity key
pub const PEER_KEY_SIZE: usize = 32;

/// Public key identifying a peer in the network
///
/// Keys order lexicographically by their bytes, which is the tie breaker
/// used when two samples report the same time offset.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PeerKey(pub [u8; PEER_KEY_SIZE]);

impl PeerKey {
    /// Generates a new random peer key
    pub fn random() -> Self {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        let mut bytes = [0u8; PEER_KEY_SIZE];
        rng.fill(&mut bytes);
        PeerKey(bytes)
    }

    /// Returns the raw key bytes
    pub fn as_bytes(&self) -> &[u8; PEER_KEY_SIZE] {
        &self.0
    }
}

impl fmt::Display for PeerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_upper(self.0))
    }
}

impl fmt::Debug for PeerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerKey({})", self)
    }
}

impl FromStr for PeerKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut bytes = [0u8; PEER_KEY_SIZE];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|e| Error::config(format!("Invalid peer key '{}': {}", s, e)))?;
        Ok(PeerKey(bytes))
    }
}

/// Economic weight (stake) of an account
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Importance(pub u64);

/// Chain height
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Height(pub u64);

/// Number of completed synchronization rounds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeAge(pub u64);

impl NodeAge {
    /// Returns the number of rounds past `start`, or zero before it
    pub fn rounds_after(&self, start: u64) -> u64 {
        self.0.saturating_sub(start)
    }
}

/// Signed clock correction in milliseconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeOffset(pub i64);

impl TimeOffset {
    /// Returns the magnitude of the offset
    pub fn abs(&self) -> u64 {
        self.0.unsigned_abs()
    }

    /// Returns the direction of the offset
    pub fn direction(&self) -> TimeOffsetDirection {
        if self.0 < 0 {
            TimeOffsetDirection::Negative
        } else {
            TimeOffsetDirection::Positive
        }
    }
}

/// Direction of a time offset; zero counts as positive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeOffsetDirection {
    Positive,
    Negative,
}

impl TimeOffsetDirection {
    /// Raw counter value (0 positive, 1 negative)
    pub fn as_raw(&self) -> u64 {
        match self {
            TimeOffsetDirection::Positive => 0,
            TimeOffsetDirection::Negative => 1,
        }
    }
}

/// Millisecond ticks since the network epoch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Applies a signed offset, saturating at the bounds of the timestamp range
    pub fn offset_by(&self, offset: TimeOffset) -> Self {
        Timestamp(self.0.saturating_add_signed(offset.0))
    }
}

/// Send and receive timestamps observed by one side of an exchange
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CommunicationTimestamps {
    /// Time the message left this side
    pub send: Timestamp,
    /// Time the message arrived at this side
    pub receive: Timestamp,
}

impl CommunicationTimestamps {
    /// Creates timestamps from raw millisecond values
    pub fn new(send: u64, receive: u64) -> Self {
        CommunicationTimestamps {
            send: Timestamp(send),
            receive: Timestamp(receive),
        }
    }
}
