use serde::{Deserialize, Serialize};

use crate::core::CommunicationTimestamps;

/// Messages of the network time protocol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// Asks a peer for its network time
    NetworkTimeRequest,

    /// Peer's answer to a network time request
    NetworkTimeResponse {
        /// When the peer received the request and when it sent this response
        timestamps: CommunicationTimestamps,
    },
}

impl Message {
    /// Short name used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Message::NetworkTimeRequest => "network time request",
            Message::NetworkTimeResponse { .. } => "network time response",
        }
    }
}
