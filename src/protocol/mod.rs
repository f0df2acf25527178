//! Protocol implementation module
//!
//! This module defines the network time messages exchanged between peers, their
//! length-prefixed wire encoding and both sides of a timestamp exchange.

pub mod codec;
pub mod handler;
pub mod message;

pub use self::codec::MessageCodec;
pub use self::handler::{request_network_time, serve_connection, FramedRequester, NetworkTimeResponder};
pub use self::message::Message;

/// Maximum message size in bytes
pub const MAX_MESSAGE_SIZE: usize = 1024;
