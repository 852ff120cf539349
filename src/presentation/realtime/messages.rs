//! Realtime Message Types
//!
//! JSON frames exchanged over `/realtime`, tagged by `op`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Frames sent by clients
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ClientMessage {
    Subscribe { channel: String },
    Unsubscribe { channel: String },
    Identify { token: String },
    Heartbeat,
}

/// Frames sent by the server
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ServerMessage {
    Hello {
        heartbeat_interval: u64,
    },
    HeartbeatAck,
    Identified {
        user_id: String,
    },
    Subscribed {
        channel: String,
    },
    Unsubscribed {
        channel: String,
    },
    Event {
        channel: String,
        event: String,
        data: Value,
    },
    Error {
        message: String,
    },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }
}
