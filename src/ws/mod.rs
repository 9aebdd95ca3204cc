//! WebSocket layer: messages, events, config, dispatch.
//!
//! The socket itself lives behind the `ws-native` feature:
//! - `transport.rs` defines the frame-level seam and the `tokio-tungstenite` connector
//! - `native.rs` owns the connection task and exports `WsClient`
//!
//! This module defines the shared message/event types, and `dispatch.rs`
//! routes inbound envelopes into the price store and the notification sink.

pub mod dispatch;

#[cfg(feature = "ws-native")]
pub mod native;

#[cfg(feature = "ws-native")]
pub mod transport;

use crate::domain::notification::NotificationKind;
use crate::error::SdkError;
use crate::shared::{CircleId, CommodityId, UserId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

pub use dispatch::Dispatcher;

// ─── Outbound messages ───────────────────────────────────────────────────────

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageOut {
    /// Identity handshake sent right after the socket opens.
    Connect {
        #[serde(rename = "userId")]
        user_id: UserId,
        timestamp: DateTime<Utc>,
    },
}

impl MessageOut {
    pub fn connect(user_id: UserId) -> Self {
        MessageOut::Connect {
            user_id,
            timestamp: Utc::now(),
        }
    }
}

// ─── Inbound classification ──────────────────────────────────────────────────

/// Classification of the inbound envelope's `type` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageType {
    PriceUpdate,
    Notification(NotificationKind),
    Unknown(String),
}

impl From<&str> for MessageType {
    fn from(s: &str) -> Self {
        match s {
            "price_update" => MessageType::PriceUpdate,
            other => match NotificationKind::from_wire(other) {
                Some(kind) => MessageType::Notification(kind),
                None => MessageType::Unknown(other.to_string()),
            },
        }
    }
}

// ─── WsEvent ─────────────────────────────────────────────────────────────────

/// High-level events emitted by the WS client to the consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum WsEvent {
    /// Socket is open.
    Connected,
    /// Socket closed or the attempt failed.
    Disconnected { code: Option<u16>, reason: String },
    /// A reconnect attempt is scheduled after `delay_ms`.
    Reconnecting { delay_ms: u64 },
    /// An observation was ingested into the price store.
    PriceUpdate {
        commodity_id: CommodityId,
        circle_id: CircleId,
    },
    /// A non-price push was handed to the notification sink.
    Notification {
        kind: NotificationKind,
        payload: serde_json::Value,
    },
    /// An inbound message could not be understood.
    Error(String),
}

// ─── ReadyState ──────────────────────────────────────────────────────────────

/// Socket status, numbered like the browser `WebSocket.readyState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ReadyState {
    Connecting = 0,
    Open = 1,
    Closing = 2,
    Closed = 3,
}

impl From<u8> for ReadyState {
    fn from(value: u8) -> Self {
        match value {
            0 => ReadyState::Connecting,
            1 => ReadyState::Open,
            2 => ReadyState::Closing,
            _ => ReadyState::Closed,
        }
    }
}

impl std::fmt::Display for ReadyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ReadyState::Connecting => "connecting",
            ReadyState::Open => "open",
            ReadyState::Closing => "closing",
            ReadyState::Closed => "closed",
        };
        f.write_str(s)
    }
}

// ─── Config ──────────────────────────────────────────────────────────────────

/// Configuration for the WS client.
#[derive(Debug, Clone)]
pub struct WsConfig {
    pub url: String,
    /// Reconnect after every unrequested close. Only tests turn this off.
    pub reconnect: bool,
    /// Fixed wait between a close and the next attempt. Never grows.
    pub reconnect_delay_ms: u64,
    pub connect_timeout_ms: u64,
    pub event_channel_capacity: usize,
    pub command_channel_capacity: usize,
}

impl WsConfig {
    /// Config pointing at the `/ws` endpoint of the page origin.
    pub fn for_origin(origin: &str) -> Result<Self, SdkError> {
        Ok(Self {
            url: crate::network::ws_url_for_origin(origin)?,
            ..Self::default()
        })
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            url: crate::network::DEFAULT_WS_URL.to_string(),
            reconnect: true,
            reconnect_delay_ms: 5000,
            connect_timeout_ms: 30_000,
            event_channel_capacity: 256,
            command_channel_capacity: 64,
        }
    }
}
