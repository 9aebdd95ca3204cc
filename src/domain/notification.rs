//! Notification domain: non-price server pushes routed to the app's sink.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Server push types that are forwarded to a [`NotificationSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Notification,
    ListingUpdate,
    OfferReceived,
    TradeUpdate,
    CircleUpdate,
}

impl NotificationKind {
    pub const ALL: [NotificationKind; 5] = [
        NotificationKind::Notification,
        NotificationKind::ListingUpdate,
        NotificationKind::OfferReceived,
        NotificationKind::TradeUpdate,
        NotificationKind::CircleUpdate,
    ];

    /// Wire value of the envelope `type` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Notification => "notification",
            NotificationKind::ListingUpdate => "listing_update",
            NotificationKind::OfferReceived => "offer_received",
            NotificationKind::TradeUpdate => "trade_update",
            NotificationKind::CircleUpdate => "circle_update",
        }
    }

    pub fn from_wire(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == s)
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receiver for non-price pushes (toasts, badge counters, listing caches).
///
/// Called inline from the connection task, in transport order. Implementations
/// should hand work off rather than block.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, kind: NotificationKind, payload: &serde_json::Value);
}

/// Default sink: records the push in the log and nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn notify(&self, kind: NotificationKind, payload: &serde_json::Value) {
        tracing::debug!("Notification '{}' received: {}", kind, payload);
    }
}

impl<F> NotificationSink for F
where
    F: Fn(NotificationKind, &serde_json::Value) + Send + Sync,
{
    fn notify(&self, kind: NotificationKind, payload: &serde_json::Value) {
        self(kind, payload)
    }
}

/// Shared handle the dispatcher holds.
pub type SharedSink = Arc<dyn NotificationSink>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_kind_wire_names_roundtrip() {
        for kind in NotificationKind::ALL {
            assert_eq!(NotificationKind::from_wire(kind.as_str()), Some(kind));
        }
        assert_eq!(NotificationKind::from_wire("price_update"), None);
    }

    #[test]
    fn test_closure_sink() {
        let seen = Mutex::new(Vec::new());
        let sink = |kind: NotificationKind, _: &serde_json::Value| {
            seen.lock().unwrap().push(kind);
        };
        sink.notify(NotificationKind::OfferReceived, &serde_json::json!({}));
        assert_eq!(*seen.lock().unwrap(), vec![NotificationKind::OfferReceived]);
    }
}
