//! Inbound message routing.
//!
//! Every text frame is classified by its envelope `type`. Price pushes go into
//! the [`PriceStore`]; the other known pushes go to the [`NotificationSink`](crate::domain::notification::NotificationSink);
//! anything else is logged and dropped. Nothing here closes the socket.

use crate::domain::notification::{LogSink, SharedSink};
use crate::domain::price::wire::WsPriceUpdate;
use crate::domain::price::{PriceObservation, PriceStore};
use crate::error::SdkError;
use crate::ws::{MessageType, WsEvent};
use serde_json::Value;
use std::sync::Arc;

/// Routes parsed envelopes to the store and the notification sink.
#[derive(Clone)]
pub struct Dispatcher {
    store: PriceStore,
    sink: SharedSink,
}

impl Dispatcher {
    pub fn new(store: PriceStore, sink: SharedSink) -> Self {
        Self { store, sink }
    }

    /// Dispatcher that only logs notifications.
    pub fn with_store(store: PriceStore) -> Self {
        Self::new(store, Arc::new(LogSink))
    }

    pub fn store(&self) -> &PriceStore {
        &self.store
    }

    /// Handle one text frame and return the events it produced.
    pub fn handle_text(&self, text: &str) -> Vec<WsEvent> {
        let value: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("WS deserialization error: {}, raw: {}", e, text);
                return vec![WsEvent::Error(format!("Deserialization error: {}", e))];
            }
        };

        let Some(kind) = value.get("type").and_then(Value::as_str) else {
            tracing::warn!("WS message without a type field, raw: {}", text);
            return vec![WsEvent::Error("Message has no type".into())];
        };

        match MessageType::from(kind) {
            MessageType::PriceUpdate => match self.ingest_price(value) {
                Ok(event) => vec![event],
                Err(e) => {
                    tracing::warn!("Dropping malformed price_update: {}, raw: {}", e, text);
                    vec![WsEvent::Error(format!("Malformed price_update: {}", e))]
                }
            },
            MessageType::Notification(kind) => {
                tracing::debug!("Routing '{}' to notification sink", kind);
                self.sink.notify(kind, &value);
                vec![WsEvent::Notification {
                    kind,
                    payload: value,
                }]
            }
            MessageType::Unknown(other) => {
                tracing::warn!("Unknown message type: {}", other);
                Vec::new()
            }
        }
    }

    fn ingest_price(&self, value: Value) -> Result<WsEvent, SdkError> {
        let update: WsPriceUpdate = serde_json::from_value(value)?;
        let observation = PriceObservation::try_from(update)?;
        let (commodity_id, circle_id) = observation.key();
        self.store.add_price_update(observation);
        Ok(WsEvent::PriceUpdate {
            commodity_id,
            circle_id,
        })
    }
}

impl Default for Dispatcher {
    /// Global store, logging sink.
    fn default() -> Self {
        Self::with_store(PriceStore::global().clone())
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::notification::NotificationKind;
    use crate::domain::price::ChangeDirection;
    use crate::shared::{CircleId, CommodityId};
    use serde_json::json;
    use std::sync::Mutex;

    type Received = Arc<Mutex<Vec<(NotificationKind, Value)>>>;

    fn recording_dispatcher() -> (Dispatcher, Received) {
        let received: Received = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let received = received.clone();
            move |kind: NotificationKind, payload: &Value| {
                received.lock().unwrap().push((kind, payload.clone()));
            }
        };
        (Dispatcher::new(PriceStore::new(), Arc::new(sink)), received)
    }

    fn price_update_json() -> String {
        json!({
            "type": "price_update",
            "commodityId": 7,
            "circleId": 3,
            "timestamp": "2024-03-01T10:00:00Z",
            "newPrice": 2150.0,
            "priceChange": 15.0,
            "changePercentage": 0.7,
            "changeDirection": "up",
            "quality": "FAQ"
        })
        .to_string()
    }

    #[test]
    fn test_price_update_is_ingested() {
        let (dispatcher, received) = recording_dispatcher();
        let events = dispatcher.handle_text(&price_update_json());

        assert_eq!(
            events,
            vec![WsEvent::PriceUpdate {
                commodity_id: CommodityId::new(7),
                circle_id: CircleId::new(3),
            }]
        );
        let current = dispatcher
            .store()
            .get_current_price(CommodityId::new(7), Some(CircleId::new(3)))
            .unwrap();
        assert_eq!(current.price, 2150.0);
        assert_eq!(current.change_direction, ChangeDirection::Up);
        assert_eq!(current.quality.as_deref(), Some("FAQ"));
        assert!(received.lock().unwrap().is_empty());
    }

    #[test]
    fn test_notification_kinds_go_to_sink() {
        let (dispatcher, received) = recording_dispatcher();
        for kind in NotificationKind::ALL {
            let raw = json!({ "type": kind.as_str(), "timestamp": "2024-03-01T10:00:00Z", "listingId": 9 });
            let events = dispatcher.handle_text(&raw.to_string());
            assert!(matches!(
                events.as_slice(),
                [WsEvent::Notification { kind: k, .. }] if *k == kind
            ));
        }

        let received = received.lock().unwrap();
        assert_eq!(received.len(), NotificationKind::ALL.len());
        assert_eq!(received[1].0, NotificationKind::ListingUpdate);
        assert_eq!(received[1].1["listingId"], 9);
        assert!(dispatcher.store().snapshot().is_empty());
    }

    #[test]
    fn test_unknown_type_is_dropped_silently() {
        let (dispatcher, received) = recording_dispatcher();
        let events = dispatcher.handle_text(r#"{"type":"weather_alert","timestamp":"x"}"#);
        assert!(events.is_empty());
        assert!(received.lock().unwrap().is_empty());
        assert!(dispatcher.store().snapshot().is_empty());
    }

    #[test]
    fn test_malformed_messages_produce_error_events() {
        let (dispatcher, _) = recording_dispatcher();

        let not_json = dispatcher.handle_text("{not json");
        assert!(matches!(not_json.as_slice(), [WsEvent::Error(_)]));

        let untyped = dispatcher.handle_text(r#"{"commodityId":1}"#);
        assert!(matches!(untyped.as_slice(), [WsEvent::Error(_)]));

        let missing_price = dispatcher.handle_text(
            r#"{"type":"price_update","commodityId":1,"circleId":1,"timestamp":"2024-03-01T10:00:00Z"}"#,
        );
        assert!(matches!(missing_price.as_slice(), [WsEvent::Error(_)]));

        let mut bad_ts: Value = serde_json::from_str(&price_update_json()).unwrap();
        bad_ts["timestamp"] = json!("last tuesday");
        let bad_ts = dispatcher.handle_text(&bad_ts.to_string());
        assert!(matches!(bad_ts.as_slice(), [WsEvent::Error(_)]));

        assert!(dispatcher.store().snapshot().is_empty());
    }

    #[test]
    fn test_unknown_direction_reads_as_stable() {
        let (dispatcher, _) = recording_dispatcher();
        let mut raw: Value = serde_json::from_str(&price_update_json()).unwrap();
        raw["changeDirection"] = json!("flat");
        dispatcher.handle_text(&raw.to_string());

        let current = dispatcher
            .store()
            .get_current_price(CommodityId::new(7), None)
            .unwrap();
        assert_eq!(current.change_direction, ChangeDirection::Stable);
    }
}
