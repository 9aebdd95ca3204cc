//! High-level client: `TickerClient` wiring storage, price store, and socket config.
//!
//! The WS client is not embedded: connection lifetimes belong to the
//! application layer (e.g. a screen being visible), so `ws_native()` hands out
//! a fresh `WsClient` that feeds this client's store.

use crate::domain::notification::{LogSink, SharedSink};
use crate::domain::price::PriceStore;
use crate::error::SdkError;
use crate::storage::{FileStorage, IdentityProvider, SnapshotStorage, StoredIdentity};
use crate::ws::{Dispatcher, WsConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// The primary entry point: one price store plus everything needed to keep it live.
#[derive(Clone)]
pub struct TickerClient {
    store: PriceStore,
    sink: SharedSink,
    identity: Option<Arc<dyn IdentityProvider>>,
    ws_config: WsConfig,
}

impl TickerClient {
    pub fn builder() -> TickerClientBuilder {
        TickerClientBuilder::default()
    }

    pub fn store(&self) -> &PriceStore {
        &self.store
    }

    /// Config for creating a WebSocket connection.
    pub fn ws_config(&self) -> &WsConfig {
        &self.ws_config
    }

    /// Dispatcher routing into this client's store and sink.
    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(self.store.clone(), Arc::clone(&self.sink))
    }

    /// Create a new native WS client from the current config.
    #[cfg(feature = "ws-native")]
    pub fn ws_native(&self) -> crate::ws::native::WsClient {
        let client = crate::ws::native::WsClient::with_connector(
            self.ws_config.clone(),
            Arc::new(crate::ws::transport::TungsteniteConnector),
            self.dispatcher(),
        );
        match &self.identity {
            Some(identity) => client.with_identity(Arc::clone(identity)),
            None => client,
        }
    }

    /// Make this client's store the process-wide one.
    pub fn install_global_store(&self) -> Result<(), SdkError> {
        PriceStore::install_global(self.store.clone())
            .map(|_| ())
            .map_err(|_| SdkError::Other("Global price store already initialized".into()))
    }
}

impl std::fmt::Debug for TickerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickerClient")
            .field("store", &self.store)
            .field("ws_url", &self.ws_config.url)
            .field("identity", &self.identity.is_some())
            .finish()
    }
}

// ═════════════════════════════════════════════════════════════════════════════
// Builder
// ═════════════════════════════════════════════════════════════════════════════

pub struct TickerClientBuilder {
    ws_url: String,
    origin: Option<String>,
    reconnect_delay: Duration,
    storage: Option<Arc<dyn SnapshotStorage>>,
    storage_dir: Option<PathBuf>,
    sink: SharedSink,
    identity: Option<Arc<dyn IdentityProvider>>,
}

impl Default for TickerClientBuilder {
    fn default() -> Self {
        let defaults = WsConfig::default();
        Self {
            reconnect_delay: defaults.reconnect_delay(),
            ws_url: defaults.url,
            origin: None,
            storage: None,
            storage_dir: None,
            sink: Arc::new(LogSink),
            identity: None,
        }
    }
}

impl TickerClientBuilder {
    pub fn ws_url(mut self, url: &str) -> Self {
        self.ws_url = url.to_string();
        self.origin = None;
        self
    }

    /// Derive the socket URL from the page origin (`https://host` → `wss://host/ws`).
    pub fn origin(mut self, origin: &str) -> Self {
        self.origin = Some(origin.to_string());
        self
    }

    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Persist the snapshot (and read the cached user) through `storage`.
    pub fn storage(mut self, storage: Arc<dyn SnapshotStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Shorthand for a [`FileStorage`] rooted at `dir`.
    pub fn storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = Some(dir.into());
        self
    }

    pub fn notification_sink(mut self, sink: SharedSink) -> Self {
        self.sink = sink;
        self
    }

    /// Identity for the connect handshake. Defaults to the cached user in storage.
    pub fn identity(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn build(self) -> Result<TickerClient, SdkError> {
        let url = match &self.origin {
            Some(origin) => crate::network::ws_url_for_origin(origin)?,
            None => self.ws_url,
        };

        let storage: Option<Arc<dyn SnapshotStorage>> = match (self.storage, self.storage_dir) {
            (Some(storage), _) => Some(storage),
            (None, Some(dir)) => Some(Arc::new(FileStorage::new(dir))),
            (None, None) => None,
        };

        let store = match &storage {
            Some(storage) => PriceStore::with_storage(Arc::clone(storage)),
            None => PriceStore::new(),
        };

        let identity = self.identity.or_else(|| {
            storage
                .map(|storage| Arc::new(StoredIdentity::new(storage)) as Arc<dyn IdentityProvider>)
        });

        Ok(TickerClient {
            store,
            sink: self.sink,
            identity,
            ws_config: WsConfig {
                url,
                reconnect_delay_ms: self.reconnect_delay.as_millis() as u64,
                ..WsConfig::default()
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::price::state::STORAGE_KEY;
    use crate::shared::{CircleId, CommodityId, UserId};
    use crate::storage::{MemoryStorage, USER_KEY};

    #[test]
    fn test_builder_defaults() {
        let client = TickerClient::builder().build().unwrap();
        assert_eq!(client.ws_config().url, crate::network::DEFAULT_WS_URL);
        assert_eq!(client.ws_config().reconnect_delay_ms, 5000);
        assert!(client.identity.is_none());
        assert!(client.store().snapshot().is_empty());
    }

    #[test]
    fn test_builder_origin_and_delay() {
        let client = TickerClient::builder()
            .origin("https://mandi.example.in/market")
            .reconnect_delay(Duration::from_millis(250))
            .build()
            .unwrap();
        assert_eq!(client.ws_config().url, "wss://mandi.example.in/ws");
        assert_eq!(client.ws_config().reconnect_delay_ms, 250);

        assert!(TickerClient::builder().origin("mandi.example.in").build().is_err());
    }

    #[test]
    fn test_builder_storage_restores_and_reads_identity() {
        let storage = Arc::new(MemoryStorage::new());
        storage.save(USER_KEY, r#"{"id": 7}"#).unwrap();
        storage
            .save(
                STORAGE_KEY,
                r#"{"currentPrices":{"1":{"2":{"commodityId":1,"circleId":2,"timestamp":"2024-03-01T10:00:00Z","price":2150.0,"priceChange":15.0,"changePercentage":0.7,"changeDirection":"up"}}},"recentUpdates":[]}"#,
            )
            .unwrap();

        let client = TickerClient::builder().storage(storage).build().unwrap();
        let current = client
            .store()
            .get_current_price(CommodityId::new(1), Some(CircleId::new(2)))
            .unwrap();
        assert_eq!(current.price, 2150.0);

        let identity = client.identity.as_ref().unwrap();
        assert_eq!(identity.cached_user_id().unwrap(), Some(UserId::new(7)));
    }

    #[test]
    fn test_dispatcher_feeds_client_store() {
        let client = TickerClient::builder().build().unwrap();
        client.dispatcher().handle_text(
            r#"{"type":"price_update","commodityId":3,"circleId":4,"timestamp":"2024-03-01T10:00:00Z","newPrice":99.0,"priceChange":-1.0,"changePercentage":-1.0,"changeDirection":"down"}"#,
        );
        assert_eq!(
            client
                .store()
                .get_current_price(CommodityId::new(3), None)
                .unwrap()
                .price,
            99.0
        );
    }
}
