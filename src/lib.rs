//! # Mandi Ticker
//!
//! Live commodity price feed for a mandi (agricultural market) trading app:
//! a reconnecting WebSocket client, a bounded and persisted price store, and
//! the formatting contracts the ticker UI renders with.
//!
//! ## Architecture
//!
//! The crate is organized in layers:
//!
//! 1. **Core**: Newtypes, domain models, display helpers (always available)
//! 2. **Storage**: Snapshot and identity persistence adapters
//! 3. **WebSocket**: Message types and dispatch; `tokio-tungstenite` client behind `ws-native`
//! 4. **High-Level Client**: `TickerClient` wiring the pieces together
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mandi_ticker::prelude::*;
//!
//! let ticker = TickerClient::builder()
//!     .origin("https://mandi.example.in")
//!     .storage_dir("/var/lib/mandi")
//!     .build()?;
//!
//! let _sub = ticker.store().subscribe(|state| {
//!     if let Some(latest) = state.recent().front() {
//!         println!("{}", PriceView::from(latest).change);
//!     }
//! });
//!
//! let mut ws = ticker.ws_native();
//! ws.connect().await?;
//! ```

// ── Layer 1: Core ────────────────────────────────────────────────────────────

/// Shared newtypes and number formatting.
pub mod shared;

/// Domain modules (vertical slices): types, wire types, conversions, state.
pub mod domain;

/// Unified SDK error types.
pub mod error;

/// Network URL constants and endpoint derivation.
pub mod network;

// ── Layer 2: Storage ─────────────────────────────────────────────────────────

/// Key-value persistence for the price snapshot and cached identity.
pub mod storage;

// ── Layer 3: WebSocket ───────────────────────────────────────────────────────

/// WebSocket client: messages, events, dispatch.
pub mod ws;

// ── Layer 4: High-Level Client ───────────────────────────────────────────────

/// `TickerClient`, the primary entry point.
pub mod client;

// ── Prelude ──────────────────────────────────────────────────────────────────

pub mod prelude {
    // Shared newtypes
    pub use crate::shared::{CircleId, CommodityId, UserId};

    // Domain types: price
    pub use crate::domain::price::display::{
        format_currency, format_percentage, format_price_change, DirectionIcon,
    };
    pub use crate::domain::price::{
        ChangeDirection, DirectionStyle, PriceObservation, PriceStore, PriceStoreState, PriceView,
        Subscription,
    };

    // Domain types: notification
    pub use crate::domain::notification::{LogSink, NotificationKind, NotificationSink};

    // Errors
    pub use crate::error::{SdkError, StorageError, WsError};

    // Network
    pub use crate::network::DEFAULT_WS_URL;

    // Storage
    pub use crate::storage::{FileStorage, MemoryStorage, SnapshotStorage, StoredIdentity};

    // High-level client
    pub use crate::client::{TickerClient, TickerClientBuilder};

    // WebSocket types
    pub use crate::ws::{Dispatcher, MessageOut, ReadyState, WsConfig, WsEvent};
    #[cfg(feature = "ws-native")]
    pub use crate::ws::native::WsClient;
}
