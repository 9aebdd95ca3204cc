//! Price domain: live mandi price observations per commodity and circle.

mod convert;
pub mod display;
pub mod state;
pub mod wire;

use crate::shared::{CircleId, CommodityId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use display::{DirectionStyle, PriceView};
pub use state::{PriceStore, PriceStoreState, Subscription};

/// Sign classification reported by the source.
///
/// Trusted as given: the server may apply its own threshold for "stable",
/// so this is never recomputed from `price_change`. Unknown tokens read as
/// `Stable`, which renders neutral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeDirection {
    Up,
    Down,
    #[serde(other)]
    Stable,
}

/// One reported price point for a commodity in a circle at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceObservation {
    pub commodity_id: CommodityId,
    pub circle_id: CircleId,
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub price_change: f64,
    pub change_percentage: f64,
    pub change_direction: ChangeDirection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrivals: Option<String>,
}

impl PriceObservation {
    /// The (commodity, circle) key this observation is indexed under.
    pub fn key(&self) -> (CommodityId, CircleId) {
        (self.commodity_id, self.circle_id)
    }
}
