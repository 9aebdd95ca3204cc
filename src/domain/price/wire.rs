//! Wire types for price pushes (WS).

use super::ChangeDirection;
use crate::shared::{CircleId, CommodityId};
use serde::{Deserialize, Serialize};

/// WS `price_update` message body.
///
/// Field names follow the server's camelCase envelope. `new_price` becomes
/// `PriceObservation::price` on conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WsPriceUpdate {
    pub commodity_id: CommodityId,
    pub circle_id: CircleId,
    /// ISO-8601 observation time, as reported by the source.
    pub timestamp: String,
    pub new_price: f64,
    pub price_change: f64,
    pub change_percentage: f64,
    pub change_direction: ChangeDirection,
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(default)]
    pub arrivals: Option<String>,
}
