//! Conversions from wire types to domain types for prices.

use super::wire::WsPriceUpdate;
use super::PriceObservation;
use crate::error::SdkError;
use chrono::{DateTime, Utc};

impl TryFrom<WsPriceUpdate> for PriceObservation {
    type Error = SdkError;

    fn try_from(u: WsPriceUpdate) -> Result<Self, Self::Error> {
        let timestamp = DateTime::parse_from_rfc3339(&u.timestamp)
            .map_err(|e| {
                SdkError::Validation(format!("Invalid price timestamp '{}': {}", u.timestamp, e))
            })?
            .with_timezone(&Utc);

        Ok(Self {
            commodity_id: u.commodity_id,
            circle_id: u.circle_id,
            timestamp,
            price: u.new_price,
            price_change: u.price_change,
            change_percentage: u.change_percentage,
            change_direction: u.change_direction,
            quality: u.quality,
            arrivals: u.arrivals,
        })
    }
}
