//! Display contracts for price rows: signed currency, percentages, direction style.

use super::{ChangeDirection, PriceObservation};
use crate::shared::fmt::{display, format_inr, RUPEE};

/// Rupee amount with Indian grouping: `₹1,23,456.5`.
pub fn format_currency(amount: f64) -> String {
    format_inr(amount)
}

/// Signed rupee delta: `+₹15` for zero or gains, `-₹15` for losses.
pub fn format_price_change(change: f64) -> String {
    if change >= 0.0 {
        format!("+{}", format_inr(change))
    } else {
        format!("-{}{}", RUPEE, display(&change.abs()))
    }
}

/// Percentage with two decimals and an explicit `+` for zero or gains.
pub fn format_percentage(pct: f64) -> String {
    if pct >= 0.0 {
        format!("+{:.2}%", pct.abs())
    } else {
        format!("{:.2}%", pct)
    }
}

/// Icon shown next to a price change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectionIcon {
    ArrowUp,
    ArrowDown,
    Minus,
}

/// Icon + color class for a change direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectionStyle {
    pub icon: DirectionIcon,
    pub color_class: &'static str,
}

impl DirectionStyle {
    pub const UP: DirectionStyle = DirectionStyle {
        icon: DirectionIcon::ArrowUp,
        color_class: "text-green-600",
    };
    pub const DOWN: DirectionStyle = DirectionStyle {
        icon: DirectionIcon::ArrowDown,
        color_class: "text-red-600",
    };
    pub const NEUTRAL: DirectionStyle = DirectionStyle {
        icon: DirectionIcon::Minus,
        color_class: "text-gray-500",
    };

    /// Missing data renders exactly like `Stable`.
    pub fn for_direction(direction: Option<ChangeDirection>) -> Self {
        match direction {
            Some(ChangeDirection::Up) => Self::UP,
            Some(ChangeDirection::Down) => Self::DOWN,
            _ => Self::NEUTRAL,
        }
    }
}

/// Pre-formatted ticker row for one observation.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceView {
    pub price: String,
    pub change: String,
    pub percentage: String,
    pub style: DirectionStyle,
}

impl From<&PriceObservation> for PriceView {
    fn from(obs: &PriceObservation) -> Self {
        Self {
            price: format_currency(obs.price),
            change: format_price_change(obs.price_change),
            percentage: format_percentage(obs.change_percentage),
            style: DirectionStyle::for_direction(Some(obs.change_direction)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::{CircleId, CommodityId};

    #[test]
    fn test_format_currency_groups_indian_style() {
        assert_eq!(format_currency(123456.0), "₹1,23,456");
        assert_eq!(format_currency(2150.75), "₹2,150.75");
        assert_eq!(format_currency(99.5), "₹99.5");
    }

    #[test]
    fn test_format_price_change_signs() {
        assert_eq!(format_price_change(15.0), "+₹15");
        assert_eq!(format_price_change(-15.0), "-₹15");
        assert_eq!(format_price_change(0.0), "+₹0");
        assert_eq!(format_price_change(-0.0), "+₹0");
        assert_eq!(format_price_change(-1250.5), "-₹1,250.5");
    }

    #[test]
    fn test_format_percentage_signs() {
        assert_eq!(format_percentage(2.5), "+2.50%");
        assert_eq!(format_percentage(-2.5), "-2.50%");
        assert_eq!(format_percentage(0.0), "+0.00%");
        assert_eq!(format_percentage(12.346), "+12.35%");
        assert_eq!(format_percentage(-0.0), "+0.00%");
        assert_eq!(format_percentage(-0.001), "-0.00%");
    }

    #[test]
    fn test_direction_style() {
        assert_eq!(DirectionStyle::for_direction(Some(ChangeDirection::Up)), DirectionStyle::UP);
        assert_eq!(
            DirectionStyle::for_direction(Some(ChangeDirection::Down)),
            DirectionStyle::DOWN
        );
        assert_eq!(
            DirectionStyle::for_direction(Some(ChangeDirection::Stable)),
            DirectionStyle::NEUTRAL
        );
        assert_eq!(DirectionStyle::for_direction(None), DirectionStyle::NEUTRAL);
        assert_eq!(DirectionStyle::NEUTRAL.icon, DirectionIcon::Minus);
        assert_eq!(DirectionStyle::UP.color_class, "text-green-600");
    }

    #[test]
    fn test_price_view_from_observation() {
        let obs = PriceObservation {
            commodity_id: CommodityId::new(1),
            circle_id: CircleId::new(1),
            timestamp: "2024-03-01T10:00:00Z".parse().unwrap(),
            price: 215000.0,
            price_change: -15.0,
            change_percentage: -2.5,
            change_direction: ChangeDirection::Down,
            quality: None,
            arrivals: None,
        };
        let view = PriceView::from(&obs);
        assert_eq!(view.price, "₹2,15,000");
        assert_eq!(view.change, "-₹15");
        assert_eq!(view.percentage, "-2.50%");
        assert_eq!(view.style, DirectionStyle::DOWN);
    }
}
