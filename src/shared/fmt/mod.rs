//! Human-readable number formatting for ticker and price displays.

pub mod num;

pub use num::{display, display_formatted_string, display_with_decimals, format_inr, RUPEE};
