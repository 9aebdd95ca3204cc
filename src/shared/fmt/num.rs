//! Number formatting utilities for human-readable display.
//!
//! Handles f64 values with trailing-zero trimming and Indian digit grouping
//! (`12,34,567`: the last three digits, then groups of two), which is how
//! mandi prices are quoted.

/// Rupee sign used for all currency output.
pub const RUPEE: char = '₹';

/// Trims trailing zeros, adds Indian thousands/lakh/crore separators.
pub fn display_formatted_string(formatted: String) -> String {
    let trimmed = if formatted.contains('.') {
        formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    } else {
        formatted
    };

    let (sign, unsigned) = match trimmed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", trimmed.as_str()),
    };

    let mut parts = unsigned.splitn(2, '.');
    let integer_digits = parts.next().unwrap_or_default();
    let fraction = parts.next();

    let grouped = group_indian(integer_digits);

    // "-0" after trimming reads as zero
    let sign = if grouped == "0" && fraction.is_none() { "" } else { sign };

    match fraction {
        Some(fraction) => format!("{}{}.{}", sign, grouped, fraction),
        None => format!("{}{}", sign, grouped),
    }
}

fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }

    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(2);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();

    format!("{},{}", groups.join(","), tail)
}

/// Format an f64 for display with up to two decimals.
pub fn display(amount: &f64) -> String {
    display_with_decimals(amount, 2)
}

/// Format an f64 for display with explicit decimal places.
pub fn display_with_decimals(amount: &f64, decimals: usize) -> String {
    let formatted = format!("{:.1$}", amount, decimals);
    display_formatted_string(formatted)
}

/// Rupee amount, unsigned: `₹1,23,456.5`.
///
/// Negative inputs keep their sign in front of the rupee sign (`-₹15`).
pub fn format_inr(amount: f64) -> String {
    let body = display(&amount.abs());
    if amount < 0.0 && body != "0" {
        format!("-{}{}", RUPEE, body)
    } else {
        format!("{}{}", RUPEE, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_formatted_string_integers() {
        assert_eq!(display_formatted_string("0".to_string()), "0");
        assert_eq!(display_formatted_string("1".to_string()), "1");
        assert_eq!(display_formatted_string("123".to_string()), "123");
    }

    #[test]
    fn test_display_formatted_string_indian_grouping() {
        assert_eq!(display_formatted_string("1000".to_string()), "1,000");
        assert_eq!(display_formatted_string("12345".to_string()), "12,345");
        assert_eq!(display_formatted_string("123456".to_string()), "1,23,456");
        assert_eq!(display_formatted_string("1234567".to_string()), "12,34,567");
        assert_eq!(
            display_formatted_string("1234567890".to_string()),
            "1,23,45,67,890"
        );
    }

    #[test]
    fn test_display_formatted_string_trailing_zeros_trimmed() {
        assert_eq!(display_formatted_string("1.50".to_string()), "1.5");
        assert_eq!(display_formatted_string("1.00".to_string()), "1");
        assert_eq!(display_formatted_string("2150.00".to_string()), "2,150");
    }

    #[test]
    fn test_display_formatted_string_negative() {
        assert_eq!(display_formatted_string("-1".to_string()), "-1");
        assert_eq!(display_formatted_string("-100000".to_string()), "-1,00,000");
        assert_eq!(display_formatted_string("-1234.56".to_string()), "-1,234.56");
        assert_eq!(display_formatted_string("-0.00".to_string()), "0");
    }

    #[test]
    fn test_display_with_decimals_rounds() {
        assert_eq!(display_with_decimals(&1.234, 2), "1.23");
        assert_eq!(display_with_decimals(&1.235, 0), "1");
        assert_eq!(display_with_decimals(&2450.0, 2), "2,450");
    }

    #[test]
    fn test_format_inr() {
        assert_eq!(format_inr(15.0), "₹15");
        assert_eq!(format_inr(2450.5), "₹2,450.5");
        assert_eq!(format_inr(-15.0), "-₹15");
        assert_eq!(format_inr(0.0), "₹0");
    }
}
