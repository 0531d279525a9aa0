use rust_decimal::{Decimal, RoundingStrategy};

use super::Currency;

/// Round a monetary value to 2 decimal places using banker's rounding.
/// Applied when amounts are stored or displayed, never on intermediate
/// conversion steps, so repeated edits don't compound rounding error.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
}

/// Format a monetary value with its currency symbol.
/// Example: (50, Rmb) -> "¥50.00", (12.3, Gbp) -> "£12.30"
pub fn format_money(value: Decimal, currency: Currency) -> String {
    let rounded = round_money(value);
    match currency {
        Currency::Rmb => format!("¥{rounded:.2}"),
        Currency::Gbp => format!("£{rounded:.2}"),
        Currency::Aed => format!("AED {rounded:.2}"),
        Currency::Usd => format!("${rounded:.2}"),
        Currency::Eur => format!("€{rounded:.2}"),
    }
}

/// Parse a decimal amount string.
/// Example: "50.00" -> 50.00, "12.5" -> 12.5, "100" -> 100
pub fn parse_amount(input: &str) -> Result<Decimal, ParseAmountError> {
    input
        .trim()
        .parse::<Decimal>()
        .map_err(|_| ParseAmountError::InvalidFormat)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseAmountError {
    InvalidFormat,
}

impl std::fmt::Display for ParseAmountError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseAmountError::InvalidFormat => write!(f, "invalid amount format"),
        }
    }
}

impl std::error::Error for ParseAmountError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_round_money_two_places() {
        assert_eq!(round_money(dec("5.501")), dec("5.50"));
        assert_eq!(round_money(dec("5.506")), dec("5.51"));
        assert_eq!(round_money(dec("5.5")), dec("5.50"));
    }

    #[test]
    fn test_round_money_half_to_even() {
        // Midpoints round toward the even neighbor
        assert_eq!(round_money(dec("2.345")), dec("2.34"));
        assert_eq!(round_money(dec("2.355")), dec("2.36"));
        assert_eq!(round_money(dec("2.125")), dec("2.12"));
        assert_eq!(round_money(dec("2.135")), dec("2.14"));
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(dec("50"), Currency::Rmb), "¥50.00");
        assert_eq!(format_money(dec("12.3"), Currency::Gbp), "£12.30");
        assert_eq!(format_money(dec("7.775"), Currency::Aed), "AED 7.78");
        assert_eq!(format_money(dec("0.1"), Currency::Usd), "$0.10");
        assert_eq!(format_money(dec("99.999"), Currency::Eur), "€100.00");
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("50.00"), Ok(dec("50.00")));
        assert_eq!(parse_amount("50"), Ok(dec("50")));
        assert_eq!(parse_amount(" 12.5 "), Ok(dec("12.5")));
        assert_eq!(parse_amount("0.50"), Ok(dec("0.50")));
    }

    #[test]
    fn test_parse_amount_invalid() {
        assert!(parse_amount("abc").is_err());
        assert!(parse_amount("12.34.56").is_err());
    }
}
