use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::{Currency, round_money};

use super::ExchangeRateSet;

/// The converted value exceeds what a `Decimal` can hold.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("amount out of range for conversion")]
pub struct ConversionOverflow;

/// Outcome of converting an entered amount: the base-currency equivalent
/// and both home-currency equivalents, rounded for storage, plus the
/// rate set that produced them.
#[derive(Debug, Clone)]
pub struct Conversion {
    pub amount_base: Decimal,
    pub amount_gbp: Decimal,
    pub amount_aed: Decimal,
    pub rates_used: ExchangeRateSet,
}

/// Convert an amount through the base currency into both home currencies.
///
/// `base = amount / rate(from)` unless `from` is already the base; each
/// home amount is `base * rate(home)`. Rounding happens once, on the
/// stored outputs, never on the intermediate base value. Errors when any
/// leg overflows the decimal range.
pub fn convert(
    amount: Decimal,
    from: Currency,
    rates: &ExchangeRateSet,
) -> Result<Conversion, ConversionOverflow> {
    let amount_base = if from.is_base() {
        amount
    } else {
        amount
            .checked_div(rates.rate(from))
            .ok_or(ConversionOverflow)?
    };
    let amount_gbp = amount_base
        .checked_mul(rates.rate(Currency::Gbp))
        .ok_or(ConversionOverflow)?;
    let amount_aed = amount_base
        .checked_mul(rates.rate(Currency::Aed))
        .ok_or(ConversionOverflow)?;

    Ok(Conversion {
        amount_base: round_money(amount_base),
        amount_gbp: round_money(amount_gbp),
        amount_aed: round_money(amount_aed),
        rates_used: rates.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_base_currency_passes_through() {
        let rates = ExchangeRateSet::fallback();
        let conv = convert(dec("50"), Currency::Rmb, &rates).unwrap();
        assert_eq!(conv.amount_base, dec("50.00"));
        assert_eq!(conv.amount_gbp, dec("5.50")); // 50 * 0.11
        assert_eq!(conv.amount_aed, dec("26.00")); // 50 * 0.52
    }

    #[test]
    fn test_foreign_currency_routes_through_base() {
        let rates = ExchangeRateSet::fallback();
        // 11 GBP / 0.11 = 100 RMB
        let conv = convert(dec("11"), Currency::Gbp, &rates).unwrap();
        assert_eq!(conv.amount_base, dec("100.00"));
        assert_eq!(conv.amount_gbp, dec("11.00"));
        assert_eq!(conv.amount_aed, dec("52.00"));
    }

    #[test]
    fn test_targets_derived_from_unrounded_base() {
        let rates = ExchangeRateSet::fallback();
        // 1 USD / 0.14 = 7.142857... RMB; home amounts must use the
        // full-precision base, not the rounded 7.14
        let conv = convert(dec("1"), Currency::Usd, &rates).unwrap();
        assert_eq!(conv.amount_base, dec("7.14"));
        assert_eq!(conv.amount_gbp, round_money(dec("1") / dec("0.14") * dec("0.11")));
        assert_eq!(conv.amount_aed, round_money(dec("1") / dec("0.14") * dec("0.52")));
    }

    #[test]
    fn test_outputs_rounded_to_two_places() {
        let rates = ExchangeRateSet::fallback();
        let conv = convert(dec("33.333"), Currency::Rmb, &rates).unwrap();
        assert_eq!(conv.amount_base, dec("33.33"));
        assert!(conv.amount_gbp.scale() <= 2);
        assert!(conv.amount_aed.scale() <= 2);
    }

    #[test]
    fn test_overflowing_amount_errors_instead_of_panicking() {
        let rates = ExchangeRateSet::fallback();
        // MAX GBP / 0.11 exceeds the decimal range on the base leg
        assert_eq!(
            convert(Decimal::MAX, Currency::Gbp, &rates).unwrap_err(),
            ConversionOverflow
        );
    }
}
