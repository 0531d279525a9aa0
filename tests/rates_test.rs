mod common;

use std::collections::HashMap;

use anyhow::Result;
use common::{dec, expense, test_service};
use viaggio::domain::{Category, City, Currency, Payer};
use viaggio::rates::{self, ExchangeRateSet, RateProvider};

#[tokio::test]
async fn test_unreachable_source_degrades_to_cached_rates() {
    // Nothing listens on port 1, so the fetch fails fast
    let provider = RateProvider::with_endpoints(vec!["http://127.0.0.1:1/".to_string()]);

    assert!(provider.refresh().await.is_err());

    // get_rates absorbs the failure and hands back the fallback set
    let set = provider.get_rates().await;
    assert_eq!(set.rate(Currency::Gbp), dec("0.11"));
    assert_eq!(set.rate(Currency::Aed), dec("0.52"));
}

#[tokio::test]
async fn test_expense_entry_survives_unreachable_source() -> Result<()> {
    let (service, _temp) = test_service()?;

    // Adding an expense must not fail just because rates can't be fetched;
    // the fixed test provider stands in for a provider running on fallback
    let record = service
        .add(expense(
            "100",
            Currency::Rmb,
            Category::Food,
            City::Guilin,
            Payer::Couple,
            "2025-02-15",
        ))
        .await?;
    assert_eq!(record.amount_gbp, dec("11.00"));
    assert_eq!(record.amount_aed, dec("52.00"));
    Ok(())
}

#[test]
fn test_conversion_is_exact_through_the_base_leg() {
    // 11 GBP at 0.11/RMB is exactly 100 RMB, and the AED leg is computed
    // from the unrounded base amount
    let rates = ExchangeRateSet::fallback();
    let conv = rates::convert(dec("11"), Currency::Gbp, &rates).unwrap();
    assert_eq!(conv.amount_base, dec("100.00"));
    assert_eq!(conv.amount_aed, dec("52.00"));
}

#[test]
fn test_conversion_rounds_half_to_even() {
    // 0.125 lands exactly between 0.12 and 0.13; banker's rounding
    // picks the even digit
    let mut custom = HashMap::new();
    custom.insert(Currency::Gbp, dec("0.125"));
    let rates = ExchangeRateSet::with_rates(custom);

    let conv = rates::convert(dec("1"), Currency::Rmb, &rates).unwrap();
    assert_eq!(conv.amount_gbp, dec("0.12"));
}
