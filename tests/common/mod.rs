// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use rust_decimal::Decimal;
use tempfile::TempDir;
use viaggio::application::LedgerService;
use viaggio::domain::{Category, City, Currency, NewExpense, Payer};
use viaggio::rates::{ExchangeRateSet, RateProvider};
use viaggio::storage::JsonStore;

/// Service backed by a temporary JSON file and the static fallback rates,
/// so conversions are deterministic and no network is touched.
pub fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let service = service_at(&temp_dir)?;
    Ok((service, temp_dir))
}

/// Open a (possibly pre-existing) test service over the given directory.
pub fn service_at(temp_dir: &TempDir) -> Result<LedgerService> {
    let store = JsonStore::new(temp_dir.path().join("ledger.json"));
    let provider = Arc::new(RateProvider::fixed(ExchangeRateSet::fallback()));
    Ok(LedgerService::new(Box::new(store), provider)?)
}

pub fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

/// A valid expense with the given essentials and a fixed date.
pub fn expense(
    amount: &str,
    currency: Currency,
    category: Category,
    city: City,
    payer: Payer,
    date: &str,
) -> NewExpense {
    NewExpense {
        amount: dec(amount),
        currency,
        activity: "test activity".to_string(),
        category,
        city,
        payer,
        date: Some(date.parse().unwrap()),
        notes: None,
    }
}
