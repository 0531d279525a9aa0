use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Category, City, Currency, Payer};

/// Expense identifiers are assigned monotonically and never reused,
/// even after deletion or a full clear of the ledger.
pub type ExpenseId = u64;

/// Metadata for a file attached to an expense (receipts, tickets, visas).
/// The stored reference points into whatever attachment transport the
/// caller uses; the ledger only tracks it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub filename: String,
    pub stored_ref: String,
    pub uploaded_at: DateTime<Utc>,
}

/// A single expense entry.
///
/// `amount`/`currency` are what the user entered; `amount_base` is the
/// RMB equivalent, and `amount_gbp`/`amount_aed` the two home-currency
/// equivalents, all computed with the rates in effect when the record
/// was written or last had its amount/currency edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    pub id: ExpenseId,
    pub amount: Decimal,
    pub currency: Currency,
    pub amount_base: Decimal,
    pub amount_gbp: Decimal,
    pub amount_aed: Decimal,
    pub activity: String,
    pub category: Category,
    pub city: City,
    pub payer: Payer,
    pub date: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub documents: Vec<Document>,
    pub created_at: DateTime<Utc>,
}

/// Fields for a new expense, before conversion and id assignment.
#[derive(Debug, Clone)]
pub struct NewExpense {
    pub amount: Decimal,
    pub currency: Currency,
    pub activity: String,
    pub category: Category,
    pub city: City,
    pub payer: Payer,
    /// Defaults to today when omitted.
    pub date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Partial update for an expense. Only supplied fields are applied;
/// a change to `amount` or `currency` triggers reconversion at the
/// rates in effect at edit time.
#[derive(Debug, Clone, Default)]
pub struct ExpenseUpdate {
    pub amount: Option<Decimal>,
    pub currency: Option<Currency>,
    pub activity: Option<String>,
    pub category: Option<Category>,
    pub city: Option<City>,
    pub payer: Option<Payer>,
    pub date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl ExpenseUpdate {
    pub fn is_empty(&self) -> bool {
        self.amount.is_none()
            && self.currency.is_none()
            && self.activity.is_none()
            && self.category.is_none()
            && self.city.is_none()
            && self.payer.is_none()
            && self.date.is_none()
            && self.notes.is_none()
    }

    /// True when the update touches a field that feeds conversion.
    pub fn needs_reconversion(&self) -> bool {
        self.amount.is_some() || self.currency.is_some()
    }
}

/// Filter over the ledger. Unset fields mean "no restriction";
/// the date range is inclusive on both ends.
#[derive(Debug, Clone, Default)]
pub struct ExpenseFilter {
    pub city: Option<City>,
    pub category: Option<Category>,
    pub payer: Option<Payer>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl ExpenseFilter {
    pub fn matches(&self, expense: &ExpenseRecord) -> bool {
        if let Some(city) = self.city {
            if expense.city != city {
                return false;
            }
        }
        if let Some(category) = self.category {
            if expense.category != category {
                return false;
            }
        }
        if let Some(payer) = self.payer {
            if expense.payer != payer {
                return false;
            }
        }
        if let Some(from) = self.from_date {
            if expense.date < from {
                return false;
            }
        }
        if let Some(to) = self.to_date {
            if expense.date > to {
                return false;
            }
        }
        true
    }
}

/// The full mutable state of the ledger: every record plus the id counter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerState {
    pub expenses: Vec<ExpenseRecord>,
    pub next_id: ExpenseId,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl LedgerState {
    pub fn empty() -> Self {
        let now = Utc::now();
        Self {
            expenses: Vec::new(),
            next_id: 1,
            created_at: now,
            last_updated: now,
        }
    }

    /// Take the next id, advancing the counter.
    pub fn take_next_id(&mut self) -> ExpenseId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn find(&self, id: ExpenseId) -> Option<&ExpenseRecord> {
        self.expenses.iter().find(|e| e.id == id)
    }

    pub fn find_mut(&mut self, id: ExpenseId) -> Option<&mut ExpenseRecord> {
        self.expenses.iter_mut().find(|e| e.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(id: ExpenseId, city: City, category: Category, date: &str) -> ExpenseRecord {
        ExpenseRecord {
            id,
            amount: Decimal::new(100, 0),
            currency: Currency::Rmb,
            amount_base: Decimal::new(100, 0),
            amount_gbp: Decimal::new(11, 0),
            amount_aed: Decimal::new(52, 0),
            activity: "test".into(),
            category,
            city,
            payer: Payer::Couple,
            date: date.parse().unwrap(),
            notes: None,
            documents: Vec::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_filter_empty_matches_everything() {
        let e = sample(1, City::Beijing, Category::Food, "2025-02-10");
        assert!(ExpenseFilter::default().matches(&e));
    }

    #[test]
    fn test_filter_by_city_and_category() {
        let e = sample(1, City::Beijing, Category::Food, "2025-02-10");
        let mut filter = ExpenseFilter {
            city: Some(City::Beijing),
            ..Default::default()
        };
        assert!(filter.matches(&e));
        filter.category = Some(Category::Shopping);
        assert!(!filter.matches(&e));
    }

    #[test]
    fn test_filter_date_range_inclusive() {
        let e = sample(1, City::Guilin, Category::Activities, "2025-02-10");
        let filter = ExpenseFilter {
            from_date: Some("2025-02-10".parse().unwrap()),
            to_date: Some("2025-02-10".parse().unwrap()),
            ..Default::default()
        };
        assert!(filter.matches(&e));

        let filter = ExpenseFilter {
            to_date: Some("2025-02-09".parse().unwrap()),
            ..Default::default()
        };
        assert!(!filter.matches(&e));
    }

    #[test]
    fn test_take_next_id_is_monotonic() {
        let mut state = LedgerState::empty();
        assert_eq!(state.take_next_id(), 1);
        assert_eq!(state.take_next_id(), 2);
        assert_eq!(state.next_id, 3);
    }
}
