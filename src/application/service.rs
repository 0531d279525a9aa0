use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Local, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{
    Document, ExpenseFilter, ExpenseId, ExpenseRecord, ExpenseUpdate, LedgerState, NewExpense,
};
use crate::rates::{RateProvider, convert};
use crate::storage::{JsonStore, Store};

use super::AppError;

/// A full, serializable copy of the ledger for backup. Detached from the
/// live state: mutating a snapshot never affects the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub expenses: Vec<ExpenseRecord>,
    pub next_id: ExpenseId,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

/// A document together with the expense it belongs to, for listings.
#[derive(Debug, Clone)]
pub struct DocumentEntry {
    pub expense_id: ExpenseId,
    pub activity: String,
    pub date: NaiveDate,
    pub document: Document,
}

/// Ledger-wide statistics.
#[derive(Debug, Clone)]
pub struct LedgerStats {
    pub expense_count: usize,
    pub document_count: usize,
    pub total_base: Decimal,
    pub next_id: ExpenseId,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub date_range: Option<(NaiveDate, NaiveDate)>,
}

/// The expense ledger: owns the in-memory state, converts amounts at
/// write time through the rate provider, and persists through an
/// injected load/save store after every mutation.
///
/// A single mutex guards the whole state; mutations run to completion
/// under it and rates are always fetched before it is taken.
pub struct LedgerService {
    state: Mutex<LedgerState>,
    store: Box<dyn Store>,
    rates: Arc<RateProvider>,
}

impl LedgerService {
    /// Create a service over the given store and rate provider, loading
    /// existing state (or starting empty).
    pub fn new(store: Box<dyn Store>, rates: Arc<RateProvider>) -> Result<Self, AppError> {
        let state = store.load()?.unwrap_or_else(LedgerState::empty);
        Ok(Self {
            state: Mutex::new(state),
            store,
            rates,
        })
    }

    /// Convenience constructor: JSON file store with live rates. Fetched
    /// rates are cached in a sibling file of the ledger, so they carry
    /// across invocations.
    pub fn open(path: &str) -> Result<Self, AppError> {
        let rates_file = Path::new(path).with_file_name("exchange_rates.json");
        let provider = RateProvider::new().with_cache_file(rates_file);
        Self::new(Box::new(JsonStore::new(path)), Arc::new(provider))
    }

    pub fn rate_provider(&self) -> Arc<RateProvider> {
        Arc::clone(&self.rates)
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().expect("ledger state poisoned")
    }

    fn persist(&self, state: &mut LedgerState) -> Result<(), AppError> {
        state.last_updated = Utc::now();
        self.store.save(state)?;
        Ok(())
    }

    // ========================
    // Expense operations
    // ========================

    /// Validate, convert, and store a new expense, returning the record
    /// with its assigned id. No state is written on validation failure.
    pub async fn add(&self, fields: NewExpense) -> Result<ExpenseRecord, AppError> {
        if fields.amount <= Decimal::ZERO {
            return Err(AppError::validation("amount", "must be greater than 0"));
        }
        if fields.activity.trim().is_empty() {
            return Err(AppError::validation("activity", "must not be empty"));
        }

        let rates = self.rates.get_rates().await;
        let conversion = convert(fields.amount, fields.currency, &rates)
            .map_err(|_| AppError::validation("amount", "is too large to convert"))?;
        let date = fields
            .date
            .unwrap_or_else(|| Local::now().date_naive());

        let mut state = self.lock();
        let record = ExpenseRecord {
            id: state.take_next_id(),
            amount: fields.amount,
            currency: fields.currency,
            amount_base: conversion.amount_base,
            amount_gbp: conversion.amount_gbp,
            amount_aed: conversion.amount_aed,
            activity: fields.activity,
            category: fields.category,
            city: fields.city,
            payer: fields.payer,
            date,
            notes: fields.notes,
            documents: Vec::new(),
            created_at: Utc::now(),
        };
        state.expenses.push(record.clone());
        self.persist(&mut state)?;
        Ok(record)
    }

    /// Get an expense by id.
    pub fn get(&self, id: ExpenseId) -> Result<ExpenseRecord, AppError> {
        self.lock()
            .find(id)
            .cloned()
            .ok_or(AppError::ExpenseNotFound(id))
    }

    /// Apply a partial update. A change to amount or currency reconverts
    /// all derived amounts at the rates in effect now, not at creation.
    pub async fn edit(
        &self,
        id: ExpenseId,
        update: ExpenseUpdate,
    ) -> Result<ExpenseRecord, AppError> {
        if update.is_empty() {
            return Err(AppError::validation("fields", "no fields to update"));
        }
        if let Some(amount) = update.amount {
            if amount <= Decimal::ZERO {
                return Err(AppError::validation("amount", "must be greater than 0"));
            }
        }
        if let Some(activity) = &update.activity {
            if activity.trim().is_empty() {
                return Err(AppError::validation("activity", "must not be empty"));
            }
        }

        // Fetch rates before taking the lock; only needed when the
        // monetary fields change.
        let rates = if update.needs_reconversion() {
            Some(self.rates.get_rates().await)
        } else {
            None
        };

        let mut state = self.lock();
        let expense = state.find_mut(id).ok_or(AppError::ExpenseNotFound(id))?;

        // Convert before touching any field, so a failed conversion
        // leaves the record exactly as it was.
        let conversion = match rates {
            Some(rates) => {
                let amount = update.amount.unwrap_or(expense.amount);
                let currency = update.currency.unwrap_or(expense.currency);
                Some(
                    convert(amount, currency, &rates)
                        .map_err(|_| AppError::validation("amount", "is too large to convert"))?,
                )
            }
            None => None,
        };

        if let Some(amount) = update.amount {
            expense.amount = amount;
        }
        if let Some(currency) = update.currency {
            expense.currency = currency;
        }
        if let Some(activity) = update.activity {
            expense.activity = activity;
        }
        if let Some(category) = update.category {
            expense.category = category;
        }
        if let Some(city) = update.city {
            expense.city = city;
        }
        if let Some(payer) = update.payer {
            expense.payer = payer;
        }
        if let Some(date) = update.date {
            expense.date = date;
        }
        if let Some(notes) = update.notes {
            expense.notes = if notes.is_empty() { None } else { Some(notes) };
        }

        if let Some(conversion) = conversion {
            expense.amount_base = conversion.amount_base;
            expense.amount_gbp = conversion.amount_gbp;
            expense.amount_aed = conversion.amount_aed;
        }

        let updated = expense.clone();
        self.persist(&mut state)?;
        Ok(updated)
    }

    /// Permanently remove an expense. Its id is never reassigned.
    pub fn delete(&self, id: ExpenseId) -> Result<(), AppError> {
        let mut state = self.lock();
        let before = state.expenses.len();
        state.expenses.retain(|e| e.id != id);
        if state.expenses.len() == before {
            return Err(AppError::ExpenseNotFound(id));
        }
        self.persist(&mut state)
    }

    /// List expenses matching the filter, newest date first (stable, so
    /// same-day records keep insertion order).
    pub fn list(&self, filter: &ExpenseFilter) -> Vec<ExpenseRecord> {
        let state = self.lock();
        let mut matched: Vec<ExpenseRecord> = state
            .expenses
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.date.cmp(&a.date));

        let offset = filter.offset.unwrap_or(0);
        let matched: Vec<ExpenseRecord> = matched.into_iter().skip(offset).collect();
        match filter.limit {
            Some(limit) => matched.into_iter().take(limit).collect(),
            None => matched,
        }
    }

    /// Copy of all records in insertion order, for the reporting layer.
    pub fn snapshot_records(&self) -> Vec<ExpenseRecord> {
        self.lock().expenses.clone()
    }

    // ========================
    // Document operations
    // ========================

    /// Attach a document to an expense. Insertion order is preserved.
    pub fn add_document(&self, id: ExpenseId, document: Document) -> Result<(), AppError> {
        if document.filename.trim().is_empty() {
            return Err(AppError::validation("filename", "must not be empty"));
        }
        let mut state = self.lock();
        let expense = state.find_mut(id).ok_or(AppError::ExpenseNotFound(id))?;
        expense.documents.push(document);
        self.persist(&mut state)
    }

    /// Remove a named document from an expense.
    pub fn remove_document(&self, id: ExpenseId, filename: &str) -> Result<(), AppError> {
        let mut state = self.lock();
        let expense = state.find_mut(id).ok_or(AppError::ExpenseNotFound(id))?;
        let before = expense.documents.len();
        expense.documents.retain(|d| d.filename != filename);
        if expense.documents.len() == before {
            return Err(AppError::DocumentNotFound {
                expense_id: id,
                filename: filename.to_string(),
            });
        }
        self.persist(&mut state)
    }

    /// All documents across the ledger, newest upload first.
    pub fn list_documents(&self, limit: Option<usize>) -> Vec<DocumentEntry> {
        let state = self.lock();
        let mut entries: Vec<DocumentEntry> = state
            .expenses
            .iter()
            .flat_map(|e| {
                e.documents.iter().map(|d| DocumentEntry {
                    expense_id: e.id,
                    activity: e.activity.clone(),
                    date: e.date,
                    document: d.clone(),
                })
            })
            .collect();
        entries.sort_by(|a, b| b.document.uploaded_at.cmp(&a.document.uploaded_at));
        match limit {
            Some(limit) => entries.into_iter().take(limit).collect(),
            None => entries,
        }
    }

    // ========================
    // Ledger management
    // ========================

    /// Irreversibly empty the ledger in one atomic step. The id counter
    /// is preserved, so ids stay unique across the ledger's lifetime.
    /// Confirmation is the calling layer's job.
    pub fn clear_all(&self) -> Result<(), AppError> {
        let mut state = self.lock();
        let next_id = state.next_id;
        *state = LedgerState::empty();
        state.next_id = next_id;
        self.persist(&mut state)
    }

    /// Deep copy of the full ledger for backup.
    pub fn export_snapshot(&self) -> LedgerSnapshot {
        let state = self.lock();
        LedgerSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            expenses: state.expenses.clone(),
            next_id: state.next_id,
            created_at: state.created_at,
            last_updated: state.last_updated,
        }
    }

    /// Replace the ledger with a previously exported snapshot.
    pub fn import_snapshot(&self, snapshot: LedgerSnapshot) -> Result<(), AppError> {
        let mut state = self.lock();
        *state = LedgerState {
            expenses: snapshot.expenses,
            next_id: snapshot.next_id,
            created_at: snapshot.created_at,
            last_updated: snapshot.last_updated,
        };
        self.persist(&mut state)
    }

    /// Ledger-wide totals and counts.
    pub fn stats(&self) -> LedgerStats {
        let state = self.lock();
        let document_count = state.expenses.iter().map(|e| e.documents.len()).sum();
        let total_base = state.expenses.iter().map(|e| e.amount_base).sum();
        let date_range = state
            .expenses
            .iter()
            .map(|e| e.date)
            .min()
            .zip(state.expenses.iter().map(|e| e.date).max());

        LedgerStats {
            expense_count: state.expenses.len(),
            document_count,
            total_base,
            next_id: state.next_id,
            created_at: state.created_at,
            last_updated: state.last_updated,
            date_range,
        }
    }
}
