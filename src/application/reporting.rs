use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::domain::{
    Category, City, Currency, ExpenseFilter, ExpenseRecord, Payer, round_money,
};
use crate::rates::ExchangeRateSet;

/// Per-person totals in base currency and each person's home currency.
/// "Couple" expenses contribute half to each side.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonTotals {
    pub sunil_base: Decimal,
    pub sunil_gbp: Decimal,
    pub shirin_base: Decimal,
    pub shirin_aed: Decimal,
}

impl PersonTotals {
    fn zero() -> Self {
        Self {
            sunil_base: Decimal::ZERO,
            sunil_gbp: Decimal::ZERO,
            shirin_base: Decimal::ZERO,
            shirin_aed: Decimal::ZERO,
        }
    }

    fn accumulate(&mut self, expense: &ExpenseRecord) {
        let share_a = expense.payer.share_a();
        let share_b = expense.payer.share_b();
        self.sunil_base += expense.amount_base * share_a;
        self.sunil_gbp += expense.amount_gbp * share_a;
        self.shirin_base += expense.amount_base * share_b;
        self.shirin_aed += expense.amount_aed * share_b;
    }

    fn rounded(mut self) -> Self {
        self.sunil_base = round_money(self.sunil_base);
        self.sunil_gbp = round_money(self.sunil_gbp);
        self.shirin_base = round_money(self.shirin_base);
        self.shirin_aed = round_money(self.shirin_aed);
        self
    }
}

/// Headline summary over a filtered set of records.
#[derive(Debug, Clone)]
pub struct Summary {
    pub record_count: usize,
    pub total_base: Decimal,
    pub persons: PersonTotals,
    /// City totals in base currency, largest first.
    pub by_city: Vec<(City, Decimal)>,
}

/// Per-category totals for the breakdown report.
#[derive(Debug, Clone)]
pub struct CategoryBreakdown {
    pub category: Category,
    pub count: usize,
    pub total_base: Decimal,
    pub persons: PersonTotals,
}

/// Spending summary groupings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    Person,
    Category,
}

impl GroupBy {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "person" => Some(GroupBy::Person),
            "category" => Some(GroupBy::Category),
            _ => None,
        }
    }
}

/// Totals converted into a single requested currency at current rates.
#[derive(Debug, Clone)]
pub struct SpendingSummary {
    pub currency: Currency,
    pub groups: Vec<(String, Decimal)>,
    pub total: Decimal,
}

/// One day of the trip itinerary: the day's records in insertion order.
#[derive(Debug, Clone)]
pub struct ItineraryDay {
    pub date: NaiveDate,
    pub expenses: Vec<ExpenseRecord>,
    pub total_base: Decimal,
}

/// Activity statistics views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityView {
    Overview,
    ByDate,
    ByCategory,
    ByCity,
}

impl ActivityView {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "overview" => Some(ActivityView::Overview),
            "by-date" => Some(ActivityView::ByDate),
            "by-category" => Some(ActivityView::ByCategory),
            "by-city" => Some(ActivityView::ByCity),
            _ => None,
        }
    }
}

/// Count and base-currency total for one statistics bucket.
#[derive(Debug, Clone)]
pub struct ActivityBucket {
    pub label: String,
    pub count: usize,
    pub total_base: Decimal,
}

#[derive(Debug, Clone)]
pub enum ActivityStats {
    Overview {
        total_activities: usize,
        unique_days: usize,
        first_date: NaiveDate,
        last_date: NaiveDate,
        top_categories: Vec<ActivityBucket>,
        top_cities: Vec<ActivityBucket>,
    },
    /// Buckets in the order named by the view: dates ascending,
    /// categories and cities by descending total.
    Buckets(Vec<ActivityBucket>),
}

fn filtered<'a>(records: &'a [ExpenseRecord], filter: &ExpenseFilter) -> Vec<&'a ExpenseRecord> {
    records.iter().filter(|e| filter.matches(e)).collect()
}

/// Headline totals for the matching records. `None` when nothing matches,
/// so callers can't mistake an empty filter result for a zero total.
pub fn summarize(records: &[ExpenseRecord], filter: &ExpenseFilter) -> Option<Summary> {
    let matched = filtered(records, filter);
    if matched.is_empty() {
        return None;
    }

    let mut persons = PersonTotals::zero();
    let mut total_base = Decimal::ZERO;
    let mut cities: BTreeMap<&'static str, (City, Decimal)> = BTreeMap::new();

    for expense in &matched {
        total_base += expense.amount_base;
        persons.accumulate(expense);
        cities
            .entry(expense.city.as_str())
            .or_insert((expense.city, Decimal::ZERO))
            .1 += expense.amount_base;
    }

    let mut by_city: Vec<(City, Decimal)> = cities
        .into_values()
        .map(|(city, total)| (city, round_money(total)))
        .collect();
    by_city.sort_by(|a, b| b.1.cmp(&a.1));

    Some(Summary {
        record_count: matched.len(),
        total_base: round_money(total_base),
        persons: persons.rounded(),
        by_city,
    })
}

/// Per-category totals, largest first, with per-person views applying the
/// 50/50 "Couple" split. `None` when nothing matches.
pub fn category_breakdown(
    records: &[ExpenseRecord],
    filter: &ExpenseFilter,
) -> Option<Vec<CategoryBreakdown>> {
    let matched = filtered(records, filter);
    if matched.is_empty() {
        return None;
    }

    let mut buckets: BTreeMap<&'static str, CategoryBreakdown> = BTreeMap::new();
    for expense in &matched {
        let bucket = buckets
            .entry(expense.category.as_str())
            .or_insert_with(|| CategoryBreakdown {
                category: expense.category,
                count: 0,
                total_base: Decimal::ZERO,
                persons: PersonTotals::zero(),
            });
        bucket.count += 1;
        bucket.total_base += expense.amount_base;
        bucket.persons.accumulate(expense);
    }

    let mut breakdown: Vec<CategoryBreakdown> = buckets
        .into_values()
        .map(|mut b| {
            b.total_base = round_money(b.total_base);
            b.persons = b.persons.rounded();
            b
        })
        .collect();
    breakdown.sort_by(|a, b| b.total_base.cmp(&a.total_base));
    Some(breakdown)
}

/// Total spending expressed in `currency`, grouped by person or category.
/// Base-currency totals are converted with the rates passed in, which are
/// the rates in effect now, not at record creation.
pub fn spending_summary(
    records: &[ExpenseRecord],
    filter: &ExpenseFilter,
    currency: Currency,
    group_by: GroupBy,
    rates: &ExchangeRateSet,
) -> Option<SpendingSummary> {
    let matched = filtered(records, filter);
    if matched.is_empty() {
        return None;
    }

    let to_target = |base: Decimal| round_money(base * rates.rate(currency));

    let mut total_base = Decimal::ZERO;
    let groups: Vec<(String, Decimal)> = match group_by {
        GroupBy::Person => {
            let mut sunil = Decimal::ZERO;
            let mut shirin = Decimal::ZERO;
            for expense in &matched {
                total_base += expense.amount_base;
                sunil += expense.amount_base * expense.payer.share_a();
                shirin += expense.amount_base * expense.payer.share_b();
            }
            vec![
                (Payer::Sunil.as_str().to_string(), to_target(sunil)),
                (Payer::Shirin.as_str().to_string(), to_target(shirin)),
            ]
        }
        GroupBy::Category => {
            let mut buckets: BTreeMap<&'static str, Decimal> = BTreeMap::new();
            for expense in &matched {
                total_base += expense.amount_base;
                *buckets.entry(expense.category.as_str()).or_default() += expense.amount_base;
            }
            let mut groups: Vec<(String, Decimal)> = buckets
                .into_iter()
                .map(|(label, base)| (label.to_string(), to_target(base)))
                .collect();
            groups.sort_by(|a, b| b.1.cmp(&a.1));
            groups
        }
    };

    Some(SpendingSummary {
        currency,
        groups,
        total: to_target(total_base),
    })
}

/// Records grouped by date ascending; within a day, insertion order.
/// `None` when nothing matches.
pub fn itinerary(records: &[ExpenseRecord], filter: &ExpenseFilter) -> Option<Vec<ItineraryDay>> {
    let matched = filtered(records, filter);
    if matched.is_empty() {
        return None;
    }

    let mut days: BTreeMap<NaiveDate, Vec<ExpenseRecord>> = BTreeMap::new();
    for expense in matched {
        days.entry(expense.date).or_default().push(expense.clone());
    }

    Some(
        days.into_iter()
            .map(|(date, expenses)| {
                let total_base = round_money(expenses.iter().map(|e| e.amount_base).sum());
                ItineraryDay {
                    date,
                    expenses,
                    total_base,
                }
            })
            .collect(),
    )
}

/// Aggregated counts and totals per the requested dimension.
/// `None` when nothing matches.
pub fn activity_stats(
    records: &[ExpenseRecord],
    filter: &ExpenseFilter,
    view: ActivityView,
) -> Option<ActivityStats> {
    let matched = filtered(records, filter);
    if matched.is_empty() {
        return None;
    }

    let bucket_by = |key: fn(&ExpenseRecord) -> String| -> Vec<ActivityBucket> {
        let mut buckets: BTreeMap<String, ActivityBucket> = BTreeMap::new();
        for &expense in &matched {
            let label = key(expense);
            let bucket = buckets
                .entry(label.clone())
                .or_insert_with(|| ActivityBucket {
                    label,
                    count: 0,
                    total_base: Decimal::ZERO,
                });
            bucket.count += 1;
            bucket.total_base += expense.amount_base;
        }
        buckets
            .into_values()
            .map(|mut b| {
                b.total_base = round_money(b.total_base);
                b
            })
            .collect()
    };

    let by_total_desc = |mut buckets: Vec<ActivityBucket>| {
        buckets.sort_by(|a, b| b.count.cmp(&a.count).then(b.total_base.cmp(&a.total_base)));
        buckets
    };

    match view {
        ActivityView::Overview => {
            let dates: Vec<NaiveDate> = matched.iter().map(|e| e.date).collect();
            let first_date = *dates.iter().min()?;
            let last_date = *dates.iter().max()?;
            let mut unique = dates.clone();
            unique.sort();
            unique.dedup();

            Some(ActivityStats::Overview {
                total_activities: matched.len(),
                unique_days: unique.len(),
                first_date,
                last_date,
                top_categories: by_total_desc(bucket_by(|e| e.category.to_string()))
                    .into_iter()
                    .take(5)
                    .collect(),
                top_cities: by_total_desc(bucket_by(|e| e.city.to_string()))
                    .into_iter()
                    .take(5)
                    .collect(),
            })
        }
        // BTreeMap keys are ISO dates, so the natural order is ascending
        ActivityView::ByDate => Some(ActivityStats::Buckets(bucket_by(|e| e.date.to_string()))),
        ActivityView::ByCategory => Some(ActivityStats::Buckets(by_total_desc(bucket_by(|e| {
            e.category.to_string()
        })))),
        ActivityView::ByCity => Some(ActivityStats::Buckets(by_total_desc(bucket_by(|e| {
            e.city.to_string()
        })))),
    }
}
