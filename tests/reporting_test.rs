mod common;

use anyhow::Result;
use common::{dec, expense, test_service};
use rust_decimal::Decimal;
use viaggio::application::reporting::{
    self, ActivityStats, ActivityView, GroupBy,
};
use viaggio::domain::{Category, City, Currency, ExpenseFilter, Payer};
use viaggio::rates::ExchangeRateSet;

/// Build a small trip: two days in Beijing, one in Shanghai, mixed payers.
async fn seeded_service() -> Result<(viaggio::application::LedgerService, tempfile::TempDir)> {
    let (service, temp) = test_service()?;

    service
        .add(expense(
            "100",
            Currency::Rmb,
            Category::Food,
            City::Beijing,
            Payer::Sunil,
            "2025-02-10",
        ))
        .await?;
    service
        .add(expense(
            "200",
            Currency::Rmb,
            Category::Transportation,
            City::Shanghai,
            Payer::Shirin,
            "2025-02-11",
        ))
        .await?;
    service
        .add(expense(
            "50",
            Currency::Rmb,
            Category::Food,
            City::Beijing,
            Payer::Couple,
            "2025-02-10",
        ))
        .await?;

    Ok((service, temp))
}

#[tokio::test]
async fn test_summary_over_service_snapshot() -> Result<()> {
    let (service, _temp) = seeded_service().await?;
    let records = service.snapshot_records();

    let summary = reporting::summarize(&records, &ExpenseFilter::default()).unwrap();
    assert_eq!(summary.record_count, 3);
    assert_eq!(summary.total_base, dec("350.00"));
    // Couple's 50 is split 50/50 into the per-person views
    assert_eq!(summary.persons.sunil_base, dec("125.00"));
    assert_eq!(summary.persons.shirin_base, dec("225.00"));
    assert_eq!(summary.persons.sunil_gbp, dec("13.75"));
    assert_eq!(summary.persons.shirin_aed, dec("117.00"));
    Ok(())
}

#[tokio::test]
async fn test_summary_with_city_filter() -> Result<()> {
    let (service, _temp) = seeded_service().await?;
    let records = service.snapshot_records();

    let filter = ExpenseFilter {
        city: Some(City::Beijing),
        ..Default::default()
    };
    let summary = reporting::summarize(&records, &filter).unwrap();
    assert_eq!(summary.record_count, 2);
    assert_eq!(summary.total_base, dec("150.00"));
    assert_eq!(summary.by_city, vec![(City::Beijing, dec("150.00"))]);
    Ok(())
}

#[tokio::test]
async fn test_empty_filter_result_is_explicit() -> Result<()> {
    let (service, _temp) = seeded_service().await?;
    let records = service.snapshot_records();

    let filter = ExpenseFilter {
        city: Some(City::London),
        ..Default::default()
    };
    assert!(reporting::summarize(&records, &filter).is_none());
    assert!(reporting::category_breakdown(&records, &filter).is_none());
    assert!(reporting::itinerary(&records, &filter).is_none());
    Ok(())
}

#[tokio::test]
async fn test_category_breakdown_sums_to_total() -> Result<()> {
    let (service, _temp) = seeded_service().await?;
    let records = service.snapshot_records();

    let breakdown =
        reporting::category_breakdown(&records, &ExpenseFilter::default()).unwrap();
    let sum: Decimal = breakdown.iter().map(|b| b.total_base).sum();
    let summary = reporting::summarize(&records, &ExpenseFilter::default()).unwrap();
    assert_eq!(sum, summary.total_base);

    // And the per-person splits within a category add up too
    let food = breakdown
        .iter()
        .find(|b| b.category == Category::Food)
        .unwrap();
    assert_eq!(food.persons.sunil_base + food.persons.shirin_base, food.total_base);
    Ok(())
}

#[tokio::test]
async fn test_spending_summary_uses_current_rates() -> Result<()> {
    let (service, _temp) = seeded_service().await?;
    let records = service.snapshot_records();

    // Report with a deliberately different "current" rate set than the
    // one the records were written with
    let mut rates = std::collections::HashMap::new();
    rates.insert(Currency::Gbp, dec("0.20"));
    let rates = ExchangeRateSet::with_rates(rates);

    let summary = reporting::spending_summary(
        &records,
        &ExpenseFilter::default(),
        Currency::Gbp,
        GroupBy::Person,
        &rates,
    )
    .unwrap();

    // 350 base total at today's 0.20, not the write-time 0.11
    assert_eq!(summary.total, dec("70.00"));
    assert_eq!(summary.groups[0], ("Sunil".to_string(), dec("25.00")));
    assert_eq!(summary.groups[1], ("Shirin".to_string(), dec("45.00")));
    Ok(())
}

#[tokio::test]
async fn test_itinerary_groups_by_day_ascending() -> Result<()> {
    let (service, _temp) = seeded_service().await?;
    let records = service.snapshot_records();

    let days = reporting::itinerary(&records, &ExpenseFilter::default()).unwrap();
    assert_eq!(days.len(), 2);
    assert!(days[0].date < days[1].date);
    assert_eq!(days[0].expenses.len(), 2);
    assert_eq!(days[0].total_base, dec("150.00"));
    // Insertion order within the day
    assert!(days[0].expenses[0].id < days[0].expenses[1].id);
    Ok(())
}

#[tokio::test]
async fn test_activity_stats_views() -> Result<()> {
    let (service, _temp) = seeded_service().await?;
    let records = service.snapshot_records();

    let overview =
        reporting::activity_stats(&records, &ExpenseFilter::default(), ActivityView::Overview)
            .unwrap();
    match overview {
        ActivityStats::Overview {
            total_activities,
            unique_days,
            ..
        } => {
            assert_eq!(total_activities, 3);
            assert_eq!(unique_days, 2);
        }
        _ => panic!("expected overview"),
    }

    let by_city =
        reporting::activity_stats(&records, &ExpenseFilter::default(), ActivityView::ByCity)
            .unwrap();
    match by_city {
        ActivityStats::Buckets(buckets) => {
            assert_eq!(buckets.len(), 2);
            // Most visited city first
            assert_eq!(buckets[0].label, "Beijing");
            assert_eq!(buckets[0].count, 2);
        }
        _ => panic!("expected buckets"),
    }
    Ok(())
}
