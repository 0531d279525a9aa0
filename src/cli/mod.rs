use std::fs::File;

use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

use crate::application::reporting::{
    self, ActivityStats, ActivityView, GroupBy, PersonTotals,
};
use crate::application::{AppError, LedgerService, LedgerSnapshot};
use crate::domain::{
    Category, City, Currency, Document, ExpenseFilter, ExpenseRecord, ExpenseUpdate, NewExpense,
    Payer, format_money, parse_amount,
};
use crate::io::Exporter;

/// Token required to wipe the ledger.
const CLEAR_CONFIRMATION: &str = "DELETE EVERYTHING";

/// Viaggio - Travel Expense Ledger
#[derive(Parser)]
#[command(name = "viaggio")]
#[command(about = "A two-person travel expense ledger with multi-currency conversion")]
#[command(version)]
pub struct Cli {
    /// Ledger data file path
    #[arg(short, long, default_value = "viaggio.json")]
    pub data: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a new expense
    Add {
        /// Amount spent (e.g., "50.00" or "50")
        amount: String,

        /// Currency: RMB, GBP, AED, USD, EUR
        #[arg(short, long, default_value = "RMB")]
        currency: String,

        /// Description of the activity or expense
        #[arg(short, long)]
        activity: String,

        /// Category (e.g., Food, Transportation, Accommodation)
        #[arg(long)]
        category: String,

        /// City where the expense occurred
        #[arg(long)]
        city: String,

        /// Who paid: Sunil, Shirin, or Couple
        #[arg(short, long)]
        payer: String,

        /// Date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,

        /// Additional notes
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// List expenses, newest first
    List {
        /// Filter by city
        #[arg(long)]
        city: Option<String>,

        /// Filter by category
        #[arg(long)]
        category: Option<String>,

        /// Filter by payer
        #[arg(long)]
        payer: Option<String>,

        /// Filter from date (YYYY-MM-DD, inclusive)
        #[arg(long)]
        from: Option<String>,

        /// Filter to date (YYYY-MM-DD, inclusive)
        #[arg(long)]
        to: Option<String>,

        /// Maximum number of expenses to show
        #[arg(short, long)]
        limit: Option<usize>,

        /// Number of expenses to skip
        #[arg(long)]
        offset: Option<usize>,
    },

    /// Show a single expense in full
    Show {
        /// Expense id
        id: u64,
    },

    /// Edit an existing expense; only supplied fields change
    Edit {
        /// Expense id
        id: u64,

        /// New amount
        #[arg(long)]
        amount: Option<String>,

        /// New currency
        #[arg(long)]
        currency: Option<String>,

        /// New activity description
        #[arg(long)]
        activity: Option<String>,

        /// New category
        #[arg(long)]
        category: Option<String>,

        /// New city
        #[arg(long)]
        city: Option<String>,

        /// New payer
        #[arg(long)]
        payer: Option<String>,

        /// New date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,

        /// New notes (empty string clears them)
        #[arg(long)]
        notes: Option<String>,
    },

    /// Delete an expense permanently
    Delete {
        /// Expense id
        id: u64,
    },

    /// Expense summary with per-person shares and city breakdown
    Summary {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Expense breakdown by category
    Categories {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Total spending in any currency, grouped by person or category
    Spending {
        /// Currency to report in: RMB, GBP, AED, USD, EUR
        currency: String,

        /// Grouping: person or category
        #[arg(short, long, default_value = "person")]
        group_by: String,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Day-by-day trip itinerary with expenses
    Itinerary {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Activity statistics: overview, by-date, by-category, by-city
    Activity {
        /// View: overview, by-date, by-category, by-city
        #[arg(short, long, default_value = "overview")]
        view: String,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Show current exchange rates
    Rates {
        /// Force a refresh even if the cache is fresh
        #[arg(long)]
        refresh: bool,
    },

    /// Document management commands
    #[command(subcommand)]
    Doc(DocCommands),

    /// Ledger statistics
    Stats,

    /// Export the ledger to CSV or JSON
    Export {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,

        /// Format: csv, json
        #[arg(short, long, default_value = "csv")]
        format: String,
    },

    /// Import a previously exported JSON snapshot (overwrites the ledger)
    Import {
        /// Snapshot file
        input: String,
    },

    /// Clear ALL data permanently
    Clear {
        /// Must be exactly "DELETE EVERYTHING"
        confirm: String,
    },
}

#[derive(Subcommand)]
pub enum DocCommands {
    /// Attach a document to an expense
    Add {
        /// Expense id
        id: u64,

        /// Document filename
        filename: String,

        /// Stored reference (URL or path in the attachment store)
        #[arg(short, long)]
        stored_ref: Option<String>,
    },

    /// Remove a document from an expense
    Remove {
        /// Expense id
        id: u64,

        /// Document filename
        filename: String,
    },

    /// List all uploaded documents, newest first
    List {
        /// Maximum number of documents to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
}

/// Shared filter flags for the reporting commands.
#[derive(Debug, clap::Args)]
pub struct FilterArgs {
    /// Filter by city
    #[arg(long)]
    pub city: Option<String>,

    /// Filter from date (YYYY-MM-DD, inclusive)
    #[arg(long)]
    pub from: Option<String>,

    /// Filter to date (YYYY-MM-DD, inclusive)
    #[arg(long)]
    pub to: Option<String>,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let service = LedgerService::open(&self.data)?;

        match self.command {
            Commands::Add {
                amount,
                currency,
                activity,
                category,
                city,
                payer,
                date,
                notes,
            } => {
                let fields = NewExpense {
                    amount: parse_required_amount(&amount)?,
                    currency: parse_currency(&currency)?,
                    activity,
                    category: parse_category(&category)?,
                    city: parse_city(&city)?,
                    payer: parse_payer(&payer)?,
                    date: date.as_deref().map(parse_date).transpose()?,
                    notes,
                };
                let record = service.add(fields).await?;
                println!(
                    "Added expense #{}: {} - {} ({})",
                    record.id,
                    format_money(record.amount, record.currency),
                    record.activity,
                    record.category
                );
                println!(
                    "  = {} | Sunil {} | Shirin {}",
                    format_money(record.amount_base, Currency::Rmb),
                    format_money(record.amount_gbp, Currency::Gbp),
                    format_money(record.amount_aed, Currency::Aed),
                );
            }

            Commands::List {
                city,
                category,
                payer,
                from,
                to,
                limit,
                offset,
            } => {
                let filter = ExpenseFilter {
                    city: city.as_deref().map(parse_city).transpose()?,
                    category: category.as_deref().map(parse_category).transpose()?,
                    payer: payer.as_deref().map(parse_payer).transpose()?,
                    from_date: from.as_deref().map(parse_date).transpose()?,
                    to_date: to.as_deref().map(parse_date).transpose()?,
                    limit,
                    offset,
                };
                let expenses = service.list(&filter);
                if expenses.is_empty() {
                    println!("No expenses found.");
                } else {
                    for expense in &expenses {
                        print_expense_line(expense);
                    }
                    println!("{} expense(s)", expenses.len());
                }
            }

            Commands::Show { id } => {
                let expense = service.get(id)?;
                print_expense_full(&expense);
            }

            Commands::Edit {
                id,
                amount,
                currency,
                activity,
                category,
                city,
                payer,
                date,
                notes,
            } => {
                let update = ExpenseUpdate {
                    amount: amount.as_deref().map(parse_required_amount).transpose()?,
                    currency: currency.as_deref().map(parse_currency).transpose()?,
                    activity,
                    category: category.as_deref().map(parse_category).transpose()?,
                    city: city.as_deref().map(parse_city).transpose()?,
                    payer: payer.as_deref().map(parse_payer).transpose()?,
                    date: date.as_deref().map(parse_date).transpose()?,
                    notes,
                };
                let record = service.edit(id, update).await?;
                println!("Updated expense #{}:", record.id);
                print_expense_full(&record);
            }

            Commands::Delete { id } => {
                service.delete(id)?;
                println!("Deleted expense #{id}");
            }

            Commands::Summary { filter } => {
                let filter = filter.into_filter()?;
                let records = service.snapshot_records();
                match reporting::summarize(&records, &filter) {
                    None => println!("No expenses found."),
                    Some(summary) => {
                        println!("Travel Expense Summary");
                        println!(
                            "  {} transaction(s), total {}",
                            summary.record_count,
                            format_money(summary.total_base, Currency::Rmb)
                        );
                        print_person_totals(&summary.persons);
                        if !summary.by_city.is_empty() {
                            println!("  By city:");
                            for (city, total) in &summary.by_city {
                                println!("    {city}: {}", format_money(*total, Currency::Rmb));
                            }
                        }
                    }
                }
            }

            Commands::Categories { filter } => {
                let filter = filter.into_filter()?;
                let records = service.snapshot_records();
                match reporting::category_breakdown(&records, &filter) {
                    None => println!("No expenses found."),
                    Some(breakdown) => {
                        println!("Category Breakdown");
                        for bucket in &breakdown {
                            println!(
                                "  {} ({} transaction(s)): {}",
                                bucket.category,
                                bucket.count,
                                format_money(bucket.total_base, Currency::Rmb)
                            );
                            print_person_totals(&bucket.persons);
                        }
                    }
                }
            }

            Commands::Spending {
                currency,
                group_by,
                filter,
            } => {
                let currency = parse_currency(&currency)?;
                let group_by = GroupBy::from_str(&group_by).ok_or_else(|| {
                    AppError::validation("group_by", "use 'person' or 'category'")
                })?;
                let filter = filter.into_filter()?;
                let records = service.snapshot_records();
                let rates = service.rate_provider().get_rates().await;
                match reporting::spending_summary(&records, &filter, currency, group_by, &rates) {
                    None => println!("No expenses found."),
                    Some(summary) => {
                        println!("Spending Summary in {}", summary.currency);
                        for (label, total) in &summary.groups {
                            println!("  {label}: {}", format_money(*total, summary.currency));
                        }
                        println!("  Total: {}", format_money(summary.total, summary.currency));
                    }
                }
            }

            Commands::Itinerary { filter } => {
                let filter = filter.into_filter()?;
                let records = service.snapshot_records();
                match reporting::itinerary(&records, &filter) {
                    None => println!("No expenses found."),
                    Some(days) => {
                        println!("Trip Itinerary");
                        for day in &days {
                            println!(
                                "{} ({} expense(s), {}):",
                                day.date,
                                day.expenses.len(),
                                format_money(day.total_base, Currency::Rmb)
                            );
                            for expense in &day.expenses {
                                print_expense_line(expense);
                            }
                        }
                    }
                }
            }

            Commands::Activity { view, filter } => {
                let view = ActivityView::from_str(&view).ok_or_else(|| {
                    AppError::validation(
                        "view",
                        "use 'overview', 'by-date', 'by-category' or 'by-city'",
                    )
                })?;
                let filter = filter.into_filter()?;
                let records = service.snapshot_records();
                match reporting::activity_stats(&records, &filter, view) {
                    None => println!("No activities found."),
                    Some(stats) => print_activity_stats(&stats),
                }
            }

            Commands::Rates { refresh } => {
                let provider = service.rate_provider();
                if refresh {
                    // Failure degrades to the cached set, reported below
                    let _ = provider.refresh().await;
                }
                let rates = provider.get_rates().await;
                println!("Exchange rates (base: RMB)");
                for currency in Currency::ALL {
                    if !currency.is_base() {
                        println!("  1 RMB = {} {}", rates.rate(currency), currency);
                    }
                }
                if rates.fetched() {
                    println!("  Last refreshed: {}", rates.last_refreshed.to_rfc3339());
                } else {
                    println!("  Using built-in fallback rates (no successful fetch yet)");
                }
            }

            Commands::Doc(doc_cmd) => run_doc_command(&service, doc_cmd)?,

            Commands::Stats => {
                let stats = service.stats();
                println!("Ledger Statistics");
                println!("  Expenses: {}", stats.expense_count);
                println!("  Documents: {}", stats.document_count);
                println!(
                    "  Total spent: {}",
                    format_money(stats.total_base, Currency::Rmb)
                );
                if let Some((earliest, latest)) = stats.date_range {
                    println!("  Date range: {earliest} to {latest}");
                }
                println!("  Next id: {}", stats.next_id);
                println!("  Created: {}", stats.created_at.to_rfc3339());
                println!("  Last updated: {}", stats.last_updated.to_rfc3339());
            }

            Commands::Export { output, format } => {
                let exporter = Exporter::new(&service);
                match format.as_str() {
                    "csv" => match output {
                        Some(path) => {
                            let file = File::create(&path)
                                .with_context(|| format!("Failed to create {path}"))?;
                            let count = exporter.export_expenses_csv(file)?;
                            println!("Exported {count} expense(s) to {path}");
                        }
                        None => {
                            exporter.export_expenses_csv(std::io::stdout())?;
                        }
                    },
                    "json" => match output {
                        Some(path) => {
                            let file = File::create(&path)
                                .with_context(|| format!("Failed to create {path}"))?;
                            let snapshot = exporter.export_full_json(file)?;
                            println!(
                                "Exported {} expense(s) to {path}",
                                snapshot.expenses.len()
                            );
                        }
                        None => {
                            exporter.export_full_json(std::io::stdout())?;
                        }
                    },
                    other => bail!("Unknown export format '{other}'. Use csv or json."),
                }
            }

            Commands::Import { input } => {
                let raw = std::fs::read_to_string(&input)
                    .with_context(|| format!("Failed to read {input}"))?;
                let snapshot: LedgerSnapshot =
                    serde_json::from_str(&raw).context("Failed to parse snapshot")?;
                let count = snapshot.expenses.len();
                service.import_snapshot(snapshot)?;
                println!("Imported {count} expense(s) from {input}");
            }

            Commands::Clear { confirm } => {
                if confirm != CLEAR_CONFIRMATION {
                    bail!("Refusing to clear: pass '{CLEAR_CONFIRMATION}' to confirm.");
                }
                service.clear_all()?;
                println!("Ledger cleared.");
            }
        }

        Ok(())
    }
}

impl FilterArgs {
    fn into_filter(self) -> Result<ExpenseFilter, AppError> {
        Ok(ExpenseFilter {
            city: self.city.as_deref().map(parse_city).transpose()?,
            from_date: self.from.as_deref().map(parse_date).transpose()?,
            to_date: self.to.as_deref().map(parse_date).transpose()?,
            ..Default::default()
        })
    }
}

fn run_doc_command(service: &LedgerService, command: DocCommands) -> Result<()> {
    match command {
        DocCommands::Add {
            id,
            filename,
            stored_ref,
        } => {
            let document = Document {
                stored_ref: stored_ref.unwrap_or_else(|| filename.clone()),
                filename: filename.clone(),
                uploaded_at: Utc::now(),
            };
            service.add_document(id, document)?;
            println!("Attached '{filename}' to expense #{id}");
        }

        DocCommands::Remove { id, filename } => {
            service.remove_document(id, &filename)?;
            println!("Removed '{filename}' from expense #{id}");
        }

        DocCommands::List { limit } => {
            let entries = service.list_documents(Some(limit));
            if entries.is_empty() {
                println!("No documents uploaded.");
            } else {
                for entry in &entries {
                    println!(
                        "  {} (expense #{} - {} on {})",
                        entry.document.filename, entry.expense_id, entry.activity, entry.date
                    );
                }
            }
        }
    }
    Ok(())
}

// ========================
// Parsing helpers
// ========================

fn parse_required_amount(input: &str) -> Result<Decimal, AppError> {
    parse_amount(input)
        .map_err(|_| AppError::validation("amount", format!("'{input}' is not a valid amount")))
}

fn parse_currency(input: &str) -> Result<Currency, AppError> {
    Currency::from_str(input).ok_or_else(|| AppError::UnsupportedCurrency(input.to_string()))
}

fn parse_category(input: &str) -> Result<Category, AppError> {
    Category::from_str(input).ok_or_else(|| {
        AppError::validation(
            "category",
            format!("'{input}' is not one of: {}", join_all(&Category::ALL)),
        )
    })
}

fn parse_city(input: &str) -> Result<City, AppError> {
    City::from_str(input).ok_or_else(|| {
        AppError::validation(
            "city",
            format!("'{input}' is not one of: {}", join_all(&City::ALL)),
        )
    })
}

fn parse_payer(input: &str) -> Result<Payer, AppError> {
    Payer::from_str(input).ok_or_else(|| {
        AppError::validation(
            "payer",
            format!("'{input}' is not one of: {}", join_all(&Payer::ALL)),
        )
    })
}

fn parse_date(input: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map_err(|_| AppError::validation("date", format!("'{input}' is not YYYY-MM-DD")))
}

fn join_all<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

// ========================
// Output helpers
// ========================

fn print_expense_line(expense: &ExpenseRecord) {
    println!(
        "  #{} {} [{}] {} - {} ({}, {})",
        expense.id,
        expense.date,
        expense.city,
        format_money(expense.amount_base, Currency::Rmb),
        expense.activity,
        expense.category,
        expense.payer,
    );
}

fn print_expense_full(expense: &ExpenseRecord) {
    println!("Expense #{}", expense.id);
    println!("  Date:     {}", expense.date);
    println!("  City:     {}", expense.city);
    println!("  Activity: {}", expense.activity);
    println!("  Category: {}", expense.category);
    println!("  Payer:    {}", expense.payer);
    println!(
        "  Amount:   {} = {} | {} | {}",
        format_money(expense.amount, expense.currency),
        format_money(expense.amount_base, Currency::Rmb),
        format_money(expense.amount_gbp, Currency::Gbp),
        format_money(expense.amount_aed, Currency::Aed),
    );
    if let Some(notes) = &expense.notes {
        println!("  Notes:    {notes}");
    }
    if !expense.documents.is_empty() {
        println!("  Documents:");
        for document in &expense.documents {
            println!(
                "    {} ({})",
                document.filename,
                document.uploaded_at.to_rfc3339()
            );
        }
    }
}

fn print_person_totals(persons: &PersonTotals) {
    println!(
        "  Sunil:  {} ({})",
        format_money(persons.sunil_base, Currency::Rmb),
        format_money(persons.sunil_gbp, Currency::Gbp)
    );
    println!(
        "  Shirin: {} ({})",
        format_money(persons.shirin_base, Currency::Rmb),
        format_money(persons.shirin_aed, Currency::Aed)
    );
}

fn print_activity_stats(stats: &ActivityStats) {
    match stats {
        ActivityStats::Overview {
            total_activities,
            unique_days,
            first_date,
            last_date,
            top_categories,
            top_cities,
        } => {
            println!("Activity Overview");
            println!("  Total activities: {total_activities}");
            println!("  {unique_days} day(s), {first_date} to {last_date}");
            println!("  Top categories:");
            for bucket in top_categories {
                println!("    {}: {} activities", bucket.label, bucket.count);
            }
            println!("  Top cities:");
            for bucket in top_cities {
                println!("    {}: {} activities", bucket.label, bucket.count);
            }
        }
        ActivityStats::Buckets(buckets) => {
            for bucket in buckets {
                println!(
                    "  {}: {} activities, {}",
                    bucket.label,
                    bucket.count,
                    format_money(bucket.total_base, Currency::Rmb)
                );
            }
        }
    }
}
