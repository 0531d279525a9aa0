use std::io::Write;

use anyhow::Result;

use crate::application::{LedgerService, LedgerSnapshot};

/// Exporter for converting ledger data to backup formats.
pub struct Exporter<'a> {
    service: &'a LedgerService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a LedgerService) -> Self {
        Self { service }
    }

    /// Export all expenses to CSV, one row per record.
    pub fn export_expenses_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let expenses = self.service.snapshot_records();
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "id",
            "date",
            "city",
            "activity",
            "category",
            "payer",
            "amount",
            "currency",
            "amount_rmb",
            "amount_gbp",
            "amount_aed",
            "notes",
            "documents",
        ])?;

        let mut count = 0;
        for expense in &expenses {
            csv_writer.write_record([
                expense.id.to_string(),
                expense.date.to_string(),
                expense.city.to_string(),
                expense.activity.clone(),
                expense.category.to_string(),
                expense.payer.to_string(),
                expense.amount.to_string(),
                expense.currency.to_string(),
                expense.amount_base.to_string(),
                expense.amount_gbp.to_string(),
                expense.amount_aed.to_string(),
                expense.notes.clone().unwrap_or_default(),
                expense
                    .documents
                    .iter()
                    .map(|d| d.filename.as_str())
                    .collect::<Vec<_>>()
                    .join(";"),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export the full ledger as a pretty JSON snapshot.
    pub fn export_full_json<W: Write>(&self, mut writer: W) -> Result<LedgerSnapshot> {
        let snapshot = self.service.export_snapshot();
        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;
        Ok(snapshot)
    }
}
