use std::fs::File;
use std::io;
use std::path::Path;

use anyhow::{Context, Result, ensure};

use crate::model::PropertyRecord;
use crate::roll::normalize::normalize_amount;

/// Fixed interchange header. External consumers round-trip clean rows
/// through this shape losslessly.
pub const COLUMNS: [&str; 9] = [
    "address",
    "parcel_id",
    "assessed_value",
    "tax_level_pct",
    "deduction",
    "tax_base",
    "rate_per_mille",
    "tax_due",
    "exemption",
];

pub fn record_fields(record: &PropertyRecord) -> [String; 9] {
    [
        record.address.clone(),
        record.parcel_id.clone(),
        format_number(record.assessed_value),
        format_number(record.tax_level_pct),
        format_number(record.deduction),
        format_number(record.tax_base),
        format_number(record.rate_per_mille),
        format_number(record.tax_due),
        record.exemption.clone(),
    ]
}

/// Whole-unit amounts print without a decimal part, fractional values (the
/// rate column) with their minimal representation.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

pub fn write_records_to<W: io::Write>(writer: W, records: &[PropertyRecord]) -> Result<()> {
    let mut csv = csv::WriterBuilder::new().from_writer(writer);

    csv.write_record(COLUMNS)
        .context("failed to write table header")?;
    for record in records {
        csv.write_record(record_fields(record))
            .context("failed to write table row")?;
    }
    csv.flush().context("failed to flush table")?;

    Ok(())
}

pub fn write_records(path: &Path, records: &[PropertyRecord]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create table file: {}", path.display()))?;
    write_records_to(file, records)
        .with_context(|| format!("failed to write table: {}", path.display()))
}

pub fn read_records_from<R: io::Read>(reader: R) -> Result<Vec<PropertyRecord>> {
    let mut csv = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);

    let header = csv.headers().context("failed to read table header")?;
    ensure!(
        header.len() == COLUMNS.len(),
        "table header has {} columns, expected {}",
        header.len(),
        COLUMNS.len()
    );

    let mut records = Vec::new();
    for row in csv.records() {
        let row = row.context("failed to read table row")?;
        ensure!(
            row.len() == COLUMNS.len(),
            "table row has {} columns, expected {}",
            row.len(),
            COLUMNS.len()
        );

        let field = |index: usize| row.get(index).unwrap_or_default();
        let amount = |index: usize| normalize_amount(field(index)).value;

        records.push(PropertyRecord {
            address: field(0).to_string(),
            parcel_id: field(1).to_string(),
            assessed_value: amount(2),
            tax_level_pct: amount(3),
            deduction: amount(4),
            tax_base: amount(5),
            rate_per_mille: amount(6),
            tax_due: amount(7),
            exemption: field(8).to_string(),
        });
    }

    Ok(records)
}

pub fn read_records(path: &Path) -> Result<Vec<PropertyRecord>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open table file: {}", path.display()))?;
    read_records_from(file).with_context(|| format!("failed to read table: {}", path.display()))
}
