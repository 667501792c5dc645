use std::fs::File;
use std::io;

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use crate::cli::CheckArgs;
use crate::roll::table::COLUMNS;

const NUMERIC_COLUMNS: [usize; 6] = [2, 3, 4, 5, 6, 7];

#[derive(Debug, Default)]
struct CheckReport {
    total_rows: usize,
    header_mismatch: bool,
    bad_structure: Vec<(usize, usize)>,
    bad_values: Vec<(usize, &'static str, String)>,
}

/// Validates an existing roll table: every row must carry the fixed column
/// count, and the numeric columns must parse where non-empty. Reports the
/// first offenders and fails on structural errors.
pub fn run(args: CheckArgs) -> Result<()> {
    let file = File::open(&args.input)
        .with_context(|| format!("failed to open table file: {}", args.input.display()))?;

    let report = evaluate(file)?;

    info!(
        total_rows = report.total_rows,
        structural_errors = report.bad_structure.len(),
        invalid_numbers = report.bad_values.len(),
        "check complete"
    );

    if report.header_mismatch {
        warn!("header does not match the expected column names");
    }
    for &(row, columns) in report.bad_structure.iter().take(args.max_reported) {
        warn!(row, columns, "row has wrong column count");
    }
    for (row, column, value) in report.bad_values.iter().take(args.max_reported) {
        warn!(row, column, value = %value, "column is not numeric");
    }

    if !report.bad_structure.is_empty() {
        bail!(
            "{} of {} rows have structural errors",
            report.bad_structure.len(),
            report.total_rows
        );
    }

    Ok(())
}

fn evaluate<R: io::Read>(reader: R) -> Result<CheckReport> {
    let mut csv = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut report = CheckReport::default();

    for (index, row) in csv.records().enumerate() {
        let row = row.with_context(|| format!("failed to read row {}", index + 1))?;
        let row_number = index + 1;
        report.total_rows += 1;

        if row.len() != COLUMNS.len() {
            report.bad_structure.push((row_number, row.len()));
            continue;
        }

        if index == 0 {
            report.header_mismatch = row
                .iter()
                .zip(COLUMNS)
                .any(|(found, expected)| found != expected);
            continue;
        }

        for column in NUMERIC_COLUMNS {
            let value = row.get(column).unwrap_or_default().trim();
            if value.is_empty() {
                continue;
            }
            if value.parse::<f64>().is_err() {
                report
                    .bad_values
                    .push((row_number, COLUMNS[column], value.to_string()));
            }
        }
    }

    Ok(report)
}
