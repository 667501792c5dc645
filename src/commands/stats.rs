use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::StatsArgs;
use crate::model::PropertyRecord;
use crate::roll::table;

const STAT_COLUMNS: [&str; 5] = [
    "assessed_value",
    "deduction",
    "tax_base",
    "rate_per_mille",
    "tax_due",
];

#[derive(Debug, Clone, Serialize)]
pub struct ColumnSummary {
    pub column: String,
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsReport {
    pub rows_total: usize,
    pub rows_after_filter: usize,
    pub columns: Vec<ColumnSummary>,
    pub correlation_columns: Vec<String>,
    pub correlation: Vec<Vec<f64>>,
}

pub fn run(args: StatsArgs) -> Result<()> {
    let records = table::read_records(&args.input)?;
    let rows_total = records.len();

    let filtered: Vec<&PropertyRecord> = records
        .iter()
        .filter(|record| {
            args.min_assessed.is_none_or(|min| record.assessed_value >= min)
                && args.max_assessed.is_none_or(|max| record.assessed_value <= max)
        })
        .collect();

    info!(
        rows_total,
        rows_after_filter = filtered.len(),
        "computing roll statistics"
    );

    let report = build_report(rows_total, &filtered);

    if args.json {
        let rendered =
            serde_json::to_string_pretty(&report).context("failed to serialize stats report")?;
        println!("{rendered}");
        return Ok(());
    }

    for summary in &report.columns {
        info!(
            column = %summary.column,
            count = summary.count,
            mean = summary.mean,
            std_dev = summary.std_dev,
            min = summary.min,
            q1 = summary.q1,
            median = summary.median,
            q3 = summary.q3,
            max = summary.max,
            "column summary"
        );
    }

    for (row_index, row) in report.correlation.iter().enumerate() {
        for (col_index, value) in row.iter().enumerate() {
            if col_index < row_index {
                info!(
                    left = %report.correlation_columns[row_index],
                    right = %report.correlation_columns[col_index],
                    correlation = value,
                    "column correlation"
                );
            }
        }
    }

    Ok(())
}

fn build_report(rows_total: usize, records: &[&PropertyRecord]) -> StatsReport {
    let series: Vec<Vec<f64>> = STAT_COLUMNS
        .iter()
        .map(|column| {
            records
                .iter()
                .map(|record| column_value(record, column))
                .collect()
        })
        .collect();

    let columns = STAT_COLUMNS
        .iter()
        .zip(&series)
        .map(|(column, values)| summarize(column, values))
        .collect();

    let correlation = series
        .iter()
        .map(|left| series.iter().map(|right| pearson(left, right)).collect())
        .collect();

    StatsReport {
        rows_total,
        rows_after_filter: records.len(),
        columns,
        correlation_columns: STAT_COLUMNS.iter().map(|c| c.to_string()).collect(),
        correlation,
    }
}

fn column_value(record: &PropertyRecord, column: &str) -> f64 {
    match column {
        "assessed_value" => record.assessed_value,
        "deduction" => record.deduction,
        "tax_base" => record.tax_base,
        "rate_per_mille" => record.rate_per_mille,
        _ => record.tax_due,
    }
}

fn summarize(column: &str, values: &[f64]) -> ColumnSummary {
    let count = values.len();
    if count == 0 {
        return ColumnSummary {
            column: column.to_string(),
            count: 0,
            mean: 0.0,
            std_dev: 0.0,
            min: 0.0,
            q1: 0.0,
            median: 0.0,
            q3: 0.0,
            max: 0.0,
        };
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mean = values.iter().sum::<f64>() / count as f64;
    let std_dev = if count < 2 {
        0.0
    } else {
        let squared: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
        (squared / (count - 1) as f64).sqrt()
    };

    ColumnSummary {
        column: column.to_string(),
        count,
        mean,
        std_dev,
        min: sorted[0],
        q1: quantile(&sorted, 0.25),
        median: quantile(&sorted, 0.5),
        q3: quantile(&sorted, 0.75),
        max: sorted[count - 1],
    }
}

/// Quantile with linear interpolation over a sorted slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }

    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = position - lower as f64;

    sorted[lower] * (1.0 - weight) + sorted[upper] * weight
}

/// Pearson correlation; degenerate series (fewer than two points, zero
/// variance) report zero rather than poisoning the matrix.
fn pearson(left: &[f64], right: &[f64]) -> f64 {
    let count = left.len().min(right.len());
    if count < 2 {
        return 0.0;
    }

    let mean_left = left[..count].iter().sum::<f64>() / count as f64;
    let mean_right = right[..count].iter().sum::<f64>() / count as f64;

    let mut covariance = 0.0;
    let mut variance_left = 0.0;
    let mut variance_right = 0.0;
    for index in 0..count {
        let dl = left[index] - mean_left;
        let dr = right[index] - mean_right;
        covariance += dl * dr;
        variance_left += dl * dl;
        variance_right += dr * dr;
    }

    if variance_left == 0.0 || variance_right == 0.0 {
        return 0.0;
    }

    covariance / (variance_left.sqrt() * variance_right.sqrt())
}
