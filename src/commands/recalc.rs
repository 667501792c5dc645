use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::RecalcArgs;
use crate::config::load_tables;
use crate::engine;
use crate::model::{PolicyParameters, PropertyRecord, RecordImpact};
use crate::roll::table;

pub fn run(args: RecalcArgs) -> Result<()> {
    let tables = load_tables(args.tables.as_deref())?;
    let records = table::read_records(&args.input)?;

    // Flags override the published defaults knob by knob, so a single
    // slider movement maps to a single option.
    let defaults = tables.default_policy;
    let policy = PolicyParameters {
        residential_rate_per_mille: args
            .residential_rate
            .unwrap_or(defaults.residential_rate_per_mille),
        commercial_rate_per_mille: args
            .commercial_rate
            .unwrap_or(defaults.commercial_rate_per_mille),
        flat_deduction: args.deduction.unwrap_or(defaults.flat_deduction),
    };

    info!(
        records = records.len(),
        residential_rate = policy.residential_rate_per_mille,
        commercial_rate = policy.commercial_rate_per_mille,
        deduction = policy.flat_deduction,
        "recalculating roll"
    );

    let output = engine::recalculate(&records, &policy, &tables)?;

    info!(
        baseline_total = output.summary.baseline_total,
        new_total = output.summary.new_total,
        delta = output.summary.delta,
        baseline_records = output.summary.baseline_record_count,
        degraded_records = output.summary.degraded_record_count,
        "recalculation complete"
    );

    for tier in &output.tiers {
        info!(
            tier = %tier.label,
            assessed_value = tier.assessed_value,
            tax_under_default = tier.tax_under_default,
            tax_under_policy = tier.tax_under_policy,
            monthly_delta = tier.monthly_delta,
            "tier comparison"
        );
    }

    if let Some(path) = &args.augmented_output {
        write_augmented(path, &records, &output.impacts)?;
        info!(path = %path.display(), "wrote augmented table");
    }

    if args.json {
        let rendered = serde_json::to_string_pretty(&output)
            .context("failed to serialize recalculation output")?;
        println!("{rendered}");
    }

    Ok(())
}

/// The original nine columns followed by the four derived ones; published
/// fields pass through untouched.
fn write_augmented(
    path: &Path,
    records: &[PropertyRecord],
    impacts: &[RecordImpact],
) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create augmented table: {}", path.display()))?;
    let mut csv = csv::WriterBuilder::new().from_writer(file);

    let mut header = table::COLUMNS.to_vec();
    header.extend(["new_rate_per_mille", "new_deduction", "new_tax_base", "new_tax"]);
    csv.write_record(&header)
        .context("failed to write augmented header")?;

    for (record, impact) in records.iter().zip(impacts) {
        let mut row = table::record_fields(record).to_vec();
        row.push(table::format_number(impact.new_rate_per_mille));
        row.push(table::format_number(impact.new_deduction));
        row.push(table::format_number(impact.new_tax_base));
        row.push(table::format_number(impact.new_tax));

        csv.write_record(&row)
            .context("failed to write augmented row")?;
    }

    csv.flush()
        .with_context(|| format!("failed to flush augmented table: {}", path.display()))?;

    Ok(())
}
