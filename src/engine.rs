use anyhow::Result;
use serde::Serialize;

use crate::config::TaxTables;
use crate::model::{PolicyParameters, PropertyRecord, RecalcSummary, RecordImpact, TierImpact};
use crate::roll::normalize::normalize_exemption;

#[derive(Debug, Clone, Serialize)]
pub struct RecalcOutput {
    pub impacts: Vec<RecordImpact>,
    pub summary: RecalcSummary,
    pub tiers: Vec<TierImpact>,
}

/// Recomputes the roll under a new policy. Pure and idempotent: published
/// record fields are never touched, and re-running with the same
/// parameters yields identical output.
///
/// Invalid policy parameters fail here, before any record is processed.
/// Record-level problems never fail; they degrade to zero and are counted
/// in the summary.
pub fn recalculate(
    records: &[PropertyRecord],
    policy: &PolicyParameters,
    tables: &TaxTables,
) -> Result<RecalcOutput> {
    policy.validate()?;

    let mut impacts = Vec::with_capacity(records.len());
    let mut degraded_record_count = 0;
    for record in records {
        let (impact, degraded) = recompute_record(record, policy, tables);
        if degraded {
            degraded_record_count += 1;
        }
        impacts.push(impact);
    }

    let mut baseline_total = 0.0;
    let mut baseline_record_count = 0;
    for record in records {
        if normalize_exemption(&record.exemption) == tables.no_exemption_sentinel {
            baseline_total += record.tax_due;
            baseline_record_count += 1;
        }
    }

    // The published baseline counts only non-exempt rows; the projected
    // total spans every row, exempt ones included.
    let new_total: f64 = impacts.iter().map(|impact| impact.new_tax).sum();

    let summary = RecalcSummary {
        baseline_total,
        new_total,
        delta: new_total - baseline_total,
        record_count: records.len(),
        baseline_record_count,
        degraded_record_count,
    };

    Ok(RecalcOutput {
        impacts,
        summary,
        tiers: tier_comparison(policy, tables),
    })
}

/// Tax at the configured illustrative assessed-value tiers, under the
/// published default parameters versus the supplied policy. The monthly
/// delta is the per-household impact the comparison exists to surface.
pub fn tier_comparison(policy: &PolicyParameters, tables: &TaxTables) -> Vec<TierImpact> {
    let defaults = &tables.default_policy;

    tables
        .tiers
        .iter()
        .map(|tier| {
            let tax_under_default = compute_tax(
                tier.assessed_value,
                tables.default_tax_level_pct,
                defaults.flat_deduction,
                defaults.residential_rate_per_mille,
                tables,
            )
            .new_tax;
            let tax_under_policy = compute_tax(
                tier.assessed_value,
                tables.default_tax_level_pct,
                policy.flat_deduction,
                policy.residential_rate_per_mille,
                tables,
            )
            .new_tax;

            TierImpact {
                label: tier.label.clone(),
                assessed_value: tier.assessed_value,
                tax_under_default,
                tax_under_policy,
                monthly_delta: (tax_under_policy - tax_under_default) / 12.0,
            }
        })
        .collect()
}

enum RateClass {
    Residential,
    Commercial,
}

/// Classification is an exact match against the current published rates;
/// records at any other rate keep their rate under the new policy.
fn classify_rate(rate_per_mille: f64, tables: &TaxTables) -> Option<RateClass> {
    if rate_per_mille == tables.residential_rate_per_mille {
        Some(RateClass::Residential)
    } else if rate_per_mille == tables.commercial_rate_per_mille {
        Some(RateClass::Commercial)
    } else {
        None
    }
}

fn recompute_record(
    record: &PropertyRecord,
    policy: &PolicyParameters,
    tables: &TaxTables,
) -> (RecordImpact, bool) {
    let new_rate_per_mille = match classify_rate(record.rate_per_mille, tables) {
        Some(RateClass::Residential) => policy.residential_rate_per_mille,
        Some(RateClass::Commercial) => policy.commercial_rate_per_mille,
        None => record.rate_per_mille,
    };

    // Only records at the standard deduction follow the deduction knob;
    // custom or reduced deductions stay as published.
    let new_deduction = if record.deduction == tables.standard_deduction {
        policy.flat_deduction
    } else {
        record.deduction
    };

    let computed = compute_tax(
        record.assessed_value,
        record.tax_level_pct,
        new_deduction,
        new_rate_per_mille,
        tables,
    );

    (
        RecordImpact {
            new_rate_per_mille,
            new_deduction,
            new_tax_base: computed.new_tax_base,
            new_tax: computed.new_tax,
        },
        computed.degraded,
    )
}

struct TaxComputation {
    new_tax_base: f64,
    new_tax: f64,
    degraded: bool,
}

fn compute_tax(
    assessed_value: f64,
    tax_level_pct: f64,
    deduction: f64,
    rate_per_mille: f64,
    tables: &TaxTables,
) -> TaxComputation {
    let new_tax_base = (assessed_value * tax_level_pct / 100.0 - deduction).max(0.0);
    if !new_tax_base.is_finite() {
        return TaxComputation {
            new_tax_base: 0.0,
            new_tax: 0.0,
            degraded: true,
        };
    }

    let tax = new_tax_base * rate_per_mille / 1000.0;
    let tax = if tax < tables.minimum_tax { 0.0 } else { tax };
    if !tax.is_finite() {
        return TaxComputation {
            new_tax_base,
            new_tax: 0.0,
            degraded: true,
        };
    }

    TaxComputation {
        new_tax_base,
        new_tax: tax.round(),
        degraded: false,
    }
}
