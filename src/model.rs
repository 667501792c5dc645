use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

/// One normalized row of the tax roll, in published column order.
///
/// Rows that failed field extraction keep their address and parcel id and
/// carry empty/zero values; they are never dropped, so totals over the full
/// roll stay auditable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub address: String,
    pub parcel_id: String,
    pub assessed_value: f64,
    pub tax_level_pct: f64,
    pub deduction: f64,
    pub tax_base: f64,
    pub rate_per_mille: f64,
    pub tax_due: f64,
    pub exemption: String,
}

/// The three knobs a recalculation run varies. Step sizes and slider ranges
/// are the caller's concern; the engine only requires finite, non-negative
/// values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolicyParameters {
    pub residential_rate_per_mille: f64,
    pub commercial_rate_per_mille: f64,
    pub flat_deduction: f64,
}

impl PolicyParameters {
    pub fn validate(&self) -> Result<()> {
        let knobs = [
            ("residential_rate_per_mille", self.residential_rate_per_mille),
            ("commercial_rate_per_mille", self.commercial_rate_per_mille),
            ("flat_deduction", self.flat_deduction),
        ];

        for (name, value) in knobs {
            if !value.is_finite() {
                bail!("policy parameter {name} is not a finite number");
            }
            if value < 0.0 {
                bail!("policy parameter {name} is negative: {value}");
            }
        }

        Ok(())
    }
}

/// Derived per-record values under a new policy. Parallel to the input
/// record table; published fields are never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RecordImpact {
    pub new_rate_per_mille: f64,
    pub new_deduction: f64,
    pub new_tax_base: f64,
    pub new_tax: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RecalcSummary {
    pub baseline_total: f64,
    pub new_total: f64,
    pub delta: f64,
    pub record_count: usize,
    pub baseline_record_count: usize,
    pub degraded_record_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierImpact {
    pub label: String,
    pub assessed_value: f64,
    pub tax_under_default: f64,
    pub tax_under_policy: f64,
    pub monthly_delta: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RollCounts {
    pub lines_seen: usize,
    pub lines_without_parcel_id: usize,
    pub records_emitted: usize,
    pub complete_records: usize,
    pub partial_records: usize,
    pub no_tax_level_count: usize,
    pub no_rate_after_deduction_count: usize,
    pub too_few_amounts_count: usize,
    pub coerced_field_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestPaths {
    pub source_path: String,
    pub output_path: String,
    pub issues_path: String,
    pub manifest_path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub generated_at: String,
    pub source_sha256: String,
    pub paths: IngestPaths,
    pub counts: RollCounts,
    pub warnings: Vec<String>,
}
