use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::model::PolicyParameters;

/// An illustrative assessed-value tier for per-household comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierSpec {
    pub label: String,
    pub assessed_value: f64,
}

/// Jurisdiction-specific constant tables. The defaults carry the published
/// values for the 2025 roll; another jurisdiction or year supplies its own
/// JSON instead of a code change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxTables {
    /// Standard flat-deduction amounts, as digit strings, in match priority
    /// order. The extractor matches these against column-justified text
    /// before falling back to positional parsing.
    pub known_deductions: Vec<String>,
    /// Current residential rate; records at exactly this rate reclassify to
    /// the policy's residential rate.
    pub residential_rate_per_mille: f64,
    /// Current commercial rate; same, for the commercial knob.
    pub commercial_rate_per_mille: f64,
    /// Only records at this deduction follow the policy's deduction knob;
    /// custom or reduced deductions stay untouched.
    pub standard_deduction: f64,
    /// Computed tax below this amount is waived to zero.
    pub minimum_tax: f64,
    /// Tax level used for tier comparisons.
    pub default_tax_level_pct: f64,
    /// Exemption-column value marking a non-exempt record, after
    /// lowercasing and trimming.
    pub no_exemption_sentinel: String,
    pub tiers: Vec<TierSpec>,
    /// The published parameters the tier comparison uses as its baseline.
    pub default_policy: PolicyParameters,
}

impl Default for TaxTables {
    fn default() -> Self {
        let tier = |label: &str, assessed_value: f64| TierSpec {
            label: label.to_string(),
            assessed_value,
        };

        Self {
            known_deductions: ["0", "200000", "400000", "600000", "100000", "300000"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            residential_rate_per_mille: 1.9,
            commercial_rate_per_mille: 4.0,
            standard_deduction: 200_000.0,
            minimum_tax: 300.0,
            default_tax_level_pct: 70.0,
            no_exemption_sentinel: "nei".to_string(),
            tiers: vec![
                tier("low", 2_000_000.0),
                tier("median", 3_500_000.0),
                tier("high", 5_000_000.0),
                tier("very_high", 8_000_000.0),
            ],
            default_policy: PolicyParameters {
                residential_rate_per_mille: 1.9,
                commercial_rate_per_mille: 4.0,
                flat_deduction: 200_000.0,
            },
        }
    }
}

impl TaxTables {
    pub fn validate(&self) -> Result<()> {
        if self.known_deductions.is_empty() {
            bail!("tax tables list no known deduction values");
        }
        for value in &self.known_deductions {
            if value.is_empty() || !value.chars().all(|c| c.is_ascii_digit()) {
                bail!("known deduction is not a digit string: {value:?}");
            }
        }
        if self.no_exemption_sentinel.trim().is_empty() {
            bail!("no-exemption sentinel is empty");
        }
        self.default_policy.validate()?;
        Ok(())
    }
}

/// Loads tables from a JSON file, or the built-in defaults when no path is
/// given.
pub fn load_tables(path: Option<&Path>) -> Result<TaxTables> {
    let tables = match path {
        Some(path) => {
            let raw = fs::read(path)
                .with_context(|| format!("failed to read tax tables: {}", path.display()))?;
            serde_json::from_slice(&raw)
                .with_context(|| format!("failed to parse tax tables: {}", path.display()))?
        }
        None => TaxTables::default(),
    };

    tables.validate()?;
    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tables_pass_validation() {
        assert!(TaxTables::default().validate().is_ok());
    }

    #[test]
    fn non_digit_deduction_value_is_rejected() {
        let mut tables = TaxTables::default();
        tables.known_deductions.push("200 000".to_string());

        assert!(tables.validate().is_err());
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let tables: TaxTables = serde_json::from_str(r#"{"minimum_tax": 500}"#).expect("parses");

        assert_eq!(tables.minimum_tax, 500.0);
        assert_eq!(tables.standard_deduction, 200_000.0);
        assert_eq!(tables.tiers.len(), 4);
    }
}
