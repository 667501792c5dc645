use anyhow::Result;
use tracing::warn;

use crate::config::TaxTables;
use crate::model::{PropertyRecord, RollCounts};

pub mod extract;
pub mod normalize;
pub mod table;
pub mod tokenize;

#[cfg(test)]
mod tests;

use extract::{Extraction, FieldExtractor, IssueCategory, RawFields};
use normalize::{Normalized, normalize_amount, normalize_exemption, normalize_rate};
use tokenize::LineTokenizer;

/// One failed-extraction line, kept for the operator-facing issues file.
/// The record itself is still emitted with empty values.
#[derive(Debug, Clone)]
pub struct ParseIssue {
    pub category: IssueCategory,
    pub line: String,
}

#[derive(Debug)]
pub struct RollParse {
    pub records: Vec<PropertyRecord>,
    pub issues: Vec<ParseIssue>,
    pub counts: RollCounts,
}

/// The full ingestion pipeline: tokenizer, extractor and normalizer applied
/// per line. Lines without a parcel identifier are not property lines and
/// are skipped without being counted as failures.
pub struct RollPipeline {
    tokenizer: LineTokenizer,
    extractor: FieldExtractor,
}

impl RollPipeline {
    pub fn new(tables: &TaxTables) -> Result<Self> {
        Ok(Self {
            tokenizer: LineTokenizer::new()?,
            extractor: FieldExtractor::new(tables)?,
        })
    }

    pub fn parse_roll<'a, I>(&self, lines: I) -> RollParse
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut records = Vec::new();
        let mut issues = Vec::new();
        let mut counts = RollCounts::default();

        for line in lines {
            counts.lines_seen += 1;

            let Some(tokenized) = self.tokenizer.split(line) else {
                counts.lines_without_parcel_id += 1;
                continue;
            };

            let fields = match self.extractor.extract(&tokenized.rest) {
                Extraction::Complete(fields) => {
                    counts.complete_records += 1;
                    fields
                }
                Extraction::Partial { fields, category } => {
                    counts.partial_records += 1;
                    match category {
                        IssueCategory::NoTaxLevel => counts.no_tax_level_count += 1,
                        IssueCategory::NoRateAfterDeduction => {
                            counts.no_rate_after_deduction_count += 1;
                        }
                        IssueCategory::TooFewAmounts => counts.too_few_amounts_count += 1,
                    }

                    warn!(
                        category = category.as_str(),
                        line = %line,
                        "line failed field extraction"
                    );
                    issues.push(ParseIssue {
                        category,
                        line: line.to_string(),
                    });
                    fields
                }
            };

            records.push(build_record(
                tokenized.address,
                tokenized.parcel_id,
                fields,
                &mut counts,
            ));
            counts.records_emitted += 1;
        }

        RollParse {
            records,
            issues,
            counts,
        }
    }
}

fn build_record(
    address: String,
    parcel_id: String,
    fields: RawFields,
    counts: &mut RollCounts,
) -> PropertyRecord {
    PropertyRecord {
        address,
        parcel_id,
        assessed_value: coerced(normalize_amount(&fields.assessed_value), counts),
        tax_level_pct: coerced(normalize_amount(&fields.tax_level_pct), counts),
        deduction: coerced(normalize_amount(&fields.deduction), counts),
        tax_base: coerced(normalize_amount(&fields.tax_base), counts),
        rate_per_mille: coerced(normalize_rate(&fields.rate_per_mille), counts),
        tax_due: coerced(normalize_amount(&fields.tax_due), counts),
        exemption: normalize_exemption(&fields.exemption),
    }
}

fn coerced(normalized: Normalized, counts: &mut RollCounts) -> f64 {
    if normalized.defaulted {
        counts.coerced_field_count += 1;
    }
    normalized.value
}
