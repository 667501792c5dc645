use anyhow::{Context, Result};
use regex::Regex;

use crate::config::TaxTables;

/// Why a property line could not be fully extracted. Tags appear in the
/// parse-issues file for operator triage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueCategory {
    NoTaxLevel,
    NoRateAfterDeduction,
    TooFewAmounts,
}

impl IssueCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoTaxLevel => "no_tax_level",
            Self::NoRateAfterDeduction => "no_rate_after_deduction",
            Self::TooFewAmounts => "too_few_amounts",
        }
    }
}

/// Field text exactly as it appears in the source line, before numeric
/// coercion. Missing fields are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFields {
    pub assessed_value: String,
    pub tax_level_pct: String,
    pub deduction: String,
    pub tax_base: String,
    pub rate_per_mille: String,
    pub tax_due: String,
    pub exemption: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Complete(RawFields),
    Partial {
        fields: RawFields,
        category: IssueCategory,
    },
}

/// The fields to the right of the tax-level token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct TailFields {
    deduction: String,
    tax_base: String,
    rate_per_mille: String,
    tax_due: String,
    exemption: String,
}

/// Result of one tail strategy. `NoMatch` hands the tail to the next
/// strategy in the chain; the other variants end the chain.
enum TailOutcome {
    NoMatch,
    Complete(TailFields),
    Partial(TailFields, IssueCategory),
}

struct DeductionPattern {
    value: String,
    bounded: Regex,
    unbounded: Regex,
}

/// Extracts the typed field region of a property line.
///
/// The tail after the tax-level token is parsed by an ordered strategy
/// chain: a known-deduction match first (the jurisdiction uses a handful of
/// standard amounts, which anchors the space-justified columns), then a
/// positional digit-run fallback.
pub struct FieldExtractor {
    tax_level_regex: Regex,
    rate_regex: Regex,
    amount_regex: Regex,
    deduction_patterns: Vec<DeductionPattern>,
}

impl FieldExtractor {
    pub fn new(tables: &TaxTables) -> Result<Self> {
        let tax_level_regex =
            Regex::new(r"\d+%").context("failed to compile tax level regex")?;
        let rate_regex = Regex::new(r"\d+[,\.]?\d*\s*‰")
            .context("failed to compile rate-per-mille regex")?;
        let amount_regex = Regex::new(r"\d[\d\s]+\d|\d+")
            .context("failed to compile amount regex")?;

        let mut deduction_patterns = Vec::with_capacity(tables.known_deductions.len());
        for value in &tables.known_deductions {
            // Column justification can push spaces between the digits of a
            // deduction, so each digit is matched with optional whitespace
            // after it.
            let spaced = value
                .chars()
                .map(|digit| digit.to_string())
                .collect::<Vec<String>>()
                .join(r"\s*");

            let bounded = Regex::new(&format!(r"\b{spaced}\b"))
                .with_context(|| format!("failed to compile deduction pattern for {value}"))?;
            let unbounded = Regex::new(&spaced)
                .with_context(|| format!("failed to compile deduction pattern for {value}"))?;

            deduction_patterns.push(DeductionPattern {
                value: value.clone(),
                bounded,
                unbounded,
            });
        }

        Ok(Self {
            tax_level_regex,
            rate_regex,
            amount_regex,
            deduction_patterns,
        })
    }

    /// Extracts raw fields from the text after the parcel identifier.
    pub fn extract(&self, rest: &str) -> Extraction {
        let Some(tax_level) = self.tax_level_regex.find(rest) else {
            return Extraction::Partial {
                fields: RawFields::default(),
                category: IssueCategory::NoTaxLevel,
            };
        };

        let assessed_value = self
            .amount_regex
            .find(&rest[..tax_level.start()])
            .map(|found| found.as_str().to_string())
            .unwrap_or_default();
        let tax_level_pct = tax_level.as_str().trim_end_matches('%').to_string();

        let tail = rest[tax_level.end()..].trim_start();

        match self.extract_tail(tail) {
            TailOutcome::Complete(fields) => {
                Extraction::Complete(merge_fields(assessed_value, tax_level_pct, fields))
            }
            TailOutcome::Partial(fields, category) => Extraction::Partial {
                fields: merge_fields(assessed_value, tax_level_pct, fields),
                category,
            },
            TailOutcome::NoMatch => Extraction::Partial {
                fields: merge_fields(assessed_value, tax_level_pct, TailFields::default()),
                category: IssueCategory::TooFewAmounts,
            },
        }
    }

    fn extract_tail(&self, tail: &str) -> TailOutcome {
        let strategies: [fn(&Self, &str) -> TailOutcome; 2] =
            [Self::known_deduction_tail, Self::positional_tail];

        for strategy in strategies {
            match strategy(self, tail) {
                TailOutcome::NoMatch => continue,
                outcome => return outcome,
            }
        }

        TailOutcome::NoMatch
    }

    /// Anchors the tail on one of the configured standard deduction
    /// amounts: tax base runs from there to the rate token, tax due is the
    /// first amount after the rate, exemption text is the remainder.
    fn known_deduction_tail(&self, tail: &str) -> TailOutcome {
        let Some(deduction) = self.find_known_deduction(tail) else {
            return TailOutcome::NoMatch;
        };

        let after_deduction = tail[deduction.end..].trim_start();
        let Some(rate) = self.rate_regex.find(after_deduction) else {
            return TailOutcome::Partial(
                TailFields {
                    deduction: deduction.value,
                    ..TailFields::default()
                },
                IssueCategory::NoRateAfterDeduction,
            );
        };

        let tax_base = after_deduction[..rate.start()].trim().to_string();
        let after_rate = after_deduction[rate.end()..].trim_start();

        let (tax_due, exemption) = match self.amount_regex.find(after_rate) {
            Some(amount) => (
                amount.as_str().to_string(),
                trim_exemption(&after_rate[amount.end()..]),
            ),
            None => (String::new(), trim_exemption(after_rate)),
        };

        TailOutcome::Complete(TailFields {
            deduction: deduction.value,
            tax_base,
            rate_per_mille: rate.as_str().to_string(),
            tax_due,
            exemption,
        })
    }

    /// Fallback for non-standard deductions: the first three digit runs in
    /// the tail are taken positionally as deduction, tax base and tax due,
    /// and the rate token is searched independently. The three runs are not
    /// cross-checked for plausibility; suspicious rows surface in `check`.
    fn positional_tail(&self, tail: &str) -> TailOutcome {
        let amounts = self
            .amount_regex
            .find_iter(tail)
            .take(3)
            .collect::<Vec<regex::Match>>();

        if amounts.len() < 3 {
            return TailOutcome::Partial(TailFields::default(), IssueCategory::TooFewAmounts);
        }

        let rate_per_mille = self
            .rate_regex
            .find(tail)
            .map(|found| found.as_str().to_string())
            .unwrap_or_default();

        TailOutcome::Complete(TailFields {
            deduction: amounts[0].as_str().to_string(),
            tax_base: amounts[1].as_str().to_string(),
            rate_per_mille,
            tax_due: amounts[2].as_str().to_string(),
            exemption: trim_exemption(&tail[amounts[2].end()..]),
        })
    }

    fn find_known_deduction(&self, tail: &str) -> Option<KnownDeductionMatch> {
        for pattern in &self.deduction_patterns {
            if let Some(found) = pattern.bounded.find(tail) {
                return Some(KnownDeductionMatch {
                    value: pattern.value.clone(),
                    end: found.end(),
                });
            }
        }

        // Glued columns leave no word boundary around the deduction, so a
        // second pass drops the boundary requirement.
        for pattern in &self.deduction_patterns {
            if let Some(found) = pattern.unbounded.find(tail) {
                return Some(KnownDeductionMatch {
                    value: pattern.value.clone(),
                    end: found.end(),
                });
            }
        }

        None
    }
}

struct KnownDeductionMatch {
    value: String,
    end: usize,
}

fn merge_fields(assessed_value: String, tax_level_pct: String, tail: TailFields) -> RawFields {
    RawFields {
        assessed_value,
        tax_level_pct,
        deduction: tail.deduction,
        tax_base: tail.tax_base,
        rate_per_mille: tail.rate_per_mille,
        tax_due: tail.tax_due,
        exemption: tail.exemption,
    }
}

fn trim_exemption(text: &str) -> String {
    text.trim().trim_matches(',').trim().to_string()
}
