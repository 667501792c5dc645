use anyhow::{Context, Result};
use regex::Regex;

/// A property line split around its parcel identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizedLine {
    pub address: String,
    pub parcel_id: String,
    pub rest: String,
}

pub struct LineTokenizer {
    parcel_regex: Regex,
}

impl LineTokenizer {
    pub fn new() -> Result<Self> {
        let parcel_regex = Regex::new(r"\d+/\d+/\d+/\d+")
            .context("failed to compile parcel identifier regex")?;

        Ok(Self { parcel_regex })
    }

    /// Splits a line at the first four-segment parcel identifier. Lines
    /// without one are not property lines and yield `None`.
    ///
    /// The split is positional: an address that itself contains a
    /// parcel-shaped digit/slash sequence will mis-split. That is a known
    /// property of the published layout, not something this stage guesses
    /// around.
    pub fn split(&self, line: &str) -> Option<TokenizedLine> {
        let found = self.parcel_regex.find(line)?;

        let address = line[..found.start()]
            .trim()
            .trim_end_matches(',')
            .to_string();
        let rest = line[found.end()..].trim().to_string();

        Some(TokenizedLine {
            address,
            parcel_id: found.as_str().to_string(),
            rest,
        })
    }
}
