/// Outcome of coercing one raw field to a number. `defaulted` marks a
/// non-empty field whose text yielded nothing numeric; the pipeline counts
/// those so the lossy coercion stays auditable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalized {
    pub value: f64,
    pub defaulted: bool,
}

/// Coerces an amount field: interior whitespace stripped, decimal comma
/// mapped to a point, then the leading run of digits and points. Total by
/// construction; anything unusable becomes zero.
pub fn normalize_amount(raw: &str) -> Normalized {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    let leading: String = cleaned
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    let parsed = leading.parse::<f64>().ok().filter(|value| value.is_finite());
    let defaulted = parsed.is_none() && !raw.trim().is_empty();

    Normalized {
        value: parsed.unwrap_or(0.0),
        defaulted,
    }
}

/// Coerces a rate field, which additionally carries the per-mille sign.
pub fn normalize_rate(raw: &str) -> Normalized {
    normalize_amount(&raw.replace('‰', ""))
}

/// Normalizes exemption text for comparison against the no-exemption
/// sentinel.
pub fn normalize_exemption(raw: &str) -> String {
    raw.trim().to_lowercase()
}
