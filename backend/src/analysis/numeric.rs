//! Cell to number conversion shared by every aggregation.

/// Cell texts that stand for a missing value.
const NULL_PLACEHOLDERS: [&str; 1] = ["nan"];

/// Parse a raw cell as a count.
///
/// Null, blank and placeholder cells are absent. Decimal commas are accepted
/// (`"12,5"` is 12.5). Anything that does not parse, or parses to a
/// non-finite value, is absent as well.
pub fn parse_number(raw: Option<&str>) -> Option<f64> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() || NULL_PLACEHOLDERS.contains(&trimmed) {
        return None;
    }

    let value: f64 = trimmed.replace(',', ".").parse().ok()?;
    value.is_finite().then_some(value)
}

/// [`parse_number`] with absent cells counted as zero.
pub fn number_or_zero(raw: Option<&str>) -> f64 {
    parse_number(raw).unwrap_or(0.0)
}
