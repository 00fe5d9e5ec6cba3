// src/extractors/fields.rs
//! Label-anchored extraction: a value is found by the text around it, not by
//! its column position.

use crate::extractors::numbers::NumberFormat;
use rust_decimal::Decimal;

/// Text following the first case-insensitive occurrence of `label`, or
/// `None` when the label is absent. The result is lowercased.
pub fn remainder_after(line: &str, label: &str) -> Option<String> {
    if label.is_empty() {
        return None;
    }
    let lower = line.to_lowercase();
    let needle = label.to_lowercase();
    lower
        .find(&needle)
        .map(|pos| lower[pos + needle.len()..].to_string())
}

/// Cuts `window` at the earliest occurrence of any non-empty stop label.
fn truncate_at_earliest(window: &str, stops: &[&str]) -> usize {
    stops
        .iter()
        .filter(|stop| !stop.is_empty())
        .filter_map(|stop| window.find(&stop.to_lowercase()))
        .min()
        .unwrap_or(window.len())
}

/// Amount between `label` and `next_label` on one line. Zero when the
/// label or a well-formed amount is missing.
pub fn amount_between(label: &str, next_label: &str, line: &str, fmt: &NumberFormat) -> Decimal {
    amount_before_any(label, &[next_label], line, fmt)
}

/// Like [`amount_between`], but the window ends at whichever of `stops`
/// comes first after the label.
pub fn amount_before_any(label: &str, stops: &[&str], line: &str, fmt: &NumberFormat) -> Decimal {
    let Some(after) = remainder_after(line, label) else {
        return Decimal::ZERO;
    };
    let window = &after[..truncate_at_earliest(&after, stops)];

    fmt.find_amount(window.trim())
        .map(|raw| fmt.parse_amount(raw))
        .unwrap_or(Decimal::ZERO)
}

/// Free text after an exact-case label, e.g. a name or province.
pub fn text_after_label<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let pos = line.find(label)?;
    let value = line[pos + label.len()..].trim();
    (!value.is_empty()).then_some(value)
}
