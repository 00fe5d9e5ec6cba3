// src/extractors/table.rs
//! Month-keyed benefit tables whose rows mix small "count" columns
//! (dependants, disabled children, shared custody) with amount columns.
//!
//! A row such as `Juillet 2024 2 1 596 96 532 32` reads, after the month
//! label: two counts, a quarterly amount `1 596 96` and a monthly amount
//! `532 32`. Flattened text cannot tell whether the `1` is a count or the
//! thousands digit of the quarterly amount, so the monthly rate decides:
//! a quarterly instalment is three monthly payments.

// --- Imports ---
use crate::extractors::fields::remainder_after;
use crate::extractors::numbers::NumberFormat;
use rust_decimal::Decimal;

// --- Data Structures ---
/// How amounts sit in a benefit table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableShape {
    /// One amount per month label, possibly several labels per line.
    Simple,
    /// The last two tokens of the row are the amount's dollars and cents.
    TrailingPair,
    /// A fixed number of count columns precede the amount.
    SkipCounts(usize),
    /// Counts, then a quarterly amount, then a monthly amount.
    QuarterlyMonthly,
}

/// Amount columns of one quarterly/monthly row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RowAmounts {
    pub quarterly: Decimal,
    pub monthly: Decimal,
}

// --- Token Classification ---
const MIN_QUARTERLY_TOKENS: usize = 4;

fn all_digits(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit())
}

fn is_short_integer(token: &str) -> bool {
    (1..=3).contains(&token.len()) && all_digits(token)
}

fn is_cents(token: &str) -> bool {
    token.len() == 2 && all_digits(token)
}

/// `1,234` style dollars, as printed in English trailing-pair rows.
fn is_grouped_dollars(token: &str) -> bool {
    let mut groups = token.split(',');
    let Some(head) = groups.next() else {
        return false;
    };
    is_short_integer(head) && groups.all(|g| g.len() == 3 && all_digits(g))
}

fn pair_value(dollars: &str, cents: &str) -> Decimal {
    let digits: String = dollars.chars().filter(char::is_ascii_digit).collect();
    match (digits.parse::<i64>(), cents.parse::<i64>()) {
        (Ok(d), Ok(c)) => Decimal::new(d * 100 + c, 2),
        _ => Decimal::ZERO,
    }
}

// --- Row Parsing ---
/// Chooses between the three-digit quarterly candidate and the same figure
/// with `lead` prefixed as its thousands part, keeping whichever is closer
/// to three monthly payments. Ties keep the unprefixed candidate.
pub fn resolve_absorbed_digit(lead: Option<&str>, dollars: &str, cents: &str, monthly: Decimal) -> Decimal {
    let candidate = pair_value(dollars, cents);

    let Some(lead) = lead else {
        return candidate;
    };
    if dollars.len() != 3 || !all_digits(dollars) || !is_short_integer(lead) {
        return candidate;
    }

    let prefixed = pair_value(&format!("{}{}", lead, dollars), cents);
    let expected = monthly * Decimal::from(3);
    if (prefixed - expected).abs() < (candidate - expected).abs() {
        tracing::debug!(
            "Quarterly {} re-read as {} (monthly {} x 3 = {})",
            candidate,
            prefixed,
            monthly,
            expected
        );
        prefixed
    } else {
        candidate
    }
}

/// Parses the tokens following a month label in a quarterly/monthly row.
pub fn quarterly_row(remainder: &str) -> RowAmounts {
    let tokens: Vec<&str> = remainder.split_whitespace().collect();
    let n = tokens.len();
    if n < MIN_QUARTERLY_TOKENS {
        return RowAmounts::default();
    }

    let (m_dollars, m_cents) = (tokens[n - 2], tokens[n - 1]);
    if !(is_grouped_dollars(m_dollars) && is_cents(m_cents)) {
        return RowAmounts::default();
    }
    let monthly = pair_value(m_dollars, m_cents);

    let (q_dollars, q_cents) = (tokens[n - 4], tokens[n - 3]);
    if !(is_grouped_dollars(q_dollars) && is_cents(q_cents)) {
        return RowAmounts { quarterly: Decimal::ZERO, monthly };
    }

    // comma-grouped dollars are already complete; only bare three-digit
    // figures can have lost their thousands digit
    let lead = if n > MIN_QUARTERLY_TOKENS { Some(tokens[n - 5]) } else { None };
    let quarterly = resolve_absorbed_digit(lead, q_dollars, q_cents, monthly);
    RowAmounts { quarterly, monthly }
}

/// Amount made of the row's last two tokens, zero unless both are numeric.
pub fn trailing_pair(remainder: &str) -> Decimal {
    let tokens: Vec<&str> = remainder.split_whitespace().collect();
    match tokens.as_slice() {
        [.., dollars, cents] if is_grouped_dollars(dollars) && is_cents(cents) => {
            pair_value(dollars, cents)
        }
        _ => Decimal::ZERO,
    }
}

/// Skips `count_columns` leading tokens, then reads the first amount.
pub fn amount_after_counts(remainder: &str, count_columns: usize, fmt: &NumberFormat) -> Decimal {
    let tokens: Vec<&str> = remainder.split_whitespace().collect();
    if tokens.len() <= count_columns {
        return Decimal::ZERO;
    }
    let rest = tokens[count_columns..].join(" ");
    fmt.find_amount(&rest)
        .map(|raw| fmt.parse_amount(raw))
        .unwrap_or(Decimal::ZERO)
}

/// Reads the row amount for `label` according to `shape`. `Simple` rows are
/// handled by label windows instead and read as zero here.
pub fn row_amount(line: &str, label: &str, shape: TableShape, fmt: &NumberFormat) -> Decimal {
    let Some(remainder) = remainder_after(line, label) else {
        return Decimal::ZERO;
    };
    match shape {
        TableShape::Simple => Decimal::ZERO,
        TableShape::TrailingPair => trailing_pair(&remainder),
        TableShape::SkipCounts(n) => amount_after_counts(&remainder, n, fmt),
        TableShape::QuarterlyMonthly => quarterly_row(&remainder).quarterly,
    }
}
