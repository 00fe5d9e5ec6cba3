// src/extractors/numbers.rs
//! Amount parsing for CRA tables, which print `1,234 56` (English) or
//! `1 234 56` (French) with no decimal point: the last two digits are cents.

use regex::Regex;
use rust_decimal::Decimal;

/// Per-language number conventions. Always passed explicitly.
#[derive(Debug)]
pub struct NumberFormat {
    /// Characters that may group thousands in source text.
    pub thousands_separators: &'static [char],
    /// Separator used when formatting amounts for display.
    pub display_thousands: char,
    pub display_decimal: char,
    amount: Regex,
    whole: Regex,
}

impl NumberFormat {
    pub fn english() -> Self {
        Self {
            thousands_separators: &[',', ' ', '\u{a0}', '\u{202f}'],
            display_thousands: ',',
            display_decimal: '.',
            amount: Regex::new(r"\b(?:\d{1,3}(?:[,\s]\d{3})+|\d+)\s\d{2}\b")
                .expect("english amount pattern"),
            whole: Regex::new(r"^\s*(\d{1,3}(?:,\d{3})+|\d+)").expect("english whole pattern"),
        }
    }

    pub fn french() -> Self {
        Self {
            thousands_separators: &[' ', '\u{a0}', '\u{202f}'],
            display_thousands: ' ',
            display_decimal: ',',
            amount: Regex::new(r"\b(?:\d{1,3}(?:\s\d{3})+|\d+)\s\d{2}\b")
                .expect("french amount pattern"),
            whole: Regex::new(r"^\s*(\d{1,3}(?:\s\d{3})+|\d+)").expect("french whole pattern"),
        }
    }

    /// First `<integer> <cents>` amount in `text`.
    pub fn find_amount<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.amount.find(text).map(|m| m.as_str())
    }

    /// Leading whole-dollar figure of `text` (carryforward balances carry no cents).
    pub fn find_whole_amount<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.whole
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }

    /// Parses an amount whose last two digits are cents. Missing or
    /// malformed values are zero, since empty table cells are routine.
    pub fn parse_amount(&self, text: &str) -> Decimal {
        let digits: String = text
            .chars()
            .filter(|c| !self.thousands_separators.contains(c) && !c.is_whitespace() && *c != ',')
            .collect();

        if digits.len() < 2 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Decimal::ZERO;
        }

        match digits.parse::<i64>() {
            Ok(cents) => Decimal::new(cents, 2),
            Err(e) => {
                tracing::debug!("Amount '{}' out of range: {}", text, e);
                Decimal::ZERO
            }
        }
    }

    /// Parses a whole-dollar figure, ignoring grouping separators.
    pub fn parse_whole_amount(&self, text: &str) -> Decimal {
        let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
        digits.parse::<i64>().map(Decimal::from).unwrap_or(Decimal::ZERO)
    }

    /// Formats an amount for display with this language's separators.
    pub fn format_amount(&self, amount: Decimal) -> String {
        let rounded = amount.round_dp(2);
        let negative = rounded.is_sign_negative() && !rounded.is_zero();
        let text = format!("{:.2}", rounded.abs());
        let (int_part, cents) = text.split_once('.').unwrap_or((text.as_str(), "00"));

        let mut grouped = String::new();
        for (i, ch) in int_part.chars().enumerate() {
            if i > 0 && (int_part.len() - i) % 3 == 0 {
                grouped.push(self.display_thousands);
            }
            grouped.push(ch);
        }

        format!(
            "{}{}{}{}",
            if negative { "-" } else { "" },
            grouped,
            self.display_decimal,
            cents
        )
    }
}
