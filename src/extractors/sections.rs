// src/extractors/sections.rs
//! Buckets reconstructed lines under the section title that precedes them.

use crate::extractors::vocabulary::Vocabulary;
use crate::utils::error::ExtractError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Topics of a tax-summary document that the extractors understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    TaxReturnSummary,
    GstCredit,
    SolidarityCredit,
    ChildBenefit,
    CarryforwardSummary,
    FamilyAllowance,
    CarbonRebate,
    OntarioTrillium,
    ClimateActionCredit,
}

/// Section content keyed by topic. Lines keep document order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Sections {
    content: BTreeMap<SectionKind, Vec<String>>,
}

impl Sections {
    pub fn lines(&self, kind: SectionKind) -> &[String] {
        self.content.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True when the title was seen, even if no content followed it.
    pub fn contains(&self, kind: SectionKind) -> bool {
        self.content.contains_key(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SectionKind, &[String])> {
        self.content.iter().map(|(kind, lines)| (*kind, lines.as_slice()))
    }
}

fn match_title(text: &str, vocab: &Vocabulary) -> Option<SectionKind> {
    let lower = text.to_lowercase();
    vocab
        .section_titles
        .iter()
        .find(|(_, title)| lower.contains(&title.to_lowercase()))
        .map(|(kind, _)| *kind)
}

/// Splits document lines into sections. Lines before the first title are
/// dropped; a repeated title extends its earlier section.
pub fn segment<S: AsRef<str>>(lines: &[S], vocab: &Vocabulary) -> Sections {
    let mut sections = Sections::default();
    let mut active: Option<SectionKind> = None;
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i].as_ref();

        if let Some(kind) = match_title(line, vocab) {
            tracing::trace!("Section title '{}' -> {:?}", line, kind);
            sections.content.entry(kind).or_default();
            active = Some(kind);
            i += 1;
            continue;
        }

        // A title wrapped over two rendered lines. The next line alone must
        // not already hold the title, or this line is ordinary content.
        if let Some(next) = lines.get(i + 1).map(|l| l.as_ref()) {
            if match_title(next, vocab).is_none() {
                if let Some(kind) = match_title(&format!("{} {}", line, next), vocab) {
                    tracing::trace!("Wrapped section title '{} {}' -> {:?}", line, next, kind);
                    sections.content.entry(kind).or_default();
                    active = Some(kind);
                    i += 2;
                    continue;
                }
            }
        }

        if let Some(kind) = active {
            sections.content.entry(kind).or_default().push(line.to_string());
        }
        i += 1;
    }

    for (kind, content) in sections.iter() {
        tracing::debug!("Section {:?}: {} lines", kind, content.len());
    }
    sections
}

/// Segments and checks that the document carries a tax-return summary,
/// which every client record needs for its name and province.
pub fn segment_required<S: AsRef<str>>(lines: &[S], vocab: &Vocabulary) -> Result<Sections, ExtractError> {
    let sections = segment(lines, vocab);
    if sections.is_empty() {
        return Err(ExtractError::NoSections);
    }
    if !sections.contains(SectionKind::TaxReturnSummary) {
        let title = vocab.title(SectionKind::TaxReturnSummary).unwrap_or("tax return summary");
        return Err(ExtractError::SectionNotFound(title.to_string()));
    }
    Ok(sections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::vocabulary::Language;

    fn english() -> &'static Vocabulary {
        Language::English.vocabulary()
    }

    #[test]
    fn buckets_lines_under_titles_and_drops_preamble() {
        let lines = [
            "Unrelated text",
            "Tax return summary",
            "First name John",
            "GST/HST Tax Credit",
            "...amount...",
        ];
        let sections = segment(&lines, english());

        assert_eq!(sections.lines(SectionKind::TaxReturnSummary), ["First name John"]);
        assert_eq!(sections.lines(SectionKind::GstCredit), ["...amount..."]);
        assert_eq!(sections.iter().count(), 2);
    }

    #[test]
    fn wrapped_title_consumes_following_line() {
        let lines = [
            "Tax return summary",
            "First name Ann",
            "Estimated calculation for the Canada",
            "Child Benefit (CCB)",
            "July 2024 1 0 0 512 32",
        ];
        let sections = segment(&lines, english());
        assert_eq!(sections.lines(SectionKind::ChildBenefit), ["July 2024 1 0 0 512 32"]);
        assert_eq!(sections.lines(SectionKind::TaxReturnSummary), ["First name Ann"]);
    }

    #[test]
    fn title_match_is_case_insensitive_and_recurring_titles_extend() {
        let lines = [
            "TAX RETURN SUMMARY",
            "First name Ann",
            "GST/HST tax credit",
            "July 2024 100 00",
            "Tax return summary (continued)",
            "Last name Lee",
        ];
        let sections = segment(&lines, english());
        assert_eq!(
            sections.lines(SectionKind::TaxReturnSummary),
            ["First name Ann", "Last name Lee"]
        );
        assert_eq!(sections.lines(SectionKind::GstCredit), ["July 2024 100 00"]);
    }

    #[test]
    fn french_titles_use_french_vocabulary() {
        let lines = ["Sommaire de la déclaration", "Prénom Marie"];
        let sections = segment(&lines, Language::French.vocabulary());
        assert_eq!(sections.lines(SectionKind::TaxReturnSummary), ["Prénom Marie"]);
        assert!(segment(&lines, english()).is_empty());
    }

    #[test]
    fn document_without_titles_is_rejected() {
        let lines = ["Some cover page", "Nothing recognizable"];
        assert!(matches!(segment_required(&lines, english()), Err(ExtractError::NoSections)));

        let lines = ["GST/HST Tax Credit", "July 2024 100 00"];
        assert!(matches!(
            segment_required(&lines, english()),
            Err(ExtractError::SectionNotFound(_))
        ));
    }
}
