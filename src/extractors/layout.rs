// src/extractors/layout.rs
//! Geometric line reconstruction: positioned words on a page become text
//! lines, top to bottom and left to right.

use serde::{Deserialize, Serialize};

/// Default vertical tolerance, in PDF units, for two words to share a line.
pub const DEFAULT_VERTICAL_TOLERANCE: f32 = 1.0;

/// A word as placed by the PDF text layer. `baseline` grows downwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionedWord {
    pub left: f32,
    pub right: f32,
    pub baseline: f32,
    pub text: String,
}

impl PositionedWord {
    pub fn new(left: f32, right: f32, baseline: f32, text: impl Into<String>) -> Self {
        Self { left, right, baseline, text: text.into() }
    }

    /// Baseline rounded to one decimal, which absorbs sub-pixel jitter.
    fn rounded_baseline(&self) -> f32 {
        (self.baseline * 10.0).round() / 10.0
    }
}

/// All words of one page, kept in reading order.
#[derive(Debug, Clone, Default)]
pub struct PageWords {
    words: Vec<PositionedWord>,
}

impl PageWords {
    pub fn new(mut words: Vec<PositionedWord>) -> Self {
        words.retain(|w| !w.text.trim().is_empty());
        words.sort_by(|a, b| {
            a.rounded_baseline()
                .total_cmp(&b.rounded_baseline())
                .then(a.left.total_cmp(&b.left))
        });
        Self { words }
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Lazily walks the page line by line. Each call starts from the top again.
    pub fn lines(&self, tolerance: f32) -> Lines<'_> {
        Lines { words: &self.words, pos: 0, tolerance }
    }
}

/// Words sharing an effective baseline, ordered left to right.
#[derive(Debug, Clone)]
pub struct ReconstructedLine<'a> {
    pub baseline: f32,
    pub words: Vec<&'a PositionedWord>,
}

impl ReconstructedLine<'_> {
    pub fn text(&self) -> String {
        self.words
            .iter()
            .map(|w| w.text.trim())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Iterator returned by [`PageWords::lines`].
pub struct Lines<'a> {
    words: &'a [PositionedWord],
    pos: usize,
    tolerance: f32,
}

impl<'a> Iterator for Lines<'a> {
    type Item = ReconstructedLine<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let first = self.words.get(self.pos)?;
        let start = self.pos;
        let mut last_baseline = first.rounded_baseline();
        self.pos += 1;

        while let Some(word) = self.words.get(self.pos) {
            let baseline = word.rounded_baseline();
            if (baseline - last_baseline).abs() > self.tolerance {
                break;
            }
            last_baseline = baseline;
            self.pos += 1;
        }

        let mut words: Vec<&'a PositionedWord> = self.words[start..self.pos].iter().collect();
        words.sort_by(|a, b| a.left.total_cmp(&b.left));

        Some(ReconstructedLine { baseline: first.rounded_baseline(), words })
    }
}

/// Concatenates the line texts of every page, in page order.
pub fn document_lines(pages: &[PageWords], tolerance: f32) -> Vec<String> {
    pages
        .iter()
        .flat_map(|page| {
            page.lines(tolerance).map(|line| {
                let text = line.text();
                tracing::trace!("{:>7.1} | {}", line.baseline, text);
                text
            })
        })
        .filter(|text| !text.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(left: f32, baseline: f32, text: &str) -> PositionedWord {
        PositionedWord::new(left, left + 5.0 * text.len() as f32, baseline, text)
    }

    #[test]
    fn groups_words_into_lines_top_to_bottom() {
        let page = PageWords::new(vec![
            word(120.0, 200.0, "Credit"),
            word(50.0, 100.2, "Tax"),
            word(50.0, 200.4, "GST/HST"),
            word(90.0, 99.8, "return"),
            word(150.0, 100.0, "summary"),
        ]);

        let lines: Vec<String> = page.lines(DEFAULT_VERTICAL_TOLERANCE).map(|l| l.text()).collect();
        assert_eq!(lines, vec!["Tax return summary", "GST/HST Credit"]);
    }

    #[test]
    fn separates_rows_beyond_tolerance() {
        let page = PageWords::new(vec![
            word(10.0, 300.0, "July 2024"),
            word(10.0, 312.0, "October 2024"),
        ]);
        assert_eq!(page.lines(1.0).count(), 2);
    }

    #[test]
    fn lines_are_restartable() {
        let page = PageWords::new(vec![word(10.0, 10.0, "a"), word(10.0, 30.0, "b")]);
        let first: Vec<String> = page.lines(1.0).map(|l| l.text()).collect();
        let second: Vec<String> = page.lines(1.0).map(|l| l.text()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn lines_report_their_rounded_baseline() {
        let page = PageWords::new(vec![
            word(10.0, 100.04, "Total"),
            word(60.0, 100.3, "="),
            word(10.0, 140.0, " "),
        ]);
        assert_eq!(page.len(), 2);

        let baselines: Vec<f32> = page.lines(1.0).map(|l| l.baseline).collect();
        assert_eq!(baselines, vec![100.0]);
    }

    #[test]
    fn empty_page_yields_no_lines() {
        let page = PageWords::new(vec![word(10.0, 10.0, "   ")]);
        assert!(page.is_empty());
        assert_eq!(page.lines(1.0).count(), 0);
    }

    #[test]
    fn document_lines_keeps_page_order() {
        let pages = vec![
            PageWords::new(vec![word(10.0, 500.0, "page-one")]),
            PageWords::new(vec![word(10.0, 20.0, "page-two")]),
        ];
        assert_eq!(document_lines(&pages, 1.0), vec!["page-one", "page-two"]);
    }
}
