//! Named text pattern matching.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{PageContent, Warning, WarningKind};

use super::options::{DetectorConfig, ExtractOptions, TextPattern};
use super::rows::{cluster_rows, row_tolerance};

/// Where on the page a match was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "index", rename_all = "lowercase")]
pub enum MatchPosition {
    /// Row index within the page, top to bottom
    Row(usize),
    /// Fragment index within the page, in decoder order
    Fragment(usize),
}

/// One extracted named value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternMatch {
    /// Pattern name
    pub name: String,
    /// Matched value (first capture group, or the whole match)
    pub value: String,
    /// 0-based page index
    pub page_index: usize,
    /// Row or fragment the value came from
    pub position: MatchPosition,
}

/// Matches and warnings for a document.
#[derive(Debug, Clone, Default)]
pub struct PatternOutcome {
    /// Matches in page, position, then pattern declaration order
    pub matches: Vec<PatternMatch>,
    /// One `PatternUnmatched` warning per pattern that never matched
    pub warnings: Vec<Warning>,
}

struct CompiledPattern {
    name: String,
    regex: Regex,
}

/// Applies an ordered list of named patterns to page text.
///
/// Patterns are independent: overlapping matches from different patterns on
/// the same row are all kept. Within one row, only the first match of each
/// pattern is taken.
pub struct PatternMatcher {
    patterns: Vec<CompiledPattern>,
    row_structure: bool,
    detector: DetectorConfig,
}

impl PatternMatcher {
    /// Compile patterns in declaration order.
    ///
    /// Pattern names become column names, so they must be unique.
    pub fn new(patterns: &[TextPattern]) -> Result<Self> {
        for (i, p) in patterns.iter().enumerate() {
            if patterns[..i].iter().any(|earlier| earlier.name == p.name) {
                return Err(Error::InvalidOption(format!(
                    "duplicate pattern name '{}'",
                    p.name
                )));
            }
        }

        let patterns = patterns
            .iter()
            .map(|p| {
                Regex::new(&p.pattern)
                    .map(|regex| CompiledPattern {
                        name: p.name.clone(),
                        regex,
                    })
                    .map_err(|source| Error::InvalidPattern {
                        name: p.name.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            patterns,
            row_structure: true,
            detector: DetectorConfig::default(),
        })
    }

    /// Compile the patterns of extraction options.
    pub fn from_options(options: &ExtractOptions) -> Result<Self> {
        Ok(Self::new(&options.text_patterns)?
            .with_row_structure(options.row_structure)
            .with_detector(options.detector.clone()))
    }

    /// Match against clustered rows (true) or single fragments (false).
    pub fn with_row_structure(mut self, rows: bool) -> Self {
        self.row_structure = rows;
        self
    }

    /// Set the tolerances used for row clustering.
    pub fn with_detector(mut self, detector: DetectorConfig) -> Self {
        self.detector = detector;
        self
    }

    /// Check if there are no patterns.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Pattern names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|p| p.name.as_str())
    }

    /// Apply every pattern to every page, in order.
    pub fn match_pages(&self, pages: &[PageContent]) -> PatternOutcome {
        let mut outcome = PatternOutcome::default();

        for page in pages {
            if self.row_structure {
                let tolerance = row_tolerance(&page.fragments, &self.detector);
                for (row_idx, row) in cluster_rows(&page.fragments, tolerance).iter().enumerate() {
                    self.match_text(
                        &row.text(),
                        page.page_index,
                        MatchPosition::Row(row_idx),
                        &mut outcome.matches,
                    );
                }
            } else {
                for (frag_idx, fragment) in page.fragments.iter().enumerate() {
                    self.match_text(
                        &fragment.text,
                        page.page_index,
                        MatchPosition::Fragment(frag_idx),
                        &mut outcome.matches,
                    );
                }
            }
        }

        for pattern in &self.patterns {
            if !outcome.matches.iter().any(|m| m.name == pattern.name) {
                log::warn!("pattern '{}' matched nothing", pattern.name);
                outcome.warnings.push(Warning::new(
                    WarningKind::PatternUnmatched,
                    format!("pattern '{}' matched nothing in the document", pattern.name),
                ));
            }
        }

        log::debug!(
            "PatternMatcher: {} matches from {} patterns",
            outcome.matches.len(),
            self.patterns.len()
        );
        outcome
    }

    fn match_text(
        &self,
        text: &str,
        page_index: usize,
        position: MatchPosition,
        matches: &mut Vec<PatternMatch>,
    ) {
        if text.trim().is_empty() {
            return;
        }
        for pattern in &self.patterns {
            let Some(caps) = pattern.regex.captures(text) else {
                continue;
            };
            let Some(found) = caps.get(1).or_else(|| caps.get(0)) else {
                continue;
            };
            matches.push(PatternMatch {
                name: pattern.name.clone(),
                value: found.as_str().trim().to_string(),
                page_index,
                position,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TextFragment;

    fn page_with_lines(lines: &[&str]) -> PageContent {
        let mut page = PageContent::new(0);
        for (i, line) in lines.iter().enumerate() {
            let top = i as f32 * 20.0;
            page.add_fragment(TextFragment::new(*line, 0.0, top, 100.0, top + 10.0));
        }
        page
    }

    #[test]
    fn test_total_pattern_on_rows() {
        let matcher =
            PatternMatcher::new(&[TextPattern::new("total", r"Total:\s*(\d+)")]).unwrap();
        let outcome = matcher.match_pages(&[page_with_lines(&["Total: 42", "Other text"])]);

        assert_eq!(
            outcome.matches,
            vec![PatternMatch {
                name: "total".into(),
                value: "42".into(),
                page_index: 0,
                position: MatchPosition::Row(0),
            }]
        );
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_unmatched_pattern_warns() {
        let matcher = PatternMatcher::new(&[
            TextPattern::new("total", r"Total:\s*(\d+)"),
            TextPattern::new("date", r"\d{4}-\d{2}-\d{2}"),
        ])
        .unwrap();
        let outcome = matcher.match_pages(&[page_with_lines(&["Total: 42"])]);

        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].kind, WarningKind::PatternUnmatched);
        assert!(outcome.warnings[0].message.contains("date"));
    }

    #[test]
    fn test_whole_match_without_group() {
        let matcher = PatternMatcher::new(&[TextPattern::new("date", r"\d{4}-\d{2}-\d{2}")])
            .unwrap();
        let outcome = matcher.match_pages(&[page_with_lines(&["Issued 2024-03-01 by clerk"])]);
        assert_eq!(outcome.matches[0].value, "2024-03-01");
    }

    #[test]
    fn test_first_match_per_row_and_overlaps_kept() {
        let matcher = PatternMatcher::new(&[
            TextPattern::new("number", r"(\d+)"),
            TextPattern::new("amount", r"(\d+) EUR"),
        ])
        .unwrap();
        let outcome = matcher.match_pages(&[page_with_lines(&["7 items 30 EUR"])]);

        let values: Vec<(&str, &str)> = outcome
            .matches
            .iter()
            .map(|m| (m.name.as_str(), m.value.as_str()))
            .collect();
        assert_eq!(values, vec![("number", "7"), ("amount", "30")]);
    }

    #[test]
    fn test_fragment_mode_positions() {
        let matcher = PatternMatcher::new(&[TextPattern::new("id", r"ID-(\d+)")])
            .unwrap()
            .with_row_structure(false);
        let page = PageContent::new(2)
            .with_fragment(TextFragment::new("Ref", 0.0, 0.0, 20.0, 10.0))
            .with_fragment(TextFragment::new("ID-9", 30.0, 0.0, 60.0, 10.0));
        let outcome = matcher.match_pages(&[page]);

        assert_eq!(outcome.matches[0].position, MatchPosition::Fragment(1));
        assert_eq!(outcome.matches[0].page_index, 2);
    }

    #[test]
    fn test_row_text_joins_fragments() {
        let matcher = PatternMatcher::new(&[TextPattern::new("total", r"Total:\s*(\d+)")])
            .unwrap();
        let page = PageContent::new(0)
            .with_fragment(TextFragment::new("42", 60.0, 0.0, 80.0, 10.0))
            .with_fragment(TextFragment::new("Total:", 0.0, 0.0, 40.0, 10.0));
        let outcome = matcher.match_pages(&[page]);
        assert_eq!(outcome.matches[0].value, "42");
    }

    #[test]
    fn test_duplicate_pattern_names_rejected() {
        let result = PatternMatcher::new(&[
            TextPattern::new("date", r"Date:\s*(\d{4}-\d{2}-\d{2})"),
            TextPattern::new("date", r"(\d{2}/\d{2}/\d{4})"),
        ]);
        let err = result.err().unwrap();
        assert!(matches!(err, Error::InvalidOption(ref msg) if msg.contains("'date'")));
        assert!(matches!(
            crate::error::ErrorKind::from(&err),
            crate::error::ErrorKind::Configuration(_)
        ));
    }

    #[test]
    fn test_invalid_pattern() {
        let result = PatternMatcher::new(&[TextPattern::new("broken", "(unclosed")]);
        assert!(matches!(result, Err(Error::InvalidPattern { ref name, .. }) if name == "broken"));
    }
}
