use std::collections::HashMap;

use anyhow::{Context, Result};
use regex::Regex;

use crate::adapter::FontSpan;
use crate::config::PipelineConfig;
use crate::model::{Element, ElementKind, FontInfo};

const BOLD_FONT_MARKERS: &[&str] = &["bold", "black", "semibold", "demi"];

const LOOSE_TITLE_WORDS: &[&str] = &[
    "introduction",
    "summary",
    "conclusion",
    "overview",
    "background",
    "abstract",
];

/// Words allowed to stay lowercase inside a Title-Case phrase.
const TITLE_CASE_SMALL_WORDS: &[&str] = &[
    "a", "an", "and", "as", "at", "by", "for", "in", "of", "on", "or", "the", "to", "with",
];

pub(super) fn is_bold_font_name(font_name: &str) -> bool {
    let lowered = font_name.to_ascii_lowercase();
    BOLD_FONT_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}

/// Annotate elements with font metrics from the raw renderer spans. The
/// per-page body baseline is the median span size; each element takes the
/// largest span whose text it contains (case-insensitive).
pub(super) fn annotate_font_info(elements: &mut [Element], spans: &[FontSpan]) {
    if spans.is_empty() {
        return;
    }

    let mut spans_by_page = HashMap::<i64, Vec<&FontSpan>>::new();
    for span in spans {
        spans_by_page.entry(span.page_number).or_default().push(span);
    }

    let mut baseline_by_page = HashMap::<i64, f64>::new();
    for (page, page_spans) in &spans_by_page {
        let mut sizes = page_spans.iter().map(|span| span.font_size).collect::<Vec<f64>>();
        sizes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        if let Some(median) = median_of_sorted(&sizes) {
            baseline_by_page.insert(*page, median);
        }
    }

    for element in elements.iter_mut() {
        let Some(page) = element.page_number else {
            continue;
        };
        let Some(page_spans) = spans_by_page.get(&page) else {
            continue;
        };
        let Some(body_font_size) = baseline_by_page.get(&page).copied() else {
            continue;
        };

        let element_text = element.text.to_ascii_lowercase();
        let mut best_match: Option<&FontSpan> = None;
        for span in page_spans.iter().copied() {
            let span_text = span.text.to_ascii_lowercase();
            if span_text.is_empty() || !element_text.contains(&span_text) {
                continue;
            }
            let better = match best_match {
                Some(current) => span.font_size > current.font_size,
                None => true,
            };
            if better {
                best_match = Some(span);
            }
        }

        if let Some(span) = best_match {
            element.font_info = Some(FontInfo {
                font_size: span.font_size,
                is_bold: is_bold_font_name(&span.font_name),
                body_font_size,
            });
        }
    }
}

fn median_of_sorted(sizes: &[f64]) -> Option<f64> {
    if sizes.is_empty() {
        return None;
    }
    let mid = sizes.len() / 2;
    if sizes.len() % 2 == 1 {
        Some(sizes[mid])
    } else {
        Some((sizes[mid - 1] + sizes[mid]) / 2.0)
    }
}

pub(super) struct HeadingDetector {
    numbered_regex: Regex,
    roman_regex: Regex,
    lettered_regex: Regex,
    bare_number_regex: Regex,
    max_title_case_words: usize,
}

impl HeadingDetector {
    pub(super) fn new(config: &PipelineConfig) -> Result<Self> {
        Ok(Self {
            numbered_regex: Regex::new(r"^\d+\.?\s+[A-Z][a-z]")
                .context("failed to compile numbered heading regex")?,
            roman_regex: Regex::new(r"^[IVXLCDM]+[.)]?\s+[A-Z]")
                .context("failed to compile roman heading regex")?,
            lettered_regex: Regex::new(r"^[A-Za-z]\.\s+[A-Z]")
                .context("failed to compile lettered heading regex")?,
            bare_number_regex: Regex::new(r"^\d+([.,]\d+)*$")
                .context("failed to compile bare number regex")?,
            max_title_case_words: config.max_title_case_words,
        })
    }

    /// Combined decision: explicit Title category wins, then the font
    /// signal when metrics are available, then the pattern signal. An
    /// element whose text matches the enclosing section title verbatim is
    /// never a heading, so a section cannot re-split on its own title.
    pub(super) fn detect_heading(&self, element: &Element, section_title: Option<&str>) -> bool {
        let text = element.text.trim();
        if let Some(title) = section_title {
            if text == title.trim() {
                return false;
            }
        }

        if element.kind == ElementKind::Title {
            return true;
        }

        if let Some(font_info) = &element.font_info {
            return font_info.is_bold && font_info.font_size > font_info.body_font_size;
        }

        self.is_pattern_heading(text)
    }

    pub(super) fn is_pattern_heading(&self, text: &str) -> bool {
        let text = text.split_whitespace().collect::<Vec<&str>>().join(" ");
        let text = text.trim();

        if text.len() <= 3 {
            return false;
        }
        if text.ends_with(['.', '?', '!']) {
            return false;
        }
        if self.bare_number_regex.is_match(text) {
            return false;
        }

        if is_all_caps_line(text) {
            return true;
        }
        if self.numbered_regex.is_match(text) {
            return true;
        }
        if self.is_short_title_case(text) {
            return true;
        }
        if self.roman_regex.is_match(text) {
            return true;
        }
        if self.lettered_regex.is_match(text) {
            return true;
        }

        false
    }

    /// Legacy acceptance rule kept for title generation only: short text
    /// carrying a structural word reads well as a title even when it fails
    /// the stricter pattern rules.
    pub(super) fn is_loose_title_candidate(&self, text: &str) -> bool {
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed.len() > 80 {
            return false;
        }
        let lowered = trimmed.to_ascii_lowercase();
        LOOSE_TITLE_WORDS.iter().any(|word| lowered.contains(word))
    }

    fn is_short_title_case(&self, text: &str) -> bool {
        let words = text.split_whitespace().collect::<Vec<&str>>();
        if words.is_empty() || words.len() > self.max_title_case_words {
            return false;
        }

        let mut saw_capitalized = false;
        for (index, word) in words.iter().enumerate() {
            let Some(first) = word.chars().find(|ch| ch.is_alphabetic()) else {
                continue;
            };
            if first.is_uppercase() {
                saw_capitalized = true;
                continue;
            }
            if index == 0 {
                return false;
            }
            if !TITLE_CASE_SMALL_WORDS.contains(&word.to_ascii_lowercase().as_str()) {
                return false;
            }
        }

        saw_capitalized
    }
}

fn is_all_caps_line(text: &str) -> bool {
    let mut saw_alphabetic = false;
    for ch in text.chars() {
        if ch.is_alphabetic() {
            saw_alphabetic = true;
            if ch.is_lowercase() {
                return false;
            }
        }
    }
    saw_alphabetic
}
