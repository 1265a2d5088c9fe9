use anyhow::{Context, Result};
use regex::Regex;

use crate::model::{Element, TocEntry};

pub(super) struct TocExtractor {
    marker_regex: Regex,
    leader_regex: Regex,
    entry_regex: Regex,
}

impl TocExtractor {
    pub(super) fn new() -> Result<Self> {
        Ok(Self {
            marker_regex: Regex::new(r"(?i)table of contents|contents")
                .context("failed to compile toc marker regex")?,
            leader_regex: Regex::new(r"(\.{2,}\s*\d+\s*$)|(\s{2,}\d+\s*$)")
                .context("failed to compile toc leader regex")?,
            entry_regex: Regex::new(r"^(.*?)(?:\.{2,}|\s{2,}|\s+)\s*(\d+)$")
                .context("failed to compile toc entry regex")?,
        })
    }

    /// Scan for the first contents marker, then collect leader lines with
    /// trailing page numbers. Returns entries in document order; page
    /// numbers are passed through as printed, without monotonicity checks.
    pub(super) fn extract(&self, elements: &[Element]) -> Vec<TocEntry> {
        let mut marker_seen = false;
        let mut entries = Vec::<TocEntry>::new();

        for element in elements {
            let text = element.text.trim();
            if text.is_empty() {
                continue;
            }

            if !marker_seen {
                if self.marker_regex.is_match(text) {
                    marker_seen = true;
                    self.collect_entry_lines(text, &mut entries);
                }
                continue;
            }

            self.collect_entry_lines(text, &mut entries);
        }

        entries
    }

    fn collect_entry_lines(&self, block: &str, entries: &mut Vec<TocEntry>) {
        for line in block.lines() {
            let trimmed = line.trim_end();
            if !self.leader_regex.is_match(trimmed) {
                continue;
            }

            if let Some(entry) = self.parse_entry_line(trimmed) {
                entries.push(entry);
            }
        }
    }

    fn parse_entry_line(&self, line: &str) -> Option<TocEntry> {
        let collapsed = line.split_whitespace().collect::<Vec<&str>>().join(" ");
        let captures = self.entry_regex.captures(&collapsed)?;

        let raw_title = captures.get(1)?.as_str();
        let title = raw_title
            .trim_end_matches(['.', ':', '-', ' '])
            .trim()
            .to_string();
        if title.is_empty() {
            return None;
        }

        let page = captures.get(2)?.as_str().parse::<i64>().ok()?;
        Some(TocEntry { title, page })
    }
}
