use anyhow::{Context, Result};
use regex::Regex;

/// Minimum accumulated characters before a heading boundary closes the
/// in-progress minor chunk.
pub const DEFAULT_MIN_CHUNK_SIZE: usize = 300;

/// Minor chunks shorter than this are absorbed into their predecessor
/// before the count ceiling is enforced.
pub const DEFAULT_MIN_MINOR_CHUNK_CHARS: usize = 800;

/// Upper bound on minor chunks per section after the merge pass.
pub const DEFAULT_MAX_MINOR_CHUNKS: usize = 6;

/// Fallback mode: buffer length required before a heading closes a section.
pub const DEFAULT_FALLBACK_HEADING_BUFFER_CHARS: usize = 1000;

/// Fallback mode: buffer length that forces a split regardless of headings.
pub const DEFAULT_FALLBACK_FORCE_SPLIT_CHARS: usize = 3000;

/// Fallback mode: ceiling on emitted sections before adjacent-pair merging.
pub const DEFAULT_MAX_FALLBACK_SECTIONS: usize = 20;

/// Generated titles longer than this are rejected or truncated.
pub const DEFAULT_MAX_TITLE_CHARS: usize = 60;

/// Normalized TF-IDF score a keyword must exceed to become a tag.
pub const DEFAULT_KEYWORD_SCORE_FLOOR: f64 = 0.2;

/// Keywords requested from the extractor before pruning.
pub const DEFAULT_MAX_KEYWORDS: usize = 4;

/// Tag list cap for both major and minor chunks.
pub const DEFAULT_MAX_TAGS: usize = 3;

/// Heading pattern rule: Title-Case phrases above this word count are body.
pub const DEFAULT_MAX_TITLE_CASE_WORDS: usize = 11;

const FOOTER_PATTERNS: &[&str] = &[
    r"(?i)^\s*(copyright|©|\(c\))\s+.*$",
    r"(?i)^\s*page\s+\d+(\s+of\s+\d+)?\s*$",
    r"^\s*\d{1,4}\s*$",
    r"(?i)^\s*all rights reserved\.?\s*$",
    r"(?i)^\s*(confidential|proprietary)\s*$",
    r"(?i)^\s*https?://\S+\s*$",
];

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub min_chunk_size: usize,
    pub min_minor_chunk_chars: usize,
    pub max_minor_chunks: usize,
    pub fallback_heading_buffer_chars: usize,
    pub fallback_force_split_chars: usize,
    pub max_fallback_sections: usize,
    pub max_title_chars: usize,
    pub keyword_score_floor: f64,
    pub max_keywords: usize,
    pub max_tags: usize,
    pub max_title_case_words: usize,
    pub footer_patterns: Vec<Regex>,
}

impl PipelineConfig {
    pub fn new() -> Result<Self> {
        let footer_patterns = FOOTER_PATTERNS
            .iter()
            .map(|pattern| {
                Regex::new(pattern)
                    .with_context(|| format!("failed to compile footer pattern: {pattern}"))
            })
            .collect::<Result<Vec<Regex>>>()?;

        Ok(Self {
            min_chunk_size: DEFAULT_MIN_CHUNK_SIZE,
            min_minor_chunk_chars: DEFAULT_MIN_MINOR_CHUNK_CHARS,
            max_minor_chunks: DEFAULT_MAX_MINOR_CHUNKS,
            fallback_heading_buffer_chars: DEFAULT_FALLBACK_HEADING_BUFFER_CHARS,
            fallback_force_split_chars: DEFAULT_FALLBACK_FORCE_SPLIT_CHARS,
            max_fallback_sections: DEFAULT_MAX_FALLBACK_SECTIONS,
            max_title_chars: DEFAULT_MAX_TITLE_CHARS,
            keyword_score_floor: DEFAULT_KEYWORD_SCORE_FLOOR,
            max_keywords: DEFAULT_MAX_KEYWORDS,
            max_tags: DEFAULT_MAX_TAGS,
            max_title_case_words: DEFAULT_MAX_TITLE_CASE_WORDS,
            footer_patterns,
        })
    }

    pub fn is_boilerplate_line(&self, text: &str) -> bool {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return true;
        }
        self.footer_patterns
            .iter()
            .any(|pattern| pattern.is_match(trimmed))
    }
}
