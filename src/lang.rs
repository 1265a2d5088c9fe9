use std::collections::HashSet;

const STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "all", "also", "am", "an", "and", "any", "are", "as",
    "at", "be", "because", "been", "before", "being", "below", "between", "both", "but", "by",
    "can", "could", "did", "do", "does", "doing", "down", "during", "each", "few", "for", "from",
    "further", "had", "has", "have", "having", "he", "her", "here", "hers", "him", "his", "how",
    "i", "if", "in", "into", "is", "it", "its", "just", "may", "me", "might", "more", "most",
    "must", "my", "no", "nor", "not", "now", "of", "off", "on", "once", "only", "or", "other",
    "our", "out", "over", "own", "same", "shall", "she", "should", "so", "some", "such", "than",
    "that", "the", "their", "theirs", "them", "then", "there", "these", "they", "this", "those",
    "through", "to", "too", "under", "until", "up", "very", "was", "we", "were", "what", "when",
    "where", "which", "while", "who", "whom", "why", "will", "with", "would", "you", "your",
];

/// Domain terms promoted to tags when they repeat in a chunk.
const DOMAIN_TERMS: &[&str] = &[
    "introduction",
    "overview",
    "background",
    "methodology",
    "approach",
    "process",
    "results",
    "findings",
    "outcomes",
    "conclusion",
    "summary",
    "recommendations",
    "analysis",
    "evaluation",
    "assessment",
];

/// Words too generic to carry signal as tags.
const GENERIC_TAG_BLOCKLIST: &[&str] = &[
    "data",
    "information",
    "content",
    "section",
    "text",
    "page",
    "document",
];

/// Immutable language resources, built once per process and passed
/// explicitly into the stages that need them.
#[derive(Debug)]
pub struct LanguageResources {
    stopwords: HashSet<&'static str>,
    domain_terms: Vec<&'static str>,
    generic_tag_blocklist: HashSet<&'static str>,
}

impl LanguageResources {
    pub fn new() -> Self {
        Self {
            stopwords: STOPWORDS.iter().copied().collect(),
            domain_terms: DOMAIN_TERMS.to_vec(),
            generic_tag_blocklist: GENERIC_TAG_BLOCKLIST.iter().copied().collect(),
        }
    }

    pub fn is_stopword(&self, token: &str) -> bool {
        self.stopwords.contains(token)
    }

    pub fn domain_terms(&self) -> &[&'static str] {
        &self.domain_terms
    }

    pub fn is_generic_tag(&self, tag: &str) -> bool {
        self.generic_tag_blocklist.contains(tag)
    }

    /// Lowercase, strip punctuation, drop stopwords and short tokens,
    /// lemmatize what remains.
    pub fn content_tokens(&self, text: &str) -> Vec<String> {
        text.to_ascii_lowercase()
            .split(|ch: char| !ch.is_ascii_alphanumeric())
            .filter(|token| token.len() >= 3)
            .filter(|token| !token.chars().all(|ch| ch.is_ascii_digit()))
            .filter(|token| !self.is_stopword(token))
            .map(|token| self.lemmatize(token))
            .collect()
    }

    /// Suffix-stripping lemmatizer. Deliberately conservative: only
    /// suffixes whose removal leaves a stem of at least three characters.
    pub fn lemmatize(&self, token: &str) -> String {
        let rules: &[(&str, &str)] = &[
            ("ies", "y"),
            ("sses", "ss"),
            ("ings", ""),
            ("ing", ""),
            ("edly", ""),
            ("ed", ""),
            ("es", ""),
            ("s", ""),
        ];

        for (suffix, replacement) in rules {
            if *suffix == "s" && token.ends_with("ss") {
                continue;
            }
            if let Some(stem) = token.strip_suffix(suffix) {
                if stem.len() >= 3 {
                    return format!("{stem}{replacement}");
                }
            }
        }

        token.to_string()
    }
}

pub fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_was_dash = true;

    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
            last_was_dash = false;
        } else if !last_was_dash {
            out.push('-');
            last_was_dash = true;
        }
    }

    out.trim_matches('-').to_string()
}
