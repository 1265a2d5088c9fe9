use std::collections::{HashMap, HashSet};

use crate::config::PipelineConfig;
use crate::lang::{LanguageResources, slugify};

/// Minimum distinct content words before TF-IDF scoring is trusted.
const MIN_CANDIDATE_WORDS: usize = 3;

/// Occurrences a domain term needs in a chunk before it becomes a tag.
const DOMAIN_TERM_MIN_COUNT: usize = 2;

const MIN_TAG_CHARS: usize = 3;

pub(super) struct AutoTagger<'a> {
    lang: &'a LanguageResources,
    config: &'a PipelineConfig,
}

impl<'a> AutoTagger<'a> {
    pub(super) fn new(lang: &'a LanguageResources, config: &'a PipelineConfig) -> Self {
        Self { lang, config }
    }

    /// Derive up to `max_tags` slug tags: section-title words first, then
    /// TF-IDF keywords, then repeated domain terms, pruned against the
    /// generic blocklist.
    pub(super) fn generate_tags(&self, content: &str, section_title: Option<&str>) -> Vec<String> {
        let mut candidates = Vec::<String>::new();

        if let Some(title) = section_title {
            for word in title
                .split_whitespace()
                .filter(|word| word.chars().filter(|ch| ch.is_alphanumeric()).count() > 2)
                .take(3)
            {
                candidates.push(slugify(word));
            }
        }

        for keyword in self.extract_keywords(content, self.config.max_keywords) {
            candidates.push(slugify(&keyword));
        }

        for term in self.repeated_domain_terms(content) {
            candidates.push(slugify(term));
        }

        let mut seen = HashSet::<String>::new();
        let mut tags = Vec::<String>::new();
        for candidate in candidates {
            if candidate.len() < MIN_TAG_CHARS {
                continue;
            }
            if self.lang.is_generic_tag(&candidate) {
                continue;
            }
            if !seen.insert(candidate.clone()) {
                continue;
            }
            tags.push(candidate);
            if tags.len() >= self.config.max_tags {
                break;
            }
        }

        tags
    }

    /// TF-IDF over sentences as pseudo-documents, unigrams and bigrams.
    /// Scores are l2-normalized; only those above the configured floor
    /// survive. Degenerate input (fewer than three distinct content
    /// words) yields no keywords at all, and a scoring pass that keeps
    /// nothing falls back to raw frequency.
    pub(super) fn extract_keywords(&self, content: &str, max_keywords: usize) -> Vec<String> {
        let sentences = split_sentences(content);
        let sentence_tokens = sentences
            .iter()
            .map(|sentence| self.lang.content_tokens(sentence))
            .filter(|tokens| !tokens.is_empty())
            .collect::<Vec<Vec<String>>>();

        let distinct_words = sentence_tokens
            .iter()
            .flatten()
            .collect::<HashSet<&String>>()
            .len();
        if distinct_words < MIN_CANDIDATE_WORDS {
            return Vec::new();
        }

        let mut term_counts = HashMap::<String, usize>::new();
        let mut document_counts = HashMap::<String, usize>::new();
        let mut total_terms = 0usize;

        for tokens in &sentence_tokens {
            let mut seen_in_sentence = HashSet::<String>::new();
            for term in candidate_terms(tokens) {
                *term_counts.entry(term.clone()).or_insert(0) += 1;
                total_terms += 1;
                if seen_in_sentence.insert(term.clone()) {
                    *document_counts.entry(term).or_insert(0) += 1;
                }
            }
        }

        if total_terms == 0 {
            return Vec::new();
        }

        let document_count = sentence_tokens.len() as f64;
        let mut scored = term_counts
            .iter()
            .map(|(term, count)| {
                let tf = *count as f64 / total_terms as f64;
                let df = document_counts.get(term).copied().unwrap_or(0) as f64;
                let idf = (1.0 + document_count / (1.0 + df)).ln() + 1.0;
                (term.clone(), tf * idf)
            })
            .collect::<Vec<(String, f64)>>();

        let norm = scored
            .iter()
            .map(|(_, score)| score * score)
            .sum::<f64>()
            .sqrt();
        if norm <= 0.0 {
            return self.frequency_fallback(&term_counts, max_keywords);
        }
        for entry in scored.iter_mut() {
            entry.1 /= norm;
        }

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(max_keywords * 2);

        let keywords = scored
            .iter()
            .filter(|(_, score)| *score > self.config.keyword_score_floor)
            .take(max_keywords)
            .map(|(term, _)| term.clone())
            .collect::<Vec<String>>();

        if keywords.is_empty() {
            return self.frequency_fallback(&term_counts, max_keywords);
        }

        keywords
    }

    fn frequency_fallback(
        &self,
        term_counts: &HashMap<String, usize>,
        max_keywords: usize,
    ) -> Vec<String> {
        let mut ranked = term_counts
            .iter()
            .map(|(term, count)| (term.clone(), *count))
            .collect::<Vec<(String, usize)>>();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked
            .into_iter()
            .take(max_keywords)
            .map(|(term, _)| term)
            .collect()
    }

    fn repeated_domain_terms(&self, content: &str) -> Vec<&'static str> {
        let lowered = content.to_ascii_lowercase();
        let words = lowered
            .split(|ch: char| !ch.is_ascii_alphanumeric())
            .filter(|word| !word.is_empty())
            .collect::<Vec<&str>>();

        self.lang
            .domain_terms()
            .iter()
            .filter(|term| {
                words.iter().filter(|word| *word == *term).count() >= DOMAIN_TERM_MIN_COUNT
            })
            .copied()
            .collect()
    }
}

fn candidate_terms(tokens: &[String]) -> Vec<String> {
    let mut terms = tokens.to_vec();
    for window in tokens.windows(2) {
        terms.push(format!("{} {}", window[0], window[1]));
    }
    terms
}

/// Sentence split on terminal punctuation followed by whitespace, and on
/// line breaks. No lookbehind needed; a single forward walk suffices.
pub(super) fn split_sentences(content: &str) -> Vec<String> {
    let mut sentences = Vec::<String>::new();
    let mut current = String::new();
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\n' {
            push_sentence(&mut sentences, &mut current);
            continue;
        }

        current.push(ch);
        if matches!(ch, '.' | '!' | '?') {
            let boundary = chars.peek().map(|next| next.is_whitespace()).unwrap_or(true);
            if boundary {
                push_sentence(&mut sentences, &mut current);
            }
        }
    }

    push_sentence(&mut sentences, &mut current);
    sentences
}

fn push_sentence(sentences: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }
    current.clear();
}
