use crate::config::PipelineConfig;
use crate::model::{ChunkText, Element, MinorChunk, Section, TocEntry};

use super::fonts::HeadingDetector;
use super::tags::{AutoTagger, split_sentences};

pub(super) struct Chunker<'a> {
    config: &'a PipelineConfig,
    detector: &'a HeadingDetector,
    tagger: &'a AutoTagger<'a>,
}

struct PendingHeading {
    text: String,
    page: Option<i64>,
}

struct SectionDraft {
    text: String,
    start_page: Option<i64>,
    end_page: Option<i64>,
}

impl<'a> Chunker<'a> {
    pub(super) fn new(
        config: &'a PipelineConfig,
        detector: &'a HeadingDetector,
        tagger: &'a AutoTagger<'a>,
    ) -> Self {
        Self {
            config,
            detector,
            tagger,
        }
    }

    pub(super) fn build_sections(
        &self,
        elements: &[Element],
        toc_entries: &[TocEntry],
        file_source: &str,
    ) -> Vec<Section> {
        if toc_entries.is_empty() {
            self.fallback_sections(elements, file_source)
        } else {
            self.toc_sections(elements, toc_entries, file_source)
        }
    }

    /// One section per TOC entry; entry pages define `[start, next)`
    /// ranges, the final entry running to the last populated page. Page
    /// numbers are taken as printed, so an inverted range simply gathers
    /// nothing and degenerates to a stub section.
    fn toc_sections(
        &self,
        elements: &[Element],
        toc_entries: &[TocEntry],
        file_source: &str,
    ) -> Vec<Section> {
        let last_page = elements
            .iter()
            .filter_map(|element| element.page_number)
            .max()
            .unwrap_or(1);

        let mut sections = Vec::<Section>::with_capacity(toc_entries.len());

        for (index, entry) in toc_entries.iter().enumerate() {
            let start_page = entry.page;
            let end_exclusive = toc_entries
                .get(index + 1)
                .map(|next| next.page)
                .unwrap_or(last_page + 1);

            let gathered = elements
                .iter()
                .filter(|element| {
                    element
                        .page_number
                        .map(|page| page >= start_page && page < end_exclusive)
                        .unwrap_or(false)
                })
                .collect::<Vec<&Element>>();

            let minors = self.split_minor_chunks(&gathered, &entry.title, start_page);
            let minors = self.merge_minor_chunks(minors);

            let combined = minors
                .iter()
                .flat_map(|chunk| chunk.content.iter())
                .map(|piece| piece.text.as_str())
                .collect::<Vec<&str>>()
                .join("\n\n");
            let tags = self.tagger.generate_tags(&combined, Some(&entry.title));

            sections.push(Section {
                title: entry.title.clone(),
                start_page,
                end_page: end_exclusive - 1,
                file_source: file_source.to_string(),
                tags,
                content: minors,
            });
        }

        sections
    }

    /// Walk a section's elements splitting on detected headings. The
    /// accumulator only closes at a heading once it holds more than
    /// `min_chunk_size` characters; smaller runs ride along into the next
    /// chunk.
    pub(super) fn split_minor_chunks(
        &self,
        gathered: &[&Element],
        section_title: &str,
        section_start_page: i64,
    ) -> Vec<MinorChunk> {
        let mut chunks = Vec::<MinorChunk>::new();
        let mut heading: Option<PendingHeading> = None;
        let mut accumulator = String::new();
        let mut accumulator_page: Option<i64> = None;

        for element in gathered {
            if self.detector.detect_heading(element, Some(section_title)) {
                if accumulator.chars().count() > self.config.min_chunk_size {
                    if let Some(chunk) =
                        self.finalize_minor_chunk(heading.take(), &accumulator, accumulator_page)
                    {
                        chunks.push(chunk);
                    }
                    accumulator.clear();
                    accumulator_page = None;
                }
                heading = Some(PendingHeading {
                    text: element.text.trim().to_string(),
                    page: element.page_number,
                });
                continue;
            }

            if !accumulator.is_empty() {
                accumulator.push('\n');
            }
            accumulator.push_str(element.text.trim());
            if accumulator_page.is_none() {
                accumulator_page = element.page_number;
            }
        }

        if !accumulator.trim().is_empty() {
            if let Some(chunk) =
                self.finalize_minor_chunk(heading.take(), &accumulator, accumulator_page)
            {
                chunks.push(chunk);
            }
        } else if let Some(pending) = heading.take() {
            // Bare trailing heading: emit a stub carrying the heading text.
            let tag = normalize_heading_title(&pending.text);
            let tags = self.tagger.generate_tags(&pending.text, Some(&tag));
            chunks.push(MinorChunk {
                tag,
                tags,
                content: vec![ChunkText {
                    text: pending.text,
                    page_number: pending.page,
                }],
            });
        }

        if chunks.is_empty() {
            chunks.push(self.synthesize_minor_chunk(gathered, section_title, section_start_page));
        }

        chunks
    }

    fn finalize_minor_chunk(
        &self,
        heading: Option<PendingHeading>,
        accumulator: &str,
        accumulator_page: Option<i64>,
    ) -> Option<MinorChunk> {
        let content_text = accumulator.trim().to_string();
        if content_text.is_empty() {
            return None;
        }

        let tag = match &heading {
            Some(pending) if self.detector.is_pattern_heading(&pending.text) => {
                normalize_heading_title(&pending.text)
            }
            _ => self.generate_meaningful_title(&content_text),
        };

        let page_number = heading
            .as_ref()
            .and_then(|pending| pending.page)
            .or(accumulator_page);
        let tags = self.tagger.generate_tags(&content_text, Some(&tag));

        Some(MinorChunk {
            tag,
            tags,
            content: vec![ChunkText {
                text: content_text,
                page_number,
            }],
        })
    }

    fn synthesize_minor_chunk(
        &self,
        gathered: &[&Element],
        section_title: &str,
        section_start_page: i64,
    ) -> MinorChunk {
        let full_text = gathered
            .iter()
            .map(|element| element.text.trim())
            .filter(|text| !text.is_empty())
            .collect::<Vec<&str>>()
            .join("\n");
        let text = if full_text.trim().is_empty() {
            section_title.to_string()
        } else {
            full_text
        };

        let tag = self.generate_meaningful_title(&text);
        let tags = self.tagger.generate_tags(&text, Some(&tag));
        let page_number = gathered
            .iter()
            .find_map(|element| element.page_number)
            .or(Some(section_start_page));

        MinorChunk {
            tag,
            tags,
            content: vec![ChunkText { text, page_number }],
        }
    }

    /// Two-pass reduction: absorb undersized chunks into their
    /// predecessor, then merge the cheapest adjacent pair until the count
    /// ceiling holds. Each pass builds a fresh sequence rather than
    /// mutating in place.
    pub(super) fn merge_minor_chunks(&self, chunks: Vec<MinorChunk>) -> Vec<MinorChunk> {
        let mut reduced = chunks
            .into_iter()
            .fold(Vec::<MinorChunk>::new(), |mut acc, chunk| {
                let undersized = chunk_char_len(&chunk) < self.config.min_minor_chunk_chars;
                match acc.pop() {
                    Some(previous) if undersized => {
                        acc.push(self.merge_pair(previous, chunk));
                    }
                    Some(previous) => {
                        acc.push(previous);
                        acc.push(chunk);
                    }
                    None => acc.push(chunk),
                }
                acc
            });

        // The fold absorbs backwards, so only the leading chunk can still
        // be under the floor; pull it forward into its successor.
        while reduced.len() > 1
            && chunk_char_len(&reduced[0]) < self.config.min_minor_chunk_chars
        {
            reduced = self.merge_minor_at(reduced, 0);
        }

        while reduced.len() > self.config.max_minor_chunks {
            let index = cheapest_adjacent_pair(&reduced, chunk_char_len);
            reduced = self.merge_minor_at(reduced, index);
        }

        reduced
    }

    fn merge_minor_at(&self, chunks: Vec<MinorChunk>, index: usize) -> Vec<MinorChunk> {
        let mut merged = Vec::<MinorChunk>::with_capacity(chunks.len().saturating_sub(1));
        let mut pending: Option<MinorChunk> = None;

        for (position, chunk) in chunks.into_iter().enumerate() {
            if position == index {
                pending = Some(chunk);
            } else if position == index + 1 {
                match pending.take() {
                    Some(left) => merged.push(self.merge_pair(left, chunk)),
                    None => merged.push(chunk),
                }
            } else {
                merged.push(chunk);
            }
        }

        if let Some(leftover) = pending {
            merged.push(leftover);
        }

        merged
    }

    fn merge_pair(&self, left: MinorChunk, right: MinorChunk) -> MinorChunk {
        let combined_text = left
            .content
            .iter()
            .chain(right.content.iter())
            .map(|piece| piece.text.as_str())
            .filter(|text| !text.is_empty())
            .collect::<Vec<&str>>()
            .join("\n\n");

        let page_number = left
            .content
            .first()
            .and_then(|piece| piece.page_number)
            .or_else(|| right.content.first().and_then(|piece| piece.page_number));

        let tag = self.generate_meaningful_title(&combined_text);

        let mut tags = Vec::<String>::new();
        for candidate in left.tags.into_iter().chain(right.tags.into_iter()) {
            if !tags.contains(&candidate) {
                tags.push(candidate);
            }
            if tags.len() >= self.config.max_tags {
                break;
            }
        }

        MinorChunk {
            tag,
            tags,
            content: vec![ChunkText {
                text: combined_text,
                page_number,
            }],
        }
    }

    /// No TOC: one linear walk. A heading closes the buffer once it holds
    /// more than `fallback_heading_buffer_chars`; any buffer past
    /// `fallback_force_split_chars` closes regardless of headings.
    fn fallback_sections(&self, elements: &[Element], file_source: &str) -> Vec<Section> {
        let mut drafts = Vec::<SectionDraft>::new();
        let mut buffer = String::new();
        let mut start_page: Option<i64> = None;
        let mut end_page: Option<i64> = None;

        for element in elements {
            let is_heading = self.detector.detect_heading(element, None);
            if is_heading && buffer.chars().count() > self.config.fallback_heading_buffer_chars {
                push_draft(&mut drafts, &mut buffer, &mut start_page, &mut end_page);
            }

            if !buffer.is_empty() {
                buffer.push('\n');
            }
            buffer.push_str(element.text.trim());
            if start_page.is_none() {
                start_page = element.page_number;
            }
            if element.page_number.is_some() {
                end_page = element.page_number;
            }

            if buffer.chars().count() > self.config.fallback_force_split_chars {
                push_draft(&mut drafts, &mut buffer, &mut start_page, &mut end_page);
            }
        }

        push_draft(&mut drafts, &mut buffer, &mut start_page, &mut end_page);

        while drafts.len() > self.config.max_fallback_sections {
            let index = cheapest_adjacent_pair(&drafts, |draft| draft.text.chars().count());
            drafts = merge_draft_at(drafts, index);
        }

        drafts
            .into_iter()
            .map(|draft| self.materialize_draft(draft, file_source))
            .collect()
    }

    fn materialize_draft(&self, draft: SectionDraft, file_source: &str) -> Section {
        let title = self.generate_meaningful_title(&draft.text);
        let start_page = draft.start_page.unwrap_or(1);
        let end_page = draft.end_page.unwrap_or(start_page);
        let section_tags = self.tagger.generate_tags(&draft.text, Some(&title));
        let minor_tags = self.tagger.generate_tags(&draft.text, None);

        Section {
            title: title.clone(),
            start_page,
            end_page,
            file_source: file_source.to_string(),
            tags: section_tags,
            content: vec![MinorChunk {
                tag: title,
                tags: minor_tags,
                content: vec![ChunkText {
                    text: draft.text,
                    page_number: draft.start_page,
                }],
            }],
        }
    }

    /// Title preference order: a structurally heading-like sentence, then
    /// top keywords title-cased, then the first sentence truncated, then
    /// the literal fallback.
    pub(super) fn generate_meaningful_title(&self, content: &str) -> String {
        let sentences = split_sentences(content);

        for sentence in &sentences {
            let candidate = sentence.trim();
            if candidate.chars().count() > self.config.max_title_chars {
                continue;
            }
            if self.detector.is_pattern_heading(candidate)
                || self.detector.is_loose_title_candidate(candidate)
            {
                return normalize_heading_title(candidate);
            }
        }

        let keywords = self.tagger.extract_keywords(content, 3);
        if !keywords.is_empty() {
            let title = keywords
                .iter()
                .map(|keyword| title_case(keyword))
                .collect::<Vec<String>>()
                .join(" ");
            return truncate_with_ellipsis(&title, self.config.max_title_chars);
        }

        if let Some(first) = sentences.first() {
            return truncate_with_ellipsis(first.trim(), self.config.max_title_chars);
        }

        "Content Section".to_string()
    }
}

fn push_draft(
    drafts: &mut Vec<SectionDraft>,
    buffer: &mut String,
    start_page: &mut Option<i64>,
    end_page: &mut Option<i64>,
) {
    let text = buffer.trim().to_string();
    if !text.is_empty() {
        drafts.push(SectionDraft {
            text,
            start_page: *start_page,
            end_page: *end_page,
        });
    }
    buffer.clear();
    *start_page = None;
    *end_page = None;
}

fn merge_draft_at(drafts: Vec<SectionDraft>, index: usize) -> Vec<SectionDraft> {
    let mut merged = Vec::<SectionDraft>::with_capacity(drafts.len().saturating_sub(1));
    let mut pending: Option<SectionDraft> = None;

    for (position, draft) in drafts.into_iter().enumerate() {
        if position == index {
            pending = Some(draft);
        } else if position == index + 1 {
            match pending.take() {
                Some(left) => merged.push(SectionDraft {
                    text: format!("{}\n\n{}", left.text, draft.text),
                    start_page: left.start_page.or(draft.start_page),
                    end_page: draft.end_page.or(left.end_page),
                }),
                None => merged.push(draft),
            }
        } else {
            merged.push(draft);
        }
    }

    if let Some(leftover) = pending {
        merged.push(leftover);
    }

    merged
}

/// Adjacent pair with the smallest combined size; earliest pair wins ties
/// so the reduction stays deterministic.
fn cheapest_adjacent_pair<T>(items: &[T], size_of: impl Fn(&T) -> usize) -> usize {
    let mut best_index = 0usize;
    let mut best_size = usize::MAX;

    for index in 0..items.len().saturating_sub(1) {
        let combined = size_of(&items[index]) + size_of(&items[index + 1]);
        if combined < best_size {
            best_size = combined;
            best_index = index;
        }
    }

    best_index
}

pub(super) fn chunk_char_len(chunk: &MinorChunk) -> usize {
    chunk
        .content
        .iter()
        .map(|piece| piece.text.chars().count())
        .sum()
}

/// ALL-CAPS headings read better title-cased; anything else passes through.
pub(super) fn normalize_heading_title(text: &str) -> String {
    let trimmed = text.split_whitespace().collect::<Vec<&str>>().join(" ");
    let has_lowercase = trimmed.chars().any(|ch| ch.is_lowercase());
    if has_lowercase {
        return trimmed;
    }
    title_case(&trimmed)
}

pub(super) fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let lowered = word.to_lowercase();
            let mut chars = lowered.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

pub(super) fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let kept = text
        .chars()
        .take(max_chars.saturating_sub(3))
        .collect::<String>();
    format!("{}...", kept.trim_end())
}
