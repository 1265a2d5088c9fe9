use regex::Regex;

use crate::adapter::{FontSpan, RawElement};
use crate::config::PipelineConfig;
use crate::lang::{LanguageResources, slugify};
use crate::model::{ChunkText, Element, ElementKind, FontInfo, MinorChunk, TocEntry};

use super::chunker::{Chunker, chunk_char_len, normalize_heading_title, truncate_with_ellipsis};
use super::fonts::{HeadingDetector, annotate_font_info, is_bold_font_name};
use super::normalize::normalize_elements;
use super::tags::{AutoTagger, split_sentences};
use super::toc::TocExtractor;

fn element(text: &str, kind: ElementKind, page: Option<i64>) -> Element {
    Element {
        text: text.to_string(),
        kind,
        page_number: page,
        font_info: None,
    }
}

fn minor(text: &str) -> MinorChunk {
    MinorChunk {
        tag: "Untitled".to_string(),
        tags: Vec::new(),
        content: vec![ChunkText {
            text: text.to_string(),
            page_number: Some(1),
        }],
    }
}

fn body_sentence(page: i64) -> String {
    format!(
        "This page {page} describes the operation of the system in considerable detail, \
         covering inputs, outputs, and the checks applied between them."
    )
}

#[test]
fn toc_extractor_returns_empty_without_marker() {
    let elements = vec![
        element("Annual Report", ElementKind::Title, Some(1)),
        element(&body_sentence(1), ElementKind::NarrativeText, Some(1)),
    ];

    let extractor = TocExtractor::new().expect("toc extractor");
    assert!(extractor.extract(&elements).is_empty());
}

#[test]
fn toc_extractor_parses_dotted_and_spaced_leaders() {
    let elements = vec![
        element("Table of Contents", ElementKind::Title, Some(1)),
        element(
            "Introduction ........ 2\nMethods and Materials    5\nResults 9",
            ElementKind::Text,
            Some(1),
        ),
    ];

    let extractor = TocExtractor::new().expect("toc extractor");
    let entries = extractor.extract(&elements);

    assert_eq!(
        entries,
        vec![
            TocEntry {
                title: "Introduction".to_string(),
                page: 2,
            },
            TocEntry {
                title: "Methods and Materials".to_string(),
                page: 5,
            },
        ]
    );
}

#[test]
fn toc_sections_follow_entry_page_ranges() {
    let config = PipelineConfig::new().expect("config");
    let lang = LanguageResources::new();
    let detector = HeadingDetector::new(&config).expect("detector");
    let tagger = AutoTagger::new(&lang, &config);
    let chunker = Chunker::new(&config, &detector, &tagger);

    let mut elements = Vec::new();
    for page in 2..=9 {
        elements.push(element(
            &body_sentence(page),
            ElementKind::NarrativeText,
            Some(page),
        ));
    }

    let toc_entries = vec![
        TocEntry {
            title: "Alpha".to_string(),
            page: 2,
        },
        TocEntry {
            title: "Beta".to_string(),
            page: 5,
        },
    ];

    let sections = chunker.build_sections(&elements, &toc_entries, "report.pdf");

    assert_eq!(sections.len(), 2);
    assert_eq!(sections[0].title, "Alpha");
    assert_eq!(sections[0].start_page, 2);
    assert_eq!(sections[0].end_page, 4);
    assert_eq!(sections[1].start_page, 5);
    assert_eq!(sections[1].end_page, 9);
    assert_eq!(sections[0].file_source, "report.pdf");
}

#[test]
fn undersized_minor_chunks_absorb_into_predecessor() {
    let config = PipelineConfig::new().expect("config");
    let lang = LanguageResources::new();
    let detector = HeadingDetector::new(&config).expect("detector");
    let tagger = AutoTagger::new(&lang, &config);
    let chunker = Chunker::new(&config, &detector, &tagger);

    let filler = "The procedure repeats until the queue drains completely. ";
    let chunks = vec![
        minor(&filler.repeat(20)),
        minor(&filler.repeat(2)),
        minor(&filler.repeat(20)),
    ];

    let merged = chunker.merge_minor_chunks(chunks);
    assert_eq!(merged.len(), 2);
    assert!(chunk_char_len(&merged[0]) > config.min_minor_chunk_chars);
}

#[test]
fn minor_chunk_count_respects_ceiling() {
    let config = PipelineConfig::new().expect("config");
    let lang = LanguageResources::new();
    let detector = HeadingDetector::new(&config).expect("detector");
    let tagger = AutoTagger::new(&lang, &config);
    let chunker = Chunker::new(&config, &detector, &tagger);

    let filler = "Observed values stay within the agreed tolerance band. ";
    let chunks = (0..8).map(|_| minor(&filler.repeat(20))).collect();

    let merged = chunker.merge_minor_chunks(chunks);
    assert_eq!(merged.len(), config.max_minor_chunks);
    for chunk in &merged {
        assert!(chunk_char_len(chunk) >= config.min_minor_chunk_chars || merged.len() == 1);
        assert_eq!(chunk.content.len(), 1);
    }
}

#[test]
fn leading_undersized_chunk_merges_into_successor() {
    let config = PipelineConfig::new().expect("config");
    let lang = LanguageResources::new();
    let detector = HeadingDetector::new(&config).expect("detector");
    let tagger = AutoTagger::new(&lang, &config);
    let chunker = Chunker::new(&config, &detector, &tagger);

    let filler = "Each retry backs off before the worker polls again. ";

    let merged = chunker.merge_minor_chunks(vec![
        minor(&filler.repeat(2)),
        minor(&filler.repeat(20)),
    ]);
    assert_eq!(merged.len(), 1);
    assert!(chunk_char_len(&merged[0]) >= config.min_minor_chunk_chars);

    let merged = chunker.merge_minor_chunks(vec![
        minor(&filler.repeat(2)),
        minor(&filler.repeat(20)),
        minor(&filler.repeat(20)),
    ]);
    assert_eq!(merged.len(), 2);
    for chunk in &merged {
        assert!(
            chunk_char_len(chunk) >= config.min_minor_chunk_chars,
            "undersized chunk ({} chars) survived among {} chunks",
            chunk_char_len(chunk),
            merged.len()
        );
    }
}

#[test]
fn size_thresholds_count_characters_not_bytes() {
    let config = PipelineConfig::new().expect("config");
    let lang = LanguageResources::new();
    let detector = HeadingDetector::new(&config).expect("detector");
    let tagger = AutoTagger::new(&lang, &config);
    let chunker = Chunker::new(&config, &detector, &tagger);

    // 799 two-byte chars: under the floor by characters, over it by bytes.
    let short = "é".repeat(799);
    assert_eq!(chunk_char_len(&minor(&short)), 799);

    let merged = chunker.merge_minor_chunks(vec![minor(&short), minor(&"é".repeat(900))]);
    assert_eq!(merged.len(), 1);
}

#[test]
fn heading_only_section_emits_stub_chunk() {
    let config = PipelineConfig::new().expect("config");
    let lang = LanguageResources::new();
    let detector = HeadingDetector::new(&config).expect("detector");
    let tagger = AutoTagger::new(&lang, &config);
    let chunker = Chunker::new(&config, &detector, &tagger);

    let heading = element("BACKGROUND", ElementKind::Text, Some(2));
    let gathered = vec![&heading];

    let chunks = chunker.split_minor_chunks(&gathered, "Other Section", 2);
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].content[0].text, "BACKGROUND");
    assert_eq!(chunks[0].tag, "Background");
    assert_eq!(chunks[0].content[0].page_number, Some(2));
}

#[test]
fn degenerate_section_synthesizes_single_chunk() {
    let config = PipelineConfig::new().expect("config");
    let lang = LanguageResources::new();
    let detector = HeadingDetector::new(&config).expect("detector");
    let tagger = AutoTagger::new(&lang, &config);
    let chunker = Chunker::new(&config, &detector, &tagger);

    let chunks = chunker.split_minor_chunks(&[], "Scope", 4);
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].content[0].text, "Scope");
    assert_eq!(chunks[0].content[0].page_number, Some(4));
}

#[test]
fn fallback_mode_emits_single_section_for_short_documents() {
    let config = PipelineConfig::new().expect("config");
    let lang = LanguageResources::new();
    let detector = HeadingDetector::new(&config).expect("detector");
    let tagger = AutoTagger::new(&lang, &config);
    let chunker = Chunker::new(&config, &detector, &tagger);

    let elements = vec![
        element(
            "The quick brown fox jumps over the lazy dog.",
            ElementKind::NarrativeText,
            None,
        ),
        element("It was a sunny day.", ElementKind::NarrativeText, None),
    ];

    let sections = chunker.build_sections(&elements, &[], "notes.html");
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].content.len(), 1);
    assert_eq!(
        sections[0].content[0].content[0].text,
        "The quick brown fox jumps over the lazy dog.\nIt was a sunny day."
    );
    assert_eq!(sections[0].start_page, 1);
}

#[test]
fn fallback_sections_merge_down_to_ceiling() {
    let config = PipelineConfig::new().expect("config");
    let lang = LanguageResources::new();
    let detector = HeadingDetector::new(&config).expect("detector");
    let tagger = AutoTagger::new(&lang, &config);
    let chunker = Chunker::new(&config, &detector, &tagger);

    let filler =
        "The methodology section discusses observed results and their analysis in depth. ";
    let elements = (0..25)
        .map(|index| {
            element(
                filler.repeat(40).trim(),
                ElementKind::NarrativeText,
                Some(index + 1),
            )
        })
        .collect::<Vec<Element>>();

    let sections = chunker.build_sections(&elements, &[], "long.pdf");
    assert!(sections.len() <= config.max_fallback_sections);
    assert_eq!(sections.len(), config.max_fallback_sections);
}

#[test]
fn introduction_scenario_produces_titled_section() {
    let config = PipelineConfig::new().expect("config");
    let lang = LanguageResources::new();
    let detector = HeadingDetector::new(&config).expect("detector");
    let tagger = AutoTagger::new(&lang, &config);
    let chunker = Chunker::new(&config, &detector, &tagger);

    let mut heading = element("INTRODUCTION", ElementKind::Title, Some(1));
    heading.font_info = Some(FontInfo {
        font_size: 14.0,
        is_bold: true,
        body_font_size: 10.0,
    });
    let body = element(
        "This system does X. It also does Y.",
        ElementKind::NarrativeText,
        Some(1),
    );

    assert!(detector.detect_heading(&heading, None));

    let sections = chunker.build_sections(&[heading, body], &[], "intro.pdf");
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].title, "Introduction");
    assert_eq!(sections[0].start_page, 1);
}

#[test]
fn font_rule_requires_bold_and_strictly_larger_size() {
    let config = PipelineConfig::new().expect("config");
    let detector = HeadingDetector::new(&config).expect("detector");

    let mut equal_size = element("Operating Notes", ElementKind::Text, Some(1));
    equal_size.font_info = Some(FontInfo {
        font_size: 12.0,
        is_bold: true,
        body_font_size: 12.0,
    });
    assert!(!detector.detect_heading(&equal_size, None));

    let mut larger_bold = element("Operating Notes", ElementKind::Text, Some(1));
    larger_bold.font_info = Some(FontInfo {
        font_size: 12.5,
        is_bold: true,
        body_font_size: 12.0,
    });
    assert!(detector.detect_heading(&larger_bold, None));

    let mut larger_regular = element("Operating Notes", ElementKind::Text, Some(1));
    larger_regular.font_info = Some(FontInfo {
        font_size: 14.0,
        is_bold: false,
        body_font_size: 10.0,
    });
    assert!(!detector.detect_heading(&larger_regular, None));
}

#[test]
fn section_title_text_is_never_a_heading() {
    let config = PipelineConfig::new().expect("config");
    let detector = HeadingDetector::new(&config).expect("detector");

    let title_echo = element("Introduction", ElementKind::Title, Some(2));
    assert!(!detector.detect_heading(&title_echo, Some("Introduction")));
    assert!(detector.detect_heading(&title_echo, Some("Another Section")));
}

#[test]
fn pattern_heading_rules_cover_expected_shapes() {
    let config = PipelineConfig::new().expect("config");
    let detector = HeadingDetector::new(&config).expect("detector");

    assert!(detector.is_pattern_heading("SYSTEM REQUIREMENTS"));
    assert!(detector.is_pattern_heading("1. Overview of the System"));
    assert!(detector.is_pattern_heading("IV. Results"));
    assert!(detector.is_pattern_heading("A. Background Material"));
    assert!(detector.is_pattern_heading("Risk Management Strategy"));

    assert!(!detector.is_pattern_heading("3.14"));
    assert!(!detector.is_pattern_heading("ok"));
    assert!(!detector.is_pattern_heading("This sentence ends with a period."));
    assert!(!detector.is_pattern_heading(
        "This Particular Phrase Keeps Going On And On Far Beyond What Any Reasonable Heading Would Ever Contain Today"
    ));
}

#[test]
fn font_annotation_picks_largest_matching_span() {
    let mut elements = vec![element(
        "Risk Management Overview",
        ElementKind::Text,
        Some(1),
    )];

    let spans = vec![
        FontSpan {
            text: "Risk Management Overview".to_string(),
            font_size: 16.0,
            font_name: "Helvetica-Bold".to_string(),
            page_number: 1,
        },
        FontSpan {
            text: "Risk".to_string(),
            font_size: 11.0,
            font_name: "Helvetica".to_string(),
            page_number: 1,
        },
        FontSpan {
            text: "unrelated body copy".to_string(),
            font_size: 10.0,
            font_name: "Helvetica".to_string(),
            page_number: 1,
        },
        FontSpan {
            text: "more body copy".to_string(),
            font_size: 10.0,
            font_name: "Helvetica".to_string(),
            page_number: 1,
        },
    ];

    annotate_font_info(&mut elements, &spans);

    let font_info = elements[0].font_info.expect("font info");
    assert_eq!(font_info.font_size, 16.0);
    assert!(font_info.is_bold);
    assert_eq!(font_info.body_font_size, 10.5);
}

#[test]
fn bold_detection_matches_common_font_names() {
    assert!(is_bold_font_name("Arial-BoldMT"));
    assert!(is_bold_font_name("Roboto-Black"));
    assert!(is_bold_font_name("Inter-SemiBold"));
    assert!(is_bold_font_name("Futura-Demi"));
    assert!(!is_bold_font_name("Helvetica"));
    assert!(!is_bold_font_name("Times-Italic"));
}

#[test]
fn normalizer_drops_footers_and_boilerplate() {
    let config = PipelineConfig::new().expect("config");

    let raw = vec![
        RawElement {
            text: "Example Corp internal newsletter".to_string(),
            kind: ElementKind::Footer,
            page_number: Some(1),
        },
        RawElement {
            text: "Page 3 of 10".to_string(),
            kind: ElementKind::Text,
            page_number: Some(3),
        },
        RawElement {
            text: "© 2024 Example Corp".to_string(),
            kind: ElementKind::Text,
            page_number: Some(3),
        },
        RawElement {
            text: "Real narrative content that survives filtering.".to_string(),
            kind: ElementKind::NarrativeText,
            page_number: Some(3),
        },
    ];

    let outcome = normalize_elements(&raw, &config);
    assert_eq!(outcome.elements.len(), 1);
    assert_eq!(outcome.footer_elements_dropped, 3);
    assert_eq!(
        outcome.elements[0].text,
        "Real narrative content that survives filtering."
    );
    assert_eq!(outcome.elements[0].page_number, Some(3));
}

#[test]
fn tags_are_slugs_capped_at_three() {
    let config = PipelineConfig::new().expect("config");
    let lang = LanguageResources::new();
    let tagger = AutoTagger::new(&lang, &config);

    let content = "The methodology relies on careful analysis. The methodology is repeated \
                   for every cohort, and the analysis is archived for review.";
    let tags = tagger.generate_tags(content, Some("Risk Management Strategy"));

    assert_eq!(tags, vec!["risk", "management", "strategy"]);

    let slug_shape = Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").expect("slug regex");
    for tag in &tags {
        assert!(slug_shape.is_match(tag), "tag not slug shaped: {tag}");
        assert!(!lang.is_generic_tag(tag));
        assert!(tag.len() >= 3);
    }
}

#[test]
fn generic_and_short_tags_are_pruned() {
    let config = PipelineConfig::new().expect("config");
    let lang = LanguageResources::new();
    let tagger = AutoTagger::new(&lang, &config);

    let tags = tagger.generate_tags("data data data data.", Some("Data Page"));
    assert!(tags.is_empty());
}

#[test]
fn repeated_domain_terms_become_tags() {
    let config = PipelineConfig::new().expect("config");
    let lang = LanguageResources::new();
    let tagger = AutoTagger::new(&lang, &config);

    let content = "Summary of the quarter. The summary covers staffing and budget.";
    let tags = tagger.generate_tags(content, None);
    assert!(tags.contains(&"summary".to_string()));
    assert!(tags.len() <= config.max_tags);
}

#[test]
fn keyword_extraction_needs_three_candidate_words() {
    let config = PipelineConfig::new().expect("config");
    let lang = LanguageResources::new();
    let tagger = AutoTagger::new(&lang, &config);

    assert!(tagger.extract_keywords("Hello world.", 4).is_empty());
    assert!(!tagger
        .extract_keywords(
            "Hydraulic pumps move coolant through the reactor loop continuously.",
            4
        )
        .is_empty());
}

#[test]
fn title_generation_is_deterministic() {
    let config = PipelineConfig::new().expect("config");
    let lang = LanguageResources::new();
    let detector = HeadingDetector::new(&config).expect("detector");
    let tagger = AutoTagger::new(&lang, &config);
    let chunker = Chunker::new(&config, &detector, &tagger);

    let content = "INTRODUCTION\nThis system does X. It also does Y.";
    let first = chunker.generate_meaningful_title(content);
    let second = chunker.generate_meaningful_title(content);

    assert_eq!(first, "Introduction");
    assert_eq!(first, second);
}

#[test]
fn title_generation_falls_back_in_order() {
    let config = PipelineConfig::new().expect("config");
    let lang = LanguageResources::new();
    let detector = HeadingDetector::new(&config).expect("detector");
    let tagger = AutoTagger::new(&lang, &config);
    let chunker = Chunker::new(&config, &detector, &tagger);

    assert_eq!(chunker.generate_meaningful_title(""), "Content Section");

    let keyword_title = chunker.generate_meaningful_title(
        "the turbine bearing overheated during the sustained turbine load test while the \
         bearing temperature sensors logged a steady climb past the allowed bearing limit.",
    );
    assert!(!keyword_title.is_empty());
    assert!(keyword_title.len() <= config.max_title_chars);
}

#[test]
fn split_sentences_handles_terminators_and_newlines() {
    let sentences = split_sentences("One two. Three four? Five\nSix");
    assert_eq!(sentences, vec!["One two.", "Three four?", "Five", "Six"]);
}

#[test]
fn heading_titles_normalize_all_caps() {
    assert_eq!(normalize_heading_title("SYSTEM   OVERVIEW"), "System Overview");
    assert_eq!(normalize_heading_title("Mixed Case Title"), "Mixed Case Title");
}

#[test]
fn truncation_appends_ellipsis_only_when_needed() {
    assert_eq!(truncate_with_ellipsis("short title", 60), "short title");

    let long = "x".repeat(100);
    let truncated = truncate_with_ellipsis(&long, 60);
    assert!(truncated.ends_with("..."));
    assert!(truncated.chars().count() <= 60);
}

#[test]
fn slugify_produces_lower_kebab_case() {
    assert_eq!(slugify("Risk Management"), "risk-management");
    assert_eq!(slugify("  A/B Testing!  "), "a-b-testing");
    assert_eq!(slugify("---"), "");
}
