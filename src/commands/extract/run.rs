use std::path::Path;
use std::process::Command;

use anyhow::{Result, bail};
use chrono::Utc;
use tracing::{info, warn};

use crate::adapter::{
    DocumentAdapter, DocxAdapter, HtmlAdapter, PdfAdapter, RawDocument,
};
use crate::cache::CacheStore;
use crate::cli::{DocumentFormat, ExtractArgs, OcrMode};
use crate::config::PipelineConfig;
use crate::lang::LanguageResources;
use crate::model::{
    CacheRecord, ExtractCounts, ExtractPaths, ExtractRunManifest, Section, ToolVersions,
};
use crate::util::{ensure_directory, now_utc_string, utc_compact_string, write_json_pretty};

use super::chunker::Chunker;
use super::fonts::{HeadingDetector, annotate_font_info};
use super::normalize::normalize_elements;
use super::tags::AutoTagger;
use super::toc::TocExtractor;

pub fn run(args: ExtractArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    let cache_root = args.cache_root.clone();
    let manifest_dir = cache_root.join("manifests");
    ensure_directory(&manifest_dir)?;

    let manifest_path = args.manifest_path.clone().unwrap_or_else(|| {
        manifest_dir.join(format!("extract_run_{}.json", utc_compact_string(started_ts)))
    });

    let format = resolve_format(args.format, &args.source)?;
    let config = PipelineConfig::new()?;
    let lang = LanguageResources::new();
    let store = CacheStore::new(&cache_root);
    let key = store.key_for(&args.source);

    let output_path = args
        .output_path
        .clone()
        .unwrap_or_else(|| cache_root.join("chunks").join(&key.file_name));

    info!(
        source = %args.source,
        format = format.as_str(),
        run_id = %run_id,
        "starting extract"
    );

    let mut counts = ExtractCounts::default();
    let mut warnings = Vec::<String>::new();
    let mut cache_hit = false;

    let chunks: Vec<Section> = match (!args.no_cache).then(|| store.get(&key)).flatten() {
        Some(record) => {
            cache_hit = true;
            info!(cache_key = %key.hash, "extraction cache hit");
            record.chunks
        }
        None => {
            let chunks = run_pipeline(&args, format, &config, &lang, &mut counts, &mut warnings)?;
            if !args.no_cache {
                store.put(
                    &key,
                    &CacheRecord {
                        chunks: chunks.clone(),
                    },
                );
            }
            chunks
        }
    };

    counts.section_count = chunks.len();
    counts.minor_chunk_count = chunks.iter().map(|section| section.content.len()).sum();

    write_json_pretty(&output_path, &chunks)?;

    let updated_at = now_utc_string();
    let manifest = ExtractRunManifest {
        manifest_version: 1,
        run_id: run_id.clone(),
        status: "completed".to_string(),
        started_at,
        updated_at,
        command: render_extract_command(&args),
        source: args.source.clone(),
        format: format.as_str().to_string(),
        cache_hit,
        cache_key: key.hash.clone(),
        tool_versions: collect_tool_versions(format),
        paths: ExtractPaths {
            cache_root: cache_root.display().to_string(),
            cache_dir: store.cache_dir().display().to_string(),
            output_path: output_path.display().to_string(),
            manifest_path: manifest_path.display().to_string(),
        },
        counts,
        warnings,
    };
    write_json_pretty(&manifest_path, &manifest)?;

    info!(path = %output_path.display(), "wrote chunk output");
    info!(
        path = %manifest_path.display(),
        sections = manifest.counts.section_count,
        minor_chunks = manifest.counts.minor_chunk_count,
        cache_hit,
        "extract completed"
    );

    Ok(())
}

fn run_pipeline(
    args: &ExtractArgs,
    format: DocumentFormat,
    config: &PipelineConfig,
    lang: &LanguageResources,
    counts: &mut ExtractCounts,
    warnings: &mut Vec<String>,
) -> Result<Vec<Section>> {
    let adapter = build_adapter(format, args);
    info!(adapter = adapter.format_name(), "parsing document");
    let raw: RawDocument = adapter.parse(&args.source)?;

    counts.raw_element_count = raw.elements.len();
    counts.font_span_count = raw.font_spans.len();
    counts.ocr_page_count = raw.ocr_page_count;
    warnings.extend(raw.warnings.iter().cloned());

    let normalized = normalize_elements(&raw.elements, config);
    counts.normalized_element_count = normalized.elements.len();
    counts.footer_elements_dropped = normalized.footer_elements_dropped;

    let mut elements = normalized.elements;
    annotate_font_info(&mut elements, &raw.font_spans);

    let detector = HeadingDetector::new(config)?;
    counts.heading_count = elements
        .iter()
        .filter(|element| detector.detect_heading(element, None))
        .count();

    let toc_entries = TocExtractor::new()?.extract(&elements);
    counts.toc_entry_count = toc_entries.len();
    if toc_entries.is_empty() {
        info!("no table of contents detected, using linear fallback chunking");
    } else {
        info!(entries = toc_entries.len(), "table of contents detected");
    }

    let tagger = AutoTagger::new(lang, config);
    let chunker = Chunker::new(config, &detector, &tagger);
    let sections = chunker.build_sections(&elements, &toc_entries, &args.source);

    if sections.is_empty() {
        warn!(source = %args.source, "document produced no sections");
        warnings.push("document produced no sections".to_string());
    }

    Ok(sections)
}

fn build_adapter(format: DocumentFormat, args: &ExtractArgs) -> Box<dyn DocumentAdapter> {
    match format {
        DocumentFormat::Pdf => Box::new(PdfAdapter {
            max_pages_per_doc: args.max_pages_per_doc,
            ocr_mode: args.ocr_mode,
            ocr_lang: args.ocr_lang.clone(),
            ocr_min_text_chars: args.ocr_min_text_chars,
        }),
        DocumentFormat::Docx => Box::new(DocxAdapter),
        DocumentFormat::Html => Box::new(HtmlAdapter),
    }
}

fn resolve_format(explicit: Option<DocumentFormat>, source: &str) -> Result<DocumentFormat> {
    if let Some(format) = explicit {
        return Ok(format);
    }

    let extension = Path::new(source)
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "pdf" => Ok(DocumentFormat::Pdf),
        "docx" => Ok(DocumentFormat::Docx),
        "html" | "htm" | "xhtml" => Ok(DocumentFormat::Html),
        _ => bail!(
            "cannot infer document format for '{}'; pass --format explicitly",
            source
        ),
    }
}

fn collect_tool_versions(format: DocumentFormat) -> ToolVersions {
    let mut versions = ToolVersions {
        rustc: command_version_optional("rustc", &["--version"]),
        pdftotext: None,
        pdftohtml: None,
        pdftoppm: None,
        tesseract: None,
    };

    if format == DocumentFormat::Pdf {
        versions.pdftotext = command_version_optional("pdftotext", &["-v"]);
        versions.pdftohtml = command_version_optional("pdftohtml", &["-v"]);
        versions.pdftoppm = command_version_optional("pdftoppm", &["-v"]);
        versions.tesseract = command_version_optional("tesseract", &["--version"]);
    }

    versions
}

fn command_version_optional(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let source = if stdout.trim().is_empty() {
        stderr.trim()
    } else {
        stdout.trim()
    };

    source
        .lines()
        .next()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| line.to_string())
}

fn render_extract_command(args: &ExtractArgs) -> String {
    let mut command = vec![
        "docslicer".to_string(),
        "extract".to_string(),
        args.source.clone(),
        "--cache-root".to_string(),
        args.cache_root.display().to_string(),
    ];

    if let Some(path) = &args.output_path {
        command.push("--output-path".to_string());
        command.push(path.display().to_string());
    }
    if let Some(path) = &args.manifest_path {
        command.push("--manifest-path".to_string());
        command.push(path.display().to_string());
    }
    if let Some(format) = args.format {
        command.push("--format".to_string());
        command.push(format.as_str().to_string());
    }
    if args.no_cache {
        command.push("--no-cache".to_string());
    }
    if let Some(max_pages) = args.max_pages_per_doc {
        command.push("--max-pages-per-doc".to_string());
        command.push(max_pages.to_string());
    }
    if args.ocr_mode != OcrMode::Off {
        command.push("--ocr-mode".to_string());
        command.push(args.ocr_mode.as_str().to_string());
        command.push("--ocr-lang".to_string());
        command.push(args.ocr_lang.clone());
        command.push("--ocr-min-text-chars".to_string());
        command.push(args.ocr_min_text_chars.to_string());
    }

    command.join(" ")
}
