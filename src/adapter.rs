use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};
use regex::Regex;
use tracing::warn;

use crate::cli::OcrMode;
use crate::model::ElementKind;
use crate::util::non_whitespace_char_count;

/// One raw glyph run from the document renderer, before any analysis.
#[derive(Debug, Clone)]
pub struct FontSpan {
    pub text: String,
    pub font_size: f64,
    pub font_name: String,
    pub page_number: i64,
}

#[derive(Debug, Clone)]
pub struct RawElement {
    pub text: String,
    pub kind: ElementKind,
    pub page_number: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct RawDocument {
    pub elements: Vec<RawElement>,
    pub font_spans: Vec<FontSpan>,
    pub ocr_page_count: usize,
    pub warnings: Vec<String>,
}

/// Format adapters are black boxes to the pipeline: they turn a locator
/// into element-like records plus optional font spans, and nothing
/// downstream branches on the format again.
pub trait DocumentAdapter {
    fn format_name(&self) -> &'static str;
    fn parse(&self, locator: &str) -> Result<RawDocument>;
}

pub struct PdfAdapter {
    pub max_pages_per_doc: Option<usize>,
    pub ocr_mode: OcrMode,
    pub ocr_lang: String,
    pub ocr_min_text_chars: usize,
}

impl DocumentAdapter for PdfAdapter {
    fn format_name(&self) -> &'static str {
        "pdf"
    }

    fn parse(&self, locator: &str) -> Result<RawDocument> {
        let pdf_path = Path::new(locator);
        let mut pages = extract_pages_with_pdftotext(pdf_path, self.max_pages_per_doc)?;
        let mut document = RawDocument::default();

        self.apply_ocr_fallback(pdf_path, &mut pages, &mut document)?;

        for (index, page) in pages.iter().enumerate() {
            let page_number = (index + 1) as i64;
            for block in split_page_blocks(page) {
                document.elements.push(RawElement {
                    text: block,
                    kind: ElementKind::Text,
                    page_number: Some(page_number),
                });
            }
        }

        match extract_font_spans_with_pdftohtml(pdf_path, self.max_pages_per_doc) {
            Ok(spans) => document.font_spans = spans,
            Err(error) => {
                warn!(path = %pdf_path.display(), error = %error, "font span extraction failed, heading detection degrades to patterns");
                document
                    .warnings
                    .push(format!("font span extraction failed: {error}"));
            }
        }

        Ok(document)
    }
}

impl PdfAdapter {
    fn apply_ocr_fallback(
        &self,
        pdf_path: &Path,
        pages: &mut [String],
        document: &mut RawDocument,
    ) -> Result<()> {
        let candidates = collect_ocr_candidates(pages, self.ocr_mode, self.ocr_min_text_chars);
        if candidates.is_empty() {
            return Ok(());
        }

        if !command_available("pdftoppm") || !command_available("tesseract") {
            let message = format!(
                "OCR mode '{}' requested for {} pages but pdftoppm/tesseract are unavailable",
                self.ocr_mode.as_str(),
                candidates.len()
            );
            if matches!(self.ocr_mode, OcrMode::Force) {
                bail!(message);
            }
            warn!(path = %pdf_path.display(), "{message}");
            document.warnings.push(message);
            return Ok(());
        }

        for page_number in candidates {
            let page_index = page_number.saturating_sub(1);
            match extract_page_with_ocr(pdf_path, page_number, &self.ocr_lang) {
                Ok(ocr_text) => {
                    if non_whitespace_char_count(&ocr_text) == 0 {
                        continue;
                    }
                    if let Some(page) = pages.get_mut(page_index) {
                        if !page.trim().is_empty() {
                            page.push_str("\n\n");
                        }
                        page.push_str("[Image OCR]: ");
                        page.push_str(&ocr_text);
                    }
                    document.ocr_page_count += 1;
                }
                Err(error) => {
                    if matches!(self.ocr_mode, OcrMode::Force) {
                        return Err(error).with_context(|| {
                            format!(
                                "failed OCR extraction for {} page {}",
                                pdf_path.display(),
                                page_number
                            )
                        });
                    }
                    let message = format!(
                        "OCR fallback failed for {} page {}: {}",
                        pdf_path.display(),
                        page_number,
                        error
                    );
                    warn!("{message}");
                    document.warnings.push(message);
                }
            }
        }

        Ok(())
    }
}

pub struct DocxAdapter;

impl DocumentAdapter for DocxAdapter {
    fn format_name(&self) -> &'static str {
        "docx"
    }

    fn parse(&self, locator: &str) -> Result<RawDocument> {
        let docx_path = Path::new(locator);
        if !command_available("unzip") {
            bail!(
                "unzip is required to read {} but is not available",
                docx_path.display()
            );
        }

        let mut command = Command::new("unzip");
        command.arg("-p").arg(docx_path).arg("word/document.xml");
        let stdout = run_tool(command, &format!("unzip on {}", docx_path.display()))?;

        let xml = String::from_utf8_lossy(&stdout).replace('\u{0000}', "");
        parse_docx_document_xml(&xml)
    }
}

fn parse_docx_document_xml(xml: &str) -> Result<RawDocument> {
    let paragraph_regex =
        Regex::new(r"(?s)<w:p[ >].*?</w:p>").context("failed to compile docx paragraph regex")?;
    let style_regex = Regex::new(r#"<w:pStyle[^>]*w:val="([^"]+)""#)
        .context("failed to compile docx style regex")?;
    let run_regex =
        Regex::new(r"(?s)<w:t[^>]*>(.*?)</w:t>").context("failed to compile docx run regex")?;

    let mut document = RawDocument::default();

    for paragraph in paragraph_regex.find_iter(xml) {
        let body = paragraph.as_str();
        let text = run_regex
            .captures_iter(body)
            .filter_map(|captures| captures.get(1))
            .map(|value| unescape_entities(value.as_str()))
            .collect::<Vec<String>>()
            .join("");
        let text = collapse_whitespace(&text);
        if text.is_empty() {
            continue;
        }

        let style = style_regex
            .captures(body)
            .and_then(|captures| captures.get(1))
            .map(|value| value.as_str().to_ascii_lowercase())
            .unwrap_or_default();

        let kind = if style.starts_with("heading") || style == "title" {
            ElementKind::Title
        } else if style == "footer" {
            ElementKind::Footer
        } else if body.contains("<w:numPr>") {
            ElementKind::ListItem
        } else {
            ElementKind::NarrativeText
        };

        document.elements.push(RawElement {
            text,
            kind,
            page_number: None,
        });
    }

    Ok(document)
}

pub struct HtmlAdapter;

impl DocumentAdapter for HtmlAdapter {
    fn format_name(&self) -> &'static str {
        "html"
    }

    fn parse(&self, locator: &str) -> Result<RawDocument> {
        let raw = std::fs::read_to_string(locator)
            .with_context(|| format!("failed to read html source: {locator}"))?;
        parse_html_document(&raw)
    }
}

fn parse_html_document(raw: &str) -> Result<RawDocument> {
    let strip_regex = Regex::new(r"(?is)<(script|style|head)[^>]*>.*?</(script|style|head)>")
        .context("failed to compile html strip regex")?;
    let block_regex = Regex::new(r"(?is)<(h[1-6]|p|li|footer|blockquote)[^>]*>(.*?)</([a-z0-9]+)>")
        .context("failed to compile html block regex")?;
    let tag_regex = Regex::new(r"(?s)<[^>]+>").context("failed to compile html tag regex")?;

    let stripped = strip_regex.replace_all(raw, " ");
    let mut document = RawDocument::default();

    for captures in block_regex.captures_iter(&stripped) {
        let tag_name = captures
            .get(1)
            .map(|value| value.as_str().to_ascii_lowercase())
            .unwrap_or_default();
        let full = captures.get(0).map(|value| value.as_str()).unwrap_or("");
        let opening = full
            .find('>')
            .map(|end| &full[..end + 1])
            .unwrap_or("")
            .to_ascii_lowercase();
        let footer_classed = opening.contains("footer");
        let inner = captures.get(2).map(|value| value.as_str()).unwrap_or("");
        let text = collapse_whitespace(&unescape_entities(
            &tag_regex.replace_all(inner, " "),
        ));
        if text.is_empty() {
            continue;
        }

        let kind = if tag_name == "footer" || footer_classed {
            ElementKind::Footer
        } else if tag_name.starts_with('h') && tag_name.len() == 2 {
            ElementKind::Title
        } else if tag_name == "li" {
            ElementKind::ListItem
        } else {
            ElementKind::NarrativeText
        };

        document.elements.push(RawElement {
            text,
            kind,
            page_number: None,
        });
    }

    if document.elements.is_empty() {
        let text = collapse_whitespace(&unescape_entities(&tag_regex.replace_all(&stripped, " ")));
        if !text.is_empty() {
            document.elements.push(RawElement {
                text,
                kind: ElementKind::Text,
                page_number: None,
            });
        }
    }

    Ok(document)
}

/// Run an external tool to completion, mapping execution failure and
/// non-zero exit into one error carrying the tool's stderr.
fn run_tool(mut command: Command, what: &str) -> Result<Vec<u8>> {
    let output = command
        .output()
        .with_context(|| format!("failed to execute {what}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("{what} failed: {}", stderr.trim());
    }

    Ok(output.stdout)
}

fn extract_pages_with_pdftotext(
    pdf_path: &Path,
    max_pages_per_doc: Option<usize>,
) -> Result<Vec<String>> {
    let mut command = Command::new("pdftotext");
    command.arg("-enc").arg("UTF-8").arg("-f").arg("1");
    if let Some(max_pages) = max_pages_per_doc {
        command.arg("-l").arg(max_pages.to_string());
    }
    command.arg(pdf_path).arg("-");

    let stdout = run_tool(command, &format!("pdftotext on {}", pdf_path.display()))?;

    let raw = String::from_utf8_lossy(&stdout);
    let mut pages: Vec<String> = raw
        .split('\u{000C}')
        .map(|chunk| chunk.replace('\u{0000}', ""))
        .collect();

    while pages.last().is_some_and(|page| page.trim().is_empty()) {
        pages.pop();
    }

    Ok(pages)
}

fn extract_font_spans_with_pdftohtml(
    pdf_path: &Path,
    max_pages_per_doc: Option<usize>,
) -> Result<Vec<FontSpan>> {
    let mut command = Command::new("pdftohtml");
    command.arg("-xml").arg("-i").arg("-f").arg("1");
    if let Some(max_pages) = max_pages_per_doc {
        command.arg("-l").arg(max_pages.to_string());
    }
    command.arg(pdf_path).arg("-stdout");

    let stdout = run_tool(command, &format!("pdftohtml on {}", pdf_path.display()))?;
    let xml = String::from_utf8_lossy(&stdout);
    parse_font_spans_xml(&xml)
}

fn parse_font_spans_xml(xml: &str) -> Result<Vec<FontSpan>> {
    let page_regex =
        Regex::new(r#"<page number="(\d+)""#).context("failed to compile page regex")?;
    let fontspec_regex =
        Regex::new(r#"<fontspec id="(\d+)" size="(-?\d+(?:\.\d+)?)"[^>]*family="([^"]*)""#)
            .context("failed to compile fontspec regex")?;
    let text_regex = Regex::new(r#"(?s)<text[^>]*font="(\d+)"[^>]*>(.*?)</text>"#)
        .context("failed to compile text span regex")?;
    let inner_tag_regex = Regex::new(r"</?[a-zA-Z][^>]*>").context("failed to compile tag regex")?;

    let mut fonts = std::collections::HashMap::<String, (f64, String)>::new();
    let mut spans = Vec::<FontSpan>::new();
    let mut current_page = 1i64;

    // pdftohtml emits fontspec and text nodes in document order; walk the
    // stream once, tracking the enclosing page number.
    let mut events = Vec::<(usize, XmlEvent)>::new();
    for captures in page_regex.captures_iter(xml) {
        let page = captures
            .get(1)
            .and_then(|value| value.as_str().parse::<i64>().ok())
            .unwrap_or(1);
        events.push((captures.get(0).map(|m| m.start()).unwrap_or(0), XmlEvent::Page(page)));
    }
    for captures in fontspec_regex.captures_iter(xml) {
        let id = captures.get(1).map(|m| m.as_str().to_string()).unwrap_or_default();
        let size = captures
            .get(2)
            .and_then(|value| value.as_str().parse::<f64>().ok())
            .unwrap_or(0.0);
        let family = captures.get(3).map(|m| m.as_str().to_string()).unwrap_or_default();
        events.push((
            captures.get(0).map(|m| m.start()).unwrap_or(0),
            XmlEvent::FontSpec { id, size, family },
        ));
    }
    for captures in text_regex.captures_iter(xml) {
        let font_id = captures.get(1).map(|m| m.as_str().to_string()).unwrap_or_default();
        let body = captures.get(2).map(|m| m.as_str().to_string()).unwrap_or_default();
        events.push((
            captures.get(0).map(|m| m.start()).unwrap_or(0),
            XmlEvent::Text { font_id, body },
        ));
    }
    events.sort_by_key(|(offset, _)| *offset);

    for (_, event) in events {
        match event {
            XmlEvent::Page(page) => current_page = page,
            XmlEvent::FontSpec { id, size, family } => {
                fonts.insert(id, (size, family));
            }
            XmlEvent::Text { font_id, body } => {
                let Some((size, family)) = fonts.get(&font_id) else {
                    continue;
                };
                let bolded = body.contains("<b>") || body.contains("<B>");
                let text =
                    collapse_whitespace(&unescape_entities(&inner_tag_regex.replace_all(&body, " ")));
                if text.is_empty() {
                    continue;
                }

                let font_name = if bolded && !family.to_ascii_lowercase().contains("bold") {
                    format!("{family}-Bold")
                } else {
                    family.clone()
                };

                spans.push(FontSpan {
                    text,
                    font_size: *size,
                    font_name,
                    page_number: current_page,
                });
            }
        }
    }

    Ok(spans)
}

enum XmlEvent {
    Page(i64),
    FontSpec { id: String, size: f64, family: String },
    Text { font_id: String, body: String },
}

/// Rendered page image in the system temp dir, removed on drop.
struct TempImage {
    path: PathBuf,
}

impl Drop for TempImage {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

fn extract_page_with_ocr(pdf_path: &Path, page_number: usize, ocr_lang: &str) -> Result<String> {
    let image = render_page_to_png(pdf_path, page_number)?;

    // Tiny renders carry no recoverable text; skip OCR below the floor.
    let image_bytes = std::fs::metadata(&image.path)
        .map(|metadata| metadata.len())
        .unwrap_or(0);
    if image_bytes < MIN_OCR_IMAGE_BYTES {
        return Ok(String::new());
    }

    let mut command = Command::new("tesseract");
    command.arg(&image.path).arg("stdout").arg("-l").arg(ocr_lang);
    let stdout = run_tool(
        command,
        &format!("tesseract on {} page {}", pdf_path.display(), page_number),
    )?;

    Ok(String::from_utf8_lossy(&stdout)
        .replace('\u{0000}', "")
        .trim()
        .to_string())
}

fn render_page_to_png(pdf_path: &Path, page_number: usize) -> Result<TempImage> {
    let safe_stem = pdf_path
        .file_stem()
        .and_then(|value| value.to_str())
        .unwrap_or("pdf")
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '_' })
        .collect::<String>();

    let stamp = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let output_root = std::env::temp_dir().join(format!(
        "docslicer_ocr_{}_{}_{}_{}",
        safe_stem,
        std::process::id(),
        page_number,
        stamp
    ));

    let mut command = Command::new("pdftoppm");
    command
        .arg("-f")
        .arg(page_number.to_string())
        .arg("-l")
        .arg(page_number.to_string())
        .arg("-singlefile")
        .arg("-png")
        .arg(pdf_path)
        .arg(&output_root);
    run_tool(
        command,
        &format!("pdftoppm on {} page {}", pdf_path.display(), page_number),
    )?;

    let path = PathBuf::from(format!("{}.png", output_root.display()));
    if !path.exists() {
        bail!(
            "pdftoppm produced no image for {} page {}",
            pdf_path.display(),
            page_number
        );
    }

    Ok(TempImage { path })
}

const MIN_OCR_IMAGE_BYTES: u64 = 1024;

fn collect_ocr_candidates(pages: &[String], ocr_mode: OcrMode, min_text_chars: usize) -> Vec<usize> {
    match ocr_mode {
        OcrMode::Off => Vec::new(),
        OcrMode::Force => (1..=pages.len()).collect(),
        OcrMode::Auto => pages
            .iter()
            .enumerate()
            .filter_map(|(index, page)| {
                if non_whitespace_char_count(page) < min_text_chars {
                    Some(index + 1)
                } else {
                    None
                }
            })
            .collect(),
    }
}

pub fn command_available(program: &str) -> bool {
    Command::new(program).arg("--version").output().is_ok()
}

pub fn split_page_blocks(page: &str) -> Vec<String> {
    let mut blocks = Vec::<String>::new();
    let mut current = Vec::<&str>::new();

    for line in page.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(current.join("\n"));
                current.clear();
            }
            continue;
        }
        current.push(line);
    }

    if !current.is_empty() {
        blocks.push(current.join("\n"));
    }

    blocks
}

pub fn unescape_entities(raw: &str) -> String {
    raw.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace('\u{00a0}', " ")
}

pub fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<&str>>().join(" ")
}
