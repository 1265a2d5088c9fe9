use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Title,
    NarrativeText,
    ListItem,
    Footer,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FontInfo {
    pub font_size: f64,
    pub is_bold: bool,
    pub body_font_size: f64,
}

/// One normalized text unit from a parsed document. Order of elements is
/// the only signal for page-range reconstruction downstream, so the
/// normalizer never reorders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Element {
    pub text: String,
    pub kind: ElementKind,
    pub page_number: Option<i64>,
    pub font_info: Option<FontInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    pub title: String,
    pub page: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkText {
    pub text: String,
    pub page_number: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinorChunk {
    pub tag: String,
    pub tags: Vec<String>,
    pub content: Vec<ChunkText>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    pub start_page: i64,
    pub end_page: i64,
    pub file_source: String,
    pub tags: Vec<String>,
    pub content: Vec<MinorChunk>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheRecord {
    pub chunks: Vec<Section>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolVersions {
    pub rustc: Option<String>,
    pub pdftotext: Option<String>,
    pub pdftohtml: Option<String>,
    pub pdftoppm: Option<String>,
    pub tesseract: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractPaths {
    pub cache_root: String,
    pub cache_dir: String,
    pub output_path: String,
    pub manifest_path: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractCounts {
    pub raw_element_count: usize,
    pub normalized_element_count: usize,
    pub footer_elements_dropped: usize,
    pub font_span_count: usize,
    pub heading_count: usize,
    pub toc_entry_count: usize,
    pub section_count: usize,
    pub minor_chunk_count: usize,
    pub ocr_page_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub command: String,
    pub source: String,
    pub format: String,
    pub cache_hit: bool,
    pub cache_key: String,
    pub tool_versions: ToolVersions,
    pub paths: ExtractPaths,
    pub counts: ExtractCounts,
    pub warnings: Vec<String>,
}
