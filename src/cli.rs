use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "docslicer",
    version,
    about = "Local document-to-chunk extraction tooling"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Extract(ExtractArgs),
    Status(StatusArgs),
    ClearCache(ClearCacheArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    /// File path or URL string identifying the document.
    pub source: String,

    #[arg(long, default_value = ".cache/docslicer")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub output_path: Option<PathBuf>,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    #[arg(long, value_enum)]
    pub format: Option<DocumentFormat>,

    #[arg(long, default_value_t = false)]
    pub no_cache: bool,

    #[arg(long)]
    pub max_pages_per_doc: Option<usize>,

    #[arg(long, value_enum, default_value_t = OcrMode::Off)]
    pub ocr_mode: OcrMode,

    #[arg(long, default_value = "eng")]
    pub ocr_lang: String,

    #[arg(long, default_value_t = 120)]
    pub ocr_min_text_chars: usize,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Html,
}

impl DocumentFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Html => "html",
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum OcrMode {
    Off,
    Auto,
    Force,
}

impl OcrMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Auto => "auto",
            Self::Force => "force",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = ".cache/docslicer")]
    pub cache_root: PathBuf,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ClearCacheArgs {
    #[arg(long, default_value = ".cache/docslicer")]
    pub cache_root: PathBuf,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}
