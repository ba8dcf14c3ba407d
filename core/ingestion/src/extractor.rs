use std::path::Path;
use std::time::Duration;

use calamine::{open_workbook_auto, Reader};
use scraper::{Html, Selector};
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::ExtractionConfig;
use crate::ocr::OcrEngine;

/// Internal failure while decoding a file. Never leaves the extractor;
/// callers only ever see placeholder text.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("PDF decode failed: {0}")]
    Pdf(String),

    #[error("spreadsheet decode failed: {0}")]
    Spreadsheet(String),

    #[error("image decode failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("{command} failed: {message}")]
    Command {
        command: &'static str,
        message: String,
    },

    #[error("{command} timed out after {secs}s")]
    Timeout { command: &'static str, secs: u64 },

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Decoder family, chosen from the file extension alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    PlainText,
    Pdf,
    /// Word-processing formats converted through pandoc; carries the input format
    Office(&'static str),
    Spreadsheet,
    Html,
    Image,
}

impl DocumentKind {
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let (_, ext) = file_name.rsplit_once('.')?;
        let kind = match ext.to_lowercase().as_str() {
            "txt" | "md" | "markdown" | "csv" | "tsv" | "json" | "log" | "xml" | "yaml" | "yml" => {
                Self::PlainText
            }
            "pdf" => Self::Pdf,
            "docx" => Self::Office("docx"),
            "odt" => Self::Office("odt"),
            "rtf" => Self::Office("rtf"),
            "epub" => Self::Office("epub"),
            "xlsx" | "xls" | "xlsm" | "ods" => Self::Spreadsheet,
            "html" | "htm" => Self::Html,
            "png" | "jpg" | "jpeg" | "gif" | "bmp" | "webp" | "tiff" | "tif" => Self::Image,
            _ => return None,
        };
        Some(kind)
    }
}

pub fn unsupported_placeholder(file_name: &str) -> String {
    format!("[Unsupported file type: {}]", file_name)
}

pub fn failure_placeholder(file_name: &str, reason: impl std::fmt::Display) -> String {
    format!("[Failed to extract text from {}: {}]", file_name, reason)
}

pub fn empty_placeholder(file_name: &str) -> String {
    format!("[No text content found in {}]", file_name)
}

/// Turns an uploaded file into plain text. Total: every input yields a
/// string, with bracketed placeholders standing in for failures.
pub struct TextExtractor {
    config: ExtractionConfig,
    ocr: OcrEngine,
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::new(ExtractionConfig::default())
    }
}

impl TextExtractor {
    pub fn new(config: ExtractionConfig) -> Self {
        let ocr = OcrEngine::new(&config.ocr_languages, config.command_timeout_secs);
        Self { config, ocr }
    }

    pub async fn extract(&self, path: &Path, file_name: &str) -> String {
        let Some(kind) = DocumentKind::from_file_name(file_name) else {
            warn!("Unsupported file type: {}", file_name);
            return unsupported_placeholder(file_name);
        };

        debug!("Extracting {} as {:?}", file_name, kind);

        let result = match kind {
            DocumentKind::PlainText => read_plain_text(path).await,
            DocumentKind::Pdf => extract_pdf(path).await,
            DocumentKind::Office(format) => {
                extract_with_pandoc(path, format, self.config.command_timeout_secs).await
            }
            DocumentKind::Spreadsheet => extract_spreadsheet(path).await,
            DocumentKind::Html => tokio::fs::read(path)
                .await
                .map(|bytes| html_to_text(&String::from_utf8_lossy(&bytes)))
                .map_err(ExtractError::from),
            DocumentKind::Image => Ok(self.ocr.recognize(path, file_name).await),
        };

        match result {
            Ok(text) if text.trim().is_empty() => empty_placeholder(file_name),
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to extract text from {}: {}", file_name, e);
                failure_placeholder(file_name, e)
            }
        }
    }

    /// Stage raw upload bytes in a temp file, extract, then remove the file.
    pub async fn extract_bytes(&self, bytes: &[u8], file_name: &str) -> String {
        let staged = match stage_upload(bytes, file_name).await {
            Ok(file) => file,
            Err(e) => {
                warn!("Failed to stage upload {}: {}", file_name, e);
                return failure_placeholder(file_name, e);
            }
        };

        let text = self.extract(staged.path(), file_name).await;

        if let Err(e) = staged.close() {
            warn!("Failed to remove temp file for {}: {}", file_name, e);
        }

        text
    }
}

/// Uploads can be tens of MiB, so the body is written through `tokio::fs`.
async fn stage_upload(bytes: &[u8], file_name: &str) -> std::io::Result<tempfile::NamedTempFile> {
    let suffix = file_name
        .rsplit_once('.')
        .map(|(_, ext)| format!(".{}", ext))
        .unwrap_or_default();

    let file = tempfile::Builder::new()
        .prefix("docnote-upload-")
        .suffix(&suffix)
        .tempfile()?;
    tokio::fs::write(file.path(), bytes).await?;
    Ok(file)
}

async fn read_plain_text(path: &Path) -> Result<String, ExtractError> {
    let bytes = tokio::fs::read(path).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

async fn extract_pdf(path: &Path) -> Result<String, ExtractError> {
    let bytes = tokio::fs::read(path).await?;
    // pdf-extract can panic on malformed input; the blocking task contains it
    tokio::task::spawn_blocking(move || {
        pdf_extract::extract_text_from_mem(&bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
    })
    .await?
}

async fn extract_with_pandoc(
    path: &Path,
    format: &'static str,
    timeout_secs: u64,
) -> Result<String, ExtractError> {
    run_cmd_with_timeout(
        "pandoc",
        Command::new("pandoc")
            .arg("-f")
            .arg(format)
            .arg("-t")
            .arg("plain")
            .arg("--wrap=none")
            .arg(path),
        timeout_secs,
    )
    .await
}

async fn extract_spreadsheet(path: &Path) -> Result<String, ExtractError> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let mut workbook =
            open_workbook_auto(&path).map_err(|e| ExtractError::Spreadsheet(e.to_string()))?;

        let mut sections = Vec::new();
        for name in workbook.sheet_names() {
            let range = workbook
                .worksheet_range(&name)
                .map_err(|e| ExtractError::Spreadsheet(e.to_string()))?;

            let rows = range.rows().map(|row| {
                row.iter()
                    .map(|cell| cell.to_string())
                    .collect::<Vec<_>>()
                    .join("\t")
            });
            sections.push(render_sheet(&name, rows));
        }

        Ok(sections.join("\n\n"))
    })
    .await?
}

/// One sheet as a heading followed by tab-separated rows. Blank rows are dropped.
pub fn render_sheet<I>(name: &str, rows: I) -> String
where
    I: IntoIterator<Item = String>,
{
    let mut out = format!("## Sheet: {}", name);
    for row in rows {
        if row.trim().is_empty() {
            continue;
        }
        out.push('\n');
        out.push_str(&row);
    }
    out
}

/// Visible text of an HTML page: title first, then body text with
/// script and style content removed.
pub fn html_to_text(raw: &str) -> String {
    let document = Html::parse_document(raw);
    let mut parts: Vec<String> = Vec::new();

    if let Ok(selector) = Selector::parse("title") {
        if let Some(title) = document.select(&selector).next() {
            let title = title.text().collect::<String>();
            let title = title.trim();
            if !title.is_empty() {
                parts.push(title.to_string());
            }
        }
    }

    let body = Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next())
        .unwrap_or_else(|| document.root_element());

    for node in body.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map(|el| matches!(el.name(), "script" | "style" | "noscript" | "head"))
                .unwrap_or(false)
        });
        if hidden {
            continue;
        }
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if !text.is_empty() {
            parts.push(text);
        }
    }

    parts.join("\n")
}

/// Run an external converter with a timeout, returning stdout as a string.
pub(crate) async fn run_cmd_with_timeout(
    command: &'static str,
    cmd: &mut Command,
    timeout_secs: u64,
) -> Result<String, ExtractError> {
    cmd.kill_on_drop(true);
    let output = tokio::time::timeout(Duration::from_secs(timeout_secs), cmd.output())
        .await
        .map_err(|_| ExtractError::Timeout {
            command,
            secs: timeout_secs,
        })?
        .map_err(|e| ExtractError::Command {
            command,
            message: e.to_string(),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ExtractError::Command {
            command,
            message: format!("exit {}: {}", output.status, stderr.trim()),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
