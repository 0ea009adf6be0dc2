//! Per-format text extraction.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::LazyLock;

use calamine::{Data, Range, Reader, open_workbook_auto};
use regex::Regex;

use crate::error::DocumentError;
use crate::models::DocumentFormat;
use crate::utils::read_file_content;

static DOCX_TAB_STOPS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<w:tabs>.*?</w:tabs>").expect("valid regex"));
static DOCX_TAB: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<w:tab\b[^>]*/>").expect("valid regex"));
static DOCX_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<w:(?:br|cr)\b[^>]*/>|</w:p>").expect("valid regex"));
static XML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
static XML_ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(?:(lt|gt|quot|apos|amp)|#(x?)([0-9A-Fa-f]+));").expect("valid regex")
});

const DOCX_BODY: &str = "word/document.xml";

impl DocumentFormat {
    /// Extract the plain text of a file in this format.
    pub fn extract(&self, path: &Path, max_size: u64) -> Result<String, DocumentError> {
        match self {
            DocumentFormat::Text => read_file_content(path, max_size),
            DocumentFormat::Pdf => {
                crate::utils::check_file_size(path, max_size)?;
                extract_pdf(path)
            }
            DocumentFormat::Docx => {
                crate::utils::check_file_size(path, max_size)?;
                extract_docx(path)
            }
            DocumentFormat::Spreadsheet => {
                crate::utils::check_file_size(path, max_size)?;
                extract_spreadsheet(path)
            }
        }
    }
}

fn extract_pdf(path: &Path) -> Result<String, DocumentError> {
    // pdf-extract panics on some malformed inputs
    let result = std::panic::catch_unwind(|| pdf_extract::extract_text(path));

    match result {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(DocumentError::ExtractError {
            path: path.to_path_buf(),
            message: e.to_string(),
        }),
        Err(_) => Err(DocumentError::ExtractError {
            path: path.to_path_buf(),
            message: "PDF parser panicked".to_string(),
        }),
    }
}

fn extract_docx(path: &Path) -> Result<String, DocumentError> {
    let extract_err = |message: String| DocumentError::ExtractError {
        path: path.to_path_buf(),
        message,
    };

    let file = File::open(path).map_err(|source| DocumentError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| extract_err(e.to_string()))?;
    let mut entry = archive
        .by_name(DOCX_BODY)
        .map_err(|e| extract_err(format!("{DOCX_BODY}: {e}")))?;

    let mut xml = String::new();
    entry
        .read_to_string(&mut xml)
        .map_err(|e| extract_err(e.to_string()))?;

    Ok(docx_xml_to_text(&xml))
}

fn extract_spreadsheet(path: &Path) -> Result<String, DocumentError> {
    let extract_err = |message: String| DocumentError::ExtractError {
        path: path.to_path_buf(),
        message,
    };

    let mut workbook = open_workbook_auto(path).map_err(|e| extract_err(e.to_string()))?;
    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| extract_err(format!("sheet '{name}': {e}")))?;
        sheets.push(sheet_to_text(&name, &range));
    }

    Ok(sheets.join("\n"))
}

/// Render one worksheet as `Sheet: <name>` followed by its non-empty rows,
/// cells separated by ` | `.
fn sheet_to_text(name: &str, range: &Range<Data>) -> String {
    let mut text = format!("Sheet: {name}\n\n");
    for row in range.rows() {
        if row.iter().all(|cell| matches!(cell, Data::Empty)) {
            continue;
        }
        let cells: Vec<String> = row.iter().map(|cell| cell.to_string()).collect();
        text.push_str(&cells.join(" | "));
        text.push('\n');
    }
    text
}

/// Convert WordprocessingML body XML into plain text.
pub fn docx_xml_to_text(xml: &str) -> String {
    let text = DOCX_TAB_STOPS.replace_all(xml, "");
    let text = DOCX_TAB.replace_all(&text, "\t");
    let text = DOCX_BREAK.replace_all(&text, "\n");
    let text = XML_TAG.replace_all(&text, "");
    let text = decode_entities(&text);
    text.trim_end().to_string()
}

/// Decode entities in a single pass so an escaped `&amp;` never forms a new one.
fn decode_entities(text: &str) -> String {
    XML_ENTITY
        .replace_all(text, |caps: &regex::Captures| {
            if let Some(name) = caps.get(1) {
                return match name.as_str() {
                    "lt" => "<",
                    "gt" => ">",
                    "quot" => "\"",
                    "apos" => "'",
                    _ => "&",
                }
                .to_string();
            }
            let radix = if caps[2].is_empty() { 10 } else { 16 };
            u32::from_str_radix(&caps[3], radix)
                .ok()
                .and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_default()
        })
        .into_owned()
}
