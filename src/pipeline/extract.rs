//! Per-page text extraction via lopdf.
//!
//! ## Why spawn_blocking?
//!
//! Parsing a PDF and decoding its content streams is CPU-bound and can take
//! seconds on large documents. `tokio::task::spawn_blocking` keeps that work
//! off the runtime thread.
//!
//! A page that fails to decode is logged and left out; only a document that
//! cannot be opened at all is fatal.

use crate::error::{PageError, Pdf2AnkiError};
use crate::output::DocumentMetadata;
use lopdf::{Document, Object};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

/// The text of one PDF page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// 1-indexed page number.
    pub number: u32,
    pub text: String,
}

impl Page {
    pub fn new(number: u32, text: impl Into<String>) -> Self {
        Self {
            number,
            text: text.into(),
        }
    }
}

/// Everything extraction learned about a document.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    /// Pages with non-blank text, ascending by page number.
    pub pages: Vec<Page>,
    /// Pages in the document, with or without text.
    pub page_count: usize,
    /// Pages whose text could not be decoded.
    pub errors: Vec<PageError>,
}

/// Extract the text of every page in `pdf_path`.
pub async fn extract_pages(
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<ExtractedDocument, Pdf2AnkiError> {
    let path = pdf_path.to_path_buf();
    let password = password.map(str::to_string);

    tokio::task::spawn_blocking(move || extract_pages_blocking(&path, password.as_deref()))
        .await
        .map_err(|e| Pdf2AnkiError::Internal(format!("Extraction task panicked: {}", e)))?
}

/// Blocking implementation of [`extract_pages`].
fn extract_pages_blocking(
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<ExtractedDocument, Pdf2AnkiError> {
    let document = load_document(pdf_path, password)?;
    let page_numbers: Vec<u32> = document.get_pages().into_keys().collect();
    info!("PDF loaded: {} pages", page_numbers.len());

    let mut pages = Vec::with_capacity(page_numbers.len());
    let mut errors = Vec::new();

    for number in &page_numbers {
        match document.extract_text(&[*number]) {
            Ok(text) if text.trim().is_empty() => {
                debug!("Page {}: no extractable text", number);
            }
            Ok(text) => pages.push(Page::new(*number, text)),
            Err(e) => {
                warn!("Error reading page {}: {}", number, e);
                errors.push(PageError::ExtractionFailed {
                    page: *number,
                    detail: e.to_string(),
                });
            }
        }
    }

    Ok(ExtractedDocument {
        pages,
        page_count: page_numbers.len(),
        errors,
    })
}

/// Document metadata without any model call.
pub async fn extract_metadata(
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<DocumentMetadata, Pdf2AnkiError> {
    let path = pdf_path.to_path_buf();
    let password = password.map(str::to_string);

    tokio::task::spawn_blocking(move || extract_metadata_blocking(&path, password.as_deref()))
        .await
        .map_err(|e| Pdf2AnkiError::Internal(format!("Metadata task panicked: {}", e)))?
}

fn extract_metadata_blocking(
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<DocumentMetadata, Pdf2AnkiError> {
    let document = load_document(pdf_path, password)?;
    let page_numbers: Vec<u32> = document.get_pages().into_keys().collect();
    let text_pages = page_numbers
        .iter()
        .filter(|n| {
            document
                .extract_text(&[**n])
                .map(|t| !t.trim().is_empty())
                .unwrap_or(false)
        })
        .count();

    Ok(DocumentMetadata {
        title: info_string(&document, b"Title"),
        author: info_string(&document, b"Author"),
        page_count: page_numbers.len(),
        text_pages,
        pdf_version: document.version.clone(),
        is_encrypted: document.trailer.get(b"Encrypt").is_ok(),
    })
}

/// Open a PDF, decrypting it when a password is needed.
fn load_document(pdf_path: &Path, password: Option<&str>) -> Result<Document, Pdf2AnkiError> {
    let mut document = Document::load(pdf_path).map_err(|e| {
        let detail = e.to_string();
        if detail.to_lowercase().contains("encrypt") || detail.to_lowercase().contains("password")
        {
            Pdf2AnkiError::PasswordRequired {
                path: pdf_path.to_path_buf(),
            }
        } else {
            Pdf2AnkiError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail,
            }
        }
    })?;

    if document.is_encrypted() {
        let Some(pwd) = password else {
            return Err(Pdf2AnkiError::PasswordRequired {
                path: pdf_path.to_path_buf(),
            });
        };
        document.decrypt(pwd).map_err(|e| {
            debug!("Decryption failed: {}", e);
            Pdf2AnkiError::WrongPassword {
                path: pdf_path.to_path_buf(),
            }
        })?;
    }

    Ok(document)
}

/// Read a string entry from the trailer's `/Info` dictionary.
fn info_string(document: &Document, key: &[u8]) -> Option<String> {
    let info = document.trailer.get(b"Info").ok()?;
    let dict = match info {
        Object::Reference(id) => document.get_dictionary(*id).ok()?,
        Object::Dictionary(dict) => dict,
        _ => return None,
    };
    match dict.get(key).ok()? {
        Object::String(bytes, _) => {
            let value = decode_pdf_string(bytes);
            if value.trim().is_empty() {
                None
            } else {
                Some(value)
            }
        }
        _ => None,
    }
}

/// PDF text strings are either UTF-16BE with a BOM or PDFDocEncoding.
fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}
