//! Input resolution: validate the selected PDF and derive the card file path.
//!
//! We check existence, read permission, and the `%PDF` magic bytes up front so
//! the user gets a precise error instead of a parser failure deep in lopdf.

use crate::error::Pdf2AnkiError;
use std::io::{BufRead, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Suffix appended to the input file stem to name the card file.
pub const CARDS_FILE_SUFFIX: &str = "_anki_cards.txt";

/// Validate a local PDF path.
pub fn resolve_local(path: impl AsRef<Path>) -> Result<PathBuf, Pdf2AnkiError> {
    let path = path.as_ref().to_path_buf();

    if !path.is_file() {
        return Err(Pdf2AnkiError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(f) => {
            let mut head = Vec::with_capacity(4);
            if let Err(e) = f.take(4).read_to_end(&mut head) {
                return Err(Pdf2AnkiError::CorruptPdf {
                    path,
                    detail: e.to_string(),
                });
            }
            // Files shorter than the magic are not PDFs either.
            if head != b"%PDF" {
                let mut magic = [0u8; 4];
                magic[..head.len()].copy_from_slice(&head);
                return Err(Pdf2AnkiError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Pdf2AnkiError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(Pdf2AnkiError::FileNotFound { path });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(path)
}

/// `<dir>/<stem>_anki_cards.txt` for an input `<dir>/<stem>.pdf`.
pub fn default_output_path(pdf_path: &Path) -> PathBuf {
    let stem = pdf_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "cards".to_string());
    pdf_path.with_file_name(format!("{stem}{CARDS_FILE_SUFFIX}"))
}

/// Ask for a PDF path on the terminal.
///
/// Returns [`Pdf2AnkiError::NoInputSelected`] when stdin is not a terminal or
/// the answer is blank.
pub fn prompt_for_pdf() -> Result<PathBuf, Pdf2AnkiError> {
    let stdin = std::io::stdin();
    if !stdin.is_terminal() {
        return Err(Pdf2AnkiError::NoInputSelected);
    }

    let mut stderr = std::io::stderr();
    write!(stderr, "Select a PDF file: ").ok();
    stderr.flush().ok();

    read_selection(stdin.lock())
}

/// Parse one line of user input into a path; blank means "no file chosen".
fn read_selection(mut reader: impl BufRead) -> Result<PathBuf, Pdf2AnkiError> {
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .map_err(|e| Pdf2AnkiError::Internal(format!("Failed to read selection: {e}")))?;

    // Drag-and-drop into a terminal often quotes the path.
    let answer = line.trim().trim_matches(|c| c == '"' || c == '\'');
    if answer.is_empty() {
        return Err(Pdf2AnkiError::NoInputSelected);
    }
    Ok(PathBuf::from(answer))
}
