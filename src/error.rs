//! Error types for the edgequake-pdf2anki library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Pdf2AnkiError`]: **Fatal.** The run cannot proceed at all (missing
//!   credential, bad input file, wrong password). Returned as
//!   `Err(Pdf2AnkiError)` from the top-level `convert*` functions.
//!
//! * [`PageError`]: **Non-fatal.** A single page failed (text extraction
//!   glitch, model call exhausted its retries, malformed card JSON) but the
//!   run continues with the next page. Stored inside
//!   [`crate::output::PageResult`] for the end-of-run statistics.
//!
//! Model-call and card-parsing failures have their own types
//! ([`crate::client::ChatError`], [`crate::pipeline::cards::CardParseError`])
//! because they are absorbed at the classifier / synthesizer boundary and
//! never reach the caller directly.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdf2anki library.
#[derive(Debug, Error)]
pub enum Pdf2AnkiError {
    // ── Configuration errors ──────────────────────────────────────────────
    /// The API credential file does not exist or cannot be read.
    #[error(
        "API key file '{path}' not found.\n\
Create it with your API key as its only content, or point --key-file at an existing one."
    )]
    CredentialMissing { path: PathBuf },

    /// The API credential file exists but contains only whitespace.
    #[error("API key file '{path}' is empty")]
    CredentialEmpty { path: PathBuf },

    /// The user did not choose an input document.
    #[error("No PDF file selected")]
    NoInputSelected,

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    // ── Model service errors ──────────────────────────────────────────────
    /// The HTTP client for the model service could not be constructed.
    #[error("Failed to initialise the model client: {0}")]
    ClientInit(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the card file.
    #[error("Failed to write card file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page.
///
/// Stored in [`crate::output::PageResult`]; the run always moves on to the
/// next page.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// The PDF parser could not extract text from this page.
    #[error("Page {page}: text extraction failed: {detail}")]
    ExtractionFailed { page: u32, detail: String },

    /// A model call failed on every attempt.
    #[error("Page {page}: {stage} call failed after {attempts} attempts: {detail}")]
    LlmFailed {
        page: u32,
        stage: String,
        attempts: u32,
        detail: String,
    },

    /// The card response could not be turned into flashcards.
    #[error("Page {page}: malformed card response: {detail}")]
    MalformedResponse { page: u32, detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_missing_names_the_file() {
        let e = Pdf2AnkiError::CredentialMissing {
            path: PathBuf::from("key.txt"),
        };
        let msg = e.to_string();
        assert!(msg.contains("key.txt"), "got: {msg}");
        assert!(msg.contains("--key-file"), "got: {msg}");
    }

    #[test]
    fn llm_failed_display() {
        let e = PageError::LlmFailed {
            page: 4,
            stage: "relevance".into(),
            attempts: 6,
            detail: "HTTP 503".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("Page 4"), "got: {msg}");
        assert!(msg.contains("relevance"), "got: {msg}");
        assert!(msg.contains("6 attempts"), "got: {msg}");
    }

    #[test]
    fn page_error_serialises() {
        let e = PageError::MalformedResponse {
            page: 2,
            detail: "expected value".into(),
        };
        let json = serde_json::to_string(&e).unwrap();
        assert!(json.contains("MalformedResponse"));
        let back: PageError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, e);
    }
}
