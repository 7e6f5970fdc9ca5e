//! Post-processing: deterministic cleanup of model output and card fields.
//!
//! Two jobs:
//!
//! 1. [`strip_code_fences`]: even in JSON mode some models (and most
//!    OpenAI-compatible local servers) wrap the object in a ```` ```json ````
//!    fence. The fence is removed before parsing.
//! 2. [`format_field`]: the card file is one `front;back` record per line, so
//!    a field must never contain a raw line break, and a field containing the
//!    separator has to be quoted the way Anki's text importer expects.

use once_cell::sync::Lazy;
use regex::Regex;

/// A whole response wrapped in a fenced code block (optional language tag).
static FENCED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\A\s*```[A-Za-z0-9_-]*[ \t]*\r?\n(.*?)\r?\n?```\s*\z").expect("valid regex")
});

/// Any line-break sequence.
static LINE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r\n|\r|\n").expect("valid regex"));

/// Zero-width and BOM characters that survive copy/paste from PDFs.
const INVISIBLE: [char; 6] = ['\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}', '\u{00AD}'];

/// Remove an outer markdown code fence, if present.
pub fn strip_code_fences(input: &str) -> &str {
    match FENCED.captures(input).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str(),
        None => input.trim(),
    }
}

/// Make a card field safe for a single `front;back` line.
///
/// * line breaks become `<br>` (Anki renders fields as HTML)
/// * invisible Unicode is dropped
/// * a field containing `;` or `"` is wrapped in double quotes with inner
///   quotes doubled
///
/// Plain fields come back unchanged.
pub fn format_field(field: &str) -> String {
    let cleaned: String = field.chars().filter(|c| !INVISIBLE.contains(c)).collect();
    let cleaned = LINE_BREAK.replace_all(cleaned.trim(), "<br>");

    if cleaned.contains(';') || cleaned.contains('"') {
        format!("\"{}\"", cleaned.replace('"', "\"\""))
    } else {
        cleaned.into_owned()
    }
}
