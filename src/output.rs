//! Result types: flashcards, the per-run card batch, and run statistics.

use crate::error::PageError;
use crate::pipeline::postprocess;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A front/back question-answer pair.
///
/// Both sides are non-empty; [`Flashcard::new`] refuses anything else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    front: String,
    back: String,
}

impl Flashcard {
    /// Build a card from raw model output. Returns `None` when either side is
    /// empty after trimming.
    pub fn new(front: impl AsRef<str>, back: impl AsRef<str>) -> Option<Self> {
        let front = front.as_ref().trim();
        let back = back.as_ref().trim();
        if front.is_empty() || back.is_empty() {
            return None;
        }
        Some(Self {
            front: front.to_string(),
            back: back.to_string(),
        })
    }

    pub fn front(&self) -> &str {
        &self.front
    }

    pub fn back(&self) -> &str {
        &self.back
    }

    /// Render as one line of an Anki text import: `front;back`.
    pub fn to_line(&self) -> String {
        format!(
            "{};{}",
            postprocess::format_field(&self.front),
            postprocess::format_field(&self.back)
        )
    }
}

impl fmt::Display for Flashcard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_line())
    }
}

/// Ordered, append-only collection of every card produced in a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardBatch {
    cards: Vec<Flashcard>,
}

impl CardBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a page's cards, keeping their order.
    pub fn extend(&mut self, cards: impl IntoIterator<Item = Flashcard>) {
        self.cards.extend(cards);
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Flashcard> {
        self.cards.iter()
    }

    pub fn as_slice(&self) -> &[Flashcard] {
        &self.cards
    }

    /// The file body: one `front;back` line per card, newline-terminated.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for card in &self.cards {
            out.push_str(&card.to_line());
            out.push('\n');
        }
        out
    }
}

impl<'a> IntoIterator for &'a CardBatch {
    type Item = &'a Flashcard;
    type IntoIter = std::slice::Iter<'a, Flashcard>;

    fn into_iter(self) -> Self::IntoIter {
        self.cards.iter()
    }
}

/// What happened to one page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    /// 1-indexed page number.
    pub page_num: u32,
    /// Relevance verdict (false when the relevance call failed).
    pub relevant: bool,
    /// Cards this page contributed to the batch.
    pub cards: usize,
    pub duration_ms: u64,
    /// Non-fatal error, if any model call or parse failed.
    pub error: Option<PageError>,
}

/// Aggregate numbers for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Pages in the PDF.
    pub total_pages: usize,
    /// Pages that yielded text and were selected.
    pub text_pages: usize,
    pub relevant_pages: usize,
    /// Pages classified as not relevant (including failed checks).
    pub skipped_pages: usize,
    /// Pages with a recorded [`PageError`].
    pub failed_pages: usize,
    pub total_cards: usize,
    pub total_duration_ms: u64,
}

/// Everything a run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutput {
    pub cards: CardBatch,
    pub pages: Vec<PageResult>,
    pub stats: RunStats,
}

/// Result of [`crate::convert::convert_to_file`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Where the cards were written; `None` when there was nothing to write.
    pub output_path: Option<PathBuf>,
    pub stats: RunStats,
}

/// Document-level facts, available without any model call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub page_count: usize,
    /// Pages with non-blank extractable text.
    pub text_pages: usize,
    pub pdf_version: String,
    pub is_encrypted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_requires_both_sides() {
        assert!(Flashcard::new("Q", "A").is_some());
        assert!(Flashcard::new("", "A").is_none());
        assert!(Flashcard::new("Q", "   ").is_none());
    }

    #[test]
    fn plain_card_renders_verbatim() {
        let card = Flashcard::new("A", "B").unwrap();
        assert_eq!(card.to_line(), "A;B");
        assert_eq!(card.to_string(), "A;B");
    }

    #[test]
    fn batch_preserves_append_order() {
        let mut batch = CardBatch::new();
        batch.extend(Flashcard::new("1", "one"));
        batch.extend(vec![
            Flashcard::new("2", "two").unwrap(),
            Flashcard::new("3", "three").unwrap(),
        ]);
        let fronts: Vec<&str> = batch.iter().map(Flashcard::front).collect();
        assert_eq!(fronts, vec!["1", "2", "3"]);
        assert_eq!(batch.render(), "1;one\n2;two\n3;three\n");
    }

    #[test]
    fn empty_batch_renders_nothing() {
        let batch = CardBatch::new();
        assert!(batch.is_empty());
        assert_eq!(batch.render(), "");
    }
}
