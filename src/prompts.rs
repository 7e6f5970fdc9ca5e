//! Prompts for the relevance check and card generation.
//!
//! Every prompt lives here so wording changes never touch retry or parsing
//! code, and so tests can inspect the exact text sent to the model.

/// System message for the relevance check.
pub const RELEVANCE_SYSTEM_PROMPT: &str = "You are an AI assistant that determines text relevance.";

/// System message for card generation.
pub const CARDS_SYSTEM_PROMPT: &str = "You are an assistant that creates Anki flashcards.";

/// Build the relevance question for a page excerpt.
///
/// The model must answer with the single word `YES` or `NO`.
pub fn relevance_prompt(excerpt: &str) -> String {
    format!(
        r#"Analyze the following text and determine if it contains relevant, substantive content for creating flashcards.
Ignore table of contents, indexes, appendices, or pages with minimal text.
Respond with only "YES" if the content is relevant, or "NO" if it's not.

Text to analyze:
"""{excerpt}""""#
    )
}

/// Build the card-generation request for a full page.
pub fn cards_prompt(page_text: &str) -> String {
    format!(
        r#"You are an assistant that creates Anki flashcards to help memorize the content.

Please generate 3 to 8 high-quality Anki flashcards based on the following text:

"""{page_text}"""

Ensure that the cards cover key concepts and important details. The cards should be concise and clear. Please respond using JSON with the following format:

{{
    "cards": [
        {{
            "front": "Front of the card",
            "back": "Back of the card"
        }}
    ]
}}"#
    )
}

/// First `max_chars` characters of `text`, never splitting a code point.
pub fn excerpt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relevance_prompt_embeds_excerpt() {
        let p = relevance_prompt("Photosynthesis converts light");
        assert!(p.contains("\"\"\"Photosynthesis converts light\"\"\""));
        assert!(p.contains("\"YES\""));
        assert!(p.contains("\"NO\""));
    }

    #[test]
    fn cards_prompt_shows_json_shape() {
        let p = cards_prompt("Mitochondria");
        assert!(p.contains("\"cards\": ["));
        assert!(p.contains("\"front\""));
        assert!(p.contains("\"back\""));
        assert!(p.contains("3 to 8"));
        assert!(p.contains("Mitochondria"));
    }

    #[test]
    fn excerpt_counts_characters_not_bytes() {
        assert_eq!(excerpt("héllo", 2), "hé");
        assert_eq!(excerpt("short", 1000), "short");
        assert_eq!(excerpt("", 5), "");
        let long = "é".repeat(1500);
        assert_eq!(excerpt(&long, 1000).chars().count(), 1000);
    }
}
