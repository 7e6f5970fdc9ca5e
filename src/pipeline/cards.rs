//! Card generation: turn a relevant page into flashcards.
//!
//! The model is asked for a JSON object `{"cards": [{"front", "back"}, ...]}`
//! in JSON-response mode. Parsing is split from the network call so the
//! caller can tell "bad JSON" from "JSON of the wrong shape" and so the
//! parser is testable on plain strings.

use crate::client::{ChatError, ChatMessage, ChatModel, ChatRequest};
use crate::config::RunConfig;
use crate::output::Flashcard;
use crate::pipeline::postprocess::strip_code_fences;
use crate::pipeline::retry::{with_retry, RetriesExhausted};
use crate::prompts::{cards_prompt, CARDS_SYSTEM_PROMPT};
use serde::Deserialize;
use serde_json::error::Category;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Why a card response could not be used.
#[derive(Debug, Error)]
pub enum CardParseError {
    /// The response is not JSON at all.
    #[error("response is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// The response is JSON but has no `cards` array.
    #[error("response JSON has no \"cards\" array: {0}")]
    UnexpectedShape(#[source] serde_json::Error),
}

/// Why a page produced no cards.
#[derive(Debug, Error)]
pub enum CardGenerationError {
    #[error(transparent)]
    Call(#[from] RetriesExhausted<ChatError>),

    #[error(transparent)]
    Parse(#[from] CardParseError),
}

#[derive(Deserialize)]
struct CardsEnvelope {
    cards: Vec<Value>,
}

/// Parse a card response into flashcards.
///
/// Entries without a non-empty string `front` and `back` are dropped.
pub fn parse_cards(raw: &str) -> Result<Vec<Flashcard>, CardParseError> {
    let body = strip_code_fences(raw);
    let envelope: CardsEnvelope = serde_json::from_str(body).map_err(|e| match e.classify() {
        Category::Data => CardParseError::UnexpectedShape(e),
        _ => CardParseError::InvalidJson(e),
    })?;

    let total = envelope.cards.len();
    let cards: Vec<Flashcard> = envelope
        .cards
        .iter()
        .filter_map(|entry| {
            let front = entry.get("front")?.as_str()?;
            let back = entry.get("back")?.as_str()?;
            Flashcard::new(front, back)
        })
        .collect();

    if cards.len() < total {
        debug!("Dropped {} incomplete card(s)", total - cards.len());
    }
    Ok(cards)
}

/// Ask the model for cards and parse them.
pub async fn try_generate_cards(
    model: &dyn ChatModel,
    text: &str,
    config: &RunConfig,
) -> Result<Vec<Flashcard>, CardGenerationError> {
    let request = build_request(text, config);
    let request = &request;

    let raw = with_retry(&config.retry, "cards", move || model.complete(request)).await?;
    Ok(parse_cards(&raw)?)
}

/// [`try_generate_cards`] with every failure folded into "no cards".
pub async fn generate_cards(model: &dyn ChatModel, text: &str, config: &RunConfig) -> Vec<Flashcard> {
    match try_generate_cards(model, text, config).await {
        Ok(cards) => cards,
        Err(CardGenerationError::Parse(e)) => {
            warn!("Failed to decode card response: {}", e);
            Vec::new()
        }
        Err(CardGenerationError::Call(e)) => {
            error!("Card generation failed: {}", e);
            Vec::new()
        }
    }
}

fn build_request(text: &str, config: &RunConfig) -> ChatRequest {
    let mut request = ChatRequest::new(
        config.model.clone(),
        vec![
            ChatMessage::system(CARDS_SYSTEM_PROMPT),
            ChatMessage::user(cards_prompt(text)),
        ],
    )
    .temperature(config.temperature)
    .json_response();

    if let Some(n) = config.cards_max_tokens {
        request = request.max_tokens(n);
    }
    request
}
