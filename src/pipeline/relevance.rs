//! Relevance check: is this page worth turning into flashcards?
//!
//! Tables of contents, indexes and near-empty pages waste card-generation
//! calls. The model sees only the first `relevance_excerpt_chars` characters
//! and may answer with a single token.

use crate::client::{ChatError, ChatMessage, ChatModel, ChatRequest};
use crate::config::RunConfig;
use crate::pipeline::retry::{with_retry, RetriesExhausted};
use crate::prompts::{excerpt, relevance_prompt, RELEVANCE_SYSTEM_PROMPT};
use tracing::{debug, error};

/// Ask the model whether `text` is relevant.
///
/// Returns `Err` only when every attempt failed.
pub async fn check_relevance(
    model: &dyn ChatModel,
    text: &str,
    config: &RunConfig,
) -> Result<bool, RetriesExhausted<ChatError>> {
    let request = build_request(text, config);
    let request = &request;

    let answer = with_retry(&config.retry, "relevance", move || model.complete(request)).await?;
    let relevant = is_yes(&answer);
    debug!("Relevance answer {:?} → {}", answer, relevant);
    Ok(relevant)
}

/// [`check_relevance`] with failures folded into "not relevant".
pub async fn is_relevant(model: &dyn ChatModel, text: &str, config: &RunConfig) -> bool {
    match check_relevance(model, text, config).await {
        Ok(relevant) => relevant,
        Err(e) => {
            error!("Relevance check failed, treating page as not relevant: {}", e);
            false
        }
    }
}

fn build_request(text: &str, config: &RunConfig) -> ChatRequest {
    let excerpt = excerpt(text, config.relevance_excerpt_chars);
    ChatRequest::new(
        config.model.clone(),
        vec![
            ChatMessage::system(RELEVANCE_SYSTEM_PROMPT),
            ChatMessage::user(relevance_prompt(excerpt)),
        ],
    )
    .max_tokens(config.relevance_max_tokens)
    .temperature(config.temperature)
}

/// `true` iff the answer is exactly `YES` after trimming and uppercasing.
pub fn is_yes(answer: &str) -> bool {
    answer.trim().to_uppercase() == "YES"
}
