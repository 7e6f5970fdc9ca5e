//! # edgequake-pdf2anki
//!
//! Turn PDF study material into Anki flashcards using a chat-completion LLM.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input      validate the selected file (%PDF magic)
//!  ├─ 2. Extract    per-page text via lopdf (spawn_blocking)
//!  ├─ 3. Relevance  one-token YES/NO verdict per page
//!  ├─ 4. Cards      JSON {"cards": [{front, back}]} per relevant page
//!  └─ 5. Output     `<stem>_anki_cards.txt`, one `front;back` line per card
//! ```
//!
//! Pages are processed one at a time in document order. Both model calls are
//! wrapped in an exponential-backoff retry; a page whose calls keep failing
//! is recorded and skipped, never fatal.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2anki::{convert_to_file, load_api_key, OpenAiChat, RunConfig, DEFAULT_API_BASE};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let key = load_api_key("key.txt")?;
//!     let model = OpenAiChat::new(key, DEFAULT_API_BASE, Duration::from_secs(60))?;
//!     let config = RunConfig::default();
//!     let summary = convert_to_file("biology.pdf", &model, &config).await?;
//!     eprintln!("{} cards from {} relevant pages",
//!         summary.stats.total_cards,
//!         summary.stats.relevant_pages);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2anki` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-pdf2anki = { version = "0.1", default-features = false }
//! ```
//!
//! ## Bring Your Own Model
//!
//! Every pipeline function takes `&dyn` [`ChatModel`]. [`OpenAiChat`] talks to
//! any OpenAI-compatible `/chat/completions` endpoint; implement the trait to
//! plug in anything else (or a scripted fake in tests).

// ── Modules ──────────────────────────────────────────────────────────────

pub mod client;
pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use client::{ChatError, ChatMessage, ChatModel, ChatRequest, OpenAiChat, Role};
pub use config::{
    load_api_key, PageSelection, RetryPolicy, RunConfig, RunConfigBuilder, DEFAULT_API_BASE,
    DEFAULT_KEY_FILE, DEFAULT_MODEL,
};
pub use convert::{convert, convert_to_file, inspect, process_pages, write_cards};
pub use error::{PageError, Pdf2AnkiError};
pub use output::{
    CardBatch, DocumentMetadata, Flashcard, PageResult, RunOutput, RunStats, RunSummary,
};
pub use pipeline::extract::Page;
pub use progress::{NoopProgressCallback, ProgressCallback, RunProgressCallback};
