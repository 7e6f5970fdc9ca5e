//! Pipeline stages for PDF-to-flashcards conversion.
//!
//! Each submodule implements exactly one step, so each can be tested without
//! the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ relevance ──▶ cards ──▶ (CardBatch)
//! (path)    (lopdf)     (YES/NO)      (JSON)
//! ```
//!
//! 1. [`input`]    : validate the selected path, derive the card file name
//! 2. [`extract`]  : per-page text via lopdf, on the blocking pool
//! 3. [`relevance`]: one-token relevance verdict per page
//! 4. [`cards`]    : JSON card generation and parsing
//!
//! [`retry`] wraps both model calls; [`postprocess`] cleans responses and
//! card fields.

pub mod cards;
pub mod extract;
pub mod input;
pub mod postprocess;
pub mod relevance;
pub mod retry;
