//! Progress-callback trait for per-page run events.
//!
//! Inject an [`Arc<dyn RunProgressCallback>`] via
//! [`crate::config::RunConfigBuilder::progress_callback`] to receive events as
//! the pipeline walks the document. The CLI uses it to drive its progress bar;
//! library callers can forward events wherever they like.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdf2anki::{RunConfig, RunProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CardCounter {
//!     cards: AtomicUsize,
//! }
//!
//! impl RunProgressCallback for CardCounter {
//!     fn on_page_complete(&self, _page_num: u32, _total_pages: usize, cards: usize) {
//!         self.cards.fetch_add(cards, Ordering::SeqCst);
//!     }
//! }
//!
//! let counter = Arc::new(CardCounter { cards: AtomicUsize::new(0) });
//! let config = RunConfig::builder()
//!     .progress_callback(counter as Arc<dyn RunProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::output::RunStats;
use std::sync::Arc;

/// Called by the pipeline as it processes each page.
///
/// Pages are processed strictly in order, one at a time, so events for page
/// `n` always precede events for page `n + 1`. All methods default to no-ops.
pub trait RunProgressCallback: Send + Sync {
    /// Called once after extraction, before the first model call.
    ///
    /// `total_pages` counts pages that yielded text and are selected.
    fn on_run_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called just before the relevance check of a page.
    fn on_page_start(&self, page_num: u32, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called with the relevance verdict of a page.
    fn on_page_classified(&self, page_num: u32, relevant: bool) {
        let _ = (page_num, relevant);
    }

    /// Called when a page is finished, with the number of cards it added
    /// (0 for skipped pages).
    fn on_page_complete(&self, page_num: u32, total_pages: usize, cards: usize) {
        let _ = (page_num, total_pages, cards);
    }

    /// Called when a model call for the page failed for good or its card
    /// response was malformed. `on_page_complete` still follows.
    fn on_page_error(&self, page_num: u32, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once after every page has been attempted.
    fn on_run_complete(&self, stats: &RunStats) {
        let _ = stats;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl RunProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::RunConfig`].
pub type ProgressCallback = Arc<dyn RunProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        relevant: AtomicUsize,
        cards: AtomicUsize,
        errors: AtomicUsize,
    }

    impl RunProgressCallback for TrackingCallback {
        fn on_page_start(&self, _page_num: u32, _total_pages: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_classified(&self, _page_num: u32, relevant: bool) {
            if relevant {
                self.relevant.fetch_add(1, Ordering::SeqCst);
            }
        }

        fn on_page_complete(&self, _page_num: u32, _total_pages: usize, cards: usize) {
            self.cards.fetch_add(cards, Ordering::SeqCst);
        }

        fn on_page_error(&self, _page_num: u32, _total_pages: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_run_start(5);
        cb.on_page_start(1, 5);
        cb.on_page_classified(1, true);
        cb.on_page_complete(1, 5, 4);
        cb.on_page_error(2, 5, "boom");
        cb.on_run_complete(&RunStats::default());
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_page_start(1, 2);
        tracker.on_page_classified(1, true);
        tracker.on_page_complete(1, 2, 3);
        tracker.on_page_start(2, 2);
        tracker.on_page_classified(2, false);
        tracker.on_page_error(2, 2, "relevance call failed");
        tracker.on_page_complete(2, 2, 0);

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.relevant.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.cards.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
    }
}
