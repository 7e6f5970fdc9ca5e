//! Configuration types for a PDF-to-flashcards run.
//!
//! All run behaviour is controlled through [`RunConfig`], built via its
//! [`RunConfigBuilder`]. The API credential is deliberately *not* part of the
//! config: it is loaded once by [`load_api_key`] and handed to the model
//! client, so a `RunConfig` can be logged or cloned freely.

use crate::error::Pdf2AnkiError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Default chat model.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Default OpenAI-compatible API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Default credential file, relative to the working directory.
pub const DEFAULT_KEY_FILE: &str = "key.txt";

/// Configuration for one PDF-to-flashcards run.
///
/// Built via [`RunConfig::builder()`] or using [`RunConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_pdf2anki::{RetryPolicy, RunConfig};
/// use std::time::Duration;
///
/// let config = RunConfig::builder()
///     .model("gpt-4o-mini")
///     .retry(RetryPolicy::new(3, Duration::from_millis(500), 2.0))
///     .build()
///     .unwrap();
/// assert_eq!(config.retry.max_retries, 3);
/// ```
#[derive(Clone)]
pub struct RunConfig {
    /// Chat model identifier sent with every request. Default: `gpt-4o`.
    pub model: String,

    /// Sampling temperature. `None` leaves the provider default in place.
    pub temperature: Option<f32>,

    /// Retry policy shared by the relevance and card calls.
    pub retry: RetryPolicy,

    /// Characters of page text sent to the relevance check. Default: 1000.
    ///
    /// Relevance only needs a glimpse of the page; the cap bounds the cost of
    /// the cheapest call in the pipeline.
    pub relevance_excerpt_chars: usize,

    /// Output-token cap for the relevance answer. Default: 1.
    pub relevance_max_tokens: u32,

    /// Output-token cap for the card response. `None` means provider default.
    pub cards_max_tokens: Option<u32>,

    /// Page selection. Default: all pages.
    pub pages: PageSelection,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Card file path. `None` derives `<stem>_anki_cards.txt` next to the input.
    pub output_path: Option<PathBuf>,

    /// Optional per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: None,
            retry: RetryPolicy::default(),
            relevance_excerpt_chars: 1000,
            relevance_max_tokens: 1,
            cards_max_tokens: None,
            pages: PageSelection::default(),
            password: None,
            output_path: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfig")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("retry", &self.retry)
            .field("relevance_excerpt_chars", &self.relevance_excerpt_chars)
            .field("relevance_max_tokens", &self.relevance_max_tokens)
            .field("cards_max_tokens", &self.cards_max_tokens)
            .field("pages", &self.pages)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("output_path", &self.output_path)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn RunProgressCallback>"),
            )
            .finish()
    }
}

impl RunConfig {
    /// Create a new builder for `RunConfig`.
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`RunConfig`].
#[derive(Debug)]
pub struct RunConfigBuilder {
    config: RunConfig,
}

impl RunConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t.clamp(0.0, 2.0));
        self
    }

    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.config.retry = policy;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.retry.max_retries = n;
        self
    }

    pub fn relevance_excerpt_chars(mut self, n: usize) -> Self {
        self.config.relevance_excerpt_chars = n;
        self
    }

    pub fn relevance_max_tokens(mut self, n: u32) -> Self {
        self.config.relevance_max_tokens = n;
        self
    }

    pub fn cards_max_tokens(mut self, n: u32) -> Self {
        self.config.cards_max_tokens = Some(n);
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_path = Some(path.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<RunConfig, Pdf2AnkiError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(Pdf2AnkiError::InvalidConfig("Model must not be empty".into()));
        }
        c.retry.validate()?;
        if c.relevance_excerpt_chars == 0 {
            return Err(Pdf2AnkiError::InvalidConfig(
                "Relevance excerpt must be ≥ 1 character".into(),
            ));
        }
        if c.relevance_max_tokens == 0 {
            return Err(Pdf2AnkiError::InvalidConfig(
                "Relevance token cap must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Retry policy ─────────────────────────────────────────────────────────

/// Exponential-backoff schedule for model calls.
///
/// A failed call waits `initial_wait`, then `initial_wait * base`,
/// `initial_wait * base²`, … with no jitter and no cap, for at most
/// `max_retries` retries (so `max_retries + 1` attempts in total).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt. Default: 5.
    pub max_retries: u32,
    /// Wait before the first retry. Default: 1 s.
    pub initial_wait: Duration,
    /// Growth factor between consecutive waits; must be > 1. Default: 2.
    pub exponential_base: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_wait: Duration::from_secs(1),
            exponential_base: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_wait: Duration, exponential_base: f64) -> Self {
        Self {
            max_retries,
            initial_wait,
            exponential_base,
        }
    }

    /// Every wait the policy can produce, in order (`max_retries` entries).
    pub fn schedule(&self) -> Vec<Duration> {
        let mut waits = Vec::with_capacity(self.max_retries as usize);
        let mut wait = self.initial_wait;
        for _ in 0..self.max_retries {
            waits.push(wait);
            wait = self.next_wait(wait);
        }
        waits
    }

    /// The wait that follows `wait`, saturating at [`Duration::MAX`].
    pub fn next_wait(&self, wait: Duration) -> Duration {
        Duration::try_from_secs_f64(wait.as_secs_f64() * self.exponential_base)
            .unwrap_or(Duration::MAX)
    }

    pub(crate) fn validate(&self) -> Result<(), Pdf2AnkiError> {
        if self.initial_wait.is_zero() {
            return Err(Pdf2AnkiError::InvalidConfig(
                "Initial retry wait must be > 0".into(),
            ));
        }
        if !self.exponential_base.is_finite() || self.exponential_base <= 1.0 {
            return Err(Pdf2AnkiError::InvalidConfig(format!(
                "Backoff base must be a finite number > 1, got {}",
                self.exponential_base
            )));
        }
        Ok(())
    }
}

// ── Credential ───────────────────────────────────────────────────────────

/// Read the API key from a plain-text file: its whole trimmed contents.
///
/// Missing or unreadable files and whitespace-only files are fatal
/// configuration errors.
pub fn load_api_key(path: impl AsRef<Path>) -> Result<String, Pdf2AnkiError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|e| {
        debug!("Cannot read key file {}: {}", path.display(), e);
        Pdf2AnkiError::CredentialMissing {
            path: path.to_path_buf(),
        }
    })?;

    let key = raw.trim();
    if key.is_empty() {
        return Err(Pdf2AnkiError::CredentialEmpty {
            path: path.to_path_buf(),
        });
    }
    Ok(key.to_string())
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Specifies which pages of the PDF enter the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Every page (default).
    #[default]
    All,
    /// A single page (1-indexed).
    Single(u32),
    /// A contiguous range of pages (1-indexed, inclusive).
    Range(u32, u32),
    /// Specific pages (1-indexed, deduplicated).
    Set(Vec<u32>),
}

impl PageSelection {
    /// Whether 1-indexed `page` is selected.
    pub fn contains(&self, page: u32) -> bool {
        match self {
            PageSelection::All => true,
            PageSelection::Single(p) => *p == page,
            PageSelection::Range(start, end) => page >= *start && page <= *end,
            PageSelection::Set(pages) => pages.contains(&page),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_follow_the_documented_values() {
        let config = RunConfig::default();
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.relevance_excerpt_chars, 1000);
        assert_eq!(config.relevance_max_tokens, 1);
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.initial_wait, Duration::from_secs(1));
        assert_eq!(config.retry.exponential_base, 2.0);
    }

    #[test]
    fn default_schedule_doubles() {
        let waits: Vec<u64> = RetryPolicy::default()
            .schedule()
            .iter()
            .map(|d| d.as_secs())
            .collect();
        assert_eq!(waits, vec![1, 2, 4, 8, 16]);
    }

    #[test]
    fn zero_retries_has_empty_schedule() {
        let p = RetryPolicy::new(0, Duration::from_secs(1), 2.0);
        assert!(p.schedule().is_empty());
    }

    #[test]
    fn builder_rejects_base_of_one() {
        let err = RunConfig::builder()
            .retry(RetryPolicy::new(3, Duration::from_secs(1), 1.0))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("Backoff base"), "got: {err}");
    }

    #[test]
    fn builder_rejects_zero_wait() {
        let err = RunConfig::builder()
            .retry(RetryPolicy::new(3, Duration::ZERO, 2.0))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("wait"), "got: {err}");
    }

    #[test]
    fn builder_rejects_empty_model() {
        assert!(RunConfig::builder().model("  ").build().is_err());
    }

    #[test]
    fn debug_redacts_password() {
        let config = RunConfig::builder().password("hunter2").build().unwrap();
        let dbg = format!("{config:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn api_key_is_trimmed() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "  sk-test-123  ").unwrap();
        assert_eq!(load_api_key(f.path()).unwrap(), "sk-test-123");
    }

    #[test]
    fn missing_key_file_is_a_config_error() {
        let err = load_api_key("/definitely/not/here/key.txt").unwrap_err();
        assert!(matches!(err, Pdf2AnkiError::CredentialMissing { .. }));
    }

    #[test]
    fn blank_key_file_is_rejected() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "   ").unwrap();
        let err = load_api_key(f.path()).unwrap_err();
        assert!(matches!(err, Pdf2AnkiError::CredentialEmpty { .. }));
    }

    #[test]
    fn page_selection_contains() {
        assert!(PageSelection::All.contains(3));
        assert!(PageSelection::Single(2).contains(2));
        assert!(!PageSelection::Single(9).contains(3));
        assert!(PageSelection::Range(2, 10).contains(4));
        assert!(!PageSelection::Range(2, 10).contains(1));
        assert!(PageSelection::Set(vec![1, 3]).contains(3));
        assert!(!PageSelection::Set(vec![1, 3]).contains(2));
    }

    #[test]
    fn long_schedule_saturates_instead_of_overflowing() {
        let p = RetryPolicy::new(70, Duration::from_secs(1), 2.0);
        let waits = p.schedule();
        assert_eq!(waits.len(), 70);
        assert_eq!(waits[3], Duration::from_secs(8));
        assert_eq!(waits[69], Duration::MAX);
    }

    #[test]
    fn huge_base_saturates_next_wait() {
        let p = RetryPolicy::new(3, Duration::from_secs(1), 1e20);
        assert_eq!(p.next_wait(Duration::from_secs(1)), Duration::MAX);
        assert_eq!(p.next_wait(Duration::MAX), Duration::MAX);
    }
}
