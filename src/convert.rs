//! Run orchestration: extraction → relevance → cards → card file.
//!
//! Pages are handled strictly in document order, one at a time: each page's
//! relevance call and card call (retries included) finish before the next
//! page starts, so the card file mirrors the document's order. Model failures
//! never abort the run; they are recorded per page and the loop moves on.

use crate::client::ChatModel;
use crate::config::RunConfig;
use crate::error::{PageError, Pdf2AnkiError};
use crate::output::{CardBatch, DocumentMetadata, PageResult, RunOutput, RunStats, RunSummary};
use crate::pipeline::cards::{try_generate_cards, CardGenerationError};
use crate::pipeline::extract::{self, Page};
use crate::pipeline::input;
use crate::pipeline::relevance::check_relevance;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Turn a PDF into flashcards, without writing anything.
///
/// # Errors
/// Returns `Err(Pdf2AnkiError)` only for fatal problems with the input
/// (not found, not a PDF, corrupt, password). Model failures are recorded in
/// the returned [`RunOutput`] instead.
pub async fn convert(
    input_path: impl AsRef<Path>,
    model: &dyn ChatModel,
    config: &RunConfig,
) -> Result<RunOutput, Pdf2AnkiError> {
    let total_start = Instant::now();
    let pdf_path = input::resolve_local(input_path)?;
    info!("Starting run: {}", pdf_path.display());

    let extracted = extract::extract_pages(&pdf_path, config.password.as_deref()).await?;
    let pages: Vec<Page> = extracted
        .pages
        .into_iter()
        .filter(|p| config.pages.contains(p.number))
        .collect();
    info!(
        "{} of {} pages have text and are selected",
        pages.len(),
        extracted.page_count
    );

    let mut output = process_pages(model, &pages, config).await;

    // Pages whose text could not be read still show up in the report.
    for err in extracted.errors {
        if let PageError::ExtractionFailed { page, .. } = &err {
            if !config.pages.contains(*page) {
                continue;
            }
            output.pages.push(PageResult {
                page_num: *page,
                relevant: false,
                cards: 0,
                duration_ms: 0,
                error: Some(err.clone()),
            });
            output.stats.failed_pages += 1;
        }
    }
    output.pages.sort_by_key(|p| p.page_num);
    output.stats.total_pages = extracted.page_count;
    output.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;

    Ok(output)
}

/// Run the relevance/card loop over already-extracted pages.
///
/// `pages` must be in ascending page order; the card batch follows it.
pub async fn process_pages(model: &dyn ChatModel, pages: &[Page], config: &RunConfig) -> RunOutput {
    let run_start = Instant::now();
    let total = pages.len();
    let mut batch = CardBatch::new();
    let mut results = Vec::with_capacity(total);

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_start(total);
    }

    for page in pages {
        let result = process_page(model, page, total, config, &mut batch).await;
        results.push(result);
    }

    let relevant_pages = results.iter().filter(|r| r.relevant).count();
    let stats = RunStats {
        total_pages: total,
        text_pages: total,
        relevant_pages,
        skipped_pages: total - relevant_pages,
        failed_pages: results.iter().filter(|r| r.error.is_some()).count(),
        total_cards: batch.len(),
        total_duration_ms: run_start.elapsed().as_millis() as u64,
    };

    info!(
        "Run complete: {} cards from {}/{} relevant pages",
        stats.total_cards, stats.relevant_pages, total
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_complete(&stats);
    }

    RunOutput {
        cards: batch,
        pages: results,
        stats,
    }
}

/// Classify one page and, when relevant, append its cards to `batch`.
async fn process_page(
    model: &dyn ChatModel,
    page: &Page,
    total: usize,
    config: &RunConfig,
    batch: &mut CardBatch,
) -> PageResult {
    let start = Instant::now();
    let page_num = page.number;
    let cb = config.progress_callback.as_ref();

    if let Some(cb) = cb {
        cb.on_page_start(page_num, total);
    }

    info!("Checking relevance of page {}...", page_num);
    let mut page_error = None;
    let relevant = match check_relevance(model, &page.text, config).await {
        Ok(relevant) => relevant,
        Err(e) => {
            error!("Page {}: relevance check failed, skipping: {}", page_num, e);
            page_error = Some(PageError::LlmFailed {
                page: page_num,
                stage: "relevance".to_string(),
                attempts: e.attempts,
                detail: e.last_error.to_string(),
            });
            false
        }
    };

    if let Some(cb) = cb {
        cb.on_page_classified(page_num, relevant);
    }

    let mut produced = 0;
    if relevant {
        info!("Processing page {}...", page_num);
        match try_generate_cards(model, &page.text, config).await {
            Ok(cards) => {
                produced = cards.len();
                debug!("Page {}: {} cards", page_num, produced);
                batch.extend(cards);
            }
            Err(CardGenerationError::Parse(e)) => {
                warn!("Page {}: failed to decode card response: {}", page_num, e);
                page_error = Some(PageError::MalformedResponse {
                    page: page_num,
                    detail: e.to_string(),
                });
            }
            Err(CardGenerationError::Call(e)) => {
                error!("Page {}: card generation failed: {}", page_num, e);
                page_error = Some(PageError::LlmFailed {
                    page: page_num,
                    stage: "cards".to_string(),
                    attempts: e.attempts,
                    detail: e.last_error.to_string(),
                });
            }
        }
    } else {
        info!("Skipping page {} as it seems irrelevant.", page_num);
    }

    if let Some(cb) = cb {
        if let Some(ref e) = page_error {
            cb.on_page_error(page_num, total, &e.to_string());
        }
        cb.on_page_complete(page_num, total, produced);
    }

    PageResult {
        page_num,
        relevant,
        cards: produced,
        duration_ms: start.elapsed().as_millis() as u64,
        error: page_error,
    }
}

/// Run [`convert`] and write the cards next to the input.
///
/// The file is `<stem>_anki_cards.txt` beside the PDF unless
/// [`RunConfig::output_path`] says otherwise. When no card was produced
/// nothing is written and [`RunSummary::output_path`] is `None`.
pub async fn convert_to_file(
    input_path: impl AsRef<Path>,
    model: &dyn ChatModel,
    config: &RunConfig,
) -> Result<RunSummary, Pdf2AnkiError> {
    let input_path = input_path.as_ref();
    let output = convert(input_path, model, config).await?;

    if output.cards.is_empty() {
        info!("No relevant content found to generate Anki cards.");
        return Ok(RunSummary {
            output_path: None,
            stats: output.stats,
        });
    }

    let path = config
        .output_path
        .clone()
        .unwrap_or_else(|| input::default_output_path(input_path));
    write_cards(&path, &output.cards).await?;
    info!("Anki cards have been saved to {}", path.display());

    Ok(RunSummary {
        output_path: Some(path),
        stats: output.stats,
    })
}

/// Write a card batch as UTF-8 `front;back` lines, replacing any existing
/// file.
///
/// Uses a temp sibling + rename so an interrupted write never leaves a
/// truncated card file behind.
pub async fn write_cards(path: &Path, cards: &CardBatch) -> Result<(), Pdf2AnkiError> {
    let write_err = |source| Pdf2AnkiError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = tmp_sibling(path);
    tokio::fs::write(&tmp_path, cards.render())
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    Ok(())
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Extract PDF metadata without any model call or API key.
pub async fn inspect(
    input_path: impl AsRef<Path>,
    password: Option<&str>,
) -> Result<DocumentMetadata, Pdf2AnkiError> {
    let pdf_path = input::resolve_local(input_path)?;
    extract::extract_metadata(&pdf_path, password).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::Flashcard;

    #[test]
    fn tmp_sibling_appends_suffix() {
        assert_eq!(
            tmp_sibling(Path::new("/a/b_anki_cards.txt")),
            PathBuf::from("/a/b_anki_cards.txt.tmp")
        );
    }

    #[tokio::test]
    async fn write_cards_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deck_anki_cards.txt");
        std::fs::write(&path, "stale;content\nmore;stale\n").unwrap();

        let mut batch = CardBatch::new();
        batch.extend(Flashcard::new("Q", "A"));
        write_cards(&path, &batch).await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "Q;A\n");
        assert!(!tmp_sibling(&path).exists());
    }

    #[tokio::test]
    async fn write_cards_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/nested/cards.txt");
        let mut batch = CardBatch::new();
        batch.extend(Flashcard::new("Q", "A"));
        write_cards(&path, &batch).await.unwrap();
        assert!(path.exists());
    }
}
