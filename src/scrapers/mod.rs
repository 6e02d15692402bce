//! Site scrapers.
//!
//! | Site | Module | Shape |
//! |------|--------|-------|
//! | Puzzle Society daily commuter crossword | [`crossword`] | Link-chain loop, one PDF per date, login required |
//! | AACT clinical-trial downloads | [`aact`] | Catalog loop, one zip per entry, resumable |
//! | MITRE ATT&CK tactic page | [`mitre`] | One-shot table scrape |
//!
//! The two loops are strictly sequential: one cursor is fully fetched and
//! persisted before the next begins. Both stop promptly when the shared
//! [`CancellationToken`] fires.

pub mod aact;
pub mod crossword;
pub mod mitre;

use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Run `fut` unless `cancel` fires first. `None` means cancelled.
pub(crate) async fn or_cancel<F: Future>(cancel: &CancellationToken, fut: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        out = fut => Some(out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_or_cancel_completes() {
        let cancel = CancellationToken::new();
        assert_eq!(or_cancel(&cancel, async { 7 }).await, Some(7));
    }

    #[tokio::test]
    async fn test_or_cancel_prefers_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(or_cancel(&cancel, async { 7 }).await, None);
    }
}
