//! Data types shared by the scrapers.
//!
//! - [`Action`]: what to do with an HTTP status
//! - [`HttpResponse`]: status plus body of one request
//! - [`CatalogEntry`]: one downloadable item listed on a catalog page
//! - [`TableCell`]: one scraped table cell
//! - [`ChainOutcome`] / [`ChainSummary`]: how a link-chain run ended
//! - [`CatalogSummary`]: how a catalog run ended

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reaction to an HTTP status code.
///
/// See [`crate::classify`] for the mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Use the response.
    Proceed,
    /// Known-bad resource for this cursor; move past it.
    Skip,
    /// Stop the whole run.
    Abort,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::Proceed => "continue",
            Action::Skip => "skip",
            Action::Abort => "exit",
        };
        f.write_str(s)
    }
}

/// A completed HTTP exchange.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// The URL that was requested.
    pub url: String,
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// One `(label, locator)` pair from a catalog page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Visible anchor text, e.g. `20230101_clinical.zip`.
    pub label: String,
    /// Absolute download URL.
    pub url: String,
}

/// A single `td` from a scraped table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCell {
    /// Index of the `tr` this cell belongs to, in document order.
    pub row: usize,
    /// `href` of every anchor in the cell.
    pub anchors: Vec<String>,
    /// Trimmed text content.
    pub text: String,
}

/// How a link-chain run stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainOutcome {
    /// No next link, or the next link pointed back at the current page.
    Exhausted,
    /// The iteration cap was hit; `next` is where a later run could resume.
    CapReached { next: String },
    /// A status classified as [`Action::Abort`].
    Aborted { status: u16, url: String },
    /// The first page showed the "not a member" marker.
    AuthFailed,
    /// The user pressed Ctrl-C.
    Interrupted,
}

impl ChainOutcome {
    /// Process exit status for this outcome.
    ///
    /// An aborted run exits with the HTTP status itself.
    pub fn exit_code(&self) -> i32 {
        match self {
            ChainOutcome::Exhausted | ChainOutcome::CapReached { .. } | ChainOutcome::Interrupted => 0,
            ChainOutcome::Aborted { status, .. } => i32::from(*status),
            ChainOutcome::AuthFailed => 1,
        }
    }
}

/// Result of a link-chain run.
#[derive(Debug, Clone)]
pub struct ChainSummary {
    pub outcome: ChainOutcome,
    /// Number of artifacts written.
    pub saved: usize,
    /// Locators skipped after a 500 (or a page without a payload link).
    pub skipped: Vec<String>,
    /// Every page locator requested, in order.
    pub visited: Vec<String>,
}

/// Result of a catalog run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogSummary {
    pub total: usize,
    pub downloaded: usize,
    pub already_present: usize,
    pub failed: usize,
    pub interrupted: bool,
}
