//! Puzzle Society daily commuter crossword downloader.
//!
//! Logs in, then walks the site's own "next puzzle" links from a start date,
//! saving one PDF per date as `tmdcp<yyyymmdd>.pdf`.
//!
//! # Page chain
//!
//! Every date has a page at `/daily-commuter/yyyy/mm/dd`. Each puzzle page
//! links to its PDF (`a[target="_new"]`) and to the next puzzle page
//! (`a[title="Play next puzzle."]`). Sundays have no puzzle and the next
//! links step over them, so the date of each visited page is read back from
//! the next link rather than incremented locally.
//!
//! The only local increments happen on a skip: a 500 for a page or PDF (the
//! server returns 500 for a handful of dates in May 2011), or a page with no
//! PDF link.
//!
//! # Stopping
//!
//! - no next link, or a next link to the same page: sequence exhausted
//! - next link not later than the current date: treated as exhausted
//! - a skip past the upper date bound: exhausted
//! - `max_puzzles` PDFs saved: cap reached, the next page is reported
//! - any other non-2xx: abort with that status
//! - the login-wall marker on the first page: authentication failed

use crate::classify::check_status;
use crate::error::ScrapeError;
use crate::html::{ElementFilter, last_href};
use crate::http::HttpClient;
use crate::models::{Action, ChainOutcome, ChainSummary};
use crate::scrapers::or_cancel;
use crate::storage::Storage;
use crate::utils::{date_from_url, next_day, truncate_for_log};
use chrono::{NaiveDate, Weekday};
use scraper::Html;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};
use url::Url;

pub const ROOT_URL: &str = "https://www.puzzlesociety.com";
/// First date with a puzzle.
pub const FIRST_DATE: (i32, u32, u32) = (2001, 10, 29);
pub const NO_PUZZLE_DAY: Weekday = Weekday::Sun;
pub const MAX_PUZZLES: usize = 10_000;
/// Shown instead of the puzzle when the session is not a member's.
pub const SAMPLE_MSG: &str = "Sample Only. Become a Puzzle Society member to play";

const PAGE_PATH: &str = "/daily-commuter/";
const LOGIN_PATH: &str = "/sessions";
const ARTIFACT_PREFIX: &str = "tmdcp";
const PDF_LINK: ElementFilter<'static> = ElementFilter::with_attr("a", "target", "_new");
const NEXT_LINK: ElementFilter<'static> = ElementFilter::with_attr("a", "title", "Play next puzzle.");
const PROGRESS_EVERY: usize = 20;

/// Earliest accepted start date.
pub fn first_date() -> NaiveDate {
    let (y, m, d) = FIRST_DATE;
    NaiveDate::from_ymd_opt(y, m, d).expect("valid constant date")
}

/// Settings for one run.
#[derive(Debug, Clone)]
pub struct CrosswordConfig {
    pub root_url: String,
    pub start: NaiveDate,
    /// Skips never move the cursor past this date.
    pub last_date: NaiveDate,
    pub max_puzzles: usize,
    /// Pause after each saved puzzle.
    pub delay: Duration,
}

/// Page URL for `date`.
pub fn page_url(root: &str, date: NaiveDate) -> String {
    format!(
        "{}{}{}",
        root.trim_end_matches('/'),
        PAGE_PATH,
        date.format("%Y/%m/%d")
    )
}

/// Artifact key for `date`.
pub fn artifact_key(date: NaiveDate) -> String {
    format!("{}{}.pdf", ARTIFACT_PREFIX, date.format("%Y%m%d"))
}

/// Links found on a puzzle page, already resolved to absolute URLs.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PageLinks {
    pub pdf: Option<String>,
    pub next: Option<String>,
}

/// Extract the PDF and next-page links from a puzzle page.
pub fn parse_page(html: &str, page_url: &str) -> Result<PageLinks, ScrapeError> {
    let base = Url::parse(page_url)?;
    let doc = Html::parse_document(html);
    let resolve = |href: Option<String>| -> Result<Option<String>, ScrapeError> {
        href.map(|h| base.join(&h).map(String::from))
            .transpose()
            .map_err(ScrapeError::from)
    };
    Ok(PageLinks {
        pdf: resolve(last_href(&doc, PDF_LINK, page_url)?)?,
        next: resolve(last_href(&doc, NEXT_LINK, page_url)?)?,
    })
}

/// Log in with form credentials.
///
/// A bad password usually still answers 200; that case is caught on the
/// first puzzle page instead.
///
/// # Returns
///
/// `Some(outcome)` when the login status means the run must stop, `None`
/// to go on. A 500 is logged and ignored.
///
/// # Errors
///
/// [`ScrapeError::Transport`] when the form cannot be posted at all.
#[instrument(level = "info", skip(client, password))]
pub async fn login<C: HttpClient>(
    client: &C,
    root: &str,
    username: &str,
    password: &str,
) -> Result<Option<ChainOutcome>, ScrapeError> {
    let url = format!("{}{}", root.trim_end_matches('/'), LOGIN_PATH);
    let resp = client
        .post_form(&url, &[("username", username), ("password", password)])
        .await?;
    match check_status(resp.status, &url) {
        Action::Abort => Ok(Some(ChainOutcome::Aborted {
            status: resp.status,
            url,
        })),
        Action::Proceed | Action::Skip => {
            info!("Login request accepted");
            Ok(None)
        }
    }
}

/// Walk the puzzle chain from `config.start`, saving PDFs to `storage`.
///
/// Each page is classified by status: a 500 skips to the next calendar day,
/// any other non-2xx ends the run. Otherwise the PDF link is fetched and
/// saved as `tmdcp<yyyymmdd>.pdf`, and the loop follows the page's
/// "next puzzle" link. Every 20th puzzle is logged.
///
/// # Arguments
///
/// * `client` - Logged-in HTTP client; see [`login`].
/// * `storage` - Output folder for the PDFs.
/// * `config` - Start date, last reachable date, cap and delay.
/// * `cancel` - Stops the run cleanly between or during requests.
///
/// # Returns
///
/// A [`ChainSummary`] whose outcome maps to the process exit code.
///
/// # Errors
///
/// Transport and storage failures, and a next link without a date.
#[instrument(level = "info", skip_all, fields(start = %config.start, max = config.max_puzzles))]
pub async fn run<C: HttpClient, S: Storage>(
    client: &C,
    storage: &S,
    config: &CrosswordConfig,
    cancel: &CancellationToken,
) -> Result<ChainSummary, ScrapeError> {
    let mut date = config.start;
    let mut saved = 0usize;
    let mut skipped = Vec::new();
    let mut visited = Vec::new();

    let finish = |outcome, saved, skipped, visited| ChainSummary {
        outcome,
        saved,
        skipped,
        visited,
    };

    while saved < config.max_puzzles {
        if date > config.last_date {
            info!(%date, last = %config.last_date, "Past the last available date, exiting.");
            return Ok(finish(ChainOutcome::Exhausted, saved, skipped, visited));
        }

        let url = page_url(&config.root_url, date);
        visited.push(url.clone());

        let Some(page) = or_cancel(cancel, client.get(&url)).await else {
            info!(%url, "Interrupt received, exiting now.");
            return Ok(finish(ChainOutcome::Interrupted, saved, skipped, visited));
        };
        let page = page?;
        match check_status(page.status, &url) {
            Action::Skip => {
                skipped.push(url);
                date = next_day(date);
                continue;
            }
            Action::Abort => {
                let outcome = ChainOutcome::Aborted {
                    status: page.status,
                    url,
                };
                return Ok(finish(outcome, saved, skipped, visited));
            }
            Action::Proceed => {}
        }

        let html = page.text();
        if saved == 0 && html.contains(SAMPLE_MSG) {
            error!(%url, preview = %truncate_for_log(&html, 200), "Login failed, exiting.");
            return Ok(finish(ChainOutcome::AuthFailed, saved, skipped, visited));
        }

        let links = parse_page(&html, &url)?;
        let Some(pdf_url) = links.pdf else {
            warn!(%url, "No puzzle link on page, skip.");
            skipped.push(url);
            date = next_day(date);
            continue;
        };

        let Some(pdf) = or_cancel(cancel, client.get(&pdf_url)).await else {
            info!(%pdf_url, "Interrupt received, exiting now.");
            return Ok(finish(ChainOutcome::Interrupted, saved, skipped, visited));
        };
        let pdf = pdf?;
        match check_status(pdf.status, &pdf_url) {
            Action::Skip => {
                skipped.push(url);
                date = next_day(date);
                continue;
            }
            Action::Abort => {
                let outcome = ChainOutcome::Aborted {
                    status: pdf.status,
                    url: pdf_url,
                };
                return Ok(finish(outcome, saved, skipped, visited));
            }
            Action::Proceed => {}
        }

        storage.write(&artifact_key(date), &pdf.body).await?;
        saved += 1;

        let next = match links.next {
            Some(next) if next != url => next,
            _ => {
                info!(%url, saved, "No more puzzles, exiting.");
                return Ok(finish(ChainOutcome::Exhausted, saved, skipped, visited));
            }
        };
        let next_date = date_from_url(&next).ok_or_else(|| ScrapeError::Cursor(next.clone()))?;
        if next_date <= date {
            warn!(%url, %next, "Next puzzle is not later than the current one, exiting.");
            return Ok(finish(ChainOutcome::Exhausted, saved, skipped, visited));
        }
        date = next_date;

        if saved % PROGRESS_EVERY == 0 {
            info!(saved, next = %next, "Puzzle #{}, from {}", saved, next);
        }

        if or_cancel(cancel, sleep(config.delay)).await.is_none() {
            info!("Interrupt received, exiting now.");
            return Ok(finish(ChainOutcome::Interrupted, saved, skipped, visited));
        }
    }

    let next = page_url(&config.root_url, date);
    info!(%next, "The next page is {}.", next);
    Ok(finish(ChainOutcome::CapReached { next }, saved, skipped, visited))
}
