//! AACT clinical-trial archive downloader.
//!
//! The download page lists daily pipe-delimited exports as links named like
//! `20230101_clinical.zip`. For each one this fetches the zip, keeps only
//! `studies.txt` stored as `<yyyymmdd>.txt`, and deletes the zip (each zip is
//! several times smaller than the text, but there are hundreds).
//!
//! Runs are resumable: an entry whose `<yyyymmdd>.txt` already exists is not
//! fetched at all. A failing entry (bad link, not a zip, missing member) is
//! logged and the run moves on to the next one.

use crate::archive::extract_renamed;
use crate::classify::check_status;
use crate::error::ScrapeError;
use crate::html::{ElementFilter, attr_of, parse_selector, parse_with_select_children, text_of};
use crate::http::HttpClient;
use crate::models::{Action, CatalogEntry, CatalogSummary};
use crate::scrapers::or_cancel;
use crate::storage::{PARTIAL_SUFFIX, Storage, remove_leftovers};
use crate::utils::cursor_from_label;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::ElementRef;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

pub const BASE_URL: &str = "https://aact.ctti-clinicaltrials.org";
pub const MEMBER: &str = "studies.txt";
/// Used with an explicit container selector; the archives sit in the fourth
/// `<select>` list of the download page.
pub const CATALOG_INDEX: usize = 3;

const DOWNLOAD_PATH: &str = "/download";

/// Daily export file name, `yyyymmdd_<anything>.zip`.
static ARCHIVE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{8}_.*\.zip$").expect("archive name regex"));

/// Settings for one run.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub base_url: String,
    /// CSS selector for the containers holding catalog links. `None` scans
    /// the whole page for links to daily exports.
    pub container: Option<String>,
    /// Which matching container (zero-based) lists the archives. Only used
    /// together with `container`.
    pub index: usize,
    /// Archive member to keep.
    pub member: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            container: None,
            index: CATALOG_INDEX,
            member: MEMBER.to_string(),
        }
    }
}

/// What happened to one catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    AlreadyPresent,
    Downloaded { bytes: u64 },
}

/// Artifact key for a catalog label.
pub fn artifact_key(label: &str) -> Result<String, ScrapeError> {
    let cursor = cursor_from_label(label).ok_or_else(|| ScrapeError::Cursor(label.to_string()))?;
    Ok(format!("{cursor}.txt"))
}

/// Label for a link to a daily export: its text, or else the file name at
/// the end of its `href`. `None` for any other link.
fn archive_label(text: &str, href: &str) -> Option<String> {
    if ARCHIVE_NAME.is_match(text) {
        return Some(text.to_string());
    }
    let path = href.split(['?', '#']).next().unwrap_or(href);
    let file = path.rsplit('/').next().unwrap_or(path);
    ARCHIVE_NAME.is_match(file).then(|| file.to_string())
}

/// Catalog entries of the download page.
///
/// With no `container`, every link on the page whose text or file name looks
/// like a daily export is listed, in document order. Otherwise all anchors
/// inside the `index`-th element matching `container` are listed. In both
/// cases `<select>` lists keep their links and match `div[data-select]`.
///
/// # Errors
///
/// [`ScrapeError::Selector`] for an unparsable `container`,
/// [`ScrapeError::Structure`] when fewer than `index + 1` containers match.
pub fn parse_catalog(
    html: &str,
    page_url: &str,
    container: Option<&str>,
    index: usize,
) -> Result<Vec<CatalogEntry>, ScrapeError> {
    let base = Url::parse(page_url)?;
    let doc = parse_with_select_children(html);
    let anchor = ElementFilter::tag("a").to_selector()?;

    let anchors: Vec<ElementRef<'_>> = match container {
        None => doc.select(&anchor).collect(),
        Some(container) => {
            let selector = parse_selector(container)?;
            let containers: Vec<_> = doc.select(&selector).collect();
            let Some(list) = containers.get(index) else {
                return Err(ScrapeError::Structure {
                    url: page_url.to_string(),
                    reason: format!(
                        "expected at least {} {container:?} elements, found {}",
                        index + 1,
                        containers.len()
                    ),
                });
            };
            list.select(&anchor).collect()
        }
    };

    let mut entries = Vec::new();
    for a in anchors {
        let text = text_of(&a);
        let Some(href) = attr_of(&a, "href") else {
            if container.is_some() {
                warn!(label = %text, "Catalog anchor without href; ignoring");
            }
            continue;
        };
        let label = match container {
            Some(_) => text,
            None => match archive_label(&text, &href) {
                Some(label) => label,
                None => continue,
            },
        };
        entries.push(CatalogEntry {
            label,
            url: base.join(&href)?.to_string(),
        });
    }
    Ok(entries)
}

/// Fetch the download page and list its archives.
#[instrument(level = "info", skip_all, fields(base = %config.base_url))]
pub async fn fetch_catalog<C: HttpClient>(
    client: &C,
    config: &CatalogConfig,
) -> Result<Vec<CatalogEntry>, ScrapeError> {
    let url = format!("{}{}", config.base_url.trim_end_matches('/'), DOWNLOAD_PATH);
    let page = client.get(&url).await?;
    if check_status(page.status, &url) != Action::Proceed {
        return Err(ScrapeError::Status {
            url,
            status: page.status,
        });
    }
    let entries = parse_catalog(&page.text(), &url, config.container.as_deref(), config.index)?;
    info!(count = entries.len(), "Number of anchors: {}.", entries.len());
    if entries.is_empty() {
        return Err(ScrapeError::Structure {
            url,
            reason: "no archive links found".to_string(),
        });
    }
    Ok(entries)
}

/// Download one entry unless its artifact already exists.
///
/// # Arguments
///
/// * `entry` - Catalog entry; its label names the staged archive and yields
///   the `<yyyymmdd>.txt` artifact key.
/// * `member` - Archive member to keep.
///
/// # Returns
///
/// [`ItemOutcome::AlreadyPresent`] without any request when the artifact
/// exists, otherwise [`ItemOutcome::Downloaded`] with the extracted size.
///
/// # Errors
///
/// [`ScrapeError::Cursor`] for a label without a date or with a path
/// separator, [`ScrapeError::Status`] for a non-2xx download, and anything
/// [`extract_renamed`] reports.
#[instrument(level = "info", skip(client, storage, entry), fields(label = %entry.label))]
pub async fn process_entry<C: HttpClient, S: Storage>(
    client: &C,
    storage: &S,
    entry: &CatalogEntry,
    member: &str,
) -> Result<ItemOutcome, ScrapeError> {
    let dest = artifact_key(&entry.label)?;
    if storage.exists(&dest).await? {
        info!(%dest, "File {} already exists.", dest);
        return Ok(ItemOutcome::AlreadyPresent);
    }
    if entry.label.contains(['/', '\\']) {
        return Err(ScrapeError::Cursor(entry.label.clone()));
    }

    info!(url = %entry.url, "Downloading {}.", entry.label);
    let resp = client.get(&entry.url).await?;
    if check_status(resp.status, &entry.url) != Action::Proceed {
        return Err(ScrapeError::Status {
            url: entry.url.clone(),
            status: resp.status,
        });
    }

    // Only one copy of the archive is held at a time: the response body is
    // released before extraction reads the staged file back.
    let body = resp.body;
    storage.write(&entry.label, &body).await?;
    drop(body);
    let bytes = extract_renamed(storage, &entry.label, member, &dest).await?;
    Ok(ItemOutcome::Downloaded { bytes })
}

/// Process `entries` in order, isolating failures per entry.
///
/// A failing entry is logged and counted in [`CatalogSummary::failed`]; the
/// loop then moves on. Cancelling `cancel` stops before the next entry (or
/// aborts the current one and removes its staged archive).
///
/// # Returns
///
/// Counts for the run. This never fails as a whole.
#[instrument(level = "info", skip_all, fields(total = entries.len()))]
pub async fn run_catalog<C: HttpClient, S: Storage>(
    client: &C,
    storage: &S,
    entries: &[CatalogEntry],
    member: &str,
    cancel: &CancellationToken,
) -> CatalogSummary {
    let mut summary = CatalogSummary {
        total: entries.len(),
        ..CatalogSummary::default()
    };

    for entry in entries {
        let Some(result) = or_cancel(cancel, process_entry(client, storage, entry, member)).await else {
            info!(label = %entry.label, "Interrupt received, exiting now.");
            if let Err(e) = storage.remove(&entry.label).await {
                warn!(label = %entry.label, error = %e, "Could not remove staged archive");
            }
            summary.interrupted = true;
            break;
        };
        match result {
            Ok(ItemOutcome::AlreadyPresent) => summary.already_present += 1,
            Ok(ItemOutcome::Downloaded { bytes }) => {
                debug!(label = %entry.label, bytes, "Entry downloaded");
                summary.downloaded += 1;
            }
            Err(e) => {
                error!(label = %entry.label, url = %entry.url, error = %e, error_debug = ?e, "Entry failed; continuing");
                summary.failed += 1;
            }
        }
    }

    info!(
        total = summary.total,
        downloaded = summary.downloaded,
        already_present = summary.already_present,
        failed = summary.failed,
        interrupted = summary.interrupted,
        "ALL DONE."
    );
    summary
}

/// Clean leftovers, fetch the catalog, and process every entry.
///
/// # Arguments
///
/// * `client` - HTTP client for the catalog page and the archives.
/// * `storage` - Output folder; `*.zip`, `*.part` and a bare member file
///   left by an earlier run are removed first.
/// * `config` - Site root, catalog location and member name.
/// * `cancel` - Stops the run cleanly when cancelled.
///
/// # Errors
///
/// Cleanup I/O failures, and a catalog page that cannot be fetched, returns
/// a non-2xx status, or lists no archives. Per-entry failures are not
/// errors; see [`run_catalog`].
pub async fn run<C: HttpClient, S: Storage>(
    client: &C,
    storage: &S,
    config: &CatalogConfig,
    cancel: &CancellationToken,
) -> Result<CatalogSummary, ScrapeError> {
    let member = config.member.as_str();
    remove_leftovers(storage, |key| {
        key.ends_with(".zip") || key.ends_with(PARTIAL_SUFFIX) || key == member
    })
    .await?;

    let Some(entries) = or_cancel(cancel, fetch_catalog(client, config)).await else {
        info!("Interrupt received, exiting now.");
        return Ok(CatalogSummary {
            interrupted: true,
            ..CatalogSummary::default()
        });
    };
    Ok(run_catalog(client, storage, &entries?, member, cancel).await)
}
