//! MITRE ATT&CK tactic page scraper.
//!
//! Fetches one tactic page and reads its techniques table: for every cell,
//! the links it contains and its text.

use crate::error::ScrapeError;
use crate::html::{ElementFilter, attr_of, find_all, text_of};
use crate::http::HttpClient;
use crate::models::TableCell;
use scraper::Html;
use tracing::{info, instrument, warn};

/// Reconnaissance tactic.
pub const TACTIC_URL: &str = "https://attack.mitre.org/tactics/TA0043";

/// Every `td` of every `tr` in `html`, in document order.
pub fn parse_cells(html: &str) -> Result<Vec<TableCell>, ScrapeError> {
    let doc = Html::parse_document(html);
    let td = ElementFilter::tag("td").to_selector()?;
    let a = ElementFilter::tag("a").to_selector()?;

    let mut cells = Vec::new();
    for (row, tr) in find_all(&doc, ElementFilter::tag("tr"))?.into_iter().enumerate() {
        for cell in tr.select(&td) {
            cells.push(TableCell {
                row,
                anchors: cell.select(&a).filter_map(|el| attr_of(&el, "href")).collect(),
                text: text_of(&cell),
            });
        }
    }
    Ok(cells)
}

/// Fetch `url` and parse its table cells.
///
/// A status other than 200 is logged but the body is parsed anyway.
///
/// # Errors
///
/// Only transport failures; a page without a table gives an empty list.
#[instrument(level = "info", skip(client))]
pub async fn scrape<C: HttpClient>(client: &C, url: &str) -> Result<Vec<TableCell>, ScrapeError> {
    let page = client.get(url).await?;
    if page.status != 200 {
        warn!(status = page.status, url = %page.url, "Unexpected status; parsing the body anyway");
    }
    let cells = parse_cells(&page.text())?;
    info!(count = cells.len(), "Parsed table cells");
    Ok(cells)
}

/// `anchor <href>` and `cell <text>` lines, one per anchor and cell.
pub fn render_lines(cells: &[TableCell]) -> Vec<String> {
    let mut lines = Vec::new();
    for cell in cells {
        for href in &cell.anchors {
            lines.push(format!("anchor {href}"));
        }
        lines.push(format!("cell {}", cell.text));
    }
    lines
}
