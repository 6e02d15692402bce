//! HTML extraction helpers on top of `scraper`.
//!
//! The loops only ever ask for "all elements with this tag whose attribute
//! has this value" and then read an attribute or the text. [`ElementFilter`]
//! describes such a query.
//!
//! Link extraction expects exactly one match. If a page has several, the
//! last one in document order is used and a warning is logged so the
//! discarded matches do not go unnoticed.

use crate::error::ScrapeError;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use scraper::{ElementRef, Html, Selector};
use std::borrow::Cow;
use tracing::warn;

/// Opening or closing `select` tag.
static SELECT_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<(/?)select\b").expect("select tag regex"));

/// Attribute that marks a former `<select>` after [`parse_with_select_children`].
pub const SELECT_MARKER: &str = "data-select";

/// `tag[attribute="value"]` query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementFilter<'a> {
    pub tag: &'a str,
    pub attr: Option<(&'a str, &'a str)>,
}

impl<'a> ElementFilter<'a> {
    pub const fn tag(tag: &'a str) -> Self {
        Self { tag, attr: None }
    }

    pub const fn with_attr(tag: &'a str, name: &'a str, value: &'a str) -> Self {
        Self {
            tag,
            attr: Some((name, value)),
        }
    }

    /// CSS selector for this filter.
    pub fn to_selector(&self) -> Result<Selector, ScrapeError> {
        let css = match self.attr {
            None => self.tag.to_string(),
            Some((name, value)) => format!(
                "{}[{}=\"{}\"]",
                self.tag,
                name,
                value.replace('\\', "\\\\").replace('"', "\\\"")
            ),
        };
        parse_selector(&css)
    }
}

/// Parse a CSS selector, keeping the offending text in the error.
pub fn parse_selector(css: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(css).map_err(|e| ScrapeError::Selector {
        selector: css.to_string(),
        reason: e.to_string(),
    })
}

/// Every element in `doc` matching `filter`, in document order.
pub fn find_all<'d>(doc: &'d Html, filter: ElementFilter<'_>) -> Result<Vec<ElementRef<'d>>, ScrapeError> {
    let selector = filter.to_selector()?;
    Ok(doc.select(&selector).collect())
}

/// Parse `html`, keeping every child of `<select>` elements.
///
/// An HTML5 parser drops anything but `option`/`optgroup` inside a
/// `<select>`, so a link list built that way would come back empty. Each
/// `<select>` is parsed as `<div data-select>` instead; query it with
/// `div[data-select]`.
pub fn parse_with_select_children(html: &str) -> Html {
    let markup = SELECT_TAG.replace_all(html, |caps: &Captures<'_>| {
        if caps[1].is_empty() {
            Cow::Owned(format!("<div {SELECT_MARKER}=\"\""))
        } else {
            Cow::Borrowed("</div")
        }
    });
    Html::parse_document(&markup)
}

/// Trimmed text content of an element.
pub fn text_of(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Value of `name` on `element`.
pub fn attr_of(element: &ElementRef<'_>, name: &str) -> Option<String> {
    element.value().attr(name).map(str::to_string)
}

/// `href` of the last element matching `filter`.
///
/// Returns `None` when nothing matches or the match has no `href`. Logs a
/// warning when more than one element matches.
pub fn last_href(doc: &Html, filter: ElementFilter<'_>, page_url: &str) -> Result<Option<String>, ScrapeError> {
    let matches = find_all(doc, filter)?;
    if matches.len() > 1 {
        warn!(
            page = %page_url,
            tag = filter.tag,
            filter = ?filter.attr,
            count = matches.len(),
            "Expected one matching link; using the last one"
        );
    }
    Ok(matches.last().and_then(|el| attr_of(el, "href")))
}
