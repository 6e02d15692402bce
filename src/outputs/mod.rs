//! Output writers for scrape results other than downloaded artifacts.
//!
//! - [`json`]: dumps scraped table cells as a JSON array

pub mod json;
