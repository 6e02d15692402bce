//! Error types.
//!
//! [`ScrapeError`] covers everything that can go wrong while fetching,
//! parsing and persisting. [`ValidationError`] covers user input (start
//! dates and output folders) and is kept separate so the prompting code can
//! show it and ask again.

use std::path::PathBuf;
use thiserror::Error;

/// Failures while fetching, parsing or persisting a resource.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// The request never produced a response (DNS, TLS, connection reset...).
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    /// The server answered with a status the caller cannot use.
    #[error("status code {status} for {url}")]
    Status { url: String, status: u16 },

    /// The archive was readable but did not contain the expected member.
    #[error("archive {archive} has no member named {member}")]
    MissingMember { archive: String, member: String },

    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// The page did not have the structure we expected.
    #[error("unexpected page structure at {url}: {reason}")]
    Structure { url: String, reason: String },

    /// A CSS selector (built-in or from the command line) did not parse.
    #[error("invalid CSS selector {selector:?}: {reason}")]
    Selector { selector: String, reason: String },

    /// A cursor could not be derived from a label or locator.
    #[error("cannot derive a cursor from {0:?}")]
    Cursor(String),
}

/// Rejected user input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is not in \"yyyy/mm/dd\" format")]
    DateFormat(String),

    #[error("{input} is not between {lower} and {upper}")]
    DateOutOfRange {
        input: String,
        lower: String,
        upper: String,
    },

    #[error("\"{0}\" does not exist")]
    FolderNotFound(PathBuf),

    #[error("\"{0}\" is not a folder")]
    NotADirectory(PathBuf),

    #[error("\"{path}\" is not writeable: {reason}")]
    NotWritable { path: PathBuf, reason: String },

    #[error("value cannot be empty")]
    Empty,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_error_names_the_selector() {
        let err = ScrapeError::Selector {
            selector: "select[".to_string(),
            reason: "unexpected end of input".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("invalid CSS selector \"select[\""), "{msg}");
        assert!(!msg.contains("page structure"));
    }
}
