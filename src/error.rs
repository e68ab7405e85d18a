// src/error.rs
use std::path::PathBuf;

use thiserror::Error;

use crate::browser::Locator;

pub type Result<T> = std::result::Result<T, SpiderError>;

#[derive(Debug, Error)]
pub enum SpiderError {
    /// No cookie file yet. Not a failure: the caller logs in instead.
    #[error("no stored session at {0}")]
    SessionNotFound(PathBuf),

    #[error("could not find element {locator}: {reason}")]
    ElementNotFound { locator: Locator, reason: String },

    #[error("expected exactly two browser windows, found {0}")]
    WindowPrecondition(usize),

    #[error("error ({status}) downloading {url}")]
    Download { status: u16, url: String },

    #[error("media url has no content key: {0}")]
    MissingContentKey(String),

    /// A key or label that would not stay a single directory entry under the image root.
    #[error("refusing to use {0:?} as a path component")]
    UnsafePathSegment(String),

    #[error("unreadable day label: {0:?}")]
    DayLabel(String),

    #[error("could not build capture date from {year}/{month}/{day}")]
    CaptureDate {
        year: String,
        month: String,
        day: String,
    },

    #[error("metadata tagging failed for {file}: {reason}")]
    Tagging { file: PathBuf, reason: String },

    #[error("credentials unavailable: {0}")]
    Credentials(String),

    #[error("failed to start {program}: {reason}")]
    Launch { program: String, reason: String },

    #[error("webdriver error: {0}")]
    WebDriver(#[from] thirtyfour::error::WebDriverError),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bad url: {0}")]
    Url(#[from] url::ParseError),
}

impl SpiderError {
    /// Per-file failures the crawl loop logs and steps over.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SpiderError::Download { .. })
    }
}
