// src/browser.rs
//! The narrow slice of WebDriver the crawler needs.
//!
//! Components are generic over [`Browser`] so the crawl logic can run against
//! fixture pages in tests; [`crate::spider::Spider`] is the Firefox-backed
//! implementation.
use std::fmt;

use thirtyfour::{By, Key, WebElement};

use crate::error::{Result, SpiderError};
use crate::session::StoredCookie;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    Id(String),
    ClassName(String),
    Css(String),
    XPath(String),
    Tag(String),
    Name(String),
}

impl Locator {
    pub fn id(value: impl Into<String>) -> Self {
        Locator::Id(value.into())
    }

    pub fn class(value: impl Into<String>) -> Self {
        Locator::ClassName(value.into())
    }

    pub fn css(value: impl Into<String>) -> Self {
        Locator::Css(value.into())
    }

    pub fn xpath(value: impl Into<String>) -> Self {
        Locator::XPath(value.into())
    }

    pub fn tag(value: impl Into<String>) -> Self {
        Locator::Tag(value.into())
    }

    pub fn name(value: impl Into<String>) -> Self {
        Locator::Name(value.into())
    }

    pub(crate) fn by(&self) -> By {
        match self {
            Locator::Id(s) => By::Id(s.as_str()),
            Locator::ClassName(s) => By::ClassName(s.as_str()),
            Locator::Css(s) => By::Css(s.as_str()),
            Locator::XPath(s) => By::XPath(s.as_str()),
            Locator::Tag(s) => By::Tag(s.as_str()),
            Locator::Name(s) => By::Name(s.as_str()),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Id(s) => write!(f, "#{s}"),
            Locator::ClassName(s) => write!(f, ".{s}"),
            Locator::Css(s) => write!(f, "css:{s}"),
            Locator::XPath(s) => write!(f, "xpath:{s}"),
            Locator::Tag(s) => write!(f, "<{s}>"),
            Locator::Name(s) => write!(f, "[name={s}]"),
        }
    }
}

#[allow(async_fn_in_trait)]
pub trait Element: Sized {
    async fn click(&self) -> Result<()>;
    async fn text(&self) -> Result<String>;
    async fn attr(&self, name: &str) -> Result<Option<String>>;
    async fn send_keys(&self, text: &str) -> Result<()>;
    /// Submit the form the element belongs to.
    async fn submit(&self) -> Result<()>;
    /// Find a descendant. A missing element is [`SpiderError::ElementNotFound`].
    async fn find(&self, locator: &Locator) -> Result<Self>;
}

#[allow(async_fn_in_trait)]
pub trait Browser {
    type Element: Element;

    async fn goto(&self, url: &str) -> Result<()>;
    async fn current_url(&self) -> Result<String>;

    /// A missing element is [`SpiderError::ElementNotFound`].
    async fn find(&self, locator: &Locator) -> Result<Self::Element>;

    /// An empty result is not an error.
    async fn find_all(&self, locator: &Locator) -> Result<Vec<Self::Element>>;

    async fn cookies(&self) -> Result<Vec<StoredCookie>>;
    async fn add_cookie(&self, cookie: &StoredCookie) -> Result<()>;

    async fn window_handles(&self) -> Result<Vec<String>>;
    async fn current_window(&self) -> Result<String>;
    async fn switch_to_window(&self, handle: &str) -> Result<()>;
}

/// A WebDriver element handle.
#[derive(Debug, Clone)]
pub struct Node(pub WebElement);

impl Element for Node {
    async fn click(&self) -> Result<()> {
        self.0.click().await?;
        Ok(())
    }

    async fn text(&self) -> Result<String> {
        Ok(self.0.text().await?)
    }

    async fn attr(&self, name: &str) -> Result<Option<String>> {
        Ok(self.0.attr(name).await?)
    }

    async fn send_keys(&self, text: &str) -> Result<()> {
        self.0.send_keys(text).await?;
        Ok(())
    }

    async fn submit(&self) -> Result<()> {
        self.0.send_keys(Key::Enter).await?;
        Ok(())
    }

    async fn find(&self, locator: &Locator) -> Result<Self> {
        self.0
            .find(locator.by())
            .await
            .map(Node)
            .map_err(|e| SpiderError::ElementNotFound {
                locator: locator.clone(),
                reason: e.to_string(),
            })
    }
}
