// src/session.rs
//! Cookie persistence shared between the browser and the download client.
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::browser::Browser;
use crate::error::{Result, SpiderError};

/// A cookie as WebDriver reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
}

impl StoredCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: None,
            path: None,
            secure: None,
            http_only: None,
            expiry: None,
            same_site: None,
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// True when the cookie may be set while the browser is on `host`.
    pub fn matches_host(&self, host: &str) -> bool {
        let Some(domain) = self.domain.as_deref() else {
            return true;
        };
        let domain = domain.trim_start_matches('.').to_ascii_lowercase();
        let host = host.to_ascii_lowercase();
        host == domain || host.ends_with(&format!(".{domain}"))
    }
}

/// Name to value view of a session, for the plain HTTP client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieJar(BTreeMap<String, String>);

impl CookieJar {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Value for a `Cookie:` request header.
    pub fn header_value(&self) -> String {
        self.0
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Vec<StoredCookie>> {
        info!("Loading cookies from {}", self.path.display());
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(SpiderError::SessionNotFound(self.path.clone()))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, cookies: &[StoredCookie]) -> Result<()> {
        info!(
            "Dumping {} cookies to {}",
            cookies.len(),
            self.path.display()
        );
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_string_pretty(cookies)?)?;
        Ok(())
    }
}

/// Cookies whose domain covers the host of `current_url`.
pub fn cookies_for_url<'a>(
    cookies: &'a [StoredCookie],
    current_url: &str,
) -> Result<Vec<&'a StoredCookie>> {
    let url = Url::parse(current_url)?;
    let host = url.host_str().unwrap_or_default();
    Ok(cookies.iter().filter(|c| c.matches_host(host)).collect())
}

/// Set every cookie that belongs to the page the browser is on. Returns how many were set.
pub async fn apply_to_browser<B: Browser>(browser: &B, cookies: &[StoredCookie]) -> Result<usize> {
    info!("Adding the cookies to the browser.");
    let current_url = browser.current_url().await?;
    let applicable = cookies_for_url(cookies, &current_url)?;
    for cookie in &applicable {
        debug!("Adding cookie {} for {:?}", cookie.name, cookie.domain);
        browser.add_cookie(cookie).await?;
    }
    Ok(applicable.len())
}

pub fn to_http_jar(cookies: &[StoredCookie]) -> CookieJar {
    info!("Transforming the cookies for the download client.");
    CookieJar(
        cookies
            .iter()
            .map(|c| (c.name.clone(), c.value.clone()))
            .collect(),
    )
}
