// src/extractor.rs
//! Pulls the full-size media urls out of the selected month's entries.
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::browser::{Browser, Element, Locator};
use crate::error::{Result, SpiderError};
use crate::navigator::Navigator;

const ENTRY_XPATH: &str = "//div[@class='well left-panel pull-left']/ul/li/div";
const DAY_LABEL_XPATH: &str = "./div/div[@class='header note mask']/span[@class='name']/span";
const THUMBNAIL_FLAG: &str = "thumbnail=true";

static STYLE_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r#"\("([^"]+)"#).unwrap());

pub fn entry_locator() -> Locator {
    Locator::xpath(ENTRY_XPATH)
}

pub fn day_label_locator() -> Locator {
    Locator::xpath(DAY_LABEL_XPATH)
}

/// One downloadable asset found on a month page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRef {
    pub url: String,
    /// Two-digit day of month.
    pub day: String,
    pub month: String,
    pub year: String,
}

/// The quoted url inside a `background-image:url("...")` style.
pub fn style_url(style: &str) -> Option<&str> {
    STYLE_URL
        .captures(style)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Drop the thumbnail flag so the full-resolution asset is fetched.
pub fn strip_thumbnail(url: &str) -> String {
    let Some((path, query)) = url.split_once('?') else {
        return url.to_string();
    };
    let kept: Vec<&str> = query
        .split('&')
        .filter(|pair| !pair.is_empty() && *pair != THUMBNAIL_FLAG)
        .collect();
    if kept.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{}", kept.join("&"))
    }
}

/// Resolve `url` against the site origin. Protocol-relative urls keep their own host.
pub fn absolutize(url: &str, origin: &str) -> Result<String> {
    Ok(Url::parse(origin)?.join(url)?.to_string())
}

/// `"06/07"` -> `"07"`.
pub fn parse_day(label: &str) -> Result<String> {
    let day = label
        .split('/')
        .nth(1)
        .and_then(|field| field.trim().parse::<u32>().ok())
        .ok_or_else(|| SpiderError::DayLabel(label.to_string()))?;
    Ok(format!("{day:02}"))
}

/// Every media entry of the month currently shown, in page order.
pub async fn extract_month<B: Browser>(
    nav: &Navigator<B>,
    month: &str,
    year: &str,
) -> Result<Vec<MediaRef>> {
    let browser = nav.browser();
    let entries = browser.find_all(&entry_locator()).await?;
    debug!("Found {} entries for {month} {year}", entries.len());

    let mut media = Vec::new();
    for entry in entries {
        let style = entry.attr("style").await?.unwrap_or_default();
        let Some(raw) = style_url(&style) else {
            continue;
        };
        let url = absolutize(&strip_thumbnail(raw), &nav.site().origin)?;

        let label = entry
            .find(&day_label_locator())
            .await?
            .text()
            .await?;
        let day = parse_day(&label)?;

        debug!("  {day}: {url}");
        media.push(MediaRef {
            url,
            day,
            month: month.to_string(),
            year: year.to_string(),
        });
    }
    Ok(media)
}
