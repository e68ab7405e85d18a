// src/navigator.rs
use std::time::Duration;

use log::{debug, info};
use rand::distr::{Distribution, Uniform};
use thirtyfour::support;

use crate::browser::Browser;
use crate::config::SiteUrls;
use crate::error::Result;

/// Randomized pauses between UI actions and downloads.
#[derive(Debug, Clone, Copy)]
pub struct Pacer {
    min: Duration,
    max: Duration,
    enabled: bool,
}

impl Pacer {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            max,
            enabled: true,
        }
    }

    /// Never sleeps.
    pub fn disabled() -> Self {
        Self {
            min: Duration::ZERO,
            max: Duration::ZERO,
            enabled: false,
        }
    }

    /// A duration in `[min, max)`. `min` when the window is empty.
    pub fn pick(&self, min: Duration, max: Duration) -> Duration {
        if max <= min {
            return min;
        }
        let mut rng = rand::rng();
        match Uniform::new(min.as_millis() as u64, max.as_millis() as u64) {
            Ok(dist) => Duration::from_millis(dist.sample(&mut rng)),
            Err(_) => min,
        }
    }

    pub async fn pause(&self) {
        self.sleep_within(self.min, self.max).await;
    }

    /// Pause with a raised floor, keeping the configured ceiling when it is higher.
    pub async fn pause_from(&self, min: Duration) {
        self.sleep_within(min, self.max.max(min)).await;
    }

    async fn sleep_within(&self, min: Duration, max: Duration) {
        if !self.enabled {
            return;
        }
        let duration = self.pick(min, max);
        debug!("Sleeping {:.2}s", duration.as_secs_f64());
        support::sleep(duration).await;
    }
}

impl Default for Pacer {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(3))
    }
}

/// The browser session plus the pacing and site addresses every page step needs.
pub struct Navigator<B> {
    browser: B,
    pacer: Pacer,
    site: SiteUrls,
}

impl<B: Browser> Navigator<B> {
    pub fn new(browser: B, pacer: Pacer, site: SiteUrls) -> Self {
        Self {
            browser,
            pacer,
            site,
        }
    }

    pub fn browser(&self) -> &B {
        &self.browser
    }

    pub fn pacer(&self) -> &Pacer {
        &self.pacer
    }

    pub fn site(&self) -> &SiteUrls {
        &self.site
    }

    pub fn into_browser(self) -> B {
        self.browser
    }

    pub async fn navigate(&self, url: &str) -> Result<()> {
        info!("Navigating to {url:?}");
        self.browser.goto(url).await
    }

    pub async fn current_url(&self) -> Result<String> {
        self.browser.current_url().await
    }

    pub async fn pause(&self) {
        self.pacer.pause().await;
    }

    /// The settle delay used after clicks that load new content.
    pub async fn settle(&self) {
        self.pacer.pause_from(Duration::from_secs(2)).await;
    }
}
