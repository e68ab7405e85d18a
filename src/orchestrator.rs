// src/orchestrator.rs
use log::{error, info, warn};

use crate::auth::Authenticator;
use crate::browser::{Browser, Element};
use crate::credentials::CredentialProvider;
use crate::downloader::{Downloader, SaveOutcome};
use crate::error::{Result, SpiderError};
use crate::extractor::extract_month;
use crate::navigator::Navigator;
use crate::paginator::MonthPaginator;
use crate::session::{apply_to_browser, to_http_jar, CookieJar, SessionStore};
use crate::tagger::MetadataTagger;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NoSession,
    Authenticating,
    SessionReady,
    Crawling,
    Done,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    pub months: usize,
    pub saved: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Owns the browser session and the cookie set for the whole run.
pub struct Orchestrator<B, C, T> {
    nav: Navigator<B>,
    store: SessionStore,
    credentials: C,
    downloader: Downloader<T>,
    phase: Phase,
}

impl<B, C, T> Orchestrator<B, C, T>
where
    B: Browser,
    C: CredentialProvider,
    T: MetadataTagger,
{
    pub fn new(nav: Navigator<B>, store: SessionStore, credentials: C, downloader: Downloader<T>) -> Self {
        Self {
            nav,
            store,
            credentials,
            downloader,
            phase: Phase::NoSession,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn navigator(&self) -> &Navigator<B> {
        &self.nav
    }

    /// Hand the browser back so the caller can shut it down.
    pub fn into_browser(self) -> B {
        self.nav.into_browser()
    }

    fn enter(&mut self, phase: Phase) {
        info!("{:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    pub async fn run(&mut self) -> Result<CrawlSummary> {
        let jar = self.ensure_session().await?;
        self.crawl(&jar).await
    }

    /// Restore the stored session, logging in first when there is none.
    pub async fn ensure_session(&mut self) -> Result<CookieJar> {
        self.nav.navigate(&self.nav.site().root).await?;

        let cookies = match self.store.load() {
            Ok(cookies) => cookies,
            Err(SpiderError::SessionNotFound(path)) => {
                info!("No stored session at {}", path.display());
                self.enter(Phase::Authenticating);
                Authenticator::new(&self.nav, &mut self.credentials)
                    .login()
                    .await?;
                let cookies = self.nav.browser().cookies().await?;
                self.store.save(&cookies)?;
                self.store.load()?
            }
            Err(e) => return Err(e),
        };
        self.enter(Phase::SessionReady);

        let applied = apply_to_browser(self.nav.browser(), &cookies).await?;
        info!("Applied {applied} of {} cookies", cookies.len());
        self.nav.navigate(&self.nav.site().home).await?;
        Ok(to_http_jar(&cookies))
    }

    /// Visit every month and save every media file on it.
    ///
    /// Failed downloads are logged and counted; any other error ends the crawl.
    pub async fn crawl(&mut self, jar: &CookieJar) -> Result<CrawlSummary> {
        self.enter(Phase::Crawling);
        let mut summary = CrawlSummary::default();
        let mut paginator = MonthPaginator::new();

        while let Some(tile) = paginator.next(&self.nav).await? {
            tile.month.click().await?;
            warn!(
                "Getting urls for month: {} {}",
                tile.month_label, tile.year_label
            );
            self.nav.settle().await;

            let media = extract_month(&self.nav, &tile.month_label, &tile.year_label).await?;
            summary.months += 1;

            for item in &media {
                match self.downloader.save(item, jar).await {
                    Ok(SaveOutcome::Saved { .. }) => summary.saved += 1,
                    Ok(SaveOutcome::AlreadyPresent(_)) => summary.skipped += 1,
                    Err(e) if e.is_recoverable() => {
                        error!("{e}");
                        summary.failed += 1;
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        self.enter(Phase::Done);
        info!(
            "Crawled {} months: {} saved, {} already present, {} failed",
            summary.months, summary.saved, summary.skipped, summary.failed
        );
        Ok(summary)
    }
}
