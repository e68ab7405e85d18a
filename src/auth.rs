// src/auth.rs
//! Interactive login flows. Lookups here are not retried: a missing element
//! means the page changed or the login went sideways, and someone is at the
//! keyboard to try again.
use log::info;

use crate::browser::{Browser, Element, Locator};
use crate::credentials::{CredentialProvider, LoginKind};
use crate::error::{Result, SpiderError};
use crate::navigator::Navigator;

pub struct Authenticator<'a, B, C> {
    nav: &'a Navigator<B>,
    credentials: &'a mut C,
}

impl<'a, B: Browser, C: CredentialProvider> Authenticator<'a, B, C> {
    pub fn new(nav: &'a Navigator<B>, credentials: &'a mut C) -> Self {
        Self { nav, credentials }
    }

    /// Ask for the login type once and run that flow.
    pub async fn login(&mut self) -> Result<LoginKind> {
        let kind = self.credentials.login_kind()?;
        match kind {
            LoginKind::Google => {
                info!("Doing Google login...");
                self.google_login().await?;
            }
            LoginKind::Email => {
                info!("Doing Email login...");
                self.email_login().await?;
            }
        }
        Ok(kind)
    }

    async fn open_login_panel(&self) -> Result<()> {
        info!("Navigating to login page.");
        let browser = self.nav.browser();
        browser.find(&Locator::id("login-button")).await?.click().await?;
        browser.find(&Locator::class("tp-block-half")).await?.click().await?;
        Ok(())
    }

    pub async fn email_login(&mut self) -> Result<()> {
        let nav = self.nav;
        let browser = nav.browser();
        self.open_login_panel().await?;
        browser
            .find(&Locator::class("other-login-button"))
            .await?
            .click()
            .await?;
        info!("{}", nav.current_url().await?);

        info!("  Sending username.");
        let email = self.credentials.email()?;
        browser
            .find(&Locator::css(".controls input[type='text']"))
            .await?
            .send_keys(&email)
            .await?;

        info!("  Sending password.");
        let password = self.credentials.password()?;
        browser
            .find(&Locator::css(".controls input[type='password']"))
            .await?
            .send_keys(&password)
            .await?;

        nav.settle().await;
        info!("Clicking 'submit' button.");
        browser
            .find(&Locator::css(".tp-left-contents .btn-primary"))
            .await?
            .click()
            .await?;
        nav.settle().await;
        info!("New url {}", nav.current_url().await?);
        Ok(())
    }

    pub async fn google_login(&mut self) -> Result<()> {
        let nav = self.nav;
        let browser = nav.browser();
        self.open_login_panel().await?;

        for image in browser.find_all(&Locator::tag("img")).await? {
            let src = image.attr("src").await?.unwrap_or_default();
            if src.contains("btn-google.png") {
                info!("Clicking Google Button.");
                image.click().await?;
            }
        }
        nav.settle().await;

        let primary = switch_to_other_window(browser).await?;

        let email = self.credentials.email()?;
        let email_field = browser.find(&Locator::id("identifierId")).await?;
        email_field.send_keys(&email).await?;
        email_field.submit().await?;
        browser.find(&Locator::id("identifierNext")).await?.click().await?;
        nav.settle().await;

        let password = self.credentials.password()?;
        let password_field = browser.find(&Locator::name("password")).await?;
        password_field.send_keys(&password).await?;
        password_field.submit().await?;
        browser.find(&Locator::id("passwordNext")).await?.click().await?;
        nav.settle().await;

        info!("Switching back to window {primary}");
        browser.switch_to_window(&primary).await
    }
}

/// Focus the one window that is not current and return the handle that was.
///
/// Exactly two windows must be open; anything else is an error rather than a guess.
pub async fn switch_to_other_window<B: Browser>(browser: &B) -> Result<String> {
    info!("Switching windows.");
    let all = browser.window_handles().await?;
    if all.len() != 2 {
        return Err(SpiderError::WindowPrecondition(all.len()));
    }
    let current = browser.current_window().await?;
    let other = all
        .into_iter()
        .find(|handle| *handle != current)
        .ok_or(SpiderError::WindowPrecondition(1))?;
    info!("Current window {current}, switching to {other}");
    browser.switch_to_window(&other).await?;
    Ok(current)
}
