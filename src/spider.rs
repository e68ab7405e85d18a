// src/spider.rs
//! The Firefox session and the processes that carry it.
use std::process::Stdio;
use std::time::Duration;

use log::{info, warn};
use thirtyfour::{prelude::*, support, Cookie, FirefoxCapabilities, WindowHandle};
use tokio::process::{Child, Command};
use url::Url;

use crate::browser::{Browser, Locator, Node};
use crate::config::Settings;
use crate::display::VirtualDisplay;
use crate::error::{Result, SpiderError};
use crate::session::StoredCookie;

const CONNECT_ATTEMPTS: usize = 20;

pub struct Spider {
    pub driver: WebDriver,
    geckodriver: Option<Child>,
    display: Option<VirtualDisplay>,
}

impl Spider {
    /// Start whatever `settings` asks for and open a browser session.
    ///
    /// Anything started before a failure is torn down again.
    pub async fn launch(settings: &Settings) -> Result<Self> {
        let display = match settings.xvfb_display {
            Some(number) => Some(VirtualDisplay::start(number).await?),
            None => None,
        };

        let geckodriver = match &settings.geckodriver {
            Some(binary) => {
                match spawn_geckodriver(binary, &settings.webdriver_url, display.as_ref()) {
                    Ok(child) => Some(child),
                    Err(e) => {
                        if let Some(display) = display {
                            display.stop().await;
                        }
                        return Err(e);
                    }
                }
            }
            None => None,
        };

        let driver = match connect(settings).await {
            Ok(driver) => driver,
            Err(e) => {
                stop_child(geckodriver).await;
                if let Some(display) = display {
                    display.stop().await;
                }
                return Err(e);
            }
        };

        Ok(Self {
            driver,
            geckodriver,
            display,
        })
    }

    /// Quit the browser, then stop geckodriver and the display.
    pub async fn close(self) {
        info!("Shutting down browser");
        if let Err(e) = self.driver.quit().await {
            warn!("Browser did not quit cleanly: {e}");
        }
        stop_child(self.geckodriver).await;
        if let Some(display) = self.display {
            display.stop().await;
        }
    }
}

fn spawn_geckodriver(
    binary: &std::path::Path,
    webdriver_url: &str,
    display: Option<&VirtualDisplay>,
) -> Result<Child> {
    let port = Url::parse(webdriver_url)?
        .port_or_known_default()
        .unwrap_or(4444);
    info!("Starting {} on port {port}", binary.display());

    let mut command = Command::new(binary);
    command
        .arg("--port")
        .arg(port.to_string())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);
    if let Some(display) = display {
        command.env("DISPLAY", display.name());
    }
    command.spawn().map_err(|e| SpiderError::Launch {
        program: binary.display().to_string(),
        reason: e.to_string(),
    })
}

async fn stop_child(child: Option<Child>) {
    if let Some(mut child) = child {
        info!("Shutting down geckodriver");
        if let Err(e) = child.kill().await {
            warn!("Could not stop geckodriver: {e}");
        }
    }
}

/// Open the session, waiting for a freshly spawned geckodriver to listen.
async fn connect(settings: &Settings) -> Result<WebDriver> {
    let mut last_error = None;
    for _ in 0..CONNECT_ATTEMPTS {
        let caps = capabilities(settings.headless)?;
        match WebDriver::new(&settings.webdriver_url, caps).await {
            Ok(driver) => {
                driver
                    .set_implicit_wait_timeout(settings.implicit_wait)
                    .await?;
                return Ok(driver);
            }
            Err(e) if settings.geckodriver.is_some() => {
                last_error = Some(e);
                support::sleep(Duration::from_millis(500)).await;
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(match last_error {
        Some(e) => e.into(),
        None => SpiderError::Launch {
            program: settings.webdriver_url.clone(),
            reason: "no connection attempt made".to_string(),
        },
    })
}

fn capabilities(headless: bool) -> Result<FirefoxCapabilities> {
    let mut caps = DesiredCapabilities::firefox();
    if headless {
        info!("Running in headless mode");
        caps.set_headless()?;
    }
    Ok(caps)
}

impl Browser for Spider {
    type Element = Node;

    async fn goto(&self, url: &str) -> Result<()> {
        self.driver.goto(url).await?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.driver.current_url().await?.to_string())
    }

    async fn find(&self, locator: &Locator) -> Result<Node> {
        self.driver
            .find(locator.by())
            .await
            .map(Node)
            .map_err(|e| SpiderError::ElementNotFound {
                locator: locator.clone(),
                reason: e.to_string(),
            })
    }

    async fn find_all(&self, locator: &Locator) -> Result<Vec<Node>> {
        let elements = self.driver.find_all(locator.by()).await?;
        Ok(elements.into_iter().map(Node).collect())
    }

    async fn cookies(&self) -> Result<Vec<StoredCookie>> {
        let cookies = self.driver.get_all_cookies().await?;
        Ok(serde_json::from_value(serde_json::to_value(cookies)?)?)
    }

    async fn add_cookie(&self, cookie: &StoredCookie) -> Result<()> {
        let cookie: Cookie = serde_json::from_value(serde_json::to_value(cookie)?)?;
        self.driver.add_cookie(cookie).await?;
        Ok(())
    }

    async fn window_handles(&self) -> Result<Vec<String>> {
        let handles = self.driver.windows().await?;
        Ok(handles.iter().map(|h| h.to_string()).collect())
    }

    async fn current_window(&self) -> Result<String> {
        Ok(self.driver.window().await?.to_string())
    }

    async fn switch_to_window(&self, handle: &str) -> Result<()> {
        self.driver
            .switch_to_window(WindowHandle::from(handle.to_string()))
            .await?;
        Ok(())
    }
}
