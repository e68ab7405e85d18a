// src/display.rs
use std::process::Stdio;
use std::time::Duration;

use log::{info, warn};
use thirtyfour::support;
use tokio::process::{Child, Command};

use crate::error::{Result, SpiderError};

/// An Xvfb server, killed when stopped or dropped.
pub struct VirtualDisplay {
    number: u32,
    child: Child,
}

impl VirtualDisplay {
    pub async fn start(number: u32) -> Result<Self> {
        info!("Starting xvfb display :{number}");
        let mut child = Command::new("Xvfb")
            .arg(format!(":{number}"))
            .args(["-screen", "0", "1280x1024x24", "-nolisten", "tcp"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SpiderError::Launch {
                program: "Xvfb".to_string(),
                reason: e.to_string(),
            })?;

        // Give the server a moment; an early exit usually means the display is taken.
        support::sleep(Duration::from_millis(500)).await;
        if let Some(status) = child.try_wait()? {
            return Err(SpiderError::Launch {
                program: "Xvfb".to_string(),
                reason: format!("exited with {status}"),
            });
        }
        Ok(Self { number, child })
    }

    /// Value for the `DISPLAY` environment variable.
    pub fn name(&self) -> String {
        format!(":{}", self.number)
    }

    pub async fn stop(mut self) {
        info!("Shutting down xvfb display {}", self.name());
        if let Err(e) = self.child.kill().await {
            warn!("Could not stop Xvfb: {e}");
        }
    }
}
