// src/tagger.rs
//! Capture-date stamping after a file lands on disk.
use std::path::{Path, PathBuf};

use log::info;
use tokio::process::Command;

use crate::error::{Result, SpiderError};

#[allow(async_fn_in_trait)]
pub trait MetadataTagger {
    /// Stamp `datetime` (`YYYY:MM:DD HH:MM:SS`) on `file`.
    async fn tag(&self, file: &Path, datetime: &str, is_png: bool) -> Result<()>;
}

/// Shells out to exiftool, once for the PNG creation time and once for all dates.
#[derive(Debug, Clone)]
pub struct ExifTool {
    program: PathBuf,
}

impl ExifTool {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn args(tag: &str, datetime: &str, file: &Path) -> Vec<String> {
        vec![
            "-overwrite_original".to_string(),
            format!("-{tag}={datetime}"),
            file.display().to_string(),
        ]
    }

    async fn run(&self, tag: &str, datetime: &str, file: &Path) -> Result<()> {
        let args = Self::args(tag, datetime, file);
        info!("  Adding exif: {} {}", self.program.display(), args.join(" "));
        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .await
            .map_err(|e| SpiderError::Tagging {
                file: file.to_path_buf(),
                reason: format!("could not run {}: {e}", self.program.display()),
            })?;
        if !output.status.success() {
            return Err(SpiderError::Tagging {
                file: file.to_path_buf(),
                reason: format!(
                    "{} exited with {}: {}",
                    self.program.display(),
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }
        Ok(())
    }
}

impl MetadataTagger for ExifTool {
    async fn tag(&self, file: &Path, datetime: &str, is_png: bool) -> Result<()> {
        if is_png {
            self.run("PNG:CreationTime", datetime, file).await?;
        }
        self.run("AllDates", datetime, file).await
    }
}

/// Leaves files untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTagger;

impl MetadataTagger for NoopTagger {
    async fn tag(&self, _file: &Path, _datetime: &str, _is_png: bool) -> Result<()> {
        Ok(())
    }
}

/// Either tagger, picked at startup.
#[derive(Debug, Clone)]
pub enum Tagger {
    ExifTool(ExifTool),
    Noop(NoopTagger),
}

impl MetadataTagger for Tagger {
    async fn tag(&self, file: &Path, datetime: &str, is_png: bool) -> Result<()> {
        match self {
            Tagger::ExifTool(tool) => tool.tag(file, datetime, is_png).await,
            Tagger::Noop(noop) => noop.tag(file, datetime, is_png).await,
        }
    }
}
