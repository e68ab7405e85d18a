// src/downloader.rs
//! Saves one media file under `img/<year>/<month>/<key>.<ext>`.
use std::path::{Component, Path, PathBuf};

use chrono::NaiveDate;
use image::ImageFormat;
use log::{debug, info, warn};
use reqwest::header::COOKIE;
use reqwest::{Client, StatusCode};
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::{Result, SpiderError};
use crate::extractor::MediaRef;
use crate::navigator::Pacer;
use crate::session::CookieJar;
use crate::tagger::MetadataTagger;

const KEY_MARKER: &str = "key=";
const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Identify a file by its leading bytes.
pub fn sniff(header: &[u8]) -> Option<ImageFormat> {
    image::guess_format(header).ok()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved {
        path: PathBuf,
        format: Option<ImageFormat>,
    },
    AlreadyPresent(PathBuf),
}

/// Everything after `key=` in a media url.
pub fn content_key(url: &str) -> Result<&str> {
    match url.split_once(KEY_MARKER) {
        Some((_, key)) if !key.is_empty() => Ok(key),
        _ => Err(SpiderError::MissingContentKey(url.to_string())),
    }
}

/// `value` must name exactly one entry inside its parent directory.
fn path_segment(value: &str) -> Result<&str> {
    let mut components = Path::new(value).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !value.contains(['/', '\\']) => Ok(value),
        _ => Err(SpiderError::UnsafePathSegment(value.to_string())),
    }
}

/// `"jun"` / `"June"` -> 6.
pub fn month_number(label: &str) -> Option<u32> {
    let prefix = label.trim().get(..3)?.to_ascii_lowercase();
    MONTHS
        .iter()
        .position(|m| *m == prefix)
        .map(|i| i as u32 + 1)
}

/// Noon on the given day, in exif date format.
pub fn capture_date(year: &str, month: &str, day: &str) -> Result<String> {
    let invalid = || SpiderError::CaptureDate {
        year: year.to_string(),
        month: month.to_string(),
        day: day.to_string(),
    };
    let y: i32 = year.trim().parse().map_err(|_| invalid())?;
    let m = month_number(month).ok_or_else(invalid)?;
    let d: u32 = day.trim().parse().map_err(|_| invalid())?;
    let date = NaiveDate::from_ymd_opt(y, m, d).ok_or_else(invalid)?;
    Ok(date.format("%Y:%m:%d 12:00:00").to_string())
}

pub struct Downloader<T> {
    client: Client,
    root: PathBuf,
    pacer: Pacer,
    tagger: T,
}

impl<T: MetadataTagger> Downloader<T> {
    pub fn new(root: impl Into<PathBuf>, pacer: Pacer, tagger: T) -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            root: root.into(),
            pacer,
            tagger,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<year>/<month>/<key>`, without extension. Never leaves `root`.
    pub fn base_path(&self, media: &MediaRef) -> Result<PathBuf> {
        let key = path_segment(content_key(&media.url)?)?;
        let year = path_segment(&media.year)?;
        let month = path_segment(&media.month)?;
        Ok(self.root.join(year).join(month).join(key))
    }

    pub async fn save(&self, media: &MediaRef, jar: &CookieJar) -> Result<SaveOutcome> {
        let base = self.base_path(media)?;
        let jpg = with_ext(&base, "jpg");
        let png = with_ext(&base, "png");

        for existing in [&jpg, &png] {
            if fs::try_exists(existing).await? {
                debug!("Already downloaded: {}", existing.display());
                return Ok(SaveOutcome::AlreadyPresent(existing.clone()));
            }
        }

        info!("Saving: {}", jpg.display());
        self.pacer.pause().await;
        if let Some(dir) = jpg.parent() {
            fs::create_dir_all(dir).await?;
        }

        self.fetch(&media.url, jar, &jpg).await?;

        let format = sniff_file(&jpg).await?;
        let is_png = format == Some(ImageFormat::Png);
        let path = if is_png {
            info!("  File is a png - renaming");
            fs::rename(&jpg, &png).await?;
            png
        } else {
            jpg
        };

        self.stamp(media, &path, is_png).await;
        Ok(SaveOutcome::Saved { path, format })
    }

    /// Stream the body to `<dest>.part`, then move it into place.
    async fn fetch(&self, url: &str, jar: &CookieJar, dest: &Path) -> Result<()> {
        let mut request = self.client.get(url);
        if !jar.is_empty() {
            request = request.header(COOKIE, jar.header_value());
        }
        let mut response = request.send().await?;
        if response.status() != StatusCode::OK {
            return Err(SpiderError::Download {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        let partial = with_ext(dest, "part");
        let mut file = File::create(&partial).await?;
        let written = async {
            while let Some(chunk) = response.chunk().await? {
                file.write_all(&chunk).await?;
            }
            file.flush().await?;
            Ok::<(), SpiderError>(())
        }
        .await;
        drop(file);

        if let Err(e) = written {
            let _ = fs::remove_file(&partial).await;
            return Err(e);
        }
        fs::rename(&partial, dest).await?;
        Ok(())
    }

    /// Tagging problems never fail the download; they are logged and left.
    async fn stamp(&self, media: &MediaRef, path: &Path, is_png: bool) {
        let datetime = match capture_date(&media.year, &media.month, &media.day) {
            Ok(datetime) => datetime,
            Err(e) => {
                warn!("Not tagging {}: {e}", path.display());
                return;
            }
        };
        if let Err(e) = self.tagger.tag(path, &datetime, is_png).await {
            warn!("{e}");
        }
    }
}

/// Append an extension without touching dots already in the key.
fn with_ext(base: &Path, ext: &str) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

async fn sniff_file(path: &Path) -> Result<Option<ImageFormat>> {
    let mut header = [0u8; 16];
    let mut file = File::open(path).await?;
    let mut filled = 0;
    while filled < header.len() {
        let n = file.read(&mut header[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(sniff(&header[..filled]))
}
