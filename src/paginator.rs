// src/paginator.rs
//! Walks the month tiles on the right of the dashboard.
//!
//! The portal exposes no count and no end marker: the first position with no
//! tile is the end of the data.
use log::{debug, warn};

use crate::browser::{Browser, Element, Locator};
use crate::error::Result;
use crate::navigator::Navigator;

const TILE_SPAN_XPATH: &str = r#"//*[@id="app"]/div[4]/div[1]/ul/li[{tile}]/div/div/div/div/span[{span}]"#;

pub fn tile_locator(position: usize, span: usize) -> Locator {
    Locator::xpath(
        TILE_SPAN_XPATH
            .replace("{tile}", &position.to_string())
            .replace("{span}", &span.to_string()),
    )
}

/// One month on the dashboard. Labels are read when the tile is found.
#[derive(Debug, Clone)]
pub struct MonthTile<E> {
    pub position: usize,
    pub month: E,
    pub month_label: String,
    pub year_label: String,
}

#[derive(Debug)]
pub struct MonthPaginator {
    position: usize,
    exhausted: bool,
}

impl MonthPaginator {
    pub fn new() -> Self {
        Self {
            position: 1,
            exhausted: false,
        }
    }

    /// The next tile, or `None` once a position comes up empty. Stays `None` after that.
    pub async fn next<B: Browser>(&mut self, nav: &Navigator<B>) -> Result<Option<MonthTile<B::Element>>> {
        if self.exhausted {
            return Ok(None);
        }

        // Tiles only exist on the dashboard.
        if nav.current_url().await? != nav.site().home {
            nav.navigate(&nav.site().home).await?;
        }

        let browser = nav.browser();
        let Some(month) = first(browser.find_all(&tile_locator(self.position, 1)).await?) else {
            return Ok(self.finish());
        };
        let Some(year) = first(browser.find_all(&tile_locator(self.position, 2)).await?) else {
            return Ok(self.finish());
        };

        let tile = MonthTile {
            position: self.position,
            month_label: month.text().await?.trim().to_string(),
            year_label: year.text().await?.trim().to_string(),
            month,
        };
        debug!(
            "Tile {}: {} {}",
            tile.position, tile.month_label, tile.year_label
        );
        self.position += 1;
        Ok(Some(tile))
    }

    fn finish<E>(&mut self) -> Option<MonthTile<E>> {
        warn!("No months left to scrape. Stopping.");
        self.exhausted = true;
        None
    }
}

impl Default for MonthPaginator {
    fn default() -> Self {
        Self::new()
    }
}

fn first<E>(elements: Vec<E>) -> Option<E> {
    elements.into_iter().next()
}
