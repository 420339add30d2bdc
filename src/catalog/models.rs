//! Data models for scraped catalog items and per-page outcomes.

use crate::catalog::pages::Page;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One catalog item. Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Full product title (read from an attribute, not the truncated text)
    pub title: String,
    /// Product description
    pub description: String,
    /// Price with the currency prefix removed
    pub price: f64,
    /// Number of star icons shown for the item
    pub rating: u32,
    /// Number of reviews
    #[serde(rename = "num_of_reviews")]
    pub review_count: u32,
}

impl Record {
    /// Creates a new record.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        price: f64,
        rating: u32,
        review_count: u32,
    ) -> Self {
        Self { title: title.into(), description: description.into(), price, rating, review_count }
    }
}

/// Outcome of scraping a single page.
#[derive(Debug)]
pub enum PageOutcome {
    /// Records were extracted and written.
    Written { records: usize, clicks: usize, path: PathBuf },
    /// The page failed and no file was written.
    Failed { error: anyhow::Error },
}

/// Per-page results of a scrape run, in processing order.
#[derive(Debug, Default)]
pub struct ScrapeReport {
    pub pages: Vec<(Page, PageOutcome)>,
}

impl ScrapeReport {
    /// Creates an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the outcome of one page.
    pub fn push(&mut self, page: Page, outcome: PageOutcome) {
        self.pages.push((page, outcome));
    }

    /// Returns the number of pages that were written.
    pub fn written(&self) -> usize {
        self.pages.iter().filter(|(_, o)| matches!(o, PageOutcome::Written { .. })).count()
    }

    /// Returns the pages that failed.
    pub fn failed(&self) -> Vec<Page> {
        self.pages
            .iter()
            .filter(|(_, o)| matches!(o, PageOutcome::Failed { .. }))
            .map(|(p, _)| *p)
            .collect()
    }

    /// Returns true if any page failed.
    pub fn has_failures(&self) -> bool {
        !self.failed().is_empty()
    }

    /// Total records written across pages.
    pub fn total_records(&self) -> usize {
        self.pages
            .iter()
            .map(|(_, o)| match o {
                PageOutcome::Written { records, .. } => *records,
                PageOutcome::Failed { .. } => 0,
            })
            .sum()
    }
}
