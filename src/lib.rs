//! catalog-scraper - headless-browser scraper for a "load more" e-commerce catalog
//!
//! Opens each catalog page in Chromium, clicks "load more" until every
//! item is present, extracts one record per item and writes a CSV file
//! per page.

pub mod catalog;
pub mod commands;
pub mod config;
pub mod format;

pub use catalog::models::{Record, ScrapeReport};
pub use catalog::pages::Page;
pub use config::Config;
