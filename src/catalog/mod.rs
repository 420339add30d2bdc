//! Catalog scraping: page targets, selectors, browser session, page
//! loading and record extraction.

pub mod loader;
pub mod models;
pub mod pages;
pub mod parser;
pub mod selectors;
pub mod session;
pub mod wait;

pub use loader::{LoadError, LoadSummary, PageLoader};
pub use models::{PageOutcome, Record, ScrapeReport};
pub use pages::Page;
pub use parser::{ExtractError, Parser};
pub use selectors::Selectors;
pub use session::{BrowserSession, ChromiumSession};
