//! Command implementations.

pub mod scrape;

pub use scrape::ScrapeCommand;
