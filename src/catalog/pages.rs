//! The fixed set of catalog pages and how their URLs are built.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default catalog root. Every page path is resolved against it.
pub const DEFAULT_BASE_URL: &str = "https://webscraper.io/test-sites/e-commerce/more/";

/// Catalog pages scraped by the tool, in processing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Page {
    Home,
    Computers,
    Laptops,
    Tablets,
    Phones,
    Touch,
}

impl Page {
    /// Returns the page name, also used as the output file stem.
    pub fn name(&self) -> &'static str {
        match self {
            Page::Home => "home",
            Page::Computers => "computers",
            Page::Laptops => "laptops",
            Page::Tablets => "tablets",
            Page::Phones => "phones",
            Page::Touch => "touch",
        }
    }

    /// Returns the path relative to the catalog root.
    pub fn path(&self) -> &'static str {
        match self {
            Page::Home => "",
            Page::Computers => "computers",
            Page::Laptops => "computers/laptops",
            Page::Tablets => "computers/tablets",
            Page::Phones => "phones",
            Page::Touch => "phones/touch",
        }
    }

    /// Builds the absolute URL of this page under `base_url`.
    ///
    /// A missing trailing slash on the base is tolerated so that
    /// `https://host/more` and `https://host/more/` resolve identically.
    pub fn url(&self, base_url: &str) -> String {
        let base = base_url.trim_end_matches('/');
        if self.path().is_empty() {
            format!("{}/", base)
        } else {
            format!("{}/{}", base, self.path())
        }
    }

    /// Output file name for this page.
    pub fn file_name(&self) -> String {
        format!("{}.csv", self.name())
    }

    /// Returns every page in processing order.
    pub fn all() -> &'static [Page] {
        &[Page::Home, Page::Computers, Page::Laptops, Page::Tablets, Page::Phones, Page::Touch]
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Page {
    type Err = PageParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Page::all()
            .iter()
            .copied()
            .find(|page| page.name() == wanted)
            .ok_or_else(|| PageParseError(s.to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct PageParseError(String);

impl fmt::Display for PageParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unknown page '{}'. Valid pages: home, computers, laptops, tablets, phones, touch",
            self.0
        )
    }
}

impl std::error::Error for PageParseError {}
