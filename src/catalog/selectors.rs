//! CSS selectors for the catalog markup.
//!
//! Every selector the scraper depends on lives here, one entry per
//! field, so a markup change is a config edit rather than a code change.
//! The defaults match the current webscraper.io test-site layout and can
//! be overridden from the `[selectors]` table of the config file.

use serde::{Deserialize, Serialize};

/// Page-level and per-field selectors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Selectors {
    /// Cookie consent "accept" button. Optional on the page.
    pub cookie_accept: String,

    /// "Load more items" control. Optional on the page.
    pub expand: String,

    /// Root node of one catalog item.
    pub item: String,

    /// Element carrying the full product title.
    pub title: String,

    /// Attribute on the title element holding the untruncated title.
    pub title_attribute: String,

    /// Product description text.
    pub description: String,

    /// Price text, e.g. `$99.99`.
    pub price: String,

    /// Fixed prefix stripped from the price text before parsing.
    pub price_prefix: String,

    /// One element per rating star.
    pub star: String,

    /// Review count text, e.g. `10 reviews`.
    pub review_count: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            cookie_accept: ".acceptCookies".to_string(),
            expand: ".ecomerce-items-scroll-more".to_string(),
            item: ".product-wrapper".to_string(),
            title: ".title".to_string(),
            title_attribute: "title".to_string(),
            description: ".description".to_string(),
            price: ".price".to_string(),
            price_prefix: "$".to_string(),
            star: ".ws-icon-star".to_string(),
            review_count: ".review-count".to_string(),
        }
    }
}

impl Selectors {
    /// Returns `(name, selector)` pairs for every CSS selector entry.
    pub fn css_entries(&self) -> [(&'static str, &str); 8] {
        [
            ("cookie_accept", self.cookie_accept.as_str()),
            ("expand", self.expand.as_str()),
            ("item", self.item.as_str()),
            ("title", self.title.as_str()),
            ("description", self.description.as_str()),
            ("price", self.price.as_str()),
            ("star", self.star.as_str()),
            ("review_count", self.review_count.as_str()),
        ]
    }
}
