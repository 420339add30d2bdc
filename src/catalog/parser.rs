//! Record extraction from catalog item markup.
//!
//! The browser hands us the outer HTML of each item root node; everything
//! from there on is a pure function of that fragment.

use crate::catalog::models::Record;
use crate::catalog::selectors::Selectors;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use tracing::{debug, trace};

/// Reasons a catalog item cannot be turned into a [`Record`].
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("invalid {name} selector '{selector}': {reason}")]
    InvalidSelector { name: &'static str, selector: String, reason: String },

    #[error("missing {field} element (selector '{selector}')")]
    MissingElement { field: &'static str, selector: String },

    #[error("{field} element has no '{attribute}' attribute")]
    MissingAttribute { field: &'static str, attribute: String },

    #[error("invalid price '{text}': {reason}")]
    InvalidPrice { text: String, reason: &'static str },

    #[error("invalid review count '{text}'")]
    InvalidReviewCount { text: String },

    #[error("item #{index}: {source}")]
    Item {
        index: usize,
        #[source]
        source: Box<ExtractError>,
    },
}

/// Extracts records from item markup using a compiled set of selectors.
pub struct Parser {
    item: Selector,
    title: Selector,
    title_attribute: String,
    description: Selector,
    price: Selector,
    price_prefix: String,
    star: Selector,
    review_count: Selector,
    selectors: Selectors,
}

impl Parser {
    /// Compiles the given selectors. Fails on the first selector that
    /// does not parse, including the ones only the browser uses.
    pub fn new(selectors: &Selectors) -> Result<Self, ExtractError> {
        for (name, css) in selectors.css_entries() {
            compile(name, css)?;
        }

        Ok(Self {
            item: compile("item", &selectors.item)?,
            title: compile("title", &selectors.title)?,
            title_attribute: selectors.title_attribute.clone(),
            description: compile("description", &selectors.description)?,
            price: compile("price", &selectors.price)?,
            price_prefix: selectors.price_prefix.clone(),
            star: compile("star", &selectors.star)?,
            review_count: compile("review_count", &selectors.review_count)?,
            selectors: selectors.clone(),
        })
    }

    /// Parses one item from its outer HTML.
    pub fn parse_item(&self, html: &str) -> Result<Record, ExtractError> {
        let fragment = Html::parse_fragment(html);
        self.parse_element(fragment.root_element())
    }

    /// Parses every item, in order. The first bad item fails the batch.
    pub fn parse_items(&self, items: &[String]) -> Result<Vec<Record>, ExtractError> {
        let records = items
            .iter()
            .enumerate()
            .map(|(index, html)| {
                self.parse_item(html)
                    .map_err(|e| ExtractError::Item { index, source: Box::new(e) })
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!("Extracted {} records", records.len());
        Ok(records)
    }

    /// Parses every item found in a full listing document.
    pub fn parse_listing(&self, html: &str) -> Result<Vec<Record>, ExtractError> {
        let document = Html::parse_document(html);

        document
            .select(&self.item)
            .enumerate()
            .map(|(index, element)| {
                self.parse_element(element)
                    .map_err(|e| ExtractError::Item { index, source: Box::new(e) })
            })
            .collect()
    }

    fn parse_element(&self, element: ElementRef) -> Result<Record, ExtractError> {
        let title_el = self.first(element, &self.title, "title", &self.selectors.title)?;
        let title = title_el
            .value()
            .attr(&self.title_attribute)
            .map(str::to_string)
            .ok_or_else(|| ExtractError::MissingAttribute {
                field: "title",
                attribute: self.title_attribute.clone(),
            })?;

        let description = visible_text(self.first(
            element,
            &self.description,
            "description",
            &self.selectors.description,
        )?);

        let price_text =
            visible_text(self.first(element, &self.price, "price", &self.selectors.price)?);
        let price = parse_price(&price_text, &self.price_prefix)?;

        let rating = element.select(&self.star).count() as u32;

        let reviews_text = visible_text(self.first(
            element,
            &self.review_count,
            "review_count",
            &self.selectors.review_count,
        )?);
        let review_count = parse_review_count(&reviews_text)?;

        trace!("Parsed item: {} - {}", title, price);

        Ok(Record { title, description, price, rating, review_count })
    }

    fn first<'a>(
        &self,
        element: ElementRef<'a>,
        selector: &Selector,
        field: &'static str,
        css: &str,
    ) -> Result<ElementRef<'a>, ExtractError> {
        element
            .select(selector)
            .next()
            .ok_or_else(|| ExtractError::MissingElement { field, selector: css.to_string() })
    }
}

fn compile(name: &'static str, css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|e| ExtractError::InvalidSelector {
        name,
        selector: css.to_string(),
        reason: e.to_string(),
    })
}

/// Element text with whitespace runs collapsed, as a browser renders it.
fn visible_text(element: ElementRef) -> String {
    element.text().collect::<String>().split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parses a price such as `$1,299.99`.
///
/// The prefix is mandatory. Commas are accepted only as thousands
/// separators between complete three-digit groups; anything else is
/// rejected rather than guessed at.
pub fn parse_price(text: &str, prefix: &str) -> Result<f64, ExtractError> {
    let invalid = |reason| ExtractError::InvalidPrice { text: text.to_string(), reason };

    let amount =
        text.trim().strip_prefix(prefix).ok_or_else(|| invalid("missing currency prefix"))?;
    let normalized = strip_thousands_separators(amount.trim())
        .ok_or_else(|| invalid("misplaced thousands separator"))?;

    if normalized.is_empty()
        || normalized.matches('.').count() > 1
        || !normalized.chars().all(|c| c.is_ascii_digit() || c == '.')
    {
        return Err(invalid("not a number"));
    }

    normalized.parse().map_err(|_| invalid("not a number"))
}

fn strip_thousands_separators(amount: &str) -> Option<String> {
    if !amount.contains(',') {
        return Some(amount.to_string());
    }

    let (integer, fraction) = match amount.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (amount, None),
    };

    if fraction.is_some_and(|f| f.contains(',')) {
        return None;
    }

    let mut groups = integer.split(',');
    let lead = groups.next()?;
    if lead.is_empty() || lead.len() > 3 || !lead.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let mut out = lead.to_string();
    for group in groups {
        if group.len() != 3 || !group.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        out.push_str(group);
    }

    if let Some(fraction) = fraction {
        out.push('.');
        out.push_str(fraction);
    }

    Some(out)
}

/// Parses the leading integer of a text such as `10 reviews`.
pub fn parse_review_count(text: &str) -> Result<u32, ExtractError> {
    text.split_whitespace()
        .next()
        .and_then(|token| token.parse().ok())
        .ok_or_else(|| ExtractError::InvalidReviewCount { text: text.to_string() })
}
