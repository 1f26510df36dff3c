//! HTML extraction for links and product data
//!
//! This module handles parsing HTML content to extract:
//! - Raw hyperlink targets from `<a>` tags (absent `href` kept as `None`)
//! - Page title
//! - Text of the primary heading (`<h1>`)
//!
//! Targets are returned exactly as written; filtering and normalization
//! are the URL classifier's job.

use scraper::{Html, Selector};

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPage {
    /// Raw `href` of every `<a>` element, in document order
    pub links: Vec<Option<String>>,

    /// The page title (from the `<title>` tag)
    pub title: Option<String>,

    /// Text of the first `<h1>`
    pub heading: Option<String>,
}

/// Extracts links and product data from page content
pub trait PageExtractor {
    fn extract_links(&self, content: &str) -> Vec<Option<String>>;

    fn extract_title(&self, content: &str) -> Option<String>;

    fn extract_heading_text(&self, content: &str) -> Option<String>;

    /// Runs all three extractions
    ///
    /// Implementations that parse the content may override this to parse
    /// only once.
    fn extract(&self, content: &str) -> ParsedPage {
        ParsedPage {
            links: self.extract_links(content),
            title: self.extract_title(content),
            heading: self.extract_heading_text(content),
        }
    }
}

/// `scraper`-based extractor
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlExtractor;

impl HtmlExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl PageExtractor for HtmlExtractor {
    fn extract_links(&self, content: &str) -> Vec<Option<String>> {
        links_in(&Html::parse_document(content))
    }

    fn extract_title(&self, content: &str) -> Option<String> {
        first_text(&Html::parse_document(content), "title")
    }

    fn extract_heading_text(&self, content: &str) -> Option<String> {
        first_text(&Html::parse_document(content), "h1")
    }

    fn extract(&self, content: &str) -> ParsedPage {
        let document = Html::parse_document(content);

        ParsedPage {
            links: links_in(&document),
            title: first_text(&document, "title"),
            heading: first_text(&document, "h1"),
        }
    }
}

fn links_in(document: &Html) -> Vec<Option<String>> {
    let Ok(selector) = Selector::parse("a") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .map(|element| element.value().attr("href").map(str::to_string))
        .collect()
}

/// Trimmed text of the first element matching `tag`; empty text counts as absent
fn first_text(document: &Html, tag: &str) -> Option<String> {
    let selector = Selector::parse(tag).ok()?;

    document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}
