//! URL handling module for Vitrine
//!
//! This module decides which hyperlink targets belong in the frontier and in
//! what form: same-domain classification, relative-path resolution with
//! percent-encoding, and product-URL pattern matching.

mod classify;
mod domain;
mod normalize;
mod pattern;

// Re-export main types and functions
pub use classify::UrlClassifier;
pub use domain::{extract_authority, extract_domain};
pub use normalize::normalize_url;
pub use pattern::ProductPattern;

/// Kind of frontier URL, as decided by the product pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlKind {
    /// Matches the product pattern; drained first
    Product,
    /// Any other same-site page
    Page,
}

impl UrlKind {
    pub fn is_product(&self) -> bool {
        matches!(self, Self::Product)
    }
}

impl std::fmt::Display for UrlKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Product => f.write_str("product"),
            Self::Page => f.write_str("page"),
        }
    }
}
