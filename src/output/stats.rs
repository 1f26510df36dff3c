//! Frontier progress statistics
//!
//! Progress is computed from the store's aggregate counts and never
//! changes it, so it can be reported mid-crawl or from a stopped database.

use crate::storage::{FrontierStore, StorageResult};
use std::fmt;

/// Snapshot of frontier counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrontierProgress {
    /// Number of known URLs
    pub total: u64,

    /// Number of URLs not yet visited
    pub unvisited: u64,

    /// Number of known product URLs
    pub products: u64,

    /// Number of product URLs not yet visited
    pub unvisited_products: u64,
}

impl FrontierProgress {
    pub fn visited(&self) -> u64 {
        self.total.saturating_sub(self.unvisited)
    }

    pub fn visited_products(&self) -> u64 {
        self.products.saturating_sub(self.unvisited_products)
    }

    /// Share of known URLs already visited
    pub fn percent_visited(&self) -> f64 {
        percentage(self.visited(), self.total)
    }

    /// Share of known URLs that are products
    pub fn percent_products(&self) -> f64 {
        percentage(self.products, self.total)
    }

    /// Share of product URLs already visited
    pub fn percent_products_visited(&self) -> f64 {
        percentage(self.visited_products(), self.products)
    }
}

impl fmt::Display for FrontierProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} URLs visited ({:.1}%), {}/{} products visited ({:.1}%)",
            self.visited(),
            self.total,
            self.percent_visited(),
            self.visited_products(),
            self.products,
            self.percent_products_visited()
        )
    }
}

fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        (part as f64 / whole as f64) * 100.0
    }
}

/// Loads progress counts from the store
pub fn load_progress(store: &dyn FrontierStore) -> StorageResult<FrontierProgress> {
    Ok(FrontierProgress {
        total: store.count_total()?,
        unvisited: store.count_unvisited()?,
        products: store.count_total_matching_pattern()?,
        unvisited_products: store.count_unvisited_matching_pattern()?,
    })
}

/// Prints progress to stdout in a formatted manner
pub fn print_progress(progress: &FrontierProgress) {
    println!("=== Frontier Progress ===\n");

    println!("URLs:");
    println!("  Known: {}", progress.total);
    println!(
        "  Visited: {} ({:.1}%)",
        progress.visited(),
        progress.percent_visited()
    );
    println!("  Unvisited: {}", progress.unvisited);
    println!();

    println!("Products:");
    println!(
        "  Known: {} ({:.1}% of URLs)",
        progress.products,
        progress.percent_products()
    );
    println!(
        "  Visited: {} ({:.1}%)",
        progress.visited_products(),
        progress.percent_products_visited()
    );
    println!("  Unvisited: {}", progress.unvisited_products);
}
