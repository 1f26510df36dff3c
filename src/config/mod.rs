//! Configuration module for Vitrine
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use vitrine::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("vitrine.toml")).unwrap();
//! println!("Crawling {} into {}", config.site.url, config.database_path().display());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlTarget, CrawlerConfig, OutputConfig, SiteConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
