use crate::url::{extract_authority, ProductPattern};
use crate::ConfigError;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Main configuration structure for Vitrine
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// The site being crawled
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Base URL of the site (e.g., "https://www.example.com")
    pub url: String,

    /// SQL LIKE pattern identifying product URLs (e.g., "%/p")
    #[serde(rename = "product-pattern")]
    pub product_pattern: String,

    /// URL the crawl starts from; defaults to `url`
    #[serde(default)]
    pub seed: Option<String>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Fixed back-off before retrying a busy database (milliseconds)
    #[serde(rename = "busy-retry-delay-ms", default = "default_busy_retry_delay_ms")]
    pub busy_retry_delay_ms: u64,

    /// Maximum retries on a busy database; unbounded when absent
    #[serde(rename = "max-busy-retries", default)]
    pub max_busy_retries: Option<u32>,

    /// HTTP request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Log crawl progress every N visited pages
    #[serde(rename = "progress-interval", default = "default_progress_interval")]
    pub progress_interval: u64,

    /// User agent sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

/// Output configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite frontier database; derived from the host when absent
    #[serde(rename = "database-path", default)]
    pub database_path: Option<String>,

    /// Path to the CSV product records file; derived from the host when absent
    #[serde(rename = "records-path", default)]
    pub records_path: Option<String>,
}

fn default_busy_retry_delay_ms() -> u64 {
    300
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_progress_interval() -> u64 {
    10
}

fn default_user_agent() -> String {
    format!("vitrine/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            busy_retry_delay_ms: default_busy_retry_delay_ms(),
            max_busy_retries: None,
            request_timeout_secs: default_request_timeout_secs(),
            progress_interval: default_progress_interval(),
            user_agent: default_user_agent(),
        }
    }
}

/// The crawl's target domain and product pattern
///
/// Built once from the configuration and handed to both the URL classifier
/// and the frontier store, so neither depends on global site state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTarget {
    /// Scheme and authority without a trailing slash ("https://www.example.com")
    pub base_url: String,

    /// Authority used for same-domain checks ("www.example.com")
    pub domain: String,

    /// Pattern deciding which URLs are product pages
    pub product_pattern: ProductPattern,
}

impl CrawlTarget {
    /// Builds a target from a base URL and a product pattern
    pub fn new(base_url: &str, product_pattern: &str) -> Result<Self, ConfigError> {
        let parsed = Url::parse(base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid site url '{}': {}", base_url, e)))?;

        let domain = extract_authority(&parsed).ok_or_else(|| {
            ConfigError::InvalidUrl(format!("Site url '{}' has no host", base_url))
        })?;

        Ok(Self {
            base_url: parsed.origin().ascii_serialization(),
            domain,
            product_pattern: ProductPattern::new(product_pattern),
        })
    }

    /// Returns true if the URL matches the product pattern
    pub fn is_product(&self, url: &str) -> bool {
        self.product_pattern.matches(url)
    }
}

impl Config {
    /// Builds the crawl target for this configuration
    pub fn crawl_target(&self) -> Result<CrawlTarget, ConfigError> {
        CrawlTarget::new(&self.site.url, &self.site.product_pattern)
    }

    /// The URL the crawl starts from
    pub fn seed_url(&self) -> &str {
        self.site.seed.as_deref().unwrap_or(&self.site.url)
    }

    /// Path of the frontier database
    pub fn database_path(&self) -> PathBuf {
        match &self.output.database_path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(format!("{}.db", self.file_stem())),
        }
    }

    /// Path of the CSV product records file
    pub fn records_path(&self) -> PathBuf {
        match &self.output.records_path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(format!("{}.csv", self.file_stem())),
        }
    }

    /// Busy-retry back-off as a duration
    pub fn busy_retry_delay(&self) -> Duration {
        Duration::from_millis(self.crawler.busy_retry_delay_ms)
    }

    /// Request timeout as a duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.crawler.request_timeout_secs)
    }

    /// Domain-derived file name stem ("www.example.com" -> "example-com")
    fn file_stem(&self) -> String {
        let host = Url::parse(&self.site.url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
            .unwrap_or_else(|| "crawl".to_string());

        host.strip_prefix("www.").unwrap_or(&host).replace('.', "-")
    }
}
