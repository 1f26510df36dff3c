use crate::config::CrawlTarget;
use crate::url::normalize::normalize_url;

/// Placeholders a link extractor produces for "no link"
///
/// `"None"` is how an absent `href` attribute reads once stringified; it must
/// be rejected exactly like a missing attribute.
const NO_LINK_PLACEHOLDERS: &[&str] = &["", "#", "None"];

/// Substrings of non-navigational link schemes
const NON_NAVIGATIONAL: &[&str] = &["tel:", "mailto:", "javascript:"];

/// Cart and checkout actions; fetching them mutates a live cart
const CART_ACTIONS: &[&str] = &["/checkout/cart/add", "/checkout/#/cart"];

/// Decides which raw hyperlink targets enter the frontier, and in what form
///
/// The classifier is built from the crawl target, so the domain it checks
/// against is explicit configuration rather than shared state.
///
/// # Examples
///
/// ```
/// use vitrine::config::CrawlTarget;
/// use vitrine::url::UrlClassifier;
///
/// let target = CrawlTarget::new("https://example.test", "%/p").unwrap();
/// let classifier = UrlClassifier::new(&target);
///
/// assert!(classifier.accept(Some("/widget/p")));
/// assert!(!classifier.accept(Some("mailto:shop@example.test")));
/// assert_eq!(classifier.normalize("/widget/p"), "https://example.test/widget/p");
/// ```
#[derive(Debug, Clone)]
pub struct UrlClassifier {
    base_url: String,
    domain: String,
}

impl UrlClassifier {
    pub fn new(target: &CrawlTarget) -> Self {
        Self {
            base_url: target.base_url.clone(),
            domain: target.domain.clone(),
        }
    }

    /// The domain same-site links must contain
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Returns true if the raw target should be queued
    ///
    /// Rejected: absent targets and "no link" placeholders, fragment-only
    /// anchors, telephone/mail/script links and any other non-HTTP scheme,
    /// cart/checkout actions, and absolute or protocol-relative URLs on a
    /// foreign domain. Accepted: anything containing the target domain, and
    /// scheme-less relative paths.
    pub fn accept(&self, candidate: Option<&str>) -> bool {
        let candidate = match candidate {
            Some(c) => c.trim(),
            None => return false,
        };

        if NO_LINK_PLACEHOLDERS.contains(&candidate) || candidate.starts_with('#') {
            return false;
        }

        if NON_NAVIGATIONAL.iter().any(|marker| candidate.contains(marker)) {
            return false;
        }

        if CART_ACTIONS.iter().any(|action| candidate.contains(action)) {
            return false;
        }

        if let Some(scheme) = scheme_of(candidate) {
            if !is_http_scheme(scheme) {
                return false;
            }
        }

        if candidate.contains(&self.domain) {
            return true;
        }

        // Same-site relative path: no scheme and no authority of its own
        scheme_of(candidate).is_none() && !candidate.starts_with("//")
    }

    /// Resolves an accepted target into an absolute, percent-encoded URL
    pub fn normalize(&self, candidate: &str) -> String {
        normalize_url(candidate.trim(), &self.base_url, &self.domain)
    }

    /// Accepts and normalizes in one step
    pub fn classify(&self, candidate: Option<&str>) -> Option<String> {
        if self.accept(candidate) {
            candidate.map(|c| self.normalize(c))
        } else {
            None
        }
    }

    /// Classifies a batch of raw targets, keeping accepted ones in order
    pub fn classify_all<'a, I>(&self, candidates: I) -> Vec<String>
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        candidates
            .into_iter()
            .filter_map(|candidate| self.classify(candidate))
            .collect()
    }
}

/// Returns the scheme of a candidate if it starts with one (`scheme:`)
fn scheme_of(candidate: &str) -> Option<&str> {
    let colon = candidate.find(':')?;
    let scheme = &candidate[..colon];

    let mut chars = scheme.chars();
    let first = chars.next()?;
    if first.is_ascii_alphabetic()
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.')
    {
        Some(scheme)
    } else {
        None
    }
}

fn is_http_scheme(scheme: &str) -> bool {
    scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https")
}
