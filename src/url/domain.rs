use url::Url;

/// Extracts the domain from a URL
///
/// Returns the lowercase host portion, or None when the URL has no host.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use vitrine::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Extracts the authority (lowercase host plus any non-default port)
///
/// This is the string a same-site hyperlink is expected to contain.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use vitrine::url::extract_authority;
///
/// let url = Url::parse("https://www.example.com/").unwrap();
/// assert_eq!(extract_authority(&url), Some("www.example.com".to_string()));
///
/// let url = Url::parse("http://localhost:8080/").unwrap();
/// assert_eq!(extract_authority(&url), Some("localhost:8080".to_string()));
/// ```
pub fn extract_authority(url: &Url) -> Option<String> {
    let host = extract_domain(url)?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    })
}
