use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters left unescaped: unreserved marks plus the `/`, `:` and `#` delimiters
const URL_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~')
    .remove(b'/')
    .remove(b':')
    .remove(b'#');

/// Resolves a same-site hyperlink target into an absolute, percent-encoded URL
///
/// # Normalization Steps
///
/// 1. Targets already containing the domain are kept as they are, except that
///    protocol-relative ones (`//host/...`) get the base URL's scheme
/// 2. Other targets are treated as relative paths and prefixed with the base
///    URL, inserting a `/` when the path does not start with one
/// 3. The result is percent-encoded, leaving `/`, `:` and `#` unescaped and
///    keeping existing `%XX` escapes intact
///
/// # Examples
///
/// ```
/// use vitrine::url::normalize_url;
///
/// let url = normalize_url("/perfume floral/p", "https://example.com", "example.com");
/// assert_eq!(url, "https://example.com/perfume%20floral/p");
/// ```
pub fn normalize_url(candidate: &str, base_url: &str, domain: &str) -> String {
    let absolute = if candidate.contains(domain) {
        match candidate.strip_prefix("//") {
            Some(rest) => format!("{}://{}", scheme_of(base_url), rest),
            None => candidate.to_string(),
        }
    } else if candidate.starts_with('/') {
        format!("{}{}", base_url, candidate)
    } else {
        format!("{}/{}", base_url, candidate)
    };

    encode_preserving_escapes(&absolute)
}

fn scheme_of(base_url: &str) -> &str {
    base_url.split("://").next().unwrap_or("https")
}

/// Percent-encodes everything outside the safe set, leaving `%XX` escapes alone
fn encode_preserving_escapes(input: &str) -> String {
    let mut encoded = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('%') {
        let (head, tail) = rest.split_at(pos);
        encoded.extend(utf8_percent_encode(head, URL_ENCODE_SET));

        if is_escape(tail) {
            encoded.push_str(&tail[..3]);
            rest = &tail[3..];
        } else {
            encoded.push_str("%25");
            rest = &tail[1..];
        }
    }

    encoded.extend(utf8_percent_encode(rest, URL_ENCODE_SET));
    encoded
}

fn is_escape(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() >= 3 && bytes[1].is_ascii_hexdigit() && bytes[2].is_ascii_hexdigit()
}
