use std::fmt;

/// A SQL `LIKE` pattern deciding which URLs are product pages
///
/// `%` matches any run of characters (including none) and `_` matches exactly
/// one character; everything else matches itself, case-sensitively. The
/// frontier store evaluates the same pattern in SQL through its `GLOB`
/// translation, so both sides agree on what a product is.
///
/// # Examples
///
/// ```
/// use vitrine::url::ProductPattern;
///
/// let pattern = ProductPattern::new("%/p");
/// assert!(pattern.matches("https://example.com/perfume/p"));
/// assert!(!pattern.matches("https://example.com/perfume"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductPattern(String);

impl ProductPattern {
    pub fn new(pattern: &str) -> Self {
        Self(pattern.to_string())
    }

    /// The raw pattern as configured
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Translates the pattern to SQLite `GLOB` syntax
    ///
    /// `GLOB` is case-sensitive regardless of connection pragmas; literal
    /// `*`, `?` and `[` are wrapped in brackets so they only match themselves.
    pub fn to_glob(&self) -> String {
        let mut glob = String::with_capacity(self.0.len());
        for ch in self.0.chars() {
            match ch {
                '%' => glob.push('*'),
                '_' => glob.push('?'),
                '*' | '?' | '[' => {
                    glob.push('[');
                    glob.push(ch);
                    glob.push(']');
                }
                other => glob.push(other),
            }
        }
        glob
    }

    /// Returns true if the candidate matches the whole pattern
    pub fn matches(&self, candidate: &str) -> bool {
        like_match(&self.0, candidate)
    }
}

impl fmt::Display for ProductPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Greedy wildcard match with single-point backtracking on the last `%`
fn like_match(pattern: &str, candidate: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let candidate: Vec<char> = candidate.chars().collect();

    let (mut p, mut c) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while c < candidate.len() {
        match pattern.get(p) {
            Some('%') => {
                backtrack = Some((p, c));
                p += 1;
            }
            Some('_') => {
                p += 1;
                c += 1;
            }
            Some(&ch) if ch == candidate[c] => {
                p += 1;
                c += 1;
            }
            _ => match backtrack {
                Some((star_p, star_c)) => {
                    p = star_p + 1;
                    c = star_c + 1;
                    backtrack = Some((star_p, star_c + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&ch| ch == '%')
}
