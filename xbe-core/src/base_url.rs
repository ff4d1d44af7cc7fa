//! Base URL normalization.
//!
//! A [`BaseUrl`] is the canonical form of a user-supplied API root. It is the
//! key under which credentials are stored and the root every request path is
//! joined onto, so two spellings of the same root must normalize to the same
//! string:
//!
//! - `app.x-b-e.com` → `https://app.x-b-e.com`
//! - `https://app.x-b-e.com/` → `https://app.x-b-e.com`
//! - `staging` → `https://staging.x-b-e.com`
//!
//! Normalization never fails and is idempotent.

use std::fmt;

/// Default API root used when no base URL is configured.
pub const DEFAULT_BASE_URL: &str = "https://app.x-b-e.com";

/// Scheme prepended to inputs that do not carry one.
const DEFAULT_SCHEME: &str = "https";

/// Environment shorthands accepted in place of a full URL.
const SHORTHANDS: &[(&str, &str)] = &[
    ("production", DEFAULT_BASE_URL),
    ("prod", DEFAULT_BASE_URL),
    ("staging", "https://staging.x-b-e.com"),
    ("local", "http://localhost:3000"),
];

/// A normalized API root.
///
/// Always has an explicit scheme and never ends with a slash.
///
/// # Examples
///
/// ```
/// use xbe_core::BaseUrl;
///
/// let url = BaseUrl::normalize("app.x-b-e.com/");
/// assert_eq!(url.as_str(), "https://app.x-b-e.com");
/// assert_eq!(BaseUrl::normalize(url.as_str()), url);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BaseUrl(String);

impl BaseUrl {
    /// Normalize a user-supplied API root.
    pub fn normalize(input: &str) -> Self {
        Self(normalize(input))
    }

    /// The default API root.
    pub fn default_root() -> Self {
        Self(DEFAULT_BASE_URL.to_string())
    }

    /// Get the normalized URL as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Join a request path onto this root.
    ///
    /// A missing leading slash on `path` is added.
    pub fn join(&self, path: &str) -> String {
        if path.is_empty() {
            self.0.clone()
        } else if path.starts_with('/') {
            format!("{}{}", self.0, path)
        } else {
            format!("{}/{}", self.0, path)
        }
    }
}

impl Default for BaseUrl {
    fn default() -> Self {
        Self::default_root()
    }
}

impl fmt::Display for BaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for BaseUrl {
    fn from(s: &str) -> Self {
        Self::normalize(s)
    }
}

impl From<String> for BaseUrl {
    fn from(s: String) -> Self {
        Self::normalize(&s)
    }
}

impl AsRef<str> for BaseUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Canonicalize an API root into its credential-store key form.
///
/// Blank input (or a bare scheme with no host) yields [`DEFAULT_BASE_URL`].
/// All trailing slashes are removed so the result is a fixed point.
pub fn normalize(input: &str) -> String {
    let trimmed = input.trim();

    let bare = trimmed.trim_end_matches('/');
    if let Some((_, canonical)) = SHORTHANDS
        .iter()
        .find(|(name, _)| bare.eq_ignore_ascii_case(name))
    {
        return (*canonical).to_string();
    }

    let (scheme, rest) = match trimmed.split_once("://") {
        Some((scheme, rest)) if !scheme.is_empty() => (scheme, rest),
        Some((_, rest)) => (DEFAULT_SCHEME, rest),
        None => (DEFAULT_SCHEME, trimmed),
    };

    let rest = rest.trim_end_matches('/');
    if rest.is_empty() {
        return DEFAULT_BASE_URL.to_string();
    }

    format!("{}://{}", scheme, rest)
}
