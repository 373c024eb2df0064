//! Bearer challenge parsing for OCI registries.
//!
//! A registry that wants a token answers `401 Unauthorized` with a header such as
//! `WWW-Authenticate: Bearer realm="https://auth.docker.io/token",service="registry.docker.io"`.
//! This module turns that header into [`ChallengeParams`], the input of the
//! token exchange.

use std::collections::BTreeMap;


/// The only scheme the proxy knows how to answer.
pub const BEARER_SCHEME: &str = "Bearer";

/// Parameters of a Bearer challenge, keyed by parameter name.
///
/// Empty unless the header's scheme token is exactly `Bearer`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChallengeParams {
    params: BTreeMap<String, String>,
}

impl ChallengeParams {
    /// Parses a `WWW-Authenticate` header value.
    ///
    /// Parameters without `=` or with an empty key or value are skipped. One
    /// leading and one trailing double quote are stripped from each value.
    ///
    /// # Examples
    ///
    /// ```
    /// use libregproxy::auth::ChallengeParams;
    ///
    /// let header = r#"Bearer realm="https://auth.example.com/token",service="registry""#;
    /// let params = ChallengeParams::parse(header);
    /// assert_eq!(params.realm(), Some("https://auth.example.com/token"));
    /// assert_eq!(params.service(), Some("registry"));
    /// assert_eq!(params.scope(), None);
    ///
    /// assert!(ChallengeParams::parse(r#"Basic realm="x""#).is_empty());
    /// ```
    pub fn parse(header: &str) -> Self {
        let mut params = BTreeMap::new();

        let Some((scheme, rest)) = header.split_once(' ') else {
            return Self { params };
        };
        if scheme != BEARER_SCHEME {
            return Self { params };
        }

        for param in split_params(rest) {
            let Some((key, value)) = param.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim();
            if key.is_empty() || value.is_empty() {
                continue;
            }

            let value = value.strip_prefix('"').unwrap_or(value);
            let value = value.strip_suffix('"').unwrap_or(value);
            params.insert(key.to_string(), value.to_string());
        }

        Self { params }
    }

    /// Returns the value of an arbitrary challenge parameter.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// The token endpoint URL.
    pub fn realm(&self) -> Option<&str> {
        self.get("realm")
    }

    /// The service identifier the token is requested for.
    pub fn service(&self) -> Option<&str> {
        self.get("service")
    }

    /// The scope the registry asked for, if it named one.
    pub fn scope(&self) -> Option<&str> {
        self.get("scope")
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Iterates over all parameters in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Returns true if the header names a Bearer challenge anywhere in its value.
///
/// This is the loose check applied before parsing; [`ChallengeParams::parse`]
/// is strict about the scheme position.
pub fn is_bearer_challenge(header: &str) -> bool {
    header.contains(BEARER_SCHEME)
}

/// Splits challenge parameters on commas that are not inside a quoted value.
///
/// `scope="repository:a:pull,push"` stays a single parameter.
fn split_params(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;

    for (idx, ch) in input.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                parts.push(&input[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);

    parts
}
