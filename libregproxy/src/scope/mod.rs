//! Token scope derivation from registry API paths.
//!
//! See <https://distribution.github.io/distribution/spec/auth/scope/>. Only
//! read endpoints are recognised: the proxy never asks for push access.

use regex::Regex;
use std::sync::LazyLock;

#[cfg(test)]
mod tests;

/// Scope used for the `/v2/` version check. The registry accepts any non-empty value.
pub const PING_SCOPE: &str = "any";

const API_PREFIX: &str = "/v2/";

/// Read endpoints, in match order. `repo` is one or more `/`-free segments.
static READ_ENDPOINTS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        // Get blob
        Regex::new(r"^/v2/(?<repo>[^/]+(?:/[^/]+)*)/blobs/").expect("valid blob pattern"),
        // Get manifest
        Regex::new(r"^/v2/(?<repo>[^/]+(?:/[^/]+)*)/manifests/").expect("valid manifest pattern"),
        // List tags
        Regex::new(r"^/v2/(?<repo>[^/]+(?:/[^/]+)*)/tags/list$").expect("valid tags pattern"),
    ]
});

/// Derives the pull scope for a registry API path.
///
/// Returns `None` for paths outside `/v2/` and for endpoints with no
/// repository (catalog, referrers and other unknown paths). Anything under
/// `blobs/`, uploads included, only ever gets a pull scope.
///
/// # Examples
///
/// ```
/// use libregproxy::scope::determine_scope;
///
/// assert_eq!(determine_scope("/v2/").as_deref(), Some("any"));
/// assert_eq!(
///     determine_scope("/v2/library/alpine/manifests/latest").as_deref(),
///     Some("repository:library/alpine:pull")
/// );
/// assert_eq!(determine_scope("/v2/_catalog"), None);
/// ```
pub fn determine_scope(path: &str) -> Option<String> {
    if !path.starts_with(API_PREFIX) {
        return None;
    }
    if path == API_PREFIX {
        return Some(PING_SCOPE.to_string());
    }

    READ_ENDPOINTS.iter().find_map(|pattern| {
        pattern
            .captures(path)
            .and_then(|caps| caps.name("repo"))
            .map(|repo| pull_scope(repo.as_str()))
    })
}

/// Formats the pull scope for a repository.
pub fn pull_scope(repository: &str) -> String {
    format!("repository:{}:pull", repository)
}
