//! WAMP URI validation and pattern matching.
//!
//! URIs are dot-separated component strings (`com.myapp.topic1`). The loose
//! rules only forbid whitespace, `#` and empty components; wildcard patterns
//! additionally allow empty components as single-segment wildcards.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum URI length accepted by the router.
pub const MAX_URI_LENGTH: usize = 256;

/// URI validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidUri {
    /// URI is the empty string.
    #[error("URI cannot be empty")]
    Empty,

    /// URI exceeds [`MAX_URI_LENGTH`].
    #[error("URI too long")]
    TooLong,

    /// URI contains whitespace or a `#` character.
    #[error("URI contains an illegal character")]
    IllegalChar,

    /// URI has an empty component (and is not a wildcard pattern).
    #[error("URI has an empty component")]
    EmptyComponent,

    /// Strict-mode URI has a component outside `[a-z0-9_]`.
    #[error("URI component violates strict rules")]
    NotStrict,
}

fn check_chars(uri: &str) -> Result<(), InvalidUri> {
    if uri.is_empty() {
        return Err(InvalidUri::Empty);
    }
    if uri.len() > MAX_URI_LENGTH {
        return Err(InvalidUri::TooLong);
    }
    if uri.chars().any(|c| c.is_whitespace() || c == '#') {
        return Err(InvalidUri::IllegalChar);
    }
    Ok(())
}

/// Validate a concrete (non-pattern) URI under the loose rules.
///
/// # Errors
///
/// Returns an [`InvalidUri`] describing the first violation found.
pub fn validate_uri(uri: &str) -> Result<(), InvalidUri> {
    check_chars(uri)?;
    if uri.split('.').any(str::is_empty) {
        return Err(InvalidUri::EmptyComponent);
    }
    Ok(())
}

/// Validate a concrete URI under the strict rules (`[a-z0-9_]` components).
///
/// # Errors
///
/// Returns an [`InvalidUri`] describing the first violation found.
pub fn validate_uri_strict(uri: &str) -> Result<(), InvalidUri> {
    validate_uri(uri)?;
    let ok = uri
        .split('.')
        .all(|c| c.chars().all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_'));
    if ok {
        Ok(())
    } else {
        Err(InvalidUri::NotStrict)
    }
}

/// Validate a wildcard pattern URI, where empty components match any single
/// segment (`com..topic1`).
///
/// # Errors
///
/// Returns an [`InvalidUri`] describing the first violation found.
pub fn validate_wildcard(pattern: &str) -> Result<(), InvalidUri> {
    check_chars(pattern)
}

/// URI matching policy for subscriptions, registrations and permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicy {
    /// The URI must equal the pattern.
    #[default]
    Exact,
    /// The URI must start with the pattern.
    Prefix,
    /// Dot-separated component match; empty pattern components match any
    /// single URI component.
    Wildcard,
}

/// Check whether `uri` matches `pattern` under the given policy.
#[must_use]
pub fn matches(policy: MatchPolicy, pattern: &str, uri: &str) -> bool {
    match policy {
        MatchPolicy::Exact => pattern == uri,
        MatchPolicy::Prefix => uri.starts_with(pattern),
        MatchPolicy::Wildcard => {
            let pat: Vec<&str> = pattern.split('.').collect();
            let got: Vec<&str> = uri.split('.').collect();
            pat.len() == got.len()
                && pat.iter().zip(&got).all(|(p, g)| p.is_empty() || p == g)
        }
    }
}
