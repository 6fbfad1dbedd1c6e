//! Resource key derivation
//!
//! A resource key is a request path relative to the serving origin, with
//! `/` reserved for the site root. Cache entries are always stored under the
//! canonical URL of their key so that every spelling of a request (query
//! versions, routing fragments, root aliases) hits the same entry.

use crate::error::{CacheError, CacheResult};
use std::fmt;

/// Key of the site root document
pub const ROOT_KEY: &str = "/";

/// Query suffix used by builds to bust intermediate caches
const VERSION_QUERY: &str = "?v=";

/// Normalize a raw key: the empty key is the root
pub fn normalize_key(key: &str) -> String {
    if key.is_empty() {
        ROOT_KEY.to_string()
    } else {
        key.to_string()
    }
}

/// Scheme and authority of the serving site, without a trailing slash
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin(String);

impl Origin {
    /// Parse an origin such as `https://app.example.com` or `http://localhost:8080/`
    pub fn parse(s: &str) -> CacheResult<Self> {
        let trimmed = s.trim().trim_end_matches('/');
        let authority = authority_of(trimmed).ok_or_else(|| CacheError::InvalidOrigin(s.to_string()))?;
        if authority.len() != trimmed.len() {
            return Err(CacheError::InvalidOrigin(s.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Derive the origin of an absolute request URL
    pub fn from_url(url: &str) -> CacheResult<Self> {
        authority_of(url.trim())
            .map(|a| Self(a.to_string()))
            .ok_or_else(|| CacheError::InvalidOrigin(url.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key of a stored entry URL, or `None` when the URL is not under this origin
    pub fn relative_key(&self, url: &str) -> Option<String> {
        let rest = url.strip_prefix(self.0.as_str())?;
        let key = match rest.strip_prefix('/') {
            Some(key) => key,
            None if rest.is_empty() => "",
            None => return None,
        };
        Some(normalize_key(key))
    }

    /// Classify an incoming request URL into a resource key
    ///
    /// The bare origin, routing fragments (`origin/#/...`), an empty path and
    /// any of `root_aliases` map to [`ROOT_KEY`]. A `?v=` suffix is ignored.
    pub fn resource_key(&self, url: &str, root_aliases: &[String]) -> Option<String> {
        let rest = url.strip_prefix(self.0.as_str())?;
        if rest.is_empty() || rest.starts_with('#') || rest.starts_with("/#") {
            return Some(ROOT_KEY.to_string());
        }

        let path = rest.strip_prefix('/')?;
        let path = path.split_once(VERSION_QUERY).map_or(path, |(before, _)| before);
        if path.is_empty() || root_aliases.iter().any(|alias| alias == path) {
            return Some(ROOT_KEY.to_string());
        }
        Some(path.to_string())
    }

    /// URL under which the entry for `key` is stored
    pub fn canonical_url(&self, key: &str) -> String {
        if key == ROOT_KEY {
            format!("{}/", self.0)
        } else {
            format!("{}/{}", self.0, key)
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `scheme://host[:port]` prefix of an absolute http(s) URL
fn authority_of(url: &str) -> Option<&str> {
    let scheme_len = if url.starts_with("https://") {
        "https://".len()
    } else if url.starts_with("http://") {
        "http://".len()
    } else {
        return None;
    };

    let host_len = url[scheme_len..]
        .find(['/', '?', '#'])
        .unwrap_or(url.len() - scheme_len);
    if host_len == 0 {
        return None;
    }
    Some(&url[..scheme_len + host_len])
}
