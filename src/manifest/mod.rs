//! Resource manifests and release descriptions
//!
//! A [`ResourceManifest`] maps every servable resource key to a content
//! fingerprint. It is produced by the build and replaced wholesale on each
//! deploy. A [`Release`] bundles the manifest with the ordered shell
//! resource set that must be cached before the app can start offline.

pub mod store;

pub use store::ManifestStore;

use crate::error::{CacheError, CacheResult};
use crate::key::{normalize_key, ROOT_KEY};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

/// Immutable mapping from resource key to fingerprint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, String>",
    into = "BTreeMap<String, String>"
)]
pub struct ResourceManifest {
    entries: BTreeMap<String, String>,
}

impl From<BTreeMap<String, String>> for ResourceManifest {
    fn from(raw: BTreeMap<String, String>) -> Self {
        raw.into_iter().collect()
    }
}

impl From<ResourceManifest> for BTreeMap<String, String> {
    fn from(manifest: ResourceManifest) -> Self {
        manifest.entries
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for ResourceManifest {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (normalize_key(k.as_ref()), v.into()))
                .collect(),
        }
    }
}

impl ResourceManifest {
    /// Fingerprint recorded for `key`
    pub fn fingerprint(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Keys in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fold root alias keys (such as `index.html`) into the root key
    ///
    /// Aliases are served from the root entry, so the manifest carries a
    /// single key for it. An explicit `/` fingerprint wins over an alias.
    pub fn collapse_root_aliases(mut self, aliases: &[String]) -> Self {
        for alias in aliases {
            if let Some(fingerprint) = self.entries.remove(alias.as_str()) {
                self.entries
                    .entry(ROOT_KEY.to_string())
                    .or_insert(fingerprint);
            }
        }
        self
    }

    /// Whether a cached copy of `key` made under `previous` must be discarded
    ///
    /// True when the key was dropped from this manifest, or when its
    /// fingerprint differs from the one `previous` recorded (a key unknown to
    /// `previous` always differs).
    pub fn is_stale(&self, key: &str, previous: &ResourceManifest) -> bool {
        match self.fingerprint(key) {
            None => true,
            Some(current) => previous.fingerprint(key) != Some(current),
        }
    }

    /// Compare against the manifest of the previous deploy
    pub fn diff(&self, previous: &ResourceManifest) -> ManifestDiff {
        let mut diff = ManifestDiff::default();
        for (key, fingerprint) in &self.entries {
            match previous.fingerprint(key) {
                None => diff.added.push(key.clone()),
                Some(old) if old == fingerprint => diff.unchanged.push(key.clone()),
                Some(_) => diff.changed.push(key.clone()),
            }
        }
        diff.removed = previous
            .keys()
            .filter(|key| !self.contains(key))
            .map(str::to_string)
            .collect();
        diff
    }
}

/// Key-level difference between two manifests, each list sorted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ManifestDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub changed: Vec<String>,
    pub unchanged: Vec<String>,
}

impl ManifestDiff {
    /// Whether the two manifests describe the same content
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

/// A deployable release as emitted by the build
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
    /// Optional human-readable version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Every servable resource and its fingerprint
    pub resources: ResourceManifest,

    /// Resources required before the app can run offline, in fetch order
    #[serde(default)]
    pub shell: Vec<String>,
}

impl Release {
    /// Load a release from a JSON file on disk
    pub async fn from_file(path: &Path) -> CacheResult<Self> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CacheError::ReleaseNotFound(path.to_path_buf()))
            }
            Err(e) => {
                return Err(CacheError::io(
                    format!("reading release {}", path.display()),
                    e,
                ))
            }
        };
        Self::parse(&content, path)
    }

    /// Parse a release from JSON; `path` is used for error reporting
    pub fn parse(content: &str, path: &Path) -> CacheResult<Self> {
        let mut release: Release =
            serde_json::from_str(content).map_err(|e| CacheError::ReleaseInvalid {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        release.shell = release.shell.iter().map(|k| normalize_key(k)).collect();
        for key in release.missing_shell_keys() {
            warn!("Shell resource {} is not listed in the release manifest", key);
        }
        Ok(release)
    }

    /// Rewrite root alias keys to the root key in resources and shell
    pub fn collapse_root_aliases(self, aliases: &[String]) -> Self {
        let mut shell: Vec<String> = Vec::with_capacity(self.shell.len());
        for key in self.shell {
            let key = if aliases.contains(&key) {
                ROOT_KEY.to_string()
            } else {
                key
            };
            if !shell.contains(&key) {
                shell.push(key);
            }
        }

        Self {
            version: self.version,
            resources: self.resources.collapse_root_aliases(aliases),
            shell,
        }
    }

    /// Shell keys the manifest does not list
    pub fn missing_shell_keys(&self) -> Vec<&str> {
        self.shell
            .iter()
            .map(String::as_str)
            .filter(|key| !self.resources.contains(key))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn manifest(pairs: &[(&str, &str)]) -> ResourceManifest {
        pairs.iter().copied().collect()
    }

    #[test]
    fn empty_key_normalizes_to_root() {
        let m = manifest(&[("", "h0"), ("main.js", "h1")]);
        assert_eq!(m.fingerprint("/"), Some("h0"));
        assert!(!m.contains(""));
    }

    #[test]
    fn staleness() {
        let old = manifest(&[("a", "h1"), ("b", "h2"), ("d", "h4")]);
        let new = manifest(&[("a", "h1"), ("b", "h2x"), ("c", "h3")]);

        assert!(!new.is_stale("a", &old));
        assert!(new.is_stale("b", &old), "changed fingerprint");
        assert!(new.is_stale("c", &old), "unknown to the previous manifest");
        assert!(new.is_stale("d", &old), "removed from the new manifest");
        assert!(new.is_stale("zzz", &old));
    }

    #[test]
    fn diff_classifies_keys() {
        let old = manifest(&[("a", "h1"), ("b", "h2"), ("d", "h4")]);
        let new = manifest(&[("a", "h1"), ("b", "h2x"), ("c", "h3")]);

        let diff = new.diff(&old);
        assert_eq!(diff.added, vec!["c"]);
        assert_eq!(diff.removed, vec!["d"]);
        assert_eq!(diff.changed, vec!["b"]);
        assert_eq!(diff.unchanged, vec!["a"]);
        assert!(!diff.is_empty());
        assert!(new.diff(&new).is_empty());
    }

    #[test]
    fn serializes_as_flat_object() {
        let m = manifest(&[("/", "h0"), ("main.js", "h1")]);
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json, r#"{"/":"h0","main.js":"h1"}"#);

        let parsed: ResourceManifest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, m);
    }

    #[test]
    fn parse_release() {
        let json = r#"{
            "version": "1.4.0",
            "resources": { "/": "h0", "main.js": "h1", "index.html": "h2" },
            "shell": ["main.js", "index.html", ""]
        }"#;
        let release = Release::parse(json, &PathBuf::from("release.json")).unwrap();

        assert_eq!(release.version.as_deref(), Some("1.4.0"));
        assert_eq!(release.resources.len(), 3);
        assert_eq!(release.shell, vec!["main.js", "index.html", "/"]);
        assert!(release.missing_shell_keys().is_empty());
    }

    #[test]
    fn root_aliases_fold_into_root() {
        let aliases = vec!["index.html".to_string()];

        let m = manifest(&[("index.html", "h0"), ("main.js", "h1")]).collapse_root_aliases(&aliases);
        assert_eq!(m, manifest(&[("/", "h0"), ("main.js", "h1")]));

        let m = manifest(&[("/", "root"), ("index.html", "alias")]).collapse_root_aliases(&aliases);
        assert_eq!(m.fingerprint("/"), Some("root"));
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn release_shell_aliases_fold_into_root() {
        let json = r#"{
            "resources": { "/": "h0", "index.html": "h0", "main.js": "h1" },
            "shell": ["main.js", "index.html", "/"]
        }"#;
        let release = Release::parse(json, &PathBuf::from("release.json"))
            .unwrap()
            .collapse_root_aliases(&["index.html".to_string()]);

        assert_eq!(release.shell, vec!["main.js", "/"]);
        assert_eq!(release.resources.len(), 2);
        assert!(release.missing_shell_keys().is_empty());
    }

    #[test]
    fn release_reports_unlisted_shell_keys() {
        let json = r#"{ "resources": { "/": "h0" }, "shell": ["main.js"] }"#;
        let release = Release::parse(json, &PathBuf::from("release.json")).unwrap();
        assert_eq!(release.missing_shell_keys(), vec!["main.js"]);
    }

    #[test]
    fn release_requires_resources() {
        let err = Release::parse(r#"{ "shell": [] }"#, &PathBuf::from("r.json")).unwrap_err();
        assert!(matches!(err, CacheError::ReleaseInvalid { .. }));
    }

    #[tokio::test]
    async fn missing_release_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let err = Release::from_file(&temp.path().join("nope.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::ReleaseNotFound(_)));
    }
}
