//! Status command - show cache partitions and manifest state

use crate::cli::args::{OutputFormat, StatusArgs};
use crate::config::{Config, ConfigManager};
use crate::error::{CacheError, CacheResult};
use crate::manifest::{ManifestDiff, ManifestStore, Release, ResourceManifest};
use crate::store::{BlobStore, FsStore};
use console::{style, Emoji};
use serde::Serialize;

static CHECK: Emoji<'_, '_> = Emoji("✓ ", "[OK] ");
static CROSS: Emoji<'_, '_> = Emoji("✗ ", "[FAIL] ");
static WARN: Emoji<'_, '_> = Emoji("⚠ ", "[WARN] ");

#[derive(Debug, Serialize)]
struct PartitionStatus {
    name: String,
    role: &'static str,
    /// `None` when the partition does not exist
    entries: Option<usize>,
}

#[derive(Debug, Serialize)]
struct CacheStatus {
    store: String,
    partitions: Vec<PartitionStatus>,
    release: Option<String>,
    release_version: Option<String>,
    state: &'static str,
    diff: Option<ManifestDiff>,
}

/// Execute the status command
pub async fn execute(args: StatusArgs, config: &Config) -> CacheResult<()> {
    let status = collect(config).await?;

    match args.format {
        OutputFormat::Table => print_table(&status),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&status)?),
    }
    Ok(())
}

async fn collect(config: &Config) -> CacheResult<CacheStatus> {
    let store = FsStore::new(ConfigManager::store_dir(config));
    let names = config.store.partition_names();
    let existing = store.partitions().await?;

    let mut partitions = Vec::new();
    for (name, role) in names.all().into_iter().zip(["live", "staging", "manifest"]) {
        let entries = if existing.iter().any(|p| p == name) {
            Some(store.open(name).await?.keys().await?.len())
        } else {
            None
        };
        partitions.push(PartitionStatus {
            name: name.to_string(),
            role,
            entries,
        });
    }

    let stored = if existing.contains(&names.manifest) {
        let partition = store.open(&names.manifest).await?;
        ManifestStore::new(&*partition).load().await?
    } else {
        None
    };

    let release = match Release::from_file(&config.app.release).await {
        Ok(release) => Some(release.collapse_root_aliases(&config.app.root_aliases)),
        Err(CacheError::ReleaseNotFound(_)) => None,
        Err(e) => return Err(e),
    };

    let (state, diff) = classify(release.as_ref().map(|r| &r.resources), stored.as_ref());

    Ok(CacheStatus {
        store: store.root().display().to_string(),
        partitions,
        release: release
            .as_ref()
            .map(|_| config.app.release.display().to_string()),
        release_version: release.and_then(|r| r.version),
        state,
        diff,
    })
}

fn classify(
    release: Option<&ResourceManifest>,
    stored: Option<&ResourceManifest>,
) -> (&'static str, Option<ManifestDiff>) {
    match (release, stored) {
        (_, None) => ("not activated", None),
        (None, Some(_)) => ("no release", None),
        (Some(release), Some(stored)) => {
            let diff = release.diff(stored);
            if diff.is_empty() {
                ("current", Some(diff))
            } else {
                ("outdated", Some(diff))
            }
        }
    }
}

fn print_table(status: &CacheStatus) {
    println!("{}", style("Cache Status").bold().cyan());
    println!();

    println!("{}", style("Store:").bold());
    println!("  {}", status.store);
    println!();

    println!("{}", style("Partitions:").bold());
    println!("  {:<24} {:<10} {:<10}", "NAME", "ROLE", "ENTRIES");
    for p in &status.partitions {
        let entries = match p.entries {
            Some(n) => n.to_string(),
            None => style("-").dim().to_string(),
        };
        println!("  {:<24} {:<10} {:<10}", p.name, p.role, entries);
    }
    println!();

    println!("{}", style("Release:").bold());
    match &status.release {
        Some(path) => println!(
            "  {}{} ({})",
            CHECK,
            path,
            status.release_version.as_deref().unwrap_or("unversioned")
        ),
        None => println!("  {}{}", CROSS, style("release file not found").red()),
    }
    println!();

    println!("{}", style("Manifest:").bold());
    match (status.state, &status.diff) {
        ("current", _) => println!("  {}{}", CHECK, style("cache matches the release").green()),
        ("outdated", Some(diff)) => {
            println!("  {}{}", WARN, style("cache is behind the release").yellow());
            println!(
                "    {} added, {} removed, {} changed, {} unchanged",
                diff.added.len(),
                diff.removed.len(),
                diff.changed.len(),
                diff.unchanged.len()
            );
            println!("    Run: cachesync sync");
        }
        ("no release", _) => println!("  {}stored manifest present, no release to compare", WARN),
        _ => {
            println!("  {}{}", CROSS, style("not activated").red());
            println!("    Run: cachesync sync");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(pairs: &[(&str, &str)]) -> ResourceManifest {
        pairs.iter().copied().collect()
    }

    #[test]
    fn classify_states() {
        let v1 = manifest(&[("a", "h1")]);
        let v2 = manifest(&[("a", "h2")]);

        assert_eq!(classify(Some(&v1), None).0, "not activated");
        assert_eq!(classify(None, Some(&v1)).0, "no release");
        assert_eq!(classify(Some(&v1), Some(&v1)).0, "current");

        let aliased = manifest(&[("index.html", "h0")]).collapse_root_aliases(&["index.html".to_string()]);
        let stored = manifest(&[("/", "h0")]);
        assert_eq!(classify(Some(&aliased), Some(&stored)).0, "current");

        let (state, diff) = classify(Some(&v2), Some(&v1));
        assert_eq!(state, "outdated");
        assert_eq!(diff.unwrap().changed, vec!["a"]);
    }

    #[tokio::test]
    async fn collect_empty_store() {
        let temp = tempfile::TempDir::new().unwrap();
        let mut config = Config::default();
        config.store.dir = Some(temp.path().join("store"));
        config.app.release = temp.path().join("release.json");

        let status = collect(&config).await.unwrap();
        assert_eq!(status.state, "not activated");
        assert!(status.release.is_none());
        assert_eq!(status.partitions.len(), 3);
        assert!(status.partitions.iter().all(|p| p.entries.is_none()));
    }
}
