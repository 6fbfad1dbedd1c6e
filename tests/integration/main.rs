//! Integration tests for cachesync

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::Path;
    use tempfile::TempDir;

    const RELEASE: &str = r#"{
        "version": "1.0.0",
        "resources": { "/": "h0", "main.js": "h1" },
        "shell": ["/", "main.js"]
    }"#;

    /// A command isolated from the user's config and data directories
    fn cachesync(temp: &TempDir) -> Command {
        let mut cmd = cargo_bin_cmd!("cachesync");
        cmd.env("CACHESYNC_CONFIG", temp.path().join("config.toml"))
            .env("CACHESYNC_STORE", temp.path().join("store"))
            .env("CACHESYNC_RELEASE", temp.path().join("release.json"))
            .env_remove("CACHESYNC_ORIGIN");
        cmd
    }

    fn write_release(dir: &Path) {
        std::fs::write(dir.join("release.json"), RELEASE).unwrap();
    }

    #[test]
    fn help_displays() {
        let temp = TempDir::new().unwrap();
        cachesync(&temp)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Offline resource cache synchronizer"));
    }

    #[test]
    fn version_displays() {
        let temp = TempDir::new().unwrap();
        cachesync(&temp)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("cachesync"));
    }

    #[test]
    fn config_path() {
        let temp = TempDir::new().unwrap();
        cachesync(&temp)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let temp = TempDir::new().unwrap();
        cachesync(&temp)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[general]"))
            .stdout(predicate::str::contains("app-cache"));
    }

    #[test]
    fn config_init_writes_file_once() {
        let temp = TempDir::new().unwrap();
        cachesync(&temp)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration initialized"));
        assert!(temp.path().join("config.toml").exists());

        cachesync(&temp)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("already exists"));
    }

    #[test]
    fn invalid_config_fails() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("config.toml"), "[network]\ntimeout_secs = \"x\"\n")
            .unwrap();
        cachesync(&temp)
            .args(["status"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn status_empty_store() {
        let temp = TempDir::new().unwrap();
        cachesync(&temp)
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("app-cache"))
            .stdout(predicate::str::contains("not activated"));
    }

    #[test]
    fn status_json() {
        let temp = TempDir::new().unwrap();
        write_release(temp.path());
        cachesync(&temp)
            .args(["status", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"state\": \"not activated\""))
            .stdout(predicate::str::contains("\"release_version\": \"1.0.0\""));
    }

    #[test]
    fn fetch_before_sync_fails() {
        let temp = TempDir::new().unwrap();
        write_release(temp.path());
        cachesync(&temp)
            .args(["fetch", "http://127.0.0.1:9/main.js"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("not been activated"))
            .stderr(predicate::str::contains("cachesync sync"));
    }

    #[test]
    fn fetch_relative_without_origin_fails() {
        let temp = TempDir::new().unwrap();
        write_release(temp.path());
        cachesync(&temp)
            .args(["fetch", "main.js"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("No origin configured"));
    }

    #[test]
    fn install_missing_release_fails() {
        let temp = TempDir::new().unwrap();
        cachesync(&temp)
            .args(["install", "--origin", "http://127.0.0.1:9"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Release file not found"));
    }

    #[test]
    fn install_unreachable_origin_fails() {
        let temp = TempDir::new().unwrap();
        write_release(temp.path());
        cachesync(&temp)
            .args(["install", "--origin", "http://127.0.0.1:9"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Network request"));
    }

    #[test]
    fn activate_without_install_fails() {
        let temp = TempDir::new().unwrap();
        write_release(temp.path());
        cachesync(&temp)
            .args(["activate", "--origin", "http://127.0.0.1:9"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("cachesync install"));
    }

    #[test]
    fn unknown_message_is_ignored() {
        let temp = TempDir::new().unwrap();
        write_release(temp.path());
        cachesync(&temp)
            .args(["message", "hello", "--origin", "http://127.0.0.1:9"])
            .assert()
            .success()
            .stdout(predicate::str::contains("ignored"));
    }

    #[test]
    fn clear_empty_store() {
        let temp = TempDir::new().unwrap();
        cachesync(&temp)
            .args(["clear", "-y"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No cache partitions to clear"));
    }

    #[test]
    fn fetch_help() {
        let temp = TempDir::new().unwrap();
        cachesync(&temp)
            .args(["fetch", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Serve a request through the cache"));
    }
}

mod engine_tests {
    use cachesync::cli::host::CliHost;
    use cachesync::context::CacheContext;
    use cachesync::intercept::{Intercept, Source};
    use cachesync::key::Origin;
    use cachesync::lifecycle::{Coordinator, Phase};
    use cachesync::manifest::{Release, ResourceManifest};
    use cachesync::reconcile::Reconciler;
    use cachesync::store::{BlobStore, MemoryStore, Response};
    use cachesync::transport::{MemoryTransport, Request};
    use std::sync::Arc;

    const ORIGIN: &str = "https://app.test";

    fn context(store: &Arc<MemoryStore>, transport: &Arc<MemoryTransport>) -> CacheContext {
        CacheContext::new(
            store.clone(),
            transport.clone(),
            Origin::parse(ORIGIN).unwrap(),
        )
    }

    fn release(pairs: &[(&str, &str)], shell: &[&str]) -> Release {
        Release {
            version: None,
            resources: pairs.iter().copied().collect(),
            shell: shell.iter().map(|k| k.to_string()).collect(),
        }
    }

    async fn deploy(
        store: &Arc<MemoryStore>,
        transport: &Arc<MemoryTransport>,
        release: Release,
    ) -> Coordinator {
        let coordinator = Coordinator::new(context(store, transport), release, Arc::new(CliHost));
        coordinator.on_install().await.unwrap();
        coordinator.on_activate().await.unwrap();
        assert_eq!(coordinator.phase().await, Phase::Serving);
        coordinator
    }

    async fn live_urls(store: &MemoryStore) -> Vec<String> {
        store.open("app-cache").await.unwrap().keys().await.unwrap()
    }

    #[tokio::test]
    async fn upgrade_keeps_unchanged_and_drops_removed() {
        let store = Arc::new(MemoryStore::new());
        let transport = Arc::new(MemoryTransport::new());
        transport.route_ok("https://app.test/a", "a-v1").await;
        transport.route_ok("https://app.test/b", "b-v1").await;

        deploy(&store, &transport, release(&[("a", "h1"), ("b", "h2")], &["a", "b"])).await;
        assert_eq!(
            live_urls(&store).await,
            vec!["https://app.test/a", "https://app.test/b"]
        );

        transport.route_ok("https://app.test/c", "c-v2").await;
        transport.clear_log().await;
        let v2 = deploy(&store, &transport, release(&[("a", "h1"), ("c", "h3")], &[])).await;
        assert_eq!(live_urls(&store).await, vec!["https://app.test/a"]);

        let a = v2.on_fetch(&Request::get("https://app.test/a")).await.unwrap();
        assert_eq!(a, Intercept::Response(Response::new(200, "a-v1"), Source::Cache));
        assert!(transport.fetched().await.is_empty(), "a is served without network");

        let c = v2.on_fetch(&Request::get("https://app.test/c")).await.unwrap();
        assert_eq!(c, Intercept::Response(Response::new(200, "c-v2"), Source::Network));
        let c = v2.on_fetch(&Request::get("https://app.test/c")).await.unwrap();
        assert!(matches!(c, Intercept::Response(_, Source::Cache)));

        let b = v2.on_fetch(&Request::get("https://app.test/b")).await.unwrap();
        assert_eq!(b, Intercept::PassThrough);
    }

    #[tokio::test]
    async fn changed_resource_is_refetched() {
        let store = Arc::new(MemoryStore::new());
        let transport = Arc::new(MemoryTransport::new());
        transport.route_ok("https://app.test/a", "a-v1").await;

        deploy(&store, &transport, release(&[("a", "h1")], &["a"])).await;

        transport.route_ok("https://app.test/a", "a-v2").await;
        let v2 = deploy(&store, &transport, release(&[("a", "h2")], &[])).await;
        assert!(live_urls(&store).await.is_empty());

        let a = v2.on_fetch(&Request::get("https://app.test/a")).await.unwrap();
        assert_eq!(a, Intercept::Response(Response::new(200, "a-v2"), Source::Network));
    }

    #[tokio::test]
    async fn root_served_from_cache_offline() {
        let store = Arc::new(MemoryStore::new());
        let transport = Arc::new(MemoryTransport::new());
        transport.route_ok("https://app.test/", "<html>v1</html>").await;

        let coordinator = deploy(&store, &transport, release(&[("/", "h0")], &["/"])).await;
        transport.set_offline(true);

        for url in [
            "https://app.test",
            "https://app.test/#/settings",
            "https://app.test/index.html?v=123",
        ] {
            let result = coordinator.on_fetch(&Request::get(url)).await.unwrap();
            assert_eq!(
                result,
                Intercept::Response(Response::new(200, "<html>v1</html>"), Source::Cache),
                "{}",
                url
            );
        }
    }

    #[tokio::test]
    async fn reconcile_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let transport = Arc::new(MemoryTransport::new());
        let manifest: ResourceManifest = [("a", "h1"), ("b", "h2")].into_iter().collect();

        let staging = store.open("app-temp-cache").await.unwrap();
        staging.put("https://app.test/a", &Response::new(200, "a")).await.unwrap();
        staging.put("https://app.test/b", &Response::new(200, "b")).await.unwrap();

        let reconciler = Reconciler::new(context(&store, &transport));
        assert!(reconciler.reconcile(&manifest).await.unwrap().cold_start);
        let first = live_urls(&store).await;
        assert_eq!(first.len(), 2);

        let second = reconciler.reconcile(&manifest).await.unwrap();
        assert!(second.evicted.is_empty());
        assert_eq!(live_urls(&store).await, first);
        assert!(!store
            .partitions()
            .await
            .unwrap()
            .contains(&"app-temp-cache".to_string()));
    }

    #[tokio::test]
    async fn restarted_process_resumes_serving() {
        let store = Arc::new(MemoryStore::new());
        let transport = Arc::new(MemoryTransport::new());
        transport.route_ok("https://app.test/a", "a").await;
        let v1 = release(&[("a", "h1")], &["a"]);

        deploy(&store, &transport, v1.clone()).await;

        let restarted = Coordinator::new(context(&store, &transport), v1, Arc::new(CliHost));
        restarted.resume().await.unwrap();
        let result = restarted
            .on_fetch(&Request::get("https://app.test/a"))
            .await
            .unwrap();
        assert!(matches!(result, Intercept::Response(_, Source::Cache)));
    }
}
