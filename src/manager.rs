//! Core cache manager: install and fetch resolution.

use std::sync::Arc;
use std::time::Instant;

use futures::{StreamExt, stream};

use crate::config::{CacheConfig, FetchPolicy};
use crate::error::{Error, Result};
use crate::fetch::{HttpFetcher, NetworkFetcher};
use crate::snapshot::CachedResponse;
use crate::stats::{FetchCounters, FetchStats, InstallStats};
use crate::store::{CacheStore, MemoryStore};
use crate::urls::{UrlList, cache_key};

/// Where a resolved response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeSource {
    /// Answered from the store, no network traffic.
    Cache,
    /// Fetched live and written back to the store.
    Network,
    /// Neither store nor network could answer; the fallback was served.
    OfflineFallback,
}

/// A resolved request: the snapshot plus its provenance.
#[derive(Debug, Clone)]
pub struct Served {
    /// The response snapshot handed to the caller.
    pub response: CachedResponse,
    /// Where the snapshot came from.
    pub source: ServeSource,
}

/// Trait for receiving install progress updates.
///
/// Implement this trait to observe precaching as it runs. All methods
/// have default no-op implementations for convenience.
pub trait PrecacheProgress: Send + Sync {
    /// Called when a resource fetch starts.
    fn on_resource_start(&self, _url: &str) {}

    /// Called when a resource has been fetched and stored.
    fn on_resource_cached(&self, _url: &str, _bytes: u64) {}

    /// Called when fetching or storing a resource fails.
    fn on_resource_error(&self, _url: &str, _error: &str) {}
}

/// A null progress implementation that ignores all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl PrecacheProgress for NoProgress {}

/// Offline cache manager.
///
/// Owns a store, a fetcher, and the URL list to precache. Generic over
/// both seams so tests and alternative backends can slot in.
pub struct CacheManager<S: CacheStore = MemoryStore, N: NetworkFetcher = HttpFetcher> {
    config: CacheConfig,
    urls: UrlList,
    store: S,
    fetcher: N,
    counters: FetchCounters,
}

impl CacheManager<MemoryStore, HttpFetcher> {
    /// Creates a manager with an in-memory store and a default HTTP
    /// fetcher resolving against the configured origin.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: CacheConfig, urls: UrlList) -> Result<Self> {
        let store = MemoryStore::new(&config.cache_name);
        let fetcher = HttpFetcher::new(&config.origin)?;
        Ok(Self::with_parts(config, urls, store, fetcher))
    }
}

impl<S: CacheStore, N: NetworkFetcher> CacheManager<S, N> {
    /// Creates a manager from explicit store and fetcher backends.
    #[must_use]
    pub const fn with_parts(config: CacheConfig, urls: UrlList, store: S, fetcher: N) -> Self {
        Self {
            config,
            urls,
            store,
            fetcher,
            counters: FetchCounters::new(),
        }
    }

    /// Returns a reference to the configuration.
    #[must_use]
    pub const fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Returns a reference to the underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Returns the configured URL list.
    #[must_use]
    pub const fn urls(&self) -> &UrlList {
        &self.urls
    }

    /// Snapshots the fetch-path counters.
    #[must_use]
    pub fn stats(&self) -> FetchStats {
        self.counters.snapshot()
    }

    /// The set of keys install will populate: the URL list, plus the
    /// offline fallback when configured and not already listed.
    fn install_targets(&self) -> Vec<String> {
        let mut targets: Vec<String> = self.urls.entries().to_vec();
        if self.config.precache_offline {
            let offline = cache_key(&self.config.offline_url);
            if !targets.contains(&offline) {
                targets.push(offline);
            }
        }
        targets
    }

    /// Precaches every listed resource, all-or-nothing.
    ///
    /// Fetches run concurrently up to the configured limit. Writes are
    /// keyed by normalized URL, so repeating a completed install
    /// refreshes entries without duplicating them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Precache`] if any resource cannot be fetched with
    /// a success status and stored. Entries written before the failure
    /// remain in the store, but the install must be treated as not done;
    /// retry is the caller's decision.
    pub async fn install(&self, progress: &Arc<dyn PrecacheProgress>) -> Result<InstallStats> {
        let start = Instant::now();
        let targets = self.install_targets();

        let results: Vec<(String, Result<u64>)> = stream::iter(targets.iter())
            .map(|url| async move {
                let result = self.precache_one(url, progress).await;
                (url.clone(), result)
            })
            .buffer_unordered(self.config.concurrent_fetches.max(1))
            .collect()
            .await;

        let mut total_bytes = 0;
        for (url, result) in results {
            match result {
                Ok(bytes) => total_bytes += bytes,
                Err(e) => {
                    return Err(Error::Precache {
                        url,
                        reason: e.to_string(),
                    });
                }
            }
        }

        let stats = InstallStats {
            resources_cached: targets.len(),
            total_bytes,
            elapsed: start.elapsed(),
        };
        log::info!(
            "opened cache {}: precached {} resources ({} bytes)",
            self.store.name(),
            stats.resources_cached,
            stats.total_bytes
        );
        Ok(stats)
    }

    /// Fetches one resource and stores its snapshot, reporting progress.
    async fn precache_one(&self, url: &str, progress: &Arc<dyn PrecacheProgress>) -> Result<u64> {
        progress.on_resource_start(url);
        let outcome = async {
            let snapshot = self.fetcher.fetch(url).await?;
            if !snapshot.is_success() {
                return Err(Error::UnexpectedStatus {
                    url: url.to_string(),
                    status: snapshot.status(),
                });
            }
            self.store.put(url, &snapshot).await?;
            Ok(snapshot.body_len())
        }
        .await;

        match &outcome {
            Ok(bytes) => progress.on_resource_cached(url, *bytes),
            Err(e) => progress.on_resource_error(url, &e.to_string()),
        }
        outcome
    }

    /// Resolves one request under the configured policy.
    ///
    /// Any store or transport error on the policy path degrades to the
    /// offline fallback; the caller always gets a snapshot unless the
    /// fallback itself is not cached.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OfflineUnavailable`] when the request cannot be
    /// satisfied and the offline fallback is missing from the store.
    pub async fn resolve(&self, url: &str) -> Result<Served> {
        let key = cache_key(url);
        let outcome = match self.config.policy {
            FetchPolicy::CacheFirst => self.cache_first(&key).await,
            FetchPolicy::NetworkFirst => self.fetch_and_store(&key).await,
        };
        match outcome {
            Ok(served) => Ok(served),
            Err(e) => {
                log::warn!(
                    "serving {} for {key}: {e}",
                    self.config.offline_url
                );
                self.serve_offline().await
            }
        }
    }

    /// Cache-first path: store lookup, then live fetch on a miss.
    async fn cache_first(&self, key: &str) -> Result<Served> {
        if let Some(snapshot) = self.store.lookup(key).await? {
            self.counters.record_hit();
            return Ok(Served {
                response: snapshot,
                source: ServeSource::Cache,
            });
        }
        self.fetch_and_store(key).await
    }

    /// Fetches live and writes the snapshot back.
    ///
    /// The write-back is best effort: a store failure here is logged and
    /// the fetched response is still served.
    async fn fetch_and_store(&self, key: &str) -> Result<Served> {
        let snapshot = self.fetcher.fetch(key).await?;
        self.counters.record_network();
        if let Err(e) = self.store.put(key, &snapshot).await {
            log::warn!("cache write failed for {key}: {e}");
        }
        Ok(Served {
            response: snapshot,
            source: ServeSource::Network,
        })
    }

    /// Serves the cached offline fallback, the terminal degradation.
    async fn serve_offline(&self) -> Result<Served> {
        let key = cache_key(&self.config.offline_url);
        match self.store.lookup(&key).await {
            Ok(Some(snapshot)) => {
                self.counters.record_offline();
                Ok(Served {
                    response: snapshot,
                    source: ServeSource::OfflineFallback,
                })
            }
            Ok(None) | Err(_) => Err(Error::OfflineUnavailable),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    use async_trait::async_trait;

    /// Fetcher serving canned snapshots and recording every call.
    #[derive(Default)]
    struct MockFetcher {
        responses: Mutex<HashMap<String, CachedResponse>>,
        calls: Mutex<Vec<String>>,
    }

    impl MockFetcher {
        fn new() -> Self {
            Self::default()
        }

        fn serve(&self, url: &str, snapshot: CachedResponse) {
            self.responses
                .lock()
                .unwrap()
                .insert(url.to_string(), snapshot);
        }

        fn serve_ok(&self, url: &str, body: &'static [u8]) {
            self.serve(url, CachedResponse::new(200, vec![], body));
        }

        fn calls_for(&self, url: &str) -> usize {
            self.calls.lock().unwrap().iter().filter(|c| *c == url).count()
        }

        fn total_calls(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl NetworkFetcher for MockFetcher {
        async fn fetch(&self, url: &str) -> Result<CachedResponse> {
            self.calls.lock().unwrap().push(url.to_string());
            self.responses
                .lock()
                .unwrap()
                .get(url)
                .cloned()
                .ok_or_else(|| Error::Config(format!("unreachable host: {url}")))
        }
    }

    /// Store wrapper that fails operations on chosen keys.
    struct FlakyStore {
        inner: MemoryStore,
        fail_lookup: HashSet<String>,
        fail_put: HashSet<String>,
    }

    impl FlakyStore {
        fn new(name: &str) -> Self {
            Self {
                inner: MemoryStore::new(name),
                fail_lookup: HashSet::new(),
                fail_put: HashSet::new(),
            }
        }
    }

    #[async_trait]
    impl CacheStore for FlakyStore {
        fn name(&self) -> &str {
            self.inner.name()
        }

        async fn lookup(&self, key: &str) -> Result<Option<CachedResponse>> {
            if self.fail_lookup.contains(key) {
                return Err(Error::Config(format!("lookup failure: {key}")));
            }
            self.inner.lookup(key).await
        }

        async fn put(&self, key: &str, snapshot: &CachedResponse) -> Result<()> {
            if self.fail_put.contains(key) {
                return Err(Error::Config(format!("write failure: {key}")));
            }
            self.inner.put(key, snapshot).await
        }

        async fn entry_count(&self) -> Result<usize> {
            self.inner.entry_count().await
        }
    }

    fn config() -> CacheConfig {
        CacheConfig::default()
    }

    fn manager_with(
        config: CacheConfig,
        urls: &[&str],
        fetcher: MockFetcher,
    ) -> CacheManager<MemoryStore, MockFetcher> {
        let store = MemoryStore::new(&config.cache_name);
        let urls = UrlList::from_entries(urls).unwrap();
        CacheManager::with_parts(config, urls, store, fetcher)
    }

    fn no_progress() -> Arc<dyn PrecacheProgress> {
        Arc::new(NoProgress)
    }

    /// Fetcher stocked for a standard three-resource site plus fallback.
    fn stocked_fetcher() -> MockFetcher {
        let fetcher = MockFetcher::new();
        fetcher.serve_ok("/", b"<html>home</html>");
        fetcher.serve_ok("/a.css", b"body { margin: 0 }");
        fetcher.serve_ok("/assets/app.js", b"console.log(1)");
        fetcher.serve_ok("/offline", b"<html>offline</html>");
        fetcher
    }

    #[tokio::test]
    async fn install_populates_every_listed_resource() {
        let mgr = manager_with(config(), &["/", "/a.css", "/assets/app.js"], stocked_fetcher());

        let stats = mgr.install(&no_progress()).await.unwrap();

        // Three listed resources plus the offline fallback.
        assert_eq!(stats.resources_cached, 4);
        assert!(stats.total_bytes > 0);
        for url in ["/", "/a.css", "/assets/app.js", "/offline"] {
            assert!(mgr.store().contains(url).await.unwrap(), "missing {url}");
        }
        assert_eq!(mgr.store().entry_count().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn install_skips_offline_when_disabled() {
        let cfg = config().with_precache_offline(false);
        let mgr = manager_with(cfg, &["/a.css"], stocked_fetcher());

        mgr.install(&no_progress()).await.unwrap();

        assert!(!mgr.store().contains("/offline").await.unwrap());
        assert_eq!(mgr.store().entry_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn install_does_not_double_cache_listed_offline() {
        let mgr = manager_with(config(), &["/a.css", "/offline"], stocked_fetcher());

        let stats = mgr.install(&no_progress()).await.unwrap();

        assert_eq!(stats.resources_cached, 2);
        assert_eq!(mgr.store().entry_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn install_is_all_or_nothing() {
        let fetcher = MockFetcher::new();
        fetcher.serve_ok("/a.css", b"ok");
        fetcher.serve_ok("/offline", b"offline");
        // "/broken.js" has no canned response and will fail.
        let mgr = manager_with(config(), &["/a.css", "/broken.js"], fetcher);

        let err = mgr.install(&no_progress()).await.unwrap_err();

        assert!(matches!(err, Error::Precache { ref url, .. } if url == "/broken.js"));
    }

    #[tokio::test]
    async fn install_rejects_non_success_status() {
        let fetcher = stocked_fetcher();
        fetcher.serve("/gone", CachedResponse::new(404, vec![], &b"nope"[..]));
        let mgr = manager_with(config(), &["/gone"], fetcher);

        let err = mgr.install(&no_progress()).await.unwrap_err();

        assert!(
            matches!(err, Error::Precache { ref url, ref reason } if url == "/gone" && reason.contains("404"))
        );
    }

    #[tokio::test]
    async fn install_twice_does_not_duplicate_entries() {
        let mgr = manager_with(config(), &["/", "/a.css"], stocked_fetcher());

        mgr.install(&no_progress()).await.unwrap();
        mgr.install(&no_progress()).await.unwrap();

        // Keyed by request identity: same count after a repeat install.
        assert_eq!(mgr.store().entry_count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn install_reports_progress_per_resource() {
        #[derive(Default)]
        struct Recorder {
            cached: Mutex<Vec<String>>,
            errors: Mutex<Vec<String>>,
        }

        impl PrecacheProgress for Recorder {
            fn on_resource_cached(&self, url: &str, _bytes: u64) {
                self.cached.lock().unwrap().push(url.to_string());
            }

            fn on_resource_error(&self, url: &str, _error: &str) {
                self.errors.lock().unwrap().push(url.to_string());
            }
        }

        let mgr = manager_with(config(), &["/", "/a.css"], stocked_fetcher());
        let recorder = Arc::new(Recorder::default());
        let progress: Arc<dyn PrecacheProgress> = recorder.clone();

        mgr.install(&progress).await.unwrap();

        let mut cached = recorder.cached.lock().unwrap().clone();
        cached.sort();
        assert_eq!(cached, ["/", "/a.css", "/offline"]);
        assert!(recorder.errors.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn cache_first_hit_makes_no_network_call() {
        let mgr = manager_with(config(), &["/a.css"], stocked_fetcher());
        mgr.install(&no_progress()).await.unwrap();
        let calls_after_install = mgr.fetcher.total_calls();

        let served = mgr.resolve("/a.css").await.unwrap();

        assert_eq!(served.source, ServeSource::Cache);
        assert_eq!(served.response.body().as_ref(), b"body { margin: 0 }");
        assert_eq!(mgr.fetcher.total_calls(), calls_after_install);
    }

    #[tokio::test]
    async fn cache_first_miss_fetches_once_and_stores() {
        let fetcher = stocked_fetcher();
        fetcher.serve_ok("/late.js", b"lazy");
        let mgr = manager_with(config(), &[], fetcher);

        let served = mgr.resolve("/late.js").await.unwrap();

        assert_eq!(served.source, ServeSource::Network);
        assert_eq!(mgr.fetcher.calls_for("/late.js"), 1);
        assert!(mgr.store().contains("/late.js").await.unwrap());
    }

    #[tokio::test]
    async fn second_request_is_served_from_cache() {
        let fetcher = stocked_fetcher();
        fetcher.serve_ok("/late.js", b"lazy");
        let mgr = manager_with(config(), &[], fetcher);

        let first = mgr.resolve("/late.js").await.unwrap();
        let second = mgr.resolve("/late.js").await.unwrap();

        assert_eq!(first.source, ServeSource::Network);
        assert_eq!(second.source, ServeSource::Cache);
        // Zero additional network calls for the second request.
        assert_eq!(mgr.fetcher.calls_for("/late.js"), 1);
    }

    #[tokio::test]
    async fn network_first_fetches_every_time() {
        let cfg = config().with_policy(FetchPolicy::NetworkFirst);
        let mgr = manager_with(cfg, &[], stocked_fetcher());

        let first = mgr.resolve("/a.css").await.unwrap();
        let second = mgr.resolve("/a.css").await.unwrap();

        assert_eq!(first.source, ServeSource::Network);
        assert_eq!(second.source, ServeSource::Network);
        assert_eq!(mgr.fetcher.calls_for("/a.css"), 2);
    }

    #[tokio::test]
    async fn network_first_failure_skips_cached_copy() {
        // The network-first path never consults the store for the
        // requested resource; a dead network goes straight to the
        // fallback even when a copy is cached.
        let cfg = config().with_policy(FetchPolicy::NetworkFirst);
        let fetcher = MockFetcher::new();
        let mgr = manager_with(cfg, &[], fetcher);
        mgr.store()
            .put("/a.css", &CachedResponse::new(200, vec![], &b"cached"[..]))
            .await
            .unwrap();
        mgr.store()
            .put("/offline", &CachedResponse::new(200, vec![], &b"offline"[..]))
            .await
            .unwrap();

        let served = mgr.resolve("/a.css").await.unwrap();

        assert_eq!(served.source, ServeSource::OfflineFallback);
        assert_eq!(served.response.body().as_ref(), b"offline");
    }

    #[tokio::test]
    async fn fetch_failure_on_uncached_resource_serves_offline() {
        let mgr = manager_with(config(), &[], stocked_fetcher());
        mgr.install(&no_progress()).await.unwrap();

        let served = mgr.resolve("/nonexistent.js").await.unwrap();

        assert_eq!(served.source, ServeSource::OfflineFallback);
        assert_eq!(served.response.body().as_ref(), b"<html>offline</html>");
    }

    #[tokio::test]
    async fn missing_offline_fallback_is_the_only_error() {
        let cfg = config().with_precache_offline(false);
        let mgr = manager_with(cfg, &[], MockFetcher::new());

        let err = mgr.resolve("/anything").await.unwrap_err();

        assert!(matches!(err, Error::OfflineUnavailable));
    }

    #[tokio::test]
    async fn store_lookup_failure_falls_back_to_offline() {
        let mut store = FlakyStore::new("flaky-v1");
        store.fail_lookup.insert("/a.css".to_string());
        store
            .inner
            .put("/offline", &CachedResponse::new(200, vec![], &b"offline"[..]))
            .await
            .unwrap();
        let mgr = CacheManager::with_parts(config(), UrlList::new(), store, MockFetcher::new());

        let served = mgr.resolve("/a.css").await.unwrap();

        assert_eq!(served.source, ServeSource::OfflineFallback);
    }

    #[tokio::test]
    async fn store_completely_down_surfaces_offline_unavailable() {
        let mut store = FlakyStore::new("flaky-v1");
        store.fail_lookup.insert("/a.css".to_string());
        store.fail_lookup.insert("/offline".to_string());
        let mgr = CacheManager::with_parts(config(), UrlList::new(), store, MockFetcher::new());

        let err = mgr.resolve("/a.css").await.unwrap_err();

        assert!(matches!(err, Error::OfflineUnavailable));
    }

    #[tokio::test]
    async fn cache_write_failure_still_serves_the_response() {
        let mut store = FlakyStore::new("flaky-v1");
        store.fail_put.insert("/late.js".to_string());
        let fetcher = MockFetcher::new();
        fetcher.serve_ok("/late.js", b"lazy");
        let mgr = CacheManager::with_parts(config(), UrlList::new(), store, fetcher);

        let served = mgr.resolve("/late.js").await.unwrap();

        assert_eq!(served.source, ServeSource::Network);
        assert_eq!(served.response.body().as_ref(), b"lazy");
        // The failed write left no entry behind.
        assert!(!mgr.store().contains("/late.js").await.unwrap());
    }

    #[tokio::test]
    async fn non_success_responses_are_stored_and_replayed() {
        let fetcher = MockFetcher::new();
        fetcher.serve("/gone", CachedResponse::new(404, vec![], &b"not here"[..]));
        let mgr = manager_with(config(), &[], fetcher);

        let first = mgr.resolve("/gone").await.unwrap();
        let second = mgr.resolve("/gone").await.unwrap();

        // Only transport errors degrade to the fallback; a 404 is a
        // response like any other and gets cached on the fetch path.
        assert_eq!(first.source, ServeSource::Network);
        assert_eq!(first.response.status(), 404);
        assert_eq!(second.source, ServeSource::Cache);
        assert_eq!(second.response.status(), 404);
    }

    #[tokio::test]
    async fn resolve_normalizes_fragments_to_the_cached_key() {
        let mgr = manager_with(config(), &["/page"], {
            let fetcher = stocked_fetcher();
            fetcher.serve_ok("/page", b"<html>page</html>");
            fetcher
        });
        mgr.install(&no_progress()).await.unwrap();

        let served = mgr.resolve("/page#comments").await.unwrap();

        assert_eq!(served.source, ServeSource::Cache);
    }

    #[tokio::test]
    async fn counters_track_provenance() {
        let fetcher = stocked_fetcher();
        fetcher.serve_ok("/late.js", b"lazy");
        let mgr = manager_with(config(), &["/a.css"], fetcher);
        mgr.install(&no_progress()).await.unwrap();

        mgr.resolve("/a.css").await.unwrap(); // hit
        mgr.resolve("/late.js").await.unwrap(); // miss -> network
        mgr.resolve("/dead.js").await.unwrap(); // failure -> offline

        let stats = mgr.stats();
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.network_fetches, 1);
        assert_eq!(stats.offline_served, 1);
        assert_eq!(stats.total(), 3);
    }

    #[test]
    fn no_progress_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<NoProgress>();
    }
}
