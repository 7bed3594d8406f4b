//! Versioned avatar URL cache with candidate probing.
//!
//! Maps (subject, version) to a resolved URL or a negative marker. On a miss
//! the candidate names are probed in order against the object store.
//! Concurrent misses for the same key share one probe, and the total number of
//! entries is bounded by an LRU.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use lru::LruCache;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tracing::{debug, trace, warn};

use crate::domain::entities::{AvatarNaming, CacheEntry, CacheKey, SubjectId, VersionToken};
use crate::domain::ports::ObjectStorePort;

use super::url_params::with_version_param;

/// Default maximum number of resolved entries kept in memory.
pub const DEFAULT_CACHE_CAPACITY: usize = 512;

/// Default timeout of a single existence probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(1500);

/// Configuration for the resolution cache.
#[derive(Debug, Clone)]
pub struct ResolutionCacheConfig {
    /// Maximum resolved entries across all subjects.
    pub capacity: usize,
    /// Timeout applied to each existence probe.
    pub probe_timeout: Duration,
    /// Append `v={version}` to resolved URLs.
    pub cache_bust: bool,
}

impl Default for ResolutionCacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_CAPACITY,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            cache_bust: true,
        }
    }
}

/// An in-flight resolution that callers can await.
#[derive(Clone)]
pub struct PendingResolution {
    key: CacheKey,
    runtime: Handle,
    future: Shared<BoxFuture<'static, CacheEntry>>,
}

impl PendingResolution {
    #[must_use]
    pub const fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Runtime the resolution runs on.
    #[must_use]
    pub const fn runtime(&self) -> &Handle {
        &self.runtime
    }

    /// Waits for the probe to finish.
    pub async fn wait(self) -> CacheEntry {
        self.future.await
    }
}

impl std::fmt::Debug for PendingResolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingResolution")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

/// Result of [`ResolutionCache::lookup`].
#[derive(Debug, Clone)]
pub enum Lookup {
    /// The key was already resolved.
    Ready(CacheEntry),
    /// The key is being resolved.
    Pending(PendingResolution),
}

struct CacheState {
    entries: LruCache<CacheKey, CacheEntry>,
    pending: HashMap<CacheKey, PendingResolution>,
}

/// Resolves "which URL, if any, shows subject X at version V".
pub struct ResolutionCache {
    store: Arc<dyn ObjectStorePort>,
    naming: AvatarNaming,
    config: ResolutionCacheConfig,
    runtime: Option<Handle>,
    state: Mutex<CacheState>,
    hits: AtomicU64,
    misses: AtomicU64,
    probes: AtomicU64,
}

impl std::fmt::Debug for ResolutionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionCache")
            .field("config", &self.config)
            .field("naming", &self.naming)
            .finish_non_exhaustive()
    }
}

impl ResolutionCache {
    /// Creates a cache over `store`, resolving on the current Tokio runtime.
    ///
    /// Outside a runtime, lookups fall back to whichever runtime they are
    /// called from.
    #[must_use]
    pub fn new(
        store: Arc<dyn ObjectStorePort>,
        naming: AvatarNaming,
        config: ResolutionCacheConfig,
    ) -> Arc<Self> {
        Self::build(store, naming, config, Handle::try_current().ok())
    }

    /// Creates a cache that resolves on `runtime`, so lookups may come from
    /// any thread.
    #[must_use]
    pub fn with_runtime(
        store: Arc<dyn ObjectStorePort>,
        naming: AvatarNaming,
        config: ResolutionCacheConfig,
        runtime: Handle,
    ) -> Arc<Self> {
        Self::build(store, naming, config, Some(runtime))
    }

    fn build(
        store: Arc<dyn ObjectStorePort>,
        naming: AvatarNaming,
        config: ResolutionCacheConfig,
        runtime: Option<Handle>,
    ) -> Arc<Self> {
        let capacity = NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::MIN);
        Arc::new(Self {
            store,
            naming,
            config,
            runtime,
            state: Mutex::new(CacheState {
                entries: LruCache::new(capacity),
                pending: HashMap::new(),
            }),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            probes: AtomicU64::new(0),
        })
    }

    /// Returns the cached entry for `(subject, version)` or starts resolving it.
    ///
    /// A second miss on a key that is still resolving joins the same probe.
    /// With no runtime to resolve on, the key reads as `Missing` and is not
    /// cached.
    pub fn lookup(self: &Arc<Self>, subject: &SubjectId, version: VersionToken) -> Lookup {
        let key = CacheKey::new(subject.clone(), version);
        let mut state = self.state.lock();

        if let Some(entry) = state.entries.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(key = %key, "Avatar cache hit");
            return Lookup::Ready(entry.clone());
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        if let Some(pending) = state.pending.get(&key) {
            trace!(key = %key, "Joining in-flight avatar resolution");
            return Lookup::Pending(pending.clone());
        }

        let Some(runtime) = self.runtime.clone().or_else(|| Handle::try_current().ok()) else {
            warn!(key = %key, "No Tokio runtime to resolve avatar on");
            return Lookup::Ready(CacheEntry::Missing);
        };

        let this = Arc::clone(self);
        let task_key = key.clone();
        let handle = runtime.spawn(async move {
            match AssertUnwindSafe(this.probe(&task_key)).catch_unwind().await {
                Ok(entry) => {
                    this.complete(&task_key, entry.clone());
                    entry
                }
                Err(_) => {
                    warn!(key = %task_key, "Avatar probe panicked");
                    this.abandon(&task_key);
                    CacheEntry::Missing
                }
            }
        });

        let owner = Arc::downgrade(self);
        let join_key = key.clone();
        let future = async move {
            handle.await.unwrap_or_else(|e| {
                warn!(key = %join_key, error = %e, "Avatar resolution task failed");
                if let Some(cache) = owner.upgrade() {
                    cache.abandon(&join_key);
                }
                CacheEntry::Missing
            })
        }
        .boxed()
        .shared();

        let pending = PendingResolution {
            key: key.clone(),
            runtime,
            future,
        };
        state.pending.insert(key, pending.clone());
        Lookup::Pending(pending)
    }

    /// Looks up and waits for the entry.
    pub async fn resolve(self: &Arc<Self>, subject: &SubjectId, version: VersionToken) -> CacheEntry {
        match self.lookup(subject, version) {
            Lookup::Ready(entry) => entry,
            Lookup::Pending(pending) => pending.wait().await,
        }
    }

    /// Returns the entry without resolving or promoting it.
    #[must_use]
    pub fn peek(&self, subject: &SubjectId, version: VersionToken) -> Option<CacheEntry> {
        let key = CacheKey::new(subject.clone(), version);
        self.state.lock().entries.peek(&key).cloned()
    }

    /// Versions currently cached for `subject`.
    #[cfg(test)]
    #[must_use]
    pub fn cached_versions(&self, subject: &SubjectId) -> Vec<VersionToken> {
        let state = self.state.lock();
        let mut versions: Vec<VersionToken> = state
            .entries
            .iter()
            .filter(|(key, _)| &key.subject == subject)
            .map(|(key, _)| key.version)
            .collect();
        versions.sort();
        versions
    }

    /// Drops every resolved entry. In-flight probes still complete.
    pub fn invalidate_all(&self) {
        let mut state = self.state.lock();
        let count = state.entries.len();
        state.entries.clear();
        debug!(count, "Cleared avatar resolution cache");
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns cache statistics.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        CacheStats {
            hits,
            misses,
            probes: self.probes.load(Ordering::Relaxed),
            hit_rate,
            size: self.len(),
        }
    }

    /// Probes candidates in order. Errors and timeouts resolve to `Missing`.
    async fn probe(&self, key: &CacheKey) -> CacheEntry {
        let timeout_ms = u64::try_from(self.config.probe_timeout.as_millis()).unwrap_or(u64::MAX);

        for name in self.naming.candidates(&key.subject) {
            self.probes.fetch_add(1, Ordering::Relaxed);
            match tokio::time::timeout(self.config.probe_timeout, self.store.exists(&name)).await {
                Ok(Ok(true)) => {
                    let public = self.store.public_url(&name);
                    let url = if self.config.cache_bust {
                        with_version_param(&public, key.version)
                    } else {
                        public
                    };
                    debug!(key = %key, name = %name, "Resolved avatar");
                    return CacheEntry::Found { url, name };
                }
                Ok(Ok(false)) => trace!(key = %key, name = %name, "Avatar candidate absent"),
                Ok(Err(e)) => {
                    warn!(key = %key, name = %name, error = %e, "Avatar probe failed");
                    return CacheEntry::Missing;
                }
                Err(_) => {
                    warn!(key = %key, name = %name, timeout_ms, "Avatar probe timed out");
                    return CacheEntry::Missing;
                }
            }
        }

        debug!(key = %key, "Subject has no avatar");
        CacheEntry::Missing
    }

    /// Forgets an in-flight resolution without caching a result.
    fn abandon(&self, key: &CacheKey) {
        self.state.lock().pending.remove(key);
    }

    /// Stores a finished resolution and prunes older versions of the subject.
    fn complete(&self, key: &CacheKey, entry: CacheEntry) {
        let mut state = self.state.lock();
        state.pending.remove(key);

        let mut stale = Vec::new();
        for (cached, _) in state.entries.iter() {
            if cached.subject != key.subject {
                continue;
            }
            if cached.version > key.version {
                trace!(key = %key, newer = %cached.version, "Discarding superseded avatar resolution");
                return;
            }
            if cached.version < key.version {
                stale.push(cached.clone());
            }
        }

        for old in &stale {
            state.entries.pop(old);
        }
        if !stale.is_empty() {
            trace!(key = %key, pruned = stale.len(), "Pruned older avatar entries");
        }

        if let Some((evicted, _)) = state.entries.push(key.clone(), entry) {
            if &evicted != key {
                trace!(evicted = %evicted, "Evicted least recently used avatar entry");
            }
        }
    }
}

/// Statistics about cache performance.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Lookups answered from a resolved entry.
    pub hits: u64,
    /// Lookups that started or joined a resolution.
    pub misses: u64,
    /// Existence probes issued against the store.
    pub probes: u64,
    /// Hit rate as a percentage.
    pub hit_rate: f64,
    /// Current number of resolved entries.
    pub size: usize,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Avatar cache: {} entries, {:.1}% hit rate ({} hits, {} misses, {} probes)",
            self.size, self.hit_rate, self.hits, self.misses, self.probes
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::VersionBroadcaster;
    use crate::application::services::url_params::without_version_param;
    use crate::domain::entities::StoredObjectName;
    use crate::domain::errors::StoreError;
    use crate::domain::ports::mocks::{MemoryObjectStore, StoreCall};
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::atomic::AtomicBool;

    /// Store whose first existence check panics.
    #[derive(Default)]
    struct CrashOnceStore {
        crashed: AtomicBool,
    }

    #[async_trait]
    impl ObjectStorePort for CrashOnceStore {
        async fn put(&self, _: &StoredObjectName, _: Bytes, _: &str) -> Result<(), StoreError> {
            Ok(())
        }

        async fn delete(&self, _: &[StoredObjectName]) -> Result<(), StoreError> {
            Ok(())
        }

        async fn exists(&self, _: &StoredObjectName) -> Result<bool, StoreError> {
            if !self.crashed.swap(true, Ordering::SeqCst) {
                panic!("backend crashed");
            }
            Ok(false)
        }

        fn public_url(&self, name: &StoredObjectName) -> String {
            format!("https://cdn.test/{name}")
        }
    }

    fn subject(id: &str) -> SubjectId {
        SubjectId::new(id).unwrap()
    }

    fn cache_with(
        store: &Arc<MemoryObjectStore>,
        config: ResolutionCacheConfig,
    ) -> Arc<ResolutionCache> {
        ResolutionCache::new(store.clone(), AvatarNaming::default(), config)
    }

    fn cache(store: &Arc<MemoryObjectStore>) -> Arc<ResolutionCache> {
        cache_with(store, ResolutionCacheConfig::default())
    }

    #[tokio::test]
    async fn test_missing_avatar_is_negative_and_cached() {
        let store = Arc::new(MemoryObjectStore::new());
        let cache = cache(&store);
        let u1 = subject("u1");
        let v0 = VersionToken::INITIAL;

        assert_eq!(cache.resolve(&u1, v0).await, CacheEntry::Missing);
        let probes_after_first = store.exists_calls();
        assert_eq!(probes_after_first, 3);

        assert!(matches!(cache.lookup(&u1, v0), Lookup::Ready(CacheEntry::Missing)));
        assert_eq!(store.exists_calls(), probes_after_first);
    }

    #[tokio::test]
    async fn test_legacy_extension_is_resolved() {
        let store = Arc::new(MemoryObjectStore::new());
        store.insert("u2.jpg", b"legacy jpeg");
        let cache = cache(&store);

        let entry = cache.resolve(&subject("u2"), VersionToken::new(4)).await;

        assert_eq!(
            store.calls(),
            vec![
                StoreCall::Exists("u2.webp".to_string()),
                StoreCall::Exists("u2.jpg".to_string()),
            ]
        );
        assert_eq!(entry.url(), Some("https://cdn.test/u2.jpg?v=4"));
    }

    #[tokio::test]
    async fn test_cache_bust_can_be_disabled() {
        let store = Arc::new(MemoryObjectStore::new());
        store.insert("u1.webp", b"webp");
        let cache = cache_with(
            &store,
            ResolutionCacheConfig {
                cache_bust: false,
                ..ResolutionCacheConfig::default()
            },
        );

        let entry = cache.resolve(&subject("u1"), VersionToken::new(2)).await;
        assert_eq!(entry.url(), Some("https://cdn.test/u1.webp"));
    }

    #[tokio::test]
    async fn test_probe_error_is_negative() {
        let store = Arc::new(MemoryObjectStore::new());
        store.insert("u1.webp", b"webp");
        store.set_fail_exists(true);
        let cache = cache(&store);

        let entry = cache.resolve(&subject("u1"), VersionToken::INITIAL).await;

        assert!(entry.is_missing());
        assert_eq!(store.exists_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_timeout_is_negative() {
        let store = Arc::new(MemoryObjectStore::new());
        store.insert("u1.webp", b"webp");
        store.set_probe_delay(Some(Duration::from_secs(30)));
        let cache = cache_with(
            &store,
            ResolutionCacheConfig {
                probe_timeout: Duration::from_millis(50),
                ..ResolutionCacheConfig::default()
            },
        );

        let entry = cache.resolve(&subject("u1"), VersionToken::INITIAL).await;
        assert!(entry.is_missing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_lookups_share_one_probe() {
        let store = Arc::new(MemoryObjectStore::new());
        store.insert("u1.webp", b"webp");
        store.set_probe_delay(Some(Duration::from_millis(100)));
        let cache = cache(&store);
        let u1 = subject("u1");

        let first = cache.lookup(&u1, VersionToken::INITIAL);
        let second = cache.lookup(&u1, VersionToken::INITIAL);
        let (Lookup::Pending(a), Lookup::Pending(b)) = (first, second) else {
            panic!("expected both lookups to be pending");
        };

        let (a, b) = tokio::join!(a.wait(), b.wait());
        assert_eq!(a, b);
        assert_eq!(store.exists_calls(), 1);
    }

    #[tokio::test]
    async fn test_resolution_completes_without_waiters() {
        let store = Arc::new(MemoryObjectStore::new());
        store.insert("u1.webp", b"webp");
        let cache = cache(&store);
        let u1 = subject("u1");

        drop(cache.lookup(&u1, VersionToken::INITIAL));
        for _ in 0..50 {
            if cache.peek(&u1, VersionToken::INITIAL).is_some() {
                break;
            }
            tokio::task::yield_now().await;
        }

        assert!(cache.peek(&u1, VersionToken::INITIAL).is_some());
    }

    #[tokio::test]
    async fn test_new_version_prunes_same_subject_only() {
        let store = Arc::new(MemoryObjectStore::new());
        let cache = cache(&store);
        let (u1, u2) = (subject("u1"), subject("u2"));
        let (v0, v1) = (VersionToken::new(1), VersionToken::new(2));

        cache.resolve(&u1, v0).await;
        cache.resolve(&u2, v0).await;
        cache.resolve(&u1, v1).await;

        assert_eq!(cache.cached_versions(&u1), vec![v1]);
        assert_eq!(cache.cached_versions(&u2), vec![v0]);
    }

    #[tokio::test]
    async fn test_late_older_result_is_not_stored() {
        let store = Arc::new(MemoryObjectStore::new());
        let cache = cache(&store);
        let u1 = subject("u1");

        cache.resolve(&u1, VersionToken::new(5)).await;
        let late = cache.resolve(&u1, VersionToken::new(3)).await;

        assert!(late.is_missing());
        assert_eq!(cache.cached_versions(&u1), vec![VersionToken::new(5)]);
    }

    #[tokio::test]
    async fn test_capacity_evicts_least_recently_used() {
        let store = Arc::new(MemoryObjectStore::new());
        let cache = cache_with(
            &store,
            ResolutionCacheConfig {
                capacity: 2,
                ..ResolutionCacheConfig::default()
            },
        );
        let v = VersionToken::INITIAL;

        cache.resolve(&subject("a"), v).await;
        cache.resolve(&subject("b"), v).await;
        cache.resolve(&subject("a"), v).await;
        cache.resolve(&subject("c"), v).await;

        assert_eq!(cache.len(), 2);
        assert!(cache.peek(&subject("a"), v).is_some());
        assert!(cache.peek(&subject("b"), v).is_none());
    }

    #[tokio::test]
    async fn test_bump_never_serves_older_entry() {
        let store = Arc::new(MemoryObjectStore::new());
        let cache = cache(&store);
        let broadcaster = VersionBroadcaster::new();
        let u1 = subject("u1");

        let before = cache.resolve(&u1, broadcaster.current_token()).await;
        assert!(before.is_missing());

        store.insert("u1.webp", b"new avatar");
        let token = broadcaster.bump();

        assert!(matches!(cache.lookup(&u1, token), Lookup::Pending(_)));
        let after = cache.resolve(&u1, token).await;
        assert_eq!(
            after.url().map(without_version_param).as_deref(),
            Some("https://cdn.test/u1.webp")
        );
    }

    #[tokio::test]
    async fn test_stats_track_hits_misses_and_probes() {
        let store = Arc::new(MemoryObjectStore::new());
        store.insert("u1.webp", b"webp");
        let cache = cache(&store);
        let u1 = subject("u1");

        cache.resolve(&u1, VersionToken::INITIAL).await;
        cache.resolve(&u1, VersionToken::INITIAL).await;

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.probes, 1);
        assert_eq!(stats.size, 1);
    }

    #[tokio::test]
    async fn test_invalidate_all_forces_new_probe() {
        let store = Arc::new(MemoryObjectStore::new());
        let cache = cache(&store);
        let u1 = subject("u1");

        cache.resolve(&u1, VersionToken::INITIAL).await;
        cache.invalidate_all();
        assert!(cache.is_empty());

        cache.resolve(&u1, VersionToken::INITIAL).await;
        assert_eq!(store.exists_calls(), 6);
    }

    #[tokio::test]
    async fn test_panicking_store_does_not_leave_key_pending() {
        let cache = ResolutionCache::new(
            Arc::new(CrashOnceStore::default()),
            AvatarNaming::default(),
            ResolutionCacheConfig::default(),
        );
        let u1 = subject("u1");

        assert!(cache.resolve(&u1, VersionToken::INITIAL).await.is_missing());
        assert!(cache.state.lock().pending.is_empty());
        assert!(cache.peek(&u1, VersionToken::INITIAL).is_none());

        assert!(cache.resolve(&u1, VersionToken::INITIAL).await.is_missing());
        assert_eq!(cache.peek(&u1, VersionToken::INITIAL), Some(CacheEntry::Missing));
    }

    #[test]
    fn test_lookup_outside_runtime_uses_captured_handle() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let store = Arc::new(MemoryObjectStore::new());
        store.insert("u1.webp", b"webp");
        let cache = ResolutionCache::with_runtime(
            store,
            AvatarNaming::default(),
            ResolutionCacheConfig::default(),
            runtime.handle().clone(),
        );

        let Lookup::Pending(pending) = cache.lookup(&subject("u1"), VersionToken::INITIAL) else {
            panic!("first lookup should start a resolution");
        };
        let entry = runtime.block_on(pending.wait());

        assert!(entry.url().is_some());
        assert!(cache.peek(&subject("u1"), VersionToken::INITIAL).is_some());
    }

    #[test]
    fn test_lookup_without_any_runtime_reads_missing() {
        let store = Arc::new(MemoryObjectStore::new());
        store.insert("u1.webp", b"webp");
        let cache = cache(&store);

        let lookup = cache.lookup(&subject("u1"), VersionToken::INITIAL);

        assert!(matches!(lookup, Lookup::Ready(CacheEntry::Missing)));
        assert!(cache.is_empty());
        assert_eq!(store.exists_calls(), 0);
    }
}
