//! Market Cache Module
//!
//! The cache manager handlers talk to: typed get/set per domain, read-through fills
//! with stampede protection, invalidation, and the periodic sweep entry point.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::domains::{
    homepage_flight, pack_detail_flight, share_token_flight, storefront_prefix,
    user_purchased_flight, Domain, HomepageView, ListingId, PackDetail, PurchasedSet,
    StorefrontView, UserId,
};
use crate::cache::lru::evict_lru;
use crate::cache::{CacheStats, DomainTables, RequestCoalescer, StatsCounters, StorefrontSlugResolver};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};

// == Market Cache ==
/// In-process cache for the marketplace's hot read models.
///
/// One readers-writer lock guards all five domains. Reads take it shared; writes,
/// eviction, sweeps and invalidation take it exclusively. Fills run through
/// per-domain coalescers and never while the lock is held.
pub struct MarketCache {
    tables: RwLock<DomainTables>,
    /// Total entries, republished after every mutation under the write lock
    entry_total: AtomicUsize,
    config: CacheConfig,
    stats: Arc<StatsCounters>,
    storefront_flights: RequestCoalescer<Arc<StorefrontView>>,
    pack_detail_flights: RequestCoalescer<Arc<PackDetail>>,
    share_token_flights: RequestCoalescer<ListingId>,
    user_purchased_flights: RequestCoalescer<PurchasedSet>,
    homepage_flights: RequestCoalescer<Arc<HomepageView>>,
}

impl MarketCache {
    // == Constructor ==
    /// Creates an empty cache after validating `config`.
    pub fn new(config: CacheConfig) -> Result<Self> {
        config.validate()?;
        let stats = Arc::new(StatsCounters::new());
        Ok(Self {
            tables: RwLock::new(DomainTables::new(&config)),
            entry_total: AtomicUsize::new(0),
            storefront_flights: RequestCoalescer::new(stats.clone()),
            pack_detail_flights: RequestCoalescer::new(stats.clone()),
            share_token_flights: RequestCoalescer::new(stats.clone()),
            user_purchased_flights: RequestCoalescer::new(stats.clone()),
            homepage_flights: RequestCoalescer::new(stats.clone()),
            stats,
            config,
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    // == Write Path ==
    /// Runs `mutate` under the write lock and republishes the entry total.
    async fn mutate<R, F>(&self, mutate: F) -> R
    where
        F: FnOnce(&mut DomainTables, Instant) -> R,
    {
        let mut tables = self.tables.write().await;
        let result = mutate(&mut *tables, Instant::now());
        self.entry_total.store(tables.total_len(), Ordering::Relaxed);
        result
    }

    /// Applies a write, then restores the entry budget.
    async fn write_then_evict<F>(&self, write: F)
    where
        F: FnOnce(&mut DomainTables, Instant),
    {
        let max_entries = self.config.max_entries;
        let evicted = self
            .mutate(|tables, now| {
                write(tables, now);
                evict_lru(tables, max_entries)
            })
            .await;
        for victim in &evicted {
            debug!(domain = victim.domain().as_str(), ?victim, "evicted least recently used entry");
        }
        self.stats.record_evictions(evicted.len());
    }

    // == Read Path ==
    /// Looks up a live value under the read lock without touching the hit/miss counters.
    async fn peek<T, F>(&self, lookup: F) -> Option<T>
    where
        F: FnOnce(&DomainTables, Instant) -> Option<T>,
    {
        let tables = self.tables.read().await;
        lookup(&*tables, Instant::now())
    }

    // == Storefront ==
    /// Looks up a storefront view by its full key (see `storefront_key`).
    pub async fn get_storefront(&self, key: &str) -> Option<Arc<StorefrontView>> {
        let found = self
            .peek(|t, now| t.storefronts.get(key, now).cloned())
            .await;
        self.stats.record_lookup(found.is_some());
        found
    }

    pub async fn set_storefront(&self, key: impl Into<String>, view: Arc<StorefrontView>) {
        let key = key.into();
        self.write_then_evict(|t, now| t.storefronts.set(key, view, now))
            .await;
    }

    /// Coalesces concurrent storefront fills for `key`.
    pub async fn do_storefront_query<F, Fut>(&self, key: &str, fill: F) -> Result<Arc<StorefrontView>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<Arc<StorefrontView>>>,
    {
        self.run_flight(&self.storefront_flights, key, fill).await
    }

    /// Returns the cached storefront view, filling and storing it on a miss.
    pub async fn get_or_fill_storefront<F, Fut>(&self, key: &str, fill: F) -> Result<Arc<StorefrontView>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<Arc<StorefrontView>>>,
    {
        if let Some(view) = self.get_storefront(key).await {
            return Ok(view);
        }
        self.fill_storefront(key, fill).await
    }

    async fn fill_storefront<F, Fut>(&self, key: &str, fill: F) -> Result<Arc<StorefrontView>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<Arc<StorefrontView>>>,
    {
        self.do_storefront_query(key, move || async move {
            if let Some(view) = self.peek(|t, now| t.storefronts.get(key, now).cloned()).await {
                return Ok(view);
            }
            let view = fill().await?;
            self.set_storefront(key, view.clone()).await;
            Ok::<_, anyhow::Error>(view)
        })
        .await
    }

    // == Pack Detail ==
    pub async fn get_pack_detail(&self, share_token: &str) -> Option<Arc<PackDetail>> {
        let found = self
            .peek(|t, now| t.pack_details.get(share_token, now).cloned())
            .await;
        self.stats.record_lookup(found.is_some());
        found
    }

    pub async fn set_pack_detail(&self, share_token: impl Into<String>, detail: Arc<PackDetail>) {
        let share_token = share_token.into();
        self.write_then_evict(|t, now| t.pack_details.set(share_token, detail, now))
            .await;
    }

    /// Coalesces concurrent pack detail fills under the `pd:` flight namespace.
    pub async fn do_pack_detail_query<F, Fut>(&self, share_token: &str, fill: F) -> Result<Arc<PackDetail>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<Arc<PackDetail>>>,
    {
        let flight = pack_detail_flight(share_token);
        self.run_flight(&self.pack_detail_flights, &flight, fill).await
    }

    pub async fn get_or_fill_pack_detail<F, Fut>(&self, share_token: &str, fill: F) -> Result<Arc<PackDetail>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<Arc<PackDetail>>>,
    {
        if let Some(detail) = self.get_pack_detail(share_token).await {
            return Ok(detail);
        }
        self.fill_pack_detail(share_token, fill).await
    }

    async fn fill_pack_detail<F, Fut>(&self, share_token: &str, fill: F) -> Result<Arc<PackDetail>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<Arc<PackDetail>>>,
    {
        self.do_pack_detail_query(share_token, move || async move {
            if let Some(detail) = self
                .peek(|t, now| t.pack_details.get(share_token, now).cloned())
                .await
            {
                return Ok(detail);
            }
            let detail = fill().await?;
            self.set_pack_detail(share_token, detail.clone()).await;
            Ok::<_, anyhow::Error>(detail)
        })
        .await
    }

    // == Share Token Mapping ==
    pub async fn get_share_token(&self, share_token: &str) -> Option<ListingId> {
        let found = self
            .peek(|t, now| t.share_tokens.get(share_token, now).copied())
            .await;
        self.stats.record_lookup(found.is_some());
        found
    }

    pub async fn set_share_token(&self, share_token: impl Into<String>, listing_id: ListingId) {
        let share_token = share_token.into();
        self.write_then_evict(|t, now| t.share_tokens.set(share_token, listing_id, now))
            .await;
    }

    /// Coalesces concurrent share token resolutions under the `st:` flight namespace.
    pub async fn do_share_token_resolve<F, Fut>(&self, share_token: &str, fill: F) -> Result<ListingId>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<ListingId>>,
    {
        let flight = share_token_flight(share_token);
        self.run_flight(&self.share_token_flights, &flight, fill).await
    }

    pub async fn get_or_resolve_share_token<F, Fut>(&self, share_token: &str, fill: F) -> Result<ListingId>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<ListingId>>,
    {
        if let Some(listing_id) = self.get_share_token(share_token).await {
            return Ok(listing_id);
        }
        self.resolve_share_token(share_token, fill).await
    }

    async fn resolve_share_token<F, Fut>(&self, share_token: &str, fill: F) -> Result<ListingId>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<ListingId>>,
    {
        self.do_share_token_resolve(share_token, move || async move {
            if let Some(listing_id) = self
                .peek(|t, now| t.share_tokens.get(share_token, now).copied())
                .await
            {
                return Ok(listing_id);
            }
            let listing_id = fill().await?;
            self.set_share_token(share_token, listing_id).await;
            Ok::<_, anyhow::Error>(listing_id)
        })
        .await
    }

    // == User Purchased Set ==
    /// Returns a private copy of the user's purchased set.
    pub async fn get_user_purchased(&self, user_id: UserId) -> Option<PurchasedSet> {
        let found = self
            .peek(|t, now| t.user_purchased.get(&user_id, now).cloned())
            .await;
        self.stats.record_lookup(found.is_some());
        found
    }

    /// Stores a private copy of `ids`; later changes to the caller's set do not leak in.
    pub async fn set_user_purchased(&self, user_id: UserId, ids: &PurchasedSet) {
        let ids = ids.clone();
        self.write_then_evict(|t, now| t.user_purchased.set(user_id, ids, now))
            .await;
    }

    pub async fn do_user_purchased_query<F, Fut>(&self, user_id: UserId, fill: F) -> Result<PurchasedSet>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<PurchasedSet>>,
    {
        let flight = user_purchased_flight(user_id);
        self.run_flight(&self.user_purchased_flights, &flight, fill).await
    }

    pub async fn get_or_fill_user_purchased<F, Fut>(&self, user_id: UserId, fill: F) -> Result<PurchasedSet>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<PurchasedSet>>,
    {
        if let Some(ids) = self.get_user_purchased(user_id).await {
            return Ok(ids);
        }
        self.fill_user_purchased(user_id, fill).await
    }

    async fn fill_user_purchased<F, Fut>(&self, user_id: UserId, fill: F) -> Result<PurchasedSet>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<PurchasedSet>>,
    {
        self.do_user_purchased_query(user_id, move || async move {
            if let Some(ids) = self
                .peek(|t, now| t.user_purchased.get(&user_id, now).cloned())
                .await
            {
                return Ok(ids);
            }
            let ids = fill().await?;
            self.set_user_purchased(user_id, &ids).await;
            Ok::<_, anyhow::Error>(ids)
        })
        .await
    }

    // == Homepage ==
    pub async fn get_homepage(&self) -> Option<Arc<HomepageView>> {
        let found = self.peek(|t, now| t.homepage.get(&(), now).cloned()).await;
        self.stats.record_lookup(found.is_some());
        found
    }

    pub async fn set_homepage(&self, view: Arc<HomepageView>) {
        self.write_then_evict(|t, now| t.homepage.set((), view, now))
            .await;
    }

    pub async fn do_homepage_query<F, Fut>(&self, fill: F) -> Result<Arc<HomepageView>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<Arc<HomepageView>>>,
    {
        self.run_flight(&self.homepage_flights, homepage_flight(), fill)
            .await
    }

    pub async fn get_or_fill_homepage<F, Fut>(&self, fill: F) -> Result<Arc<HomepageView>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<Arc<HomepageView>>>,
    {
        if let Some(view) = self.get_homepage().await {
            return Ok(view);
        }
        self.fill_homepage(fill).await
    }

    async fn fill_homepage<F, Fut>(&self, fill: F) -> Result<Arc<HomepageView>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<Arc<HomepageView>>>,
    {
        self.do_homepage_query(move || async move {
            if let Some(view) = self.peek(|t, now| t.homepage.get(&(), now).cloned()).await {
                return Ok(view);
            }
            let view = fill().await?;
            self.set_homepage(view.clone()).await;
            Ok::<_, anyhow::Error>(view)
        })
        .await
    }

    // == Flights ==
    async fn run_flight<T, F, Fut>(
        &self,
        flights: &RequestCoalescer<T>,
        key: &str,
        fill: F,
    ) -> Result<T>
    where
        T: Clone + Send + Sync,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        match self.config.fill_timeout {
            Some(timeout) => flights.do_once_with_timeout(key, timeout, fill).await,
            None => flights.do_once(key, fill).await,
        }
    }

    // == Invalidation ==
    /// Removes every cached variant of the storefront `slug`.
    pub async fn invalidate_storefront(&self, slug: &str) -> usize {
        let prefix = storefront_prefix(slug);
        let removed = self
            .mutate(|t, _| t.storefronts.remove_prefix(&prefix))
            .await;
        self.stats.record_invalidated(removed);
        info!(slug, removed, "invalidated storefront cache");
        removed
    }

    pub async fn invalidate_pack_detail(&self, share_token: &str) -> bool {
        let removed = self.mutate(|t, _| t.pack_details.remove(share_token)).await;
        self.stats.record_invalidated(usize::from(removed));
        info!(share_token, removed, "invalidated pack detail cache");
        removed
    }

    pub async fn invalidate_share_token(&self, share_token: &str) -> bool {
        let removed = self.mutate(|t, _| t.share_tokens.remove(share_token)).await;
        self.stats.record_invalidated(usize::from(removed));
        info!(share_token, removed, "invalidated share token mapping");
        removed
    }

    pub async fn invalidate_user_purchased(&self, user_id: UserId) -> bool {
        let removed = self.mutate(|t, _| t.user_purchased.remove(&user_id)).await;
        self.stats.record_invalidated(usize::from(removed));
        info!(user_id, removed, "invalidated user purchased cache");
        removed
    }

    pub async fn invalidate_homepage(&self) -> bool {
        let removed = self.mutate(|t, _| t.homepage.remove(&())).await;
        self.stats.record_invalidated(usize::from(removed));
        info!(removed, "invalidated homepage cache");
        removed
    }

    // == Cascading Invalidation ==
    /// Invalidates every storefront that includes `listing_id`.
    ///
    /// The slug lookup runs before any lock is taken. If it fails the cache is left
    /// as-is and the failure is logged; stale storefronts then age out via TTL.
    /// Returns the number of entries removed.
    pub async fn invalidate_storefronts_by_listing<R>(&self, resolver: &R, listing_id: ListingId) -> usize
    where
        R: StorefrontSlugResolver,
    {
        match self.try_invalidate_storefronts_by_listing(resolver, listing_id).await {
            Ok(removed) => removed,
            Err(err) => {
                warn!(listing_id, error = %err, "skipping storefront invalidation");
                0
            }
        }
    }

    /// Like [`invalidate_storefronts_by_listing`](Self::invalidate_storefronts_by_listing)
    /// but surfaces resolver failures to the caller.
    pub async fn try_invalidate_storefronts_by_listing<R>(
        &self,
        resolver: &R,
        listing_id: ListingId,
    ) -> Result<usize>
    where
        R: StorefrontSlugResolver,
    {
        let slugs = resolver
            .resolve_slugs(listing_id)
            .await
            .map_err(|e| CacheError::Resolver {
                listing_id,
                cause: Arc::new(e),
            })?;

        let mut removed = 0;
        for slug in &slugs {
            removed += self.invalidate_storefront(slug).await;
        }
        info!(listing_id, storefronts = slugs.len(), removed, "invalidated storefronts for listing");
        Ok(removed)
    }

    // == Sweep ==
    /// Removes every expired entry in every domain. Returns the number removed.
    pub async fn sweep_expired(&self) -> usize {
        let removed = self.mutate(|t, now| t.sweep_expired(now)).await;
        self.stats.record_swept(removed);
        removed
    }

    // == Observability ==
    /// Returns the current number of entries across all domains, expired ones included.
    ///
    /// Synchronous and lock-free, so monitoring callbacks can call it from any context.
    /// Reflects the last completed mutation.
    pub fn entry_count(&self) -> usize {
        self.entry_total.load(Ordering::Relaxed)
    }

    /// Returns a snapshot of counters and per-domain entry counts.
    pub async fn stats(&self) -> CacheStats {
        let entries: BTreeMap<Domain, usize> = {
            let tables = self.tables.read().await;
            Domain::ALL
                .iter()
                .map(|d| (*d, tables.domain_len(*d)))
                .collect()
        };
        self.stats.snapshot(entries)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use tokio_test::{assert_err, assert_ok};

    use crate::cache::domains::storefront_key;
    use crate::cache::InMemorySlugIndex;

    fn cache() -> MarketCache {
        MarketCache::new(CacheConfig::default()).unwrap()
    }

    fn cache_with_max(max_entries: usize) -> MarketCache {
        MarketCache::new(CacheConfig {
            max_entries,
            ..CacheConfig::default()
        })
        .unwrap()
    }

    fn view(name: &str) -> Arc<StorefrontView> {
        let mut view = StorefrontView::default();
        view.storefront.name = name.to_string();
        Arc::new(view)
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let result = MarketCache::new(CacheConfig {
            max_entries: 0,
            ..CacheConfig::default()
        });
        assert!(matches!(result, Err(CacheError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_roundtrip_each_domain() {
        let cache = cache();
        let key = storefront_key("acme", "all", "newest", "", "");
        let sf = view("Acme");
        let detail = Arc::new(PackDetail {
            listing_id: 7,
            share_token: "tok".to_string(),
            ..PackDetail::default()
        });
        let home = Arc::new(HomepageView {
            default_lang: "en".to_string(),
            ..HomepageView::default()
        });

        cache.set_storefront(&key, sf.clone()).await;
        cache.set_pack_detail("tok", detail.clone()).await;
        cache.set_share_token("tok", 7).await;
        cache.set_user_purchased(1, &PurchasedSet::from([7, 8])).await;
        cache.set_homepage(home.clone()).await;

        assert_eq!(cache.get_storefront(&key).await, Some(sf));
        assert_eq!(cache.get_pack_detail("tok").await, Some(detail));
        assert_eq!(cache.get_share_token("tok").await, Some(7));
        assert_eq!(cache.get_user_purchased(1).await, Some(PurchasedSet::from([7, 8])));
        assert_eq!(cache.get_homepage().await, Some(home));
        assert_eq!(cache.entry_count(), 5);
    }

    #[tokio::test]
    async fn test_domains_are_independent_key_spaces() {
        let cache = cache();
        cache.set_share_token("same", 1).await;
        cache
            .set_pack_detail("same", Arc::new(PackDetail::default()))
            .await;

        assert!(cache.invalidate_share_token("same").await);
        assert!(cache.get_pack_detail("same").await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_boundary() {
        let cache = cache();
        cache.set_user_purchased(1, &PurchasedSet::from([3])).await;

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(cache.get_user_purchased(1).await.is_some());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(cache.get_user_purchased(1).await.is_none());
        assert_eq!(cache.entry_count(), 1, "expired read does not delete");
    }

    #[tokio::test(start_paused = true)]
    async fn test_global_lru_scenario() {
        let cache = cache_with_max(2);

        cache.set_share_token("A", 1).await;
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.set_pack_detail("B", Arc::new(PackDetail::default())).await;
        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get_share_token("A").await, Some(1));
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.set_homepage(Arc::new(HomepageView::default())).await;

        assert_eq!(cache.entry_count(), 2);
        assert_eq!(cache.get_share_token("A").await, Some(1));
        assert!(cache.get_pack_detail("B").await.is_none());
        assert!(cache.get_homepage().await.is_some());
        assert_eq!(cache.stats().await.evictions, 1);
    }

    #[tokio::test]
    async fn test_purchased_set_is_isolated_from_callers() {
        let cache = cache();
        let mut source = PurchasedSet::from([1, 2]);
        cache.set_user_purchased(9, &source).await;

        source.insert(3);
        let mut first = cache.get_user_purchased(9).await.unwrap();
        assert_eq!(first, PurchasedSet::from([1, 2]));

        first.insert(99);
        first.remove(&1);
        assert_eq!(
            cache.get_user_purchased(9).await,
            Some(PurchasedSet::from([1, 2]))
        );
    }

    #[tokio::test]
    async fn test_invalidate_storefront_prefix_precision() {
        let cache = cache();
        for slug in ["acme", "beta", "acmeco"] {
            for (filter, sort) in [("all", "new"), ("free", "top"), ("paid", "new")] {
                cache
                    .set_storefront(storefront_key(slug, filter, sort, "", ""), view(slug))
                    .await;
            }
        }

        assert_eq!(cache.invalidate_storefront("acme").await, 3);
        assert!(cache
            .get_storefront(&storefront_key("acme", "all", "new", "", ""))
            .await
            .is_none());
        assert!(cache
            .get_storefront(&storefront_key("beta", "free", "top", "", ""))
            .await
            .is_some());
        assert!(cache
            .get_storefront(&storefront_key("acmeco", "paid", "new", "", ""))
            .await
            .is_some());
        assert_eq!(cache.entry_count(), 6);
    }

    #[tokio::test]
    async fn test_invalidation_is_idempotent() {
        let cache = cache();
        assert_eq!(cache.invalidate_storefront("nobody").await, 0);
        assert!(!cache.invalidate_pack_detail("missing").await);
        assert!(!cache.invalidate_share_token("missing").await);
        assert!(!cache.invalidate_user_purchased(404).await);
        assert!(!cache.invalidate_homepage().await);

        cache.set_homepage(Arc::new(HomepageView::default())).await;
        assert!(cache.invalidate_homepage().await);
        assert!(!cache.invalidate_homepage().await);
        assert_eq!(cache.stats().await.invalidated, 1);
    }

    #[tokio::test]
    async fn test_cascading_invalidation() {
        let cache = cache();
        let index = InMemorySlugIndex::new();
        index.insert(7, "acme");
        index.insert(7, "beta");

        for slug in ["acme", "beta", "gamma"] {
            cache
                .set_storefront(storefront_key(slug, "", "", "", ""), view(slug))
                .await;
        }

        assert_eq!(cache.invalidate_storefronts_by_listing(&index, 7).await, 2);
        assert_eq!(cache.entry_count(), 1);
        assert!(cache
            .get_storefront(&storefront_key("gamma", "", "", "", ""))
            .await
            .is_some());
    }

    struct FailingResolver;

    impl StorefrontSlugResolver for FailingResolver {
        async fn resolve_slugs(&self, _listing_id: ListingId) -> anyhow::Result<BTreeSet<String>> {
            Err(anyhow::anyhow!("connection refused"))
        }
    }

    #[tokio::test]
    async fn test_cascading_invalidation_resolver_failure_leaves_cache() {
        let cache = cache();
        cache
            .set_storefront(storefront_key("acme", "", "", "", ""), view("acme"))
            .await;

        assert_eq!(cache.invalidate_storefronts_by_listing(&FailingResolver, 7).await, 0);
        assert_eq!(cache.entry_count(), 1);

        let err = assert_err!(cache.try_invalidate_storefronts_by_listing(&FailingResolver, 7).await);
        assert!(matches!(err, CacheError::Resolver { listing_id: 7, .. }));
    }

    #[tokio::test]
    async fn test_get_or_fill_stores_on_success() {
        let cache = cache();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let id = assert_ok!(
                cache
                    .get_or_resolve_share_token("tok", || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok(42)
                    })
                    .await
            );
            assert_eq!(id, 42);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stats = cache.stats().await;
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.fills, 1);
    }

    #[tokio::test]
    async fn test_get_or_fill_does_not_cache_failures() {
        let cache = cache();

        let err = assert_err!(
            cache
                .get_or_fill_homepage(|| async { Err(anyhow::anyhow!("query failed")) })
                .await
        );
        assert!(matches!(err, CacheError::Fill { .. }));
        assert_eq!(cache.entry_count(), 0);

        let home = assert_ok!(
            cache
                .get_or_fill_homepage(|| async { Ok(Arc::new(HomepageView::default())) })
                .await
        );
        assert_eq!(cache.get_homepage().await, Some(home));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_get_or_fill_runs_one_fill() {
        let cache = Arc::new(cache());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_fill_pack_detail("tok", || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        Ok(Arc::new(PackDetail {
                            listing_id: 5,
                            ..PackDetail::default()
                        }))
                    })
                    .await
            }));
        }

        for handle in handles {
            let detail = handle.await.unwrap().unwrap();
            assert_eq!(detail.listing_id, 5);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.entry_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fill_timeout_from_config() {
        let cache = MarketCache::new(CacheConfig {
            fill_timeout: Some(Duration::from_secs(2)),
            ..CacheConfig::default()
        })
        .unwrap();

        let err = assert_err!(
            cache
                .get_or_fill_user_purchased(1, || async {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(PurchasedSet::new())
                })
                .await
        );
        assert!(matches!(err, CacheError::Timeout { .. }));
        assert_eq!(cache.entry_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_removes_only_expired() {
        let cache = cache();
        cache.set_user_purchased(1, &PurchasedSet::new()).await;
        cache.set_share_token("tok", 1).await;

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(cache.sweep_expired().await, 1);
        assert_eq!(cache.entry_count(), 1);
        assert_eq!(cache.stats().await.swept, 1);
    }

    #[tokio::test]
    async fn test_stats_reports_domains() {
        let cache = cache();
        cache.set_share_token("a", 1).await;
        cache.set_share_token("b", 2).await;
        cache.get_share_token("a").await;
        cache.get_share_token("zzz").await;

        let stats = cache.stats().await;
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.entries_by_domain[&Domain::ShareToken], 2);
        assert_eq!(stats.entries_by_domain[&Domain::Homepage], 0);
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_count_is_synchronous_and_tracks_every_mutation() {
        let cache = cache_with_max(3);
        assert_eq!(cache.entry_count(), 0);

        cache.set_user_purchased(1, &PurchasedSet::new()).await;
        cache.set_share_token("a", 1).await;
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.set_storefront(storefront_key("acme", "", "", "", ""), view("acme")).await;
        cache.set_homepage(Arc::new(HomepageView::default())).await;
        assert_eq!(cache.entry_count(), 3, "eviction is reflected");

        assert!(cache.invalidate_homepage().await);
        assert_eq!(cache.entry_count(), 2);

        assert_eq!(cache.invalidate_storefront("acme").await, 1);
        assert_eq!(cache.entry_count(), 1);

        cache.set_share_token("b", 2).await;
        assert_eq!(cache.entry_count(), 2);
        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(cache.sweep_expired().await, 1, "only the purchased set expired");
        assert_eq!(cache.entry_count(), 1);
        assert_eq!(cache.entry_count(), cache.stats().await.total_entries);
    }

    #[tokio::test]
    async fn test_fill_reuses_value_stored_by_earlier_leader() {
        let cache = cache();
        let key = storefront_key("acme", "all", "", "", "");
        let stored = view("Acme");
        let calls = AtomicUsize::new(0);

        // A caller that missed before the previous leader stored its value
        cache.set_storefront(&key, stored.clone()).await;
        let got = assert_ok!(
            cache
                .fill_storefront(&key, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(view("Other"))
                })
                .await
        );

        assert!(Arc::ptr_eq(&got, &stored));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        cache.set_share_token("tok", 3).await;
        let id = assert_ok!(
            cache
                .resolve_share_token("tok", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(99)
                })
                .await
        );
        assert_eq!(id, 3);

        cache.set_user_purchased(5, &PurchasedSet::from([1])).await;
        let ids = assert_ok!(
            cache
                .fill_user_purchased(5, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(PurchasedSet::new())
                })
                .await
        );
        assert_eq!(ids, PurchasedSet::from([1]));

        let home = Arc::new(HomepageView::default());
        cache.set_homepage(home.clone()).await;
        let got = assert_ok!(
            cache
                .fill_homepage(|| async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Arc::new(HomepageView::default()))
                })
                .await
        );
        assert!(Arc::ptr_eq(&got, &home));

        let detail = Arc::new(PackDetail::default());
        cache.set_pack_detail("tok", detail.clone()).await;
        let got = assert_ok!(
            cache
                .fill_pack_detail("tok", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Arc::new(PackDetail::default()))
                })
                .await
        );
        assert!(Arc::ptr_eq(&got, &detail));

        assert_eq!(calls.load(Ordering::SeqCst), 0, "no redundant fills");
    }

    #[tokio::test]
    async fn test_huge_ttl_is_rejected_before_any_read() {
        let result = MarketCache::new(CacheConfig {
            share_token_ttl: Duration::from_secs(u64::MAX),
            ..CacheConfig::default()
        });
        assert!(matches!(result, Err(CacheError::InvalidConfig(_))));

        let cache = MarketCache::new(CacheConfig {
            share_token_ttl: crate::config::MAX_DURATION,
            ..CacheConfig::default()
        })
        .unwrap();
        cache.set_share_token("tok", 1).await;
        assert_eq!(cache.get_share_token("tok").await, Some(1));
        assert_eq!(cache.sweep_expired().await, 0);
    }
}
