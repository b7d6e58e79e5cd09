//! Storefront Slug Resolver
//!
//! Read-only lookup into the system of record used by cascading invalidation:
//! given a listing, which storefronts currently include it.

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::RwLock;

use crate::cache::domains::ListingId;

// == Resolver Trait ==
/// Resolves the distinct storefront slugs that reference a listing.
pub trait StorefrontSlugResolver: Send + Sync {
    fn resolve_slugs(
        &self,
        listing_id: ListingId,
    ) -> impl Future<Output = anyhow::Result<BTreeSet<String>>> + Send;
}

// == In-Memory Slug Index ==
/// Listing -> storefront slugs, kept in memory.
///
/// Stands in for the database query in tests and in the admin binary.
#[derive(Debug, Default)]
pub struct InMemorySlugIndex {
    slugs: RwLock<HashMap<ListingId, BTreeSet<String>>>,
}

impl InMemorySlugIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that the storefront `slug` includes `listing_id`.
    pub fn insert(&self, listing_id: ListingId, slug: impl Into<String>) {
        let mut slugs = self.slugs.write().unwrap_or_else(|p| p.into_inner());
        slugs.entry(listing_id).or_default().insert(slug.into());
    }

    /// Drops `listing_id` from the storefront `slug`.
    pub fn remove(&self, listing_id: ListingId, slug: &str) {
        let mut slugs = self.slugs.write().unwrap_or_else(|p| p.into_inner());
        if let Some(set) = slugs.get_mut(&listing_id) {
            set.remove(slug);
            if set.is_empty() {
                slugs.remove(&listing_id);
            }
        }
    }
}

impl StorefrontSlugResolver for InMemorySlugIndex {
    async fn resolve_slugs(&self, listing_id: ListingId) -> anyhow::Result<BTreeSet<String>> {
        let slugs = self.slugs.read().unwrap_or_else(|p| p.into_inner());
        Ok(slugs.get(&listing_id).cloned().unwrap_or_default())
    }
}
