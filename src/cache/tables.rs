//! Domain Tables Module
//!
//! The five typed domain stores guarded together by the cache's single lock.

use std::sync::Arc;

use tokio::time::Instant;

use crate::cache::domains::{
    Domain, HomepageView, ListingId, PackDetail, PurchasedSet, StorefrontView, UserId,
};
use crate::cache::DomainStore;
use crate::config::CacheConfig;

// == Domain Tables ==
/// All cached state. Every structural mutation happens through `&mut DomainTables`
/// while the owner holds the write lock.
#[derive(Debug)]
pub struct DomainTables {
    /// Keyed by `storefront_key(..)`
    pub storefronts: DomainStore<String, Arc<StorefrontView>>,
    /// Keyed by share token
    pub pack_details: DomainStore<String, Arc<PackDetail>>,
    /// Share token to listing id
    pub share_tokens: DomainStore<String, ListingId>,
    /// Keyed by user id
    pub user_purchased: DomainStore<UserId, PurchasedSet>,
    /// Singleton slot
    pub homepage: DomainStore<(), Arc<HomepageView>>,
}

impl DomainTables {
    /// Creates empty tables with the per-domain TTLs from `config`.
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            storefronts: DomainStore::new(config.storefront_ttl),
            pack_details: DomainStore::new(config.pack_detail_ttl),
            share_tokens: DomainStore::new(config.share_token_ttl),
            user_purchased: DomainStore::new(config.user_purchased_ttl),
            homepage: DomainStore::new(config.homepage_ttl),
        }
    }

    // == Total Length ==
    /// Returns the entry count summed over every domain.
    pub fn total_len(&self) -> usize {
        Domain::ALL.iter().map(|d| self.domain_len(*d)).sum()
    }

    /// Returns the entry count of a single domain.
    pub fn domain_len(&self, domain: Domain) -> usize {
        match domain {
            Domain::Storefront => self.storefronts.len(),
            Domain::PackDetail => self.pack_details.len(),
            Domain::ShareToken => self.share_tokens.len(),
            Domain::UserPurchased => self.user_purchased.len(),
            Domain::Homepage => self.homepage.len(),
        }
    }

    // == Sweep Expired ==
    /// Removes every expired entry in every domain. Returns the number removed.
    pub fn sweep_expired(&mut self, now: Instant) -> usize {
        self.storefronts.sweep_expired(now)
            + self.pack_details.sweep_expired(now)
            + self.share_tokens.sweep_expired(now)
            + self.user_purchased.sweep_expired(now)
            + self.homepage.sweep_expired(now)
    }
}
