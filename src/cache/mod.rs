//! Cache Module
//!
//! Multi-domain in-memory caching with TTL expiration, global LRU eviction,
//! request coalescing and targeted invalidation.

mod coalesce;
pub mod domains;
mod entry;
pub mod lru;
mod manager;
mod resolver;
mod stats;
mod store;
mod tables;


// Re-export public types
pub use coalesce::RequestCoalescer;
pub use domains::{
    storefront_key, storefront_prefix, Domain, HomepageView, ListingId, PackDetail,
    PurchasedSet, StorefrontView, UserId,
};
pub use entry::CacheEntry;
pub use manager::MarketCache;
pub use resolver::{InMemorySlugIndex, StorefrontSlugResolver};
pub use stats::{CacheStats, StatsCounters};
pub use store::DomainStore;
pub use tables::DomainTables;
