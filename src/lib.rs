//! Marketplace Cache - in-process cache for marketplace read models
//!
//! Five typed domains with per-domain TTL expiration, one global LRU budget,
//! request coalescing for fills and targeted invalidation.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::{InMemorySlugIndex, MarketCache, StorefrontSlugResolver};
pub use config::{CacheConfig, Config};
pub use error::{CacheError, Result};
pub use tasks::{spawn_sweeper, SweeperHandle};
