//! Global LRU Module
//!
//! Enforces the entry budget across all domains by evicting the least recently
//! accessed entry, whichever domain it lives in.

use tokio::time::Instant;

use crate::cache::domains::{Domain, UserId};
use crate::cache::DomainTables;

// == Victim ==
/// Location of the entry chosen for eviction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Victim {
    Storefront(String),
    PackDetail(String),
    ShareToken(String),
    UserPurchased(UserId),
    Homepage,
}

impl Victim {
    pub fn domain(&self) -> Domain {
        match self {
            Victim::Storefront(_) => Domain::Storefront,
            Victim::PackDetail(_) => Domain::PackDetail,
            Victim::ShareToken(_) => Domain::ShareToken,
            Victim::UserPurchased(_) => Domain::UserPurchased,
            Victim::Homepage => Domain::Homepage,
        }
    }
}

// == Find Victim ==
/// Scans every domain once and returns the globally least recently accessed entry.
///
/// Ties on access time go to the first domain in [`Domain::ALL`] order, and within
/// a domain to the smallest key.
pub fn find_victim(tables: &DomainTables) -> Option<Victim> {
    let candidates: [Option<(Instant, Victim)>; 5] = [
        tables
            .storefronts
            .oldest()
            .map(|(at, k)| (at, Victim::Storefront(k.clone()))),
        tables
            .pack_details
            .oldest()
            .map(|(at, k)| (at, Victim::PackDetail(k.clone()))),
        tables
            .share_tokens
            .oldest()
            .map(|(at, k)| (at, Victim::ShareToken(k.clone()))),
        tables
            .user_purchased
            .oldest()
            .map(|(at, k)| (at, Victim::UserPurchased(*k))),
        tables.homepage.oldest().map(|(at, _)| (at, Victim::Homepage)),
    ];

    let mut best: Option<(Instant, Victim)> = None;
    for (at, victim) in candidates.into_iter().flatten() {
        // Strict comparison keeps the earlier domain on ties
        if best.as_ref().map_or(true, |(best_at, _)| at < *best_at) {
            best = Some((at, victim));
        }
    }
    best.map(|(_, victim)| victim)
}

// == Remove Victim ==
fn remove_victim(tables: &mut DomainTables, victim: &Victim) -> bool {
    match victim {
        Victim::Storefront(key) => tables.storefronts.remove(key.as_str()),
        Victim::PackDetail(key) => tables.pack_details.remove(key.as_str()),
        Victim::ShareToken(key) => tables.share_tokens.remove(key.as_str()),
        Victim::UserPurchased(user_id) => tables.user_purchased.remove(user_id),
        Victim::Homepage => tables.homepage.remove(&()),
    }
}

// == Evict ==
/// Evicts least recently accessed entries until the total is within `max_entries`.
///
/// Returns the evicted entries in eviction order. Stops if there is nothing left
/// to evict.
pub fn evict_lru(tables: &mut DomainTables, max_entries: usize) -> Vec<Victim> {
    let mut evicted = Vec::new();
    while tables.total_len() > max_entries {
        let Some(victim) = find_victim(tables) else {
            break;
        };
        if !remove_victim(tables, &victim) {
            break;
        }
        evicted.push(victim);
    }
    evicted
}
