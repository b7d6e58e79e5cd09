//! Cached Domain Types
//!
//! Read models held by each cache domain, plus key and flight-key construction.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

/// Numeric identifier of a pack listing.
pub type ListingId = i64;

/// Numeric identifier of a marketplace user.
pub type UserId = i64;

/// Listing ids a user has purchased or owns.
pub type PurchasedSet = HashSet<ListingId>;

// == Domain ==
/// The five independent key spaces held by the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Storefront,
    PackDetail,
    ShareToken,
    UserPurchased,
    Homepage,
}

impl Domain {
    /// All domains in eviction scan order.
    pub const ALL: [Domain; 5] = [
        Domain::Storefront,
        Domain::PackDetail,
        Domain::ShareToken,
        Domain::UserPurchased,
        Domain::Homepage,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Domain::Storefront => "storefront",
            Domain::PackDetail => "pack_detail",
            Domain::ShareToken => "share_token",
            Domain::UserPurchased => "user_purchased",
            Domain::Homepage => "homepage",
        }
    }
}

// == Storefront View ==
/// Public data rendered on a storefront page.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StorefrontView {
    pub storefront: StorefrontInfo,
    pub featured_packs: Vec<StorefrontPack>,
    pub packs: Vec<StorefrontPack>,
    pub categories: Vec<String>,
    pub custom_products: Vec<CustomProduct>,
    pub layout_config: String,
    pub theme_css: String,
    pub pack_grid_columns: u32,
    /// Custom banner settings keyed by banner slot
    pub banners: BTreeMap<u32, String>,
    /// "default" or "reversed"
    pub hero_layout: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StorefrontInfo {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub logo_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StorefrontPack {
    pub listing_id: ListingId,
    pub name: String,
    pub description: String,
    pub category: String,
    pub share_mode: String,
    pub credits_price: i64,
    pub download_count: i64,
    pub share_token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CustomProduct {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: i64,
}

// == Pack Detail ==
/// Denormalized data for a pack detail page, looked up by share token.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PackDetail {
    pub listing_id: ListingId,
    pub share_token: String,
    pub pack_name: String,
    pub pack_description: String,
    pub source_name: String,
    pub author_name: String,
    pub share_mode: String,
    pub credits_price: i64,
    pub download_count: i64,
    pub category_name: String,
    pub store_slug: String,
    pub store_name: String,
}

// == Homepage View ==
/// Public homepage aggregate, free of any per-user fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HomepageView {
    pub default_lang: String,
    pub download_url_windows: String,
    pub download_url_macos: String,
    pub featured_stores: Vec<HomepageStore>,
    pub top_sales_stores: Vec<HomepageStore>,
    pub top_downloads_stores: Vec<HomepageStore>,
    pub top_sales_products: Vec<HomepageProduct>,
    pub top_downloads_products: Vec<HomepageProduct>,
    pub newest_products: Vec<HomepageProduct>,
    pub categories: Vec<HomepageCategory>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HomepageStore {
    pub slug: String,
    pub name: String,
    pub logo_url: String,
    pub pack_count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HomepageProduct {
    pub listing_id: ListingId,
    pub name: String,
    pub store_slug: String,
    pub credits_price: i64,
    pub download_count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HomepageCategory {
    pub id: i64,
    pub name: String,
    pub pack_count: i64,
}

// == Keys ==
const STOREFRONT_PREFIX: &str = "sf";
const PACK_DETAIL_FLIGHT_PREFIX: &str = "pd";
const SHARE_TOKEN_FLIGHT_PREFIX: &str = "st";
const USER_PURCHASED_FLIGHT_PREFIX: &str = "up";
const HOMEPAGE_FLIGHT_KEY: &str = "homepage";

/// Builds the storefront cache key: `sf:{slug}:{filter}:{sort}:{search}:{category}`.
pub fn storefront_key(slug: &str, filter: &str, sort: &str, search: &str, category: &str) -> String {
    format!(
        "{}:{}:{}:{}:{}:{}",
        STOREFRONT_PREFIX, slug, filter, sort, search, category
    )
}

/// Prefix shared by every storefront key for `slug`: `sf:{slug}:`.
pub fn storefront_prefix(slug: &str) -> String {
    format!("{}:{}:", STOREFRONT_PREFIX, slug)
}

/// Flight key for pack detail fills.
pub fn pack_detail_flight(share_token: &str) -> String {
    format!("{}:{}", PACK_DETAIL_FLIGHT_PREFIX, share_token)
}

/// Flight key for share token resolution.
pub fn share_token_flight(share_token: &str) -> String {
    format!("{}:{}", SHARE_TOKEN_FLIGHT_PREFIX, share_token)
}

/// Flight key for purchased-set fills.
pub fn user_purchased_flight(user_id: UserId) -> String {
    format!("{}:{}", USER_PURCHASED_FLIGHT_PREFIX, user_id)
}

/// Flight key for the homepage aggregate.
pub fn homepage_flight() -> &'static str {
    HOMEPAGE_FLIGHT_KEY
}
