use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A book as shown in a genre listing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub published_date: Option<String>,
    #[serde(default)]
    pub local_tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogCacheRecord {
    pub genre_key: String,
    pub entries: Vec<CatalogEntry>,
    pub last_refreshed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Served from a cache inside the freshness window; nothing was fetched.
    Fresh,
    /// Fetched from the provider and merged into the cache.
    Refreshed,
    /// The provider failed; an older cache was served unchanged.
    Stale,
}

#[derive(Debug, Clone)]
pub struct CatalogListing {
    pub entries: Vec<CatalogEntry>,
    pub freshness: Freshness,
}
