use std::collections::HashMap;
use std::future::Future;

use chrono::{DateTime, Duration, Utc};

use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::models::{CatalogCacheRecord, CatalogEntry, CatalogListing, Freshness};

/// How long a cached genre listing is served without refetching.
pub const FRESHNESS_WINDOW_HOURS: i64 = 24;

/// Stale-while-revalidate cache of genre listings. The only writer of
/// `CatalogCacheRecord`s.
#[derive(Clone)]
pub struct CatalogCacheMerger {
    repository: Repository,
}

impl CatalogCacheMerger {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Serve a fresh cache without fetching, otherwise refresh.
    pub async fn load<F, Fut>(&self, genre_key: &str, fetch_fresh: F) -> Result<CatalogListing>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<CatalogEntry>>>,
    {
        let cached = self.repository.get_catalog_cache(genre_key).await?;
        if let Some(record) = cached {
            if is_fresh(&record, Utc::now()) {
                tracing::debug!("Serving fresh cache for genre {}", genre_key);
                return Ok(CatalogListing {
                    entries: record.entries,
                    freshness: Freshness::Fresh,
                });
            }
            return self.revalidate(genre_key, Some(record), fetch_fresh).await;
        }
        self.revalidate(genre_key, None, fetch_fresh).await
    }

    /// Fetch, merge with the cached tags, persist and return the merged
    /// listing. On fetch failure the existing cache is returned untouched.
    pub async fn refresh<F, Fut>(&self, genre_key: &str, fetch_fresh: F) -> Result<Vec<CatalogEntry>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<CatalogEntry>>>,
    {
        let cached = self.repository.get_catalog_cache(genre_key).await?;
        Ok(self.revalidate(genre_key, cached, fetch_fresh).await?.entries)
    }

    /// Attach curated tags to one cached entry, keeping `last_refreshed_at`.
    pub async fn curate_tags(&self, genre_key: &str, entry_id: &str, tags: Vec<String>) -> Result<()> {
        let mut record = self
            .repository
            .get_catalog_cache(genre_key)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("catalog cache for genre '{}'", genre_key)))?;

        let entry = record
            .entries
            .iter_mut()
            .find(|e| e.id == entry_id)
            .ok_or_else(|| AppError::NotFound(format!("entry '{}' in genre '{}'", entry_id, genre_key)))?;
        entry.local_tags = tags;

        self.repository.save_catalog_cache(&record).await?;
        tracing::info!("Curated tags for {} in genre {}", entry_id, genre_key);
        Ok(())
    }

    async fn revalidate<F, Fut>(
        &self,
        genre_key: &str,
        cached: Option<CatalogCacheRecord>,
        fetch_fresh: F,
    ) -> Result<CatalogListing>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<CatalogEntry>>>,
    {
        let fresh = match fetch_fresh().await {
            Ok(fresh) => fresh,
            Err(e) => {
                return match cached {
                    Some(record) => {
                        tracing::warn!(
                            "Catalog fetch for genre {} failed, serving cache from {}: {}",
                            genre_key,
                            record.last_refreshed_at,
                            e
                        );
                        Ok(CatalogListing {
                            entries: record.entries,
                            freshness: Freshness::Stale,
                        })
                    }
                    None => Err(AppError::CatalogUnavailable(format!("genre '{}': {}", genre_key, e))),
                };
            }
        };

        let cached_entries = cached.map(|r| r.entries).unwrap_or_default();
        let merged = merge_entries(&cached_entries, fresh);

        let record = CatalogCacheRecord {
            genre_key: genre_key.to_string(),
            entries: merged,
            last_refreshed_at: Utc::now(),
        };
        self.repository.save_catalog_cache(&record).await?;
        tracing::info!("Refreshed genre {} with {} entries", genre_key, record.entries.len());

        Ok(CatalogListing {
            entries: record.entries,
            freshness: Freshness::Refreshed,
        })
    }
}

fn is_fresh(record: &CatalogCacheRecord, now: DateTime<Utc>) -> bool {
    now.signed_duration_since(record.last_refreshed_at) < Duration::hours(FRESHNESS_WINDOW_HOURS)
}

/// Keep the fresh listing, carrying cached tags over to fresh entries that
/// have none. Entries the provider no longer returns are dropped.
pub fn merge_entries(cached: &[CatalogEntry], fresh: Vec<CatalogEntry>) -> Vec<CatalogEntry> {
    let cached_tags: HashMap<&str, &Vec<String>> = cached
        .iter()
        .filter(|e| !e.local_tags.is_empty())
        .map(|e| (e.id.as_str(), &e.local_tags))
        .collect();

    fresh
        .into_iter()
        .map(|mut entry| {
            if entry.local_tags.is_empty() {
                if let Some(tags) = cached_tags.get(entry.id.as_str()) {
                    entry.local_tags = (*tags).clone();
                }
            }
            entry
        })
        .collect()
}
