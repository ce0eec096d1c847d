use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::{JoinError, JoinSet};

use crate::catalog::{find_genre, CatalogCacheMerger, GoogleBooksClient};
use crate::config::Config;
use crate::db::Repository;
use crate::error::Result;
use crate::models::{CatalogEntry, CatalogListing, Freshness};
use crate::reviews::ReviewFeed;
use crate::votes::{VoteAggregator, VoteLedger};

pub struct App {
    pub config: Config,

    // Services
    pub ledger: VoteLedger,
    pub aggregator: VoteAggregator,
    pub reviews: ReviewFeed,
    pub catalog: CatalogCacheMerger,
    books: Arc<GoogleBooksClient>,

    // Revalidations started after serving a fresh cache
    background: Mutex<JoinSet<()>>,
}

impl App {
    pub async fn new(config: Config) -> Result<Self> {
        let repository = Repository::new(&config.db_path).await?;
        let books = Arc::new(GoogleBooksClient::new(
            config.google_books_api_key.clone(),
            config.catalog_max_results,
        )?);

        Ok(Self {
            ledger: VoteLedger::new(repository.clone()),
            aggregator: VoteAggregator::new(repository.clone()),
            reviews: ReviewFeed::new(repository.clone()),
            catalog: CatalogCacheMerger::new(repository),
            books,
            background: Mutex::new(JoinSet::new()),
            config,
        })
    }

    /// The listing for a genre. A fresh cache is returned immediately and
    /// revalidated in the background for the next caller.
    pub async fn genre_listing(&self, genre_key: &str) -> Result<CatalogListing> {
        let genre = find_genre(genre_key)?;
        let books = Arc::clone(&self.books);
        let listing = self
            .catalog
            .load(genre.key, || async move { books.search(genre.query).await })
            .await?;

        if listing.freshness == Freshness::Fresh {
            let catalog = self.catalog.clone();
            let books = Arc::clone(&self.books);
            self.spawn_background(async move {
                let fetch = || async move { books.search(genre.query).await };
                if let Err(e) = catalog.refresh(genre.key, fetch).await {
                    tracing::error!("Background refresh of genre {} failed: {}", genre.key, e);
                }
            })
            .await;
        }

        Ok(listing)
    }

    /// Refetch a genre now regardless of cache age.
    pub async fn refresh_genre(&self, genre_key: &str) -> Result<Vec<CatalogEntry>> {
        let genre = find_genre(genre_key)?;
        let books = Arc::clone(&self.books);
        self.catalog
            .refresh(genre.key, || async move { books.search(genre.query).await })
            .await
    }

    /// Wait for background revalidations to finish. Tasks spawned while
    /// waiting are left for the next call.
    pub async fn wait_background(&self) {
        let mut pending = std::mem::take(&mut *self.background.lock().await);
        while let Some(joined) = pending.join_next().await {
            log_joined(joined);
        }
    }

    async fn spawn_background<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut background = self.background.lock().await;
        while let Some(joined) = background.try_join_next() {
            log_joined(joined);
        }
        background.spawn(task);
    }
}

fn log_joined(joined: std::result::Result<(), JoinError>) {
    if let Err(e) = joined {
        tracing::error!("Background task panicked: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::oneshot;

    use super::*;

    async fn temp_app() -> (tempfile::TempDir, App) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            db_path: dir.path().join("app.db").to_string_lossy().to_string(),
            ..Config::default()
        };
        let app = App::new(config).await.unwrap();
        (dir, app)
    }

    #[tokio::test]
    async fn spawning_is_not_blocked_while_waiting() {
        let (_dir, app) = temp_app().await;
        let (release_tx, release_rx) = oneshot::channel::<()>();
        app.spawn_background(async move {
            let _ = release_rx.await;
        })
        .await;

        let waiting = app.wait_background();
        let spawning = async {
            tokio::task::yield_now().await;
            let spawned =
                tokio::time::timeout(Duration::from_secs(1), app.spawn_background(async {})).await;
            release_tx.send(()).unwrap();
            spawned
        };

        let ((), spawned) = tokio::join!(waiting, spawning);
        assert!(spawned.is_ok());

        // The task spawned mid-wait is joined by the next call.
        app.wait_background().await;
        assert!(app.background.lock().await.is_empty());
    }

    #[tokio::test]
    async fn finished_tasks_are_reaped_on_spawn() {
        let (_dir, app) = temp_app().await;
        app.spawn_background(async {}).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        app.spawn_background(async {
            tokio::time::sleep(Duration::from_millis(200)).await;
        })
        .await;
        assert_eq!(app.background.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn unknown_genre_is_not_found() {
        let (_dir, app) = temp_app().await;
        let err = app.genre_listing("poetry").await.unwrap_err();
        assert!(matches!(err, crate::error::AppError::NotFound(_)));
    }
}
