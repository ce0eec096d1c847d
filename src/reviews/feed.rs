use chrono::{SubsecRound, Utc};

use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::models::{NewReview, ReviewCursor, ReviewPage, ReviewRecord};

const ANONYMOUS: &str = "Anonymous";

/// Reverse-chronological, cursor-paginated reviews of one book.
///
/// Reviews sort by `created_at` descending with the review id as a descending
/// secondary key, so reviews stamped with the same instant still page in a
/// stable order. Cursors are the last record a client saw; nothing is held
/// server-side between pages.
#[derive(Clone)]
pub struct ReviewFeed {
    repository: Repository,
}

impl ReviewFeed {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Up to `page_size` reviews after `cursor`.
    ///
    /// `has_more` is true whenever the page came back full, so a book with an
    /// exact multiple of `page_size` reviews yields one final empty page.
    pub async fn get_page(
        &self,
        book_id: &str,
        page_size: usize,
        cursor: Option<&ReviewRecord>,
    ) -> Result<ReviewPage> {
        if page_size == 0 {
            return Ok(ReviewPage::default());
        }

        let reviews = self
            .repository
            .get_reviews_page(book_id, page_size, cursor.map(ReviewCursor::from))
            .await?;
        let has_more = reviews.len() == page_size;

        tracing::debug!(
            "Loaded {} reviews for book {} (has_more: {})",
            reviews.len(),
            book_id,
            has_more
        );
        Ok(ReviewPage { reviews, has_more })
    }

    /// Store a new review; the id and creation time are assigned here.
    pub async fn append(&self, review: NewReview) -> Result<ReviewRecord> {
        if review.author_id.trim().is_empty() {
            return Err(AppError::Unauthorized);
        }
        let content = review.content.trim();
        if content.is_empty() {
            return Err(AppError::InvalidInput("review content is empty".to_string()));
        }

        let display_name = match review.author_display_name.trim() {
            "" => ANONYMOUS.to_string(),
            name => name.to_string(),
        };
        let review = NewReview {
            content: content.to_string(),
            author_display_name: display_name,
            ..review
        };

        // Reviews are stored with microsecond precision.
        let created_at = Utc::now().trunc_subsecs(6);
        let record = self.repository.insert_review(review, created_at).await?;
        tracing::info!("Added review {} on book {}", record.id, record.book_id);
        Ok(record)
    }

    /// Delete a review and its votes. Clients already past it are unaffected.
    pub async fn remove(&self, review_id: i64) -> Result<()> {
        if !self.repository.delete_review(review_id).await? {
            return Err(AppError::NotFound(format!("review {}", review_id)));
        }
        tracing::info!("Removed review {}", review_id);
        Ok(())
    }
}
