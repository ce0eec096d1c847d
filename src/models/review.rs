use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub id: i64,
    pub book_id: String,
    pub author_id: String,
    pub author_display_name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A review as submitted by its author; the store assigns id and timestamp.
#[derive(Debug, Clone)]
pub struct NewReview {
    pub book_id: String,
    pub author_id: String,
    pub author_display_name: String,
    pub content: String,
}

#[derive(Debug, Clone, Default)]
pub struct ReviewPage {
    pub reviews: Vec<ReviewRecord>,
    pub has_more: bool,
}

/// Position after the last review a client has seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewCursor {
    pub created_at: DateTime<Utc>,
    pub id: i64,
}

impl From<&ReviewRecord> for ReviewCursor {
    fn from(review: &ReviewRecord) -> Self {
        Self {
            created_at: review.created_at,
            id: review.id,
        }
    }
}
