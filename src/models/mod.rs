mod catalog;
mod review;
mod vote;

pub use catalog::{CatalogCacheRecord, CatalogEntry, CatalogListing, Freshness};
pub use review::{NewReview, ReviewCursor, ReviewPage, ReviewRecord};
pub use vote::{TargetKind, VoteCounts, VoteSets, VoteState, VoteType};
