use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::models::{TargetKind, VoteCounts, VoteType};

/// Sole writer of upvoter/downvoter sets.
#[derive(Clone)]
pub struct VoteLedger {
    repository: Repository,
}

impl VoteLedger {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Toggle `user_id`'s `vote_type` vote on a target and return the counts
    /// as stored after the write.
    pub async fn toggle_vote(
        &self,
        kind: TargetKind,
        target_id: &str,
        user_id: &str,
        vote_type: VoteType,
    ) -> Result<VoteCounts> {
        if user_id.trim().is_empty() {
            return Err(AppError::Unauthorized);
        }

        self.repository
            .toggle_vote(kind, target_id, user_id, vote_type)
            .await?;
        tracing::info!("Toggled {:?} by {} on {} {}", vote_type, user_id, kind, target_id);

        self.counts(kind, target_id).await
    }

    /// Current counts; a target nobody has voted on has zero of each.
    pub async fn counts(&self, kind: TargetKind, target_id: &str) -> Result<VoteCounts> {
        let sets = self.repository.get_vote_sets(kind, target_id).await?;
        Ok(sets.map(|s| s.counts()).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::db::test_support::temp_repository;
    use crate::models::VoteState;

    #[tokio::test]
    async fn empty_user_is_unauthorized() {
        let (_dir, repo) = temp_repository().await;
        let ledger = VoteLedger::new(repo.clone());

        let err = assert_err!(ledger.toggle_vote(TargetKind::Book, "b", "  ", VoteType::Upvote).await);
        assert!(matches!(err, AppError::Unauthorized));
        // Nothing was written.
        assert!(repo.get_vote_sets(TargetKind::Book, "b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn first_vote_creates_ledger() {
        let (_dir, repo) = temp_repository().await;
        let ledger = VoteLedger::new(repo);

        let counts = assert_ok!(ledger.toggle_vote(TargetKind::Book, "b", "u", VoteType::Upvote).await);
        assert_eq!(counts, VoteCounts { upvotes: 1, downvotes: 0 });
    }

    #[tokio::test]
    async fn repeat_toggle_unvotes_and_third_revotes() {
        let (_dir, repo) = temp_repository().await;
        let ledger = VoteLedger::new(repo.clone());

        ledger.toggle_vote(TargetKind::Review, "r", "u", VoteType::Upvote).await.unwrap();
        let counts = ledger.toggle_vote(TargetKind::Review, "r", "u", VoteType::Upvote).await.unwrap();
        assert_eq!(counts, VoteCounts::default());

        let counts = ledger.toggle_vote(TargetKind::Review, "r", "u", VoteType::Upvote).await.unwrap();
        assert_eq!(counts.upvotes, 1);
        let sets = repo.get_vote_sets(TargetKind::Review, "r").await.unwrap().unwrap();
        assert_eq!(sets.state_of("u"), VoteState::Upvote);
    }

    #[tokio::test]
    async fn switch_happens_in_one_call() {
        let (_dir, repo) = temp_repository().await;
        let ledger = VoteLedger::new(repo.clone());

        ledger.toggle_vote(TargetKind::Fanfiction, "f", "u", VoteType::Downvote).await.unwrap();
        let counts = ledger.toggle_vote(TargetKind::Fanfiction, "f", "u", VoteType::Upvote).await.unwrap();

        assert_eq!(counts, VoteCounts { upvotes: 1, downvotes: 0 });
        let sets = repo.get_vote_sets(TargetKind::Fanfiction, "f").await.unwrap().unwrap();
        assert!(sets.upvoters.contains("u"));
        assert!(!sets.downvoters.contains("u"));
    }

    #[tokio::test]
    async fn sets_stay_disjoint_across_mixed_toggles() {
        let (_dir, repo) = temp_repository().await;
        let ledger = VoteLedger::new(repo.clone());
        let script = [
            ("a", VoteType::Upvote),
            ("b", VoteType::Downvote),
            ("a", VoteType::Downvote),
            ("c", VoteType::Upvote),
            ("b", VoteType::Upvote),
            ("a", VoteType::Downvote),
            ("c", VoteType::Downvote),
            ("b", VoteType::Upvote),
        ];

        for (user, vote) in script {
            ledger.toggle_vote(TargetKind::Comment, "c1", user, vote).await.unwrap();
            let sets = repo.get_vote_sets(TargetKind::Comment, "c1").await.unwrap().unwrap();
            assert!(sets.is_disjoint(), "overlap after {} {:?}", user, vote);
        }

        let counts = ledger.counts(TargetKind::Comment, "c1").await.unwrap();
        assert_eq!(counts, VoteCounts { upvotes: 0, downvotes: 1 });
    }

    #[tokio::test]
    async fn corrupt_ledger_fails_toggle_with_storage_error() {
        let (_dir, repo) = temp_repository().await;
        repo.execute_raw(
            "INSERT INTO vote_ledgers (target_kind, target_id, upvoters) VALUES ('review', '9', '{broken')",
        )
        .await
        .unwrap();
        let ledger = VoteLedger::new(repo);

        let err = assert_err!(ledger.toggle_vote(TargetKind::Review, "9", "u", VoteType::Upvote).await);
        assert!(matches!(err, AppError::Storage(_)));
    }

    #[tokio::test]
    async fn counts_of_unknown_target_are_zero() {
        let (_dir, repo) = temp_repository().await;
        let ledger = VoteLedger::new(repo);
        assert_eq!(ledger.counts(TargetKind::Book, "nope").await.unwrap(), VoteCounts::default());
    }
}
