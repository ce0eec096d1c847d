use std::collections::HashMap;

use futures::stream::{self, StreamExt, TryStreamExt};

use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::models::{TargetKind, VoteCounts, VoteSets, VoteState};

/// Max ledger reads in flight per batch.
const MAX_CONCURRENT_READS: usize = 8;

/// Read-only batch views over many ledgers.
#[derive(Clone)]
pub struct VoteAggregator {
    repository: Repository,
}

impl VoteAggregator {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Classify `user_id`'s vote on each target. Targets without a ledger are
    /// reported as [`VoteState::None`].
    pub async fn user_vote_states(
        &self,
        kind: TargetKind,
        target_ids: &[String],
        user_id: &str,
    ) -> Result<HashMap<String, VoteState>> {
        let states = stream::iter(target_ids.iter().cloned())
            .map(|id| async move {
                let sets = self.load(kind, &id).await?;
                Ok::<_, AppError>((id, sets.state_of(user_id)))
            })
            .buffer_unordered(MAX_CONCURRENT_READS)
            .try_collect::<HashMap<_, _>>()
            .await?;

        tracing::debug!("Loaded {} vote states for {} on {} targets", states.len(), user_id, kind);
        Ok(states)
    }

    pub async fn counts(&self, kind: TargetKind, target_ids: &[String]) -> Result<HashMap<String, VoteCounts>> {
        Ok(self.counts_in_order(kind, target_ids).await?.into_iter().collect())
    }

    /// Targets ordered by net votes, highest first. Equal scores keep their
    /// input order.
    pub async fn rank_by_net_votes(
        &self,
        kind: TargetKind,
        target_ids: &[String],
    ) -> Result<Vec<(String, VoteCounts)>> {
        let mut ranked = self.counts_in_order(kind, target_ids).await?;
        ranked.sort_by_key(|(_, counts)| std::cmp::Reverse(counts.net()));
        Ok(ranked)
    }

    async fn counts_in_order(&self, kind: TargetKind, target_ids: &[String]) -> Result<Vec<(String, VoteCounts)>> {
        stream::iter(target_ids.iter().cloned())
            .map(|id| async move {
                let sets = self.load(kind, &id).await?;
                Ok::<_, AppError>((id, sets.counts()))
            })
            .buffered(MAX_CONCURRENT_READS)
            .try_collect()
            .await
    }

    async fn load(&self, kind: TargetKind, target_id: &str) -> Result<VoteSets> {
        Ok(self
            .repository
            .get_vote_sets(kind, target_id)
            .await?
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::temp_repository;
    use crate::models::VoteType;
    use crate::votes::VoteLedger;

    fn ids(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn classifies_each_target_for_the_viewer() {
        let (_dir, repo) = temp_repository().await;
        let ledger = VoteLedger::new(repo.clone());
        let aggregator = VoteAggregator::new(repo.clone());

        ledger.toggle_vote(TargetKind::Review, "1", "viewer", VoteType::Upvote).await.unwrap();
        ledger.toggle_vote(TargetKind::Review, "2", "viewer", VoteType::Downvote).await.unwrap();
        ledger.toggle_vote(TargetKind::Review, "3", "someone-else", VoteType::Upvote).await.unwrap();

        let states = aggregator
            .user_vote_states(TargetKind::Review, &ids(&["1", "2", "3", "4"]), "viewer")
            .await
            .unwrap();

        assert_eq!(states.len(), 4);
        assert_eq!(states["1"], VoteState::Upvote);
        assert_eq!(states["2"], VoteState::Downvote);
        assert_eq!(states["3"], VoteState::None);
        assert_eq!(states["4"], VoteState::None);

        // Reading never creates ledgers.
        assert!(repo.get_vote_sets(TargetKind::Review, "4").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn overlapping_ledger_reports_upvote() {
        let (_dir, repo) = temp_repository().await;
        let mut sets = VoteSets::default();
        sets.upvoters.insert("viewer".to_string());
        sets.downvoters.insert("viewer".to_string());
        repo.put_vote_sets(TargetKind::Book, "b", sets).await.unwrap();

        let states = VoteAggregator::new(repo)
            .user_vote_states(TargetKind::Book, &ids(&["b"]), "viewer")
            .await
            .unwrap();
        assert_eq!(states["b"], VoteState::Upvote);
    }

    #[tokio::test]
    async fn corrupt_ledger_fails_the_whole_batch() {
        let (_dir, repo) = temp_repository().await;
        repo.execute_raw(
            "INSERT INTO vote_ledgers (target_kind, target_id, upvoters) VALUES ('review', 'bad', '{broken')",
        )
        .await
        .unwrap();

        let err = VoteAggregator::new(repo)
            .user_vote_states(TargetKind::Review, &ids(&["ok", "bad"]), "viewer")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
    }

    #[tokio::test]
    async fn ranks_by_net_votes_keeping_ties_stable() {
        let (_dir, repo) = temp_repository().await;
        let ledger = VoteLedger::new(repo.clone());
        let aggregator = VoteAggregator::new(repo);

        for user in ["a", "b"] {
            ledger.toggle_vote(TargetKind::Fanfiction, "popular", user, VoteType::Upvote).await.unwrap();
        }
        ledger.toggle_vote(TargetKind::Fanfiction, "disliked", "a", VoteType::Downvote).await.unwrap();

        let ranked = aggregator
            .rank_by_net_votes(TargetKind::Fanfiction, &ids(&["disliked", "quiet-1", "popular", "quiet-2"]))
            .await
            .unwrap();
        let order: Vec<&str> = ranked.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(order, vec!["popular", "quiet-1", "quiet-2", "disliked"]);
        assert_eq!(ranked[0].1.net(), 2);

        let counts = aggregator
            .counts(TargetKind::Fanfiction, &ids(&["popular", "disliked"]))
            .await
            .unwrap();
        assert_eq!(counts["disliked"], VoteCounts { upvotes: 0, downvotes: 1 });
    }
}
