use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// The kinds of entity a vote can be cast on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Book,
    Review,
    Fanfiction,
    Comment,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Book => "book",
            TargetKind::Review => "review",
            TargetKind::Fanfiction => "fanfiction",
            TargetKind::Comment => "comment",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "book" => Ok(TargetKind::Book),
            "review" => Ok(TargetKind::Review),
            "fanfiction" => Ok(TargetKind::Fanfiction),
            "comment" => Ok(TargetKind::Comment),
            other => Err(AppError::InvalidInput(format!("unknown target kind '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteType {
    Upvote,
    Downvote,
}

impl FromStr for VoteType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" | "upvote" => Ok(VoteType::Upvote),
            "down" | "downvote" => Ok(VoteType::Downvote),
            other => Err(AppError::InvalidInput(format!("unknown vote type '{}'", other))),
        }
    }
}

/// A viewer's relationship to one target's ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteState {
    Upvote,
    Downvote,
    #[default]
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VoteCounts {
    pub upvotes: usize,
    pub downvotes: usize,
}

impl VoteCounts {
    pub fn net(&self) -> i64 {
        self.upvotes as i64 - self.downvotes as i64
    }
}

/// The upvoter and downvoter sets of one ledger.
///
/// A user appears in at most one of the two sets. [`VoteSets::toggle`] is the
/// only mutation and keeps that true.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VoteSets {
    #[serde(default)]
    pub upvoters: BTreeSet<String>,
    #[serde(default)]
    pub downvoters: BTreeSet<String>,
}

impl VoteSets {
    /// Un-vote if `user` already cast `vote_type`, otherwise cast it and drop
    /// any opposite vote.
    pub fn toggle(&mut self, user: &str, vote_type: VoteType) {
        let (same, opposite) = match vote_type {
            VoteType::Upvote => (&mut self.upvoters, &mut self.downvoters),
            VoteType::Downvote => (&mut self.downvoters, &mut self.upvoters),
        };

        if !same.remove(user) {
            opposite.remove(user);
            same.insert(user.to_string());
        }
    }

    /// Upvote wins if the sets were ever made to overlap outside `toggle`.
    pub fn state_of(&self, user: &str) -> VoteState {
        if self.upvoters.contains(user) {
            VoteState::Upvote
        } else if self.downvoters.contains(user) {
            VoteState::Downvote
        } else {
            VoteState::None
        }
    }

    pub fn counts(&self) -> VoteCounts {
        VoteCounts {
            upvotes: self.upvoters.len(),
            downvotes: self.downvoters.len(),
        }
    }

    pub fn is_disjoint(&self) -> bool {
        self.upvoters.is_disjoint(&self.downvoters)
    }
}
