use std::fmt::Display;

use condorcet_voting::{Nomination, Vote};
use serde::{Deserialize, Serialize};

use crate::election::same_name;

/// Length of the voting phase, unless configured otherwise.
pub const DEFAULT_VOTING_WINDOW_MS: i64 = 10 * 60 * 1000;

/// Who gets to see the individual ballots.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BallotVisibility {
    /// Only the final tallies are shown, once the election is completed.
    Secret,
    /// Ballots and head-to-head tallies are shown while voting.
    Open,
}

/// Explicit state stored on an election. It overrides the clock.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElectionState {
    /// Voting was started by the admin. The window runs from `vote_start_time`.
    Voting,
    Completed,
    Cancelled,
}

/// The phase an election is in, derived from its state and the clock.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElectionStatus {
    Nomination,
    Voting,
    Completed,
    Cancelled,
}

impl Display for ElectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ElectionStatus::Nomination => "nomination",
            ElectionStatus::Voting => "voting",
            ElectionStatus::Completed => "completed",
            ElectionStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Election {
    pub id: String,
    pub name: String,
    /// Shared secret of the group, required for all the admin actions.
    #[serde(rename = "groupCodeword")]
    pub group_codeword: String,
    #[serde(rename = "adminName")]
    pub admin_name: String,
    #[serde(rename = "ballotVisibility")]
    pub ballot_visibility: BallotVisibility,
    /// Milliseconds since the epoch.
    #[serde(rename = "voteStartTime")]
    pub vote_start_time: i64,
    #[serde(default)]
    pub participants: Vec<String>,
    #[serde(default)]
    pub nominations: Vec<Nomination>,
    #[serde(default)]
    pub votes: Vec<Vote>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<ElectionState>,
    /// Cached id of the winning nomination.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: i64,
}

impl Election {
    pub fn voting_ends_at(&self, window_ms: i64) -> i64 {
        self.vote_start_time.saturating_add(window_ms)
    }

    /// The current phase of the election.
    ///
    /// Terminal states win over the clock. An explicit `voting` state keeps the election open
    /// until the end of its window, even if the start time is still in the future.
    pub fn derive_status(&self, now: i64, window_ms: i64) -> ElectionStatus {
        let ends_at = self.voting_ends_at(window_ms);
        match self.state {
            Some(ElectionState::Cancelled) => ElectionStatus::Cancelled,
            Some(ElectionState::Completed) => ElectionStatus::Completed,
            Some(ElectionState::Voting) if now < ends_at => ElectionStatus::Voting,
            Some(ElectionState::Voting) => ElectionStatus::Completed,
            None if now < self.vote_start_time => ElectionStatus::Nomination,
            None if now < ends_at => ElectionStatus::Voting,
            None => ElectionStatus::Completed,
        }
    }

    pub fn nomination(&self, nomination_id: &str) -> Option<&Nomination> {
        self.nominations.iter().find(|n| n.id == nomination_id)
    }

    /// Looks up a nomination by id, then by restaurant name.
    pub fn find_nomination(&self, key: &str) -> Option<&Nomination> {
        self.nomination(key).or_else(|| {
            self.nominations
                .iter()
                .find(|n| same_name(&n.restaurant_name, key))
        })
    }

    pub fn winner_nomination(&self) -> Option<&Nomination> {
        self.winner.as_deref().and_then(|id| self.nomination(id))
    }

    pub fn add_participant(&mut self, name: &str) {
        if !self.participants.iter().any(|p| same_name(p, name)) {
            self.participants.push(name.trim().to_string());
        }
    }

    /// Records a ballot. A previous ballot from the same voter is replaced in place.
    /// Returns true if a ballot was replaced.
    pub fn replace_vote(&mut self, vote: Vote) -> bool {
        match self
            .votes
            .iter_mut()
            .find(|v| same_name(&v.voter_name, &vote.voter_name))
        {
            Some(existing) => {
                *existing = vote;
                true
            }
            None => {
                self.votes.push(vote);
                false
            }
        }
    }
}
