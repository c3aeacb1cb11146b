use std::collections::HashSet;

use condorcet_voting::{
    calculate_pairwise_matrix, run_condorcet_stats, Nomination, PairwiseMatrix, Resolution,
    Standing, Vote,
};
use log::{debug, info, warn};
use serde::Serialize;
use serde_json::Value as JSValue;
use snafu::{ensure, OptionExt};
use uuid::Uuid;

use crate::election::io_xlsx::{resolve_ballot, ParsedBallot};
use crate::election::*;

/// What is needed to open a new election.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct NewElection {
    pub name: String,
    pub admin_name: String,
    pub group_codeword: String,
    pub ballot_visibility: BallotVisibility,
    /// Milliseconds since the epoch.
    pub vote_start_time: i64,
}

/// The state of an election as it can be shown to the participants.
#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct ElectionOutcome {
    pub id: String,
    pub name: String,
    pub status: ElectionStatus,
    #[serde(rename = "voteStartTime")]
    pub vote_start_time: i64,
    #[serde(rename = "votingEndsAt")]
    pub voting_ends_at: i64,
    pub participants: Vec<String>,
    pub nominations: Vec<Nomination>,
    #[serde(rename = "ballotCount")]
    pub ballot_count: usize,
    /// Only set once the election is completed.
    pub winner: Option<Nomination>,
    pub resolution: Option<Resolution>,
    pub standings: Option<Vec<Standing>>,
    pub pairwise: Option<PairwiseMatrix>,
    pub ballots: Option<Vec<Vote>>,
}

/// One line of the list of elections.
#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct ElectionListing {
    pub id: String,
    pub name: String,
    pub status: ElectionStatus,
    #[serde(rename = "nominationCount")]
    pub nomination_count: usize,
    #[serde(rename = "ballotCount")]
    pub ballot_count: usize,
    #[serde(rename = "winnerName")]
    pub winner_name: Option<String>,
}

/// Drives the lifecycle of elections: nomination, voting, completion or cancellation.
///
/// All the checks on the requests happen here, the tabulation only sees validated ballots.
/// Every operation takes the current time in milliseconds since the epoch.
pub struct ElectionController<S: ElectionStore> {
    store: S,
    voting_window_ms: i64,
}

impl<S: ElectionStore> ElectionController<S> {
    pub fn new(store: S, voting_window_ms: i64) -> ElectionController<S> {
        ElectionController {
            store,
            voting_window_ms,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn status(&self, election: &Election, now: i64) -> ElectionStatus {
        election.derive_status(now, self.voting_window_ms)
    }

    fn load(&self, id: &str) -> ElectionResult<Election> {
        self.store.get_election(id)?.context(NotFoundSnafu { id })
    }

    fn check_codeword(election: &Election, codeword: &str) -> ElectionResult<()> {
        ensure!(election.group_codeword == codeword, InvalidCodewordSnafu {});
        Ok(())
    }

    fn check_admin(election: &Election, codeword: Option<&str>, action: &str) -> ElectionResult<()> {
        let cw = codeword.context(AdminOnlySnafu { action })?;
        Self::check_codeword(election, cw)
    }

    /// Applies `f` to the stored election if it is in one of the `allowed` phases.
    ///
    /// The phase and everything `f` checks are read under the store lock, from the same copy
    /// of the election that gets written.
    fn update<F>(
        &self,
        id: &str,
        now: i64,
        action: &str,
        allowed: &[ElectionStatus],
        mut f: F,
    ) -> ElectionResult<Election>
    where
        F: FnMut(&mut Election, ElectionStatus) -> ElectionResult<()>,
    {
        let window_ms = self.voting_window_ms;
        self.store.update_election(id, &mut |e| {
            let status = e.derive_status(now, window_ms);
            ensure!(
                allowed.contains(&status),
                WrongPhaseSnafu { action, status }
            );
            f(e, status)
        })
    }

    pub fn create_election(&self, request: &NewElection, now: i64) -> ElectionResult<Election> {
        for (field, value) in [
            ("name", &request.name),
            ("admin name", &request.admin_name),
            ("group codeword", &request.group_codeword),
        ] {
            ensure!(
                !value.trim().is_empty(),
                InvalidElectionSnafu {
                    reason: format!("the {} is empty", field)
                }
            );
        }
        if request.vote_start_time < now {
            warn!(
                "create_election: voting start time {} is in the past, voting opens immediately",
                request.vote_start_time
            );
        }
        let election = Election {
            id: Uuid::new_v4().to_string(),
            name: request.name.trim().to_string(),
            group_codeword: request.group_codeword.clone(),
            admin_name: request.admin_name.trim().to_string(),
            ballot_visibility: request.ballot_visibility,
            vote_start_time: request.vote_start_time,
            participants: vec![request.admin_name.trim().to_string()],
            nominations: Vec::new(),
            votes: Vec::new(),
            state: None,
            winner: None,
            created_at: now,
        };
        self.store.create_election(&election)?;
        info!("Created election {} ({:?})", election.id, election.name);
        Ok(election)
    }

    /// Adds a restaurant. Nominations made once voting has started are write-ins.
    pub fn nominate(
        &self,
        id: &str,
        nominator: &str,
        restaurant: &str,
        metadata: Option<JSValue>,
        now: i64,
    ) -> ElectionResult<Nomination> {
        ensure!(
            !nominator.trim().is_empty(),
            InvalidNominationSnafu {
                reason: "the nominator name is empty"
            }
        );
        ensure!(
            !restaurant.trim().is_empty(),
            InvalidNominationSnafu {
                reason: "the restaurant name is empty"
            }
        );
        let mut nomination = Nomination {
            id: Uuid::new_v4().to_string(),
            nominator_name: nominator.trim().to_string(),
            restaurant_name: restaurant.trim().to_string(),
            is_write_in: false,
            metadata,
            created_at: now,
        };
        self.update(
            id,
            now,
            "nominate",
            &[ElectionStatus::Nomination, ElectionStatus::Voting],
            |e, status| {
                ensure!(
                    !e.nominations
                        .iter()
                        .any(|n| same_name(&n.restaurant_name, &nomination.restaurant_name)),
                    InvalidNominationSnafu {
                        reason: format!("{} is already nominated", nomination.restaurant_name)
                    }
                );
                ensure!(
                    e.nomination(&nomination.id).is_none(),
                    AlreadyExistsSnafu {
                        what: "Nomination",
                        id: nomination.id.clone()
                    }
                );
                nomination.is_write_in = status == ElectionStatus::Voting;
                e.nominations.push(nomination.clone());
                e.add_participant(&nomination.nominator_name);
                Ok(())
            },
        )?;
        info!(
            "Election {}: {} nominated {:?}{}",
            id,
            nomination.nominator_name,
            nomination.restaurant_name,
            if nomination.is_write_in { " (write-in)" } else { "" }
        );
        Ok(nomination)
    }

    /// Removes a nomination. Allowed for its nominator, or for anyone with the group codeword.
    pub fn withdraw_nomination(
        &self,
        id: &str,
        nomination_id: &str,
        requester: &str,
        codeword: Option<&str>,
        now: i64,
    ) -> ElectionResult<()> {
        let mut restaurant = String::new();
        self.update(
            id,
            now,
            "withdraw a nomination",
            &[ElectionStatus::Nomination, ElectionStatus::Voting],
            |e, _| {
                let nomination = e
                    .nomination(nomination_id)
                    .context(NominationNotFoundSnafu { id, nomination_id })?;
                match codeword {
                    Some(cw) => Self::check_codeword(e, cw)?,
                    None => ensure!(
                        same_name(&nomination.nominator_name, requester),
                        NotCreatorSnafu {
                            nominator: nomination.nominator_name.clone(),
                            requester
                        }
                    ),
                }
                restaurant = nomination.restaurant_name.clone();
                e.nominations.retain(|n| n.id != nomination_id);
                Ok(())
            },
        )?;
        info!(
            "Election {}: {:?} withdrawn by {}",
            id, restaurant, requester
        );
        Ok(())
    }

    /// Records a ballot. A second ballot from the same voter replaces the first one.
    pub fn cast_vote(
        &self,
        id: &str,
        voter: &str,
        rankings: &[String],
        now: i64,
    ) -> ElectionResult<Vote> {
        let vote = Vote {
            voter_name: voter.trim().to_string(),
            rankings: rankings.to_vec(),
        };
        self.update(id, now, "vote", &[ElectionStatus::Voting], |e, _| {
            admit_vote(e, &vote)
        })?;
        info!("Election {}: ballot from {}", id, vote.voter_name);
        debug!("cast_vote: {:?}", vote);
        Ok(vote)
    }

    /// Records ballots read from a spreadsheet. Either all of them are recorded or none.
    pub fn import_ballots(
        &self,
        id: &str,
        ballots: &[ParsedBallot],
        now: i64,
    ) -> ElectionResult<usize> {
        self.update(id, now, "import ballots", &[ElectionStatus::Voting], |e, _| {
            for b in ballots.iter() {
                let vote = Vote {
                    voter_name: b.voter.trim().to_string(),
                    rankings: resolve_ballot(e, b)?,
                };
                admit_vote(e, &vote)?;
            }
            Ok(())
        })?;
        info!("Election {}: imported {} ballots", id, ballots.len());
        Ok(ballots.len())
    }

    /// Opens the voting phase now, whatever the planned start time.
    pub fn start_voting(&self, id: &str, codeword: Option<&str>, now: i64) -> ElectionResult<()> {
        self.update(
            id,
            now,
            "start voting",
            &[ElectionStatus::Nomination],
            |e, _| {
                Self::check_admin(e, codeword, "start voting")?;
                if e.nominations.is_empty() {
                    warn!("Election {}: voting starts without any nomination", id);
                }
                e.vote_start_time = now;
                e.state = Some(ElectionState::Voting);
                Ok(())
            },
        )?;
        info!("Election {}: voting started", id);
        Ok(())
    }

    /// Closes the election and stores the winner.
    pub fn finalize(
        &self,
        id: &str,
        codeword: Option<&str>,
        now: i64,
    ) -> ElectionResult<Option<String>> {
        let updated = self.update(
            id,
            now,
            "finalize",
            &[
                ElectionStatus::Nomination,
                ElectionStatus::Voting,
                ElectionStatus::Completed,
            ],
            |e, _| {
                Self::check_admin(e, codeword, "finalize")?;
                if e.state == Some(ElectionState::Completed) {
                    debug!("finalize: election {} was already finalized", id);
                    return Ok(());
                }
                e.winner = run_condorcet_stats(&e.nominations, &e.votes).winner;
                e.state = Some(ElectionState::Completed);
                Ok(())
            },
        )?;
        info!("Election {}: finalized, winner {:?}", id, updated.winner);
        Ok(updated.winner)
    }

    pub fn cancel(&self, id: &str, codeword: Option<&str>, now: i64) -> ElectionResult<()> {
        self.update(
            id,
            now,
            "cancel",
            &[ElectionStatus::Nomination, ElectionStatus::Voting],
            |e, _| {
                Self::check_admin(e, codeword, "cancel")?;
                e.state = Some(ElectionState::Cancelled);
                e.winner = None;
                Ok(())
            },
        )?;
        info!("Election {}: cancelled", id);
        Ok(())
    }

    // Only written while the election is still completed and has no winner yet.
    fn cache_winner(&self, id: &str, winner: &str, now: i64) -> ElectionResult<()> {
        self.update(id, now, "store the winner", &[ElectionStatus::Completed], |e, _| {
            if e.winner.is_none() {
                e.winner = Some(winner.to_string());
                debug!("results: cached winner {} for {}", winner, id);
            }
            Ok(())
        })
        .map(|_| ())
    }

    /// The election as seen by the participants.
    ///
    /// The winner of a completed election is computed on the first read and cached.
    /// Head-to-head tallies are shown during the election only when ballots are open, and
    /// individual ballots are never shown for secret elections.
    pub fn results(&self, id: &str, now: i64) -> ElectionResult<ElectionOutcome> {
        let election = self.load(id)?;
        let status = self.status(&election, now);
        let open = election.ballot_visibility == BallotVisibility::Open;

        let mut outcome = ElectionOutcome {
            id: election.id.clone(),
            name: election.name.clone(),
            status,
            vote_start_time: election.vote_start_time,
            voting_ends_at: election.voting_ends_at(self.voting_window_ms),
            participants: election.participants.clone(),
            nominations: election.nominations.clone(),
            ballot_count: election.votes.len(),
            winner: None,
            resolution: None,
            standings: None,
            pairwise: None,
            ballots: None,
        };
        if status == ElectionStatus::Cancelled {
            return Ok(outcome);
        }
        if open {
            outcome.ballots = Some(election.votes.clone());
        }

        match status {
            ElectionStatus::Completed => {
                let res = run_condorcet_stats(&election.nominations, &election.votes);
                let winner = match (&election.winner, &res.winner) {
                    (Some(cached), _) => Some(cached.clone()),
                    (None, Some(computed)) => {
                        self.cache_winner(id, computed, now)?;
                        Some(computed.clone())
                    }
                    (None, None) => None,
                };
                outcome.winner = winner
                    .as_deref()
                    .and_then(|w| election.nomination(w))
                    .cloned();
                outcome.resolution = Some(res.resolution);
                outcome.standings = Some(res.standings);
                outcome.pairwise = Some(res.matrix);
            }
            _ if open => {
                outcome.pairwise = Some(calculate_pairwise_matrix(
                    &election.nominations,
                    &election.votes,
                ));
            }
            _ => {}
        }
        Ok(outcome)
    }

    /// All the elections, with the name of the winner for the completed ones.
    ///
    /// Nothing is written to the store.
    pub fn list(&self, now: i64) -> ElectionResult<Vec<ElectionListing>> {
        let elections = self.store.get_all_elections()?;
        Ok(elections
            .iter()
            .map(|e| {
                let status = self.status(e, now);
                let winner_name = if status == ElectionStatus::Completed {
                    let winner = match e.winner_nomination() {
                        Some(n) => Some(n.clone()),
                        None => run_condorcet_stats(&e.nominations, &e.votes)
                            .winner
                            .and_then(|w| e.nomination(&w).cloned()),
                    };
                    winner.map(|n| n.restaurant_name)
                } else {
                    None
                };
                ElectionListing {
                    id: e.id.clone(),
                    name: e.name.clone(),
                    status,
                    nomination_count: e.nominations.len(),
                    ballot_count: e.votes.len(),
                    winner_name,
                }
            })
            .collect())
    }
}

// Checks a ballot against the election and records it.
fn admit_vote(e: &mut Election, vote: &Vote) -> ElectionResult<()> {
    let voter = vote.voter_name.as_str();
    ensure!(
        !voter.is_empty(),
        InvalidBallotSnafu {
            voter,
            reason: "the voter name is empty"
        }
    );
    ensure!(
        !vote.rankings.is_empty(),
        InvalidBallotSnafu {
            voter,
            reason: "no restaurant is ranked"
        }
    );
    let mut seen: HashSet<&str> = HashSet::new();
    for nid in vote.rankings.iter() {
        ensure!(
            e.nomination(nid).is_some(),
            InvalidBallotSnafu {
                voter,
                reason: format!("unknown nomination {}", nid)
            }
        );
        ensure!(
            seen.insert(nid.as_str()),
            InvalidBallotSnafu {
                voter,
                reason: format!("nomination {} is ranked twice", nid)
            }
        );
    }
    e.add_participant(voter);
    if e.replace_vote(vote.clone()) {
        debug!("admit_vote: replaced the ballot of {:?}", voter);
    }
    Ok(())
}
