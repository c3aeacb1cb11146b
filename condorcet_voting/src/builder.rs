pub use crate::config::*;

use std::collections::HashSet;

/// A builder for assembling nominations and ballots.
///
/// Unlike the tabulation functions, the builder checks its input: nomination ids must be unique
/// and ballots may only reference registered nominations.
///
/// ```
/// pub use condorcet_voting::builder::Builder;
/// # use condorcet_voting::VotingErrors;
///
/// let mut builder = Builder::new();
/// builder.add_nomination_simple("tacos", "Taco Shack")?;
/// builder.add_nomination_simple("pho", "Pho Real")?;
///
/// builder.add_vote_simple("Anna", &["pho", "tacos"])?;
/// builder.add_vote_simple("Bob", &["pho"])?;
///
/// assert_eq!(builder.condorcet_winner(), Some("pho".to_string()));
///
/// # Ok::<(), VotingErrors>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Builder {
    pub(crate) _nominations: Vec<Nomination>,
    pub(crate) _votes: Vec<Vote>,
}

impl Builder {
    pub fn new() -> Builder {
        Builder::default()
    }

    /// Replaces the nominations. Previously added votes are discarded.
    pub fn nominations(self, noms: &[Nomination]) -> Result<Builder, VotingErrors> {
        let mut seen: HashSet<&str> = HashSet::new();
        for n in noms.iter() {
            if !seen.insert(n.id.as_str()) {
                return Err(VotingErrors::DuplicateNomination(n.id.clone()));
            }
        }
        Ok(Builder {
            _nominations: noms.to_vec(),
            _votes: Vec::new(),
        })
    }

    /// Adds a nomination with only an id and a name.
    ///
    /// The creation time is the insertion order, so that earlier nominations win the last
    /// tie-breaks.
    pub fn add_nomination_simple(&mut self, id: &str, restaurant: &str) -> Result<(), VotingErrors> {
        let created_at = self._nominations.len() as i64;
        self.add_nomination(&Nomination {
            id: id.to_string(),
            nominator_name: String::new(),
            restaurant_name: restaurant.to_string(),
            is_write_in: false,
            metadata: None,
            created_at,
        })
    }

    pub fn add_nomination(&mut self, nomination: &Nomination) -> Result<(), VotingErrors> {
        if self._nominations.iter().any(|n| n.id == nomination.id) {
            return Err(VotingErrors::DuplicateNomination(nomination.id.clone()));
        }
        self._nominations.push(nomination.clone());
        Ok(())
    }

    /// Adds a ballot.
    ///
    /// rankings: the nomination ids, most preferred first. Nominations not listed are ranked
    /// last.
    pub fn add_vote_simple(&mut self, voter: &str, rankings: &[&str]) -> Result<(), VotingErrors> {
        self.add_vote(&Vote {
            voter_name: voter.to_string(),
            rankings: rankings.iter().map(|s| s.to_string()).collect(),
        })
    }

    pub fn add_vote(&mut self, vote: &Vote) -> Result<(), VotingErrors> {
        if let Some(unknown) = vote
            .rankings
            .iter()
            .find(|id| !self._nominations.iter().any(|n| n.id == **id))
        {
            return Err(VotingErrors::UnknownNomination(unknown.clone()));
        }
        self._votes.push(vote.clone());
        Ok(())
    }

    pub fn pairwise_matrix(&self) -> PairwiseMatrix {
        crate::calculate_pairwise_matrix(&self._nominations, &self._votes)
    }

    pub fn condorcet_winner(&self) -> Option<String> {
        crate::determine_condorcet_winner(&self._nominations, &self._votes)
    }

    pub fn run(&self) -> CondorcetResult {
        crate::run_condorcet_stats(&self._nominations, &self._votes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_duplicates_and_unknown_ids() {
        let mut b = Builder::new();
        b.add_nomination_simple("a", "A").unwrap();
        assert_eq!(
            b.add_nomination_simple("a", "Again"),
            Err(VotingErrors::DuplicateNomination("a".to_string()))
        );
        assert_eq!(
            b.add_vote_simple("x", &["a", "z"]),
            Err(VotingErrors::UnknownNomination("z".to_string()))
        );
        assert!(b._votes.is_empty());
    }

    #[test]
    fn insertion_order_breaks_ties() {
        let mut b = Builder::new();
        b.add_nomination_simple("zz", "First").unwrap();
        b.add_nomination_simple("aa", "Second").unwrap();
        let res = b.run();
        assert_eq!(res.winner, Some("zz".to_string()));
        assert_eq!(res.resolution, Resolution::Fallback);
    }

    #[test]
    fn replacing_nominations_drops_votes() {
        let mut b = Builder::new();
        b.add_nomination_simple("a", "A").unwrap();
        b.add_vote_simple("x", &["a"]).unwrap();
        let n = b._nominations[0].clone();
        let b = b.nominations(&[n.clone()]).unwrap();
        assert!(b._votes.is_empty());
        assert!(b.nominations(&[n.clone(), n]).is_err());
    }
}
