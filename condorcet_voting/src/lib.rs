mod config;

pub mod builder;
pub mod manual;

use log::{debug, info, warn};

use std::{
    cmp::Ordering,
    collections::HashMap,
    ops::AddAssign,
};

pub use crate::config::*;

// **** Private structures ****

// Position of a nomination in the registered list.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
struct NominationId(u32);

impl NominationId {
    fn idx(self) -> usize {
        self.0 as usize
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, PartialOrd, Ord, Hash)]
struct VoteCount(u64);

impl VoteCount {
    const EMPTY: VoteCount = VoteCount(0);
}

impl AddAssign for VoteCount {
    fn add_assign(&mut self, rhs: VoteCount) {
        self.0 += rhs.0;
    }
}

// The registered nominations, in input order.
// Invariant: ids are unique. Later duplicates are dropped.
struct NominationIndex<'a> {
    nominations: Vec<&'a Nomination>,
    by_id: HashMap<&'a str, NominationId>,
}

impl<'a> NominationIndex<'a> {
    fn new(nominations: &'a [Nomination]) -> NominationIndex<'a> {
        let mut res = NominationIndex {
            nominations: Vec::new(),
            by_id: HashMap::new(),
        };
        for n in nominations.iter() {
            if res.by_id.contains_key(n.id.as_str()) {
                warn!("NominationIndex: duplicate nomination id {:?}, keeping the first one", n.id);
                continue;
            }
            let nid = NominationId(res.nominations.len() as u32);
            res.by_id.insert(n.id.as_str(), nid);
            res.nominations.push(n);
        }
        res
    }

    fn len(&self) -> usize {
        self.nominations.len()
    }

    fn ids(&self) -> impl Iterator<Item = NominationId> {
        (0..self.nominations.len() as u32).map(NominationId)
    }

    fn nomination(&self, nid: NominationId) -> &'a Nomination {
        self.nominations[nid.idx()]
    }
}

// The effective rank of every registered nomination on one ballot.
// Omitted nominations all share the virtual rank `rankings.len()`.
fn effective_ranks(vote: &Vote, index: &NominationIndex) -> Vec<usize> {
    let virtual_rank = vote.rankings.len();
    let mut ranks = vec![virtual_rank; index.len()];
    for (pos, id) in vote.rankings.iter().enumerate() {
        match index.by_id.get(id.as_str()) {
            Some(nid) if ranks[nid.idx()] == virtual_rank => {
                ranks[nid.idx()] = pos;
            }
            Some(_) => {
                debug!(
                    "effective_ranks: voter {:?} listed {:?} twice, keeping the first position",
                    vote.voter_name, id
                );
            }
            None => {
                debug!(
                    "effective_ranks: voter {:?}: ignoring unknown nomination {:?}",
                    vote.voter_name, id
                );
            }
        }
    }
    ranks
}

// Square matrix of preference counts, row-major: counts[a * size + b] is the number of
// ballots preferring a over b.
struct PairwiseTally {
    size: usize,
    counts: Vec<VoteCount>,
}

impl PairwiseTally {
    fn compute(index: &NominationIndex, votes: &[Vote]) -> PairwiseTally {
        let size = index.len();
        let mut tally = PairwiseTally {
            size,
            counts: vec![VoteCount::EMPTY; size * size],
        };
        for v in votes.iter() {
            let ranks = effective_ranks(v, index);
            for a in 0..size {
                for b in 0..size {
                    // Equal ranks only happen when both are omitted: no preference expressed.
                    if a != b && ranks[a] < ranks[b] {
                        tally.counts[a * size + b] += VoteCount(1);
                    }
                }
            }
        }
        tally
    }

    fn get(&self, a: NominationId, b: NominationId) -> VoteCount {
        self.counts[a.idx() * self.size + b.idx()]
    }

    fn to_matrix(&self, index: &NominationIndex) -> PairwiseMatrix {
        let mut counts: HashMap<(String, String), u64> = HashMap::new();
        for a in index.ids() {
            for b in index.ids().filter(|b| *b != a) {
                counts.insert(
                    (
                        index.nomination(a).id.clone(),
                        index.nomination(b).id.clone(),
                    ),
                    self.get(a, b).0,
                );
            }
        }
        PairwiseMatrix { counts }
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
struct StandingInternal {
    nid: NominationId,
    wins: u32,
    losses: u32,
    ties: u32,
    support: VoteCount,
}

fn compute_standings(tally: &PairwiseTally, index: &NominationIndex) -> Vec<StandingInternal> {
    index
        .ids()
        .map(|a| {
            let mut st = StandingInternal {
                nid: a,
                wins: 0,
                losses: 0,
                ties: 0,
                support: VoteCount::EMPTY,
            };
            for b in index.ids().filter(|b| *b != a) {
                let (for_a, for_b) = (tally.get(a, b), tally.get(b, a));
                match for_a.cmp(&for_b) {
                    Ordering::Greater => st.wins += 1,
                    Ordering::Less => st.losses += 1,
                    Ordering::Equal => st.ties += 1,
                }
                st.support += for_a;
            }
            st
        })
        .collect()
}

// Total order used when there is no Condorcet winner: most wins, most support,
// earliest creation, smallest id.
fn fallback_order(x: &StandingInternal, y: &StandingInternal, index: &NominationIndex) -> Ordering {
    let (nx, ny) = (index.nomination(x.nid), index.nomination(y.nid));
    y.wins
        .cmp(&x.wins)
        .then(y.support.cmp(&x.support))
        .then(nx.created_at.cmp(&ny.created_at))
        .then(nx.id.cmp(&ny.id))
}

fn to_public_standing(st: &StandingInternal, index: &NominationIndex) -> Standing {
    let n = index.nomination(st.nid);
    Standing {
        id: n.id.clone(),
        restaurant_name: n.restaurant_name.clone(),
        wins: st.wins,
        losses: st.losses,
        ties: st.ties,
        support: st.support.0,
    }
}

/// Computes the head-to-head preference counts between all the nominations.
///
/// This is the matrix used by `determine_condorcet_winner`, it can be displayed as is.
pub fn calculate_pairwise_matrix(nominations: &[Nomination], votes: &[Vote]) -> PairwiseMatrix {
    let index = NominationIndex::new(nominations);
    if index.len() < 2 {
        return PairwiseMatrix::default();
    }
    PairwiseTally::compute(&index, votes).to_matrix(&index)
}

/// Returns the id of the winning nomination, or `None` if there are no nominations.
///
/// See `run_condorcet_stats` for the details of the resolution.
pub fn determine_condorcet_winner(nominations: &[Nomination], votes: &[Vote]) -> Option<String> {
    run_condorcet_stats(nominations, votes).winner
}

/// Runs the pairwise election and returns the winner with the full statistics.
///
/// Arguments:
/// * `nominations` the registered nominations. Duplicated ids are ignored after the first one.
/// * `votes` the ballots. Unknown nomination ids in the rankings are ignored.
///
/// The result is fully determined by the content of the inputs: the order of the nominations
/// does not matter.
pub fn run_condorcet_stats(nominations: &[Nomination], votes: &[Vote]) -> CondorcetResult {
    info!(
        "Processing {:?} ballots over {:?} nominations",
        votes.len(),
        nominations.len()
    );
    let index = NominationIndex::new(nominations);

    if index.nominations.is_empty() {
        info!("No nomination, no winner");
        return CondorcetResult {
            winner: None,
            resolution: Resolution::NoNominations,
            standings: Vec::new(),
            matrix: PairwiseMatrix::default(),
        };
    }

    if index.len() == 1 {
        let n = index.nomination(NominationId(0));
        info!("Only one nomination, directly winning: {}", n.id);
        let st = StandingInternal {
            nid: NominationId(0),
            wins: 0,
            losses: 0,
            ties: 0,
            support: VoteCount::EMPTY,
        };
        return CondorcetResult {
            winner: Some(n.id.clone()),
            resolution: Resolution::Unopposed,
            standings: vec![to_public_standing(&st, &index)],
            matrix: PairwiseMatrix::default(),
        };
    }

    let tally = PairwiseTally::compute(&index, votes);
    let mut standings = compute_standings(&tally, &index);
    debug!("run_condorcet_stats: standings: {:?}", standings);

    let opponents = (index.len() - 1) as u32;
    let condorcet: Vec<NominationId> = standings
        .iter()
        .filter(|st| st.wins == opponents)
        .map(|st| st.nid)
        .collect();
    assert!(
        condorcet.len() <= 1,
        "More than one nomination beats all the others: {:?}",
        condorcet
    );

    standings.sort_by(|x, y| fallback_order(x, y, &index));

    let (winner, resolution) = match condorcet.first() {
        Some(nid) => (*nid, Resolution::Condorcet),
        None => {
            debug!("run_condorcet_stats: no Condorcet winner, applying the fallback order");
            (standings[0].nid, Resolution::Fallback)
        }
    };
    let winner_id = index.nomination(winner).id.clone();
    info!("Winner: {} ({:?})", winner_id, resolution);

    CondorcetResult {
        winner: Some(winner_id),
        resolution,
        standings: standings
            .iter()
            .map(|st| to_public_standing(st, &index))
            .collect(),
        matrix: tally.to_matrix(&index),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn nom(id: &str, created_at: i64) -> Nomination {
        Nomination {
            id: id.to_string(),
            nominator_name: "tester".to_string(),
            restaurant_name: format!("Restaurant {}", id),
            is_write_in: false,
            metadata: None,
            created_at,
        }
    }

    fn vote(voter: &str, rankings: &[&str]) -> Vote {
        Vote {
            voter_name: voter.to_string(),
            rankings: rankings.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn repeat(n: usize, rankings: &[&str]) -> Vec<Vote> {
        (0..n)
            .map(|i| vote(&format!("voter{}-{}", rankings.join(""), i), rankings))
            .collect()
    }

    fn abc() -> Vec<Nomination> {
        vec![nom("A", 1), nom("B", 2), nom("C", 3)]
    }

    #[test]
    fn no_nominations() {
        init();
        assert_eq!(determine_condorcet_winner(&[], &[]), None);
        assert!(calculate_pairwise_matrix(&[], &[]).is_empty());
        let res = run_condorcet_stats(&[], &[vote("x", &["A"])]);
        assert_eq!(res.resolution, Resolution::NoNominations);
        assert!(res.standings.is_empty());
    }

    #[test]
    fn single_nomination_wins_without_votes() {
        init();
        let noms = vec![nom("A", 1)];
        assert_eq!(determine_condorcet_winner(&noms, &[]), Some("A".to_string()));
        let votes = vec![vote("x", &["Z"]), vote("y", &[])];
        let res = run_condorcet_stats(&noms, &votes);
        assert_eq!(res.winner, Some("A".to_string()));
        assert_eq!(res.resolution, Resolution::Unopposed);
        assert!(calculate_pairwise_matrix(&noms, &votes).is_empty());
    }

    #[test]
    fn no_votes_gives_zero_counts() {
        init();
        let m = calculate_pairwise_matrix(&abc(), &[]);
        assert_eq!(m.len(), 6);
        assert!(m.entries().iter().all(|(_, _, c)| *c == 0));
        assert_eq!(m.get("A", "A"), None);
    }

    #[test]
    fn unanimous_majority() {
        init();
        let votes = repeat(3, &["A", "B", "C"]);
        let m = calculate_pairwise_matrix(&abc(), &votes);
        assert_eq!(m.get("A", "B"), Some(3));
        assert_eq!(m.get("B", "A"), Some(0));
        assert_eq!(m.get("A", "C"), Some(3));
        assert_eq!(m.get("B", "C"), Some(3));
        assert_eq!(m.get("C", "A"), Some(0));
        let res = run_condorcet_stats(&abc(), &votes);
        assert_eq!(res.winner, Some("A".to_string()));
        assert_eq!(res.resolution, Resolution::Condorcet);
        let order: Vec<&str> = res.standings.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(order, vec!["A", "B", "C"]);
        assert_eq!(res.standings[0].wins, 2);
        assert_eq!(res.standings[2].losses, 2);
    }

    fn rotation() -> Vec<Vote> {
        vec![
            vote("v1", &["A", "B", "C"]),
            vote("v2", &["B", "C", "A"]),
            vote("v3", &["C", "A", "B"]),
        ]
    }

    #[test]
    fn cycle_counts() {
        init();
        let m = calculate_pairwise_matrix(&abc(), &rotation());
        assert_eq!((m.count("A", "B"), m.count("B", "A")), (2, 1));
        assert_eq!((m.count("B", "C"), m.count("C", "B")), (2, 1));
        assert_eq!((m.count("C", "A"), m.count("A", "C")), (2, 1));
        let res = run_condorcet_stats(&abc(), &rotation());
        assert_eq!(res.resolution, Resolution::Fallback);
        assert!(res.standings.iter().all(|s| s.wins == 1 && s.support == 3));
    }

    #[test]
    fn cycle_falls_back_to_earliest_creation() {
        init();
        let noms = vec![nom("A", 30), nom("B", 10), nom("C", 20)];
        assert_eq!(
            determine_condorcet_winner(&noms, &rotation()),
            Some("B".to_string())
        );
        let noms = vec![nom("A", 30), nom("B", 20), nom("C", 10)];
        assert_eq!(
            determine_condorcet_winner(&noms, &rotation()),
            Some("C".to_string())
        );
    }

    #[test]
    fn cycle_falls_back_to_smallest_id() {
        init();
        let noms = vec![nom("C", 5), nom("B", 5), nom("A", 5)];
        let res = run_condorcet_stats(&noms, &rotation());
        assert_eq!(res.winner, Some("A".to_string()));
        let order: Vec<&str> = res.standings.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(order, vec!["A", "B", "C"]);
    }

    #[test]
    fn cycle_falls_back_to_support_before_creation() {
        init();
        // A > B 7-2, B > C 6-3, C > A 5-4
        let mut votes = repeat(4, &["A", "B", "C"]);
        votes.extend(repeat(2, &["B", "C", "A"]));
        votes.extend(repeat(3, &["C", "A", "B"]));
        let noms = vec![nom("A", 30), nom("B", 10), nom("C", 20)];
        let res = run_condorcet_stats(&noms, &votes);
        assert_eq!(res.resolution, Resolution::Fallback);
        assert!(res.standings.iter().all(|s| s.wins == 1));
        assert_eq!(res.standings[0].id, "A");
        assert_eq!(res.standings[0].support, 11);
        // B and C have the same support, B was nominated first.
        assert_eq!(res.standings[1].id, "B");
        assert_eq!(res.standings[1].support, 8);
        assert_eq!(res.standings[2].support, 8);
    }

    #[test]
    fn head_to_head_tie_has_no_condorcet_winner() {
        init();
        let votes = vec![vote("v1", &["A", "C", "B"]), vote("v2", &["B", "A", "C"])];
        let res = run_condorcet_stats(&abc(), &votes);
        assert_eq!(res.resolution, Resolution::Fallback);
        assert_eq!(res.winner, Some("A".to_string()));
        assert_eq!(res.standings[0].wins, 1);
        assert_eq!(res.standings[0].ties, 1);
    }

    #[test]
    fn partial_ballot_ranks_omitted_last() {
        init();
        let noms = vec![nom("A", 1), nom("B", 2)];
        let votes = vec![vote("v1", &["B"])];
        let m = calculate_pairwise_matrix(&noms, &votes);
        assert_eq!(m.count("B", "A"), 1);
        assert_eq!(m.count("A", "B"), 0);
        assert_eq!(
            determine_condorcet_winner(&noms, &votes),
            Some("B".to_string())
        );
    }

    #[test]
    fn both_omitted_do_not_count() {
        init();
        let votes = vec![vote("v1", &["C"])];
        let m = calculate_pairwise_matrix(&abc(), &votes);
        assert_eq!(m.count("A", "B"), 0);
        assert_eq!(m.count("B", "A"), 0);
        assert_eq!(m.count("C", "A"), 1);
        assert_eq!(m.count("C", "B"), 1);
    }

    #[test]
    fn empty_ballot_expresses_nothing() {
        init();
        let votes = vec![vote("v1", &[])];
        let m = calculate_pairwise_matrix(&abc(), &votes);
        assert!(m.entries().iter().all(|(_, _, c)| *c == 0));
    }

    #[test]
    fn unknown_and_repeated_rankings_are_tolerated() {
        init();
        let votes = vec![
            vote("v1", &["ghost", "B", "A", "B"]),
            vote("v2", &["B", "ghost"]),
        ];
        let m = calculate_pairwise_matrix(&abc(), &votes);
        assert_eq!(m.get("ghost", "A"), None);
        assert_eq!(m.count("B", "A"), 2);
        assert_eq!(m.count("A", "B"), 0);
        assert_eq!(m.count("A", "C"), 1);
        assert_eq!(m.count("B", "C"), 2);
        assert_eq!(
            determine_condorcet_winner(&abc(), &votes),
            Some("B".to_string())
        );
    }

    #[test]
    fn duplicate_nomination_ids_keep_the_first() {
        init();
        let noms = vec![nom("A", 1), nom("B", 2), nom("A", 0)];
        let m = calculate_pairwise_matrix(&noms, &[vote("v1", &["B"])]);
        assert_eq!(m.len(), 2);
        let res = run_condorcet_stats(&noms, &[]);
        assert_eq!(res.standings.len(), 2);
        // Created at 1 (first entry), not 0.
        assert_eq!(res.winner, Some("A".to_string()));
    }

    #[test]
    fn counts_never_exceed_ballots() {
        init();
        let votes = vec![
            vote("v1", &["A"]),
            vote("v2", &["C", "B"]),
            vote("v3", &[]),
            vote("v4", &["B", "A", "C"]),
        ];
        let m = calculate_pairwise_matrix(&abc(), &votes);
        for (a, b, c) in m.entries() {
            assert!(c + m.count(b, a) <= votes.len() as u64, "{} {}", a, b);
        }
    }

    #[test]
    fn repeated_calls_agree() {
        init();
        let votes = rotation();
        let first = run_condorcet_stats(&abc(), &votes);
        for _ in 0..5 {
            assert_eq!(run_condorcet_stats(&abc(), &votes), first);
            assert_eq!(calculate_pairwise_matrix(&abc(), &votes), first.matrix);
            assert_eq!(determine_condorcet_winner(&abc(), &votes), first.winner);
        }
    }

    #[test]
    fn nomination_order_does_not_matter() {
        init();
        let noms = vec![nom("A", 7), nom("B", 7), nom("C", 7), nom("D", 3)];
        let mut votes = rotation();
        votes.push(vote("v4", &["D"]));
        votes.push(vote("v5", &["B", "D"]));
        let reference = run_condorcet_stats(&noms, &votes);
        let orders = [[3, 2, 1, 0], [1, 3, 0, 2], [2, 0, 3, 1]];
        for order in orders.iter() {
            let shuffled: Vec<Nomination> = order.iter().map(|i| noms[*i].clone()).collect();
            let res = run_condorcet_stats(&shuffled, &votes);
            assert_eq!(res.winner, reference.winner);
            assert_eq!(res.matrix, reference.matrix);
            assert_eq!(res.standings, reference.standings);
        }
    }

    // Small deterministic generator, enough to explore many ballot sets.
    struct Lcg(u64);

    impl Lcg {
        fn next(&mut self, bound: usize) -> usize {
            self.0 = self
                .0
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            ((self.0 >> 33) % bound as u64) as usize
        }
    }

    #[test]
    fn at_most_one_nomination_beats_all_others() {
        init();
        let ids = ["A", "B", "C", "D", "E"];
        let noms: Vec<Nomination> = ids.iter().map(|id| nom(id, 0)).collect();
        let mut rng = Lcg(42);
        for _ in 0..200 {
            let num_votes = rng.next(8);
            let votes: Vec<Vote> = (0..num_votes)
                .map(|i| {
                    let mut pool: Vec<&str> = ids.to_vec();
                    let len = rng.next(ids.len() + 1);
                    let mut rankings: Vec<&str> = Vec::new();
                    for _ in 0..len {
                        rankings.push(pool.remove(rng.next(pool.len())));
                    }
                    vote(&format!("v{}", i), &rankings)
                })
                .collect();
            let res = run_condorcet_stats(&noms, &votes);
            let unbeaten = res.standings.iter().filter(|s| s.wins == 4).count();
            assert!(unbeaten <= 1);
            match res.resolution {
                Resolution::Condorcet => assert_eq!(unbeaten, 1),
                Resolution::Fallback => assert_eq!(unbeaten, 0),
                r => panic!("unexpected resolution {:?}", r),
            }
            assert_eq!(res.winner.as_deref(), Some(res.standings[0].id.as_str()));
        }
    }
}
