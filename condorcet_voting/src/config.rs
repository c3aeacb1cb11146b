// ********* Input data structures ***********

use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::fmt::Display;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value as JSValue;

/// A restaurant put forward by a participant.
///
/// Nominations are identified by `id`. Ballots refer to nominations through this id only, the
/// other fields are informative, except `created_at` which takes part in the fallback tie-break.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Nomination {
    pub id: String,
    #[serde(rename = "nominatorName")]
    pub nominator_name: String,
    #[serde(rename = "restaurantName")]
    pub restaurant_name: String,
    /// Added once the voting phase had already started.
    #[serde(rename = "isWriteIn", default)]
    pub is_write_in: bool,
    /// Opaque data attached by the caller (place details, links, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<JSValue>,
    /// Creation time, in milliseconds since the epoch.
    #[serde(rename = "createdAt")]
    pub created_at: i64,
}

/// One ballot.
///
/// `rankings` lists nomination ids from the most preferred to the least preferred.
/// A nomination that does not appear is ranked below all the listed ones.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    #[serde(rename = "voterName")]
    pub voter_name: String,
    pub rankings: Vec<String>,
}

// ******** Output data structures *********

/// Head-to-head preference counts.
///
/// `count(a, b)` is the number of ballots that rank `a` strictly above `b`. Every ordered pair
/// of distinct registered nominations is present, with a count of zero if no ballot expressed
/// that preference.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct PairwiseMatrix {
    pub(crate) counts: HashMap<(String, String), u64>,
}

impl PairwiseMatrix {
    /// The number of ballots preferring `a` over `b`, or `None` if the pair is not part of the
    /// matrix.
    pub fn get(&self, a: &str, b: &str) -> Option<u64> {
        self.counts.get(&(a.to_string(), b.to_string())).cloned()
    }

    /// Same as `get`, unknown pairs count as zero.
    pub fn count(&self, a: &str, b: &str) -> u64 {
        self.get(a, b).unwrap_or(0)
    }

    /// Number of ordered pairs.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// All the entries, ordered by (for, against).
    pub fn entries(&self) -> Vec<(&str, &str, u64)> {
        let mut res: Vec<(&str, &str, u64)> = self
            .counts
            .iter()
            .map(|((a, b), c)| (a.as_str(), b.as_str(), *c))
            .collect();
        res.sort();
        res
    }

    /// The matrix as rows: `nested[a][b] == count(a, b)`.
    pub fn to_nested(&self) -> BTreeMap<String, BTreeMap<String, u64>> {
        let mut res: BTreeMap<String, BTreeMap<String, u64>> = BTreeMap::new();
        for ((a, b), c) in self.counts.iter() {
            res.entry(a.clone()).or_default().insert(b.clone(), *c);
        }
        res
    }
}

impl Serialize for PairwiseMatrix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_nested().serialize(serializer)
    }
}

/// How the winner was reached.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Resolution {
    /// Nothing to choose from.
    NoNominations,
    /// A single nomination wins without any vote.
    Unopposed,
    /// The winner beats every other nomination head-to-head.
    Condorcet,
    /// No Condorcet winner: most head-to-head wins, then most support, then the earliest
    /// nomination, then the smallest id.
    Fallback,
}

/// Head-to-head record of one nomination.
#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct Standing {
    pub id: String,
    #[serde(rename = "restaurantName")]
    pub restaurant_name: String,
    /// Opponents beaten strictly.
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
    /// Sum of `count(id, other)` over all the opponents.
    pub support: u64,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct CondorcetResult {
    pub winner: Option<String>,
    pub resolution: Resolution,
    /// In the order of the fallback tie-break, the winner first.
    pub standings: Vec<Standing>,
    pub matrix: PairwiseMatrix,
}

/// Errors raised while assembling an election with the builder.
///
/// The tabulation itself never fails.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum VotingErrors {
    DuplicateNomination(String),
    UnknownNomination(String),
}

impl Error for VotingErrors {}

impl Display for VotingErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VotingErrors::DuplicateNomination(id) => write!(f, "duplicate nomination id {}", id),
            VotingErrors::UnknownNomination(id) => write!(f, "unknown nomination id {}", id),
        }
    }
}
