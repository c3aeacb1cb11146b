use std::fs;

use condorcet_voting::{run_condorcet_stats, Nomination, Vote};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JSValue};
use snafu::{whatever, ResultExt};
use text_diff::print_diff;

use crate::election::*;

/// A standalone election to tabulate, without any lifecycle.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct TallyInput {
    #[serde(default)]
    pub name: Option<String>,
    pub nominations: Vec<Nomination>,
    #[serde(default)]
    pub votes: Vec<Vote>,
}

pub fn build_summary_js(outcome: &ElectionOutcome) -> JSValue {
    json!({
        "election": {
            "id": outcome.id,
            "name": outcome.name,
            "status": outcome.status,
            "voteStartTime": outcome.vote_start_time,
            "votingEndsAt": outcome.voting_ends_at,
            "participants": outcome.participants,
            "ballotCount": outcome.ballot_count,
        },
        "nominations": outcome.nominations,
        "results": {
            "winner": outcome.winner,
            "resolution": outcome.resolution,
            "standings": outcome.standings,
            "pairwise": outcome.pairwise,
        },
        "ballots": outcome.ballots,
    })
}

pub fn build_tally_js(input: &TallyInput) -> JSValue {
    let res = run_condorcet_stats(&input.nominations, &input.votes);
    let winner: Option<&Nomination> = res
        .winner
        .as_deref()
        .and_then(|w| input.nominations.iter().find(|n| n.id == w));
    json!({
        "name": input.name,
        "ballotCount": input.votes.len(),
        "results": {
            "winner": winner,
            "resolution": res.resolution,
            "standings": res.standings,
            "pairwise": res.matrix,
        },
    })
}

pub fn read_tally_input(path: &str) -> ElectionResult<TallyInput> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    serde_json::from_str(&contents).context(ParsingJsonSnafu {})
}

/// Prints the JSON to stdout, or writes it to a file.
pub fn write_output(js: &JSValue, out: Option<&str>) -> ElectionResult<String> {
    let pretty = serde_json::to_string_pretty(js).context(ParsingJsonSnafu {})?;
    match out {
        None | Some("stdout") => println!("{}", pretty),
        Some(path) => {
            fs::write(path, &pretty).context(WritingJsonSnafu { path })?;
            info!("Wrote {}", path);
        }
    }
    Ok(pretty)
}

/// Compares a result with a reference file, and prints the differences if any.
pub fn check_reference(pretty: &str, reference_path: &str) -> ElectionResult<()> {
    let contents =
        fs::read_to_string(reference_path).context(OpeningJsonSnafu { path: reference_path })?;
    let reference: JSValue = serde_json::from_str(&contents).context(ParsingJsonSnafu {})?;
    debug!("check_reference: reference: {:?}", reference);
    let pretty_reference = serde_json::to_string_pretty(&reference).context(ParsingJsonSnafu {})?;
    if pretty_reference != pretty {
        warn!("Found differences with the reference {}", reference_path);
        print_diff(pretty_reference.as_str(), pretty, "\n");
        whatever!("Difference detected between the results and the reference results")
    }
    Ok(())
}
