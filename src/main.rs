mod args;
mod election;

use std::process;

use chrono::{DateTime, TimeZone, Utc};
use clap::Parser;
use log::{debug, info, warn, LevelFilter};
use serde_json::{json, Value as JSValue};
use snafu::{whatever, ErrorCompat, OptionExt, ResultExt};

use crate::args::{Args, Command};
use crate::election::config_reader::{read_config, LunchConfig, Settings};
use crate::election::io_xlsx::read_excel_file;
use crate::election::summary::{
    build_summary_js, build_tally_js, check_reference, read_tally_input, write_output,
};
use crate::election::*;

/// When no start time is given, nominations stay open this long.
const DEFAULT_NOMINATION_MINUTES: i64 = 30;

fn parse_time(s: &str) -> ElectionResult<i64> {
    let t = whatever!(
        DateTime::parse_from_rfc3339(s),
        "Could not read the date {:?} (expected RFC 3339, e.g. 2024-05-17T12:00:00+02:00)",
        s
    );
    Ok(t.timestamp_millis())
}

fn format_time(ms: i64) -> String {
    match Utc.timestamp_millis_opt(ms).single() {
        Some(t) => t.to_rfc3339(),
        None => ms.to_string(),
    }
}

fn parse_visibility(s: &str) -> ElectionResult<BallotVisibility> {
    match s.to_lowercase().as_str() {
        "secret" => Ok(BallotVisibility::Secret),
        "open" => Ok(BallotVisibility::Open),
        x => whatever!("Unknown ballot visibility {:?}: expected secret or open", x),
    }
}

fn load<S: ElectionStore>(c: &ElectionController<S>, id: &str) -> ElectionResult<Election> {
    c.store().get_election(id)?.context(NotFoundSnafu { id })
}

// Restaurant names are accepted wherever an id is expected.
fn nomination_key(election: &Election, key: &str) -> String {
    match election.find_nomination(key) {
        Some(n) => n.id.clone(),
        None => key.to_string(),
    }
}

fn emit(js: &JSValue, out: Option<&str>, reference: Option<&str>) -> ElectionResult<()> {
    let pretty = write_output(js, out)?;
    if let Some(r) = reference {
        check_reference(&pretty, r)?;
        info!("The output matches the reference {}", r);
    }
    Ok(())
}

fn run(args: &Args) -> ElectionResult<()> {
    let now = match &args.now {
        Some(s) => parse_time(s)?,
        None => Utc::now().timestamp_millis(),
    };
    debug!("run: now: {}", format_time(now));
    let out = args.out.as_deref();

    let config = match &args.config {
        Some(p) => read_config(p)?,
        None => LunchConfig::default(),
    };
    let settings = Settings::resolve(&config, args.store.as_deref())?;
    debug!("run: settings: {:?}", settings);
    let controller = ElectionController::new(
        JsonFileStore::new(&settings.store_directory),
        settings.voting_window_ms,
    );

    let js: JSValue = match &args.command {
        // Tabulation only, the store is not involved.
        Command::Tally { input, reference } => {
            let tally = read_tally_input(input)?;
            info!(
                "Tabulating {} nominations and {} ballots from {}",
                tally.nominations.len(),
                tally.votes.len(),
                input
            );
            return emit(&build_tally_js(&tally), out, reference.as_deref());
        }
        Command::Create {
            name,
            admin,
            codeword,
            visibility,
            start_in,
            start_at,
        } => {
            let vote_start_time = match (start_in, start_at) {
                (Some(_), Some(_)) => whatever!("--start-in and --start-at cannot be used together"),
                (Some(m), None) => now + i64::from(*m) * 60 * 1000,
                (None, Some(s)) => parse_time(s)?,
                (None, None) => now + DEFAULT_NOMINATION_MINUTES * 60 * 1000,
            };
            let request = NewElection {
                name: name.clone(),
                admin_name: admin.clone(),
                group_codeword: codeword.clone(),
                ballot_visibility: parse_visibility(visibility)?,
                vote_start_time,
            };
            let e = controller.create_election(&request, now)?;
            json!({
                "id": e.id,
                "name": e.name,
                "voteStartTime": e.vote_start_time,
                "votingOpensAt": format_time(e.vote_start_time),
                "votingClosesAt": format_time(e.voting_ends_at(settings.voting_window_ms)),
            })
        }
        Command::Nominate {
            election,
            by,
            restaurant,
            metadata,
        } => {
            let metadata: Option<JSValue> = match metadata {
                Some(m) => Some(serde_json::from_str(m).context(ParsingJsonSnafu {})?),
                None => None,
            };
            let n = controller.nominate(election, by, restaurant, metadata, now)?;
            serde_json::to_value(&n).context(ParsingJsonSnafu {})?
        }
        Command::Withdraw {
            election,
            nomination,
            by,
            codeword,
        } => {
            let e = load(&controller, election)?;
            let nomination_id = nomination_key(&e, nomination);
            controller.withdraw_nomination(election, &nomination_id, by, codeword.as_deref(), now)?;
            json!({ "withdrawn": nomination_id })
        }
        Command::Vote {
            election,
            voter,
            rankings,
        } => {
            let e = load(&controller, election)?;
            let ids: Vec<String> = rankings
                .iter()
                .map(|r| r.trim())
                .filter(|r| !r.is_empty())
                .map(|r| nomination_key(&e, r))
                .collect();
            let v = controller.cast_vote(election, voter, &ids, now)?;
            serde_json::to_value(&v).context(ParsingJsonSnafu {})?
        }
        Command::ImportBallots {
            election,
            input,
            excel_worksheet_name,
        } => {
            let ballots = read_excel_file(input, excel_worksheet_name.as_deref())?;
            let imported = controller.import_ballots(election, &ballots, now)?;
            info!("Imported {} ballots from {}", imported, input);
            json!({ "imported": imported })
        }
        Command::Start { election, codeword } => {
            controller.start_voting(election, codeword.as_deref(), now)?;
            build_summary_js(&controller.results(election, now)?)
        }
        Command::Finalize { election, codeword } => {
            controller.finalize(election, codeword.as_deref(), now)?;
            build_summary_js(&controller.results(election, now)?)
        }
        Command::Cancel { election, codeword } => {
            controller.cancel(election, codeword.as_deref(), now)?;
            build_summary_js(&controller.results(election, now)?)
        }
        Command::Results {
            election,
            reference,
        } => {
            let js = build_summary_js(&controller.results(election, now)?);
            return emit(&js, out, reference.as_deref());
        }
        Command::List => {
            let listings = controller.list(now)?;
            if listings.is_empty() {
                warn!("No election found in {:?}", settings.store_directory);
            }
            serde_json::to_value(&listings).context(ParsingJsonSnafu {})?
        }
    };
    emit(&js, out, None)
}

fn main() {
    let args = Args::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if args.verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.init();
    debug!("args: {:?}", args);

    if let Err(e) = run(&args) {
        eprintln!("An error occured: {}", e);
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("trace: {}", bt);
        }
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn times() {
        assert_eq!(parse_time("1970-01-01T00:00:01Z").unwrap(), 1000);
        assert_eq!(parse_time("1970-01-01T01:00:00+01:00").unwrap(), 0);
        assert!(parse_time("noon").is_err());
        assert_eq!(format_time(1000), "1970-01-01T00:00:01+00:00");
    }

    #[test]
    fn visibility() {
        assert_eq!(parse_visibility("Open").unwrap(), BallotVisibility::Open);
        assert_eq!(parse_visibility("secret").unwrap(), BallotVisibility::Secret);
        assert!(parse_visibility("public").is_err());
    }

    #[test]
    fn args_parse() {
        let args = Args::try_parse_from([
            "lunchvote",
            "--store",
            "/tmp/x",
            "vote",
            "--election",
            "e1",
            "--voter",
            "Bob",
            "--rankings",
            "Taco Shack,n2",
        ])
        .unwrap();
        match args.command {
            Command::Vote { rankings, .. } => {
                assert_eq!(rankings, vec!["Taco Shack".to_string(), "n2".to_string()])
            }
            c => panic!("unexpected command {:?}", c),
        }
        assert_eq!(args.store.as_deref(), Some("/tmp/x"));
    }

    #[test]
    fn tally_writes_its_summary() {
        let dir = std::env::temp_dir().join(format!("lunchvote-main-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let input = dir.join("election.json");
        let out = dir.join("out.json");
        std::fs::write(
            &input,
            r#"{"nominations": [{"id": "a", "nominatorName": "x", "restaurantName": "A", "createdAt": 1}],
                "votes": []}"#,
        )
        .unwrap();
        let args = Args::try_parse_from([
            "lunchvote",
            "--out",
            out.to_str().unwrap(),
            "tally",
            "--input",
            input.to_str().unwrap(),
        ])
        .unwrap();
        run(&args).unwrap();
        let js: JSValue =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(js["results"]["resolution"], "unopposed");
        assert_eq!(js["results"]["winner"]["id"], "a");
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
