use clap::{Parser, Subcommand};

/// Picks a lunch place with friends: nominate restaurants, rank them, and let the Condorcet
/// count decide.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON configuration file with the keys storeDirectory and
    /// votingWindowMinutes.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (directory, optional) Where the elections are stored. Overrides the configuration file.
    #[clap(short, long, value_parser)]
    pub store: Option<String>,

    /// (RFC 3339 date, optional) Runs the command as if it was this time. Defaults to the
    /// current time.
    #[clap(long, value_parser)]
    pub now: Option<String>,

    /// (file path, 'stdout' or empty) Where the JSON output is written. Defaults to the
    /// standard output.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Creates an election. It starts in the nomination phase.
    Create {
        #[clap(long, value_parser)]
        name: String,
        #[clap(long, value_parser)]
        admin: String,
        /// The shared secret of the group, needed for all the admin actions.
        #[clap(long, value_parser)]
        codeword: String,
        /// (secret or open, default secret) Whether the ballots are shown to everyone.
        #[clap(long, value_parser, default_value = "secret")]
        visibility: String,
        /// (minutes) Voting opens this many minutes from now.
        #[clap(long, value_parser)]
        start_in: Option<u32>,
        /// (RFC 3339 date) Voting opens at this time. Cannot be combined with --start-in.
        #[clap(long, value_parser)]
        start_at: Option<String>,
    },
    /// Nominates a restaurant. After voting has started, the nomination is a write-in.
    Nominate {
        #[clap(long, value_parser)]
        election: String,
        #[clap(long, value_parser)]
        by: String,
        #[clap(long, value_parser)]
        restaurant: String,
        /// (JSON, optional) Any details to attach to the nomination.
        #[clap(long, value_parser)]
        metadata: Option<String>,
    },
    /// Withdraws a nomination. Allowed to its nominator, or to anyone with the codeword.
    Withdraw {
        #[clap(long, value_parser)]
        election: String,
        /// The id or the name of the restaurant.
        #[clap(long, value_parser)]
        nomination: String,
        #[clap(long, value_parser)]
        by: String,
        #[clap(long, value_parser)]
        codeword: Option<String>,
    },
    /// Casts or replaces a ballot.
    Vote {
        #[clap(long, value_parser)]
        election: String,
        #[clap(long, value_parser)]
        voter: String,
        /// (comma-separated) Nomination ids or restaurant names, most preferred first.
        #[clap(long, value_parser, value_delimiter = ',')]
        rankings: Vec<String>,
    },
    /// Casts the ballots found in an Excel file: one voter per row, the voter name in the
    /// first column, then the restaurants by rank. The first row is a header.
    ImportBallots {
        #[clap(long, value_parser)]
        election: String,
        #[clap(long, value_parser)]
        input: String,
        /// (default: the first worksheet) The name of the worksheet to use.
        #[clap(long, value_parser)]
        excel_worksheet_name: Option<String>,
    },
    /// Opens the voting phase now.
    Start {
        #[clap(long, value_parser)]
        election: String,
        #[clap(long, value_parser)]
        codeword: Option<String>,
    },
    /// Closes the election and records the winner.
    Finalize {
        #[clap(long, value_parser)]
        election: String,
        #[clap(long, value_parser)]
        codeword: Option<String>,
    },
    /// Cancels the election. No winner is computed.
    Cancel {
        #[clap(long, value_parser)]
        election: String,
        #[clap(long, value_parser)]
        codeword: Option<String>,
    },
    /// Shows the status, the standings and the winner of an election.
    Results {
        #[clap(long, value_parser)]
        election: String,
        /// (file path, optional) A reference file in JSON format. If provided, lunchvote
        /// checks that the results match the reference.
        #[clap(short, long, value_parser)]
        reference: Option<String>,
    },
    /// Lists all the elections.
    List,
    /// Tabulates a JSON file with nominations and votes, without any lifecycle.
    Tally {
        #[clap(short, long, value_parser)]
        input: String,
        /// (file path, optional) A reference file in JSON format. If provided, lunchvote
        /// checks that the tabulated output matches the reference.
        #[clap(short, long, value_parser)]
        reference: Option<String>,
    },
}
