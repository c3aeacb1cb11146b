use snafu::Snafu;

pub mod config_reader;
pub mod controller;
pub mod io_xlsx;
pub mod model;
pub mod store;
pub mod summary;

pub use crate::election::controller::*;
pub use crate::election::model::*;
pub use crate::election::store::*;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ElectionError {
    #[snafu(display("Election {id} not found"))]
    NotFound { id: String },
    #[snafu(display("Nomination {nomination_id} not found in election {id}"))]
    NominationNotFound { id: String, nomination_id: String },
    #[snafu(display("{what} {id} already exists"))]
    AlreadyExists { what: String, id: String },
    #[snafu(display("Invalid codeword"))]
    InvalidCodeword {},
    #[snafu(display("Only the admin may {action}: the group codeword is required"))]
    AdminOnly { action: String },
    #[snafu(display("Only {nominator} or the admin may withdraw this nomination, not {requester}"))]
    NotCreator {
        nominator: String,
        requester: String,
    },
    #[snafu(display("Cannot {action}: the election is in the {status} phase"))]
    WrongPhase {
        action: String,
        status: ElectionStatus,
    },
    #[snafu(display("Invalid election: {reason}"))]
    InvalidElection { reason: String },
    #[snafu(display("Invalid nomination: {reason}"))]
    InvalidNomination { reason: String },
    #[snafu(display("Invalid ballot from {voter}: {reason}"))]
    InvalidBallot { voter: String, reason: String },

    #[snafu(display("Error reading file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing file {path}"))]
    WritingJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("No worksheet found in {path}"))]
    EmptyExcel { path: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type ElectionResult<T> = Result<T, ElectionError>;

/// Display names are free text: they are compared ignoring case and surrounding spaces.
pub fn same_name(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_ignore_case_and_spaces() {
        assert!(same_name("Anna", " anna "));
        assert!(same_name("ÉMILE", "émile"));
        assert!(!same_name("Anna", "Ana"));
    }

    #[test]
    fn errors_display_context() {
        let e = ElectionError::WrongPhase {
            action: "vote".to_string(),
            status: ElectionStatus::Nomination,
        };
        assert_eq!(
            e.to_string(),
            "Cannot vote: the election is in the nomination phase"
        );
    }
}
