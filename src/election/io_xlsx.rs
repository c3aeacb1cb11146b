// Ballots collected in a spreadsheet.
//
// One row per voter: the first column holds the voter name and the following columns the
// restaurants, most preferred first. The first row is a header.

use calamine::{open_workbook, DataType, Reader, Xlsx};
use log::{debug, warn};
use snafu::{ensure, OptionExt, ResultExt};

use crate::election::*;

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ParsedBallot {
    pub voter: String,
    /// Nomination ids or restaurant names, as typed in the cells.
    pub choices: Vec<String>,
}

fn cell_text(cell: &DataType) -> Option<String> {
    match cell {
        DataType::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        DataType::Int(i) => Some(i.to_string()),
        DataType::Float(f) => Some(f.to_string()),
        _ => None,
    }
}

/// Reads one row. Rows without a voter name are skipped.
pub fn parse_row(row: &[DataType]) -> Option<ParsedBallot> {
    let (first, rest) = row.split_first()?;
    let voter = cell_text(first)?;
    let choices: Vec<String> = rest.iter().filter_map(cell_text).collect();
    Some(ParsedBallot { voter, choices })
}

pub fn read_excel_file(path: &str, worksheet: Option<&str>) -> ElectionResult<Vec<ParsedBallot>> {
    debug!("read_excel_file: path: {:?} worksheet: {:?}", path, worksheet);
    let mut workbook: Xlsx<_> =
        open_workbook(path).context(OpeningExcelSnafu { path })?;
    let wrange = match worksheet {
        Some(name) => workbook.worksheet_range(name),
        None => workbook.worksheet_range_at(0),
    }
    .context(EmptyExcelSnafu { path })?
    .context(OpeningExcelSnafu { path })?;

    let mut res: Vec<ParsedBallot> = Vec::new();
    for (idx, row) in wrange.rows().enumerate().skip(1) {
        match parse_row(row) {
            Some(b) => res.push(b),
            None => debug!("read_excel_file: skipping row {}: {:?}", idx + 1, row),
        }
    }
    debug!("read_excel_file: {} ballots", res.len());
    Ok(res)
}

/// Turns the choices of a ballot into nomination ids.
///
/// Cells are matched by id first, then by restaurant name ignoring case. Blank cells are gone
/// already, a choice repeated later on the ballot is dropped. A ballot ranking nothing is an
/// error.
pub fn resolve_ballot(election: &Election, ballot: &ParsedBallot) -> ElectionResult<Vec<String>> {
    ensure!(
        !ballot.choices.is_empty(),
        InvalidBallotSnafu {
            voter: ballot.voter.clone(),
            reason: "no restaurant is ranked",
        }
    );
    let mut rankings: Vec<String> = Vec::new();
    for choice in ballot.choices.iter() {
        let nomination = election
            .find_nomination(choice)
            .context(InvalidBallotSnafu {
                voter: ballot.voter.clone(),
                reason: format!("unknown restaurant {:?}", choice),
            })?;
        if rankings.contains(&nomination.id) {
            warn!(
                "resolve_ballot: {} ranked {:?} twice, keeping the first one",
                ballot.voter, nomination.restaurant_name
            );
        } else {
            rankings.push(nomination.id.clone());
        }
    }
    Ok(rankings)
}
