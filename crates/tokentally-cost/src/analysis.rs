// SPDX-FileCopyrightText: 2026 Tokentally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Offline analysis over the CSV call log.
//!
//! Rebuilds the same rollups the tracker keeps in memory, from the log alone.
//! Replaying a log through [`analyze_by_session`] yields the rollups the
//! tracker held after tracking those calls.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use tokentally_core::{TokentallyError, UsageTotals};

use crate::ledger::{COLUMNS, LedgerRow};
use crate::record::CallRecord;
use crate::rollup::{CostSummary, SessionMap, fold_record};

/// Read every record from the call log at `path`.
pub fn load_cost_log(path: impl AsRef<Path>) -> Result<Vec<CallRecord>, TokentallyError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| TokentallyError::persistence(path, e))?;
    read_cost_log(file).map_err(|e| match e {
        TokentallyError::Persistence { source, .. } => TokentallyError::persistence(path, source),
        other => other,
    })
}

/// Read every record from call log content.
///
/// The header must match the log's column order exactly. A row that does not
/// parse, or whose values are inconsistent, fails the whole read with its
/// 1-based data row number.
pub fn read_cost_log<R: Read>(reader: R) -> Result<Vec<CallRecord>, TokentallyError> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);

    let headers = reader.headers().map_err(csv_error)?;
    if !headers.iter().eq(COLUMNS.iter().copied()) {
        return Err(TokentallyError::invalid_input(format!(
            "unexpected cost log header: {}",
            headers.iter().collect::<Vec<_>>().join(",")
        )));
    }

    let mut records = Vec::new();
    for (index, row) in reader.deserialize::<LedgerRow>().enumerate() {
        let row_number = index + 1;
        let row = row.map_err(|e| {
            if e.is_io_error() {
                csv_error(e)
            } else {
                TokentallyError::invalid_input(format!("row {row_number}: {e}"))
            }
        })?;
        let record = CallRecord::try_from(row).map_err(|e| match e {
            TokentallyError::InvalidInput { message } => {
                TokentallyError::invalid_input(format!("row {row_number}: {message}"))
            }
            other => other,
        })?;
        records.push(record);
    }
    Ok(records)
}

fn csv_error(e: csv::Error) -> TokentallyError {
    if e.is_io_error() {
        TokentallyError::persistence("<cost log>", e)
    } else {
        TokentallyError::invalid_input(e.to_string())
    }
}

/// Per-session rollups, built the same way the tracker builds them.
pub fn analyze_by_session(records: &[CallRecord]) -> SessionMap {
    let mut sessions = SessionMap::new();
    for record in records {
        fold_record(&mut sessions, record);
    }
    sessions
}

/// Totals per agent across every session.
pub fn analyze_by_agent(records: &[CallRecord]) -> BTreeMap<String, UsageTotals> {
    group_by(records, |r| &r.agent_name)
}

/// Totals per model across every session.
pub fn analyze_by_model(records: &[CallRecord]) -> BTreeMap<String, UsageTotals> {
    group_by(records, |r| &r.model)
}

fn group_by<'a>(
    records: &'a [CallRecord],
    key: impl Fn(&'a CallRecord) -> &'a String,
) -> BTreeMap<String, UsageTotals> {
    let mut totals: BTreeMap<String, UsageTotals> = BTreeMap::new();
    for record in records {
        totals
            .entry(key(record).clone())
            .or_default()
            .add_call(record.total_tokens, record.total_cost);
    }
    totals
}

/// Cross-session summary of the whole log.
pub fn summarize(records: &[CallRecord]) -> CostSummary {
    CostSummary::from_sessions(analyze_by_session(records).values())
}

/// The records belonging to one session, in log order.
pub fn session_records<'a>(
    records: &'a [CallRecord],
    session_id: &'a str,
) -> impl Iterator<Item = &'a CallRecord> + 'a {
    records.iter().filter(move |r| r.session_id == session_id)
}
