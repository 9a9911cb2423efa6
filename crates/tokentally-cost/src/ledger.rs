// SPDX-FileCopyrightText: 2026 Tokentally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only CSV call log.
//!
//! One header row, then one row per tracked call in a fixed column order. The
//! analysis tooling re-reads this file, so the columns are a stable contract:
//!
//! `timestamp, session_id, agent_name, model, provider, input_tokens,
//! output_tokens, total_tokens, input_cost, output_cost, total_cost, latency_ms`

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tokentally_core::TokentallyError;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use crate::record::CallRecord;

/// File name of the call log inside the metrics directory.
pub const COST_LOG_FILE: &str = "cost_log.csv";

/// Header row, in write order.
pub const COLUMNS: [&str; 12] = [
    "timestamp",
    "session_id",
    "agent_name",
    "model",
    "provider",
    "input_tokens",
    "output_tokens",
    "total_tokens",
    "input_cost",
    "output_cost",
    "total_cost",
    "latency_ms",
];

/// On-disk shape of one log row. Field order must match [`COLUMNS`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct LedgerRow {
    pub timestamp: String,
    pub session_id: String,
    pub agent_name: String,
    pub model: String,
    pub provider: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub input_cost: f64,
    pub output_cost: f64,
    pub total_cost: f64,
    pub latency_ms: f64,
}

impl From<&CallRecord> for LedgerRow {
    fn from(record: &CallRecord) -> Self {
        Self {
            timestamp: format_timestamp(&record.timestamp),
            session_id: record.session_id.clone(),
            agent_name: record.agent_name.clone(),
            model: record.model.clone(),
            provider: record.provider.clone(),
            input_tokens: record.input_tokens,
            output_tokens: record.output_tokens,
            total_tokens: record.total_tokens,
            input_cost: record.input_cost,
            output_cost: record.output_cost,
            total_cost: record.total_cost,
            latency_ms: record.latency_ms(),
        }
    }
}

impl TryFrom<LedgerRow> for CallRecord {
    type Error = TokentallyError;

    fn try_from(row: LedgerRow) -> Result<Self, Self::Error> {
        let timestamp = DateTime::parse_from_rfc3339(&row.timestamp)
            .map_err(|e| {
                TokentallyError::invalid_input(format!(
                    "timestamp {:?} is not RFC 3339: {e}",
                    row.timestamp
                ))
            })?
            .with_timezone(&Utc);

        if row.input_tokens.checked_add(row.output_tokens) != Some(row.total_tokens) {
            return Err(TokentallyError::invalid_input(format!(
                "total_tokens {} does not equal input_tokens {} + output_tokens {}",
                row.total_tokens, row.input_tokens, row.output_tokens
            )));
        }

        for (column, value) in [
            ("input_cost", row.input_cost),
            ("output_cost", row.output_cost),
            ("total_cost", row.total_cost),
            ("latency_ms", row.latency_ms),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(TokentallyError::invalid_input(format!(
                    "{column} must be a non-negative number, got {value}"
                )));
            }
        }

        Ok(Self {
            timestamp,
            session_id: row.session_id,
            agent_name: row.agent_name,
            model: row.model,
            provider: row.provider,
            input_tokens: row.input_tokens,
            output_tokens: row.output_tokens,
            total_tokens: row.total_tokens,
            input_cost: row.input_cost,
            output_cost: row.output_cost,
            total_cost: row.total_cost,
            latency: Duration::from_nanos((row.latency_ms * 1_000_000.0).round() as u64),
        })
    }
}

/// RFC 3339 in UTC with microseconds, which sorts lexically.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Serialize one row, optionally preceded by the header, into a buffer.
fn encode_row(row: &LedgerRow, with_header: bool) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(with_header)
        .from_writer(Vec::new());
    writer.serialize(row)?;
    writer.into_inner().map_err(|e| e.into_error().into())
}

/// Append-only CSV log of tracked calls.
///
/// Appends are serialized by an internal lock and each row goes out in a
/// single write, so concurrent appenders never interleave partial rows.
#[derive(Debug)]
pub struct CostLedger {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CostLedger {
    /// A ledger writing to the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// A ledger writing `cost_log.csv` under `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(COST_LOG_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the file with its header row if it does not exist yet.
    pub async fn ensure_header(&self) -> Result<(), TokentallyError> {
        let _guard = self.write_lock.lock().await;
        let mut file = self.open_for_append().await?;
        if self.is_empty(&file).await? {
            let header = COLUMNS.join(",") + "\n";
            self.write_all(&mut file, header.as_bytes()).await?;
        }
        Ok(())
    }

    /// Append one record as a single row.
    pub async fn append(&self, record: &CallRecord) -> Result<(), TokentallyError> {
        let row = LedgerRow::from(record);

        let _guard = self.write_lock.lock().await;
        let mut file = self.open_for_append().await?;
        let with_header = self.is_empty(&file).await?;
        let buf = encode_row(&row, with_header)
            .map_err(|e| TokentallyError::persistence(&self.path, e))?;
        self.write_all(&mut file, &buf).await?;

        debug!(
            session_id = %record.session_id,
            model = %record.model,
            total_cost = record.total_cost,
            "call appended to cost log"
        );
        Ok(())
    }

    async fn open_for_append(&self) -> Result<tokio::fs::File, TokentallyError> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| TokentallyError::persistence(&self.path, e))
    }

    async fn is_empty(&self, file: &tokio::fs::File) -> Result<bool, TokentallyError> {
        let metadata = file
            .metadata()
            .await
            .map_err(|e| TokentallyError::persistence(&self.path, e))?;
        Ok(metadata.len() == 0)
    }

    async fn write_all(
        &self,
        file: &mut tokio::fs::File,
        buf: &[u8],
    ) -> Result<(), TokentallyError> {
        file.write_all(buf)
            .await
            .map_err(|e| TokentallyError::persistence(&self.path, e))?;
        file.flush()
            .await
            .map_err(|e| TokentallyError::persistence(&self.path, e))
    }
}
