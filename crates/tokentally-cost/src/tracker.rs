// SPDX-FileCopyrightText: 2026 Tokentally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The cost tracking engine.
//!
//! `CostTracker` prices each reported call, appends it to the CSV call log,
//! folds it into the in-memory session rollups and rewrites the JSON snapshot.
//! On construction it re-hydrates the rollups from the snapshot so running
//! totals survive process restarts.
//!
//! Persistence failures never undo or block the in-memory update: they are
//! logged and handed back in the [`TrackResult`].

use std::path::{Path, PathBuf};

use tokentally_config::TokentallyConfig;
use tokentally_core::TokentallyError;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::ledger::CostLedger;
use crate::pricing::{CostBreakdown, PricingTable};
use crate::record::{CallRecord, CallUsage};
use crate::rollup::{CostSummary, SessionMap, SessionRollup, fold_record};
use crate::store::SnapshotStore;

/// Outcome of tracking one call.
#[derive(Debug)]
pub struct TrackResult {
    /// The priced record, for the caller to keep if it wants.
    pub record: CallRecord,
    /// The session's running cost after this call, USD.
    pub session_total_cost: f64,
    /// Set when the call log append failed.
    pub ledger_error: Option<TokentallyError>,
    /// Set when the snapshot rewrite failed.
    pub snapshot_error: Option<TokentallyError>,
}

impl TrackResult {
    /// Whether both the call log and the snapshot were written.
    pub fn is_persisted(&self) -> bool {
        self.ledger_error.is_none() && self.snapshot_error.is_none()
    }

    pub fn persistence_errors(&self) -> impl Iterator<Item = &TokentallyError> {
        self.ledger_error.iter().chain(self.snapshot_error.iter())
    }
}

/// Session-scoped cost tracker backed by a call log and a rollup snapshot.
///
/// Share it across tasks behind an `Arc`; all methods take `&self`.
pub struct CostTracker {
    pricing: PricingTable,
    ledger: CostLedger,
    store: SnapshotStore,
    /// Held across fold and snapshot write so snapshots are written in order.
    sessions: Mutex<SessionMap>,
    session_cost_warning_usd: Option<f64>,
}

impl CostTracker {
    /// Open a tracker in `log_dir` with the built-in pricing table.
    pub async fn open(log_dir: impl AsRef<Path>) -> Result<Self, TokentallyError> {
        Self::open_with_pricing(log_dir, PricingTable::builtin()).await
    }

    /// Open a tracker in `log_dir` with a custom pricing table.
    ///
    /// Creates the directory if needed. A snapshot that cannot be read is
    /// logged and ignored; only a directory that cannot be created fails.
    pub async fn open_with_pricing(
        log_dir: impl AsRef<Path>,
        pricing: PricingTable,
    ) -> Result<Self, TokentallyError> {
        let log_dir = log_dir.as_ref();
        tokio::fs::create_dir_all(log_dir)
            .await
            .map_err(|e| TokentallyError::persistence(log_dir, e))?;

        let ledger = CostLedger::in_dir(log_dir);
        let store = SnapshotStore::in_dir(log_dir);
        let sessions = store.load_or_default().await;

        if let Err(e) = ledger.ensure_header().await {
            error!(error = %e, "failed to initialize cost log");
        }

        info!(
            log_path = %ledger.path().display(),
            sessions = sessions.len(),
            "cost tracker initialized"
        );

        Ok(Self {
            pricing,
            ledger,
            store,
            sessions: Mutex::new(sessions),
            session_cost_warning_usd: None,
        })
    }

    /// Open a tracker from the `[metrics]` and `[pricing]` config sections.
    pub async fn from_config(config: &TokentallyConfig) -> Result<Self, TokentallyError> {
        let pricing = PricingTable::from_config(&config.pricing)?;
        let tracker = Self::open_with_pricing(&config.metrics.log_dir, pricing).await?;
        Ok(tracker.with_session_cost_warning(config.metrics.session_cost_warning_usd))
    }

    /// Warn once per session when its running cost crosses `threshold_usd`.
    pub fn with_session_cost_warning(mut self, threshold_usd: Option<f64>) -> Self {
        self.session_cost_warning_usd = threshold_usd;
        self
    }

    pub fn pricing(&self) -> &PricingTable {
        &self.pricing
    }

    pub fn log_path(&self) -> &Path {
        self.ledger.path()
    }

    pub fn snapshot_path(&self) -> &Path {
        self.store.path()
    }

    /// Price a call without tracking it.
    pub fn calculate_cost(
        &self,
        model: &str,
        input_tokens: u64,
        output_tokens: u64,
    ) -> Result<CostBreakdown, TokentallyError> {
        self.pricing.calculate_cost(
            model,
            &tokentally_core::TokenUsage::new(input_tokens, output_tokens),
        )
    }

    /// Track one finished call.
    ///
    /// Fails only with `InvalidInput`, before anything is recorded.
    pub async fn track_call(&self, call: CallUsage) -> Result<TrackResult, TokentallyError> {
        let costs = self.pricing.calculate_cost(&call.model, &call.usage)?;
        let record = CallRecord::new(call, costs);

        let ledger_error = self.ledger.append(&record).await.err();
        if let Some(e) = &ledger_error {
            error!(
                session_id = %record.session_id,
                error = %e,
                "failed to append call to cost log"
            );
        }

        let (session_total_cost, snapshot_error) = {
            let mut sessions = self.sessions.lock().await;
            let previous = sessions
                .get(&record.session_id)
                .map_or(0.0, |s| s.total_cost);
            let session_total_cost = fold_record(&mut sessions, &record).total_cost;
            self.warn_on_threshold(&record.session_id, previous, session_total_cost);

            let snapshot_error = self.store.save(&sessions).await.err();
            (session_total_cost, snapshot_error)
        };
        if let Some(e) = &snapshot_error {
            error!(
                session_id = %record.session_id,
                error = %e,
                "failed to save session snapshot"
            );
        }

        debug!(
            session_id = %record.session_id,
            agent = %record.agent_name,
            model = %record.model,
            input_tokens = record.input_tokens,
            output_tokens = record.output_tokens,
            cost_usd = record.total_cost,
            "call tracked"
        );

        Ok(TrackResult {
            record,
            session_total_cost,
            ledger_error,
            snapshot_error,
        })
    }

    fn warn_on_threshold(&self, session_id: &str, previous: f64, current: f64) {
        if let Some(threshold) = self.session_cost_warning_usd {
            if previous <= threshold && current > threshold {
                warn!(
                    session_id,
                    session_cost_usd = current,
                    threshold_usd = threshold,
                    "session cost exceeds warning threshold"
                );
            }
        }
    }

    /// Snapshot of one session's rollup.
    pub async fn get_session(&self, session_id: &str) -> Option<SessionRollup> {
        self.sessions.lock().await.get(session_id).cloned()
    }

    /// Snapshot of every session's rollup.
    pub async fn get_all_sessions(&self) -> SessionMap {
        self.sessions.lock().await.clone()
    }

    /// Sum of `total_cost` over all sessions, USD.
    pub async fn get_total_cost(&self) -> f64 {
        self.sessions
            .lock()
            .await
            .values()
            .map(|s| s.total_cost)
            .sum()
    }

    /// Cross-session totals with merged agent and model breakdowns.
    pub async fn generate_summary(&self) -> CostSummary {
        let sessions = self.sessions.lock().await;
        CostSummary::from_sessions(sessions.values())
    }
}

impl std::fmt::Debug for CostTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CostTracker")
            .field("log_path", &self.ledger.path())
            .field("snapshot_path", &self.store.path())
            .field("default_model", &self.pricing.default_model())
            .finish_non_exhaustive()
    }
}

/// Paths of the two artifacts a tracker keeps under `log_dir`.
pub fn artifact_paths(log_dir: impl AsRef<Path>) -> (PathBuf, PathBuf) {
    (
        CostLedger::in_dir(log_dir.as_ref()).path().to_path_buf(),
        SnapshotStore::in_dir(log_dir.as_ref()).path().to_path_buf(),
    )
}
