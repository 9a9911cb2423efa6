// SPDX-FileCopyrightText: 2026 Tokentally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session rollups and cross-session summaries.
//!
//! A [`SessionRollup`] keeps running totals for one session plus per-agent and
//! per-model breakdowns. Every fold updates all three views with the same
//! record, so the session totals always equal the sum of either breakdown.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokentally_core::{UsageTotals, round_usd};

use crate::record::CallRecord;

/// All rollups keyed by session id.
pub type SessionMap = BTreeMap<String, SessionRollup>;

/// Running aggregate for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRollup {
    pub session_id: String,
    /// Time of the first call seen for this session.
    pub start_time: DateTime<Utc>,
    /// Time of the most recent call.
    pub last_update: DateTime<Utc>,
    pub total_calls: u64,
    pub total_tokens: u64,
    /// USD.
    pub total_cost: f64,
    pub by_agent: BTreeMap<String, UsageTotals>,
    pub by_model: BTreeMap<String, UsageTotals>,
}

impl SessionRollup {
    /// An empty rollup that starts at `started_at`.
    pub fn new(session_id: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            session_id: session_id.into(),
            start_time: started_at,
            last_update: started_at,
            total_calls: 0,
            total_tokens: 0,
            total_cost: 0.0,
            by_agent: BTreeMap::new(),
            by_model: BTreeMap::new(),
        }
    }

    /// Fold one record into the totals and both breakdowns.
    pub fn apply(&mut self, record: &CallRecord) {
        self.start_time = self.start_time.min(record.timestamp);
        self.last_update = self.last_update.max(record.timestamp);
        self.total_calls += 1;
        self.total_tokens += record.total_tokens;
        self.total_cost += record.total_cost;

        self.by_agent
            .entry(record.agent_name.clone())
            .or_default()
            .add_call(record.total_tokens, record.total_cost);
        self.by_model
            .entry(record.model.clone())
            .or_default()
            .add_call(record.total_tokens, record.total_cost);
    }
}

/// Fold `record` into its session, creating the rollup on first sight.
pub fn fold_record<'a>(sessions: &'a mut SessionMap, record: &CallRecord) -> &'a SessionRollup {
    let rollup = sessions
        .entry(record.session_id.clone())
        .or_insert_with(|| SessionRollup::new(&record.session_id, record.timestamp));
    rollup.apply(record);
    rollup
}

/// Totals across every session, with agent and model breakdowns merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostSummary {
    pub total_sessions: usize,
    pub total_calls: u64,
    pub total_tokens: u64,
    /// USD, rounded to 6 decimals.
    pub total_cost: f64,
    pub by_agent: BTreeMap<String, UsageTotals>,
    pub by_model: BTreeMap<String, UsageTotals>,
}

impl CostSummary {
    /// Merge the given rollups.
    pub fn from_sessions<'a>(sessions: impl IntoIterator<Item = &'a SessionRollup>) -> Self {
        let mut summary = Self::default();
        let mut total_cost = 0.0;

        for session in sessions {
            summary.total_sessions += 1;
            summary.total_calls += session.total_calls;
            summary.total_tokens += session.total_tokens;
            total_cost += session.total_cost;

            for (agent, totals) in &session.by_agent {
                summary.by_agent.entry(agent.clone()).or_default().merge(totals);
            }
            for (model, totals) in &session.by_model {
                summary.by_model.entry(model.clone()).or_default().merge(totals);
            }
        }

        summary.total_cost = round_usd(total_cost);
        summary
    }
}
