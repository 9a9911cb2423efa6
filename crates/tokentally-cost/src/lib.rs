// SPDX-FileCopyrightText: 2026 Tokentally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-call cost tracking for LLM-driven applications.
//!
//! This crate provides:
//! - **Pricing**: Per-model USD rates and cost calculation with a default-model fallback
//! - **Cost ledger**: Append-only CSV log with one row per tracked call
//! - **Rollups**: Per-session totals with agent and model breakdowns
//! - **Snapshot store**: JSON copy of the rollups, re-read on startup
//! - **Analysis**: Offline rebuild of the rollups from the call log

pub mod analysis;
pub mod ledger;
pub mod pricing;
pub mod record;
pub mod rollup;
pub mod store;
pub mod tracker;

pub use ledger::CostLedger;
pub use pricing::{CostBreakdown, ModelPricing, PricingTable};
pub use record::{CallRecord, CallUsage};
pub use rollup::{CostSummary, SessionMap, SessionRollup};
pub use store::SnapshotStore;
pub use tracker::{CostTracker, TrackResult};
