// SPDX-FileCopyrightText: 2026 Tokentally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory trace log of workflow, agent and tool lifecycle events.
//!
//! Events live for the lifetime of the process and are never persisted.

pub mod event;
pub mod logger;

pub use event::{TraceEvent, TraceEventType, WorkflowSummary};
pub use logger::TraceLogger;
