// SPDX-FileCopyrightText: 2026 Tokentally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trace event types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Lifecycle point a trace event marks.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TraceEventType {
    WorkflowStart,
    WorkflowEnd,
    AgentStart,
    AgentEnd,
    /// An agent produced output.
    AgentResponse,
    ToolStart,
    ToolEnd,
    Error,
}

/// One immutable entry in the trace log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    #[serde(rename = "type")]
    pub event_type: TraceEventType,
    pub timestamp: DateTime<Utc>,
    /// Free-form payload; always a JSON object.
    pub data: serde_json::Value,
}

impl TraceEvent {
    pub fn new(event_type: TraceEventType, data: serde_json::Value) -> Self {
        Self {
            event_type,
            timestamp: Utc::now(),
            data,
        }
    }
}

/// Returned by `end_workflow`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowSummary {
    /// `None` if no workflow was ever started (or traces were cleared).
    pub trace_id: Option<String>,
    pub status: String,
    /// Events in the log, including the `workflow_end` just written.
    pub num_events: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn event_type_names() {
        assert_eq!(TraceEventType::WorkflowStart.to_string(), "workflow_start");
        assert_eq!(TraceEventType::AgentResponse.to_string(), "agent_response");
        assert_eq!(
            TraceEventType::from_str("tool_end").unwrap(),
            TraceEventType::ToolEnd
        );
        assert!(TraceEventType::from_str("tool_middle").is_err());
    }

    #[test]
    fn event_serializes_with_type_key() {
        let event = TraceEvent::new(TraceEventType::Error, serde_json::json!({"error": "boom"}));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["data"]["error"], "boom");
        assert!(json["timestamp"].is_string());
    }
}
