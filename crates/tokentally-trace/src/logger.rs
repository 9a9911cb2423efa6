// SPDX-FileCopyrightText: 2026 Tokentally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The trace logger.
//!
//! Keeps one active workflow at a time. Calling [`TraceLogger::start_workflow`]
//! again before [`TraceLogger::end_workflow`] replaces the active trace id;
//! events already logged stay in the sequence.

use std::sync::{Mutex, MutexGuard};

use serde_json::{Map, Value, json};
use tokentally_core::TokentallyError;
use tracing::debug;
use uuid::Uuid;

use crate::event::{TraceEvent, TraceEventType, WorkflowSummary};

/// Maximum characters of an agent response kept in a trace.
pub const RESPONSE_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Default)]
struct TraceState {
    events: Vec<TraceEvent>,
    current_trace_id: Option<String>,
    current_workflow: Option<String>,
}

/// Process-lifetime log of workflow, agent and tool events.
#[derive(Debug, Default)]
pub struct TraceLogger {
    state: Mutex<TraceState>,
}

impl TraceLogger {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, TraceState>, TokentallyError> {
        self.state
            .lock()
            .map_err(|e| TokentallyError::Internal(format!("trace log lock poisoned: {e}")))
    }

    /// Append an event of `event_type` with `data` as its payload.
    pub fn log_event(&self, event_type: TraceEventType, data: Value) -> Result<(), TokentallyError> {
        let mut state = self.state()?;
        push(&mut state, event_type, data);
        Ok(())
    }

    /// Begin a workflow and return its new trace id.
    pub fn start_workflow(
        &self,
        workflow_name: &str,
        user_input: &str,
    ) -> Result<String, TokentallyError> {
        let trace_id = Uuid::new_v4().to_string();
        let mut state = self.state()?;
        state.current_trace_id = Some(trace_id.clone());
        state.current_workflow = Some(workflow_name.to_string());
        push(
            &mut state,
            TraceEventType::WorkflowStart,
            json!({
                "trace_id": trace_id,
                "workflow_name": workflow_name,
                "user_input": user_input,
            }),
        );
        Ok(trace_id)
    }

    /// Close the active workflow.
    ///
    /// The workflow name is cleared; the trace id remains until the next
    /// start or clear.
    pub fn end_workflow(
        &self,
        status: &str,
        error: Option<&str>,
    ) -> Result<WorkflowSummary, TokentallyError> {
        let mut state = self.state()?;
        let mut data = Map::new();
        data.insert("trace_id".into(), json!(state.current_trace_id));
        data.insert("workflow_name".into(), json!(state.current_workflow));
        data.insert("status".into(), json!(status));
        if let Some(error) = error.filter(|e| !e.is_empty()) {
            data.insert("error".into(), json!(error));
        }
        push(&mut state, TraceEventType::WorkflowEnd, Value::Object(data));

        state.current_workflow = None;
        Ok(WorkflowSummary {
            trace_id: state.current_trace_id.clone(),
            status: status.to_string(),
            num_events: state.events.len(),
        })
    }

    /// Record an agent's output, keeping only the first 200 characters.
    pub fn log_agent_response(
        &self,
        agent_name: &str,
        response: &str,
        metadata: Option<Value>,
    ) -> Result<(), TokentallyError> {
        let preview: String = response.chars().take(RESPONSE_PREVIEW_CHARS).collect();
        self.log_event(
            TraceEventType::AgentResponse,
            json!({
                "agent_name": agent_name,
                "response": preview,
                "metadata": metadata.unwrap_or_else(|| json!({})),
            }),
        )
    }

    pub fn log_agent_activity(&self, agent_name: &str, activity: &str) -> Result<(), TokentallyError> {
        self.log_event(
            TraceEventType::AgentStart,
            json!({ "agent_name": agent_name, "activity": activity }),
        )
    }

    pub fn log_agent_completion(&self, agent_name: &str, outcome: &str) -> Result<(), TokentallyError> {
        self.log_event(
            TraceEventType::AgentEnd,
            json!({ "agent_name": agent_name, "outcome": outcome }),
        )
    }

    pub fn log_tool_execution(&self, tool_name: &str, args: Value) -> Result<(), TokentallyError> {
        self.log_event(
            TraceEventType::ToolStart,
            json!({ "tool_name": tool_name, "args": args }),
        )
    }

    pub fn log_tool_result(
        &self,
        tool_name: &str,
        success: bool,
        result: Value,
    ) -> Result<(), TokentallyError> {
        self.log_event(
            TraceEventType::ToolEnd,
            json!({ "tool_name": tool_name, "success": success, "result": result }),
        )
    }

    /// Record an error message with optional context.
    pub fn log_error(&self, message: &str, context: Option<Value>) -> Result<(), TokentallyError> {
        self.log_event(TraceEventType::Error, error_payload(message, context))
    }

    /// Record an error along with the failing value's type and message.
    pub fn log_error_with<E: std::error::Error>(
        &self,
        message: &str,
        error: &E,
        context: Option<Value>,
    ) -> Result<(), TokentallyError> {
        let mut data = error_payload(message, context);
        if let Value::Object(map) = &mut data {
            map.insert("exception_type".into(), json!(short_type_name::<E>()));
            map.insert("exception".into(), json!(error.to_string()));
        }
        self.log_event(TraceEventType::Error, data)
    }

    /// A copy of every event logged so far, in order.
    pub fn get_traces(&self) -> Result<Vec<TraceEvent>, TokentallyError> {
        Ok(self.state()?.events.clone())
    }

    pub fn current_trace_id(&self) -> Result<Option<String>, TokentallyError> {
        Ok(self.state()?.current_trace_id.clone())
    }

    pub fn current_workflow(&self) -> Result<Option<String>, TokentallyError> {
        Ok(self.state()?.current_workflow.clone())
    }

    /// Drop every event and forget the active workflow.
    pub fn clear_traces(&self) -> Result<(), TokentallyError> {
        let mut state = self.state()?;
        *state = TraceState::default();
        Ok(())
    }
}

fn push(state: &mut TraceState, event_type: TraceEventType, data: Value) {
    state.events.push(TraceEvent::new(event_type, data));
    debug!(
        event_type = %event_type,
        trace_id = state.current_trace_id.as_deref().unwrap_or("-"),
        "trace event"
    );
}

fn error_payload(message: &str, context: Option<Value>) -> Value {
    json!({
        "error": message,
        "context": context.unwrap_or_else(|| json!({})),
    })
}

/// `std::io::Error` -> `Error`.
fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    fn workflow_round_trip() {
        let tracer = TraceLogger::new();
        let trace_id = tracer.start_workflow("research", "find cheap flights").unwrap();
        tracer.log_agent_activity("Planner", "planning").unwrap();
        tracer.log_agent_completion("Planner", "done").unwrap();

        let summary = tracer.end_workflow("completed", None).unwrap();
        assert_eq!(summary.trace_id.as_deref(), Some(trace_id.as_str()));
        assert_eq!(summary.status, "completed");
        assert_eq!(summary.num_events, 4);

        let events = tracer.get_traces().unwrap();
        assert_eq!(events[0].event_type, TraceEventType::WorkflowStart);
        assert_eq!(events[0].data["user_input"], "find cheap flights");
        assert_eq!(events[3].event_type, TraceEventType::WorkflowEnd);
        assert_eq!(events[3].data["workflow_name"], "research");
        assert!(events[3].data.get("error").is_none());
    }

    #[test]
    fn end_clears_name_but_keeps_trace_id() {
        let tracer = TraceLogger::new();
        let trace_id = tracer.start_workflow("w", "").unwrap();
        tracer.end_workflow("failed", Some("upstream timeout")).unwrap();

        assert_eq!(tracer.current_workflow().unwrap(), None);
        assert_eq!(tracer.current_trace_id().unwrap(), Some(trace_id));
        let events = tracer.get_traces().unwrap();
        assert_eq!(events[1].data["error"], "upstream timeout");
        assert_eq!(events[1].data["status"], "failed");
    }

    #[test]
    fn second_start_replaces_active_trace() {
        let tracer = TraceLogger::new();
        let first = tracer.start_workflow("one", "a").unwrap();
        let second = tracer.start_workflow("two", "b").unwrap();
        assert_ne!(first, second);

        let summary = tracer.end_workflow("completed", None).unwrap();
        assert_eq!(summary.trace_id, Some(second));
        assert_eq!(summary.num_events, 3);
        assert_eq!(tracer.get_traces().unwrap()[0].data["trace_id"], first);
    }

    #[test]
    fn end_without_start() {
        let tracer = TraceLogger::new();
        let summary = tracer.end_workflow("completed", None).unwrap();
        assert_eq!(summary.trace_id, None);
        assert_eq!(summary.num_events, 1);
        assert!(tracer.get_traces().unwrap()[0].data["trace_id"].is_null());
    }

    #[test]
    fn long_response_truncated_to_200_chars() {
        let tracer = TraceLogger::new();
        let response = "é".repeat(250);
        tracer.log_agent_response("Writer", &response, None).unwrap();
        tracer.log_agent_response("Writer", "short", Some(json!({"model": "gpt-4o"}))).unwrap();

        let events = tracer.get_traces().unwrap();
        let kept = events[0].data["response"].as_str().unwrap();
        assert_eq!(kept.chars().count(), 200);
        assert_eq!(events[0].data["metadata"], json!({}));
        assert_eq!(events[1].data["response"], "short");
        assert_eq!(events[1].data["metadata"]["model"], "gpt-4o");
    }

    #[test]
    fn tool_events() {
        let tracer = TraceLogger::new();
        tracer.log_tool_execution("search", json!({"q": "rust"})).unwrap();
        tracer.log_tool_result("search", true, json!(["a", "b"])).unwrap();

        let events = tracer.get_traces().unwrap();
        assert_eq!(events[0].event_type, TraceEventType::ToolStart);
        assert_eq!(events[0].data["args"]["q"], "rust");
        assert_eq!(events[1].event_type, TraceEventType::ToolEnd);
        assert_eq!(events[1].data["success"], true);
    }

    #[test]
    fn error_events() {
        let tracer = TraceLogger::new();
        tracer.log_error("plain failure", None).unwrap();
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "too slow");
        tracer
            .log_error_with("tool failed", &io, Some(json!({"tool": "search"})))
            .unwrap();

        let events = tracer.get_traces().unwrap();
        assert!(events[0].data.get("exception_type").is_none());
        assert_eq!(events[1].data["exception_type"], "Error");
        assert_eq!(events[1].data["exception"], "too slow");
        assert_eq!(events[1].data["context"]["tool"], "search");
    }

    #[test]
    fn clear_resets_everything() {
        let tracer = TraceLogger::new();
        tracer.start_workflow("w", "x").unwrap();
        tracer.clear_traces().unwrap();
        assert!(tracer.get_traces().unwrap().is_empty());
        assert_eq!(tracer.current_trace_id().unwrap(), None);
        assert_eq!(tracer.current_workflow().unwrap(), None);
    }

    #[test]
    fn timestamps_are_ordered() {
        let tracer = TraceLogger::new();
        for i in 0..10 {
            tracer.log_event(TraceEventType::AgentStart, json!({ "i": i })).unwrap();
        }
        let events = tracer.get_traces().unwrap();
        assert!(events.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    #[traced_test]
    fn events_are_logged_at_debug() {
        let tracer = TraceLogger::new();
        tracer.start_workflow("w", "x").unwrap();
        assert!(logs_contain("workflow_start"));
    }

    #[test]
    fn type_name_is_shortened() {
        assert_eq!(short_type_name::<std::io::Error>(), "Error");
        assert_eq!(short_type_name::<TokentallyError>(), "TokentallyError");
    }
}
