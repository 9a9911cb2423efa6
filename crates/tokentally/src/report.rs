// SPDX-FileCopyrightText: 2026 Tokentally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Text rendering for the report commands.
//!
//! Every renderer returns a `String` so output can be checked without a TTY.
//! Colors are applied only when `color` is set.

use std::collections::BTreeMap;
use std::fmt::Write;

use colored::Colorize;
use serde::Serialize;
use tokentally_core::UsageTotals;
use tokentally_cost::ledger::format_timestamp;
use tokentally_cost::{CallRecord, CostSummary, SessionMap, SessionRollup};

const RULE_WIDTH: usize = 60;

/// One line of `tokentally sessions --json`.
#[derive(Debug, Serialize)]
pub struct SessionListEntry<'a> {
    pub session_id: &'a str,
    pub total_calls: u64,
    pub total_cost: f64,
}

pub fn session_list(sessions: &SessionMap) -> Vec<SessionListEntry<'_>> {
    sessions
        .values()
        .map(|s| SessionListEntry {
            session_id: &s.session_id,
            total_calls: s.total_calls,
            total_cost: s.total_cost,
        })
        .collect()
}

/// `1234567` -> `1,234,567`.
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn usd(cost: f64, decimals: usize) -> String {
    format!("${cost:.decimals$}")
}

fn heading(out: &mut String, title: &str, color: bool) {
    let rule = "=".repeat(RULE_WIDTH);
    let _ = writeln!(out);
    let _ = writeln!(out, "{rule}");
    if color {
        let _ = writeln!(out, "{}", title.bold());
    } else {
        let _ = writeln!(out, "{title}");
    }
    let _ = writeln!(out, "{rule}");
}

fn section(out: &mut String, title: &str, color: bool) {
    let _ = writeln!(out);
    if color {
        let _ = writeln!(out, "{}", title.cyan());
    } else {
        let _ = writeln!(out, "{title}");
    }
}

/// Breakdown rows, most expensive first.
fn breakdown(out: &mut String, totals: &BTreeMap<String, UsageTotals>, width: usize) {
    let mut rows: Vec<_> = totals.iter().collect();
    rows.sort_by(|a, b| b.1.cost.total_cmp(&a.1.cost));
    for (name, t) in rows {
        let _ = writeln!(
            out,
            "  {name:width$} | Calls: {:>3} | Tokens: {:>9} | Cost: {}",
            t.calls,
            group_thousands(t.tokens),
            usd(t.cost, 4)
        );
    }
}

/// Cross-session summary.
pub fn render_summary(summary: &CostSummary, color: bool) -> String {
    let mut out = String::new();
    if summary.total_calls == 0 {
        let _ = writeln!(out, "No cost data available.");
        return out;
    }

    heading(&mut out, "COST TRACKING SUMMARY", color);
    section(&mut out, "Overall Statistics:", color);
    let _ = writeln!(out, "  Total Sessions:  {}", summary.total_sessions);
    let _ = writeln!(out, "  Total LLM Calls: {}", group_thousands(summary.total_calls));
    let _ = writeln!(out, "  Total Tokens:    {}", group_thousands(summary.total_tokens));
    let cost = usd(summary.total_cost, 4);
    if color {
        let _ = writeln!(out, "  Total Cost:      {}", cost.green());
    } else {
        let _ = writeln!(out, "  Total Cost:      {cost}");
    }

    section(&mut out, "By Agent:", color);
    breakdown(&mut out, &summary.by_agent, 20);
    section(&mut out, "By Model:", color);
    breakdown(&mut out, &summary.by_model, 30);
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", "=".repeat(RULE_WIDTH));
    out
}

/// One session's statistics, agent breakdown and call history.
pub fn render_session(rollup: &SessionRollup, calls: &[&CallRecord], color: bool) -> String {
    let mut out = String::new();
    heading(&mut out, &format!("SESSION DETAIL: {}", rollup.session_id), color);

    section(&mut out, "Session Statistics:", color);
    let _ = writeln!(out, "  Total LLM Calls: {}", group_thousands(rollup.total_calls));
    let _ = writeln!(out, "  Total Tokens:    {}", group_thousands(rollup.total_tokens));
    let _ = writeln!(out, "  Total Cost:      {}", usd(rollup.total_cost, 4));
    let _ = writeln!(out, "  Started:         {}", format_timestamp(&rollup.start_time));
    let _ = writeln!(out, "  Last Update:     {}", format_timestamp(&rollup.last_update));

    section(&mut out, "By Agent:", color);
    breakdown(&mut out, &rollup.by_agent, 20);

    section(&mut out, "Call History:", color);
    for (i, call) in calls.iter().enumerate() {
        let _ = writeln!(
            out,
            "  [{:>2}] {} | {:15} | {:25} | Tokens: {:>4}+{:>4} | Cost: {}",
            i + 1,
            call.timestamp.format("%Y-%m-%dT%H:%M:%S"),
            call.agent_name,
            call.model,
            call.input_tokens,
            call.output_tokens,
            usd(call.total_cost, 6)
        );
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", "=".repeat(RULE_WIDTH));
    out
}

/// Session ids with call counts and cost.
pub fn render_session_list(sessions: &SessionMap, color: bool) -> String {
    let mut out = String::new();
    if sessions.is_empty() {
        let _ = writeln!(out, "No sessions recorded.");
        return out;
    }
    section(&mut out, "Available Sessions:", color);
    for s in sessions.values() {
        let id = if color {
            s.session_id.bold().to_string()
        } else {
            s.session_id.clone()
        };
        let _ = writeln!(
            out,
            "  {id} ({} calls, {})",
            s.total_calls,
            usd(s.total_cost, 4)
        );
    }
    out
}
