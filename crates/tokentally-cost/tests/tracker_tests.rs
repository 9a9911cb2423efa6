// SPDX-FileCopyrightText: 2026 Tokentally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end behaviour of the cost tracker against real files.

use std::sync::Arc;
use std::time::Duration;

use tokentally_config::TokentallyConfig;
use tokentally_core::TokentallyError;
use tokentally_cost::analysis::{analyze_by_session, load_cost_log, summarize};
use tokentally_cost::{CallUsage, CostTracker, ModelPricing, PricingTable};

fn call(session: &str, agent: &str, model: &str, input: u64, output: u64) -> CallUsage {
    CallUsage::new(session, agent, model, "openai")
        .with_tokens(input, output)
        .with_latency(Duration::from_millis(250))
}

#[tokio::test]
async fn three_calls_in_one_session() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = CostTracker::open(dir.path()).await.unwrap();

    tracker.track_call(call("s1", "Planner", "gpt-4o-mini", 1000, 500)).await.unwrap();
    tracker.track_call(call("s1", "Recon", "gpt-4o-mini", 2000, 1000)).await.unwrap();
    let last = tracker.track_call(call("s1", "Planner", "gpt-4o", 500, 500)).await.unwrap();

    let s1 = tracker.get_session("s1").await.unwrap();
    assert_eq!(s1.total_calls, 3);
    assert_eq!(s1.total_tokens, 5500);
    assert!((s1.total_cost - 0.01135).abs() < 1e-9);
    assert_eq!(s1.by_agent["Planner"].calls, 2);
    assert_eq!(s1.by_model["gpt-4o"].tokens, 1000);
    assert_eq!(last.session_total_cost, s1.total_cost);
    assert!(s1.start_time <= s1.last_update);

    let log = std::fs::read_to_string(tracker.log_path()).unwrap();
    assert_eq!(log.lines().count(), 4);
    assert!((tracker.get_total_cost().await - 0.01135).abs() < 1e-9);
}

#[tokio::test]
async fn state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let before = {
        let tracker = CostTracker::open(dir.path()).await.unwrap();
        tracker.track_call(call("s1", "Planner", "gpt-4o-mini", 1000, 500)).await.unwrap();
        tracker.track_call(call("s2", "Writer", "claude-3-5-sonnet-20241022", 1234, 567)).await.unwrap();
        tracker.get_all_sessions().await
    };

    let reopened = CostTracker::open(dir.path()).await.unwrap();
    assert_eq!(reopened.get_all_sessions().await, before);

    reopened.track_call(call("s1", "Planner", "gpt-4o-mini", 1000, 500)).await.unwrap();
    let s1 = reopened.get_session("s1").await.unwrap();
    assert_eq!(s1.total_calls, 2);
    assert_eq!(s1.start_time, before["s1"].start_time);

    // Header is not repeated on reopen.
    let log = std::fs::read_to_string(reopened.log_path()).unwrap();
    assert_eq!(log.matches("timestamp,").count(), 1);
    assert_eq!(log.lines().count(), 4);
}

#[tokio::test]
async fn corrupt_snapshot_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("session_costs.json"), "not json at all").unwrap();

    let tracker = CostTracker::open(dir.path()).await.unwrap();
    assert!(tracker.get_all_sessions().await.is_empty());

    let result = tracker.track_call(call("s1", "Planner", "gpt-4o-mini", 10, 10)).await.unwrap();
    assert!(result.is_persisted());
    let raw = std::fs::read_to_string(tracker.snapshot_path()).unwrap();
    assert!(raw.contains("\"s1\""));
}

#[tokio::test]
async fn rollups_rebuild_from_call_log() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = CostTracker::open(dir.path()).await.unwrap();

    let models = ["gpt-4o-mini", "gpt-4o", "claude-3-haiku-20240307", "unlisted-model"];
    for i in 0..30u64 {
        let session = format!("s{}", i % 3);
        let agent = ["Planner", "Recon", "Writer"][(i % 4) as usize % 3];
        let model = models[(i % 4) as usize];
        tracker
            .track_call(
                call(&session, agent, model, 137 * i + 11, 59 * i)
                    .with_latency(Duration::from_micros(1_000 * i + 333)),
            )
            .await
            .unwrap();
    }

    let records = load_cost_log(tracker.log_path()).unwrap();
    assert_eq!(records.len(), 30);
    assert_eq!(analyze_by_session(&records), tracker.get_all_sessions().await);
    assert_eq!(summarize(&records), tracker.generate_summary().await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_calls_are_all_counted() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = Arc::new(CostTracker::open(dir.path()).await.unwrap());

    let mut handles = Vec::new();
    for i in 0..64u64 {
        let tracker = Arc::clone(&tracker);
        handles.push(tokio::spawn(async move {
            let session = if i % 2 == 0 { "even" } else { "odd" };
            tracker
                .track_call(call(session, "Worker", "gpt-4o-mini", 100, 50))
                .await
                .unwrap()
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_persisted());
    }

    let sessions = tracker.get_all_sessions().await;
    assert_eq!(sessions["even"].total_calls, 32);
    assert_eq!(sessions["odd"].total_calls, 32);
    assert_eq!(sessions["even"].total_tokens, 32 * 150);

    // Every row is intact and the snapshot reflects the final state.
    let records = load_cost_log(tracker.log_path()).unwrap();
    assert_eq!(records.len(), 64);
    let reopened = CostTracker::open(dir.path()).await.unwrap();
    assert_eq!(reopened.get_all_sessions().await, sessions);
}

#[tokio::test]
async fn zero_token_call_is_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = CostTracker::open(dir.path()).await.unwrap();

    let result = tracker.track_call(call("s0", "Idle", "gpt-4", 0, 0)).await.unwrap();
    assert_eq!(result.record.total_cost, 0.0);

    let s0 = tracker.get_session("s0").await.unwrap();
    assert_eq!(s0.total_calls, 1);
    assert_eq!(s0.total_tokens, 0);
    assert_eq!(s0.by_model["gpt-4"].calls, 1);
}

#[tokio::test]
async fn whitespace_model_is_rejected_without_side_effects() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = CostTracker::open(dir.path()).await.unwrap();

    let err = tracker.track_call(call("s1", "Planner", "   ", 5, 5)).await.unwrap_err();
    assert!(matches!(err, TokentallyError::InvalidInput { .. }));
    assert!(tracker.get_all_sessions().await.is_empty());
    assert!(load_cost_log(tracker.log_path()).unwrap().is_empty());
    assert!(!tracker.snapshot_path().exists());
}

#[tokio::test]
async fn unknown_model_uses_default_tier() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = CostTracker::open(dir.path()).await.unwrap();
    let known = tracker.track_call(call("s", "a", "gpt-4o-mini", 4000, 2000)).await.unwrap();
    let unknown = tracker.track_call(call("s", "a", "totally-new", 4000, 2000)).await.unwrap();
    assert_eq!(known.record.total_cost, unknown.record.total_cost);
    assert_eq!(unknown.record.model, "totally-new");
}

#[tokio::test]
async fn custom_pricing_table() {
    let dir = tempfile::tempdir().unwrap();
    let mut pricing = PricingTable::builtin();
    pricing.insert("house-model", ModelPricing::new(1.0, 2.0));
    let tracker = CostTracker::open_with_pricing(dir.path(), pricing).await.unwrap();

    let result = tracker.track_call(call("s", "a", "house-model", 1_000_000, 500_000)).await.unwrap();
    assert_eq!(result.record.input_cost, 1.0);
    assert_eq!(result.record.output_cost, 1.0);
    assert_eq!(result.record.total_cost, 2.0);
}

#[tokio::test]
async fn tracker_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = TokentallyConfig::default();
    config.metrics.log_dir = dir.path().join("metrics").display().to_string();
    config.pricing.default_model = "gpt-4o".to_string();

    let tracker = CostTracker::from_config(&config).await.unwrap();
    assert_eq!(tracker.pricing().default_model(), "gpt-4o");
    assert!(tracker.log_path().starts_with(dir.path().join("metrics")));

    config.pricing.default_model = "no-such-model".to_string();
    let err = CostTracker::from_config(&config).await.unwrap_err();
    assert!(matches!(err, TokentallyError::Config(_)));
}
