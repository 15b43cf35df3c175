mod common;

use std::time::Duration;

use serde_json::json;
use sidekick::orchestrator::{Orchestrator, Specialist};
use sidekick::{SessionBuilder, assistants};
use sidekick_test_model::{PresetResponse, TestModelProvider};

use common::{config, tool_call, tool_contents};

#[tokio::test]
async fn test_coordinator_delegates_to_specialist() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let coordinator = TestModelProvider::default()
        .with_response(PresetResponse::with_events([tool_call(
            "1",
            "analysis_agent",
            json!({ "task": "Summarize 1, 2, 3" }),
        )]))
        .with_response(PresetResponse::text("The average is 2."));
    let specialists = TestModelProvider::default()
        .with_response(PresetResponse::with_events([tool_call(
            "s1",
            "compute_statistics",
            json!({ "values": [1, 2, 3], "label": "samples" }),
        )]))
        .with_response(PresetResponse::text("Mean is 2.00."));

    let team = assistants::orchestrator(
        SessionBuilder::with_model_provider(coordinator.clone()),
        specialists.clone(),
        &config,
    )
    .unwrap();
    let result = team.execute_task("What is the average of 1, 2 and 3?").await;
    assert_eq!(result, "The average is 2.");

    assert_eq!(
        tool_contents(&coordinator.requests()[1].messages),
        ["Mean is 2.00."]
    );
    let stats = &tool_contents(&specialists.requests()[1].messages)[0];
    assert!(stats.starts_with("Statistics for samples (3 values):"));
    assert!(stats.contains("Mean: 2.00"));
}

#[tokio::test(start_paused = true)]
async fn test_slow_specialist_times_out() {
    let coordinator = TestModelProvider::default()
        .with_response(PresetResponse::with_events([tool_call(
            "1",
            "research_agent",
            json!({ "task": "Find everything" }),
        )]))
        .with_response(PresetResponse::text("Research took too long."));
    let mut slow = TestModelProvider::default()
        .with_response(PresetResponse::text("too late"));
    slow.set_delay(Duration::from_secs(60));

    let team = Orchestrator::build_with_timeout(
        SessionBuilder::with_model_provider(coordinator.clone()),
        |_| SessionBuilder::with_model_provider(slow.clone()),
        Duration::from_secs(5),
    );
    let result = team.execute_task("Research everything").await;
    assert_eq!(result, "Research took too long.");
    assert_eq!(
        tool_contents(&coordinator.requests()[1].messages),
        ["Error: Research Agent did not finish within 5 seconds"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_timeouts_are_not_cancelled_by_each_other() {
    let coordinator = TestModelProvider::default()
        .with_response(PresetResponse::with_events([
            tool_call("1", "research_agent", json!({ "task": "Find prices" })),
            tool_call("2", "research_agent", json!({ "task": "Find reviews" })),
        ]))
        .with_response(PresetResponse::text("Research is unavailable."));
    let mut slow = TestModelProvider::default()
        .with_response(PresetResponse::text("too late"));
    slow.set_delay(Duration::from_secs(60));

    let team = Orchestrator::build_with_timeout(
        SessionBuilder::with_model_provider(coordinator.clone()),
        |_| SessionBuilder::with_model_provider(slow.clone()),
        Duration::from_secs(5),
    );
    let result = team.execute_task("Compare laptops").await;
    assert_eq!(result, "Research is unavailable.");
    assert_eq!(
        tool_contents(&coordinator.requests()[1].messages),
        [
            "Error: Research Agent did not finish within 5 seconds",
            "Error: Research Agent did not finish within 5 seconds",
        ]
    );
}

#[tokio::test]
async fn test_specialist_failures_are_reported_to_coordinator() {
    let coordinator = TestModelProvider::default()
        .with_response(PresetResponse::with_events([tool_call(
            "1",
            "code_agent",
            json!({ "task": "Review main.rs" }),
        )]))
        .with_response(PresetResponse::text("The code agent is unavailable."));
    // No scripted responses: every specialist call fails.
    let broken = TestModelProvider::default();

    let team = Orchestrator::build(
        SessionBuilder::with_model_provider(coordinator.clone()),
        |_| SessionBuilder::with_model_provider(broken.clone()),
    );
    team.execute_task("Review main.rs").await;

    let result = &tool_contents(&coordinator.requests()[1].messages)[0];
    assert!(result.starts_with("Error: Code Agent failed: "));
    assert!(team.specialist(Specialist::Code).is_some());
}

#[tokio::test]
async fn test_coordinator_failure_becomes_error_text() {
    let team = Orchestrator::build(
        SessionBuilder::with_model_provider(TestModelProvider::default()),
        |_| SessionBuilder::with_model_provider(TestModelProvider::default()),
    );
    let result = team.execute_task("Anything").await;
    assert!(result.starts_with("Error executing task: "));
}

#[tokio::test]
async fn test_empty_answer_is_replaced() {
    let team = Orchestrator::build(
        SessionBuilder::with_model_provider(
            TestModelProvider::default().with_response(PresetResponse::text("  ")),
        ),
        |_| SessionBuilder::with_model_provider(TestModelProvider::default()),
    );
    assert_eq!(team.execute_task("Anything").await, "No response received.");
}
