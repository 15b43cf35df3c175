mod common;

use serde_json::json;
use sidekick::finance::{CategoryRules, Ledger};
use sidekick::{SessionBuilder, assistants};
use sidekick_test_model::{PresetResponse, TestModelProvider};

use common::{config, tool_call, tool_contents};

#[tokio::test]
async fn test_finance_assistant_records_expenses() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let provider = TestModelProvider::default()
        .with_response(PresetResponse::with_events([
            tool_call(
                "1",
                "add_transaction",
                json!({
                    "amount": 50,
                    "category": "Food & Dining",
                    "description": "lunch",
                    "transaction_type": "expense"
                }),
            ),
            tool_call(
                "2",
                "add_transaction",
                json!({
                    "amount": 30,
                    "category": "Food & Dining",
                    "description": "snack",
                    "transaction_type": "expense"
                }),
            ),
        ]))
        .with_response(PresetResponse::text("Both expenses are logged."));

    let session = assistants::finance(
        SessionBuilder::with_model_provider(provider.clone()),
        &config,
    )
    .unwrap();
    let answer = session.query("I spent 50 on lunch and 30 on a snack").await.unwrap();
    assert_eq!(answer, "Both expenses are logged.");

    let requests = provider.requests();
    assert_eq!(
        tool_contents(&requests[1].messages),
        [
            "Successfully added expense: $50.00 for Food & Dining - lunch",
            "Successfully added expense: $30.00 for Food & Dining - snack",
        ]
    );

    let ledger = Ledger::open(&config.finance_db(), CategoryRules::default()).unwrap();
    let totals = ledger.totals_by_category(None, None).unwrap();
    assert_eq!(totals.get("Food & Dining"), Some(&80.0));
}

#[tokio::test]
async fn test_research_report_collects_sources_and_findings() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let provider = TestModelProvider::default()
        .with_response(PresetResponse::with_events([
            tool_call("1", "search_web", json!({ "query": "rust async", "num_results": 3 })),
            tool_call(
                "2",
                "save_research_finding",
                json!({ "finding": "Futures are lazy until polled." }),
            ),
        ]))
        .with_response(PresetResponse::text("Async Rust is built on lazy futures."));

    let research = assistants::research(
        SessionBuilder::with_model_provider(provider.clone()),
        &config,
    )
    .unwrap();
    let report = research
        .generate_report("Rust async", 3, Some("rust-report"))
        .await
        .unwrap();

    assert!(report.content.starts_with("# Research Report: Rust async\n"));
    assert!(report.content.contains("**Sources:** 3\n"));
    assert!(report.content.contains("Async Rust is built on lazy futures."));
    assert!(report.content.contains("## Key Findings\n"));
    assert!(report.content.contains("1. Futures are lazy until polled."));

    let path = report.path.unwrap();
    assert_eq!(path, config.reports_dir().join("rust-report.md"));
    assert_eq!(std::fs::read_to_string(path).unwrap(), report.content);

    let search_output = &tool_contents(&provider.requests()[1].messages)[0];
    assert!(search_output.starts_with("Found 3 results:\n\n1. Article 1: rust async\n"));

    research.reset();
    assert!(research.context().sources().is_empty());
    assert!(research.context().findings().is_empty());
}

#[tokio::test]
async fn test_support_assistant_opens_tickets() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let provider = TestModelProvider::default()
        .with_response(PresetResponse::with_events([tool_call(
            "1",
            "create_ticket",
            json!({ "subject": "Cannot log in", "description": "Password reset email never arrives" }),
        )]))
        .with_response(PresetResponse::text("I've opened a ticket for you."));

    let session = assistants::support(
        SessionBuilder::with_model_provider(provider.clone()),
        &config,
    )
    .unwrap();
    session.query("I can't log in").await.unwrap();

    let result = &tool_contents(&provider.requests()[1].messages)[0];
    assert!(result.starts_with("Support ticket TKT-"));
    assert!(result.contains("created successfully with medium priority"));
    let tickets: Vec<_> = std::fs::read_dir(config.tickets_dir()).unwrap().collect();
    assert_eq!(tickets.len(), 1);
}

#[tokio::test]
async fn test_review_assistant_reports_missing_files() {
    let provider = TestModelProvider::default()
        .with_response(PresetResponse::with_events([tool_call(
            "1",
            "detect_issues",
            json!({ "file_path": "does/not/exist.py" }),
        )]))
        .with_response(PresetResponse::text("That file does not exist."));

    let session =
        assistants::review(SessionBuilder::with_model_provider(provider.clone()));
    session.query("Review does/not/exist.py").await.unwrap();

    assert_eq!(
        tool_contents(&provider.requests()[1].messages),
        ["Error: File not found - does/not/exist.py"]
    );
}
