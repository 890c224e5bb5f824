#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
use super::*;

use crate::agent::model::testing::ScriptedModel;
use crate::agent::model::{ModelTurn, ToolCall};
use crate::agent::tools::ToolDispatcher;
use crate::exec::testing::ScriptedRunner;

fn tool_turn(text: Option<&str>, calls: &[(&str, serde_json::Value)]) -> ModelTurn {
    ModelTurn {
        text: text.map(str::to_string),
        tool_calls: calls
            .iter()
            .enumerate()
            .map(|(i, (name, input))| ToolCall {
                id: format!("call-{}", i),
                name: name.to_string(),
                input: input.clone(),
            })
            .collect(),
        usage: crate::agent::model::TokenUsage {
            input_tokens: 100,
            output_tokens: 10,
            ..Default::default()
        },
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    model: ScriptedModel,
    tools: ToolDispatcher<ScriptedRunner>,
    telemetry: TelemetryLog,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        Self {
            tools: ToolDispatcher::new(
                ScriptedRunner::new(),
                dir.path(),
                Some("echo build".to_string()),
            ),
            _dir: dir,
            model: ScriptedModel::new(),
            telemetry: TelemetryLog::new(),
        }
    }

    fn executor(&self, max_events: u32) -> AgentExecutor<'_, ScriptedModel, ScriptedRunner> {
        AgentExecutor::new(&self.model, &self.tools, &self.telemetry, max_events)
    }
}

#[tokio::test]
async fn test_text_only_turn_completes_the_run() {
    let fixture = Fixture::new();
    fixture.model.push_text("All fixed. <pr_body>done</pr_body>");

    let run = fixture
        .executor(10)
        .run(AgentType::Fix, "system", "user", None)
        .await
        .unwrap();

    assert_eq!(run.final_text, "All fixed. <pr_body>done</pr_body>");
    assert_eq!(run.stats.call_count(), 1);

    let snapshot = fixture.telemetry.snapshot();
    let events = snapshot["resultInfo"]["agentEvents"].as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["agentType"], "FIX");
    assert_eq!(events[0]["result"], "SUCCESS");
}

#[tokio::test]
async fn test_tool_calls_are_dispatched_and_fed_back() {
    let fixture = Fixture::new();
    fixture.model.push(tool_turn(
        Some("let me check the build"),
        &[("run_build", serde_json::json!({}))],
    ));
    fixture.model.push_text("build is fine, done");
    fixture.tools.runner.push_ok("ok\n");

    let run = fixture
        .executor(20)
        .run(AgentType::Fix, "system", "user", None)
        .await
        .unwrap();

    assert_eq!(run.final_text, "build is fine, done");
    // Second request carries user + assistant + tool result.
    assert_eq!(fixture.model.request_lengths(), vec![1, 3]);

    let snapshot = fixture.telemetry.snapshot();
    let actions = snapshot["resultInfo"]["agentEvents"][0]["actions"]
        .as_array()
        .unwrap();
    let tool_records: Vec<&serde_json::Value> = actions
        .iter()
        .flat_map(|a| a["toolCalls"].as_array().unwrap())
        .collect();
    assert_eq!(tool_records.len(), 1);
    assert_eq!(tool_records[0]["tool"], "run_build");
    assert_eq!(tool_records[0]["result"], "SUCCESS");
}

#[tokio::test]
async fn test_failing_tool_is_reported_not_fatal() {
    let fixture = Fixture::new();
    fixture.model.push(tool_turn(
        None,
        &[("read_file", serde_json::json!({"path": "missing.rs"}))],
    ));
    fixture.model.push_text("could not read, stopping");

    let run = fixture
        .executor(20)
        .run(AgentType::Qa, "system", "user", None)
        .await
        .unwrap();
    assert_eq!(run.final_text, "could not read, stopping");

    let snapshot = fixture.telemetry.snapshot();
    let actions = snapshot["resultInfo"]["agentEvents"][0]["actions"]
        .as_array()
        .unwrap();
    let tool_records: Vec<&serde_json::Value> = actions
        .iter()
        .flat_map(|a| a["toolCalls"].as_array().unwrap())
        .collect();
    assert_eq!(tool_records[0]["result"], "FAILURE");
}

#[tokio::test]
async fn test_event_limit_aborts_the_run() {
    let fixture = Fixture::new();
    // Each turn costs 3 events (text + call + response); cap at 4 stops in
    // the second turn.
    for _ in 0..3 {
        fixture.model.push(tool_turn(
            Some("looking"),
            &[("list_dir", serde_json::json!({"path": ""}))],
        ));
    }

    let err = fixture
        .executor(4)
        .run(AgentType::Fix, "system", "user", None)
        .await
        .unwrap_err();
    assert!(matches!(err, AgentError::EventLimit { limit: 4 }));

    let snapshot = fixture.telemetry.snapshot();
    assert_eq!(
        snapshot["resultInfo"]["agentEvents"][0]["result"],
        "EXCEEDED_EVENTS"
    );
}

#[tokio::test]
async fn test_model_error_still_records_the_agent_event() {
    let fixture = Fixture::new();
    // Scripted model with no turns queued errors immediately.

    let err = fixture
        .executor(10)
        .run(AgentType::Fix, "system", "user", None)
        .await
        .unwrap_err();
    assert!(matches!(err, AgentError::InvalidResponse(_)));

    let snapshot = fixture.telemetry.snapshot();
    assert_eq!(snapshot["resultInfo"]["agentEvents"][0]["result"], "ERROR");
}

#[tokio::test]
async fn test_session_id_is_forwarded_to_the_model() {
    // ScriptedModel does not observe headers; this guards the plumbing shape
    // instead: a run with a session id must still complete.
    let fixture = Fixture::new();
    fixture.model.push_text("done");
    let run = fixture
        .executor(10)
        .run(AgentType::Fix, "system", "user", Some("sess-1"))
        .await
        .unwrap();
    assert_eq!(run.final_text, "done");
}
