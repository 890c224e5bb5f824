#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
use super::*;

use crate::agent::model::testing::ScriptedModel;
use crate::agent::tools::ToolDispatcher;
use crate::exec::testing::ScriptedRunner;

fn details() -> PromptDetails {
    serde_json::from_value(serde_json::json!({
        "remediationId": "rem-1",
        "vulnerabilityUuid": "uuid-1",
        "vulnerabilityTitle": "SQL Injection",
        "vulnerabilityRuleName": "sql-injection",
        "vulnerabilityStatus": "REPORTED",
        "vulnerabilitySeverity": "CRITICAL",
        "fixSystemPrompt": "fix system",
        "fixUserPrompt": "fix user",
        "qaSystemPrompt": "qa system",
        "qaUserPrompt": "qa user"
    }))
    .unwrap()
}

fn settings() -> SessionSettings {
    SessionSettings {
        max_qa_attempts: 3,
        max_events_per_agent: 50,
        skip_qa_review: false,
        formatting_command: None,
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    model: ScriptedModel,
    tools: ToolDispatcher<ScriptedRunner>,
    telemetry: TelemetryLog,
    settings: SessionSettings,
}

impl Fixture {
    fn new(build_command: Option<&str>, settings: SessionSettings) -> Self {
        let dir = tempfile::tempdir().unwrap();
        Self {
            tools: ToolDispatcher::new(
                ScriptedRunner::new(),
                dir.path(),
                build_command.map(str::to_string),
            ),
            _dir: dir,
            model: ScriptedModel::new(),
            telemetry: TelemetryLog::new(),
            settings,
        }
    }

    fn runner(&self) -> SessionRunner<'_, ScriptedModel, ScriptedRunner> {
        SessionRunner::new(
            &self.model,
            &self.tools,
            &self.telemetry,
            self.settings.clone(),
        )
    }
}

#[test]
fn test_extract_pr_body_prefers_tagged_content() {
    let summary = "chatter\n<pr_body>\n## Fix\nEscaped the input.\n</pr_body>\nmore";
    assert_eq!(extract_pr_body(summary), "## Fix\nEscaped the input.");
}

#[test]
fn test_extract_pr_body_falls_back_to_full_text() {
    assert_eq!(extract_pr_body("  plain summary  "), "plain summary");
}

#[tokio::test]
async fn test_successful_fix_and_first_build_pass() {
    let fixture = Fixture::new(Some("make all"), settings());
    fixture.tools.runner.push_ok("initial ok"); // initial build
    fixture
        .model
        .push_text("<pr_body>Fixed the injection.</pr_body>");
    fixture.tools.runner.push_ok("qa build ok"); // QA attempt 1

    let session = fixture.runner().run(&details()).await;

    assert_eq!(session.outcome, SessionOutcome::Success);
    assert_eq!(session.fix_summary, "Fixed the injection.");
    assert_eq!(session.qa_attempts, 1);
}

#[tokio::test]
async fn test_initial_build_failure_short_circuits() {
    let fixture = Fixture::new(Some("make all"), settings());
    fixture.tools.runner.push_err(2, "compile error");

    let session = fixture.runner().run(&details()).await;

    assert_eq!(
        session.outcome,
        SessionOutcome::Failed(FailureCategory::InitialBuildFailure)
    );
    assert!(session.last_build_output.unwrap().contains("compile error"));
    // The fix agent never ran.
    assert!(fixture.model.request_lengths().is_empty());
}

#[tokio::test]
async fn test_fix_agent_failure_maps_to_agent_failure() {
    let fixture = Fixture::new(Some("make all"), settings());
    fixture.tools.runner.push_ok("initial ok");
    // No model turns queued: the fix agent errors out.

    let session = fixture.runner().run(&details()).await;
    assert_eq!(
        session.outcome,
        SessionOutcome::Failed(FailureCategory::AgentFailure)
    );
}

#[tokio::test]
async fn test_qa_loop_feeds_build_output_back_until_it_passes() {
    let fixture = Fixture::new(Some("make all"), settings());
    fixture.tools.runner.push_ok("initial ok");
    fixture.model.push_text("<pr_body>fix</pr_body>");
    fixture.tools.runner.push_err(1, "error: missing semicolon"); // QA build 1
    fixture.model.push_text("added the semicolon"); // QA agent
    fixture.tools.runner.push_ok("ok"); // QA build 2

    let session = fixture.runner().run(&details()).await;

    assert_eq!(session.outcome, SessionOutcome::Success);
    assert_eq!(session.qa_attempts, 2);

    let snapshot = fixture.telemetry.snapshot();
    let events = snapshot["resultInfo"]["agentEvents"].as_array().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["agentType"], "FIX");
    assert_eq!(events[1]["agentType"], "QA");
}

#[tokio::test]
async fn test_qa_budget_exhaustion_is_qa_failure() {
    let mut config = settings();
    config.max_qa_attempts = 2;
    let fixture = Fixture::new(Some("make all"), config);
    fixture.tools.runner.push_ok("initial ok");
    fixture.model.push_text("<pr_body>fix</pr_body>");
    fixture.tools.runner.push_err(1, "still broken"); // QA build 1
    fixture.model.push_text("tried something"); // QA agent
    fixture.tools.runner.push_err(1, "still broken"); // QA build 2

    let session = fixture.runner().run(&details()).await;

    assert_eq!(
        session.outcome,
        SessionOutcome::Failed(FailureCategory::QaFailure)
    );
    assert_eq!(session.qa_attempts, 2);
    assert!(session.last_build_output.unwrap().contains("still broken"));
}

#[tokio::test]
async fn test_skip_qa_review_bypasses_the_loop() {
    let mut config = settings();
    config.skip_qa_review = true;
    let fixture = Fixture::new(Some("make all"), config);
    fixture.tools.runner.push_ok("initial ok");
    fixture.model.push_text("<pr_body>fix</pr_body>");

    let session = fixture.runner().run(&details()).await;

    assert_eq!(session.outcome, SessionOutcome::Success);
    assert_eq!(session.qa_attempts, 0);
    // Only the initial build ran.
    assert_eq!(fixture.tools.runner.specs().len(), 1);
}

#[tokio::test]
async fn test_no_build_command_skips_validation_and_qa() {
    let fixture = Fixture::new(None, settings());
    fixture.model.push_text("<pr_body>fix</pr_body>");

    let session = fixture.runner().run(&details()).await;

    assert_eq!(session.outcome, SessionOutcome::Success);
    assert!(fixture.tools.runner.specs().is_empty());
}

#[tokio::test]
async fn test_formatting_command_runs_after_qa() {
    let mut config = settings();
    config.formatting_command = Some("prettier --write .".to_string());
    let fixture = Fixture::new(Some("make all"), config);
    fixture.tools.runner.push_ok("initial ok");
    fixture.model.push_text("<pr_body>fix</pr_body>");
    fixture.tools.runner.push_ok("qa ok");
    fixture.tools.runner.push_ok("formatted");

    let session = fixture.runner().run(&details()).await;
    assert_eq!(session.outcome, SessionOutcome::Success);

    let specs = fixture.tools.runner.specs();
    assert_eq!(specs.last().unwrap().args, vec!["-c", "prettier --write ."]);
}

#[tokio::test]
async fn test_formatting_failure_fails_the_session() {
    let mut config = settings();
    config.formatting_command = Some("prettier --write .".to_string());
    let fixture = Fixture::new(Some("make all"), config);
    fixture.tools.runner.push_ok("initial ok");
    fixture.model.push_text("<pr_body>fix</pr_body>");
    fixture.tools.runner.push_ok("qa ok");
    fixture.tools.runner.push_err(1, "formatter crashed");

    let session = fixture.runner().run(&details()).await;
    assert_eq!(
        session.outcome,
        SessionOutcome::Failed(FailureCategory::GeneralFailure)
    );
}

#[tokio::test]
async fn test_qa_section_variants() {
    let fixture = Fixture::new(Some("make all"), settings());
    let runner = fixture.runner();
    let session = AgentSession {
        fix_summary: "s".to_string(),
        qa_attempts: 2,
        last_build_output: None,
        outcome: SessionOutcome::Success,
    };
    let section = runner.qa_section(&session);
    assert!(section.contains("make all"));
    assert!(section.contains("2 attempt(s)"));

    let mut config = settings();
    config.skip_qa_review = true;
    let skipped = Fixture::new(Some("make all"), config);
    assert!(skipped
        .runner()
        .qa_section(&session)
        .contains("skipped by configuration"));

    let no_build = Fixture::new(None, settings());
    assert!(no_build
        .runner()
        .qa_section(&session)
        .contains("No build command"));
}
