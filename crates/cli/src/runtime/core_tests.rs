#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
use super::*;

use std::collections::HashMap;

use httpmock::prelude::*;

use crate::agent::testing::ScriptedModel;
use crate::exec::testing::ScriptedRunner;

const BASE_PATH: &str = "/api/v4/remediation/organizations/test-org/applications/test-app";

fn details_body(remediation_id: &str, uuid: &str) -> serde_json::Value {
    serde_json::json!({
        "remediationId": remediation_id,
        "vulnerabilityUuid": uuid,
        "vulnerabilityTitle": "SQL Injection in OrderDao",
        "vulnerabilityRuleName": "sql-injection",
        "vulnerabilityStatus": "REPORTED",
        "vulnerabilitySeverity": "CRITICAL",
        "fixSystemPrompt": "fix system",
        "fixUserPrompt": "fix user",
        "qaSystemPrompt": "qa system",
        "qaUserPrompt": "qa user"
    })
}

/// One open PR carrying a fixwright label, as `gh pr list` reports it.
const ONE_OPEN_PR: &str = r#"[{"number":7,"labels":[{"name":"fixwright-vuln-id:other"}]}]"#;

struct Fixture {
    runner: Arc<ScriptedRunner>,
    model: ScriptedModel,
}

impl Fixture {
    fn new() -> Self {
        Self {
            runner: Arc::new(ScriptedRunner::new()),
            model: ScriptedModel::new(),
        }
    }

    /// Stubs for a run that remediates one vulnerability, then stops at the
    /// PR cap on the next iteration.
    fn stub_one_pass(&self) {
        self.runner.stub_ok("number,labels", "[]"); // pre-loop gate
        self.runner.stub_ok("number,labels", "[]"); // first iteration
        self.runner.stub_ok("number,labels", ONE_OPEN_PR); // stops the loop
        self.runner.stub_ok("--label", "[]"); // no PR for this vuln yet
        self.runner
            .stub_ok("git status --porcelain", " M src/OrderDao.java");
        self.runner.stub_ok(
            "pr create",
            "https://mockhub.test/mock/repo-for-testing/pull/7\n",
        );
    }

    fn runtime(self, server: &MockServer) -> Runtime<ScriptedRunner, ScriptedModel> {
        let env: HashMap<String, String> = [
            ("TESTING", "true"),
            ("BUILD_COMMAND", "echo build"),
            ("USE_BACKEND_LLM", "false"),
            ("ENABLE_TELEMETRY", "false"),
            ("MAX_OPEN_PRS", "1"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let config = Config::from_env(&env).unwrap();
        let api = crate::api::ApiClient::with_origin(&config, server.base_url());
        Runtime::new(
            config,
            TelemetryLog::new(),
            api,
            Arc::clone(&self.runner),
            self.model,
        )
    }
}

#[tokio::test]
async fn test_generate_fix_opens_a_pr_for_one_vulnerability() {
    let server = MockServer::start_async().await;
    let fixture = Fixture::new();
    fixture.stub_one_pass();
    fixture
        .model
        .push_text("<pr_body>Bound the query parameters.</pr_body>");

    let work = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(format!("{}/prompt-details", BASE_PATH));
            then.status(200).json_body(details_body("rem-1", "uuid-1"));
        })
        .await;
    let opened = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path(format!("{}/remediations/rem-1/open", BASE_PATH))
                .json_body_partial(r#"{"pullRequestNumber": 7}"#);
            then.status(204);
        })
        .await;

    let runner = Arc::clone(&fixture.runner);
    let code = fixture.runtime(&server).execute().await;

    assert_eq!(code, 0);
    work.assert_async().await;
    opened.assert_async().await;

    let calls = runner.calls();
    assert!(calls
        .iter()
        .any(|c| c.starts_with("git checkout -b fixwright/remediation-rem-1")));
    assert!(calls.iter().any(|c| c.starts_with("git commit -m")));
    assert!(calls.iter().any(|c| c.starts_with("git push")));
    assert!(calls.iter().any(|c| c.starts_with("gh pr create")));
}

#[tokio::test]
async fn test_agent_failure_cleans_up_and_notifies() {
    let server = MockServer::start_async().await;
    let fixture = Fixture::new();
    fixture.stub_one_pass();
    // No model turns queued: the fix agent fails.

    server
        .mock_async(|when, then| {
            when.method(POST)
                .path(format!("{}/prompt-details", BASE_PATH));
            then.status(200).json_body(details_body("rem-1", "uuid-1"));
        })
        .await;
    let failed = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path(format!("{}/remediations/rem-1/failed", BASE_PATH))
                .json_body(serde_json::json!({"failureCategory": "AGENT_FAILURE"}));
            then.status(204);
        })
        .await;

    let runner = Arc::clone(&fixture.runner);
    let code = fixture.runtime(&server).execute().await;

    assert_eq!(code, 0); // one failed vulnerability does not fail the run
    failed.assert_async().await;

    let calls = runner.calls();
    assert!(calls
        .iter()
        .any(|c| c.starts_with("git branch -D fixwright/remediation-rem-1")));
    assert!(!calls.iter().any(|c| c.starts_with("gh pr create")));
}

#[tokio::test]
async fn test_no_changes_from_agent_skips_pr_creation() {
    let server = MockServer::start_async().await;
    let fixture = Fixture::new();
    fixture.runner.stub_ok("number,labels", "[]");
    fixture.runner.stub_ok("number,labels", "[]");
    fixture.runner.stub_ok("number,labels", ONE_OPEN_PR);
    fixture.runner.stub_ok("--label", "[]");
    fixture.runner.stub_ok("git status --porcelain", "");
    fixture.model.push_text("<pr_body>nothing to change</pr_body>");

    server
        .mock_async(|when, then| {
            when.method(POST)
                .path(format!("{}/prompt-details", BASE_PATH));
            then.status(200).json_body(details_body("rem-1", "uuid-1"));
        })
        .await;
    let failed = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path(format!("{}/remediations/rem-1/failed", BASE_PATH))
                .json_body(serde_json::json!({"failureCategory": "NO_CHANGES"}));
            then.status(204);
        })
        .await;

    let runner = Arc::clone(&fixture.runner);
    let code = fixture.runtime(&server).execute().await;

    assert_eq!(code, 0);
    failed.assert_async().await;
    assert!(!runner.calls().iter().any(|c| c.starts_with("gh pr create")));
}

#[tokio::test]
async fn test_duplicate_vulnerability_from_backend_is_fatal() {
    let server = MockServer::start_async().await;
    let fixture = Fixture::new();
    // The PR count never reaches the cap, so only the duplicate guard can
    // stop this run.
    fixture.runner.stub_ok("number,labels", "[]");
    fixture.runner.stub_ok("--label", "[]");
    fixture.runner.stub_ok("git status --porcelain", " M src/x");
    fixture.runner.stub_ok(
        "pr create",
        "https://mockhub.test/mock/repo-for-testing/pull/8\n",
    );
    fixture.model.push_text("<pr_body>fix one</pr_body>");

    server
        .mock_async(|when, then| {
            when.method(POST)
                .path(format!("{}/prompt-details", BASE_PATH));
            then.status(200).json_body(details_body("rem-1", "uuid-1"));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(PUT)
                .path(format!("{}/remediations/rem-1/open", BASE_PATH));
            then.status(204);
        })
        .await;
    let failed = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path(format!("{}/remediations/rem-1/failed", BASE_PATH))
                .json_body(serde_json::json!({"failureCategory": "GENERAL_FAILURE"}));
            then.status(204);
        })
        .await;

    let code = fixture.runtime(&server).execute().await;

    assert_eq!(code, 1);
    failed.assert_async().await;
}

#[tokio::test]
async fn test_vulnerability_with_open_pr_is_skipped_once_then_stops() {
    let server = MockServer::start_async().await;
    let fixture = Fixture::new();
    fixture.runner.stub_ok("number,labels", "[]");
    fixture.runner.stub_ok("--label", r#"[{"state":"OPEN"}]"#);

    let work = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(format!("{}/prompt-details", BASE_PATH));
            then.status(200).json_body(details_body("rem-1", "uuid-1"));
        })
        .await;

    let runner = Arc::clone(&fixture.runner);
    let code = fixture.runtime(&server).execute().await;

    assert_eq!(code, 0);
    // Fetched twice: once skipped, once recognized as already skipped.
    assert_eq!(work.hits_async().await, 2);
    assert!(!runner
        .calls()
        .iter()
        .any(|c| c.starts_with("git checkout -b")));
}

#[tokio::test]
async fn test_pr_cap_already_reached_exits_before_fetching_work() {
    let server = MockServer::start_async().await;
    let fixture = Fixture::new();
    fixture.runner.stub_ok("number,labels", ONE_OPEN_PR);

    let work = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(format!("{}/prompt-details", BASE_PATH));
            then.status(200).json_body(details_body("rem-1", "uuid-1"));
        })
        .await;

    let code = fixture.runtime(&server).execute().await;

    assert_eq!(code, 0);
    assert_eq!(work.hits_async().await, 0);
}

#[tokio::test]
async fn test_no_work_from_backend_ends_the_run_cleanly() {
    let server = MockServer::start_async().await;
    let fixture = Fixture::new();
    fixture.runner.stub_ok("number,labels", "[]");

    server
        .mock_async(|when, then| {
            when.method(POST)
                .path(format!("{}/prompt-details", BASE_PATH));
            then.status(204);
        })
        .await;

    let code = fixture.runtime(&server).execute().await;
    assert_eq!(code, 0);
}
