// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Fix/QA session orchestration.
//!
//! One session covers a single vulnerability: validate the initial build,
//! run the fix agent, then loop build-and-QA until the build passes or the
//! attempt budget runs out, and finally run the formatting command.

use std::sync::OnceLock;

use regex::Regex;

use crate::api::PromptDetails;
use crate::exec::Runner;
use crate::failure::FailureCategory;
use crate::output;
use crate::telemetry::TelemetryLog;
use crate::util::tail_string;

use super::executor::{AgentExecutor, AgentType};
use super::model::{AgentError, ModelClient};
use super::tools::ToolDispatcher;

/// How much build output is handed to the QA agent.
const QA_BUILD_OUTPUT_LIMIT: usize = 8_000;

/// Session-level settings derived from configuration.
#[derive(Clone, Debug)]
pub struct SessionSettings {
    pub max_qa_attempts: u32,
    pub max_events_per_agent: u32,
    pub skip_qa_review: bool,
    pub formatting_command: Option<String>,
}

/// How a session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The fix is ready for a PR.
    Success,
    /// The attempt failed; the category goes to the backend.
    Failed(FailureCategory),
}

/// Result of one remediation session.
#[derive(Clone, Debug)]
pub struct AgentSession {
    /// PR body content extracted from the fix agent's summary.
    pub fix_summary: String,
    /// QA attempts used (builds run after the fix).
    pub qa_attempts: u32,
    /// Output of the last build, when one ran.
    pub last_build_output: Option<String>,
    pub outcome: SessionOutcome,
}

impl AgentSession {
    fn failed(category: FailureCategory) -> Self {
        Self {
            fix_summary: String::new(),
            qa_attempts: 0,
            last_build_output: None,
            outcome: SessionOutcome::Failed(category),
        }
    }
}

/// Extract the PR body from `<pr_body>` tags, falling back to the full text.
pub fn extract_pr_body(summary: &str) -> String {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    let regex = PATTERN.get_or_init(|| Regex::new(r"(?s)<pr_body>(.*?)</pr_body>").ok());
    regex
        .as_ref()
        .and_then(|re| re.captures(summary))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| summary.trim().to_string())
}

/// Runs fix/QA sessions for one repository checkout.
pub struct SessionRunner<'a, M, R> {
    model: &'a M,
    tools: &'a ToolDispatcher<R>,
    telemetry: &'a TelemetryLog,
    settings: SessionSettings,
}

impl<'a, M: ModelClient, R: Runner> SessionRunner<'a, M, R> {
    pub fn new(
        model: &'a M,
        tools: &'a ToolDispatcher<R>,
        telemetry: &'a TelemetryLog,
        settings: SessionSettings,
    ) -> Self {
        Self {
            model,
            tools,
            telemetry,
            settings,
        }
    }

    /// Run the full session for one vulnerability.
    pub async fn run(&self, details: &PromptDetails) -> AgentSession {
        let session_id = details.session_id.as_deref();
        let executor = AgentExecutor::new(
            self.model,
            self.tools,
            self.telemetry,
            self.settings.max_events_per_agent,
        );

        // The build must pass before the agent touches anything; a broken
        // baseline would make every QA verdict meaningless.
        if let Some(command) = self.tools.build_command() {
            output::log(format!("Validating initial build: {}", command));
            let (success, build_output) = self.tools.run_build_command(command).await;
            if !success {
                output::error("Initial build failed before any fix was attempted.");
                return AgentSession {
                    last_build_output: Some(build_output),
                    ..AgentSession::failed(FailureCategory::InitialBuildFailure)
                };
            }
        }

        let fix_run = match executor
            .run(
                AgentType::Fix,
                &details.fix_system_prompt,
                &details.fix_user_prompt,
                session_id,
            )
            .await
        {
            Ok(run) => run,
            Err(e) => {
                self.log_agent_error(AgentType::Fix, &e);
                return AgentSession::failed(FailureCategory::AgentFailure);
            }
        };
        let fix_summary = extract_pr_body(&fix_run.final_text);

        let (qa_attempts, last_build_output, outcome) = self.qa_loop(&executor, details).await;
        if let SessionOutcome::Failed(category) = outcome {
            return AgentSession {
                fix_summary,
                qa_attempts,
                last_build_output,
                outcome: SessionOutcome::Failed(category),
            };
        }

        if let Some(ref command) = self.settings.formatting_command {
            output::log(format!("Running formatting command: {}", command));
            let (success, format_output) = self.tools.run_build_command(command).await;
            if !success {
                output::error(format!("Error executing formatting command: {}", command));
                output::error(format_output);
                return AgentSession {
                    fix_summary,
                    qa_attempts,
                    last_build_output,
                    outcome: SessionOutcome::Failed(FailureCategory::GeneralFailure),
                };
            }
        }

        AgentSession {
            fix_summary,
            qa_attempts,
            last_build_output,
            outcome: SessionOutcome::Success,
        }
    }

    /// Build, and on failure feed the output to the QA agent, up to the
    /// attempt budget.
    async fn qa_loop(
        &self,
        executor: &AgentExecutor<'a, M, R>,
        details: &PromptDetails,
    ) -> (u32, Option<String>, SessionOutcome) {
        let Some(build_command) = self.tools.build_command().map(str::to_string) else {
            output::log("No build command configured; skipping QA review.");
            return (0, None, SessionOutcome::Success);
        };
        if self.settings.skip_qa_review {
            output::log("QA review skipped by configuration.");
            return (0, None, SessionOutcome::Success);
        }

        let mut last_output = None;
        for attempt in 1..=self.settings.max_qa_attempts {
            output::log(format!(
                "QA build attempt {} of {}: {}",
                attempt, self.settings.max_qa_attempts, build_command
            ));
            let (success, build_output) = self.tools.run_build_command(&build_command).await;
            last_output = Some(build_output.clone());
            if success {
                output::log("Build passed QA review.");
                return (attempt, last_output, SessionOutcome::Success);
            }

            if attempt == self.settings.max_qa_attempts {
                output::error(format!(
                    "Build still failing after {} QA attempt(s).",
                    attempt
                ));
                return (
                    attempt,
                    last_output,
                    SessionOutcome::Failed(FailureCategory::QaFailure),
                );
            }

            let qa_prompt = format!(
                "{}\n\nThe build failed with the following output:\n{}",
                details.qa_user_prompt,
                tail_string(&build_output, QA_BUILD_OUTPUT_LIMIT)
            );
            if let Err(e) = executor
                .run(
                    AgentType::Qa,
                    &details.qa_system_prompt,
                    &qa_prompt,
                    details.session_id.as_deref(),
                )
                .await
            {
                self.log_agent_error(AgentType::Qa, &e);
                return (
                    attempt,
                    last_output,
                    SessionOutcome::Failed(FailureCategory::AgentFailure),
                );
            }
        }

        // max_qa_attempts of zero means the first build decides.
        let (success, build_output) = self.tools.run_build_command(&build_command).await;
        let outcome = if success {
            SessionOutcome::Success
        } else {
            SessionOutcome::Failed(FailureCategory::QaFailure)
        };
        (0, Some(build_output), outcome)
    }

    /// QA section appended to the PR body.
    pub fn qa_section(&self, session: &AgentSession) -> String {
        if self.settings.skip_qa_review {
            return "\n\n## QA Review\n\nQA review was skipped by configuration.\n".to_string();
        }
        match self.tools.build_command() {
            None => {
                "\n\n## QA Review\n\nNo build command is configured; the fix was not build-verified.\n"
                    .to_string()
            }
            Some(command) => format!(
                "\n\n## QA Review\n\nThe build (`{}`) passed after {} attempt(s).\n",
                command, session.qa_attempts
            ),
        }
    }

    fn log_agent_error(&self, agent_type: AgentType, error: &AgentError) {
        match error {
            AgentError::EventLimit { limit } => output::error(format!(
                "{:?} agent stopped after exceeding {} events.",
                agent_type, limit
            )),
            other => output::error(format!("Error during agent execution: {}", other)),
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
