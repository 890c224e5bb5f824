// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The generate-fix loop.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::agent::{ModelClient, SessionOutcome, SessionRunner, SessionSettings, ToolDispatcher};
use crate::api::{ApiClient, FetchOutcome, PromptDetails};
use crate::config::{Config, RunTask};
use crate::exec::Runner;
use crate::failure::{exit_codes, FailureCategory};
use crate::git::{self, GitOps, PrStatus};
use crate::output;
use crate::telemetry::TelemetryLog;

/// Hard cap on one run's wall-clock time.
const MAX_RUNTIME: Duration = Duration::from_secs(3 * 60 * 60);

/// A fully wired runtime, dispatching on the configured task.
pub struct Runtime<R, M> {
    pub(super) config: Config,
    pub(super) telemetry: TelemetryLog,
    pub(super) api: ApiClient,
    pub(super) git: GitOps<Arc<R>>,
    pub(super) model: M,
    pub(super) tools: ToolDispatcher<Arc<R>>,
}

impl<R: Runner, M: ModelClient> Runtime<R, M> {
    pub fn new(
        config: Config,
        telemetry: TelemetryLog,
        api: ApiClient,
        runner: Arc<R>,
        model: M,
    ) -> Self {
        let git = GitOps::new(Arc::clone(&runner), &config);
        let tools = ToolDispatcher::new(
            Arc::clone(&runner),
            config.repo_root.clone(),
            config.build_command.clone(),
        );
        Self {
            config,
            telemetry,
            api,
            git,
            model,
            tools,
        }
    }

    /// Run the configured task and return the process exit code.
    pub async fn execute(&self) -> i32 {
        match self.config.run_task {
            RunTask::GenerateFix => self.generate_fix().await,
            RunTask::PrEvent => self.handle_pr_event().await,
        }
    }

    /// The main remediation loop.
    async fn generate_fix(&self) -> i32 {
        let started = Instant::now();
        output::log("--- Starting fixwright ---");

        if let Err(e) = self.git.configure_user().await {
            output::error(format!("Failed to configure git user: {}", e));
            return exit_codes::ERROR;
        }

        {
            let _section = output::group("Checking Open PR Limit");
            let open = self
                .git
                .count_open_prs_with_prefix(git::VULN_LABEL_PREFIX)
                .await;
            if open >= self.config.max_open_prs {
                output::log(format!(
                    "Found {} open PR(s), meeting or exceeding the limit of {}. Exiting to avoid creating more.",
                    open, self.config.max_open_prs
                ));
                return exit_codes::SUCCESS;
            }
            output::log(format!(
                "Found {} open PR(s) (limit: {}). Proceeding...",
                open, self.config.max_open_prs
            ));
        }

        if self.config.use_backend_llm {
            match self.api.fetch_credit_tracking().await {
                Some(credits) => {
                    output::log(credits.to_log_message());
                    if credits.is_exhausted() {
                        output::error(credits.warning_message());
                        return self
                            .error_exit("unknown", FailureCategory::CreditsExhausted)
                            .await;
                    }
                    if credits.should_warn() {
                        output::warn(credits.warning_message());
                    }
                }
                None => {
                    output::error("Could not retrieve initial credit tracking information");
                    return self
                        .error_exit("unknown", FailureCategory::GeneralFailure)
                        .await;
                }
            }
        }

        let mut processed_one = false;
        let mut skipped_vulns: HashSet<String> = HashSet::new();
        let mut previous_uuid: Option<String> = None;
        let mut remediation_id = "unknown".to_string();

        loop {
            self.telemetry.reset_vuln_specific();
            self.telemetry.set_agent_name("fixwright");

            if started.elapsed() > MAX_RUNTIME {
                output::log(format!(
                    "--- Maximum runtime of 3 hours exceeded (actual: {}s). Stopping. ---",
                    started.elapsed().as_secs()
                ));
                let notified = self
                    .api
                    .notify_failed(&remediation_id, FailureCategory::ExceededTimeout)
                    .await;
                if !notified {
                    output::warn("Failed to notify the backend about the exceeded timeout.");
                }
                break;
            }

            let open = self
                .git
                .count_open_prs_with_prefix(git::VULN_LABEL_PREFIX)
                .await;
            if open >= self.config.max_open_prs {
                output::log(format!(
                    "--- Reached the max PR limit ({}). Current open PRs: {}. Stopping. ---",
                    self.config.max_open_prs, open
                ));
                break;
            }

            if self.config.use_backend_llm {
                if let Some(credits) = self.api.fetch_credit_tracking().await {
                    if credits.is_exhausted() {
                        output::error(credits.warning_message());
                        break;
                    }
                }
            }

            let details = {
                let _section = output::group("Fetching next vulnerability from the backend");
                match self.api.fetch_prompt_details().await {
                    Ok(FetchOutcome::Work(details)) => details,
                    Ok(FetchOutcome::NoWork) | Ok(FetchOutcome::PrLimitReached) => {
                        output::log("No more vulnerabilities to process. Stopping.");
                        break;
                    }
                    Err(e) => {
                        output::error(format!("Error fetching remediation work: {}", e));
                        return self
                            .error_exit(&remediation_id, FailureCategory::GeneralFailure)
                            .await;
                    }
                }
            };

            if previous_uuid.as_deref() == Some(details.vulnerability_uuid.as_str()) {
                output::error(format!(
                    "Backend returned the same vulnerability ({}) twice in a row. This indicates a backend error.",
                    details.vulnerability_uuid
                ));
                return self
                    .error_exit(&remediation_id, FailureCategory::GeneralFailure)
                    .await;
            }

            remediation_id = details.remediation_id.clone();
            self.telemetry.set_remediation_id(&details.remediation_id);
            self.telemetry.set_vuln(
                &details.vulnerability_uuid,
                &details.vulnerability_rule_name,
            );

            let proceed = {
                let _section = output::group(format!(
                    "Considering vulnerability: {} ({})",
                    details.vulnerability_title, details.vulnerability_uuid
                ));
                let label = git::label_details(&details.vulnerability_uuid);
                match self.git.pr_status_for_label(&label.name).await {
                    PrStatus::Open => {
                        output::log(format!(
                            "Skipping vulnerability {}: an open PR with label '{}' already exists.",
                            details.vulnerability_uuid, label.name
                        ));
                        false
                    }
                    _ => {
                        output::log(format!(
                            "No existing open PR for vulnerability {}. Proceeding with a fix attempt.",
                            details.vulnerability_uuid
                        ));
                        true
                    }
                }
            };
            if !proceed {
                if !skipped_vulns.insert(details.vulnerability_uuid.clone()) {
                    output::log(format!(
                        "Already skipped {} before; stopping to avoid an infinite loop.",
                        details.vulnerability_uuid
                    ));
                    break;
                }
                continue;
            }

            previous_uuid = Some(details.vulnerability_uuid.clone());
            output::log(format!(
                "Selected vulnerability to fix: {}",
                details.vulnerability_title
            ));

            let branch = match self.git.prepare_branch(&details.remediation_id).await {
                Ok(branch) => branch,
                Err(e) => {
                    output::error(format!(
                        "Error preparing feature branch: {}. Skipping to the next vulnerability.",
                        e
                    ));
                    continue;
                }
            };

            if self.process_vulnerability(&details, &branch).await {
                processed_one = true;
            }

            if self.config.enable_telemetry {
                self.api.send_telemetry(&self.telemetry).await;
            }
        }

        if processed_one {
            output::log("--- Finished processing; at least one vulnerability was remediated. ---");
        } else {
            output::log("--- No vulnerabilities were processed in this run. ---");
        }
        output::log(format!(
            "--- Run finished (total runtime: {}s) ---",
            started.elapsed().as_secs()
        ));
        exit_codes::SUCCESS
    }

    /// Drive one vulnerability from agent session to opened PR.
    ///
    /// Returns true when a PR was opened. Failures notify the backend and
    /// clean up the branch; none of them stop the outer loop.
    async fn process_vulnerability(&self, details: &PromptDetails, branch: &str) -> bool {
        let session_runner = SessionRunner::new(
            &self.model,
            &self.tools,
            &self.telemetry,
            SessionSettings {
                max_qa_attempts: self.config.max_qa_attempts,
                max_events_per_agent: self.config.max_events_per_agent,
                skip_qa_review: self.config.skip_qa_review,
                formatting_command: self.config.formatting_command.clone(),
            },
        );

        let session = session_runner.run(details).await;
        self.telemetry.set_qa_attempts(session.qa_attempts);

        if let SessionOutcome::Failed(category) = session.outcome {
            output::log(format!("Agent failed with reason: {}", category));
            self.git.cleanup_branch(branch).await;
            self.api
                .notify_failed(&details.remediation_id, category)
                .await;
            return false;
        }

        output::log("--- Proceeding with git and GitHub operations ---");
        self.git.stage_all().await;

        match self.git.has_staged_changes().await {
            Ok(true) => {}
            Ok(false) => {
                output::log("No changes detected from the agent run. Skipping PR creation.");
                self.git.cleanup_branch(branch).await;
                self.api
                    .notify_failed(&details.remediation_id, FailureCategory::NoChanges)
                    .await;
                return false;
            }
            Err(e) => {
                output::error(format!("Error checking git status: {}", e));
                self.git.cleanup_branch(branch).await;
                self.api
                    .notify_failed(&details.remediation_id, FailureCategory::GeneralFailure)
                    .await;
                return false;
            }
        }

        let message = git::commit_message(
            &details.vulnerability_title,
            &details.vulnerability_uuid,
        );
        if let Err(e) = self.git.commit(&message).await {
            output::error(format!("Error committing changes: {}", e));
            self.git.cleanup_branch(branch).await;
            self.api
                .notify_failed(&details.remediation_id, FailureCategory::GeneralFailure)
                .await;
            return false;
        }

        if let Err(e) = self.git.push(branch).await {
            output::error(format!("Error pushing branch: {}", e));
            self.git.cleanup_branch(branch).await;
            self.api
                .notify_failed(&details.remediation_id, FailureCategory::GeneratePrFailure)
                .await;
            return false;
        }

        let mut labels = Vec::new();
        for label in [
            git::label_details(&details.vulnerability_uuid),
            git::remediation_label(&details.remediation_id),
        ] {
            if self.git.ensure_label(&label).await {
                labels.push(label.name);
            } else {
                output::warn(format!(
                    "Could not create GitHub label '{}'. The PR will be created without it.",
                    label.name
                ));
            }
        }

        let mut pr_body = format!(
            "{}{}",
            session.fix_summary,
            session_runner.qa_section(&session)
        );
        if self.config.use_backend_llm {
            if let Some(credits) = self.api.fetch_credit_tracking().await {
                let projected = credits.with_incremented_usage();
                pr_body.push_str(&projected.to_pr_body_section());
                output::log(format!(
                    "Credit consumed. {} credit(s) remaining.",
                    projected.credits_remaining()
                ));
                if projected.should_warn() {
                    output::warn(projected.warning_message());
                }
            }
        }
        self.telemetry.set_summary_from_body(&pr_body);

        let title = git::pr_title(&details.vulnerability_title);
        let pr_url = match self
            .git
            .create_pr(&title, &pr_body, &details.remediation_id, &labels)
            .await
        {
            Ok(url) => url,
            Err(e) => {
                output::error(format!("Error creating PR: {}", e));
                self.git.cleanup_branch(branch).await;
                self.api
                    .notify_failed(&details.remediation_id, FailureCategory::GeneratePrFailure)
                    .await;
                return false;
            }
        };
        self.telemetry.set_pr_created(true);

        let pr_number = git::pr_number_from_url(&pr_url).unwrap_or(1);
        if self
            .api
            .notify_pr_opened(&details.remediation_id, pr_number, &pr_url)
            .await
        {
            output::log(format!(
                "Notified the backend about the PR for remediation {}.",
                details.remediation_id
            ));
        } else {
            output::warn(format!(
                "Failed to notify the backend about the PR for remediation {}.",
                details.remediation_id
            ));
        }

        output::log(format!(
            "--- Processed vulnerability {}. Looking for the next one... ---",
            details.vulnerability_uuid
        ));
        true
    }

    /// Fatal-path teardown: notify the backend, clean up the branch, send
    /// telemetry, and produce the error exit code.
    pub(super) async fn error_exit(
        &self,
        remediation_id: &str,
        category: FailureCategory,
    ) -> i32 {
        if remediation_id != "unknown" {
            if self.api.notify_failed(remediation_id, category).await {
                output::log(format!(
                    "Notified the backend about {} for remediation {}.",
                    category, remediation_id
                ));
            } else {
                output::warn(format!(
                    "Failed to notify the backend about {} for remediation {}.",
                    category, remediation_id
                ));
            }
            self.git
                .cleanup_branch(&git::branch_name(remediation_id))
                .await;
        }
        if self.config.enable_telemetry {
            self.api.send_telemetry(&self.telemetry).await;
        }
        exit_codes::ERROR
    }
}

#[cfg(test)]
#[path = "core_tests.rs"]
mod tests;
