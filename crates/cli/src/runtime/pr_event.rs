// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The pr-event task: map a PR webhook payload to a backend notification.

use serde::Deserialize;

use crate::agent::ModelClient;
use crate::exec::Runner;
use crate::failure::exit_codes;
use crate::git::{remediation_id_from_branch, remediation_id_from_labels};
use crate::output;

use super::core::Runtime;

#[derive(Debug, Deserialize)]
struct EventLabel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct EventHead {
    #[serde(rename = "ref")]
    branch: String,
}

#[derive(Debug, Deserialize)]
struct EventPullRequest {
    number: u64,
    #[serde(default)]
    merged: bool,
    head: EventHead,
    #[serde(default)]
    labels: Vec<EventLabel>,
}

/// The GitHub `pull_request` event payload, reduced to what the task needs.
#[derive(Debug, Deserialize)]
struct PrEvent {
    action: String,
    #[serde(default)]
    pull_request: Option<EventPullRequest>,
}

impl<R: Runner, M: ModelClient> Runtime<R, M> {
    /// Handle a PR merged/closed event and notify the backend.
    pub(super) async fn handle_pr_event(&self) -> i32 {
        let Some(ref path) = self.config.github_event_path else {
            output::error("GITHUB_EVENT_PATH is not set; cannot read the event payload.");
            return exit_codes::ERROR;
        };

        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) => {
                output::error(format!(
                    "Cannot read event payload at {}: {}",
                    path.display(),
                    e
                ));
                return exit_codes::ERROR;
            }
        };

        let event: PrEvent = match serde_json::from_str(&raw) {
            Ok(event) => event,
            Err(e) => {
                output::error(format!("Cannot parse event payload: {}", e));
                return exit_codes::ERROR;
            }
        };

        if event.action != "closed" {
            output::log(format!(
                "Event action '{}' needs no notification. Nothing to do.",
                event.action
            ));
            return exit_codes::SUCCESS;
        }

        let Some(pr) = event.pull_request else {
            output::error("Event payload has no pull_request object.");
            return exit_codes::ERROR;
        };

        let label_names: Vec<&str> = pr.labels.iter().map(|l| l.name.as_str()).collect();
        let Some(remediation_id) = remediation_id_from_branch(&pr.head.branch)
            .or_else(|| remediation_id_from_labels(&label_names))
        else {
            output::log(format!(
                "PR #{} is not a fixwright remediation PR. Nothing to do.",
                pr.number
            ));
            return exit_codes::SUCCESS;
        };

        let notified = if pr.merged {
            output::log(format!(
                "PR #{} for remediation {} was merged.",
                pr.number, remediation_id
            ));
            self.api.notify_pr_merged(&remediation_id).await
        } else {
            output::log(format!(
                "PR #{} for remediation {} was closed without merging.",
                pr.number, remediation_id
            ));
            self.api.notify_pr_closed(&remediation_id).await
        };

        if notified {
            exit_codes::SUCCESS
        } else {
            exit_codes::ERROR
        }
    }
}

#[cfg(test)]
#[path = "pr_event_tests.rs"]
mod tests;
