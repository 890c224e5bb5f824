// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Git and GitHub CLI operations over the runner seam.

use std::io::Write;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::config::Config;
use crate::exec::{CommandOutput, CommandSpec, ExecError, Runner};
use crate::output;
use crate::util::normalize_host;

use super::refs::{branch_name, LabelDetails};

/// GitHub's limit on label name length.
const MAX_LABEL_LEN: usize = 50;

/// GitHub recommends keeping PR bodies well under 65536 characters.
const MAX_PR_BODY_LEN: usize = 32_000;

const PR_DISCLAIMER: &str =
    "\n\n*fixwright is powered by AI, so mistakes are possible. Review before merging.*\n\n";

/// Git/GitHub operation failure.
#[derive(Debug, Error)]
pub enum GitError {
    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error("command `{command}` failed with exit code {code}: {stderr}")]
    CommandFailed {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("failed to write PR body file: {0}")]
    Io(#[from] std::io::Error),

    #[error("gh pr create returned no PR URL")]
    MissingPrUrl,
}

/// PR state for a vulnerability label.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrStatus {
    Open,
    Merged,
    Closed,
    None,
}

/// Git and GitHub operations bound to one repository.
pub struct GitOps<R> {
    runner: R,
    base_branch: String,
    repository: String,
    server_url: String,
    token: String,
}

#[derive(Deserialize)]
struct LabelName {
    name: String,
}

#[derive(Deserialize)]
struct PrLabels {
    #[serde(default)]
    labels: Vec<LabelName>,
}

#[derive(Deserialize)]
struct PrState {
    state: String,
}

impl<R: Runner> GitOps<R> {
    pub fn new(runner: R, config: &Config) -> Self {
        Self {
            runner,
            base_branch: config.base_branch.clone(),
            repository: config.github_repository.clone(),
            server_url: config.github_server_url.clone(),
            token: config.github_token.clone(),
        }
    }

    /// `gh` invocation with the token exported for authentication.
    fn gh(&self) -> CommandSpec {
        CommandSpec::new("gh")
            .env("GITHUB_TOKEN", &self.token)
            .env("GITHUB_ENTERPRISE_TOKEN", &self.token)
    }

    async fn run_checked(&self, spec: CommandSpec) -> Result<CommandOutput, GitError> {
        let command = spec.display_masked(&self.token);
        let result = self.runner.run(spec).await?;
        if result.success() {
            Ok(result)
        } else {
            Err(GitError::CommandFailed {
                command,
                code: result.code,
                stderr: result.stderr.trim().to_string(),
            })
        }
    }

    async fn run_unchecked(&self, spec: CommandSpec) -> Option<CommandOutput> {
        match self.runner.run(spec).await {
            Ok(result) => Some(result),
            Err(ExecError::Spawn { program, source }) => {
                output::error(format!("failed to run `{}`: {}", program, source));
                None
            }
        }
    }

    /// Configure the bot identity for commits.
    pub async fn configure_user(&self) -> Result<(), GitError> {
        output::log("Configuring git user...");
        self.run_checked(
            CommandSpec::new("git").args(["config", "--global", "user.email", "action@github.com"]),
        )
        .await?;
        self.run_checked(
            CommandSpec::new("git").args(["config", "--global", "user.name", "GitHub Action"]),
        )
        .await?;
        Ok(())
    }

    /// Reset the workspace to a clean state and create the feature branch.
    pub async fn prepare_branch(&self, remediation_id: &str) -> Result<String, GitError> {
        output::log("Cleaning workspace and creating new feature branch...");
        self.run_checked(CommandSpec::new("git").args(["reset", "--hard"]))
            .await?;
        self.run_checked(CommandSpec::new("git").args(["clean", "-fd"]))
            .await?;
        self.run_checked(CommandSpec::new("git").args(["checkout", &self.base_branch]))
            .await?;
        self.run_checked(CommandSpec::new("git").args(["pull", "--ff-only"]))
            .await?;
        output::log(format!(
            "Cleaned workspace and checked out latest {}",
            self.base_branch
        ));

        let branch = branch_name(remediation_id);
        output::log(format!("Creating and checking out new branch: {}", branch));
        self.run_checked(CommandSpec::new("git").args(["checkout", "-b", &branch]))
            .await?;
        Ok(branch)
    }

    /// Stage everything the agent touched. Best-effort.
    pub async fn stage_all(&self) {
        output::debug_log("Staging changes made by the agent...");
        self.run_unchecked(CommandSpec::new("git").args(["add", "."]))
            .await;
    }

    /// Whether anything is staged for commit.
    pub async fn has_staged_changes(&self) -> Result<bool, GitError> {
        let status = self
            .run_checked(CommandSpec::new("git").args(["status", "--porcelain"]))
            .await?;
        Ok(!status.stdout_trimmed().is_empty())
    }

    /// Commit staged changes.
    pub async fn commit(&self, message: &str) -> Result<(), GitError> {
        output::log(format!("Committing changes with message: '{}'", message));
        self.run_checked(CommandSpec::new("git").args(["commit", "-m", message]))
            .await?;
        Ok(())
    }

    /// Push the branch to the authenticated remote.
    pub async fn push(&self, branch: &str) -> Result<(), GitError> {
        output::log(format!("Pushing branch {} to remote...", branch));
        let host = Url::parse(&self.server_url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
            .unwrap_or_else(|| normalize_host(&self.server_url));
        let remote = format!(
            "https://x-access-token:{}@{}/{}.git",
            self.token, host, self.repository
        );
        self.run_checked(CommandSpec::new("git").args(["push", "--set-upstream", &remote, branch]))
            .await?;
        Ok(())
    }

    /// Switch back to the base branch and delete the feature branch, locally
    /// and on the remote. Best-effort.
    pub async fn cleanup_branch(&self, branch: &str) {
        output::debug_log(format!("Cleaning up branch: {}", branch));
        self.run_unchecked(CommandSpec::new("git").args(["reset", "--hard"]))
            .await;
        self.run_unchecked(CommandSpec::new("git").args(["checkout", &self.base_branch]))
            .await;
        self.run_unchecked(CommandSpec::new("git").args(["branch", "-D", branch]))
            .await;
        self.run_unchecked(CommandSpec::new("git").args(["push", "origin", "--delete", branch]))
            .await;
        output::log("Branch cleanup completed.");
    }

    /// Make sure a label exists, creating it if necessary.
    pub async fn ensure_label(&self, label: &LabelDetails) -> bool {
        output::debug_log(format!("Ensuring GitHub label exists: {}", label.name));
        if label.name.len() > MAX_LABEL_LEN {
            output::error(format!(
                "Label name '{}' exceeds GitHub's {}-character limit.",
                label.name, MAX_LABEL_LEN
            ));
            return false;
        }

        if let Some(list) = self
            .run_unchecked(
                self.gh()
                    .args(["label", "list", "--repo", &self.repository, "--json", "name"]),
            )
            .await
        {
            if let Ok(existing) = serde_json::from_str::<Vec<LabelName>>(list.stdout_trimmed()) {
                if existing.iter().any(|l| l.name == label.name) {
                    output::debug_log(format!("Label '{}' already exists.", label.name));
                    return true;
                }
            }
        }

        let create = self
            .run_unchecked(self.gh().args([
                "label",
                "create",
                &label.name,
                "--description",
                &label.description,
                "--color",
                &label.color,
                "--repo",
                &self.repository,
            ]))
            .await;

        match create {
            Some(result) if result.success() => {
                output::debug_log(format!("Label '{}' created.", label.name));
                true
            }
            Some(result) if result.stderr.to_lowercase().contains("already exists") => {
                output::log(format!("Label '{}' already exists.", label.name));
                true
            }
            Some(result) => {
                output::error(format!("Error creating label: {}", result.stderr.trim()));
                false
            }
            None => false,
        }
    }

    /// PR state for the given label, across all PR states.
    pub async fn pr_status_for_label(&self, label: &str) -> PrStatus {
        output::log(format!("Checking GitHub PR status for label: {}", label));
        let Some(result) = self
            .run_unchecked(self.gh().args([
                "pr",
                "list",
                "--repo",
                &self.repository,
                "--label",
                label,
                "--state",
                "all",
                "--limit",
                "1",
                "--json",
                "state",
            ]))
            .await
        else {
            return PrStatus::None;
        };

        let prs: Vec<PrState> = match serde_json::from_str(result.stdout_trimmed()) {
            Ok(prs) => prs,
            Err(_) => {
                output::error(format!(
                    "Could not parse gh pr list output: {}",
                    result.stdout_trimmed()
                ));
                return PrStatus::None;
            }
        };

        match prs.first().map(|pr| pr.state.as_str()) {
            Some("OPEN") => PrStatus::Open,
            Some("MERGED") => PrStatus::Merged,
            Some("CLOSED") => PrStatus::Closed,
            _ => PrStatus::None,
        }
    }

    /// Count open PRs carrying at least one label with the given prefix.
    pub async fn count_open_prs_with_prefix(&self, prefix: &str) -> u32 {
        output::log(format!("Counting open PRs with label prefix: '{}'", prefix));
        let Some(result) = self
            .run_unchecked(self.gh().args([
                "pr",
                "list",
                "--repo",
                &self.repository,
                "--state",
                "open",
                "--limit",
                "100",
                "--json",
                "number,labels",
            ]))
            .await
        else {
            return 0;
        };

        let prs: Vec<PrLabels> = match serde_json::from_str(result.stdout_trimmed()) {
            Ok(prs) => prs,
            Err(_) => {
                output::error(format!(
                    "Could not parse gh pr list output: {}",
                    result.stdout_trimmed()
                ));
                return 0;
            }
        };

        let count = prs
            .iter()
            .filter(|pr| pr.labels.iter().any(|l| l.name.starts_with(prefix)))
            .count();
        output::debug_log(format!(
            "Found {} open PR(s) with label prefix '{}'.",
            count, prefix
        ));
        count as u32
    }

    /// Create the pull request and attach its labels.
    ///
    /// The body is written to a temp file to sidestep argv length limits, and
    /// labels are added with a separate `gh pr edit` because the default
    /// Actions token cannot label during creation.
    pub async fn create_pr(
        &self,
        title: &str,
        body: &str,
        remediation_id: &str,
        labels: &[String],
    ) -> Result<String, GitError> {
        output::log("Creating pull request...");

        let mut body = body.to_string();
        if body.len() > MAX_PR_BODY_LEN {
            output::warn(format!(
                "PR body is too large ({} chars). Truncating to {} chars.",
                body.len(),
                MAX_PR_BODY_LEN
            ));
            let mut cut = MAX_PR_BODY_LEN;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
            body.push_str("\n\n...[content truncated due to size limits]...");
        }
        body.push_str(PR_DISCLAIMER);

        let mut body_file = tempfile::NamedTempFile::new()?;
        body_file.write_all(body.as_bytes())?;
        body_file.flush()?;
        let body_path = body_file.path().display().to_string();

        let head = branch_name(remediation_id);
        let created = self
            .run_checked(self.gh().args([
                "pr",
                "create",
                "--title",
                title,
                "--body-file",
                &body_path,
                "--base",
                &self.base_branch,
                "--head",
                &head,
            ]))
            .await?;

        let pr_url = created.stdout_trimmed().to_string();
        if pr_url.is_empty() {
            return Err(GitError::MissingPrUrl);
        }
        output::log(format!("Created PR: {}", pr_url));

        if !labels.is_empty() {
            match super::refs::pr_number_from_url(&pr_url) {
                Some(number) => {
                    let joined = labels.join(",");
                    let edit = self
                        .run_unchecked(self.gh().args([
                            "pr",
                            "edit",
                            "--repo",
                            &self.repository,
                            &number.to_string(),
                            "--add-label",
                            &joined,
                        ]))
                        .await;
                    match edit {
                        Some(result) if result.success() => {
                            output::debug_log(format!("Added labels to PR #{}: {}", number, joined));
                        }
                        _ => output::warn(format!("Could not add labels to PR #{}", number)),
                    }
                }
                None => output::warn(format!(
                    "Could not extract PR number from URL to add labels: {}",
                    pr_url
                )),
            }
        }

        Ok(pr_url)
    }
}

#[cfg(test)]
#[path = "ops_tests.rs"]
mod tests;
