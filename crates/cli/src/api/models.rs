// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Wire models for the remediation API.

use serde::Deserialize;

/// Result of asking the backend for the next piece of remediation work.
#[derive(Clone, Debug)]
pub enum FetchOutcome {
    /// A vulnerability with pre-built prompts to work on.
    Work(Box<PromptDetails>),
    /// Nothing needs remediation right now.
    NoWork,
    /// The backend reports the open-PR limit is reached.
    PrLimitReached,
}

/// A vulnerability plus the prompts prepared by the backend.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptDetails {
    pub remediation_id: String,
    pub vulnerability_uuid: String,
    pub vulnerability_title: String,
    pub vulnerability_rule_name: String,
    pub vulnerability_status: String,
    pub vulnerability_severity: String,
    pub fix_system_prompt: String,
    pub fix_user_prompt: String,
    pub qa_system_prompt: String,
    pub qa_user_prompt: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl PromptDetails {
    /// Debug summary with the prompt bodies redacted.
    pub fn redacted_summary(&self) -> String {
        format!(
            "remediation {} vuln {} ({}, {}): fix prompts [REDACTED - {}/{} chars], qa prompts [REDACTED - {}/{} chars]",
            self.remediation_id,
            self.vulnerability_uuid,
            self.vulnerability_rule_name,
            self.vulnerability_severity,
            self.fix_system_prompt.len(),
            self.fix_user_prompt.len(),
            self.qa_system_prompt.len(),
            self.qa_user_prompt.len(),
        )
    }
}

/// Remediation credit usage reported by the backend.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditTracking {
    pub credits_issued: u64,
    pub credits_used: u64,
}

impl CreditTracking {
    pub fn credits_remaining(&self) -> u64 {
        self.credits_issued.saturating_sub(self.credits_used)
    }

    pub fn is_exhausted(&self) -> bool {
        self.credits_remaining() == 0
    }

    /// Warn when exhausted or within 10% of the issued allotment.
    pub fn should_warn(&self) -> bool {
        self.is_exhausted() || self.credits_remaining() * 10 <= self.credits_issued
    }

    pub fn warning_message(&self) -> String {
        if self.is_exhausted() {
            "Remediation credits are exhausted. Contact your account team to request additional credits.".to_string()
        } else {
            format!(
                "Only {} remediation credit(s) remaining out of {}.",
                self.credits_remaining(),
                self.credits_issued
            )
        }
    }

    pub fn to_log_message(&self) -> String {
        format!(
            "Remediation credits: {} used of {} issued ({} remaining)",
            self.credits_used,
            self.credits_issued,
            self.credits_remaining()
        )
    }

    /// Projected usage after the PR about to be opened.
    pub fn with_incremented_usage(self) -> Self {
        Self {
            credits_used: self.credits_used.saturating_add(1),
            ..self
        }
    }

    /// Markdown section appended to PR bodies.
    pub fn to_pr_body_section(&self) -> String {
        format!(
            "\n\n---\n*{} of {} remediation credits used ({} remaining).*\n",
            self.credits_used,
            self.credits_issued,
            self.credits_remaining()
        )
    }
}

#[cfg(test)]
#[path = "models_tests.rs"]
mod tests;
