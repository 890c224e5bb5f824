// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Telemetry log implementation.

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;

use crate::report::summary_report;

/// Token and cost totals for one agent run.
#[derive(Clone, Copy, Debug, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TokenStats {
    pub total_tokens: u64,
    pub total_cost: f64,
}

/// One agent execution recorded for the backend.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentEvent {
    pub start_time: String,
    pub duration_ms: u64,
    pub agent_type: String,
    pub result: String,
    pub actions: Vec<serde_json::Value>,
    pub total_tokens: u64,
    pub total_cost: f64,
}

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct VulnInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    vuln_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    vuln_rule: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResultInfo {
    pr_created: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    ai_summary_report: Option<String>,
    qa_attempts: u32,
    agent_events: Vec<AgentEvent>,
}

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct AdditionalAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    remediation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    agent_name: Option<String>,
    #[serde(flatten)]
    tokens: TokenStats,
}

#[derive(Debug, Default)]
struct TelemetryState {
    vuln_info: VulnInfo,
    result_info: ResultInfo,
    additional: AdditionalAttributes,
    log_messages: Vec<String>,
}

/// Thread-safe telemetry accumulator.
///
/// Cloning produces another handle onto the same underlying state, so the
/// output layer, the agent executor, and the run loop can all feed the same
/// payload.
#[derive(Clone)]
pub struct TelemetryLog {
    state: Arc<Mutex<TelemetryState>>,
}

impl TelemetryLog {
    /// Create a new, empty telemetry log.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(TelemetryState::default())),
        }
    }

    /// Record the vulnerability under remediation.
    pub fn set_vuln(&self, vuln_id: &str, vuln_rule: &str) {
        let mut state = self.state.lock();
        state.vuln_info.vuln_id = Some(vuln_id.to_string());
        state.vuln_info.vuln_rule = Some(vuln_rule.to_string());
    }

    /// Record the remediation id the backend assigned to this attempt.
    pub fn set_remediation_id(&self, remediation_id: &str) {
        self.state.lock().additional.remediation_id = Some(remediation_id.to_string());
    }

    /// Remediation id recorded for the current attempt, if any.
    pub fn remediation_id(&self) -> Option<String> {
        self.state.lock().additional.remediation_id.clone()
    }

    /// Record the agent name. Retained across per-vulnerability resets.
    pub fn set_agent_name(&self, name: &str) {
        self.state.lock().additional.agent_name = Some(name.to_string());
    }

    /// Record whether a PR was created for the current vulnerability.
    pub fn set_pr_created(&self, created: bool) {
        self.state.lock().result_info.pr_created = created;
    }

    /// Derive and store the short summary report from a PR body.
    pub fn set_summary_from_body(&self, body: &str) {
        self.state.lock().result_info.ai_summary_report = Some(summary_report(body));
    }

    /// Record how many QA attempts the session used.
    pub fn set_qa_attempts(&self, attempts: u32) {
        self.state.lock().result_info.qa_attempts = attempts;
    }

    /// Append one agent execution record.
    pub fn add_agent_event(&self, event: AgentEvent) {
        let mut state = self.state.lock();
        state.additional.tokens.total_tokens += event.total_tokens;
        state.additional.tokens.total_cost += event.total_cost;
        state.result_info.agent_events.push(event);
    }

    /// Append one log line to the run's log buffer.
    pub fn add_log_message(&self, message: &str) {
        self.state.lock().log_messages.push(message.to_string());
    }

    /// Log lines accumulated so far.
    pub fn log_messages(&self) -> Vec<String> {
        self.state.lock().log_messages.clone()
    }

    /// Token totals accumulated so far.
    pub fn token_stats(&self) -> TokenStats {
        self.state.lock().additional.tokens
    }

    /// Reset per-vulnerability state between loop iterations.
    ///
    /// Config-level attributes (the agent name) survive the reset; everything
    /// scoped to one remediation attempt is cleared.
    pub fn reset_vuln_specific(&self) {
        let mut state = self.state.lock();
        let agent_name = state.additional.agent_name.take();
        *state = TelemetryState::default();
        state.additional.agent_name = agent_name;
    }

    /// Serialize the full payload for the telemetry POST.
    pub fn snapshot(&self) -> serde_json::Value {
        let state = self.state.lock();
        serde_json::json!({
            "vulnInfo": state.vuln_info,
            "resultInfo": state.result_info,
            "additionalAttributes": state.additional,
            "logMessages": state.log_messages,
        })
    }
}

impl Default for TelemetryLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
