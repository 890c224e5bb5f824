// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Agent event loop.
//!
//! Drives one agent (fix or QA) to completion: send the transcript, process
//! text and tool-call events, dispatch tools, feed results back. Every event
//! counts against the hard per-agent cap, and the whole run is recorded as
//! one telemetry agent event.

use std::time::Instant;

use crate::exec::Runner;
use crate::output;
use crate::telemetry::{AgentEvent, TelemetryLog};

use super::model::{AgentError, ChatMessage, ChatRequest, ModelClient, ToolResult};
use super::stats::TokenCostAccumulator;
use super::tools::ToolDispatcher;

/// Which agent phase is running.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgentType {
    Fix,
    Qa,
}

impl AgentType {
    fn as_str(self) -> &'static str {
        match self {
            Self::Fix => "FIX",
            Self::Qa => "QA",
        }
    }
}

/// Result of one completed agent run.
#[derive(Clone, Debug)]
pub struct AgentRun {
    /// The agent's final message.
    pub final_text: String,
    /// Token and cost totals for this run.
    pub stats: TokenCostAccumulator,
}

/// Executor for one agent phase.
pub struct AgentExecutor<'a, M, R> {
    model: &'a M,
    tools: &'a ToolDispatcher<R>,
    telemetry: &'a TelemetryLog,
    max_events: u32,
}

impl<'a, M: ModelClient, R: Runner> AgentExecutor<'a, M, R> {
    pub fn new(
        model: &'a M,
        tools: &'a ToolDispatcher<R>,
        telemetry: &'a TelemetryLog,
        max_events: u32,
    ) -> Self {
        Self {
            model,
            tools,
            telemetry,
            max_events,
        }
    }

    /// Run the agent until it produces a final message.
    ///
    /// Returns [`AgentError::EventLimit`] when the event cap is hit; the
    /// telemetry agent event is recorded either way.
    pub async fn run(
        &self,
        agent_type: AgentType,
        system_prompt: &str,
        user_prompt: &str,
        session_id: Option<&str>,
    ) -> Result<AgentRun, AgentError> {
        let started = Instant::now();
        let start_time = chrono::Utc::now().to_rfc3339();
        output::log(format!(
            "Running {} agent to analyze the vulnerability...",
            agent_type.as_str()
        ));

        let tool_specs = self.tools.specs();
        let mut messages = vec![ChatMessage::User(user_prompt.to_string())];
        let mut stats = TokenCostAccumulator::new();
        let mut actions: Vec<serde_json::Value> = Vec::new();
        let mut current_tool_calls: Vec<serde_json::Value> = Vec::new();
        let mut event_count: u32 = 0;
        let mut final_text = String::new();
        let mut run_result = "ERROR";

        let outcome = loop {
            let turn = match self
                .model
                .complete(ChatRequest {
                    system: system_prompt,
                    messages: &messages,
                    tools: &tool_specs,
                    session_id,
                })
                .await
            {
                Ok(turn) => turn,
                Err(e) => break Err(e),
            };
            stats.add_usage(turn.usage);

            if let Some(ref text) = turn.text {
                event_count += 1;
                output::debug_log(format!(
                    "Agent event #{} ({}): message",
                    event_count,
                    agent_type.as_str()
                ));
                output::log(format!("{} agent: {}", agent_type.as_str(), text));
                actions.push(serde_json::json!({
                    "llmAction": { "summary": text },
                    "toolCalls": std::mem::take(&mut current_tool_calls),
                }));
                final_text = text.clone();
            }

            if event_count > self.max_events {
                break Err(AgentError::EventLimit {
                    limit: self.max_events,
                });
            }

            if turn.tool_calls.is_empty() {
                run_result = "SUCCESS";
                break Ok(());
            }

            messages.push(ChatMessage::Assistant {
                text: turn.text.clone(),
                tool_calls: turn.tool_calls.clone(),
            });

            let mut limit_hit = false;
            for call in &turn.tool_calls {
                event_count += 1;
                let _section = output::group(format!(
                    "{} agent calling tool {}",
                    agent_type.as_str(),
                    call.name
                ));
                output::log(format!("Tool call: {} args: {}", call.name, call.input));

                let result = self.tools.dispatch(call).await;
                event_count += 1;
                self.log_tool_result(agent_type, &result);
                let status = if result.is_error { "FAILURE" } else { "SUCCESS" };
                current_tool_calls.push(serde_json::json!({
                    "tool": result.name,
                    "result": status,
                }));
                messages.push(ChatMessage::Tool(result));

                if event_count > self.max_events {
                    limit_hit = true;
                    break;
                }
            }
            if limit_hit {
                break Err(AgentError::EventLimit {
                    limit: self.max_events,
                });
            }
        };

        if matches!(outcome, Err(AgentError::EventLimit { .. })) {
            run_result = "EXCEEDED_EVENTS";
            output::warn(format!(
                "Reached the maximum event limit of {} for the {} agent. Stopping early.",
                self.max_events,
                agent_type.as_str()
            ));
        }

        if !current_tool_calls.is_empty() {
            actions.push(serde_json::json!({
                "llmAction": { "summary": final_text },
                "toolCalls": current_tool_calls,
            }));
        }

        output::debug_log(stats.summary().to_string());
        self.telemetry.add_agent_event(AgentEvent {
            start_time,
            duration_ms: started.elapsed().as_millis() as u64,
            agent_type: agent_type.as_str().to_string(),
            result: run_result.to_string(),
            actions,
            total_tokens: stats.total_tokens(),
            total_cost: stats.total_cost(),
        });
        output::log(format!("{} agent run finished.", agent_type.as_str()));

        outcome.map(|()| AgentRun { final_text, stats })
    }

    fn log_tool_result(&self, agent_type: AgentType, result: &ToolResult) {
        let _section = output::group(format!(
            "Response from tool {} for {} agent",
            result.name,
            agent_type.as_str()
        ));
        if result.is_error {
            output::log(format!("Tool result: {} -> error: {}", result.name, result.content));
        } else {
            output::debug_log(format!("Tool result: {} -> ok", result.name));
        }
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
