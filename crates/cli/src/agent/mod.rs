// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! LLM-backed coding agent.
//!
//! The executor drives fix and QA agents as event loops over a
//! [`ModelClient`], dispatching repository tools and recording every event
//! into telemetry. A hard per-agent event cap bounds runaway sessions.

mod executor;
mod model;
mod session;
mod stats;
mod tools;

pub use executor::{AgentExecutor, AgentRun, AgentType};
#[cfg(test)]
pub use model::testing;
pub use model::{
    AgentError, ChatMessage, ChatRequest, HttpModelClient, ModelClient, ModelTurn, TokenUsage,
    ToolCall, ToolResult,
};
pub use session::{extract_pr_body, AgentSession, SessionOutcome, SessionRunner, SessionSettings};
pub use stats::TokenCostAccumulator;
pub use tools::ToolDispatcher;
