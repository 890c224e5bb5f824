// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Model client seam and the HTTP implementation against the backend proxy.

use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::config::Config;
use crate::util::normalize_host;

/// Model used when the backend provides the LLM and no override is set.
pub const DEFAULT_BACKEND_MODEL: &str = "claude-sonnet-4-5";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);
const TEMPERATURE: f64 = 0.2;

/// Agent failure.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("model request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("model returned an unusable response: {0}")]
    InvalidResponse(String),

    #[error("agent exceeded the event limit of {limit}")]
    EventLimit { limit: u32 },
}

/// One tool invocation requested by the model.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub input: serde_json::Value,
}

/// Result of a dispatched tool call, fed back to the model.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolResult {
    pub call_id: String,
    pub name: String,
    pub content: String,
    pub is_error: bool,
}

/// Transcript entry for one conversation turn.
#[derive(Clone, Debug)]
pub enum ChatMessage {
    User(String),
    Assistant {
        text: Option<String>,
        tool_calls: Vec<ToolCall>,
    },
    Tool(ToolResult),
}

/// Token counts for one model call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_read_tokens: u64,
    pub cache_write_tokens: u64,
}

/// What the model produced in one turn.
#[derive(Clone, Debug, Default)]
pub struct ModelTurn {
    pub text: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub usage: TokenUsage,
}

/// One chat turn sent to the model.
pub struct ChatRequest<'a> {
    pub system: &'a str,
    pub messages: &'a [ChatMessage],
    pub tools: &'a [serde_json::Value],
    pub session_id: Option<&'a str>,
}

/// Model client seam. Tests script turns; production speaks HTTP.
pub trait ModelClient: Send + Sync {
    fn complete(
        &self,
        request: ChatRequest<'_>,
    ) -> impl Future<Output = Result<ModelTurn, AgentError>> + Send;
}

#[derive(Deserialize)]
struct WireToolFunction {
    name: String,
    arguments: String,
}

#[derive(Deserialize)]
struct WireToolCall {
    id: String,
    function: WireToolFunction,
}

#[derive(Deserialize)]
struct WireMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireMessage,
}

#[derive(Deserialize, Default)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    cache_read_input_tokens: u64,
    #[serde(default)]
    cache_creation_input_tokens: u64,
}

#[derive(Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

/// Chat-completions client for the backend's LLM proxy.
pub struct HttpModelClient {
    http: reqwest::Client,
    endpoint: String,
    auth_key: String,
    api_key: String,
    user_agent: String,
    model: String,
}

impl HttpModelClient {
    /// Client against the scanner backend's proxy endpoint.
    pub fn for_backend(config: &Config) -> Self {
        let origin = format!("https://{}", normalize_host(&config.scanner.host));
        Self::with_endpoint(config, format!("{}/api/v4/llm/chat/completions", origin))
    }

    /// Client against an explicit endpoint. Used by tests.
    pub fn with_endpoint(config: &Config, endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            endpoint: endpoint.into(),
            auth_key: config.scanner.auth_key.clone(),
            api_key: config.scanner.api_key.clone(),
            user_agent: config.user_agent(),
            model: config
                .agent_model
                .clone()
                .unwrap_or_else(|| DEFAULT_BACKEND_MODEL.to_string()),
        }
    }

    fn wire_messages(system: &str, messages: &[ChatMessage]) -> Vec<serde_json::Value> {
        let mut wire = vec![serde_json::json!({ "role": "system", "content": system })];
        for message in messages {
            match message {
                ChatMessage::User(text) => {
                    wire.push(serde_json::json!({ "role": "user", "content": text }));
                }
                ChatMessage::Assistant { text, tool_calls } => {
                    let calls: Vec<serde_json::Value> = tool_calls
                        .iter()
                        .map(|call| {
                            serde_json::json!({
                                "id": call.id,
                                "type": "function",
                                "function": {
                                    "name": call.name,
                                    "arguments": call.input.to_string(),
                                }
                            })
                        })
                        .collect();
                    let mut entry = serde_json::json!({
                        "role": "assistant",
                        "content": text,
                    });
                    if !calls.is_empty() {
                        entry["tool_calls"] = serde_json::Value::Array(calls);
                    }
                    wire.push(entry);
                }
                ChatMessage::Tool(result) => {
                    wire.push(serde_json::json!({
                        "role": "tool",
                        "tool_call_id": result.call_id,
                        "content": result.content,
                    }));
                }
            }
        }
        wire
    }
}

impl ModelClient for HttpModelClient {
    async fn complete(&self, request: ChatRequest<'_>) -> Result<ModelTurn, AgentError> {
        let payload = serde_json::json!({
            "model": self.model,
            "temperature": TEMPERATURE,
            "stream": false,
            "messages": Self::wire_messages(request.system, request.messages),
            "tools": request.tools,
        });

        let mut http_request = self
            .http
            .post(&self.endpoint)
            .header("Authorization", &self.auth_key)
            .header("Api-Key", &self.api_key)
            .header("User-Agent", &self.user_agent);
        if let Some(session_id) = request.session_id {
            http_request = http_request.header("x-llm-session-id", session_id);
        }

        let response = http_request.json(&payload).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::InvalidResponse(format!(
                "status {}: {}",
                status, body
            )));
        }

        let wire: WireResponse = response.json().await?;
        let usage = wire.usage.unwrap_or_default();
        let choice = wire
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::InvalidResponse("no choices in response".to_string()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .into_iter()
            .map(|call| ToolCall {
                id: call.id,
                name: call.function.name,
                input: serde_json::from_str(&call.function.arguments)
                    .unwrap_or(serde_json::Value::Null),
            })
            .collect();

        Ok(ModelTurn {
            text: choice.message.content.filter(|text| !text.is_empty()),
            tool_calls,
            usage: TokenUsage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
                cache_read_tokens: usage.cache_read_input_tokens,
                cache_write_tokens: usage.cache_creation_input_tokens,
            },
        })
    }
}

#[cfg(test)]
pub mod testing {
    //! Scripted model for unit tests above the model seam.

    use std::collections::VecDeque;

    use parking_lot::Mutex;

    use super::{AgentError, ChatRequest, ModelClient, ModelTurn};

    /// Replays queued turns and records every request's user-visible shape.
    #[derive(Default)]
    pub struct ScriptedModel {
        turns: Mutex<VecDeque<ModelTurn>>,
        requests: Mutex<Vec<usize>>,
    }

    impl ScriptedModel {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue the next turn.
        pub fn push(&self, turn: ModelTurn) {
            self.turns.lock().push_back(turn);
        }

        /// Queue a final text-only turn.
        pub fn push_text(&self, text: &str) {
            self.push(ModelTurn {
                text: Some(text.to_string()),
                ..ModelTurn::default()
            });
        }

        /// Message counts seen per request, in order.
        pub fn request_lengths(&self) -> Vec<usize> {
            self.requests.lock().clone()
        }
    }

    impl ModelClient for ScriptedModel {
        async fn complete(&self, request: ChatRequest<'_>) -> Result<ModelTurn, AgentError> {
            self.requests.lock().push(request.messages.len());
            self.turns.lock().pop_front().ok_or_else(|| {
                AgentError::InvalidResponse("scripted model ran out of turns".to_string())
            })
        }
    }
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
