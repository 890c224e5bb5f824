// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Repository tools exposed to the agent.
//!
//! Tool failures are returned to the model as error results, never surfaced
//! as process errors. Paths are confined to the repository root, and build
//! commands proposed by the model go through the allowlist validator before
//! anything runs them.

use std::path::{Component, Path, PathBuf};

use crate::exec::{CommandSpec, Runner};
use crate::util::tail_string;
use crate::validation::validate_command;

use super::model::{ToolCall, ToolResult};

/// Build output fed back to the model is clipped to its tail.
const BUILD_OUTPUT_LIMIT: usize = 10_000;

/// Directory listings are capped to keep transcripts small.
const LIST_DIR_LIMIT: usize = 200;

/// Tool dispatcher bound to one repository checkout.
pub struct ToolDispatcher<R> {
    pub(crate) runner: R,
    repo_root: PathBuf,
    build_command: Option<String>,
}

impl<R: Runner> ToolDispatcher<R> {
    pub fn new(runner: R, repo_root: impl Into<PathBuf>, build_command: Option<String>) -> Self {
        Self {
            runner,
            repo_root: repo_root.into(),
            build_command,
        }
    }

    /// Tool schemas advertised to the model.
    pub fn specs(&self) -> Vec<serde_json::Value> {
        [
            (
                "read_file",
                "Read a file from the repository",
                serde_json::json!({
                    "type": "object",
                    "properties": { "path": { "type": "string" } },
                    "required": ["path"]
                }),
            ),
            (
                "write_file",
                "Write a file in the repository, creating parent directories",
                serde_json::json!({
                    "type": "object",
                    "properties": {
                        "path": { "type": "string" },
                        "content": { "type": "string" }
                    },
                    "required": ["path", "content"]
                }),
            ),
            (
                "list_dir",
                "List a repository directory",
                serde_json::json!({
                    "type": "object",
                    "properties": { "path": { "type": "string" } },
                    "required": ["path"]
                }),
            ),
            (
                "run_build",
                "Run the configured build command, or a proposed one",
                serde_json::json!({
                    "type": "object",
                    "properties": { "command": { "type": "string" } }
                }),
            ),
        ]
        .into_iter()
        .map(|(name, description, parameters)| {
            serde_json::json!({
                "type": "function",
                "function": {
                    "name": name,
                    "description": description,
                    "parameters": parameters,
                }
            })
        })
        .collect()
    }

    /// Execute one tool call.
    pub async fn dispatch(&self, call: &ToolCall) -> ToolResult {
        let outcome = match call.name.as_str() {
            "read_file" => self.read_file(call).await,
            "write_file" => self.write_file(call).await,
            "list_dir" => self.list_dir(call).await,
            "run_build" => self.run_build(call).await,
            other => Err(format!("unknown tool: {}", other)),
        };

        match outcome {
            Ok(content) => ToolResult {
                call_id: call.id.clone(),
                name: call.name.clone(),
                content,
                is_error: false,
            },
            Err(message) => ToolResult {
                call_id: call.id.clone(),
                name: call.name.clone(),
                content: message,
                is_error: true,
            },
        }
    }

    /// Run the build and return its combined output and status.
    ///
    /// Used both as a model tool and directly by the QA loop.
    pub async fn run_build_command(&self, command: &str) -> (bool, String) {
        let spec = CommandSpec::shell(command).cwd(&self.repo_root);
        match self.runner.run(spec).await {
            Ok(result) => {
                let combined = format!("{}{}", result.stdout, result.stderr);
                (result.success(), tail_string(&combined, BUILD_OUTPUT_LIMIT))
            }
            Err(e) => (false, e.to_string()),
        }
    }

    /// The configured build command, if any.
    pub fn build_command(&self) -> Option<&str> {
        self.build_command.as_deref()
    }

    async fn read_file(&self, call: &ToolCall) -> Result<String, String> {
        let path = self.resolve_path(call, "path")?;
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| format!("cannot read {}: {}", path.display(), e))
    }

    async fn write_file(&self, call: &ToolCall) -> Result<String, String> {
        let path = self.resolve_path(call, "path")?;
        let content = str_arg(call, "content")?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| format!("cannot create {}: {}", parent.display(), e))?;
        }
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| format!("cannot write {}: {}", path.display(), e))?;
        Ok(format!("wrote {} bytes", content.len()))
    }

    async fn list_dir(&self, call: &ToolCall) -> Result<String, String> {
        let path = self.resolve_path(call, "path")?;
        let mut entries = tokio::fs::read_dir(&path)
            .await
            .map_err(|e| format!("cannot list {}: {}", path.display(), e))?;

        let mut names = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            let suffix = match entry.file_type().await {
                Ok(file_type) if file_type.is_dir() => "/",
                _ => "",
            };
            names.push(format!("{}{}", entry.file_name().to_string_lossy(), suffix));
            if names.len() >= LIST_DIR_LIMIT {
                names.push("...".to_string());
                break;
            }
        }
        names.sort();
        Ok(names.join("\n"))
    }

    async fn run_build(&self, call: &ToolCall) -> Result<String, String> {
        let command = match call.input.get("command").and_then(|v| v.as_str()) {
            // A command proposed by the model is untrusted input.
            Some(proposed) => {
                validate_command("detected build command", proposed)
                    .map_err(|e| e.to_string())?;
                proposed.to_string()
            }
            None => self
                .build_command
                .clone()
                .ok_or_else(|| "no build command is configured".to_string())?,
        };

        let (success, tail) = self.run_build_command(&command).await;
        if success {
            Ok(format!("build succeeded\n{}", tail))
        } else {
            Err(format!("build failed\n{}", tail))
        }
    }

    /// Resolve a tool path argument inside the repository root.
    fn resolve_path(&self, call: &ToolCall, key: &str) -> Result<PathBuf, String> {
        let raw = str_arg(call, key)?;
        let relative = Path::new(raw);
        if relative.is_absolute() {
            return Err(format!("{} must be relative to the repository root", key));
        }
        if relative
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(format!("{} must not traverse outside the repository", key));
        }
        Ok(self.repo_root.join(relative))
    }
}

fn str_arg<'a>(call: &'a ToolCall, key: &str) -> Result<&'a str, String> {
    call.input
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| format!("missing required argument: {}", key))
}

#[cfg(test)]
#[path = "tools_tests.rs"]
mod tests;
