// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess execution seam.
//!
//! Git, GitHub CLI, and build commands all run through the [`Runner`] trait
//! so the modules above it can be exercised against scripted fakes. The
//! production [`ProcessRunner`] captures output, masks the GitHub token in
//! every logged command line, and never treats a non-zero exit as an error;
//! callers decide what failure means.

use std::future::Future;
use std::path::PathBuf;

use thiserror::Error;

use crate::output;
use crate::util::{mask_secret, tail_string};

/// Output shown in debug logs is clipped to keep Actions logs readable.
const LOG_CLIP: usize = 1000;

/// A command to run, with its environment additions and working directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            cwd: None,
        }
    }

    /// A shell invocation, for commands that use chain operators.
    pub fn shell(command: impl Into<String>) -> Self {
        Self::new("sh").arg("-c").arg(command)
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((name.into(), value.into()));
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Full command line for logs, with the given secret masked.
    pub fn display_masked(&self, secret: &str) -> String {
        let line = std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");
        mask_secret(&line, secret)
    }
}

/// Captured result of a finished subprocess.
#[derive(Clone, Debug, Default)]
pub struct CommandOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Trimmed stdout, the way `git` output is consumed.
    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.trim()
    }
}

/// Subprocess failure: the command could not be run at all.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
}

/// Command execution seam.
pub trait Runner: Send + Sync {
    fn run(&self, spec: CommandSpec)
        -> impl Future<Output = Result<CommandOutput, ExecError>> + Send;
}

impl<T: Runner> Runner for std::sync::Arc<T> {
    async fn run(&self, spec: CommandSpec) -> Result<CommandOutput, ExecError> {
        (**self).run(spec).await
    }
}

/// Production runner over `tokio::process`.
#[derive(Clone, Debug, Default)]
pub struct ProcessRunner {
    /// Secret masked out of every logged command line.
    secret: String,
}

impl ProcessRunner {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl Runner for ProcessRunner {
    async fn run(&self, spec: CommandSpec) -> Result<CommandOutput, ExecError> {
        let _section = output::group(format!(
            "Running command: {}",
            spec.display_masked(&self.secret)
        ));

        let mut command = tokio::process::Command::new(&spec.program);
        command.args(&spec.args);
        for (name, value) in &spec.env {
            command.env(name, value);
        }
        if let Some(ref cwd) = spec.cwd {
            command.current_dir(cwd);
        }

        let raw = command
            .output()
            .await
            .map_err(|source| ExecError::Spawn {
                program: spec.program.clone(),
                source,
            })?;

        let result = CommandOutput {
            code: raw.status.code().unwrap_or(1),
            stdout: String::from_utf8_lossy(&raw.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&raw.stderr).into_owned(),
        };

        output::debug_log(format!("  Return code: {}", result.code));
        if !result.stdout.trim().is_empty() {
            output::debug_log(format!(
                "  Command stdout:\n---\n{}\n---",
                tail_string(result.stdout.trim(), LOG_CLIP)
            ));
        }
        if !result.stderr.trim().is_empty() {
            let clipped = tail_string(result.stderr.trim(), LOG_CLIP);
            if result.success() {
                output::debug_log(format!("  Command stderr:\n---\n{}\n---", clipped));
            } else {
                output::error(format!("  Command stderr:\n---\n{}\n---", clipped));
            }
        }

        Ok(result)
    }
}


#[cfg(test)]
#[path = "exec_tests.rs"]
mod tests;
