// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Environment preparation and test dispatch.
//!
//! The bootstrap is deliberately linear: verify preconditions, install the
//! locked dependency set into an isolated directory, export the mock
//! variables, and hand control to the test runner. Any command failure is
//! fatal and its exit code is propagated unchanged.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;

use crate::mockenv::MOCK_ENV;

/// Pinned-dependency manifest expected at the workspace root.
pub const LOCK_FILE: &str = "Cargo.lock";

/// Isolated environment directory, reused across invocations if present.
pub const ENV_DIR: &str = ".testenv";

/// Default installer / test runner tool.
const DEFAULT_TOOL: &str = "cargo";

/// Precondition and spawn failures. All are fatal with exit code 1.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("{LOCK_FILE} not found at {}; run from the workspace root", .path.display())]
    MissingLockFile { path: PathBuf },

    #[error("`{tool}` not found on PATH; install Rust from https://rustup.rs/")]
    InstallerNotFound { tool: String },

    #[error("failed to create {}: {source}", .path.display())]
    CreateEnvDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to run `{tool}`: {source}")]
    Spawn {
        tool: String,
        source: std::io::Error,
    },
}

/// Test environment bootstrap.
///
/// The tool name and PATH are overridable so the contract can be exercised
/// against stub executables in a temporary directory.
pub struct Bootstrap {
    workspace_root: PathBuf,
    tool: String,
    path_override: Option<OsString>,
    skip_install: bool,
    targets: Vec<String>,
}

impl Bootstrap {
    /// Create a bootstrap rooted at the given workspace directory.
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            tool: DEFAULT_TOOL.to_string(),
            path_override: None,
            skip_install: false,
            targets: Vec::new(),
        }
    }

    /// Skip the installation steps entirely.
    pub fn skip_install(mut self, skip: bool) -> Self {
        self.skip_install = skip;
        self
    }

    /// Run only the named integration test targets, in order.
    pub fn targets(mut self, targets: Vec<String>) -> Self {
        self.targets = targets;
        self
    }

    /// Override the installer / runner tool name.
    pub fn tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = tool.into();
        self
    }

    /// Override the PATH used for tool lookup and for the child processes.
    pub fn path_override(mut self, path: impl AsRef<std::ffi::OsStr>) -> Self {
        self.path_override = Some(path.as_ref().to_os_string());
        self
    }

    /// Run the bootstrap: install (unless skipped), then dispatch tests.
    ///
    /// Returns the exit code of the last delegated command. Precondition
    /// failures surface as [`BootstrapError`] before any command runs.
    pub fn run(&self) -> Result<i32, BootstrapError> {
        if !self.skip_install {
            let code = self.install()?;
            if code != 0 {
                return Ok(code);
            }
        }
        self.dispatch()
    }

    /// Verify preconditions and install the locked dependency set.
    fn install(&self) -> Result<i32, BootstrapError> {
        let lock_path = self.workspace_root.join(LOCK_FILE);
        if !lock_path.is_file() {
            return Err(BootstrapError::MissingLockFile { path: lock_path });
        }

        if self.find_tool_on_path().is_none() {
            return Err(BootstrapError::InstallerNotFound {
                tool: self.tool.clone(),
            });
        }

        let env_dir = self.env_dir();
        if !env_dir.is_dir() {
            std::fs::create_dir_all(&env_dir).map_err(|source| BootstrapError::CreateEnvDir {
                path: env_dir.clone(),
                source,
            })?;
        }

        let mut command = Command::new(&self.tool);
        command
            .current_dir(&self.workspace_root)
            .args(["fetch", "--locked"])
            .env("CARGO_HOME", &env_dir);
        self.spawn(command)
    }

    /// Run the selected test runner with the mock environment exported.
    fn dispatch(&self) -> Result<i32, BootstrapError> {
        let mut command = Command::new(self.select_runner());
        command.current_dir(&self.workspace_root).arg("test");

        if self.targets.is_empty() {
            command.arg("--tests");
        } else {
            for target in &self.targets {
                command.args(["--test", target]);
            }
        }

        for (name, value) in MOCK_ENV {
            command.env(name, value);
        }

        self.spawn(command)
    }

    /// Prefer a runner installed inside the isolated environment.
    fn select_runner(&self) -> PathBuf {
        let local = self.env_dir().join("bin").join(&self.tool);
        if local.is_file() {
            local
        } else {
            PathBuf::from(&self.tool)
        }
    }

    fn env_dir(&self) -> PathBuf {
        self.workspace_root.join(ENV_DIR)
    }

    fn spawn(&self, mut command: Command) -> Result<i32, BootstrapError> {
        if let Some(ref path) = self.path_override {
            command.env("PATH", path);
        }
        let status = command.status().map_err(|source| BootstrapError::Spawn {
            tool: self.tool.clone(),
            source,
        })?;
        Ok(status.code().unwrap_or(1))
    }

    /// Locate the tool on PATH (or verify an explicit path exists).
    fn find_tool_on_path(&self) -> Option<PathBuf> {
        let tool = Path::new(&self.tool);
        if tool.components().count() > 1 {
            return tool.is_file().then(|| tool.to_path_buf());
        }

        let path = match self.path_override {
            Some(ref p) => p.clone(),
            None => std::env::var_os("PATH")?,
        };
        std::env::split_paths(&path)
            .map(|dir| dir.join(tool))
            .find(|candidate| candidate.is_file())
    }
}

#[cfg(test)]
#[path = "bootstrap_tests.rs"]
mod tests;
