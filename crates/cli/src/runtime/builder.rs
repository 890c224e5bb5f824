// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! RuntimeBuilder for wiring configuration into a Runtime.

use std::sync::Arc;

use thiserror::Error;

use crate::agent::HttpModelClient;
use crate::api::ApiClient;
use crate::config::{Config, ConfigError, RunTask};
use crate::exec::ProcessRunner;
use crate::output;
use crate::telemetry::TelemetryLog;

use super::core::Runtime;

/// Failure while assembling the runtime.
#[derive(Debug, Error)]
pub enum RuntimeBuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Builder for [`Runtime`] instances.
pub struct RuntimeBuilder {
    config: Config,
}

impl RuntimeBuilder {
    /// Start from resolved configuration.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Start from the process environment.
    pub fn from_process_env() -> Result<Self, RuntimeBuildError> {
        Ok(Self::new(Config::from_process_env()?))
    }

    /// Override the run task (CLI flag beats environment).
    pub fn with_task(mut self, task: Option<RunTask>) -> Self {
        if let Some(task) = task {
            self.config.run_task = task;
        }
        self
    }

    /// Force debug logging on.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.config.debug_mode = self.config.debug_mode || debug;
        self
    }

    /// Access the resolved configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Wire up telemetry, logging, API client, git, and the model client.
    pub fn build(self) -> Runtime<ProcessRunner, HttpModelClient> {
        let telemetry = TelemetryLog::new();
        output::init(self.config.debug_mode, telemetry.clone());
        self.config.log_initial_settings();

        let runner = Arc::new(ProcessRunner::new(self.config.github_token.clone()));
        let api = ApiClient::new(&self.config);
        let model = HttpModelClient::for_backend(&self.config);

        Runtime::new(self.config, telemetry, api, runner, model)
    }
}

#[cfg(test)]
#[path = "builder_tests.rs"]
mod tests;
