// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Run configuration from the Actions environment.
//!
//! Configuration is read from an environment snapshot so tests can construct
//! a [`Config`] from an arbitrary map. With `TESTING=true`, every required
//! variable falls back to a mock default.

use std::collections::HashMap;
use std::path::PathBuf;

use clap::ValueEnum;
use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::env;
use crate::output;
use crate::util::normalize_host;

/// Crate version baked into the user agent.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Configuration failure. Fatal before the run starts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    MissingVar(&'static str),
}

/// Task selected for this invocation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum RunTask {
    /// Pull remediation work and open fix PRs.
    #[default]
    #[value(name = "generate-fix")]
    GenerateFix,
    /// Handle a PR merged/closed webhook event.
    #[value(name = "pr-event")]
    PrEvent,
}

impl RunTask {
    fn parse(value: &str) -> Option<Self> {
        match value.replace('_', "-").as_str() {
            "generate-fix" => Some(Self::GenerateFix),
            "pr-event" => Some(Self::PrEvent),
            _ => None,
        }
    }
}

/// Vulnerability severity filter values accepted by the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Note,
}

impl Severity {
    fn parse(value: &str) -> Option<Self> {
        match value.to_uppercase().as_str() {
            "CRITICAL" => Some(Self::Critical),
            "HIGH" => Some(Self::High),
            "MEDIUM" => Some(Self::Medium),
            "LOW" => Some(Self::Low),
            "NOTE" => Some(Self::Note),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL",
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
            Self::Note => "NOTE",
        }
    }
}

/// Credentials for the scanner backend's remediation API.
#[derive(Clone, Debug)]
pub struct ScannerCredentials {
    pub host: String,
    pub org_id: String,
    pub app_id: String,
    pub auth_key: String,
    pub api_key: String,
}

/// Validated, typed run configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub testing: bool,
    pub debug_mode: bool,
    pub base_branch: String,
    pub run_task: RunTask,

    pub github_token: String,
    pub github_repository: String,
    pub github_server_url: String,
    pub github_event_path: Option<PathBuf>,
    pub repo_root: PathBuf,

    pub scanner: ScannerCredentials,

    pub build_command: Option<String>,
    pub formatting_command: Option<String>,
    pub agent_model: Option<String>,
    pub use_backend_llm: bool,

    pub max_qa_attempts: u32,
    pub max_open_prs: u32,
    pub max_events_per_agent: u32,
    pub severities: Vec<Severity>,

    pub skip_qa_review: bool,
    pub skip_security_test: bool,
    pub enable_telemetry: bool,
}

impl Config {
    /// Build configuration from the process environment.
    pub fn from_process_env() -> Result<Self, ConfigError> {
        Self::from_env(&env::snapshot())
    }

    /// Build configuration from an environment snapshot.
    pub fn from_env(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let testing = bool_var(vars, env::TESTING, false);
        let debug_mode = bool_var(vars, env::DEBUG_MODE, false);

        let run_task = var(vars, env::RUN_TASK)
            .and_then(RunTask::parse)
            .unwrap_or_default();

        let base_branch = required(vars, env::BASE_BRANCH, testing, "main")?;

        let github_token = required(vars, env::GITHUB_TOKEN, testing, "mock-token-for-testing")?;
        let github_repository =
            required(vars, env::GITHUB_REPOSITORY, testing, "mock/repo-for-testing")?;
        let github_server_url = required(
            vars,
            env::GITHUB_SERVER_URL,
            testing,
            "https://github.com",
        )?;
        let github_event_path = var(vars, env::GITHUB_EVENT_PATH).map(PathBuf::from);

        let workspace = required(vars, env::GITHUB_WORKSPACE, testing, "/tmp")?;
        let repo_root =
            std::fs::canonicalize(&workspace).unwrap_or_else(|_| PathBuf::from(&workspace));

        let scanner = ScannerCredentials {
            host: required(vars, env::SCANNER_HOST, testing, "test-host")?,
            org_id: required(vars, env::SCANNER_ORG_ID, testing, "test-org")?,
            app_id: required(vars, env::SCANNER_APP_ID, testing, "test-app")?,
            auth_key: required(vars, env::SCANNER_AUTH_KEY, testing, "test-auth")?,
            api_key: required(vars, env::SCANNER_API_KEY, testing, "test-api")?,
        };

        let build_command = match var(vars, env::BUILD_COMMAND) {
            Some(command) => Some(command.to_string()),
            None if testing => Some("echo 'test build command'".to_string()),
            None if run_task == RunTask::GenerateFix => {
                return Err(ConfigError::MissingVar(env::BUILD_COMMAND));
            }
            None => None,
        };
        let formatting_command = var(vars, env::FORMATTING_COMMAND).map(str::to_string);

        // Commands from the workflow configuration come from a human-edited
        // file and skip allowlist validation; only agent-detected commands go
        // through the validator.
        if !testing {
            for (name, command) in [
                (env::BUILD_COMMAND, &build_command),
                (env::FORMATTING_COMMAND, &formatting_command),
            ] {
                if command.is_some() {
                    output::log(format!(
                        "{} from workflow config (trusted source), skipping allowlist validation",
                        name
                    ));
                }
            }
        }

        Ok(Self {
            testing,
            debug_mode,
            base_branch,
            run_task,
            github_token,
            github_repository,
            github_server_url,
            github_event_path,
            repo_root,
            scanner,
            build_command,
            formatting_command,
            agent_model: var(vars, env::AGENT_MODEL).map(str::to_string),
            use_backend_llm: bool_var(vars, env::USE_BACKEND_LLM, true),
            max_qa_attempts: clamped_int(vars, env::MAX_QA_ATTEMPTS, 6, 0, Some(10)),
            max_open_prs: clamped_int(vars, env::MAX_OPEN_PRS, 5, 0, None),
            max_events_per_agent: clamped_int(vars, env::MAX_EVENTS_PER_AGENT, 120, 10, Some(500)),
            severities: parse_severities(var(vars, env::VULNERABILITY_SEVERITIES)),
            skip_qa_review: bool_var(vars, env::SKIP_QA_REVIEW, false),
            skip_security_test: bool_var(vars, env::SKIP_SECURITY_TEST, false),
            enable_telemetry: bool_var(vars, env::ENABLE_TELEMETRY, true),
        })
    }

    /// User agent sent on every backend request.
    pub fn user_agent(&self) -> String {
        format!("fixwright {}", VERSION)
    }

    /// Repository URL as the backend expects it: host plus owner/name.
    pub fn github_repo_url(&self) -> String {
        let host = Url::parse(&self.github_server_url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
            .unwrap_or_else(|| normalize_host(&self.github_server_url));
        format!("{}/{}", host, self.github_repository)
    }

    /// Log the resolved settings. Debug-gated; credentials never appear.
    pub fn log_initial_settings(&self) {
        if !self.debug_mode {
            return;
        }
        output::debug_log(format!("Repository root: {}", self.repo_root.display()));
        output::debug_log(format!("Base branch: {}", self.base_branch));
        output::debug_log(format!("Run task: {:?}", self.run_task));
        output::debug_log(format!("Use backend LLM: {}", self.use_backend_llm));
        if let Some(ref model) = self.agent_model {
            output::debug_log(format!("Agent model: {}", model));
        }
        output::debug_log(format!("Skip QA review: {}", self.skip_qa_review));
        output::debug_log(format!(
            "Skip writing security test: {}",
            self.skip_security_test
        ));
        output::debug_log(format!(
            "Vulnerability severities: {:?}",
            self.severities.iter().map(|s| s.as_str()).collect::<Vec<_>>()
        ));
        output::debug_log(format!("Max QA attempts: {}", self.max_qa_attempts));
        output::debug_log(format!("Max open PRs: {}", self.max_open_prs));
        output::debug_log(format!(
            "Max events per agent: {}",
            self.max_events_per_agent
        ));
        output::debug_log(format!("Telemetry enabled: {}", self.enable_telemetry));
    }
}

fn var<'a>(vars: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    vars.get(name).map(String::as_str).filter(|v| !v.is_empty())
}

fn required(
    vars: &HashMap<String, String>,
    name: &'static str,
    testing: bool,
    mock: &str,
) -> Result<String, ConfigError> {
    match var(vars, name) {
        Some(value) => Ok(value.to_string()),
        None if testing => Ok(mock.to_string()),
        None => Err(ConfigError::MissingVar(name)),
    }
}

fn bool_var(vars: &HashMap<String, String>, name: &str, default: bool) -> bool {
    match var(vars, name) {
        Some(value) => value.eq_ignore_ascii_case("true"),
        None => default,
    }
}

/// Integer setting with warning-on-out-of-range and default-on-unparsable.
fn clamped_int(
    vars: &HashMap<String, String>,
    name: &str,
    default: u32,
    min: u32,
    max: Option<u32>,
) -> u32 {
    let Some(raw) = var(vars, name) else {
        return default;
    };
    let Ok(value) = raw.parse::<i64>() else {
        output::warn(format!("Invalid value for {}. Using default: {}", name, default));
        return default;
    };
    if value < i64::from(min) {
        output::warn(format!(
            "{} ({}) is below minimum ({}). Using {}.",
            name, value, min, min
        ));
        return min;
    }
    if let Some(max) = max {
        if value > i64::from(max) {
            output::warn(format!(
                "{} ({}) is above maximum ({}). Using {}.",
                name, value, max, max
            ));
            return max;
        }
    }
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// Parse the severity filter from its JSON array form.
fn parse_severities(raw: Option<&str>) -> Vec<Severity> {
    let default = vec![Severity::Critical, Severity::High];
    let Some(raw) = raw else {
        return default;
    };

    let parsed: Vec<String> = match serde_json::from_str(raw) {
        Ok(serde_json::Value::Array(values)) => values
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        Ok(_) => {
            output::warn(format!(
                "{} must be a JSON array. Using default.",
                env::VULNERABILITY_SEVERITIES
            ));
            return default;
        }
        Err(_) => {
            output::error(format!(
                "Error parsing {} JSON: {}. Using default.",
                env::VULNERABILITY_SEVERITIES,
                raw
            ));
            return default;
        }
    };

    let validated: Vec<Severity> = parsed.iter().filter_map(|s| Severity::parse(s)).collect();
    if validated.is_empty() {
        output::warn("No valid severity levels provided. Using default.");
        return default;
    }
    validated
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
