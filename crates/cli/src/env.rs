// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable names.
//!
//! All runtime environment variables read by fixwright are named here. The
//! configuration layer works from a snapshot map so tests never touch the
//! process environment.

use std::collections::HashMap;

pub const BASE_BRANCH: &str = "BASE_BRANCH";
pub const RUN_TASK: &str = "RUN_TASK";
pub const DEBUG_MODE: &str = "DEBUG_MODE";
pub const TESTING: &str = "TESTING";

pub const GITHUB_TOKEN: &str = "GITHUB_TOKEN";
pub const GITHUB_REPOSITORY: &str = "GITHUB_REPOSITORY";
pub const GITHUB_SERVER_URL: &str = "GITHUB_SERVER_URL";
pub const GITHUB_EVENT_PATH: &str = "GITHUB_EVENT_PATH";
pub const GITHUB_WORKSPACE: &str = "GITHUB_WORKSPACE";

pub const SCANNER_HOST: &str = "SCANNER_HOST";
pub const SCANNER_ORG_ID: &str = "SCANNER_ORG_ID";
pub const SCANNER_APP_ID: &str = "SCANNER_APP_ID";
pub const SCANNER_AUTH_KEY: &str = "SCANNER_AUTH_KEY";
pub const SCANNER_API_KEY: &str = "SCANNER_API_KEY";

pub const BUILD_COMMAND: &str = "BUILD_COMMAND";
pub const FORMATTING_COMMAND: &str = "FORMATTING_COMMAND";
pub const AGENT_MODEL: &str = "AGENT_MODEL";
pub const USE_BACKEND_LLM: &str = "USE_BACKEND_LLM";

pub const MAX_QA_ATTEMPTS: &str = "MAX_QA_ATTEMPTS";
pub const MAX_OPEN_PRS: &str = "MAX_OPEN_PRS";
pub const MAX_EVENTS_PER_AGENT: &str = "MAX_EVENTS_PER_AGENT";
pub const VULNERABILITY_SEVERITIES: &str = "VULNERABILITY_SEVERITIES";

pub const SKIP_QA_REVIEW: &str = "SKIP_QA_REVIEW";
pub const SKIP_SECURITY_TEST: &str = "SKIP_SECURITY_TEST";
pub const ENABLE_TELEMETRY: &str = "ENABLE_TELEMETRY";

/// Snapshot the process environment into a plain map.
pub fn snapshot() -> HashMap<String, String> {
    std::env::vars().collect()
}
