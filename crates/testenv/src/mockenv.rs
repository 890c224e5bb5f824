// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Fixed mock environment exported to the delegated test run.
//!
//! Every variable the agent's configuration layer reads gets a non-empty mock
//! value here, so the system tests never depend on the invoking shell's
//! environment. The values are fixed and carry no external override.

/// Mock variables exported on every invocation, flags or not.
pub const MOCK_ENV: [(&str, &str); 19] = [
    ("BASE_BRANCH", "main"),
    ("SCANNER_HOST", "mock.scanner.test"),
    ("SCANNER_ORG_ID", "mock-org"),
    ("SCANNER_APP_ID", "mock-app"),
    ("SCANNER_AUTH_KEY", "mock-auth-key"),
    ("SCANNER_API_KEY", "mock-api-key"),
    ("GITHUB_TOKEN", "mock-github-token"),
    ("GITHUB_REPOSITORY", "mock/repo"),
    ("GITHUB_SERVER_URL", "https://mockhub.test"),
    ("GITHUB_EVENT_PATH", "/tmp/mock-event.json"),
    ("GITHUB_WORKSPACE", "/tmp/mock-workspace"),
    ("REPO_ROOT", "/tmp/mock-workspace"),
    ("BUILD_COMMAND", "echo mock build"),
    ("FORMATTING_COMMAND", "echo mock format"),
    ("DEBUG_MODE", "true"),
    ("TESTING", "true"),
    ("SKIP_QA_REVIEW", "true"),
    ("SKIP_SECURITY_TEST", "true"),
    ("ENABLE_TELEMETRY", "false"),
];

#[cfg(test)]
#[path = "mockenv_tests.rs"]
mod tests;
