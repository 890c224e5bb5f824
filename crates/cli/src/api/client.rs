// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client for the scanner backend's remediation API.
//!
//! Lifecycle notifications (`/open`, `/merged`, `/closed`, `/failed`) and the
//! telemetry POST are best-effort: they log and return `false` on failure
//! instead of aborting the run. Fetching work is not: an unexpected response
//! there is a hard error.

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

use crate::config::{Config, Severity};
use crate::failure::FailureCategory;
use crate::output;
use crate::telemetry::TelemetryLog;
use crate::util::normalize_host;

use super::models::{CreditTracking, FetchOutcome, PromptDetails};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Remediation API failure.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("remediation API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status} from {endpoint}: {body}")]
    UnexpectedStatus {
        endpoint: &'static str,
        status: u16,
        body: String,
    },
}

/// Client for the backend's remediation endpoints.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    teamserver_host: String,
    auth_key: String,
    api_key: String,
    user_agent: String,
    repo_root: String,
    repo_url: String,
    max_open_prs: u32,
    severities: Vec<Severity>,
    use_backend_llm: bool,
}

impl ApiClient {
    /// Build a client against the configured scanner host.
    pub fn new(config: &Config) -> Self {
        let origin = format!("https://{}", normalize_host(&config.scanner.host));
        Self::with_origin(config, origin)
    }

    /// Build a client against an explicit origin. Used by tests to point at
    /// a local mock server.
    pub fn with_origin(config: &Config, origin: impl Into<String>) -> Self {
        let origin = origin.into();
        Self {
            http: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            base_url: format!(
                "{}/api/v4/remediation/organizations/{}/applications/{}",
                origin, config.scanner.org_id, config.scanner.app_id
            ),
            teamserver_host: origin,
            auth_key: config.scanner.auth_key.clone(),
            api_key: config.scanner.api_key.clone(),
            user_agent: config.user_agent(),
            repo_root: config.repo_root.display().to_string(),
            repo_url: config.github_repo_url(),
            max_open_prs: config.max_open_prs,
            severities: config.severities.clone(),
            use_backend_llm: config.use_backend_llm,
        }
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .header("Authorization", &self.auth_key)
            .header("API-Key", &self.api_key)
            .header("Accept", "application/json")
            .header("User-Agent", &self.user_agent)
    }

    /// Fetch the next vulnerability to remediate, with its prompts.
    pub async fn fetch_prompt_details(&self) -> Result<FetchOutcome, ApiError> {
        let url = format!("{}/prompt-details", self.base_url);
        output::debug_log(format!("Fetching prompt details from: {}", url));

        let payload = serde_json::json!({
            "teamserverHost": self.teamserver_host,
            "repoRootDir": self.repo_root,
            "repoUrl": self.repo_url,
            "maxPullRequests": self.max_open_prs,
            "severities": self.severities,
            "backendProvidedLlm": self.use_backend_llm,
        });

        let response = self
            .request(reqwest::Method::POST, url)
            .json(&payload)
            .send()
            .await?;

        match response.status() {
            StatusCode::NO_CONTENT => {
                output::log("No vulnerabilities found that need remediation");
                Ok(FetchOutcome::NoWork)
            }
            StatusCode::CONFLICT => {
                output::log("At or over the maximum PR limit");
                Ok(FetchOutcome::PrLimitReached)
            }
            StatusCode::OK => {
                let details: PromptDetails = response.json().await?;
                output::debug_log(details.redacted_summary());
                Ok(FetchOutcome::Work(Box::new(details)))
            }
            status => Err(ApiError::UnexpectedStatus {
                endpoint: "prompt-details",
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            }),
        }
    }

    /// Notify the backend that a PR was opened. Best-effort.
    pub async fn notify_pr_opened(
        &self,
        remediation_id: &str,
        pr_number: u64,
        pr_url: &str,
    ) -> bool {
        let url = format!("{}/remediations/{}/open", self.base_url, remediation_id);
        let payload = serde_json::json!({
            "pullRequestNumber": pr_number,
            "pullRequestUrl": pr_url,
            "backendProvidedLlm": self.use_backend_llm,
        });
        self.notify(url, "open", Some(payload)).await
    }

    /// Notify the backend that a PR was merged. Best-effort.
    pub async fn notify_pr_merged(&self, remediation_id: &str) -> bool {
        let url = format!("{}/remediations/{}/merged", self.base_url, remediation_id);
        self.notify(url, "merged", None).await
    }

    /// Notify the backend that a PR was closed without merging. Best-effort.
    pub async fn notify_pr_closed(&self, remediation_id: &str) -> bool {
        let url = format!("{}/remediations/{}/closed", self.base_url, remediation_id);
        self.notify(url, "closed", None).await
    }

    /// Notify the backend that a remediation attempt failed. Best-effort.
    pub async fn notify_failed(&self, remediation_id: &str, category: FailureCategory) -> bool {
        let url = format!("{}/remediations/{}/failed", self.base_url, remediation_id);
        let payload = serde_json::json!({ "failureCategory": category.as_str() });
        self.notify(url, "failed", Some(payload)).await
    }

    async fn notify(
        &self,
        url: String,
        event: &str,
        payload: Option<serde_json::Value>,
    ) -> bool {
        output::debug_log(format!("Notifying remediation service ({}): {}", event, url));

        let mut request = self.request(reqwest::Method::PUT, url);
        if let Some(ref payload) = payload {
            request = request.json(payload);
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => {
                output::debug_log(format!(
                    "Remediation {} notification accepted ({})",
                    event,
                    response.status()
                ));
                true
            }
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                output::error(format!(
                    "Failed to notify remediation service ({}): {} - {}",
                    event, status, body
                ));
                false
            }
            Err(e) => {
                output::error(format!(
                    "Request error notifying remediation service ({}): {}",
                    event, e
                ));
                false
            }
        }
    }

    /// Fetch credit tracking information. Failures are debug-logged and
    /// reported as `None`.
    pub async fn fetch_credit_tracking(&self) -> Option<CreditTracking> {
        let url = format!("{}/credit-tracking", self.base_url);
        output::debug_log(format!("Fetching credit tracking from: {}", url));

        match self.request(reqwest::Method::GET, url).send().await {
            Ok(response) if response.status().is_success() => match response.json().await {
                Ok(tracking) => Some(tracking),
                Err(e) => {
                    output::debug_log(format!("Error decoding credit tracking response: {}", e));
                    None
                }
            },
            Ok(response) => {
                output::debug_log(format!(
                    "Credit tracking request returned {}",
                    response.status()
                ));
                None
            }
            Err(e) => {
                output::debug_log(format!("Request error fetching credit tracking: {}", e));
                None
            }
        }
    }

    /// POST the accumulated telemetry snapshot. Best-effort; skipped with a
    /// warning when no remediation id was recorded.
    pub async fn send_telemetry(&self, telemetry: &TelemetryLog) -> bool {
        let Some(remediation_id) = telemetry.remediation_id() else {
            output::warn("No remediation id recorded; telemetry not sent.");
            return false;
        };

        let url = format!(
            "{}/remediations/{}/telemetry",
            self.base_url, remediation_id
        );
        output::debug_log(format!("Sending telemetry to: {}", url));

        let request = self
            .request(reqwest::Method::POST, url)
            .json(&telemetry.snapshot());

        match request.send().await {
            Ok(response) if response.status().is_success() => {
                output::debug_log(format!("Telemetry sent ({})", response.status()));
                true
            }
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                output::error(format!("Failed to send telemetry: {} - {}", status, body));
                false
            }
            Err(e) => {
                output::error(format!("Error sending telemetry: {}", e));
                false
            }
        }
    }
}
