// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Branch, label, commit, and PR naming conventions.

use std::sync::OnceLock;

use regex::Regex;

/// Branch prefix for remediation branches.
pub const BRANCH_PREFIX: &str = "fixwright/remediation-";

/// Label prefix identifying the vulnerability a PR fixes.
pub const VULN_LABEL_PREFIX: &str = "fixwright-vuln-id:";

/// Label prefix carrying the remediation id on a PR.
pub const REMEDIATION_LABEL_PREFIX: &str = "fixwright-id:";

/// A GitHub label with its creation attributes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelDetails {
    pub name: String,
    pub description: String,
    pub color: String,
}

/// Feature branch name for a remediation.
pub fn branch_name(remediation_id: &str) -> String {
    format!("{}{}", BRANCH_PREFIX, remediation_id)
}

/// Vulnerability label attached to fix PRs.
pub fn label_details(vuln_uuid: &str) -> LabelDetails {
    LabelDetails {
        name: format!("{}{}", VULN_LABEL_PREFIX, vuln_uuid),
        description: "Vulnerability identified by the security scanner".to_string(),
        color: "ff0000".to_string(),
    }
}

/// Remediation-id label attached to fix PRs.
pub fn remediation_label(remediation_id: &str) -> LabelDetails {
    LabelDetails {
        name: format!("{}{}", REMEDIATION_LABEL_PREFIX, remediation_id),
        description: "Remediation id for the scanner vulnerability".to_string(),
        color: "0075ca".to_string(),
    }
}

/// Commit message for an automated fix.
pub fn commit_message(vuln_title: &str, vuln_uuid: &str) -> String {
    format!(
        "Automated fix attempt for: {} (VULN-{})",
        clip(vuln_title, 50),
        vuln_uuid
    )
}

/// Pull request title for an automated fix.
pub fn pr_title(vuln_title: &str) -> String {
    format!("Fix: {}", clip(vuln_title, 100))
}

/// Extract the PR number from a PR URL.
pub fn pr_number_from_url(url: &str) -> Option<u64> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    let regex = PATTERN
        .get_or_init(|| Regex::new(r"/pull/(\d+)").ok())
        .as_ref()?;
    regex
        .captures(url)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Recover the remediation id from a feature branch name.
pub fn remediation_id_from_branch(branch: &str) -> Option<String> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    let regex = PATTERN
        .get_or_init(|| Regex::new(r"fixwright/remediation-([^/]+)").ok())
        .as_ref()?;
    regex
        .captures(branch)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Recover the remediation id from a PR's label names.
pub fn remediation_id_from_labels<S: AsRef<str>>(labels: &[S]) -> Option<String> {
    labels.iter().find_map(|label| {
        label
            .as_ref()
            .strip_prefix(REMEDIATION_LABEL_PREFIX)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
    })
}

/// Clip to at most `max` characters on a char boundary.
fn clip(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

#[cfg(test)]
#[path = "refs_tests.rs"]
mod tests;
