// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared string helpers used by the API, git, and agent modules.

/// Marker prepended when [`tail_string`] drops leading content.
pub const TRUNCATION_PREFIX: &str = "...[content truncated]...\n";

/// Strip any protocol prefix and trailing slash from a host.
///
/// Prevents double prefixing when the host is later embedded in a URL.
pub fn normalize_host(host: &str) -> String {
    let stripped = host
        .strip_prefix("https://")
        .or_else(|| host.strip_prefix("http://"))
        .unwrap_or(host);
    stripped.trim_end_matches('/').to_string()
}

/// Truncate a string to `max_len`, keeping the end portion.
///
/// Build output and agent transcripts are most useful at the tail, where the
/// actual failure lives.
pub fn tail_string(text: &str, max_len: usize) -> String {
    if text.len() <= max_len {
        return text.to_string();
    }

    if TRUNCATION_PREFIX.len() >= max_len {
        return TRUNCATION_PREFIX.chars().take(max_len).collect();
    }

    let keep = max_len - TRUNCATION_PREFIX.len();
    let mut start = text.len() - keep;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    format!("{}{}", TRUNCATION_PREFIX, &text[start..])
}

/// Replace every occurrence of a secret with `***`.
pub fn mask_secret(text: &str, secret: &str) -> String {
    if secret.is_empty() {
        return text.to_string();
    }
    text.replace(secret, "***")
}

#[cfg(test)]
#[path = "util_tests.rs"]
mod tests;
