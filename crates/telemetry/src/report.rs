// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Summary report derivation from PR body text.

/// Maximum length of the summary report stored by the backend.
const MAX_REPORT_LEN: usize = 255;

/// Derive a short summary report from a PR body.
///
/// Takes the first meaningful paragraph (skipping headings and horizontal
/// rules), collapses internal whitespace, and ellipsizes the result to the
/// backend's 255-character column.
pub fn summary_report(body: &str) -> String {
    let paragraph = body
        .split("\n\n")
        .map(str::trim)
        .find(|p| !p.is_empty() && !is_markup_only(p))
        .unwrap_or("");

    let collapsed = paragraph.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.len() <= MAX_REPORT_LEN {
        return collapsed;
    }

    let mut cut = MAX_REPORT_LEN - 3;
    while !collapsed.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &collapsed[..cut])
}

/// True for lines that carry markdown structure but no prose.
fn is_markup_only(paragraph: &str) -> bool {
    paragraph
        .lines()
        .all(|line| line.trim_start().starts_with('#') || line.trim() == "---")
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;
