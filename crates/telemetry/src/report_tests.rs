#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
use super::*;

use rstest::rstest;

#[test]
fn test_short_body_passes_through() {
    assert_eq!(summary_report("Fixed the bug."), "Fixed the bug.");
}

#[test]
fn test_headings_are_skipped() {
    let body = "## Summary\n\nReplaced string concatenation with a bound query.";
    assert_eq!(
        summary_report(body),
        "Replaced string concatenation with a bound query."
    );
}

#[test]
fn test_whitespace_is_collapsed() {
    let body = "Line one\n  continues   here.";
    assert_eq!(summary_report(body), "Line one continues here.");
}

#[test]
fn test_long_body_is_ellipsized_to_255() {
    let body = "word ".repeat(100);
    let report = summary_report(&body);
    assert_eq!(report.len(), 255);
    assert!(report.ends_with("..."));
}

#[rstest]
#[case("")]
#[case("\n\n\n")]
#[case("# Only a heading")]
#[case("---")]
fn test_bodies_without_prose_yield_empty_report(#[case] body: &str) {
    assert_eq!(summary_report(body), "");
}

#[test]
fn test_truncation_respects_char_boundaries() {
    let body = "é".repeat(300);
    let report = summary_report(&body);
    assert!(report.len() <= 255);
    assert!(report.ends_with("..."));
}
