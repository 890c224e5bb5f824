// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Allowlist validation for build and format commands.
//!
//! Commands that did not come from a trusted source (the Actions workflow
//! inputs) must pass this validator before anything executes them. The rules
//! cover the build ecosystems the backend supports and block the shell
//! constructs that would allow arbitrary command execution.

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

/// Allowed executables for build and format commands.
const ALLOWED_COMMANDS: &[&str] = &[
    // .NET
    "dotnet",
    "msbuild",
    "nuget",
    "nunit-console",
    "nunit3-console",
    "xunit.console",
    "vstest.console",
    "mstest",
    "csharpier",
    // Java / Scala
    "mvn",
    "gradle",
    "ant",
    "sbt",
    "junit",
    "testng",
    "./gradlew",
    "./mvnw",
    "gradlew",
    "mvnw",
    "google-java-format",
    "checkstyle",
    // Python
    "pip",
    "pip3",
    "python",
    "python3",
    "pytest",
    "nose2",
    "unittest",
    "coverage",
    "poetry",
    "pipenv",
    "uv",
    "tox",
    "virtualenv",
    "black",
    "autopep8",
    "yapf",
    "isort",
    "ruff",
    "flake8",
    "pylint",
    // Node.js / JavaScript / TypeScript
    "npm",
    "npx",
    "yarn",
    "node",
    "pnpm",
    "bun",
    "jest",
    "mocha",
    "jasmine",
    "karma",
    "ava",
    "vitest",
    "nyc",
    "prettier",
    "eslint",
    "standard",
    // PHP
    "composer",
    "php",
    "phpunit",
    "pest",
    "codeception",
    "php-cs-fixer",
    "phpcbf",
    // Multi-language formatters
    "clang-format",
    // Build tools
    "make",
    "cmake",
    "ninja",
    "bazel",
    "ctest",
    // Shell utilities
    "echo",
    "sh",
    "bash",
    "grep",
    "sed",
    "awk",
    "cat",
    "tee",
];

const MAX_COMMAND_LENGTH: usize = 10_000;
const MAX_SEGMENTS: usize = 50;

/// Dangerous shell constructs, paired with a label for error messages.
const BLOCKED_PATTERNS: &[(&str, &str)] = &[
    (r"\$\(", "command substitution $("),
    (r"`", "backtick substitution"),
    (r"\$\{", "variable expansion ${"),
    (r"\beval\s", "eval"),
    (r"\bexec\s", "exec"),
    (r"\brm\s+-rf", "rm -rf"),
    (r"\bcurl.*\|", "curl piped to another command"),
    (r"\bwget.*\|", "wget piped to another command"),
    (r">\s*/dev/", "redirect to a device"),
    (r";\s*rm\b", "rm after a separator"),
    (r"\|\s*sh\b", "pipe to sh"),
    (r"\|\s*bash\b", "pipe to bash"),
    (r"<<<?", "here-document"),
    (r"<\(", "process substitution"),
    (r">\(", "process substitution"),
];

/// Interpreter flags that allow arbitrary inline code execution.
const DANGEROUS_INTERPRETER_FLAGS: &[(&str, &[&str])] = &[
    ("node", &["-e", "--eval"]),
    ("python", &["-c"]),
    ("python3", &["-c"]),
    ("ruby", &["-e"]),
    ("perl", &["-e"]),
];

/// Python modules allowed behind `-m`.
const ALLOWED_PYTHON_MODULES: &[&str] = &[
    "pytest",
    "unittest",
    "coverage",
    "pip",
    "venv",
    "virtualenv",
    "black",
    "autopep8",
    "yapf",
    "isort",
    "ruff",
    "flake8",
    "pylint",
    "mypy",
    "tox",
    "nose2",
    "poetry",
    "pipenv",
];

/// Validation failure, carrying the offending variable and a remediation hint.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandValidationError {
    #[error("{var} is empty or contains only whitespace; provide a valid build or format command")]
    Empty { var: String },

    #[error("{var} exceeds the maximum length of {MAX_COMMAND_LENGTH} characters ({len}); split the command into multiple steps")]
    TooLong { var: String, len: usize },

    #[error("{var} contains unescaped newline characters; use escaped newlines or && for chaining")]
    UnescapedNewline { var: String },

    #[error("{var} contains a dangerous pattern ({pattern}); remove unsafe shell operations")]
    DangerousPattern { var: String, pattern: String },

    #[error("{var} exceeds the maximum of {MAX_SEGMENTS} chained commands ({count}); split the command into multiple steps")]
    TooManySegments { var: String, count: usize },

    #[error("{var} uses a disallowed command ({executable}); see the documentation for allowed build and format commands")]
    DisallowedCommand { var: String, executable: String },

    #[error("{var} uses a shell incorrectly ({segment}); sh and bash may only execute .sh files, never -c")]
    ShellMisuse { var: String, segment: String },

    #[error("{var} uses a dangerous interpreter flag ({segment}); use script files instead of inline code")]
    DangerousInterpreterFlag { var: String, segment: String },

    #[error("{var} uses a disallowed Python module with -m ({segment}); run allowlisted modules or their CLI tools directly")]
    DisallowedPythonModule { var: String, segment: String },

    #[error("{var} contains an unsafe file redirect ({path}); redirects must be relative paths without traversal")]
    UnsafeRedirect { var: String, path: String },
}

fn blocked_patterns() -> &'static Vec<(Regex, &'static str)> {
    static PATTERNS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        BLOCKED_PATTERNS
            .iter()
            .filter_map(|(pattern, label)| Regex::new(pattern).ok().map(|re| (re, *label)))
            .collect()
    })
}

// The fixed patterns are compile-time constants; a parse failure is a bug.
#[allow(clippy::unwrap_used)]
fn redirect_regex() -> &'static Regex {
    static REDIRECT: OnceLock<Regex> = OnceLock::new();
    REDIRECT.get_or_init(|| Regex::new(r"\d*>{1,2}\s*([^\s&|;]+)").unwrap())
}

#[allow(clippy::unwrap_used)]
fn continuation_regex() -> &'static Regex {
    static CONTINUATION: OnceLock<Regex> = OnceLock::new();
    CONTINUATION.get_or_init(|| Regex::new(r"\\\s*\n\s*").unwrap())
}

/// Find the first dangerous construct in a command, if any.
fn find_dangerous_pattern(command: &str) -> Option<&'static str> {
    for (regex, label) in blocked_patterns() {
        if regex.is_match(command) {
            return Some(label);
        }
    }
    if has_background_ampersand(command) {
        return Some("background execution &");
    }
    None
}

/// Detect a bare `&` that would background the command.
///
/// `&&` chains, `>&1`-style fd duplication, and `&1`/`&2` targets are not
/// backgrounding and stay allowed.
fn has_background_ampersand(command: &str) -> bool {
    let bytes = command.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b != b'&' {
            continue;
        }
        let prev = i.checked_sub(1).map(|p| bytes[p]);
        let next = bytes.get(i + 1).copied();
        if prev == Some(b'&') || next == Some(b'&') {
            continue;
        }
        if prev == Some(b'>') {
            continue;
        }
        if next.is_some_and(|n| n.is_ascii_digit()) {
            continue;
        }
        return true;
    }
    false
}

/// Split a command by the allowed chain operators, keeping segment order.
fn split_command_chain(command: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = command.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '&' if chars.peek() == Some(&'&') => {
                chars.next();
                segments.push(std::mem::take(&mut current));
            }
            '|' if chars.peek() == Some(&'|') => {
                chars.next();
                segments.push(std::mem::take(&mut current));
            }
            '|' | ';' => {
                segments.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    segments.push(current);

    segments
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Split a segment into words, honoring single and double quotes.
///
/// Falls back to whitespace splitting when a quote is left unterminated.
fn split_shellwords(segment: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;

    for c in segment.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None => match c {
                '\'' | '"' => {
                    quote = Some(c);
                    in_word = true;
                }
                c if c.is_whitespace() => {
                    if in_word {
                        words.push(std::mem::take(&mut current));
                        in_word = false;
                    }
                }
                _ => {
                    current.push(c);
                    in_word = true;
                }
            },
        }
    }

    if quote.is_some() {
        return segment.split_whitespace().map(str::to_string).collect();
    }
    if in_word {
        words.push(current);
    }
    words
}

/// Parse a segment into (executable, arguments), ignoring redirect tokens.
fn parse_command_segment(segment: &str) -> Option<(String, Vec<String>)> {
    let without_redirects = redirect_regex().replace_all(segment, "");
    let mut words = split_shellwords(without_redirects.trim()).into_iter();
    let executable = words.next()?;
    Some((executable, words.collect()))
}

/// Extract file redirect targets from a segment, skipping fd duplication.
fn extract_redirects(segment: &str) -> Vec<String> {
    redirect_regex()
        .captures_iter(segment)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .filter(|path| !path.starts_with('&'))
        .collect()
}

fn redirect_is_safe(path: &str) -> bool {
    !path.starts_with('/') && !path.contains("..") && !path.starts_with('~')
}

fn interpreter_flags_are_safe(executable: &str, args: &[String]) -> bool {
    let Some((_, flags)) = DANGEROUS_INTERPRETER_FLAGS
        .iter()
        .find(|(name, _)| *name == executable)
    else {
        return true;
    };
    !args.iter().any(|arg| flags.contains(&arg.as_str()))
}

fn python_module_is_allowed(args: &[String]) -> bool {
    let Some(m_index) = args.iter().position(|arg| arg == "-m") else {
        return true;
    };
    match args.get(m_index + 1) {
        Some(module) => ALLOWED_PYTHON_MODULES.contains(&module.as_str()),
        None => false,
    }
}

/// `sh`/`bash` may only run `.sh` scripts, never inline code via `-c`.
fn shell_usage_is_safe(executable: &str, args: &[String]) -> bool {
    if executable != "sh" && executable != "bash" {
        return true;
    }
    if args.is_empty() || args.iter().any(|arg| arg == "-c") {
        return false;
    }
    args.iter()
        .find(|arg| !arg.starts_with('-'))
        .is_some_and(|script| script.ends_with(".sh"))
}

fn has_unescaped_newline(command: &str) -> bool {
    let bytes = command.as_bytes();
    bytes.iter().enumerate().any(|(i, &b)| {
        (b == b'\n' || b == b'\r') && i.checked_sub(1).map(|p| bytes[p]) != Some(b'\\')
    })
}

/// Validate a command against the allowlist.
///
/// `var` names the configuration variable the command came from, for error
/// messages.
pub fn validate_command(var: &str, command: &str) -> Result<(), CommandValidationError> {
    if command.trim().is_empty() {
        return Err(CommandValidationError::Empty {
            var: var.to_string(),
        });
    }

    if command.len() > MAX_COMMAND_LENGTH {
        return Err(CommandValidationError::TooLong {
            var: var.to_string(),
            len: command.len(),
        });
    }

    if has_unescaped_newline(command) {
        return Err(CommandValidationError::UnescapedNewline {
            var: var.to_string(),
        });
    }

    // Fold escaped line continuations before pattern checks.
    let command = continuation_regex().replace_all(command, " ").into_owned();

    if let Some(pattern) = find_dangerous_pattern(&command) {
        return Err(CommandValidationError::DangerousPattern {
            var: var.to_string(),
            pattern: pattern.to_string(),
        });
    }

    let segments = split_command_chain(&command);
    if segments.len() > MAX_SEGMENTS {
        return Err(CommandValidationError::TooManySegments {
            var: var.to_string(),
            count: segments.len(),
        });
    }

    for segment in &segments {
        let Some((executable, args)) = parse_command_segment(segment) else {
            continue;
        };

        if !ALLOWED_COMMANDS.contains(&executable.as_str()) {
            return Err(CommandValidationError::DisallowedCommand {
                var: var.to_string(),
                executable,
            });
        }

        if !shell_usage_is_safe(&executable, &args) {
            return Err(CommandValidationError::ShellMisuse {
                var: var.to_string(),
                segment: segment.clone(),
            });
        }

        if !interpreter_flags_are_safe(&executable, &args) {
            return Err(CommandValidationError::DangerousInterpreterFlag {
                var: var.to_string(),
                segment: segment.clone(),
            });
        }

        if (executable == "python" || executable == "python3") && !python_module_is_allowed(&args) {
            return Err(CommandValidationError::DisallowedPythonModule {
                var: var.to_string(),
                segment: segment.clone(),
            });
        }

        for path in extract_redirects(segment) {
            if !redirect_is_safe(&path) {
                return Err(CommandValidationError::UnsafeRedirect {
                    var: var.to_string(),
                    path,
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
