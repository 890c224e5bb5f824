// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! CLI argument parsing for the bootstrap binary.

use clap::Parser;

/// Test environment bootstrap for the fixwright workspace
#[derive(Parser, Debug)]
#[command(
    name = "fixwright-testenv",
    version,
    about = "Prepare the test environment and run the workspace tests"
)]
pub struct Cli {
    /// Skip dependency installation and go straight to the test run
    #[arg(long)]
    pub skip_install: bool,

    /// Integration test targets to run; discovers every test when empty
    #[arg(value_name = "TARGET")]
    pub targets: Vec<String>,
}

#[cfg(test)]
#[path = "args_tests.rs"]
mod tests;
