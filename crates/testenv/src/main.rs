// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Test environment bootstrap binary entry point.

use clap::Parser;

use fixwright_testenv::{Bootstrap, Cli};

fn main() {
    let cli = Cli::parse();

    let workspace_root = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("error: cannot determine working directory: {}", e);
            std::process::exit(1);
        }
    };

    let bootstrap = Bootstrap::new(workspace_root)
        .skip_install(cli.skip_install)
        .targets(cli.targets);

    match bootstrap.run() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    }
}
