// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! fixwright binary entry point.

use clap::Parser;

use fixwright::cli::Cli;
use fixwright::output;
use fixwright::runtime::RuntimeBuilder;
use fixwright::telemetry::TelemetryLog;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let builder = match RuntimeBuilder::from_process_env() {
        Ok(builder) => builder
            .with_task(cli.task)
            // Dry runs always print the resolved settings.
            .with_debug(cli.debug || cli.dry_run),
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    };

    if cli.dry_run {
        // Print the redacted settings and stop before touching git or the
        // backend.
        output::init(true, TelemetryLog::new());
        builder.config().log_initial_settings();
        return;
    }

    let runtime = builder.build();
    let code = runtime.execute().await;
    std::process::exit(code);
}
