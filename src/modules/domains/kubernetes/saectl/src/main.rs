/*
 * Copyright (C) 2025 Pedro Henrique / phkaiser13
 *
 * File: src/modules/domains/kubernetes/saectl/src/main.rs
 *
 * `saectl` entry point. The displayed command name is derived from argv[0]
 * before clap sees the arguments; logging is configured from `-v`, then the
 * chosen handler runs. A failing handler prints `error: ...` with its whole
 * context chain and exits with status 2.
 *
 * SPDX-License-Identifier: Apache-2.0
 */

use clap::{CommandFactory, FromArgMatches};
use std::process::ExitCode;

mod cli;
mod commands;
mod help;
mod telemetry;

/// Exit status for every failure; 1 is taken by `diff` for "differences found".
const EXIT_FAILURE: u8 = 2;

fn parse_cli() -> cli::Cli {
    let argv0 = std::env::args().next().unwrap_or_default();
    let command_name = help::command_name_for(&argv0);
    let matches = help::decorate(cli::Cli::command(), &command_name).get_matches();
    match cli::Cli::from_arg_matches(&matches) {
        Ok(cli) => cli,
        Err(e) => e.exit(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = parse_cli();
    telemetry::init_tracing(cli.global.verbose);

    match commands::run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(EXIT_FAILURE)
        }
    }
}
