/* Copyright (C) 2025 Pedro Henrique / phkaiser13
 * File: src/modules/domains/kubernetes/saectl/src/commands/mod.rs
 *
 * Dispatches a parsed command line to its handler. Handlers return the
 * process exit code on success; `diff` uses 1 to report differences.
 *
 * SPDX-License-Identifier: Apache-2.0 */

mod create;
mod diff;
mod options;
mod scale;
mod version;

use crate::cli::{Cli, Commands};
use anyhow::Result;
use std::process::ExitCode;

pub async fn run(cli: Cli) -> Result<ExitCode> {
    let global = cli.global;
    match cli.command {
        Commands::Diff(args) => diff::handle_diff(&global, args).await,
        Commands::Create(args) => create::handle_create(&global, args).await.map(|_| ExitCode::SUCCESS),
        Commands::Scale(args) => scale::handle_scale(&global, args).await.map(|_| ExitCode::SUCCESS),
        Commands::Version(args) => version::handle_version(args).map(|_| ExitCode::SUCCESS),
        Commands::Options => {
            options::handle_options();
            Ok(ExitCode::SUCCESS)
        }
    }
}
