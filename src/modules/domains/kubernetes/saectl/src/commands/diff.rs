/* Copyright (C) 2025 Pedro Henrique / phkaiser13
 * File: src/modules/domains/kubernetes/saectl/src/commands/diff.rs
 * SPDX-License-Identifier: Apache-2.0 */

use crate::cli::{DiffArgs, GlobalArgs};
use anyhow::Result;
use sae_sync::client::connect;
use sae_sync::diff::{diff_manifests, DiffOptions};
use sae_sync::manifest::load_manifests;
use std::io::Write;
use std::process::ExitCode;
use tracing::info;

/// Exit status when the live state differs from the declared one.
const EXIT_DIFFERENCES_FOUND: u8 = 1;

pub async fn handle_diff(global: &GlobalArgs, args: DiffArgs) -> Result<ExitCode> {
    let manifests = load_manifests(&args.filenames)?;
    info!("Loaded {} object(s) to diff", manifests.len());

    let connection = connect(&global.connect_options()).await?;
    let options = DiffOptions {
        default_namespace: connection.default_namespace.clone(),
        prune: args.prune,
        prune_kinds: args.prune_allowlist,
        label_selector: args.selector,
    };
    let report = diff_manifests(&connection.client, &manifests, &options).await?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(report.render().as_bytes())?;
    stdout.flush()?;

    Ok(if report.has_drift() {
        ExitCode::from(EXIT_DIFFERENCES_FOUND)
    } else {
        ExitCode::SUCCESS
    })
}
