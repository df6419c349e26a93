/* Copyright (C) 2025 Pedro Henrique / phkaiser13
 * File: src/modules/domains/kubernetes/saectl/src/commands/create.rs
 * SPDX-License-Identifier: Apache-2.0 */

use crate::cli::{CreateArgs, GlobalArgs, OutputFormat};
use anyhow::{bail, Result};
use sae_sync::client::connect;
use sae_sync::create::{create_manifests, CreateOptions};
use sae_sync::manifest::load_manifests;

pub async fn handle_create(global: &GlobalArgs, args: CreateArgs) -> Result<()> {
    let manifests = load_manifests(&args.filenames)?;
    if manifests.is_empty() {
        bail!("no objects passed to create");
    }

    let connection = connect(&global.connect_options()).await?;
    let options = CreateOptions {
        default_namespace: connection.default_namespace.clone(),
        dry_run: args.dry_run.into(),
        save_config: args.save_config,
    };

    for created in create_manifests(&connection.client, &manifests, &options).await? {
        match args.output {
            Some(OutputFormat::Name) => println!("{}", created.name),
            None => println!("{}", created),
        }
    }
    Ok(())
}
