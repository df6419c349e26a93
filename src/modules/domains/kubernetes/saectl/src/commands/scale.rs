/* Copyright (C) 2025 Pedro Henrique / phkaiser13
 * File: src/modules/domains/kubernetes/saectl/src/commands/scale.rs
 *
 * `saectl scale`. Targets come from manifests (`-f`), from names on the
 * command line, or from a query over one resource type (`--all`,
 * `--selector`). Each target is then scaled through the scale subresource
 * by `sae_sync::scale`.
 *
 * SPDX-License-Identifier: Apache-2.0 */

use crate::cli::{GlobalArgs, OutputFormat, ScaleArgs};
use anyhow::{anyhow, bail, Context, Result};
use kube::api::ListParams;
use kube::Client;
use sae_sync::client::connect;
use sae_sync::create::DryRunStrategy;
use sae_sync::discovery::{dynamic_api, DiscoveryResolver};
use sae_sync::manifest::load_manifests;
use sae_sync::scale::{parse_resource_args, scale, RetryParams, ScalePrecondition, ScaleRequest};
use sae_sync::ResourceMapping;
use std::time::Duration;
use tracing::info;

/// Poll interval while waiting for replicas.
const WAIT_INTERVAL: Duration = Duration::from_secs(1);

struct ScaleTarget {
    mapping: ResourceMapping,
    namespace: Option<String>,
    name: String,
}

impl ScaleTarget {
    fn display_name(&self) -> String {
        format!("{}/{}", self.mapping.short_name(), self.name)
    }
}

fn namespace_for(mapping: &ResourceMapping, declared: Option<&str>, default_namespace: &str) -> Option<String> {
    mapping
        .is_namespaced()
        .then(|| declared.unwrap_or(default_namespace).to_string())
}

async fn collect_targets(
    client: &Client,
    default_namespace: &str,
    args: &ScaleArgs,
) -> Result<Vec<ScaleTarget>> {
    let resolver = DiscoveryResolver::new(client.clone());
    let mut targets = Vec::new();

    if !args.filenames.is_empty() {
        for manifest in load_manifests(&args.filenames)? {
            let mapping = resolver
                .resolve_object(&manifest.object)
                .await
                .map_err(|e| anyhow!(e))
                .with_context(|| format!("error resolving {} from {}", manifest.kind(), manifest.source.display()))?;
            let name = manifest
                .name()
                .ok_or_else(|| anyhow!("{} in {} has no name to scale", manifest.kind(), manifest.source.display()))?
                .to_string();
            let namespace = namespace_for(&mapping, manifest.object.metadata.namespace.as_deref(), default_namespace);
            targets.push(ScaleTarget { mapping, namespace, name });
        }
        return Ok(targets);
    }

    if args.selects_by_query() {
        let [resource] = args.resources.as_slice() else {
            bail!("exactly one resource type is required with --all or --selector");
        };
        if resource.contains('/') {
            bail!("name cannot be provided when a selector is specified");
        }
        let mapping = resolver.resolve_resource_name(resource).await.map_err(|e| anyhow!(e))?;
        let namespace = namespace_for(&mapping, None, default_namespace);
        let mut lp = ListParams::default();
        if !args.selector.is_empty() {
            lp = lp.labels(&args.selector);
        }
        let objects = dynamic_api(client, &mapping, namespace.as_deref())
            .list(&lp)
            .await
            .with_context(|| format!("error listing {}", mapping.short_name()))?;
        for object in objects {
            if let Some(name) = object.metadata.name {
                targets.push(ScaleTarget {
                    mapping: mapping.clone(),
                    namespace: namespace.clone(),
                    name,
                });
            }
        }
        return Ok(targets);
    }

    for arg in parse_resource_args(&args.resources).map_err(|e| anyhow!(e))? {
        let mapping = resolver
            .resolve_resource_name(&arg.resource)
            .await
            .map_err(|e| anyhow!(e))?;
        let namespace = namespace_for(&mapping, None, default_namespace);
        targets.push(ScaleTarget {
            mapping,
            namespace,
            name: arg.name,
        });
    }
    Ok(targets)
}

fn build_request(args: &ScaleArgs) -> ScaleRequest {
    let dry_run = DryRunStrategy::from(args.dry_run);
    ScaleRequest {
        replicas: args.replicas,
        precondition: ScalePrecondition::from_flags(args.current_replicas, args.resource_version.as_deref()),
        retry: RetryParams::default(),
        wait: args
            .timeout
            .filter(|timeout| !timeout.is_zero())
            .map(|timeout| RetryParams::new(WAIT_INTERVAL, timeout)),
        server_dry_run: dry_run == DryRunStrategy::Server,
    }
}

pub async fn handle_scale(global: &GlobalArgs, args: ScaleArgs) -> Result<()> {
    args.validate().map_err(|e| anyhow!(e))?;

    let connection = connect(&global.connect_options()).await?;
    let targets = collect_targets(&connection.client, &connection.default_namespace, &args).await?;
    if targets.is_empty() {
        bail!("no objects passed to scale");
    }
    if args.resource_version.is_some() && targets.len() > 1 {
        bail!("cannot use --resource-version with multiple resources");
    }

    let request = build_request(&args);
    let dry_run = DryRunStrategy::from(args.dry_run);
    for target in &targets {
        let display_name = target.display_name();
        if dry_run != DryRunStrategy::Client {
            let api = dynamic_api(&connection.client, &target.mapping, target.namespace.as_deref());
            scale(&api, &target.name, &request)
                .await
                .with_context(|| format!("error scaling {}", display_name))?;
        }
        info!("Scaled {} to {} replica(s)", display_name, args.replicas);
        match args.output {
            Some(OutputFormat::Name) => println!("{}", display_name),
            None => println!("{} scaled{}", display_name, dry_run.suffix()),
        }
    }
    Ok(())
}
