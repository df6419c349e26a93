/* Copyright (C) 2025 Pedro Henrique / phkaiser13
* File: src/modules/domains/kubernetes/sae_sync/src/create.rs
*
* The logic behind `saectl create -f`. Every declared object is resolved
* through discovery and created through the dynamic client, optionally in
* dry-run mode. With `save_config` the object is first stamped with the
* last-applied annotation, which is what later makes it visible to a prune.
*
* SPDX-License-Identifier: Apache-2.0 */

use crate::accessor::LAST_APPLIED_CONFIG_ANNOTATION;
use crate::discovery::{dynamic_api, DiscoveryResolver};
use crate::manifest::Manifest;
use anyhow::{anyhow, Context, Result};
use kube::api::{DynamicObject, PostParams};
use kube::Client;
use std::fmt;
use tracing::info;

const CREATE_FIELD_MANAGER: &str = "saectl-create";

/// How much of an operation actually reaches the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DryRunStrategy {
    #[default]
    None,
    /// Nothing is sent.
    Client,
    /// Sent with `dryRun=All`; validated and defaulted but not persisted.
    Server,
}

impl DryRunStrategy {
    pub fn suffix(self) -> &'static str {
        match self {
            DryRunStrategy::None => "",
            DryRunStrategy::Client => " (dry run)",
            DryRunStrategy::Server => " (server dry run)",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    pub default_namespace: String,
    pub dry_run: DryRunStrategy,
    pub save_config: bool,
}

/// An object `create` handled.
#[derive(Debug, Clone)]
pub struct CreatedObject {
    /// `deployment.apps/web`
    pub name: String,
    pub dry_run: DryRunStrategy,
    pub object: DynamicObject,
}

impl fmt::Display for CreatedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} created{}", self.name, self.dry_run.suffix())
    }
}

/// Stamps `object` with its own serialized form under the last-applied
/// annotation. Any previous value is excluded from the serialized form.
pub fn set_last_applied(object: &mut DynamicObject) -> Result<()> {
    if let Some(annotations) = object.metadata.annotations.as_mut() {
        annotations.remove(LAST_APPLIED_CONFIG_ANNOTATION);
        if annotations.is_empty() {
            object.metadata.annotations = None;
        }
    }
    let config = serde_json::to_string(object).context("error serializing last-applied configuration")?;
    object
        .metadata
        .annotations
        .get_or_insert_with(Default::default)
        .insert(LAST_APPLIED_CONFIG_ANNOTATION.to_string(), config);
    Ok(())
}

/// Creates every object in `manifests`, in order. The first failure stops
/// the run.
pub async fn create_manifests(
    client: &Client,
    manifests: &[Manifest],
    options: &CreateOptions,
) -> Result<Vec<CreatedObject>> {
    let resolver = DiscoveryResolver::new(client.clone());
    let mut created = Vec::with_capacity(manifests.len());

    for manifest in manifests {
        let source = manifest.source.display();
        let mapping = resolver
            .resolve_object(&manifest.object)
            .await
            .map_err(|e| anyhow!(e))
            .with_context(|| format!("error creating {} from {}", manifest.kind(), source))?;

        let mut object = manifest.object.clone();
        let namespace = if mapping.is_namespaced() {
            Some(
                object
                    .metadata
                    .namespace
                    .get_or_insert_with(|| options.default_namespace.clone())
                    .clone(),
            )
        } else {
            None
        };

        if options.save_config {
            set_last_applied(&mut object).with_context(|| format!("error creating from {}", source))?;
        }

        if options.dry_run != DryRunStrategy::Client {
            let api = dynamic_api(client, &mapping, namespace.as_deref());
            let pp = PostParams {
                dry_run: options.dry_run == DryRunStrategy::Server,
                field_manager: Some(CREATE_FIELD_MANAGER.to_string()),
            };
            object = api
                .create(&pp, &object)
                .await
                .with_context(|| format!("error creating {} from {}", manifest.kind(), source))?;
        }

        let name = object
            .metadata
            .name
            .clone()
            .or_else(|| object.metadata.generate_name.clone())
            .unwrap_or_default();
        let entry = CreatedObject {
            name: format!("{}/{}", mapping.short_name(), name),
            dry_run: options.dry_run,
            object,
        };
        info!("{}", entry);
        created.push(entry);
    }

    Ok(created)
}
