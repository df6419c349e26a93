/* Copyright (C) 2025 Pedro Henrique / phkaiser13
* File: src/modules/domains/kubernetes/sae_sync/src/scale.rs
*
* Scaling through the scale subresource. Without a precondition a blind
* merge patch sets `spec.replicas`. With one, the current scale is read,
* checked against the expected size and/or resource version, and written
* back with that resource version so a concurrent change surfaces as a
* conflict; conflicts are retried until the retry budget runs out.
*
* SPDX-License-Identifier: Apache-2.0 */

use k8s_openapi::api::autoscaling::v1::Scale;
use kube::api::{Api, DynamicObject, Patch, PatchParams, PostParams};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ScaleError {
    #[error("Expected replicas to be {expected}, was {actual}")]
    ReplicasMismatch { expected: i32, actual: i32 },

    #[error("Expected resource version to be {expected}, was {actual}")]
    ResourceVersionMismatch { expected: String, actual: String },

    #[error("timed out waiting for {name} to reach {replicas} replica(s)")]
    WaitTimeout { name: String, replicas: i32 },

    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("error encoding scale: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ScaleError {
    fn is_conflict(&self) -> bool {
        matches!(self, ScaleError::Kube(kube::Error::Api(e)) if e.code == 409)
    }
}

/// What the current scale must look like before it is changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScalePrecondition {
    pub replicas: Option<i32>,
    pub resource_version: Option<String>,
}

impl ScalePrecondition {
    /// `None` when neither condition is requested, i.e. a blind update.
    /// A `current_replicas` of -1 means no size condition.
    pub fn from_flags(current_replicas: i32, resource_version: Option<&str>) -> Option<Self> {
        let replicas = (current_replicas != -1).then_some(current_replicas);
        let resource_version = resource_version.filter(|rv| !rv.is_empty()).map(str::to_string);
        if replicas.is_none() && resource_version.is_none() {
            return None;
        }
        Some(Self {
            replicas,
            resource_version,
        })
    }

    pub fn validate(&self, scale: &Scale) -> Result<(), ScaleError> {
        if let Some(expected) = self.replicas {
            let actual = scale.spec.as_ref().and_then(|s| s.replicas).unwrap_or(0);
            if actual != expected {
                return Err(ScaleError::ReplicasMismatch { expected, actual });
            }
        }
        if let Some(expected) = &self.resource_version {
            let actual = scale.metadata.resource_version.clone().unwrap_or_default();
            if &actual != expected {
                return Err(ScaleError::ResourceVersionMismatch {
                    expected: expected.clone(),
                    actual,
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryParams {
    pub interval: Duration,
    pub timeout: Duration,
}

impl RetryParams {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }
}

/// Conflict retries: every second for up to five minutes.
impl Default for RetryParams {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(5 * 60))
    }
}

#[derive(Debug, Clone)]
pub struct ScaleRequest {
    pub replicas: i32,
    pub precondition: Option<ScalePrecondition>,
    pub retry: RetryParams,
    /// Poll until `status.replicas` reaches the target.
    pub wait: Option<RetryParams>,
    pub server_dry_run: bool,
}

impl ScaleRequest {
    pub fn new(replicas: i32) -> Self {
        Self {
            replicas,
            precondition: None,
            retry: RetryParams::default(),
            wait: None,
            server_dry_run: false,
        }
    }
}

/// Scales `name` through `api` as described by `request`.
pub async fn scale(api: &Api<DynamicObject>, name: &str, request: &ScaleRequest) -> Result<(), ScaleError> {
    let deadline = Instant::now() + request.retry.timeout;
    loop {
        match scale_once(api, name, request).await {
            Ok(()) => break,
            Err(e) if e.is_conflict() && Instant::now() < deadline => {
                debug!("Conflict scaling {}, retrying: {}", name, e);
                sleep(request.retry.interval).await;
            }
            Err(e) => return Err(e),
        }
    }

    if let Some(wait) = request.wait.filter(|_| !request.server_dry_run) {
        wait_for_replicas(api, name, request.replicas, wait).await?;
    }
    Ok(())
}

async fn scale_once(api: &Api<DynamicObject>, name: &str, request: &ScaleRequest) -> Result<(), ScaleError> {
    match &request.precondition {
        Some(precondition) => {
            let mut current = api.get_scale(name).await?;
            precondition.validate(&current)?;
            current.spec.get_or_insert_with(Default::default).replicas = Some(request.replicas);
            let pp = PostParams {
                dry_run: request.server_dry_run,
                ..PostParams::default()
            };
            api.replace_scale(name, &pp, serde_json::to_vec(&current)?).await?;
        }
        None => {
            let pp = PatchParams {
                dry_run: request.server_dry_run,
                ..PatchParams::default()
            };
            let patch = json!({ "spec": { "replicas": request.replicas } });
            api.patch_scale(name, &pp, &Patch::Merge(&patch)).await?;
        }
    }
    Ok(())
}

/// True once the scale reports the target replica count.
pub fn has_desired_replicas(scale: &Scale, replicas: i32) -> bool {
    let spec_matches = scale.spec.as_ref().and_then(|s| s.replicas) == Some(replicas);
    let status_matches = scale.status.as_ref().map(|s| s.replicas) == Some(replicas);
    spec_matches && status_matches
}

async fn wait_for_replicas(
    api: &Api<DynamicObject>,
    name: &str,
    replicas: i32,
    wait: RetryParams,
) -> Result<(), ScaleError> {
    let deadline = Instant::now() + wait.timeout;
    loop {
        let current = api.get_scale(name).await?;
        if has_desired_replicas(&current, replicas) {
            info!("{} reached {} replica(s)", name, replicas);
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(ScaleError::WaitTimeout {
                name: name.to_string(),
                replicas,
            });
        }
        sleep(wait.interval).await;
    }
}

/// One scale target given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceArg {
    pub resource: String,
    pub name: String,
}

/// Parses `TYPE NAME...` or `TYPE/NAME...` arguments.
pub fn parse_resource_args(args: &[String]) -> Result<Vec<ResourceArg>, String> {
    let Some(first) = args.first() else {
        return Ok(Vec::new());
    };

    if first.contains('/') {
        return args
            .iter()
            .map(|arg| match arg.split_once('/') {
                Some((resource, name)) if !resource.is_empty() && !name.is_empty() => Ok(ResourceArg {
                    resource: resource.to_string(),
                    name: name.to_string(),
                }),
                _ => Err(format!(
                    "there is no need to specify a resource type as a separate argument when passing arguments in resource/name form (e.g. 'deployment/web' instead of 'deployment web'), got {:?}",
                    arg
                )),
            })
            .collect();
    }

    let names = &args[1..];
    if names.is_empty() {
        return Err(format!("a resource name is required for type {:?}", first));
    }
    if let Some(bad) = names.iter().find(|n| n.contains('/')) {
        return Err(format!("arguments in resource/name form must have a single resource and name, got {:?}", bad));
    }
    Ok(names
        .iter()
        .map(|name| ResourceArg {
            resource: first.clone(),
            name: name.clone(),
        })
        .collect())
}
