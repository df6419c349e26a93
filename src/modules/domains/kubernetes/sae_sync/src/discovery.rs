/* Copyright (C) 2025 Pedro Henrique / phkaiser13
* File: src/modules/domains/kubernetes/sae_sync/src/discovery.rs
*
* The kube-backed collaborators of the prune pass and the commands:
* - `DiscoveryResolver` maps descriptors, manifest types and command-line
*   resource names to `ResourceMapping`s through API discovery, caching what
*   it has already looked up for the duration of a command.
* - `DynamicLister` lists live objects of any mapping through the dynamic
*   `Api<DynamicObject>` client, following continue tokens.
*
* SPDX-License-Identifier: Apache-2.0 */

use crate::kinds::{KindDescriptor, ResolvedKinds, ResourceMapping};
use crate::prune::{BoxError, KindResolver, ResourceLister};
use async_trait::async_trait;
use kube::{
    api::{Api, DynamicObject, GroupVersionKind, ListParams, TypeMeta},
    discovery::{self, Discovery},
    Client,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Page size used when listing.
const LIST_PAGE_SIZE: u32 = 500;

/// Short names kubectl users type that discovery does not report.
const SHORT_NAMES: &[(&str, &str)] = &[
    ("cm", "configmaps"),
    ("cj", "cronjobs"),
    ("deploy", "deployments"),
    ("ds", "daemonsets"),
    ("ing", "ingresses"),
    ("ns", "namespaces"),
    ("po", "pods"),
    ("pvc", "persistentvolumeclaims"),
    ("pv", "persistentvolumes"),
    ("rc", "replicationcontrollers"),
    ("rs", "replicasets"),
    ("svc", "services"),
    ("sts", "statefulsets"),
];

/// Builds the dynamic API handle for a mapping. Cluster-scoped mappings and
/// a `None` namespace both address the whole cluster.
pub fn dynamic_api(client: &Client, mapping: &ResourceMapping, namespace: Option<&str>) -> Api<DynamicObject> {
    match namespace {
        Some(ns) if mapping.is_namespaced() => {
            Api::namespaced_with(client.clone(), ns, &mapping.resource)
        }
        _ => Api::all_with(client.clone(), &mapping.resource),
    }
}

/// Splits `deployments.apps` into (`deployments`, Some(`apps`)) and expands
/// short names.
pub fn split_resource_name(name: &str) -> (String, Option<String>) {
    let lowered = name.trim().to_lowercase();
    let (resource, group) = match lowered.split_once('.') {
        Some((resource, group)) => (resource.to_string(), Some(group.to_string())),
        None => (lowered, None),
    };
    let resource = SHORT_NAMES
        .iter()
        .find(|(short, _)| *short == resource)
        .map(|(_, plural)| plural.to_string())
        .unwrap_or(resource);
    (resource, group)
}

/// Clones share one lookup cache.
#[derive(Clone)]
pub struct DiscoveryResolver {
    client: Client,
    cache: Arc<Mutex<HashMap<String, ResourceMapping>>>,
}

impl DiscoveryResolver {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn cached(&self, key: &str) -> Option<ResourceMapping> {
        self.cache.lock().ok().and_then(|cache| cache.get(key).cloned())
    }

    fn remember(&self, key: String, mapping: &ResourceMapping) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(key, mapping.clone());
        }
    }

    /// Resolves a single descriptor.
    pub async fn resolve_descriptor(&self, kind: &KindDescriptor) -> Result<ResourceMapping, BoxError> {
        let key = kind.to_string();
        if let Some(mapping) = self.cached(&key) {
            return Ok(mapping);
        }

        let (resource, caps) = match &kind.version {
            Some(version) => {
                let gvk = GroupVersionKind::gvk(&kind.group, version, &kind.kind);
                discovery::pinned_kind(&self.client, &gvk).await?
            }
            None => discovery::group(&self.client, &kind.group)
                .await?
                .recommended_kind(&kind.kind)
                .ok_or_else(|| format!("no matches for kind {:?} in group {:?}", kind.kind, kind.group))?,
        };

        let mapping = ResourceMapping::new(resource, caps.scope);
        debug!("Resolved {} to {}", kind, mapping);
        self.remember(key, &mapping);
        Ok(mapping)
    }

    /// Resolves the type of an object read from a manifest.
    pub async fn resolve_object(&self, object: &DynamicObject) -> Result<ResourceMapping, BoxError> {
        let types = object
            .types
            .as_ref()
            .ok_or("object is missing apiVersion/kind")?;
        let gvk = GroupVersionKind::try_from(types)?;
        self.resolve_descriptor(&KindDescriptor::new(&gvk.group, &gvk.version, &gvk.kind))
            .await
    }

    /// Resolves a resource name typed on the command line: a plural, a
    /// singular kind or a short name, optionally qualified with `.group`.
    pub async fn resolve_resource_name(&self, name: &str) -> Result<ResourceMapping, BoxError> {
        let key = format!("name:{}", name.to_lowercase());
        if let Some(mapping) = self.cached(&key) {
            return Ok(mapping);
        }

        let (resource, group) = split_resource_name(name);
        let mut discovery = Discovery::new(self.client.clone());
        if let Some(group) = &group {
            discovery = discovery.filter(&[group.as_str()]);
        }
        let discovery = discovery.run().await?;

        for api_group in discovery.groups() {
            for (ar, caps) in api_group.recommended_resources() {
                if ar.plural == resource || ar.kind.to_lowercase() == resource {
                    let mapping = ResourceMapping::new(ar, caps.scope);
                    self.remember(key, &mapping);
                    return Ok(mapping);
                }
            }
        }

        Err(format!("the server doesn't have a resource type {:?}", name).into())
    }
}

#[async_trait]
impl KindResolver for DiscoveryResolver {
    async fn resolve(&self, kinds: &[KindDescriptor]) -> Result<ResolvedKinds, BoxError> {
        let mut resolved = ResolvedKinds::default();
        for kind in kinds {
            resolved.push(self.resolve_descriptor(kind).await?);
        }
        Ok(resolved)
    }
}

pub struct DynamicLister {
    client: Client,
}

impl DynamicLister {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceLister for DynamicLister {
    type Object = DynamicObject;

    async fn list(
        &self,
        mapping: &ResourceMapping,
        namespace: Option<&str>,
        label_selector: &str,
    ) -> Result<Vec<DynamicObject>, BoxError> {
        let api = dynamic_api(&self.client, mapping, namespace);
        let mut lp = ListParams::default().limit(LIST_PAGE_SIZE);
        if !label_selector.is_empty() {
            lp = lp.labels(label_selector);
        }

        let mut objects = Vec::new();
        loop {
            let page = api.list(&lp).await?;
            let next = page.metadata.continue_.clone().filter(|token| !token.is_empty());
            objects.extend(page.items.into_iter().map(|mut obj| {
                // List items come back without their own apiVersion/kind.
                if obj.types.is_none() {
                    obj.types = Some(TypeMeta {
                        api_version: mapping.resource.api_version.clone(),
                        kind: mapping.resource.kind.clone(),
                    });
                }
                obj
            }));
            match next {
                Some(token) => lp = lp.continue_token(&token),
                None => break,
            }
        }

        debug!(
            "Listed {} {} object(s) in {}",
            objects.len(),
            mapping,
            namespace.unwrap_or("<cluster>")
        );
        Ok(objects)
    }
}
