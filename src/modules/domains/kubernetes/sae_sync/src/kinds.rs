/* Copyright (C) 2025 Pedro Henrique / phkaiser13
* File: src/modules/domains/kubernetes/sae_sync/src/kinds.rs
*
* Resource kinds as the prune pass sees them. A `KindDescriptor` is what the
* user names on the command line (`apps/v1/Deployment`); a `ResourceMapping`
* is what discovery turns it into, carrying the plural and the scope.
*
* SPDX-License-Identifier: Apache-2.0 */

use kube::api::{ApiResource, GroupVersionKind};
use kube::discovery::Scope;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Abstract identifier of a resource kind to consider for pruning.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KindDescriptor {
    /// API group; empty for the core group.
    pub group: String,
    /// Pinned version. `None` lets discovery pick the preferred one.
    pub version: Option<String>,
    pub kind: String,
}

impl KindDescriptor {
    pub fn new(group: &str, version: &str, kind: &str) -> Self {
        Self {
            group: group.to_string(),
            version: Some(version.to_string()),
            kind: kind.to_string(),
        }
    }

    pub fn unversioned(group: &str, kind: &str) -> Self {
        Self {
            group: group.to_string(),
            version: None,
            kind: kind.to_string(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid resource kind {0:?}: expected <group>/<version>/<kind> or <group>/<kind>")]
pub struct DescriptorParseError(pub String);

impl FromStr for KindDescriptor {
    type Err = DescriptorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('/').collect();
        let (group, version, kind) = match parts.as_slice() {
            [group, version, kind] => (*group, Some(*version), *kind),
            [group, kind] => (*group, None, *kind),
            _ => return Err(DescriptorParseError(s.to_string())),
        };

        if kind.is_empty() || version.is_some_and(str::is_empty) {
            return Err(DescriptorParseError(s.to_string()));
        }

        // "core" is how the empty group is spelled on the command line.
        let group = if group == "core" { "" } else { group };

        Ok(Self {
            group: group.to_string(),
            version: version.map(str::to_string),
            kind: kind.to_string(),
        })
    }
}

impl fmt::Display for KindDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let group = if self.group.is_empty() { "core" } else { &self.group };
        match &self.version {
            Some(version) => write!(f, "{}/{}/{}", group, version, self.kind),
            None => write!(f, "{}/{}", group, self.kind),
        }
    }
}

/// The kinds pruned when the caller does not supply an allow-list.
pub fn default_prune_kinds() -> Vec<KindDescriptor> {
    vec![
        KindDescriptor::new("", "v1", "ConfigMap"),
        KindDescriptor::new("", "v1", "Endpoints"),
        KindDescriptor::new("", "v1", "Namespace"),
        KindDescriptor::new("", "v1", "PersistentVolumeClaim"),
        KindDescriptor::new("", "v1", "PersistentVolume"),
        KindDescriptor::new("", "v1", "Pod"),
        KindDescriptor::new("", "v1", "ReplicationController"),
        KindDescriptor::new("", "v1", "Secret"),
        KindDescriptor::new("", "v1", "Service"),
        KindDescriptor::new("batch", "v1", "Job"),
        KindDescriptor::new("batch", "v1", "CronJob"),
        KindDescriptor::new("networking.k8s.io", "v1", "Ingress"),
        KindDescriptor::new("apps", "v1", "DaemonSet"),
        KindDescriptor::new("apps", "v1", "Deployment"),
        KindDescriptor::new("apps", "v1", "ReplicaSet"),
        KindDescriptor::new("apps", "v1", "StatefulSet"),
    ]
}

/// A descriptor resolved against the server.
#[derive(Debug, Clone)]
pub struct ResourceMapping {
    pub resource: ApiResource,
    pub scope: Scope,
}

impl ResourceMapping {
    pub fn new(resource: ApiResource, scope: Scope) -> Self {
        Self { resource, scope }
    }

    pub fn namespaced(resource: ApiResource) -> Self {
        Self::new(resource, Scope::Namespaced)
    }

    pub fn cluster(resource: ApiResource) -> Self {
        Self::new(resource, Scope::Cluster)
    }

    pub fn is_namespaced(&self) -> bool {
        matches!(self.scope, Scope::Namespaced)
    }

    pub fn gvk(&self) -> GroupVersionKind {
        GroupVersionKind::gvk(
            &self.resource.group,
            &self.resource.version,
            &self.resource.kind,
        )
    }

    /// `deployment.apps`, `configmap`: the prefix kubectl prints before `/name`.
    pub fn short_name(&self) -> String {
        let kind = self.resource.kind.to_lowercase();
        if self.resource.group.is_empty() {
            kind
        } else {
            format!("{}.{}", kind, self.resource.group)
        }
    }
}

impl fmt::Display for ResourceMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}, Kind={}",
            self.resource.group, self.resource.version, self.resource.kind
        )
    }
}

/// Mappings returned by a kind resolver, split by scope.
#[derive(Debug, Clone, Default)]
pub struct ResolvedKinds {
    pub namespaced: Vec<ResourceMapping>,
    pub cluster: Vec<ResourceMapping>,
}

impl ResolvedKinds {
    pub fn push(&mut self, mapping: ResourceMapping) {
        if mapping.is_namespaced() {
            self.namespaced.push(mapping);
        } else {
            self.cluster.push(mapping);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.namespaced.is_empty() && self.cluster.is_empty()
    }
}

impl FromIterator<ResourceMapping> for ResolvedKinds {
    fn from_iter<I: IntoIterator<Item = ResourceMapping>>(iter: I) -> Self {
        let mut resolved = Self::default();
        for mapping in iter {
            resolved.push(mapping);
        }
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_descriptor() {
        let d: KindDescriptor = "apps/v1/Deployment".parse().unwrap();
        assert_eq!(d, KindDescriptor::new("apps", "v1", "Deployment"));
    }

    #[test]
    fn test_parse_core_group_is_empty() {
        let d: KindDescriptor = "core/v1/ConfigMap".parse().unwrap();
        assert_eq!(d.group, "");
        assert_eq!(d.to_string(), "core/v1/ConfigMap");
    }

    #[test]
    fn test_parse_unversioned() {
        let d: KindDescriptor = "batch/CronJob".parse().unwrap();
        assert_eq!(d, KindDescriptor::unversioned("batch", "CronJob"));
        assert_eq!(d.to_string(), "batch/CronJob");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!("Deployment".parse::<KindDescriptor>().is_err());
        assert!("apps/v1/".parse::<KindDescriptor>().is_err());
        assert!("apps//Deployment".parse::<KindDescriptor>().is_err());
        assert!("a/b/c/d".parse::<KindDescriptor>().is_err());

        let err = "Deployment".parse::<KindDescriptor>().unwrap_err();
        assert!(err.to_string().contains("\"Deployment\""));
    }

    #[test]
    fn test_mapping_names() {
        let deploy = ResourceMapping::namespaced(ApiResource::from_gvk(&GroupVersionKind::gvk(
            "apps",
            "v1",
            "Deployment",
        )));
        assert!(deploy.is_namespaced());
        assert_eq!(deploy.short_name(), "deployment.apps");
        assert_eq!(deploy.to_string(), "apps/v1, Kind=Deployment");

        let ns = ResourceMapping::cluster(ApiResource::from_gvk(&GroupVersionKind::gvk(
            "", "v1", "Namespace",
        )));
        assert!(!ns.is_namespaced());
        assert_eq!(ns.short_name(), "namespace");
        assert_eq!(ns.to_string(), "/v1, Kind=Namespace");
    }

    #[test]
    fn test_resolved_kinds_partitions_by_scope() {
        let resolved: ResolvedKinds = vec![
            ResourceMapping::cluster(ApiResource::from_gvk(&GroupVersionKind::gvk(
                "", "v1", "Namespace",
            ))),
            ResourceMapping::namespaced(ApiResource::from_gvk(&GroupVersionKind::gvk(
                "", "v1", "Pod",
            ))),
        ]
        .into_iter()
        .collect();

        assert_eq!(resolved.namespaced.len(), 1);
        assert_eq!(resolved.cluster.len(), 1);
        assert_eq!(resolved.namespaced[0].resource.kind, "Pod");
    }

    #[test]
    fn test_default_kinds_cover_workloads() {
        let defaults = default_prune_kinds();
        assert_eq!(defaults.len(), 16);
        assert!(defaults.contains(&KindDescriptor::new("apps", "v1", "Deployment")));
        assert!(defaults.contains(&KindDescriptor::new("", "v1", "Namespace")));
    }
}
