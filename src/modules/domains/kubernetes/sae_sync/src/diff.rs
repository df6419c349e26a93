/* Copyright (C) 2025 Pedro Henrique / phkaiser13
* File: src/modules/domains/kubernetes/sae_sync/src/diff.rs
*
* This file contains the core logic of `saectl diff`. It compares the
* declared configuration against the live state of the cluster and, when
* asked to, reports the objects a prune would delete.
*
* The main function, `diff_manifests`, orchestrates this process by:
* 1. Resolving the kind of every declared object through discovery.
* 2. Fetching the live counterpart of each object, if any.
* 3. Marking each object visited so the prune pass can skip it.
* 4. Asking the server for the merged state of each object (a server-side
*    apply in dry-run mode) and rendering a unified diff (via `similar`)
*    wherever the normalized live and merged states differ.
* 5. Optionally running the prune pass and rendering each candidate as a
*    deletion.
*
* SPDX-License-Identifier: Apache-2.0 */

use crate::accessor::LAST_APPLIED_CONFIG_ANNOTATION;
use crate::discovery::{dynamic_api, DiscoveryResolver, DynamicLister};
use crate::kinds::{KindDescriptor, ResourceMapping};
use crate::manifest::Manifest;
use crate::prune::Pruner;
use anyhow::{anyhow, Context, Result};
use kube::api::{DynamicObject, Patch, PatchParams};
use kube::Client;
use serde_json::Value;
use similar::TextDiff;
use tracing::{debug, info};

const DIFF_FIELD_MANAGER: &str = "saectl-diff";

/// Metadata fields the server owns; they never count as drift.
const SERVER_METADATA_FIELDS: &[&str] = &[
    "creationTimestamp",
    "generation",
    "managedFields",
    "resourceVersion",
    "selfLink",
    "uid",
];

#[derive(Debug, Clone, Default)]
pub struct DiffOptions {
    /// Namespace for namespaced objects that do not name one.
    pub default_namespace: String,
    pub prune: bool,
    pub prune_kinds: Vec<KindDescriptor>,
    pub label_selector: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffChange {
    Added,
    Modified,
    Pruned,
}

/// One object that differs, with its rendered unified diff.
#[derive(Debug, Clone)]
pub struct DiffEntry {
    pub key: String,
    pub change: DiffChange,
    pub diff: String,
}

#[derive(Debug, Clone, Default)]
pub struct DiffReport {
    pub entries: Vec<DiffEntry>,
}

impl DiffReport {
    pub fn has_drift(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn render(&self) -> String {
        self.entries.iter().map(|e| e.diff.as_str()).collect()
    }
}

/// `apps.v1.Deployment.shop.web`, the key kubectl diff uses for file names.
pub fn object_key(mapping: &ResourceMapping, namespace: Option<&str>, name: &str) -> String {
    let group = if mapping.resource.group.is_empty() {
        String::new()
    } else {
        format!("{}.", mapping.resource.group)
    };
    let namespace = namespace.map(|ns| format!("{}.", ns)).unwrap_or_default();
    format!(
        "{}{}.{}.{}{}",
        group, mapping.resource.version, mapping.resource.kind, namespace, name
    )
}

/// Strips status, server-owned metadata and the last-applied annotation.
pub fn normalize(object: &DynamicObject) -> Value {
    let mut value = serde_json::to_value(object).unwrap_or(Value::Null);
    let Some(map) = value.as_object_mut() else {
        return value;
    };
    map.remove("status");

    if let Some(metadata) = map.get_mut("metadata").and_then(Value::as_object_mut) {
        for field in SERVER_METADATA_FIELDS {
            metadata.remove(*field);
        }
        let annotations_empty = match metadata.get_mut("annotations").and_then(Value::as_object_mut) {
            Some(annotations) => {
                annotations.remove(LAST_APPLIED_CONFIG_ANNOTATION);
                annotations.is_empty()
            }
            None => false,
        };
        if annotations_empty {
            metadata.remove("annotations");
        }
    }
    value
}

fn to_yaml(value: Option<&Value>) -> String {
    value
        .map(|v| serde_yaml::to_string(v).unwrap_or_default())
        .unwrap_or_default()
}

/// Unified diff between two normalized objects, `None` when they match.
pub fn render_diff(key: &str, live: Option<&Value>, desired: Option<&Value>) -> Option<String> {
    let live = to_yaml(live);
    let desired = to_yaml(desired);
    if live == desired {
        return None;
    }

    let diff = TextDiff::from_lines(&live, &desired);
    Some(
        diff.unified_diff()
            .context_radius(3)
            .header(&format!("live/{}", key), &format!("merged/{}", key))
            .to_string(),
    )
}

/// Compares `manifests` with the cluster. See the module docs for the steps.
pub async fn diff_manifests(
    client: &Client,
    manifests: &[Manifest],
    options: &DiffOptions,
) -> Result<DiffReport> {
    let resolver = DiscoveryResolver::new(client.clone());
    let lister = DynamicLister::new(client.clone());
    let mut report = DiffReport::default();

    let mut pruner = Pruner::new(resolver.clone(), lister)
        .with_kinds(options.prune_kinds.clone())
        .with_label_selector(options.label_selector.clone());

    for manifest in manifests {
        let mapping = resolver
            .resolve_object(&manifest.object)
            .await
            .map_err(|e| anyhow!(e))
            .with_context(|| format!("error resolving {} from {}", manifest.kind(), manifest.source.display()))?;

        let namespace = mapping.is_namespaced().then(|| {
            manifest
                .object
                .metadata
                .namespace
                .clone()
                .unwrap_or_else(|| options.default_namespace.clone())
        });
        let name = manifest
            .name()
            .ok_or_else(|| anyhow!("{} in {} has no name to diff against", manifest.kind(), manifest.source.display()))?;

        let mut desired = manifest.object.clone();
        desired.metadata.namespace = namespace.clone();

        let api = dynamic_api(client, &mapping, namespace.as_deref());
        let live = api
            .get_opt(name)
            .await
            .with_context(|| format!("error fetching live state of {}/{}", mapping.short_name(), name))?;

        match &live {
            Some(live) => pruner.mark_visited(namespace.as_deref(), live),
            None => pruner.mark_visited(namespace.as_deref(), &desired),
        }

        // The server merges the declared object into the live one (applying
        // defaults) without persisting anything.
        let merged = api
            .patch(name, &PatchParams::apply(DIFF_FIELD_MANAGER).dry_run().force(), &Patch::Apply(&desired))
            .await
            .with_context(|| format!("error computing merged state of {}/{}", mapping.short_name(), name))?;

        let key = object_key(&mapping, namespace.as_deref(), name);
        let live_value = live.as_ref().map(normalize);
        let desired_value = normalize(&merged);
        if let Some(diff) = render_diff(&key, live_value.as_ref(), Some(&desired_value)) {
            debug!("Drift detected for {}", key);
            report.entries.push(DiffEntry {
                key,
                change: if live.is_some() { DiffChange::Modified } else { DiffChange::Added },
                diff,
            });
        }
    }

    if options.prune {
        let pass = pruner.finish_marking();
        let candidates = pass.prune_all().await?;
        for candidate in candidates {
            let mapping = resolver
                .resolve_object(&candidate)
                .await
                .map_err(|e| anyhow!(e))
                .context("error resolving prune candidate")?;
            let name = candidate.metadata.name.clone().unwrap_or_default();
            let key = object_key(&mapping, candidate.metadata.namespace.as_deref(), &name);
            if let Some(diff) = render_diff(&key, Some(&normalize(&candidate)), None) {
                report.entries.push(DiffEntry {
                    key,
                    change: DiffChange::Pruned,
                    diff,
                });
            }
        }
    }

    info!("Diff found {} changed object(s).", report.entries.len());
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::api::{ApiResource, GroupVersionKind, ObjectMeta};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn deployment(replicas: i64) -> DynamicObject {
        let ar = ApiResource::from_gvk(&GroupVersionKind::gvk("apps", "v1", "Deployment"));
        let mut obj = DynamicObject::new("web", &ar).within("shop");
        obj.data = json!({ "spec": { "replicas": replicas } });
        obj
    }

    fn deployment_mapping() -> ResourceMapping {
        ResourceMapping::namespaced(ApiResource::from_gvk(&GroupVersionKind::gvk(
            "apps",
            "v1",
            "Deployment",
        )))
    }

    #[test]
    fn test_object_key() {
        let mapping = deployment_mapping();
        assert_eq!(object_key(&mapping, Some("shop"), "web"), "apps.v1.Deployment.shop.web");

        let ns = ResourceMapping::cluster(ApiResource::from_gvk(&GroupVersionKind::gvk(
            "", "v1", "Namespace",
        )));
        assert_eq!(object_key(&ns, None, "shop"), "v1.Namespace.shop");
    }

    #[test]
    fn test_normalize_drops_server_fields() {
        let mut live = deployment(2);
        live.metadata = ObjectMeta {
            uid: Some("u-1".to_string()),
            resource_version: Some("42".to_string()),
            annotations: Some(BTreeMap::from([(
                LAST_APPLIED_CONFIG_ANNOTATION.to_string(),
                "{}".to_string(),
            )])),
            ..live.metadata
        };
        live.data["status"] = json!({ "readyReplicas": 2 });

        let normalized = normalize(&live);
        assert_eq!(normalized, normalize(&deployment(2)));
        assert!(normalized.get("status").is_none());
        assert!(normalized["metadata"].get("annotations").is_none());
    }

    #[test]
    fn test_render_diff_equal_is_none() {
        let value = normalize(&deployment(2));
        assert!(render_diff("k", Some(&value), Some(&value)).is_none());
    }

    #[test]
    fn test_render_diff_modified() {
        let live = normalize(&deployment(1));
        let desired = normalize(&deployment(3));
        let diff = render_diff("apps.v1.Deployment.shop.web", Some(&live), Some(&desired)).unwrap();

        assert!(diff.contains("--- live/apps.v1.Deployment.shop.web"));
        assert!(diff.contains("+++ merged/apps.v1.Deployment.shop.web"));
        assert!(diff.contains("-  replicas: 1"));
        assert!(diff.contains("+  replicas: 3"));
    }

    #[test]
    fn test_render_diff_pruned_removes_every_line() {
        let live = normalize(&deployment(1));
        let diff = render_diff("k", Some(&live), None).unwrap();
        assert!(diff.contains("-kind: Deployment"));
        assert!(!diff.lines().any(|l| l.starts_with('+') && !l.starts_with("+++")));
    }

    #[test]
    fn test_report_render_concatenates() {
        let report = DiffReport {
            entries: vec![
                DiffEntry { key: "a".into(), change: DiffChange::Added, diff: "A\n".into() },
                DiffEntry { key: "b".into(), change: DiffChange::Pruned, diff: "B\n".into() },
            ],
        };
        assert!(report.has_drift());
        assert_eq!(report.render(), "A\nB\n");
        assert!(!DiffReport::default().has_drift());
    }

    mod against_cluster {
        use super::*;
        use crate::test_cluster::{not_found, resource_list, MockCluster};
        use std::path::PathBuf;

        const DEPLOYMENTS: &str = "/apis/apps/v1/namespaces/shop/deployments";

        fn live(name: &str, uid: &str, replicas: i64, annotated: bool) -> Value {
            let mut value = json!({
                "apiVersion": "apps/v1",
                "kind": "Deployment",
                "metadata": { "name": name, "namespace": "shop", "uid": uid, "resourceVersion": "9" },
                "spec": { "replicas": replicas },
            });
            if annotated {
                value["metadata"]["annotations"] = json!({ LAST_APPLIED_CONFIG_ANNOTATION: "{}" });
            }
            value
        }

        fn manifest(name: &str, namespace: Option<&str>, replicas: i64) -> Manifest {
            let ar = ApiResource::from_gvk(&GroupVersionKind::gvk("apps", "v1", "Deployment"));
            let mut object = DynamicObject::new(name, &ar);
            object.metadata.namespace = namespace.map(str::to_string);
            object.data = json!({ "spec": { "replicas": replicas } });
            Manifest {
                source: PathBuf::from("deploy.yaml"),
                object,
            }
        }

        fn cluster() -> MockCluster {
            MockCluster::new(|req| match (req.method.as_str(), req.path.as_str()) {
                ("GET", "/apis/apps/v1") => {
                    (200, resource_list("apps/v1", &[("deployments", "Deployment", true)]))
                }
                ("GET", DEPLOYMENTS) => (
                    200,
                    json!({
                        "apiVersion": "apps/v1",
                        "kind": "DeploymentList",
                        "metadata": {},
                        "items": [
                            live("web", "u-web", 2, true),
                            live("old", "u-old", 1, true),
                            live("manual", "u-manual", 1, false),
                        ],
                    }),
                ),
                ("GET", path) if path == format!("{}/web", DEPLOYMENTS) => {
                    (200, live("web", "u-web", 2, true))
                }
                ("GET", _) => not_found(),
                // The dry-run apply echoes the declared object back as merged.
                ("PATCH", _) => (200, req.body.clone()),
                _ => not_found(),
            })
        }

        #[tokio::test]
        async fn test_diff_reports_modified_added_and_pruned() {
            let cluster = cluster();
            let manifests = vec![manifest("web", Some("shop"), 3), manifest("api", None, 1)];
            let options = DiffOptions {
                default_namespace: "shop".to_string(),
                prune: true,
                prune_kinds: vec![KindDescriptor::new("apps", "v1", "Deployment")],
                label_selector: "app=shop".to_string(),
            };

            let report = diff_manifests(&cluster.client, &manifests, &options).await.unwrap();

            let changes: Vec<_> = report.entries.iter().map(|e| (e.key.as_str(), e.change.clone())).collect();
            assert_eq!(
                changes,
                vec![
                    ("apps.v1.Deployment.shop.web", DiffChange::Modified),
                    ("apps.v1.Deployment.shop.api", DiffChange::Added),
                    ("apps.v1.Deployment.shop.old", DiffChange::Pruned),
                ]
            );

            let web = &report.entries[0].diff;
            assert!(web.contains("-  replicas: 2"));
            assert!(web.contains("+  replicas: 3"));
            assert!(!web.contains("uid"));

            let old = &report.entries[2].diff;
            assert!(old.contains("--- live/apps.v1.Deployment.shop.old"));
            assert!(old.contains("-  name: old"));
            assert!(!old.lines().any(|l| l.starts_with('+') && !l.starts_with("+++")));
            assert!(!report.render().contains("manual"));

            let requests = cluster.requests();
            let patches: Vec<_> = requests.iter().filter(|r| r.method == "PATCH").collect();
            assert_eq!(patches.len(), 2);
            for patch in &patches {
                assert!(patch.has_query("dryRun=All"));
                assert!(patch.has_query("force=true"));
                assert!(patch.has_query("fieldManager=saectl-diff"));
            }
            assert_eq!(patches[1].path, format!("{}/api", DEPLOYMENTS));

            let list = requests.iter().find(|r| r.route() == format!("GET {}", DEPLOYMENTS)).unwrap();
            assert!(list.has_query("labelSelector=app%3Dshop"));
        }

        #[tokio::test]
        async fn test_diff_without_prune_lists_nothing() {
            let cluster = cluster();
            let manifests = vec![manifest("web", Some("shop"), 2)];
            let options = DiffOptions {
                default_namespace: "shop".to_string(),
                ..DiffOptions::default()
            };

            let report = diff_manifests(&cluster.client, &manifests, &options).await.unwrap();

            assert!(!report.has_drift());
            assert!(!cluster.routes().contains(&format!("GET {}", DEPLOYMENTS)));
        }
    }
}
