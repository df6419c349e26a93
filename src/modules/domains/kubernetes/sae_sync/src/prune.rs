/* Copyright (C) 2025 Pedro Henrique / phkaiser13
* File: src/modules/domains/kubernetes/sae_sync/src/prune.rs
*
* The prune pass of a declarative diff/apply. While the caller walks the
* objects of its manifests it marks each one visited; afterwards the pass
* lists every object of the prune kinds, keeps the ones that were applied
* declaratively (they carry the last-applied annotation) and drops the ones
* that were just visited. What remains no longer exists in the declared
* configuration and is a candidate for deletion.
*
* The two phases are separate types: `Pruner` accepts `mark_visited` calls,
* `finish_marking` freezes the visited sets into a `PrunePass`, and only a
* `PrunePass` can list. A prune can therefore never observe a half-built
* visited set.
*
* Namespaced kinds are only searched in namespaces the caller touched, which
* keeps a prune from reaching into namespaces the user never mentioned.
* Cluster-scoped kinds have no such bound and are always listed in full.
*
* SPDX-License-Identifier: Apache-2.0 */

use crate::accessor::{is_declaratively_managed, AccessError, ObjectAccessor};
use crate::kinds::{default_prune_kinds, KindDescriptor, ResolvedKinds, ResourceMapping};
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Upper bound on list calls in flight during one prune pass.
pub const LIST_CONCURRENCY: usize = 8;

/// Error type the collaborators report with.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Expands descriptors into concrete mappings, split by scope.
#[async_trait]
pub trait KindResolver: Send + Sync {
    async fn resolve(&self, kinds: &[KindDescriptor]) -> Result<ResolvedKinds, BoxError>;
}

/// Lists live objects of one mapping. `namespace` is `None` for cluster-scoped
/// mappings; the selector is forwarded untouched.
#[async_trait]
pub trait ResourceLister: Send + Sync {
    type Object: ObjectAccessor + Send;

    async fn list(
        &self,
        mapping: &ResourceMapping,
        namespace: Option<&str>,
        label_selector: &str,
    ) -> Result<Vec<Self::Object>, BoxError>;
}

/// Identifies the listing a prune error came from.
#[derive(Debug, Clone)]
pub struct ListTarget {
    pub mapping: String,
    pub namespace: Option<String>,
}

impl fmt::Display for ListTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "namespaced object {} in namespace {:?}", self.mapping, ns),
            None => write!(f, "cluster-scoped object {}", self.mapping),
        }
    }
}

#[derive(Debug, Error)]
pub enum PruneError {
    #[error("error retrieving resource mappings to prune: {0}")]
    Resolution(#[source] BoxError),

    #[error("error pruning {target}: {source}")]
    List {
        target: ListTarget,
        #[source]
        source: BoxError,
    },

    #[error("error pruning {target}: {source}")]
    Extraction {
        target: ListTarget,
        #[source]
        source: AccessError,
    },
}

/// Namespaces and UIDs the primary walk has accounted for.
#[derive(Debug, Clone, Default)]
pub struct VisitedSet {
    namespaces: BTreeSet<String>,
    uids: HashSet<String>,
}

impl VisitedSet {
    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.namespaces.iter().map(String::as_str)
    }

    pub fn contains_namespace(&self, namespace: &str) -> bool {
        self.namespaces.contains(namespace)
    }

    pub fn contains_uid(&self, uid: &str) -> bool {
        self.uids.contains(uid)
    }

    pub fn uid_count(&self) -> usize {
        self.uids.len()
    }
}

/// Marking phase of a prune run.
pub struct Pruner<R, L> {
    resolver: R,
    lister: L,
    kinds: Vec<KindDescriptor>,
    label_selector: String,
    visited: VisitedSet,
}

impl<R, L> Pruner<R, L>
where
    R: KindResolver,
    L: ResourceLister,
{
    /// A pruner over the default prune kinds with no label selector.
    pub fn new(resolver: R, lister: L) -> Self {
        Self {
            resolver,
            lister,
            kinds: default_prune_kinds(),
            label_selector: String::new(),
            visited: VisitedSet::default(),
        }
    }

    /// Restricts pruning to `kinds`. An empty list keeps the defaults.
    pub fn with_kinds(mut self, kinds: Vec<KindDescriptor>) -> Self {
        if !kinds.is_empty() {
            self.kinds = kinds;
        }
        self
    }

    pub fn with_label_selector(mut self, selector: impl Into<String>) -> Self {
        self.label_selector = selector.into();
        self
    }

    pub fn kinds(&self) -> &[KindDescriptor] {
        &self.kinds
    }

    pub fn visited(&self) -> &VisitedSet {
        &self.visited
    }

    /// Records an object the primary walk handled. `namespace` is the object's
    /// effective namespace when its kind is namespaced, `None` otherwise.
    ///
    /// Never fails: an object whose metadata cannot be read still marks its
    /// namespace, only the UID is skipped.
    pub fn mark_visited<O>(&mut self, namespace: Option<&str>, object: &O)
    where
        O: ObjectAccessor + ?Sized,
    {
        if let Some(ns) = namespace.filter(|ns| !ns.is_empty()) {
            self.visited.namespaces.insert(ns.to_string());
        }

        match object.metadata() {
            Ok(meta) => {
                if let Some(uid) = meta.uid.as_deref().filter(|uid| !uid.is_empty()) {
                    self.visited.uids.insert(uid.to_string());
                }
            }
            Err(e) => warn!("Not recording UID of visited object: {}", e),
        }
    }

    /// Ends the marking phase.
    pub fn finish_marking(self) -> PrunePass<R, L> {
        debug!(
            namespaces = self.visited.namespaces.len(),
            uids = self.visited.uids.len(),
            "Visited set frozen"
        );
        PrunePass {
            resolver: self.resolver,
            lister: self.lister,
            kinds: self.kinds,
            label_selector: self.label_selector,
            visited: self.visited,
        }
    }
}

/// Prune phase: the visited sets are read-only from here on.
pub struct PrunePass<R, L> {
    resolver: R,
    lister: L,
    kinds: Vec<KindDescriptor>,
    label_selector: String,
    visited: VisitedSet,
}

impl<R, L> PrunePass<R, L>
where
    R: KindResolver,
    L: ResourceLister,
{
    pub fn visited(&self) -> &VisitedSet {
        &self.visited
    }

    /// Computes every prune candidate.
    ///
    /// Candidates of namespaced kinds come first, ordered by namespace and
    /// then by mapping; cluster-scoped candidates follow in mapping order.
    /// Any failure aborts the whole pass and no candidates are returned.
    pub async fn prune_all(&self) -> Result<Vec<L::Object>, PruneError> {
        let resolved = self
            .resolver
            .resolve(&self.kinds)
            .await
            .map_err(PruneError::Resolution)?;

        let mut targets: Vec<(Option<&str>, &ResourceMapping)> = Vec::new();
        for ns in self.visited.namespaces() {
            for mapping in &resolved.namespaced {
                targets.push((Some(ns), mapping));
            }
        }
        for mapping in &resolved.cluster {
            targets.push((None, mapping));
        }

        debug!(
            listings = targets.len(),
            selector = %self.label_selector,
            "Listing prune targets"
        );

        // `buffered` yields in input order, whatever order the calls finish in.
        let pages: Vec<Vec<L::Object>> = stream::iter(targets)
            .map(|(namespace, mapping)| self.prune(namespace, mapping))
            .buffered(LIST_CONCURRENCY)
            .try_collect()
            .await?;

        let pruned: Vec<L::Object> = pages.into_iter().flatten().collect();
        info!("Found {} prune candidate(s).", pruned.len());
        Ok(pruned)
    }

    async fn prune(
        &self,
        namespace: Option<&str>,
        mapping: &ResourceMapping,
    ) -> Result<Vec<L::Object>, PruneError> {
        let target = || ListTarget {
            mapping: mapping.to_string(),
            namespace: namespace.map(str::to_string),
        };

        let objects = self
            .lister
            .list(mapping, namespace, &self.label_selector)
            .await
            .map_err(|source| PruneError::List {
                target: target(),
                source,
            })?;

        let mut pruned = Vec::new();
        for object in objects {
            let keep = {
                let meta = object.metadata().map_err(|source| PruneError::Extraction {
                    target: target(),
                    source,
                })?;
                is_declaratively_managed(&meta)
                    && !meta
                        .uid
                        .as_deref()
                        .is_some_and(|uid| self.visited.contains_uid(uid))
            };
            if keep {
                pruned.push(object);
            }
        }
        Ok(pruned)
    }
}
