/* Copyright (C) 2025 Pedro Henrique / phkaiser13
 * File: src/modules/domains/kubernetes/sae_sync/src/lib.rs
 *
 * Library behind `saectl`. The prune pass (`prune`, `kinds`, `accessor`) is
 * independent of any live cluster: it talks to the API only through the
 * `KindResolver` and `ResourceLister` traits. `discovery` provides the
 * kube-backed implementations of both, and the command modules (`diff`,
 * `create`, `scale`) drive them against a real client built by `client`.
 *
 * SPDX-License-Identifier: Apache-2.0 */

pub mod accessor;
pub mod client;
pub mod create;
pub mod diff;
pub mod discovery;
pub mod kinds;
pub mod manifest;
pub mod prune;
pub mod scale;

#[cfg(test)]
mod test_cluster;

pub use accessor::{ObjectAccessor, LAST_APPLIED_CONFIG_ANNOTATION};
pub use kinds::{default_prune_kinds, KindDescriptor, ResolvedKinds, ResourceMapping};
pub use prune::{KindResolver, PruneError, PrunePass, Pruner, ResourceLister, VisitedSet};
