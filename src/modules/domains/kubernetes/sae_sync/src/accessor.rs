/* Copyright (C) 2025 Pedro Henrique / phkaiser13
* File: src/modules/domains/kubernetes/sae_sync/src/accessor.rs
*
* Uniform access to the metadata of a live object, whatever shape the lister
* hands back. Typed `DynamicObject`s always have metadata; raw JSON pages can
* be malformed, and that is reported rather than papered over.
*
* SPDX-License-Identifier: Apache-2.0 */

use kube::api::{DynamicObject, ObjectMeta};
use serde::Deserialize;
use std::borrow::Cow;
use thiserror::Error;

/// The annotation `kubectl apply` (and `saectl create --save-config`) writes.
pub const LAST_APPLIED_CONFIG_ANNOTATION: &str = "kubectl.kubernetes.io/last-applied-configuration";

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("object is not a JSON object")]
    NotAnObject,

    #[error("object has no metadata")]
    MissingMetadata,

    #[error("object metadata is malformed: {0}")]
    MalformedMetadata(#[source] serde_json::Error),
}

/// Extracts identity, namespace and annotations from a listed object.
pub trait ObjectAccessor {
    fn metadata(&self) -> Result<Cow<'_, ObjectMeta>, AccessError>;
}

impl ObjectAccessor for DynamicObject {
    fn metadata(&self) -> Result<Cow<'_, ObjectMeta>, AccessError> {
        Ok(Cow::Borrowed(&self.metadata))
    }
}

impl ObjectAccessor for serde_json::Value {
    fn metadata(&self) -> Result<Cow<'_, ObjectMeta>, AccessError> {
        let object = self.as_object().ok_or(AccessError::NotAnObject)?;
        let metadata = object.get("metadata").ok_or(AccessError::MissingMetadata)?;
        ObjectMeta::deserialize(metadata)
            .map(Cow::Owned)
            .map_err(AccessError::MalformedMetadata)
    }
}

/// True when the object carries the last-applied annotation.
pub fn is_declaratively_managed(meta: &ObjectMeta) -> bool {
    meta.annotations
        .as_ref()
        .is_some_and(|annotations| annotations.contains_key(LAST_APPLIED_CONFIG_ANNOTATION))
}
