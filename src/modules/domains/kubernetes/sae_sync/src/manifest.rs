/* Copyright (C) 2025 Pedro Henrique / phkaiser13
* File: src/modules/domains/kubernetes/sae_sync/src/manifest.rs
*
* Loads the declared configuration: every object found in the files and
* directories passed with `-f`. YAML files may hold several documents, JSON
* files hold one, `-` reads standard input, and `kind: List` wrappers are
* flattened into their items. Directories are walked recursively in file
* name order so the result is deterministic.
*
* SPDX-License-Identifier: Apache-2.0 */

use anyhow::{anyhow, bail, Context, Result};
use kube::api::DynamicObject;
use serde::Deserialize;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const MANIFEST_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

/// One object of the declared configuration and where it came from.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub source: PathBuf,
    pub object: DynamicObject,
}

impl Manifest {
    pub fn name(&self) -> Option<&str> {
        self.object.metadata.name.as_deref()
    }

    pub fn kind(&self) -> &str {
        self.object.types.as_ref().map_or("", |t| t.kind.as_str())
    }
}

/// Loads every object from `paths`.
pub fn load_manifests(paths: &[PathBuf]) -> Result<Vec<Manifest>> {
    let mut manifests = Vec::new();
    for path in paths {
        if path.as_os_str() == "-" {
            let mut content = String::new();
            std::io::stdin()
                .read_to_string(&mut content)
                .context("Failed to read manifests from stdin")?;
            manifests.extend(parse_manifests(path, &content)?);
            continue;
        }

        if !path.exists() {
            bail!("the path {:?} does not exist", path);
        }

        for file in manifest_files(path)? {
            let content = fs::read_to_string(&file)
                .with_context(|| format!("Failed to read manifest file: {}", file.display()))?;
            manifests.extend(parse_manifests(&file, &content)?);
        }
    }
    Ok(manifests)
}

/// Files under `path`. A file named directly is taken whatever its extension.
/// An entry that cannot be read fails the whole load.
fn manifest_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = entry.with_context(|| format!("error walking {}", path.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let is_manifest = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| MANIFEST_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
        if is_manifest {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Parses every document in `content`. YAML is a superset of JSON, so one
/// parser serves both.
pub fn parse_manifests(source: &Path, content: &str) -> Result<Vec<Manifest>> {
    let mut manifests = Vec::new();
    for (index, document) in serde_yaml::Deserializer::from_str(content).enumerate() {
        let value = serde_yaml::Value::deserialize(document).with_context(|| {
            format!("error parsing document {} of {}", index + 1, source.display())
        })?;
        if value.is_null() {
            continue;
        }
        let value: serde_json::Value = serde_json::to_value(value).with_context(|| {
            format!("error converting document {} of {}", index + 1, source.display())
        })?;

        for item in flatten_list(value) {
            let object = into_object(item)
                .with_context(|| format!("invalid object in document {} of {}", index + 1, source.display()))?;
            manifests.push(Manifest {
                source: source.to_path_buf(),
                object,
            });
        }
    }
    Ok(manifests)
}

fn flatten_list(value: serde_json::Value) -> Vec<serde_json::Value> {
    let is_list = value
        .get("kind")
        .and_then(|k| k.as_str())
        .is_some_and(|kind| kind == "List" || kind.ends_with("List") && value.get("items").is_some());
    if !is_list {
        return vec![value];
    }
    match value.get("items").and_then(|items| items.as_array()) {
        Some(items) => items.iter().cloned().flat_map(flatten_list).collect(),
        None => Vec::new(),
    }
}

fn into_object(value: serde_json::Value) -> Result<DynamicObject> {
    let object: DynamicObject = serde_json::from_value(value)?;
    let types = object
        .types
        .as_ref()
        .ok_or_else(|| anyhow!("object is missing apiVersion/kind"))?;
    if types.api_version.is_empty() || types.kind.is_empty() {
        bail!("object is missing apiVersion/kind");
    }
    if object.metadata.name.is_none() && object.metadata.generate_name.is_none() {
        bail!("{} object is missing metadata.name", types.kind);
    }
    Ok(object)
}
