/* Copyright (C) 2025 Pedro Henrique / phkaiser13
 * File: src/modules/domains/kubernetes/saectl/src/commands/version.rs
 *
 * `saectl version`. The git revision and compiler version are captured by
 * build.rs.
 *
 * SPDX-License-Identifier: Apache-2.0 */

use crate::cli::{VersionArgs, VersionFormat};
use anyhow::Result;
use serde::Serialize;

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    pub client_version: &'static str,
    pub git_revision: &'static str,
    pub rustc_version: &'static str,
}

impl VersionInfo {
    pub fn current() -> Self {
        Self {
            client_version: env!("CARGO_PKG_VERSION"),
            git_revision: env!("SAECTL_GIT_REVISION"),
            rustc_version: env!("SAECTL_RUSTC_VERSION"),
        }
    }

    pub fn render(&self, format: Option<VersionFormat>) -> Result<String> {
        Ok(match format {
            Some(VersionFormat::Json) => format!("{}\n", serde_json::to_string_pretty(self)?),
            Some(VersionFormat::Yaml) => serde_yaml::to_string(self)?,
            None => format!(
                "Client Version: v{}\nGit Revision: {}\nRust Version: {}\n",
                self.client_version, self.git_revision, self.rustc_version
            ),
        })
    }
}

pub fn handle_version(args: VersionArgs) -> Result<()> {
    print!("{}", VersionInfo::current().render(args.output)?);
    Ok(())
}
