/* Copyright (C) 2025 Pedro Henrique / phkaiser13
 * File: src/modules/domains/kubernetes/saectl/build.rs
 *
 * Captures the git revision and the compiler version at build time for
 * `saectl version`. Both fall back to "unknown" outside a git checkout or
 * when rustc cannot be queried.
 *
 * SPDX-License-Identifier: Apache-2.0 */

use std::env;
use std::process::Command;

fn command_output(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn main() {
    let git_revision = command_output("git", &["rev-parse", "--short=12", "HEAD"])
        .unwrap_or_else(|| "unknown".to_string());
    let rustc = env::var("RUSTC").unwrap_or_else(|_| "rustc".to_string());
    let rustc_version = command_output(&rustc, &["--version"]).unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=SAECTL_GIT_REVISION={}", git_revision);
    println!("cargo:rustc-env=SAECTL_RUSTC_VERSION={}", rustc_version);
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=RUSTC");
}
