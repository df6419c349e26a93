/* Copyright (C) 2025 Pedro Henrique / phkaiser13
 * File: src/modules/domains/kubernetes/saectl/src/commands/options.rs
 * SPDX-License-Identifier: Apache-2.0 */

use crate::cli::Cli;
use clap::{Arg, CommandFactory};

fn describe(arg: &Arg) -> String {
    let mut flags = Vec::new();
    if let Some(short) = arg.get_short() {
        flags.push(format!("-{}", short));
    }
    if let Some(long) = arg.get_long() {
        flags.push(format!("--{}", long));
    }
    let help = arg.get_help().map(|h| h.to_string()).unwrap_or_default();
    format!("    {}: {}", flags.join(", "), help)
}

/// Lists the global flags, one per line.
pub fn render_options() -> String {
    let command = Cli::command();
    let mut out = String::from("The following options can be passed to any command:\n\n");
    for arg in command.get_arguments().filter(|a| a.is_global_set()) {
        out.push_str(&describe(arg));
        out.push('\n');
    }
    out
}

pub fn handle_options() {
    print!("{}", render_options());
}
