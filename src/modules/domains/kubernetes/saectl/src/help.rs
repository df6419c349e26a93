/* Copyright (C) 2025 Pedro Henrique / phkaiser13
 * File: src/modules/domains/kubernetes/saectl/src/help.rs
 *
 * Help text that depends on how the binary was invoked. Installed on PATH as
 * `kubectl-sae` the tool runs as a kubectl plugin, and its usage lines and
 * examples should read `kubectl sae ...` instead of `saectl ...`.
 *
 * SPDX-License-Identifier: Apache-2.0 */

use clap::Command;
use std::path::Path;

const PLUGIN_PREFIX: &str = "kubectl-";
const COMMAND_PLACEHOLDER: &str = "{{command}}";

pub const DIFF_EXAMPLES: &str = "\
Examples:
  # Diff resources included in app.yaml
  {{command}} diff -f app.yaml

  # Diff a directory and show what a prune would delete
  {{command}} diff -f manifests/ --prune -l app=web

  # Only consider config maps for pruning
  {{command}} diff -f manifests/ --prune --prune-allowlist core/v1/ConfigMap";

pub const CREATE_EXAMPLES: &str = "\
Examples:
  # Create the objects in app.yaml and record their configuration
  {{command}} create -f app.yaml --save-config

  # Validate against the server without persisting anything
  cat app.yaml | {{command}} create -f - --dry-run server";

pub const SCALE_EXAMPLES: &str = "\
Examples:
  # Scale a deployment named 'web' to 3
  {{command}} scale --replicas 3 deployment/web

  # If the deployment named 'web' is currently 2, scale it to 3
  {{command}} scale --current-replicas 2 --replicas 3 deployment web

  # Scale the stateful set in db.yaml and wait up to a minute for it
  {{command}} scale --replicas 5 -f db.yaml --timeout 1m";

pub const OPTIONS_EXAMPLES: &str = "\
Examples:
  # Print flags inherited by all commands
  {{command}} options";

pub const VERSION_ABOUT: &str = "Prints {{command}} build version information";

/// `kubectl sae` when running as a kubectl plugin, `saectl` otherwise.
pub fn command_name_for(argv0: &str) -> String {
    let file_name = Path::new(argv0)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(argv0);
    match file_name.strip_prefix(PLUGIN_PREFIX) {
        Some(plugin) if !plugin.is_empty() => format!("kubectl {}", plugin.replace('_', "-")),
        _ => "saectl".to_string(),
    }
}

/// Substitutes the displayed command name into an examples template.
pub fn render_examples(template: &str, command_name: &str) -> String {
    template.replace(COMMAND_PLACEHOLDER, command_name)
}

/// Renames the clap command and attaches the examples of each subcommand.
pub fn decorate(command: Command, command_name: &str) -> Command {
    command
        .bin_name(command_name.to_string())
        .mut_subcommand("diff", |sub| sub.after_help(render_examples(DIFF_EXAMPLES, command_name)))
        .mut_subcommand("create", |sub| sub.after_help(render_examples(CREATE_EXAMPLES, command_name)))
        .mut_subcommand("scale", |sub| sub.after_help(render_examples(SCALE_EXAMPLES, command_name)))
        .mut_subcommand("options", |sub| sub.after_help(render_examples(OPTIONS_EXAMPLES, command_name)))
        .mut_subcommand("version", |sub| {
            let about = render_examples(VERSION_ABOUT, command_name);
            sub.about(about.clone()).long_about(about)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_command_name_for_plugin() {
        assert_eq!(command_name_for("/usr/local/bin/kubectl-sae"), "kubectl sae");
        assert_eq!(command_name_for("kubectl-sae"), "kubectl sae");
    }

    #[test]
    fn test_command_name_for_standalone() {
        assert_eq!(command_name_for("/usr/bin/saectl"), "saectl");
        assert_eq!(command_name_for("./target/debug/saectl"), "saectl");
        assert_eq!(command_name_for(""), "saectl");
    }

    #[test]
    fn test_render_examples() {
        let rendered = render_examples(SCALE_EXAMPLES, "kubectl sae");
        assert!(rendered.contains("kubectl sae scale --replicas 3 deployment/web"));
        assert!(!rendered.contains(COMMAND_PLACEHOLDER));
    }

    #[test]
    fn test_decorate_names_every_templated_subcommand() {
        let command = decorate(crate::cli::Cli::command(), "kubectl sae");
        let help_of = |name: &str| {
            let sub = command.find_subcommand(name).unwrap();
            (
                sub.get_about().map(|s| s.to_string()).unwrap_or_default(),
                sub.get_after_help().map(|s| s.to_string()).unwrap_or_default(),
            )
        };

        let (about, _) = help_of("version");
        assert_eq!(about, "Prints kubectl sae build version information");
        let (_, options) = help_of("options");
        assert!(options.contains("kubectl sae options"));
        for name in ["diff", "create", "scale"] {
            let (_, examples) = help_of(name);
            assert!(examples.contains(&format!("kubectl sae {}", name)), "{}", name);
        }
        assert_eq!(command.get_bin_name(), Some("kubectl sae"));
    }
}
