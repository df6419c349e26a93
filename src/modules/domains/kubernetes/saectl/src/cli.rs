/* Copyright (C) 2025 Pedro Henrique / phkaiser13
 * File: src/modules/domains/kubernetes/saectl/src/cli.rs
 * Flags and subcommands of saectl. `GlobalArgs` carries the cluster
 * connection (kubeconfig, context, namespace) plus verbosity and is accepted
 * before or after any subcommand. Cross-flag rules of `scale` that clap
 * attributes cannot state live in `ScaleArgs::validate`.
 * SPDX-License-Identifier: Apache-2.0 */

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use sae_sync::client::ConnectOptions;
use sae_sync::create::DryRunStrategy;
use sae_sync::KindDescriptor;
use std::path::PathBuf;
use std::time::Duration;

/// Declarative diff, create and scale for Kubernetes objects.
#[derive(Parser, Debug)]
#[command(name = "saectl", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Flags shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Path to the kubeconfig file to use for CLI requests.
    #[arg(long, global = true, env = "KUBECONFIG", value_name = "PATH")]
    pub kubeconfig: Option<String>,

    /// The name of the kubeconfig context to use.
    #[arg(long, global = true, value_name = "NAME")]
    pub context: Option<String>,

    /// If present, the namespace scope for this CLI request.
    #[arg(short, long, global = true, value_name = "NS")]
    pub namespace: Option<String>,

    /// Log more; repeat for more detail (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

impl GlobalArgs {
    /// A `KUBECONFIG` holding several files is left to kube's own loading,
    /// which merges them.
    pub fn connect_options(&self) -> ConnectOptions {
        let kubeconfig = self
            .kubeconfig
            .as_deref()
            .filter(|value| !value.is_empty() && std::env::split_paths(value).count() == 1)
            .map(PathBuf::from);
        ConnectOptions {
            kubeconfig,
            context: self.context.clone(),
            namespace: self.namespace.clone(),
        }
    }
}

/// diff, create, scale, version, options.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Diff the live version against what would be applied.
    Diff(DiffArgs),

    /// Create resources from files or directories.
    Create(CreateArgs),

    /// Set a new size for a deployment, replica set, replication controller or stateful set.
    Scale(ScaleArgs),

    /// Print the client version information.
    Version(VersionArgs),

    /// Print the list of flags inherited by all commands.
    Options,
}

/// Arguments for the `diff` command.
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Files or directories that contain the configuration to diff; `-` reads stdin.
    #[arg(short = 'f', long = "filename", required = true)]
    pub filenames: Vec<PathBuf>,

    /// Include resources that would be deleted by pruning.
    #[arg(long)]
    pub prune: bool,

    /// Selector (label query) to filter on.
    #[arg(short = 'l', long = "selector", default_value = "")]
    pub selector: String,

    /// Overwrite the default list of kinds considered for pruning, as group/version/kind.
    #[arg(long = "prune-allowlist", value_name = "G/V/K", requires = "prune")]
    pub prune_allowlist: Vec<KindDescriptor>,
}

/// Arguments for the `create` command.
#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Files or directories that contain the configuration to create; `-` reads stdin.
    #[arg(short = 'f', long = "filename", required = true)]
    pub filenames: Vec<PathBuf>,

    /// Only print the object that would be sent (client), or submit a
    /// server-side request without persisting it (server).
    #[arg(long, value_enum, default_value_t = DryRun::None)]
    pub dry_run: DryRun,

    /// Save the configuration of the object in its annotation, so a later
    /// diff --prune can find it.
    #[arg(long)]
    pub save_config: bool,

    /// Output format.
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,
}

/// Arguments for the `scale` command.
#[derive(Args, Debug)]
pub struct ScaleArgs {
    /// The new desired number of replicas.
    #[arg(long, value_parser = clap::value_parser!(i32).range(0..))]
    pub replicas: i32,

    /// Precondition for current size. Requires that the current size of the
    /// resource match this value in order to scale. -1 (default) for no condition.
    #[arg(long, default_value_t = -1, allow_negative_numbers = true, value_parser = clap::value_parser!(i32).range(-1..))]
    pub current_replicas: i32,

    /// Precondition for resource version. Requires that the current resource
    /// version match this value in order to scale.
    #[arg(long)]
    pub resource_version: Option<String>,

    /// How long to wait for the scale operation to finish (e.g. 30s, 5m, 1h).
    /// Zero means don't wait.
    #[arg(long, value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// Only print the object that would be scaled (client), or submit a
    /// server-side request without persisting it (server).
    #[arg(long, value_enum, default_value_t = DryRun::None)]
    pub dry_run: DryRun,

    /// Files or directories identifying the resources to scale.
    #[arg(short = 'f', long = "filename")]
    pub filenames: Vec<PathBuf>,

    /// Select all resources of the given type in the namespace.
    #[arg(long)]
    pub all: bool,

    /// Selector (label query) to filter on.
    #[arg(short = 'l', long = "selector", default_value = "")]
    pub selector: String,

    /// Output format.
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,

    /// TYPE NAME... or TYPE/NAME...
    pub resources: Vec<String>,
}

impl ScaleArgs {
    pub fn validate(&self) -> Result<(), String> {
        if !self.filenames.is_empty() && !self.resources.is_empty() {
            return Err("a resource cannot be specified both with --filename and on the command line".into());
        }
        if self.filenames.is_empty() && self.resources.is_empty() {
            return Err("you must specify the type of resource to scale".into());
        }
        if (self.all || !self.selector.is_empty()) && !self.filenames.is_empty() {
            return Err("--all and --selector cannot be combined with --filename".into());
        }
        if self.all && !self.selector.is_empty() {
            return Err("setting 'all' parameter but found a non empty selector".into());
        }
        Ok(())
    }

    /// `--all`/`--selector` pick objects by query instead of by name.
    pub fn selects_by_query(&self) -> bool {
        self.all || !self.selector.is_empty()
    }
}

/// Arguments for the `version` command.
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// One of 'yaml' or 'json'.
    #[arg(short, long, value_enum)]
    pub output: Option<VersionFormat>,
}

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum DryRun {
    None,
    Client,
    Server,
}

impl From<DryRun> for DryRunStrategy {
    fn from(value: DryRun) -> Self {
        match value {
            DryRun::None => DryRunStrategy::None,
            DryRun::Client => DryRunStrategy::Client,
            DryRun::Server => DryRunStrategy::Server,
        }
    }
}

/// Only `name` is supported: print `resource/name` and nothing else.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Name,
}

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum VersionFormat {
    Json,
    Yaml,
}

/// `30s`, `5m`, `1h`; a bare number counts seconds.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let invalid = || format!("invalid duration {:?}, expected e.g. 30s, 5m or 1h", s);
    let (num_str, unit) = if let Some(num_str) = s.strip_suffix('s') {
        (num_str, 1)
    } else if let Some(num_str) = s.strip_suffix('m') {
        (num_str, 60)
    } else if let Some(num_str) = s.strip_suffix('h') {
        (num_str, 3600)
    } else {
        (s, 1)
    };
    let value = num_str.parse::<u64>().map_err(|_| invalid())?;
    let secs = value.checked_mul(unit).ok_or_else(invalid)?;
    Ok(Duration::from_secs(secs))
}
