/* Copyright (C) 2025 Pedro Henrique / phkaiser13
 * File: src/modules/domains/kubernetes/saectl/src/telemetry.rs
 *
 * Installs the global tracing subscriber. `RUST_LOG` wins when set;
 * otherwise the level follows the number of `-v` flags. Logs go to stderr
 * so command output on stdout stays machine-readable.
 *
 * SPDX-License-Identifier: Apache-2.0 */

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

pub fn init_tracing(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_for(verbosity)));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    // A subscriber may already be installed (tests); keep it.
    let _ = tracing_subscriber::registry().with(filter).with(fmt_layer).try_init();
}
