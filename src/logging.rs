// ABOUTME: Logging setup for the Knox CLI
// ABOUTME: tracing-subscriber fmt output on stderr with RUST_LOG override
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::io;

use tracing_subscriber::EnvFilter;

/// Default filter when `--debug` is not given
pub const DEFAULT_LEVEL: &str = "warn";
/// Filter under `--debug`
pub const DEBUG_LEVEL: &str = "debug";

/// Filter directive for the requested verbosity
#[must_use]
pub fn level_for(debug: bool) -> &'static str {
    if debug {
        DEBUG_LEVEL
    } else {
        DEFAULT_LEVEL
    }
}

/// Install the global subscriber
///
/// Logs go to stderr so stdout carries only command output. `RUST_LOG`
/// overrides the level. Calling this twice is harmless.
pub fn init(debug: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_for(debug)));

    // Already-installed subscriber (tests, embedding) is fine
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}
