// ABOUTME: Key version listing filtered by minimum lifecycle state
// ABOUTME: Argument validation, status threshold parsing and per-version output lines
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Version Query
//!
//! `knox versions [-s state] [-v] <key_identifier>` lists the version ids of a
//! key whose status is at least `state` (default `active`). Verbose output adds
//! the JSON form of each status. Versions are printed in the order the service
//! returned them.

use std::io::Write;

use knox_core::models::{Key, KeyVersion, VersionStatus};
use serde::Serialize;
use tracing::debug;

use crate::client::KeyClient;
use crate::errors::{AppError, AppResult};

/// Substituted when a status cannot be serialized
pub const UNKNOWN_STATUS: &str = "(unknown)";

/// Options for one version listing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VersionQuery {
    /// Minimum status to include
    pub threshold: VersionStatus,
    /// Print the status next to each id
    pub verbose: bool,
}

impl VersionQuery {
    /// Query with an explicit threshold
    #[must_use]
    pub const fn new(threshold: VersionStatus, verbose: bool) -> Self {
        Self { threshold, verbose }
    }

    /// Query from the raw `-s` option value
    ///
    /// # Errors
    /// Returns a usage error for values other than `inactive`, `active`, `primary`
    pub fn from_args(status: Option<&str>, verbose: bool) -> AppResult<Self> {
        Ok(Self::new(parse_threshold(status)?, verbose))
    }
}

/// Parse the status threshold option, case-insensitively
///
/// `None` selects `Active`. Unrecognized values are rejected rather than
/// silently changing what is listed.
///
/// # Errors
/// Returns a usage error for unrecognized values
pub fn parse_threshold(value: Option<&str>) -> AppResult<VersionStatus> {
    value.map_or(Ok(VersionStatus::Active), |value| {
        value
            .parse()
            .map_err(|e| AppError::invalid_input(format!("{e}. See 'knox help versions'")))
    })
}

/// The single key identifier in `args`
///
/// # Errors
/// Returns a usage error unless exactly one argument is given
pub fn key_identifier(args: &[String]) -> AppResult<&str> {
    match args {
        [key_id] => Ok(key_id.as_str()),
        _ => Err(AppError::invalid_input(
            "versions takes exactly one argument. See 'knox help versions'",
        )),
    }
}

/// JSON form of a status, or [`UNKNOWN_STATUS`] if it cannot be serialized
#[must_use]
pub fn serialized_status<S: Serialize + ?Sized>(status: &S) -> String {
    serde_json::to_string(status).unwrap_or_else(|e| {
        debug!(error = %e, "Failed to serialize version status");
        UNKNOWN_STATUS.to_owned()
    })
}

/// Output line for one version
#[must_use]
pub fn format_version_line(version: &KeyVersion, verbose: bool) -> String {
    if verbose {
        format!("{} {}", version.id, serialized_status(&version.status))
    } else {
        version.id.to_string()
    }
}

/// Versions of `key` at or above `threshold`, in service order
#[must_use]
pub fn filter_versions(key: &Key, threshold: VersionStatus) -> Vec<&KeyVersion> {
    key.versions_at_least(threshold).collect()
}

/// Fetch the key and build the output lines
///
/// The argument count is checked before any request is made.
///
/// # Errors
/// Returns a usage error for a wrong argument count, or the client's error if
/// the request fails
pub async fn list_versions<C: KeyClient + ?Sized>(
    client: &C,
    args: &[String],
    query: VersionQuery,
) -> AppResult<Vec<String>> {
    let key_id = key_identifier(args)?;
    let key = client.get_key_with_status(key_id, query.threshold).await?;
    let visible = filter_versions(&key, query.threshold);
    debug!(
        key_id = %key_id,
        threshold = %query.threshold,
        returned = key.version_list.len(),
        visible = visible.len(),
        "Fetched key versions"
    );
    Ok(visible
        .into_iter()
        .map(|version| format_version_line(version, query.verbose))
        .collect())
}

/// Run the listing and write one line per version to `out`
///
/// Returns the number of lines written.
///
/// # Errors
/// Returns the listing error, or an internal error if writing fails
pub async fn run_versions<C: KeyClient + ?Sized, W: Write>(
    client: &C,
    args: &[String],
    query: VersionQuery,
    out: &mut W,
) -> AppResult<usize> {
    let lines = list_versions(client, args, query).await?;
    for line in &lines {
        writeln!(out, "{line}")?;
    }
    out.flush()?;
    Ok(lines.len())
}
