// ABOUTME: `knox versions` subcommand
// ABOUTME: Validates arguments, bootstraps the authenticated client and prints versions
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::io;

use knox_client::{
    auth::AuthResolver,
    client::KnoxClient,
    config::ClientConfig,
    errors::AppResult,
    tls::SecureChannelBuilder,
    versions::{key_identifier, run_versions, VersionQuery},
};
use tracing::info;

/// List the versions of the single key in `key_ids`
///
/// Arguments and the status option are validated before any configuration is
/// loaded or connection made.
pub async fn run(
    host: Option<String>,
    status: Option<&str>,
    verbose: bool,
    key_ids: &[String],
) -> AppResult<()> {
    let key_id = key_identifier(key_ids)?;
    let query = VersionQuery::from_args(status, verbose)?;

    let config = ClientConfig::from_env()?.with_host(host);
    let channel = SecureChannelBuilder::from_config(&config).build().await?;
    let client = KnoxClient::from_channel(channel, AuthResolver::from_env());

    let mut stdout = io::stdout().lock();
    let printed = run_versions(&client, key_ids, query, &mut stdout).await?;
    info!(key_id = %key_id, printed, "Listed key versions");
    Ok(())
}
