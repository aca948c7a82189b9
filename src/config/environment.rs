// ABOUTME: Environment-based configuration for the Knox client transport
// ABOUTME: Host, expected server name, certificate paths and TLS options
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Environment-only configuration
//!
//! Every value comes from a `KNOX_*` variable; empty variables count as unset.
//! Credentials are read separately by [`crate::auth::CredentialSources`] so the
//! transport configuration never carries a token.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::constants::{defaults, env_vars};
use crate::errors::{AppError, AppResult};

/// Read an environment variable, treating empty values as unset
#[must_use]
pub fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.is_empty())
}

/// Parse a boolean flag value (`1`, `true`, `yes`, `on` and their negations)
///
/// # Errors
/// Returns a configuration error for any other value
pub fn parse_bool(name: &str, value: &str) -> AppResult<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(AppError::config(format!(
            "{name} must be a boolean, got '{other}'"
        ))),
    }
}

/// Location of the machine certificate and its private key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificatePaths {
    /// PEM certificate chain, leaf first
    pub cert_file: PathBuf,
    /// PEM private key
    pub key_file: PathBuf,
}

impl CertificatePaths {
    /// Create from explicit paths
    pub fn new(cert_file: impl Into<PathBuf>, key_file: impl Into<PathBuf>) -> Self {
        Self {
            cert_file: cert_file.into(),
            key_file: key_file.into(),
        }
    }

    /// Read `KNOX_CERT_FILE` and `KNOX_KEY_FILE`
    ///
    /// Both must be set; a lone half is ignored with a warning.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        match (
            non_empty_var(env_vars::CERT_FILE),
            non_empty_var(env_vars::KEY_FILE),
        ) {
            (Some(cert), Some(key)) => Some(Self::new(cert, key)),
            (None, None) => None,
            (cert, _) => {
                warn!(
                    missing = if cert.is_some() {
                        env_vars::KEY_FILE
                    } else {
                        env_vars::CERT_FILE
                    },
                    "Machine certificate configured without its counterpart, ignoring"
                );
                None
            }
        }
    }
}

/// Transport configuration for talking to the Knox service
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Service `host:port`
    pub host: String,
    /// Name the server certificate is verified against
    pub server_name: String,
    /// Client certificate presented during the handshake
    pub certificate: Option<CertificatePaths>,
    /// Extra trusted CA bundle
    pub ca_file: Option<PathBuf>,
    /// Disable server certificate verification (development only)
    pub insecure_skip_verify: bool,
    /// Overall request timeout
    pub request_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: defaults::HOST.to_owned(),
            server_name: defaults::SERVER_NAME.to_owned(),
            certificate: None,
            ca_file: None,
            insecure_skip_verify: false,
            request_timeout: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from `KNOX_*` environment variables
    ///
    /// # Errors
    /// Returns a configuration error if a boolean or numeric variable is malformed
    pub fn from_env() -> AppResult<Self> {
        let insecure_skip_verify = non_empty_var(env_vars::INSECURE_SKIP_VERIFY)
            .map(|value| parse_bool(env_vars::INSECURE_SKIP_VERIFY, &value))
            .transpose()?
            .unwrap_or(false);

        let request_timeout = non_empty_var(env_vars::REQUEST_TIMEOUT_SECS)
            .map(|value| {
                value.parse::<u64>().map(Duration::from_secs).map_err(|e| {
                    AppError::config(format!(
                        "{} must be a whole number of seconds: {e}",
                        env_vars::REQUEST_TIMEOUT_SECS
                    ))
                })
            })
            .transpose()?;

        Ok(Self {
            host: non_empty_var(env_vars::HOST).unwrap_or_else(|| defaults::HOST.to_owned()),
            server_name: non_empty_var(env_vars::SERVER_NAME)
                .unwrap_or_else(|| defaults::SERVER_NAME.to_owned()),
            certificate: CertificatePaths::from_env(),
            ca_file: non_empty_var(env_vars::CA_FILE).map(PathBuf::from),
            insecure_skip_verify,
            request_timeout,
        })
    }

    /// Replace the host, e.g. from a command-line flag
    #[must_use]
    pub fn with_host(mut self, host: Option<String>) -> Self {
        if let Some(host) = host.filter(|h| !h.is_empty()) {
            self.host = host;
        }
        self
    }
}
