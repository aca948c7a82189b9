// ABOUTME: Mutual-TLS transport bootstrap for the Knox service
// ABOUTME: Certificate pair loading and HTTP client construction with server-name pinning
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Secure Channel
//!
//! The Knox server presents a certificate issued for a fixed name (`knox` by
//! default) regardless of which host it is reached on. [`SecureChannelBuilder`]
//! puts that name in the request URL and pins it to the configured host's
//! addresses, so rustls verifies the certificate against the expected name.
//!
//! A client certificate is attached when the pair loads. When it does not, the
//! channel is still built (server-authenticated only) and machine
//! authentication will be rejected by the service.

use std::fmt;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::{Certificate, Client, Identity};
use tokio::net::lookup_host;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::{CertificatePaths, ClientConfig};
use crate::constants::{defaults, SERVICE_NAME};
use crate::errors::{AppError, AppResult, CredentialError};
use crate::identity::leaf_der_from_pem;

/// A PEM certificate chain and its private key
#[derive(Clone)]
pub struct CertificatePair {
    certificate_pem: Vec<u8>,
    private_key_pem: Vec<u8>,
}

impl fmt::Debug for CertificatePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertificatePair")
            .field("certificate_pem_len", &self.certificate_pem.len())
            .field("private_key_pem", &"<redacted>")
            .finish()
    }
}

impl CertificatePair {
    /// Validate and wrap PEM material
    ///
    /// The private key must belong to the leaf certificate.
    ///
    /// # Errors
    /// Returns an error if the certificate has no PEM certificate block, the
    /// key or certificates cannot be parsed, or the key does not match the
    /// certificate
    pub fn from_pem(
        certificate_pem: impl Into<Vec<u8>>,
        private_key_pem: impl Into<Vec<u8>>,
    ) -> Result<Self, CredentialError> {
        let pair = Self {
            certificate_pem: certificate_pem.into(),
            private_key_pem: private_key_pem.into(),
        };
        pair.leaf_der()?;
        check_key_matches(pair.identity()?)?;
        Ok(pair)
    }

    /// Read and validate the pair from disk
    ///
    /// # Errors
    /// Returns an error if either file cannot be read or the material is invalid
    pub fn load(paths: &CertificatePaths) -> Result<Self, CredentialError> {
        let certificate_pem = read_file(&paths.cert_file)?;
        let private_key_pem = read_file(&paths.key_file)?;
        Self::from_pem(certificate_pem, private_key_pem)
    }

    /// Load from optional paths, reporting unset paths as an error value
    ///
    /// # Errors
    /// Returns [`CredentialError::CertificateNotConfigured`] when `paths` is `None`
    pub fn load_configured(paths: Option<&CertificatePaths>) -> Result<Self, CredentialError> {
        paths.map_or(Err(CredentialError::CertificateNotConfigured), Self::load)
    }

    /// DER encoding of the leaf certificate
    ///
    /// # Errors
    /// Returns an error if the certificate PEM is malformed
    pub fn leaf_der(&self) -> Result<Vec<u8>, CredentialError> {
        leaf_der_from_pem(&self.certificate_pem)
    }

    /// TLS client identity (key followed by the certificate chain)
    ///
    /// # Errors
    /// Returns an error if the key or certificates cannot be parsed
    pub fn identity(&self) -> Result<Identity, CredentialError> {
        let mut bundle =
            Vec::with_capacity(self.private_key_pem.len() + self.certificate_pem.len() + 1);
        bundle.extend_from_slice(&self.private_key_pem);
        bundle.push(b'\n');
        bundle.extend_from_slice(&self.certificate_pem);
        Identity::from_pem(&bundle).map_err(|e| CredentialError::KeyPair(e.to_string()))
    }
}

// rustls checks the key against the leaf when the client config is assembled
fn check_key_matches(identity: Identity) -> Result<(), CredentialError> {
    Client::builder()
        .use_rustls_tls()
        .identity(identity)
        .build()
        .map(drop)
        .map_err(|e| {
            let detail = std::error::Error::source(&e)
                .map_or_else(|| e.to_string(), ToString::to_string);
            CredentialError::KeyPair(format!(
                "private key does not match certificate: {detail}"
            ))
        })
}

fn read_file(path: &Path) -> Result<Vec<u8>, CredentialError> {
    fs::read(path).map_err(|source| CredentialError::FileRead {
        path: path.to_path_buf(),
        source,
    })
}

/// Split `host[:port]` into host name and optional port, handling `[v6]:port`
#[must_use]
pub fn split_host_port(host: &str) -> (&str, Option<u16>) {
    if let Some(rest) = host.strip_prefix('[') {
        if let Some((addr, tail)) = rest.split_once(']') {
            let port = tail.strip_prefix(':').and_then(|p| p.parse().ok());
            return (addr, port);
        }
    }
    match host.rsplit_once(':') {
        Some((name, port)) if !name.contains(':') => match port.parse() {
            Ok(port) => (name, Some(port)),
            Err(_) => (host, None),
        },
        _ => (host, None),
    }
}

/// An HTTP client configured for the Knox service plus the base URL to use
#[derive(Debug, Clone)]
pub struct SecureChannel {
    /// Configured HTTP client
    pub client: Client,
    /// Base URL, ending in `/`
    pub base_url: Url,
    /// Whether a client certificate is presented
    pub mutual: bool,
}

/// Builds the TLS transport for the Knox service
#[derive(Debug, Clone)]
pub struct SecureChannelBuilder {
    host: String,
    server_name: String,
    client_certificate: Option<CertificatePair>,
    ca_bundle_file: Option<PathBuf>,
    insecure_skip_verify: bool,
    timeout: Option<Duration>,
}

impl SecureChannelBuilder {
    /// Start a builder for `host` expecting a server certificate for `server_name`
    pub fn new(host: impl Into<String>, server_name: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            server_name: server_name.into(),
            client_certificate: None,
            ca_bundle_file: None,
            insecure_skip_verify: false,
            timeout: None,
        }
    }

    /// Builder from environment configuration
    ///
    /// A configured certificate pair that fails to load is logged and skipped.
    #[must_use]
    pub fn from_config(config: &ClientConfig) -> Self {
        let client_certificate = match config.certificate.as_ref() {
            Some(paths) => match CertificatePair::load(paths) {
                Ok(pair) => Some(pair),
                Err(e) => {
                    warn!(
                        error = %e,
                        "Client certificate unavailable, continuing without mutual TLS"
                    );
                    None
                }
            },
            None => None,
        };

        Self::new(&config.host, &config.server_name)
            .client_certificate(client_certificate)
            .ca_bundle_file(config.ca_file.clone())
            .insecure_skip_verify(config.insecure_skip_verify)
            .timeout(config.request_timeout)
    }

    /// Attach (or clear) the client certificate
    #[must_use]
    pub fn client_certificate(mut self, pair: Option<CertificatePair>) -> Self {
        self.client_certificate = pair;
        self
    }

    /// Trust the CA certificates in this PEM file in addition to the defaults
    #[must_use]
    pub fn ca_bundle_file(mut self, path: Option<PathBuf>) -> Self {
        self.ca_bundle_file = path;
        self
    }

    /// Skip server certificate verification. Development only.
    #[must_use]
    pub fn insecure_skip_verify(mut self, on: bool) -> Self {
        self.insecure_skip_verify = on;
        self
    }

    /// Overall request timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether a client certificate will be presented
    #[must_use]
    pub fn has_client_certificate(&self) -> bool {
        self.client_certificate.is_some()
    }

    /// Whether the request URL uses the server name instead of the host name
    #[must_use]
    pub fn pins_server_name(&self) -> bool {
        let (host_name, _) = split_host_port(&self.host);
        !self.server_name.is_empty() && !self.server_name.eq_ignore_ascii_case(host_name)
    }

    /// Base URL the requests are sent to
    ///
    /// # Errors
    /// Returns a configuration error if the host or server name do not form a URL
    pub fn base_url(&self) -> AppResult<Url> {
        let (host_name, port) = split_host_port(&self.host);
        let url_host = if self.pins_server_name() {
            self.server_name.as_str()
        } else {
            host_name
        };
        let url_host = if url_host.contains(':') {
            format!("[{url_host}]")
        } else {
            url_host.to_owned()
        };
        let port = port.unwrap_or(defaults::HTTPS_PORT);
        Url::parse(&format!("https://{url_host}:{port}/"))
            .map_err(|e| AppError::config(format!("invalid Knox host '{}': {e}", self.host)))
    }

    async fn resolve_host(&self) -> AppResult<Vec<SocketAddr>> {
        let (host_name, port) = split_host_port(&self.host);
        let port = port.unwrap_or(defaults::HTTPS_PORT);
        let addrs: Vec<SocketAddr> = lookup_host((host_name, port))
            .await
            .map_err(|e| {
                AppError::external_service(
                    SERVICE_NAME,
                    format!("failed to resolve {}: {e}", self.host),
                )
            })?
            .collect();
        if addrs.is_empty() {
            return Err(AppError::external_service(
                SERVICE_NAME,
                format!("{} resolved to no addresses", self.host),
            ));
        }
        Ok(addrs)
    }

    /// Build the HTTP client
    ///
    /// # Errors
    /// Returns an error if the CA bundle cannot be read, the host cannot be
    /// resolved for server-name pinning, or the client fails to build
    pub async fn build(self) -> AppResult<SecureChannel> {
        let base_url = self.base_url()?;
        let mut builder = Client::builder().use_rustls_tls();

        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        if self.pins_server_name() {
            let addrs = self.resolve_host().await?;
            debug!(
                server_name = %self.server_name,
                host = %self.host,
                "Pinning expected server name to configured host"
            );
            builder = builder.resolve_to_addrs(&self.server_name, &addrs);
        }

        if let Some(path) = &self.ca_bundle_file {
            let pem = fs::read(path).map_err(|e| {
                AppError::config(format!("failed to read CA bundle {}: {e}", path.display()))
            })?;
            let certificates = Certificate::from_pem_bundle(&pem).map_err(|e| {
                AppError::config(format!("invalid CA bundle {}: {e}", path.display()))
            })?;
            for certificate in certificates {
                builder = builder.add_root_certificate(certificate);
            }
        }

        if self.insecure_skip_verify {
            warn!("Server certificate verification DISABLED - never use outside development");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let mutual = match &self.client_certificate {
            Some(pair) => match pair.identity() {
                Ok(identity) => {
                    builder = builder.identity(identity);
                    true
                }
                Err(e) => {
                    warn!(error = %e, "Client certificate rejected, continuing without mutual TLS");
                    false
                }
            },
            None => false,
        };

        let client = builder.build().map_err(|e| {
            AppError::internal(format!("failed to build HTTP client: {e}"))
        })?;

        info!(
            base_url = %base_url,
            mutual_tls = mutual,
            "Secure channel configured"
        );

        Ok(SecureChannel {
            client,
            base_url,
            mutual,
        })
    }
}
