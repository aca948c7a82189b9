// ABOUTME: Credential precedence chain producing the Knox Authorization header
// ABOUTME: User token, machine certificate identity, cached login token, or nothing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Auth Resolution
//!
//! The Knox service expects `Authorization: <version><type><identity>`, where
//! the version byte is `0` and the type byte is `u` (user) or `t` (machine).
//!
//! Sources are tried in order and the first usable one wins:
//!
//! 1. `KNOX_USER_AUTH`
//! 2. `KNOX_MACHINE_AUTH`, replaced by the identity in the machine certificate
//!    when the certificate loads
//! 3. the access token cached by `knox login` in `~/.knox_user_auth`
//!
//! Credentials from different sources are never combined. Resolution never
//! fails: when nothing is usable the header is empty and the service rejects
//! the request.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::environment::non_empty_var;
use crate::config::CertificatePaths;
use crate::constants::{auth_header, defaults, env_vars};
use crate::errors::CredentialError;
use crate::identity::identity_from_der;
use crate::tls::CertificatePair;

/// The identity selected for one invocation
#[derive(Clone, PartialEq, Eq)]
pub enum AuthIdentity {
    /// User access token
    User(String),
    /// Machine identity
    Machine(String),
}

impl fmt::Debug for AuthIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(_) => f.write_str("User(<redacted>)"),
            Self::Machine(identity) => f.debug_tuple("Machine").field(identity).finish(),
        }
    }
}

impl AuthIdentity {
    /// Type byte for the header
    #[must_use]
    pub const fn type_byte(&self) -> char {
        match self {
            Self::User(_) => auth_header::USER_TYPE,
            Self::Machine(_) => auth_header::MACHINE_TYPE,
        }
    }

    /// Token or identity string
    #[must_use]
    pub fn credential(&self) -> &str {
        match self {
            Self::User(token) => token,
            Self::Machine(identity) => identity,
        }
    }

    /// Full `Authorization` header value
    #[must_use]
    pub fn header_value(&self) -> String {
        let credential = self.credential();
        let mut value = String::with_capacity(credential.len() + 2);
        value.push(auth_header::VERSION_BYTE);
        value.push(self.type_byte());
        value.push_str(credential);
        value
    }
}

/// Token record written by `knox login`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CachedUserToken {
    /// OAuth access token
    #[serde(default)]
    pub access_token: String,
    /// Error reported by the token endpoint, empty on success
    #[serde(default)]
    pub error: String,
}

impl CachedUserToken {
    /// Path of the token cache under `home`
    #[must_use]
    pub fn path_in(home: &Path) -> PathBuf {
        home.join(defaults::USER_TOKEN_FILE)
    }

    /// Parse a token record
    ///
    /// # Errors
    /// Returns an error if the JSON is malformed, records a login error, or
    /// carries no access token
    pub fn parse(path: &Path, contents: &[u8]) -> Result<Self, CredentialError> {
        let token: Self =
            serde_json::from_slice(contents).map_err(|source| CredentialError::TokenParse {
                path: path.to_path_buf(),
                source,
            })?;
        if !token.error.is_empty() {
            return Err(CredentialError::TokenRejected(token.error));
        }
        if token.access_token.is_empty() {
            return Err(CredentialError::EmptyToken);
        }
        Ok(token)
    }

    /// Read the token cache from `home`
    ///
    /// # Errors
    /// Returns an error if `home` is unknown, the file is unreadable, or its
    /// contents are not a usable token
    pub fn load(home: Option<&Path>) -> Result<Self, CredentialError> {
        let home = home.ok_or(CredentialError::HomeDirUnavailable)?;
        let path = Self::path_in(home);
        let contents = fs::read(&path).map_err(|source| CredentialError::FileRead {
            path: path.clone(),
            source,
        })?;
        Self::parse(&path, &contents)
    }
}

/// Everything the resolver may draw a credential from
#[derive(Debug, Clone, Default)]
pub struct CredentialSources {
    /// User token (`KNOX_USER_AUTH`)
    pub user_auth: Option<String>,
    /// Raw machine identity (`KNOX_MACHINE_AUTH`)
    pub machine_auth: Option<String>,
    /// Machine certificate used to derive the machine identity
    pub certificate: Option<CertificatePaths>,
    /// Home directory holding the token cache
    pub home_dir: Option<PathBuf>,
}

impl CredentialSources {
    /// Snapshot the process environment and home directory
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            user_auth: non_empty_var(env_vars::USER_AUTH),
            machine_auth: non_empty_var(env_vars::MACHINE_AUTH),
            certificate: CertificatePaths::from_env(),
            home_dir: dirs::home_dir(),
        }
    }
}

/// Machine identity for `raw`, preferring the identity in the certificate
///
/// Falls back to `raw` when the pair did not load or the certificate does not
/// parse.
#[must_use]
pub fn machine_identity(raw: &str, pair: Result<CertificatePair, CredentialError>) -> String {
    let identity = pair
        .and_then(|pair| pair.leaf_der())
        .and_then(|der| identity_from_der(&der, raw));
    match identity {
        Ok(identity) => identity,
        Err(e) => {
            debug!(reason = %e, "Using raw machine identity");
            raw.to_owned()
        }
    }
}

/// Walks the credential precedence chain
#[derive(Debug, Clone, Default)]
pub struct AuthResolver {
    sources: CredentialSources,
}

impl AuthResolver {
    /// Resolver over explicit sources
    #[must_use]
    pub const fn new(sources: CredentialSources) -> Self {
        Self { sources }
    }

    /// Resolver over the process environment
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(CredentialSources::from_env())
    }

    /// Sources this resolver reads
    #[must_use]
    pub const fn sources(&self) -> &CredentialSources {
        &self.sources
    }

    /// Select the identity for this invocation, if any source is usable
    #[must_use]
    pub fn resolve(&self) -> Option<AuthIdentity> {
        if let Some(token) = non_empty(self.sources.user_auth.as_deref()) {
            debug!(source = env_vars::USER_AUTH, "Using user credential");
            return Some(AuthIdentity::User(token.to_owned()));
        }

        if let Some(raw) = non_empty(self.sources.machine_auth.as_deref()) {
            let pair = CertificatePair::load_configured(self.sources.certificate.as_ref());
            let identity = machine_identity(raw, pair);
            debug!(identity = %identity, "Using machine credential");
            return Some(AuthIdentity::Machine(identity));
        }

        match CachedUserToken::load(self.sources.home_dir.as_deref()) {
            Ok(token) => {
                debug!(source = defaults::USER_TOKEN_FILE, "Using cached user token");
                Some(AuthIdentity::User(token.access_token))
            }
            Err(e) => {
                debug!(reason = %e, "No credential available");
                None
            }
        }
    }

    /// `Authorization` header value, empty when no credential is available
    #[must_use]
    pub fn header_value(&self) -> String {
        self.resolve()
            .as_ref()
            .map_or_else(String::new, AuthIdentity::header_value)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
