// ABOUTME: Unified error types for the Knox client library and CLI
// ABOUTME: Error codes, exit-code mapping and credential soft-failure values
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Error Handling
//!
//! Two layers of errors live here:
//!
//! - [`AppError`] is what escapes a command: usage errors and remote request
//!   failures. The binary's dispatcher maps its [`ErrorCode`] to an exit code.
//! - [`CredentialError`] describes why one credential source could not be used.
//!   These never escape the auth resolver; each one moves resolution on to the
//!   next source.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias used across the crate
pub type AppResult<T> = Result<T, AppError>;

/// Error categories surfaced to the command dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Wrong argument count or unrecognized option value
    InvalidInput,
    /// The service rejected the presented credential
    AuthInvalid,
    /// The requested key or version does not exist
    ResourceNotFound,
    /// Transport failure or an error reported by the service
    ExternalServiceError,
    /// Invalid environment configuration
    ConfigError,
    /// Local failure unrelated to input or the service
    InternalError,
}

impl ErrorCode {
    /// Process exit code for this category
    ///
    /// Usage errors exit with 2, every other failure with 1.
    #[must_use]
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::InvalidInput => 2,
            Self::AuthInvalid
            | Self::ResourceNotFound
            | Self::ExternalServiceError
            | Self::ConfigError
            | Self::InternalError => 1,
        }
    }

    /// Short human-readable category name
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::InvalidInput => "usage error",
            Self::AuthInvalid => "authentication failed",
            Self::ResourceNotFound => "not found",
            Self::ExternalServiceError => "request failed",
            Self::ConfigError => "configuration error",
            Self::InternalError => "internal error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Error returned to the command dispatcher
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AppError {
    /// Error category
    pub code: ErrorCode,
    /// Diagnostic shown to the user
    pub message: String,
}

impl AppError {
    /// Create an error with an explicit code
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Usage error (wrong argument count, bad option value)
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// The service refused the credential
    pub fn auth_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthInvalid, message)
    }

    /// The requested resource does not exist
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ResourceNotFound,
            format!("{} not found", resource.into()),
        )
    }

    /// Transport failure or service-reported error
    pub fn external_service(service: &str, message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ExternalServiceError,
            format!("{service}: {}", message.into()),
        )
    }

    /// Invalid configuration value
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    /// Local failure
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Exit code for the dispatcher
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.code.exit_code()
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        Self::internal(format!("I/O error: {err}"))
    }
}

/// Why a credential source could not produce an identity
///
/// Messages never include credential material.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// No certificate/key paths were configured
    #[error("no machine certificate configured")]
    CertificateNotConfigured,

    /// Certificate or key file could not be read
    #[error("failed to read {path}: {source}")]
    FileRead {
        /// File that failed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The certificate file holds no PEM certificate block
    #[error("invalid certificate PEM: {0}")]
    CertificatePem(String),

    /// The DER certificate could not be parsed as X.509
    #[error("invalid X.509 certificate: {0}")]
    CertificateParse(String),

    /// Certificate and key could not be combined into a client identity
    #[error("invalid certificate/key pair: {0}")]
    KeyPair(String),

    /// The current user's home directory could not be determined
    #[error("home directory unavailable")]
    HomeDirUnavailable,

    /// The token cache file is not a valid token record
    #[error("malformed token cache {path}: {source}")]
    TokenParse {
        /// Token cache file
        path: PathBuf,
        /// JSON error
        #[source]
        source: serde_json::Error,
    },

    /// The token cache records a failed login
    #[error("token cache holds a login error: {0}")]
    TokenRejected(String),

    /// The token cache has no access token
    #[error("token cache has an empty access token")]
    EmptyToken,
}
