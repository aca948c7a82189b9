// ABOUTME: Main library entry point for the Knox command-line client
// ABOUTME: Credential resolution, mutual-TLS bootstrap and key version listing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

// Crate-level attributes:
// - deny(unsafe_code): Zero-tolerance unsafe policy.
#![deny(unsafe_code)]

//! # Knox Client
//!
//! Client-side logic for the `knox` command-line tool, which talks to a Knox
//! secret-management service.
//!
//! ## Architecture
//!
//! - **Identity**: derives a machine identity from an X.509 certificate
//! - **Auth**: picks one credential source and builds the `Authorization` header
//! - **TLS**: builds the mutual-TLS transport with server-name pinning
//! - **Client**: fetches keys from the service
//! - **Versions**: filters a key's versions by lifecycle state and formats them
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use knox_client::auth::AuthResolver;
//! use knox_client::client::KnoxClient;
//! use knox_client::config::ClientConfig;
//! use knox_client::errors::AppResult;
//! use knox_client::tls::SecureChannelBuilder;
//! use knox_client::versions::{run_versions, VersionQuery};
//!
//! async fn list(key_id: String) -> AppResult<()> {
//!     let config = ClientConfig::from_env()?;
//!     let channel = SecureChannelBuilder::from_config(&config).build().await?;
//!     let client = KnoxClient::from_channel(channel, AuthResolver::from_env());
//!
//!     let query = VersionQuery::from_args(Some("primary"), true)?;
//!     run_versions(&client, &[key_id], query, &mut std::io::stdout()).await?;
//!     Ok(())
//! }
//! ```

/// Credential precedence chain and `Authorization` header construction
pub mod auth;

/// Knox service HTTP client
pub mod client;

/// Environment configuration
pub mod config;

/// Environment variable names, defaults and wire constants
pub mod constants;

/// Error types and exit-code mapping
pub mod errors;

/// Certificate identity extraction
pub mod identity;

/// Logging setup
pub mod logging;

/// Mutual-TLS transport construction
pub mod tls;

/// Key version listing
pub mod versions;

pub use knox_core::models;
