// ABOUTME: Configuration management for the Knox client
// ABOUTME: Environment-only configuration, no config files
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// `KNOX_*` environment configuration
pub mod environment;

pub use environment::{CertificatePaths, ClientConfig};
