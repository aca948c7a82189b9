// ABOUTME: Wire models for the Knox key service
// ABOUTME: Re-exports key, version and response envelope types
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Keys, versions and lifecycle states
pub mod key;
/// Service response envelope
pub mod response;

pub use key::{Access, Key, KeyVersion, ParseVersionStatusError, VersionStatus};
pub use response::{ServiceResponse, STATUS_OK};
