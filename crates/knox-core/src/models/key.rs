// ABOUTME: Key and key version types returned by the Knox service
// ABOUTME: Lifecycle ordering for version filtering and status parsing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle stage of a key version
///
/// Variant order is the lifecycle order: `Inactive < Active < Primary`.
/// Filtering "at least this state" relies on the derived `Ord`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum VersionStatus {
    /// Retired version, hidden unless explicitly requested
    Inactive,
    /// Valid version that may still be used to decrypt or verify
    #[default]
    Active,
    /// The version the service currently considers authoritative
    Primary,
}

impl VersionStatus {
    /// Lowercase name accepted on the command line
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::Active => "active",
            Self::Primary => "primary",
        }
    }

    /// Whether a version in this state is visible under `threshold`
    #[must_use]
    pub fn is_at_least(self, threshold: Self) -> bool {
        self >= threshold
    }
}

impl fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a status name is not one of `inactive`, `active`, `primary`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown version status '{0}' (expected inactive, active or primary)")]
pub struct ParseVersionStatusError(pub String);

impl FromStr for VersionStatus {
    type Err = ParseVersionStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "inactive" => Ok(Self::Inactive),
            "active" => Ok(Self::Active),
            "primary" => Ok(Self::Primary),
            _ => Err(ParseVersionStatusError(s.to_owned())),
        }
    }
}

/// A single version of a key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyVersion {
    /// Version identifier, unique within the key
    pub id: u64,
    /// Secret material, base64 encoded
    #[serde(default)]
    pub data: String,
    /// Current lifecycle state
    pub status: VersionStatus,
    /// Creation time in unix nanoseconds
    #[serde(rename = "ts", default)]
    pub creation_time: i64,
}

impl KeyVersion {
    /// Decode the secret material
    ///
    /// # Errors
    /// Returns an error if `data` is not valid standard base64
    pub fn decoded_data(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(&self.data)
    }
}

/// Access control entry attached to a key
///
/// The client never evaluates ACLs, so principal and access types are kept
/// as the service's string names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Access {
    /// Principal type (`User`, `UserGroup`, `Machine`, `MachinePrefix`, `Service`)
    #[serde(rename = "type")]
    pub principal_type: String,
    /// Principal identifier
    pub id: String,
    /// Granted access level (`None`, `Read`, `Write`, `Admin`)
    #[serde(rename = "access")]
    pub access_type: String,
}

/// A key and its (possibly status-filtered) version history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key {
    /// Key identifier
    pub id: String,
    /// Access control list
    #[serde(default)]
    pub acl: Vec<Access>,
    /// Versions in the order the service returned them
    #[serde(rename = "versions", default)]
    pub version_list: Vec<KeyVersion>,
    /// Hash over the version list, used by the service for cache checks
    #[serde(rename = "hash", default)]
    pub version_hash: String,
    /// On-disk cache path, if the service reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl Key {
    /// Versions at or above `threshold`, in service order
    pub fn versions_at_least(
        &self,
        threshold: VersionStatus,
    ) -> impl Iterator<Item = &KeyVersion> + '_ {
        self.version_list
            .iter()
            .filter(move |version| version.status.is_at_least(threshold))
    }
}
