// ABOUTME: Response envelope wrapping every Knox service payload
// ABOUTME: Carries the service status, error code and message alongside data
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use serde::{Deserialize, Serialize};

/// Status string the service uses for successful responses
pub const STATUS_OK: &str = "ok";

/// Envelope returned by every Knox endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceResponse<T> {
    /// `"ok"` on success, `"error"` otherwise
    pub status: String,
    /// Service error code (0 on success)
    #[serde(default)]
    pub code: i32,
    /// Host that served the request
    #[serde(default)]
    pub host: String,
    /// Server timestamp in unix nanoseconds
    #[serde(rename = "ts", default)]
    pub timestamp: i64,
    /// Human-readable error message
    #[serde(default)]
    pub message: String,
    /// Payload, absent on errors
    pub data: Option<T>,
}

impl<T> ServiceResponse<T> {
    /// Whether the service reported success
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }
}
