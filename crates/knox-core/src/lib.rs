// ABOUTME: Shared wire models for the Knox client crates
// ABOUTME: Keys, key versions, lifecycle ordering and the service envelope
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![deny(unsafe_code)]

//! # Knox Core
//!
//! Data types exchanged with the Knox key service. The client only ever holds
//! a transient, read-only copy of a [`models::Key`]; the service owns it.

/// Key, version and response models
pub mod models;
