// ABOUTME: Constants for the Knox client: environment variables, defaults, wire values
// ABOUTME: Central place for the auth header tags and service error codes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Environment variable names
pub mod env_vars {
    /// User token, highest-precedence credential
    pub const USER_AUTH: &str = "KNOX_USER_AUTH";
    /// Raw machine identity string
    pub const MACHINE_AUTH: &str = "KNOX_MACHINE_AUTH";
    /// Service host and port
    pub const HOST: &str = "KNOX_HOST";
    /// Name the server certificate must be issued for
    pub const SERVER_NAME: &str = "KNOX_SERVER_NAME";
    /// Machine certificate PEM file
    pub const CERT_FILE: &str = "KNOX_CERT_FILE";
    /// Machine private key PEM file
    pub const KEY_FILE: &str = "KNOX_KEY_FILE";
    /// Additional trusted CA bundle (PEM)
    pub const CA_FILE: &str = "KNOX_CA_FILE";
    /// Development-only switch that disables server verification
    pub const INSECURE_SKIP_VERIFY: &str = "KNOX_INSECURE_SKIP_VERIFY";
    /// Request timeout in seconds
    pub const REQUEST_TIMEOUT_SECS: &str = "KNOX_REQUEST_TIMEOUT_SECS";
}

/// Defaults applied when the environment is silent
pub mod defaults {
    /// Service host
    pub const HOST: &str = "localhost:9000";
    /// Expected server certificate name
    pub const SERVER_NAME: &str = "knox";
    /// HTTPS port used when the host carries none
    pub const HTTPS_PORT: u16 = 443;
    /// Token cache file name under the user's home directory
    pub const USER_TOKEN_FILE: &str = ".knox_user_auth";
}

/// Authorization header layout: version byte, type byte, identity
pub mod auth_header {
    /// Current protocol version byte
    pub const VERSION_BYTE: char = '0';
    /// Type byte for user tokens
    pub const USER_TYPE: char = 'u';
    /// Type byte for machine (trust) identities
    pub const MACHINE_TYPE: char = 't';
}

/// Service API paths
pub mod paths {
    /// Key collection, relative to the service base URL
    pub const KEYS: &str = "v0/keys/";
}

/// Error codes carried in the service response envelope
pub mod service_codes {
    /// Unexpected server failure
    pub const INTERNAL_SERVER_ERROR: i32 = 1;
    /// Requested key version does not exist
    pub const KEY_VERSION_DOES_NOT_EXIST: i32 = 3;
    /// Requested key does not exist
    pub const KEY_IDENTIFIER_DOES_NOT_EXIST: i32 = 4;
    /// No usable credential was presented
    pub const UNAUTHENTICATED: i32 = 5;
    /// Credential lacks access to the key
    pub const UNAUTHORIZED: i32 = 6;
    /// Route not found
    pub const NOT_FOUND: i32 = 8;
}

/// Name used for the service in diagnostics
pub const SERVICE_NAME: &str = "Knox";
