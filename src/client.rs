// ABOUTME: HTTP client for the Knox key service
// ABOUTME: Fetches keys with a minimum version status and unwraps the service envelope
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Knox HTTP client
//!
//! The `Authorization` header is recomputed from the [`AuthResolver`] for every
//! request. Failed requests are returned immediately; there is no retry.

use async_trait::async_trait;
use knox_core::models::{Key, ServiceResponse, VersionStatus};
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::auth::AuthResolver;
use crate::constants::{paths, service_codes, SERVICE_NAME};
use crate::errors::{AppError, AppResult, ErrorCode};
use crate::tls::SecureChannel;

/// Boundary to whatever serves key records
#[async_trait]
pub trait KeyClient: Send + Sync {
    /// Fetch `key_id` with only versions at or above `status`
    async fn get_key_with_status(&self, key_id: &str, status: VersionStatus) -> AppResult<Key>;

    /// Fetch `key_id` with active and primary versions
    async fn get_key(&self, key_id: &str) -> AppResult<Key> {
        self.get_key_with_status(key_id, VersionStatus::Active).await
    }
}

/// Knox service client over HTTPS
#[derive(Debug, Clone)]
pub struct KnoxClient {
    http: Client,
    base_url: Url,
    auth: AuthResolver,
}

impl KnoxClient {
    /// Client over an existing HTTP client and base URL
    #[must_use]
    pub fn new(http: Client, base_url: Url, auth: AuthResolver) -> Self {
        Self {
            http,
            base_url,
            auth,
        }
    }

    /// Client over a secure channel
    #[must_use]
    pub fn from_channel(channel: SecureChannel, auth: AuthResolver) -> Self {
        Self::new(channel.client, channel.base_url, auth)
    }

    /// Base URL requests are sent to
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `GET` URL for a key filtered by status
    ///
    /// The status travels as its JSON string form, e.g. `?status=%22Active%22`.
    ///
    /// # Errors
    /// Returns an error if the URL cannot be formed
    pub fn key_url(&self, key_id: &str, status: VersionStatus) -> AppResult<Url> {
        let path = format!("{}{}/", paths::KEYS, urlencoding::encode(key_id));
        let mut url = self
            .base_url
            .join(&path)
            .map_err(|e| AppError::invalid_input(format!("invalid key identifier: {e}")))?;
        let status = serde_json::to_string(&status)
            .map_err(|e| AppError::internal(format!("failed to encode status: {e}")))?;
        url.query_pairs_mut().append_pair("status", &status);
        Ok(url)
    }

    async fn get_data<T: DeserializeOwned>(&self, url: Url) -> AppResult<T> {
        let mut request = self.http.get(url.clone());
        let header = self.auth.header_value();
        if header.is_empty() {
            warn!("No Knox credential available, sending unauthenticated request");
        } else {
            request = request.header(AUTHORIZATION, header);
        }

        debug!(url = %url, "Knox request");
        let response = request
            .send()
            .await
            .map_err(|e| AppError::external_service(SERVICE_NAME, e.to_string()))?;
        let http_status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| AppError::external_service(SERVICE_NAME, e.to_string()))?;

        let envelope: ServiceResponse<T> = match serde_json::from_slice(&body) {
            Ok(envelope) => envelope,
            Err(e) if http_status.is_success() => {
                return Err(AppError::external_service(
                    SERVICE_NAME,
                    format!("malformed response: {e}"),
                ));
            }
            Err(_) => return Err(http_error(http_status)),
        };

        if !envelope.is_ok() {
            return Err(service_error(envelope.code, &envelope.message));
        }
        if !http_status.is_success() {
            return Err(http_error(http_status));
        }
        envelope.data.ok_or_else(|| {
            AppError::external_service(SERVICE_NAME, "response carried no data")
        })
    }
}

#[async_trait]
impl KeyClient for KnoxClient {
    async fn get_key_with_status(&self, key_id: &str, status: VersionStatus) -> AppResult<Key> {
        let url = self.key_url(key_id, status)?;
        self.get_data(url).await
    }
}

fn http_error(status: StatusCode) -> AppError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            AppError::auth_invalid(format!("{SERVICE_NAME} rejected the credential ({status})"))
        }
        StatusCode::NOT_FOUND => AppError::not_found("key"),
        _ => AppError::external_service(SERVICE_NAME, format!("request failed with HTTP {status}")),
    }
}

/// Map an error envelope to an [`AppError`]
#[must_use]
pub fn service_error(code: i32, message: &str) -> AppError {
    match code {
        service_codes::UNAUTHENTICATED | service_codes::UNAUTHORIZED => {
            AppError::auth_invalid(format!("{SERVICE_NAME}: {message}"))
        }
        service_codes::KEY_IDENTIFIER_DOES_NOT_EXIST
        | service_codes::KEY_VERSION_DOES_NOT_EXIST
        | service_codes::NOT_FOUND => AppError::new(
            ErrorCode::ResourceNotFound,
            format!("{SERVICE_NAME}: {message}"),
        ),
        service_codes::INTERNAL_SERVER_ERROR => {
            AppError::external_service(SERVICE_NAME, format!("internal error: {message}"))
        }
        _ => AppError::external_service(SERVICE_NAME, message),
    }
}
