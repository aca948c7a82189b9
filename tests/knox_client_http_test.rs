// ABOUTME: End-to-end tests of the Knox HTTP client against a stub server
// ABOUTME: Auth header on the wire, status query encoding and error envelope mapping
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(missing_docs, clippy::unwrap_used)]

mod common;

use axum::http::StatusCode;
use common::{db_password_key, error_envelope, init_test_logging, StubKnoxServer};
use knox_client::auth::{AuthResolver, CredentialSources};
use knox_client::client::{service_error, KeyClient, KnoxClient};
use knox_client::errors::ErrorCode;
use knox_client::models::VersionStatus;
use knox_client::versions::{run_versions, VersionQuery};

fn client_for(server: &StubKnoxServer, sources: CredentialSources) -> KnoxClient {
    KnoxClient::new(
        reqwest::Client::new(),
        server.base_url.clone(),
        AuthResolver::new(sources),
    )
}

fn user_sources(token: &str) -> CredentialSources {
    CredentialSources {
        user_auth: Some(token.to_owned()),
        ..CredentialSources::default()
    }
}

#[tokio::test]
async fn test_db_password_scenario() {
    init_test_logging();
    // The stub ignores the status filter and returns every version
    let server = StubKnoxServer::serving_key(&db_password_key()).await.unwrap();
    let client = client_for(&server, user_sources("abc123"));
    let mut out = Vec::new();

    run_versions(
        &client,
        &["db-password".to_owned()],
        VersionQuery::default(),
        &mut out,
    )
    .await
    .unwrap();

    assert_eq!(String::from_utf8(out).unwrap(), "2\n3\n");

    let recorded = server.recorded();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].key_id, "db-password");
    assert_eq!(recorded[0].authorization.as_deref(), Some("0uabc123"));
    assert_eq!(recorded[0].status.as_deref(), Some("\"Active\""));
}

#[tokio::test]
async fn test_status_threshold_sent_as_json_string() {
    let server = StubKnoxServer::serving_key(&db_password_key()).await.unwrap();
    let client = client_for(&server, user_sources("t"));

    let key = client
        .get_key_with_status("db-password", VersionStatus::Inactive)
        .await
        .unwrap();

    assert_eq!(key.version_list.len(), 3);
    assert_eq!(server.recorded()[0].status.as_deref(), Some("\"Inactive\""));
}

#[tokio::test]
async fn test_key_url_encodes_identifier_and_status() {
    let server = StubKnoxServer::serving_key(&db_password_key()).await.unwrap();
    let client = client_for(&server, CredentialSources::default());

    let url = client
        .key_url("svc:db password", VersionStatus::Primary)
        .unwrap();

    assert!(url
        .as_str()
        .ends_with("/v0/keys/svc%3Adb%20password/?status=%22Primary%22"));
}

#[tokio::test]
async fn test_no_credential_sends_no_authorization_header() {
    let server = StubKnoxServer::serving_key(&db_password_key()).await.unwrap();
    let client = client_for(&server, CredentialSources::default());

    client.get_key("db-password").await.unwrap();

    assert_eq!(server.recorded()[0].authorization, None);
}

#[tokio::test]
async fn test_machine_identity_header_on_the_wire() {
    let server = StubKnoxServer::serving_key(&db_password_key()).await.unwrap();
    let sources = CredentialSources {
        machine_auth: Some("host-7".to_owned()),
        certificate: Some(common::cn_cert_paths()),
        ..CredentialSources::default()
    };
    let client = client_for(&server, sources);

    client.get_key("db-password").await.unwrap();

    assert_eq!(server.recorded()[0].authorization.as_deref(), Some("0tfoo"));
}

#[tokio::test]
async fn test_unauthenticated_envelope_maps_to_auth_error() {
    let server = StubKnoxServer::start(
        StatusCode::UNAUTHORIZED,
        error_envelope(5, "User or machine not authenticated"),
    )
    .await
    .unwrap();
    let client = client_for(&server, CredentialSources::default());

    let err = client.get_key("db-password").await.unwrap_err();

    assert_eq!(err.code, ErrorCode::AuthInvalid);
    assert!(err.message.contains("not authenticated"));
    assert_eq!(err.exit_code(), 1);
}

#[tokio::test]
async fn test_missing_key_envelope_maps_to_not_found() {
    let server = StubKnoxServer::start(
        StatusCode::NOT_FOUND,
        error_envelope(4, "Key identifer does not exist"),
    )
    .await
    .unwrap();
    let client = client_for(&server, user_sources("t"));

    let err = client.get_key("nope").await.unwrap_err();

    assert_eq!(err.code, ErrorCode::ResourceNotFound);
}

#[tokio::test]
async fn test_internal_error_envelope_maps_to_external_service() {
    let server = StubKnoxServer::start(
        StatusCode::INTERNAL_SERVER_ERROR,
        error_envelope(1, "boom"),
    )
    .await
    .unwrap();
    let client = client_for(&server, user_sources("t"));

    let err = client.get_key("db-password").await.unwrap_err();

    assert_eq!(err.code, ErrorCode::ExternalServiceError);
    assert_eq!(err.message, "Knox: internal error: boom");
}

#[test]
fn test_unknown_service_code_keeps_message() {
    let err = service_error(12, "Bad request format");
    assert_eq!(err.code, ErrorCode::ExternalServiceError);
    assert_eq!(err.message, "Knox: Bad request format");
}

#[tokio::test]
async fn test_connection_failure_is_fatal_without_retry() {
    // Port 9 (discard) on loopback is not listening in test environments
    let base = url::Url::parse("http://127.0.0.1:9/").unwrap();
    let client = KnoxClient::new(
        reqwest::Client::new(),
        base,
        AuthResolver::new(user_sources("t")),
    );

    let err = client.get_key("db-password").await.unwrap_err();

    assert_eq!(err.code, ErrorCode::ExternalServiceError);
}
