// ABOUTME: Shared test utilities for Knox client integration tests
// ABOUTME: Fixture paths, key builders, a recording key client and a stub Knox server
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]
//! Shared test utilities for `knox_client`

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Once};

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    extract::{Path as AxumPath, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use knox_client::{
    client::KeyClient,
    config::CertificatePaths,
    errors::{AppError, AppResult},
    identity::identity_from_der,
    models::{Key, KeyVersion, VersionStatus},
};
use rustls::pki_types::{pem::PemObject, CertificateDer, PrivateKeyDer};
use rustls::server::WebPkiClientVerifier;
use rustls::{RootCertStore, ServerConfig};
use serde_json::{json, Value};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::{net::TcpListener, task::JoinHandle};
use tokio_rustls::TlsAcceptor;

static INIT_LOGGER: Once = Once::new();

/// Route test logs through the crate's logging setup once per process
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| knox_client::logging::init(false));
}

pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Certificate with `CN=foo` and a `bar.example.com` DNS SAN
pub fn cn_cert_paths() -> CertificatePaths {
    CertificatePaths::new(fixture("cn_cert.pem"), fixture("cn_key.pem"))
}

/// Certificate without CN, SANs `example.com` and `www.example.com`
pub fn san_cert_paths() -> CertificatePaths {
    CertificatePaths::new(fixture("san_cert.pem"), fixture("san_key.pem"))
}

/// Certificate with neither CN nor SAN
pub fn bare_cert_paths() -> CertificatePaths {
    CertificatePaths::new(fixture("bare_cert.pem"), fixture("bare_key.pem"))
}

/// Certificate whose private key belongs to a different certificate
pub fn mismatched_cert_paths() -> CertificatePaths {
    CertificatePaths::new(fixture("cn_cert.pem"), fixture("san_key.pem"))
}

/// Client certificate `CN=knox-test-client` issued by the test CA
pub fn tls_client_cert_paths() -> CertificatePaths {
    CertificatePaths::new(fixture("tls_client_cert.pem"), fixture("tls_client_key.pem"))
}

pub fn version(id: u64, status: VersionStatus) -> KeyVersion {
    KeyVersion {
        id,
        data: String::new(),
        status,
        creation_time: 0,
    }
}

pub fn key_with_versions(id: &str, versions: &[(u64, VersionStatus)]) -> Key {
    Key {
        id: id.to_owned(),
        acl: Vec::new(),
        version_list: versions
            .iter()
            .map(|(id, status)| version(*id, *status))
            .collect(),
        version_hash: "hash".to_owned(),
        path: None,
    }
}

/// `db-password` with versions 1 (inactive), 2 (active), 3 (primary)
pub fn db_password_key() -> Key {
    key_with_versions(
        "db-password",
        &[
            (1, VersionStatus::Inactive),
            (2, VersionStatus::Active),
            (3, VersionStatus::Primary),
        ],
    )
}

/// In-memory key client recording every request
#[derive(Default)]
pub struct RecordingKeyClient {
    keys: HashMap<String, Key>,
    pub calls: Mutex<Vec<(String, VersionStatus)>>,
}

impl RecordingKeyClient {
    pub fn with_key(key: Key) -> Self {
        let mut keys = HashMap::new();
        keys.insert(key.id.clone(), key);
        Self {
            keys,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl KeyClient for RecordingKeyClient {
    async fn get_key_with_status(&self, key_id: &str, status: VersionStatus) -> AppResult<Key> {
        self.calls
            .lock()
            .unwrap()
            .push((key_id.to_owned(), status));
        self.keys
            .get(key_id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("key {key_id}")))
    }
}

/// One request seen by the stub server
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub key_id: String,
    pub authorization: Option<String>,
    pub status: Option<String>,
}

#[derive(Clone)]
struct StubState {
    response: Arc<(StatusCode, Value)>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

/// Stub Knox server answering every key request with a fixed response
pub struct StubKnoxServer {
    pub base_url: url::Url,
    pub requests: Arc<Mutex<Vec<RecordedRequest>>>,
    handle: JoinHandle<()>,
}

impl StubKnoxServer {
    pub async fn start(status: StatusCode, body: Value) -> Result<Self> {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = StubState {
            response: Arc::new((status, body)),
            requests: Arc::clone(&requests),
        };
        let app = Router::new()
            .route("/v0/keys/:key_id/", get(stub_get_key))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Ok(Self {
            base_url: url::Url::parse(&format!("http://{addr}/"))?,
            requests,
            handle,
        })
    }

    /// Serve `key` inside an ok envelope
    pub async fn serving_key(key: &Key) -> Result<Self> {
        Self::start(StatusCode::OK, ok_envelope(key)).await
    }

    pub fn recorded(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for StubKnoxServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn stub_get_key(
    State(state): State<StubState>,
    AxumPath(key_id): AxumPath<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    state.requests.lock().unwrap().push(RecordedRequest {
        key_id,
        authorization: headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned),
        status: query.get("status").cloned(),
    });
    let (status, body) = state.response.as_ref();
    (*status, Json(body.clone()))
}

pub fn ok_envelope(key: &Key) -> Value {
    json!({
        "status": "ok",
        "code": 0,
        "host": "stub",
        "ts": 0,
        "message": "",
        "data": key,
    })
}

pub fn error_envelope(code: i32, message: &str) -> Value {
    json!({
        "status": "error",
        "code": code,
        "host": "stub",
        "ts": 0,
        "message": message,
        "data": null,
    })
}

/// One connection accepted by the TLS stub server
#[derive(Debug, Clone)]
pub struct TlsExchange {
    /// Identity of the presented client certificate, if any
    pub client_identity: Option<String>,
    pub request_line: String,
}

/// Knox stub behind TLS with a server certificate for `knox` issued by the
/// test CA. Client certificates from the same CA are accepted but optional.
pub struct TlsKnoxServer {
    pub port: u16,
    pub exchanges: Arc<Mutex<Vec<TlsExchange>>>,
    handle: JoinHandle<()>,
}

impl TlsKnoxServer {
    pub async fn serving_key(key: &Key) -> Result<Self> {
        let acceptor = TlsAcceptor::from(Arc::new(tls_server_config()?));
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        let exchanges = Arc::new(Mutex::new(Vec::new()));
        let response = json_response(&ok_envelope(key));

        let recorded = Arc::clone(&exchanges);
        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let acceptor = acceptor.clone();
                let recorded = Arc::clone(&recorded);
                let response = response.clone();
                tokio::spawn(async move {
                    let Ok(mut tls) = acceptor.accept(stream).await else {
                        return;
                    };
                    let client_identity = tls
                        .get_ref()
                        .1
                        .peer_certificates()
                        .and_then(|chain| chain.first())
                        .map(|leaf| identity_from_der(leaf.as_ref(), "").unwrap());
                    let head = read_request_head(&mut tls).await.unwrap_or_default();
                    let request_line = String::from_utf8_lossy(&head)
                        .lines()
                        .next()
                        .unwrap_or_default()
                        .to_owned();
                    recorded.lock().unwrap().push(TlsExchange {
                        client_identity,
                        request_line,
                    });
                    let _ = tls.write_all(response.as_bytes()).await;
                    let _ = tls.shutdown().await;
                });
            }
        });

        Ok(Self {
            port,
            exchanges,
            handle,
        })
    }

    /// Host to configure the client with, by address rather than by `knox`
    pub fn host(&self) -> String {
        format!("127.0.0.1:{}", self.port)
    }

    pub fn recorded(&self) -> Vec<TlsExchange> {
        self.exchanges.lock().unwrap().clone()
    }
}

impl Drop for TlsKnoxServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn tls_server_config() -> Result<ServerConfig> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());

    let mut roots = RootCertStore::empty();
    for certificate in CertificateDer::pem_file_iter(fixture("tls_ca_cert.pem"))? {
        roots.add(certificate?)?;
    }
    let verifier =
        WebPkiClientVerifier::builder_with_provider(Arc::new(roots), Arc::clone(&provider))
            .allow_unauthenticated()
            .build()?;

    let chain = CertificateDer::pem_file_iter(fixture("tls_server_cert.pem"))?
        .collect::<Result<Vec<_>, _>>()?;
    let key = PrivateKeyDer::from_pem_file(fixture("tls_server_key.pem"))?;

    Ok(ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .with_client_cert_verifier(verifier)
        .with_single_cert(chain, key)?)
}

async fn read_request_head<S: AsyncRead + Unpin>(stream: &mut S) -> std::io::Result<Vec<u8>> {
    let mut head = Vec::new();
    let mut buf = [0_u8; 1024];
    while !head.windows(4).any(|window| window == b"\r\n\r\n") {
        let read = stream.read(&mut buf).await?;
        if read == 0 {
            break;
        }
        head.extend_from_slice(&buf[..read]);
    }
    Ok(head)
}

fn json_response(body: &Value) -> String {
    let body = body.to_string();
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}
