//! Shared test helpers for API tests.
//!
//! Every `TestApp` runs the full router over the in-memory store and a
//! temporary storage root, so tests need no database.

#![allow(dead_code)]

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request, StatusCode, header};
use serde_json::Value;
use tower::ServiceExt;

use defdrive_api::{AppState, build_app};
use defdrive_core::config::AppConfig;
use defdrive_database::memory::MemoryStore;
use defdrive_database::store::Stores;
use defdrive_storage::LocalStorageProvider;

/// Peer address used when a test does not pick one.
pub const DEFAULT_PEER: &str = "203.0.113.7";

/// Password accepted by the default policy.
pub const PASSWORD: &str = "correct-horse-battery";

const TEST_CONFIG: &str = r#"
[server]
public_base_url = "http://files.test"

[database]
backend = "memory"

[auth]
jwt_secret = "integration-test-secret-0123456789"

[link]
retry_backoff_ms = 1
store_timeout_ms = 2000
"#;

/// Test application context
pub struct TestApp {
    /// The full application router
    pub router: Router,
    /// State behind the router, for direct service access
    pub state: AppState,
    _dir: tempfile::TempDir,
}

/// A buffered response
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    /// Parse the body as JSON.
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is JSON")
    }

    /// The `error` code of an error body.
    pub fn error_code(&self) -> String {
        self.json()["error"].as_str().unwrap_or_default().to_string()
    }
}

impl TestApp {
    /// Create a test application with the default test configuration.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test application after adjusting the configuration.
    pub async fn with_config(customize: impl FnOnce(&mut AppConfig)) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = AppConfig::from_toml_str(TEST_CONFIG).expect("test config");
        config.storage.data_root = dir.path().to_string_lossy().into_owned();
        customize(&mut config);

        let storage = Arc::new(
            LocalStorageProvider::new(&config.storage.data_root)
                .await
                .expect("storage"),
        );
        let stores = Stores::memory(Arc::new(MemoryStore::new()));
        let state = AppState::new(config, stores, storage);
        let router = build_app(state.clone());

        Self {
            router,
            state,
            _dir: dir,
        }
    }

    /// Send a request as if it arrived from `peer`.
    pub async fn send(&self, mut req: Request<Body>, peer: &str) -> TestResponse {
        let ip: IpAddr = peer.parse().expect("peer ip");
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::new(ip, 40000)));

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Make a JSON request from the default peer.
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let mut req = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).expect("serialize body"))),
            None => req.body(Body::empty()),
        }
        .expect("build request");

        self.send(req, DEFAULT_PEER).await
    }

    /// Sign up a user and return a bearer token for it.
    pub async fn register(&self, username: &str) -> String {
        let response = self
            .request(
                "POST",
                "/api/signup",
                Some(serde_json::json!({
                    "username": username,
                    "email": format!("{username}@example.com"),
                    "password": PASSWORD,
                })),
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);

        let response = self
            .request(
                "POST",
                "/api/login",
                Some(serde_json::json!({ "username": username, "password": PASSWORD })),
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);

        response.json()["data"]["token"]
            .as_str()
            .expect("token in login response")
            .to_string()
    }

    /// Upload a file through the multipart endpoint.
    pub async fn upload(
        &self,
        token: &str,
        name: &str,
        content: &[u8],
        public: bool,
    ) -> TestResponse {
        const BOUNDARY: &str = "defdrive-test-boundary";

        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"public\"\r\n\r\n{public}\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{name}\"\r\nContent-Type: text/plain\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        let req = Request::builder()
            .method("POST")
            .uri("/api/upload")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("build upload");

        self.send(req, DEFAULT_PEER).await
    }

    /// Upload `hello world` and return the file id.
    pub async fn upload_hello(&self, token: &str, public: bool) -> String {
        let response = self.upload(token, "hello.txt", b"hello world", public).await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.json()["data"]["id"]
            .as_str()
            .expect("file id")
            .to_string()
    }

    /// Create an access record and return its JSON.
    pub async fn create_access(&self, token: &str, file_id: &str, settings: Value) -> Value {
        let response = self
            .request(
                "POST",
                &format!("/api/files/{file_id}/accesses"),
                Some(settings),
                Some(token),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.json()["data"].clone()
    }

    /// Request a public link from `peer`, optionally authenticated.
    pub async fn get_link(&self, link: &str, peer: &str, token: Option<&str>) -> TestResponse {
        self.get_link_with(link, peer, token, &[]).await
    }

    /// Request a public link with extra headers.
    pub async fn get_link_with(
        &self,
        link: &str,
        peer: &str,
        token: Option<&str>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut req = Request::builder().method("GET").uri(format!("/link/{link}"));
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        for (name, value) in headers {
            req = req.header(*name, *value);
        }
        let req = req.body(Body::empty()).expect("build request");
        self.send(req, peer).await
    }
}

/// The link token of an access record JSON.
pub fn link_of(access: &Value) -> String {
    access["access"]["link"]
        .as_str()
        .expect("link token")
        .to_string()
}
