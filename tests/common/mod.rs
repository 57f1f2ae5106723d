#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    extract::ConnectInfo,
    http::{Request, Response, header},
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tollgate::{
    ServerConfig, TokenServices,
    auth::ClientIpHeader,
    create_app,
    issuer::IssuedLogin,
    jwt::SigningKeys,
    rate_limit::{FailurePolicy, WindowPolicy},
    session::AuthSettings,
    store::{Backend, MemoryStore},
};
use tower::ServiceExt;

pub const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) tollgate-tests";

pub fn signing_keys() -> SigningKeys {
    SigningKeys {
        access: b"integration-access-secret-0123456789".to_vec(),
        refresh: b"integration-refresh-secret-0123456789".to_vec(),
    }
}

pub struct TestApp {
    pub app: Router,
    /// Services sharing the app's store and keys, for issuing tokens directly
    pub services: TokenServices,
    pub store: Arc<MemoryStore>,
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }

    pub fn login(&self, subject_id: i64) -> IssuedLogin {
        self.services.issuer.login(subject_id, USER_AGENT).unwrap()
    }
}

/// Builder for test apps with non-default limits
pub struct TestSetup {
    ip_limit: WindowPolicy,
    failure: FailurePolicy,
    ip_header: Option<ClientIpHeader>,
}

impl TestSetup {
    pub fn new() -> Self {
        Self {
            // High enough that token tests never trip it
            ip_limit: WindowPolicy::new(10_000, Duration::from_secs(1)).unwrap(),
            failure: FailurePolicy::FailClosed,
            ip_header: None,
        }
    }

    pub fn with_ip_limit(mut self, rate: u64, interval: Duration) -> Self {
        self.ip_limit = WindowPolicy::new(rate, interval).unwrap();
        self
    }

    pub fn with_ip_header(mut self, header: ClientIpHeader) -> Self {
        self.ip_header = Some(header);
        self
    }

    pub fn build(self) -> TestApp {
        let store = Arc::new(MemoryStore::new());
        let backend = Backend::Memory(store.clone());
        let config = ServerConfig {
            backend: backend.clone(),
            store_timeout: Duration::from_millis(250),
            signing_keys: signing_keys(),
            auth: AuthSettings::default(),
            ip_limit: self.ip_limit,
            rate_limit_failure: self.failure,
            ip_header: self.ip_header,
        };

        let app = create_app(&config).unwrap();
        let services = TokenServices::new(
            backend.with_deadline(config.store_timeout),
            &signing_keys(),
            config.auth,
        )
        .unwrap();

        TestApp {
            app,
            services,
            store,
        }
    }
}

pub fn setup() -> TestApp {
    TestSetup::new().build()
}

/// A request from 192.0.2.1 with the test User-Agent.
pub fn request(method: &str, uri: &str) -> Request<Body> {
    request_from(method, uri, [192, 0, 2, 1])
}

pub fn request_from(method: &str, uri: &str, ip: [u8; 4]) -> Request<Body> {
    let mut request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::USER_AGENT, USER_AGENT)
        .body(Body::empty())
        .unwrap();
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from((ip, 40000))));
    request
}

pub fn with_bearer(mut request: Request<Body>, token: &str) -> Request<Body> {
    request.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {}", token).parse().unwrap(),
    );
    request
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
