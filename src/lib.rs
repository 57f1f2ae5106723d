pub mod api;
pub mod auth;
pub mod cleanup;
pub mod cli;
pub mod issuer;
pub mod jwt;
pub mod rate_limit;
pub mod revocation;
pub mod session;
pub mod sms;
pub mod store;
pub mod validator;

use api::{PUBLIC_PATHS, create_api_router};
use auth::{AccessGuard, ClientIpHeader, require_access};
use axum::{Router, middleware, routing::get};
use issuer::TokenIssuer;
use jwt::{ClaimsCodec, JwtError, SigningKeys};
use rate_limit::{FailurePolicy, IpRateLimit, WindowPolicy, rate_limit_by_ip};
use revocation::SessionRevocationStore;
use session::AuthSettings;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use store::{Backend, SharedStore};
use tokio::net::TcpListener;
use validator::TokenValidator;

pub struct ServerConfig {
    /// Shared store for session tombstones and rate-limit windows
    pub backend: Backend,
    /// Deadline applied to every store call
    pub store_timeout: Duration,
    /// Access and refresh signing secrets
    pub signing_keys: SigningKeys,
    /// Token lifetimes
    pub auth: AuthSettings,
    /// Per-client-IP request limit
    pub ip_limit: WindowPolicy,
    /// Behaviour of the IP limiter when the store is down
    pub rate_limit_failure: FailurePolicy,
    /// IP extraction strategy (requires running behind a proxy)
    pub ip_header: Option<ClientIpHeader>,
}

/// Errors raised while assembling the application.
#[derive(Debug)]
pub enum SetupError {
    Keys(JwtError),
    Settings(String),
    Io(std::io::Error),
}

impl std::fmt::Display for SetupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SetupError::Keys(e) => write!(f, "Invalid signing keys: {}", e),
            SetupError::Settings(e) => write!(f, "Invalid token settings: {}", e),
            SetupError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for SetupError {}

impl From<JwtError> for SetupError {
    fn from(e: JwtError) -> Self {
        SetupError::Keys(e)
    }
}

impl From<std::io::Error> for SetupError {
    fn from(e: std::io::Error) -> Self {
        SetupError::Io(e)
    }
}

/// The token components, wired to one store. Embedding applications use
/// `issuer` from their own login handlers.
#[derive(Clone)]
pub struct TokenServices {
    pub issuer: Arc<TokenIssuer>,
    pub validator: Arc<TokenValidator>,
    pub revocations: Arc<SessionRevocationStore>,
}

impl TokenServices {
    pub fn new(
        store: SharedStore,
        keys: &SigningKeys,
        settings: AuthSettings,
    ) -> Result<Self, SetupError> {
        settings.validate().map_err(SetupError::Settings)?;
        let codec = Arc::new(ClaimsCodec::new(keys)?);
        let revocations = Arc::new(SessionRevocationStore::new(store, settings.refresh_ttl));

        Ok(Self {
            issuer: Arc::new(TokenIssuer::new(codec.clone(), settings)),
            validator: Arc::new(TokenValidator::new(codec, revocations.clone())),
            revocations,
        })
    }
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Result<Router, SetupError> {
    let store = config.backend.with_deadline(config.store_timeout);
    let services = TokenServices::new(store.clone(), &config.signing_keys, config.auth)?;
    Ok(build_router(&services, store, config))
}

fn build_router(services: &TokenServices, store: SharedStore, config: &ServerConfig) -> Router {
    let guard = AccessGuard::new(services.validator.clone())
        .ignore("/health")
        .ignore_all(PUBLIC_PATHS.iter().map(|path| format!("/api{}", path)));

    let ip_limit = IpRateLimit::new(
        store,
        config.ip_limit,
        config.rate_limit_failure,
        config.ip_header,
    );

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .nest("/api", create_api_router(services))
        .layer(middleware::from_fn_with_state(Arc::new(guard), require_access))
        .layer(middleware::from_fn_with_state(
            Arc::new(ip_limit),
            rate_limit_by_ip,
        ))
}

/// Spawn the background purge for backends that need one.
pub fn init_cleanup(backend: &Backend) {
    if let Backend::Memory(store) = backend {
        cleanup::spawn_purge_scheduler(store.clone(), cleanup::PURGE_INTERVAL);
    }
}

/// Run the server on the given listener. This function blocks until the server exits.
/// Call `init_cleanup` before this to purge the memory store periodically.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), SetupError> {
    let app = create_app(&config)?;
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await?;
    Ok(())
}

/// Start the server on the given port in a background task. Use port 0 to let the OS choose a random port.
/// Returns the actual address the server is listening on.
/// Note: For production use, prefer `run_server` directly in main.
pub async fn start_server(
    config: ServerConfig,
    port: u16,
) -> Result<(tokio::task::JoinHandle<()>, SocketAddr), SetupError> {
    init_cleanup(&config.backend);

    let addr = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    let app = create_app(&config)?;
    let handle = tokio::spawn(async move {
        let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
        if let Err(e) = axum::serve(listener, make_service).await {
            tracing::error!(error = %e, "Server error");
        }
    });

    Ok((handle, local_addr))
}
