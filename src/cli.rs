//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::auth::ClientIpHeader;
use crate::jwt::{MIN_SECRET_LENGTH, SigningKeys};
use crate::rate_limit::{FailurePolicy, WindowPolicy};
use crate::session::AuthSettings;
use crate::store::Backend;
use clap::Parser;
use std::time::Duration;
use tracing::{error, info};

pub const ACCESS_SECRET_ENV: &str = "ACCESS_TOKEN_SECRET";
pub const REFRESH_SECRET_ENV: &str = "REFRESH_TOKEN_SECRET";

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "tollgate",
    about = "Session tokens and distributed rate limiting"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "7291")]
    pub port: u16,

    /// Shared store URL (redis://host:port/db), or memory:// for a single instance
    #[arg(long, env = "REDIS_URL", default_value = "redis://127.0.0.1:6379/")]
    pub redis_url: String,

    /// Deadline for each store call, in milliseconds
    #[arg(long, default_value = "250")]
    pub store_timeout_ms: u64,

    /// Access token lifetime, in seconds
    #[arg(long, default_value = "1800")]
    pub access_ttl_secs: u64,

    /// Refresh token lifetime, in seconds
    #[arg(long, default_value = "604800")]
    pub refresh_ttl_secs: u64,

    /// Requests allowed per client IP in each window
    #[arg(long, default_value = "100")]
    pub ip_rate: u64,

    /// Per-client-IP window, in milliseconds
    #[arg(long, default_value = "1000")]
    pub ip_interval_ms: u64,

    /// What the IP limiter does when the store is unavailable
    #[arg(long, value_enum, default_value = "fail-closed")]
    pub rate_limit_failure: FailurePolicy,

    /// Take the client IP from this proxy header instead of the socket
    #[arg(long, value_enum)]
    pub client_ip_header: Option<ClientIpHeader>,

    /// Path to file containing the access token secret. Prefer ACCESS_TOKEN_SECRET
    #[arg(long)]
    pub access_secret_file: Option<String>,

    /// Path to file containing the refresh token secret. Prefer REFRESH_TOKEN_SECRET
    #[arg(long)]
    pub refresh_secret_file: Option<String>,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load one signing secret from an environment variable or a file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_secret(env_name: &str, secret_file: Option<&str>) -> Option<Vec<u8>> {
    let secret = if let Ok(secret) = std::env::var(env_name) {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var(env_name) };
        secret
    } else if let Some(path) = secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read secret file");
                return None;
            }
        }
    } else {
        error!(
            "{} is required. Set the environment variable (recommended) or pass a secret file",
            env_name
        );
        return None;
    };

    if secret.len() < MIN_SECRET_LENGTH {
        error!(
            "{} is shorter than {} characters. Use a longer secret",
            env_name, MIN_SECRET_LENGTH
        );
        return None;
    }

    Some(secret.into_bytes())
}

/// Load both signing secrets and check they are usable together.
pub fn load_signing_keys(args: &Args) -> Option<SigningKeys> {
    let access = load_secret(ACCESS_SECRET_ENV, args.access_secret_file.as_deref())?;
    let refresh = load_secret(REFRESH_SECRET_ENV, args.refresh_secret_file.as_deref())?;

    let keys = SigningKeys { access, refresh };
    if let Err(e) = keys.validate() {
        error!(error = %e, "Signing secrets rejected");
        return None;
    }
    Some(keys)
}

/// Open the shared store, logging errors if it fails.
pub async fn open_store(url: &str) -> Option<Backend> {
    match Backend::open(url).await {
        Ok(backend) => {
            if matches!(backend, Backend::Memory(_)) {
                tracing::warn!("Using the in-process store; limits and revocations are not shared");
            } else {
                info!("Store connected");
            }
            Some(backend)
        }
        Err(e) => {
            error!(error = %e, "Failed to open store");
            None
        }
    }
}

/// Build ServerConfig from validated arguments.
/// Returns None and logs an error if a setting is out of range.
pub fn build_config(args: &Args, backend: Backend, signing_keys: SigningKeys) -> Option<ServerConfig> {
    let auth = AuthSettings {
        access_ttl: Duration::from_secs(args.access_ttl_secs),
        refresh_ttl: Duration::from_secs(args.refresh_ttl_secs),
    };
    if let Err(e) = auth.validate() {
        error!(error = %e, "Invalid token lifetimes");
        return None;
    }

    let ip_limit = match WindowPolicy::new(args.ip_rate, Duration::from_millis(args.ip_interval_ms)) {
        Ok(policy) => policy,
        Err(e) => {
            error!(error = %e, "Invalid IP rate limit");
            return None;
        }
    };

    if args.store_timeout_ms == 0 {
        error!("Store timeout must be at least 1ms");
        return None;
    }

    Some(ServerConfig {
        backend,
        store_timeout: Duration::from_millis(args.store_timeout_ms),
        signing_keys,
        auth,
        ip_limit,
        rate_limit_failure: args.rate_limit_failure,
        ip_header: args.client_ip_header,
    })
}
