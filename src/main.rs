use std::net::SocketAddr;

use clap::Parser;
use tollgate::cli::{Args, build_config, init_logging, load_signing_keys, open_store};
use tollgate::{create_app, init_cleanup};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    let Some(signing_keys) = load_signing_keys(&args) else {
        std::process::exit(1);
    };

    let Some(backend) = open_store(&args.redis_url).await else {
        std::process::exit(1);
    };

    let Some(config) = build_config(&args, backend, signing_keys) else {
        std::process::exit(1);
    };

    let app = create_app(&config).unwrap_or_else(|e| {
        error!(error = %e, "Failed to build application");
        std::process::exit(1);
    });
    init_cleanup(&config.backend);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    let local_addr = listener.local_addr().unwrap_or_else(|e| {
        error!(error = %e, "Failed to read local address");
        std::process::exit(1);
    });

    info!(address = %local_addr, "Listening");

    #[cfg(feature = "test-mode")]
    println!("TOLLGATE_READY port={}", local_addr.port());

    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    if let Err(e) = axum::serve(listener, make_service).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
