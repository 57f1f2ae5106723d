mod error;
mod tokens;

use axum::Router;

use crate::TokenServices;

pub use error::{ApiError, ResultExt};

/// Paths under the API router that are reachable without an access token.
pub const PUBLIC_PATHS: &[&str] = &["/tokens/refresh", "/test/login"];

/// Create the API router.
pub fn create_api_router(services: &TokenServices) -> Router {
    let tokens_state = tokens::TokensState {
        validator: services.validator.clone(),
        issuer: services.issuer.clone(),
        revocations: services.revocations.clone(),
    };

    #[cfg(feature = "test-mode")]
    let test_state = test::TestState {
        issuer: services.issuer.clone(),
    };

    let router = Router::new().nest("/tokens", tokens::router(tokens_state));

    #[cfg(feature = "test-mode")]
    let router = router.nest("/test", test::router(test_state));

    router
}
