//! Token management API endpoints.
//!
//! - POST `/refresh` - Exchange a refresh token (bearer) for a new access token
//! - POST `/logout` - Revoke the current session and clear both tokens
//! - GET `/verify` - Check that the current access token is still accepted

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use std::sync::Arc;

use super::error::{ApiError, ResultExt};
use crate::auth::{
    AccessAuth, RefreshAuth, access_token_header, binding_fingerprint, cleared_token_headers,
};
use crate::impl_has_auth_backend;
use crate::issuer::TokenIssuer;
use crate::revocation::SessionRevocationStore;
use crate::validator::TokenValidator;

#[derive(Clone)]
pub struct TokensState {
    pub validator: Arc<TokenValidator>,
    pub issuer: Arc<TokenIssuer>,
    pub revocations: Arc<SessionRevocationStore>,
}

impl_has_auth_backend!(TokensState);

pub fn router(state: TokensState) -> Router {
    Router::new()
        .route("/verify", get(verify_token))
        .route("/refresh", post(refresh_token))
        .route("/logout", post(logout))
        .with_state(state)
}

/// Verify that the current access token is still valid.
/// Returns 200 if valid, 401 if not.
async fn verify_token(AccessAuth(_claims): AccessAuth) -> impl IntoResponse {
    StatusCode::OK
}

/// Mint a new access token for the refresh token's session.
/// The refresh token itself is not rotated.
async fn refresh_token(
    State(state): State<TokensState>,
    RefreshAuth(claims): RefreshAuth,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let access = state
        .issuer
        .refresh_access(&claims.sid, claims.uid, &binding_fingerprint(&headers))
        .token_err("Failed to generate access token")?;

    tracing::debug!(session_id = %claims.sid, "Access token refreshed");

    Ok((
        StatusCode::OK,
        access_token_header(&access),
        Json(serde_json::json!({ "success": true })),
    ))
}

/// Logout: revoke the session named by the access token, then tell the
/// client to discard both tokens.
async fn logout(
    State(state): State<TokensState>,
    AccessAuth(claims): AccessAuth,
) -> Result<impl IntoResponse, ApiError> {
    state
        .revocations
        .revoke_session(&claims.sid)
        .await
        .store_err("Failed to revoke session")?;

    Ok((
        StatusCode::OK,
        cleared_token_headers(),
        Json(serde_json::json!({ "success": true })),
    ))
}
