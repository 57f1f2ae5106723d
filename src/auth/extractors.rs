//! Axum extractors and middleware for bearer-token authentication.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::errors::ApiAuthError;
use super::header::{bearer_token, binding_fingerprint};
use super::state::HasAuthBackend;
use crate::jwt::{AccessClaims, RefreshClaims};
use crate::validator::TokenValidator;

/// Validate the access token on a request's headers.
async fn authenticate_access(
    headers: &HeaderMap,
    validator: &TokenValidator,
) -> Result<AccessClaims, ApiAuthError> {
    let token = bearer_token(headers).ok_or_else(ApiAuthError::no_token)?;
    let claims = validator
        .validate_access(token, &binding_fingerprint(headers))
        .await?;
    Ok(claims)
}

/// Extractor for endpoints that require a valid access token.
///
/// Reuses claims already validated by [`require_access`] when the route sits
/// behind it, otherwise validates the bearer token itself.
pub struct AccessAuth(pub AccessClaims);

impl<S> FromRequestParts<S> for AccessAuth
where
    S: HasAuthBackend + Send + Sync,
{
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(claims) = parts.extensions.get::<AccessClaims>() {
            return Ok(AccessAuth(claims.clone()));
        }
        authenticate_access(&parts.headers, state.validator())
            .await
            .map(AccessAuth)
    }
}

/// Extractor for the refresh endpoint: the bearer token must be a live
/// refresh token. The binding fingerprint is not checked.
pub struct RefreshAuth(pub RefreshClaims);

impl<S> FromRequestParts<S> for RefreshAuth
where
    S: HasAuthBackend + Send + Sync,
{
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or_else(ApiAuthError::no_token)?;
        let claims = state.validator().validate_refresh(token).await?;
        Ok(RefreshAuth(claims))
    }
}

/// Configuration for the [`require_access`] middleware.
pub struct AccessGuard {
    validator: Arc<TokenValidator>,
    ignored: HashSet<String>,
}

impl AccessGuard {
    pub fn new(validator: Arc<TokenValidator>) -> Self {
        Self {
            validator,
            ignored: HashSet::new(),
        }
    }

    /// Let requests for exactly `path` through without a token.
    pub fn ignore(mut self, path: impl Into<String>) -> Self {
        self.ignored.insert(path.into());
        self
    }

    pub fn ignore_all<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.ignored.extend(paths.into_iter().map(Into::into));
        self
    }

    fn is_ignored(&self, path: &str) -> bool {
        self.ignored.contains(path)
    }
}

/// Middleware requiring a valid access token on every non-ignored path.
/// Validated claims are stored in the request extensions.
pub async fn require_access(
    State(guard): State<Arc<AccessGuard>>,
    mut request: Request,
    next: Next,
) -> Response {
    if guard.is_ignored(request.uri().path()) {
        return next.run(request).await;
    }

    match authenticate_access(request.headers(), &guard.validator).await {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}
