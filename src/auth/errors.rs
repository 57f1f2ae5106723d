//! Authentication error responses.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::validator::AuthError;

/// Why a request failed authentication.
#[derive(Debug)]
pub enum AuthErrorKind {
    /// No usable bearer token on the request
    NoToken,
    /// The token was presented and rejected
    Rejected(AuthError),
}

/// API authentication error. Every kind produces the same 401 response; the
/// specific reason only reaches the logs.
#[derive(Debug)]
pub struct ApiAuthError {
    pub(super) kind: AuthErrorKind,
}

impl ApiAuthError {
    pub(super) fn no_token() -> Self {
        Self {
            kind: AuthErrorKind::NoToken,
        }
    }

    /// Short label for diagnostics.
    pub fn kind(&self) -> &'static str {
        match &self.kind {
            AuthErrorKind::NoToken => "no_token",
            AuthErrorKind::Rejected(e) => e.kind(),
        }
    }
}

impl From<AuthError> for ApiAuthError {
    fn from(e: AuthError) -> Self {
        Self {
            kind: AuthErrorKind::Rejected(e),
        }
    }
}

impl std::fmt::Display for ApiAuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            AuthErrorKind::NoToken => write!(f, "No bearer token"),
            AuthErrorKind::Rejected(e) => write!(f, "{}", e),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
}

impl IntoResponse for ApiAuthError {
    fn into_response(self) -> Response {
        tracing::debug!(kind = self.kind(), reason = %self, "Authentication failed");

        let mut response = (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "Unauthorized",
            }),
        )
            .into_response();
        response
            .headers_mut()
            .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;

    async fn body_of(err: ApiAuthError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1024)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_every_kind_looks_the_same() {
        let errors = vec![
            ApiAuthError::no_token(),
            AuthError::Malformed.into(),
            AuthError::SignatureInvalid.into(),
            AuthError::Expired.into(),
            AuthError::BindingMismatch.into(),
            AuthError::SubjectMissing.into(),
            AuthError::Revoked.into(),
            AuthError::StoreUnavailable(StoreError::Unavailable("down".into())).into(),
        ];

        for err in errors {
            let (status, body) = body_of(err).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(body, serde_json::json!({ "error": "Unauthorized" }));
        }
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(ApiAuthError::no_token().kind(), "no_token");
        assert_eq!(ApiAuthError::from(AuthError::Revoked).kind(), "revoked");
    }
}
