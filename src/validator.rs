//! Token validation: signature, expiry, binding, subject and session liveness.

use std::sync::Arc;

use crate::jwt::{AccessClaims, ClaimsCodec, JwtError, RefreshClaims};
use crate::revocation::SessionRevocationStore;
use crate::store::StoreError;

/// Why a token was rejected. The specific kind is for logs only; callers must
/// collapse every authentication kind into one generic response.
#[derive(Debug)]
pub enum AuthError {
    Malformed,
    SignatureInvalid,
    Expired,
    BindingMismatch,
    SubjectMissing,
    Revoked,
    /// Revocation status could not be confirmed
    StoreUnavailable(StoreError),
}

impl AuthError {
    /// Short label for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::Malformed => "malformed",
            AuthError::SignatureInvalid => "signature_invalid",
            AuthError::Expired => "expired",
            AuthError::BindingMismatch => "binding_mismatch",
            AuthError::SubjectMissing => "subject_missing",
            AuthError::Revoked => "revoked",
            AuthError::StoreUnavailable(_) => "store_unavailable",
        }
    }

    /// True when the token itself may be fine but its session could not be
    /// checked. Still rejected: unknown revocation status is not trusted.
    pub fn is_store_failure(&self) -> bool {
        matches!(self, AuthError::StoreUnavailable(_))
    }
}

impl From<JwtError> for AuthError {
    fn from(e: JwtError) -> Self {
        match e {
            JwtError::SignatureInvalid => AuthError::SignatureInvalid,
            JwtError::Expired => AuthError::Expired,
            JwtError::MissingSubject => AuthError::SubjectMissing,
            _ => AuthError::Malformed,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::Malformed => write!(f, "Malformed token"),
            AuthError::SignatureInvalid => write!(f, "Invalid token signature"),
            AuthError::Expired => write!(f, "Token expired"),
            AuthError::BindingMismatch => write!(f, "Token bound to a different client"),
            AuthError::SubjectMissing => write!(f, "Token has no subject"),
            AuthError::Revoked => write!(f, "Session revoked"),
            AuthError::StoreUnavailable(e) => write!(f, "Revocation check failed: {}", e),
        }
    }
}

impl std::error::Error for AuthError {}

pub struct TokenValidator {
    codec: Arc<ClaimsCodec>,
    revocations: Arc<SessionRevocationStore>,
}

impl TokenValidator {
    pub fn new(codec: Arc<ClaimsCodec>, revocations: Arc<SessionRevocationStore>) -> Self {
        Self { codec, revocations }
    }

    /// Validate an access token presented by a client with `fingerprint`.
    pub async fn validate_access(
        &self,
        token: &str,
        fingerprint: &str,
    ) -> Result<AccessClaims, AuthError> {
        let claims = self.codec.decode_access(token)?;

        if claims.fpr != fingerprint {
            return Err(AuthError::BindingMismatch);
        }
        if claims.uid == 0 {
            return Err(AuthError::SubjectMissing);
        }
        self.ensure_live(&claims.sid).await?;

        Ok(claims)
    }

    /// Validate a refresh token. The binding fingerprint is not checked since
    /// refreshes often come from a background context.
    pub async fn validate_refresh(&self, token: &str) -> Result<RefreshClaims, AuthError> {
        let claims = self.codec.decode_refresh(token)?;

        if claims.uid == 0 {
            return Err(AuthError::SubjectMissing);
        }
        self.ensure_live(&claims.sid).await?;

        Ok(claims)
    }

    async fn ensure_live(&self, session_id: &str) -> Result<(), AuthError> {
        match self.revocations.exists(session_id).await {
            Ok(false) => Ok(()),
            Ok(true) => Err(AuthError::Revoked),
            Err(e) => {
                tracing::warn!(session_id, error = %e, "Revocation check failed");
                Err(AuthError::StoreUnavailable(e))
            }
        }
    }
}
