//! Token issuance for logins and access refreshes.

use std::sync::Arc;

use crate::jwt::{AccessClaims, ClaimsCodec, JwtError, RefreshClaims, TokenType, now_secs};
use crate::session::{AuthSettings, Session};

/// A signed token with its lifetime.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// The JWT token string
    pub token: String,
    /// Expiration timestamp (Unix seconds)
    pub expires_at: u64,
    /// Token duration in seconds
    pub duration: u64,
}

/// Everything minted by a successful login.
#[derive(Debug, Clone)]
pub struct IssuedLogin {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
    pub session: Session,
}

pub struct TokenIssuer {
    codec: Arc<ClaimsCodec>,
    settings: AuthSettings,
}

impl TokenIssuer {
    pub fn new(codec: Arc<ClaimsCodec>, settings: AuthSettings) -> Self {
        Self { codec, settings }
    }

    pub fn settings(&self) -> &AuthSettings {
        &self.settings
    }

    /// Start a new session and mint its access/refresh pair.
    /// Both tokens carry the same session id.
    pub fn login(&self, subject_id: i64, fingerprint: &str) -> Result<IssuedLogin, JwtError> {
        if subject_id == 0 {
            return Err(JwtError::MissingSubject);
        }

        let session = Session::start(subject_id)?;
        let access = self.access_token(&session.id, subject_id, fingerprint, session.created_at)?;

        let duration = self.settings.refresh_ttl.as_secs();
        let expires_at = session.created_at + duration;
        let claims = RefreshClaims {
            uid: subject_id,
            sid: session.id.clone(),
            token_type: TokenType::Refresh,
            iat: session.created_at,
            exp: expires_at,
        };
        let refresh = IssuedToken {
            token: self.codec.encode_refresh(&claims)?,
            expires_at,
            duration,
        };

        tracing::debug!(subject_id, session_id = %session.id, "Issued login tokens");

        Ok(IssuedLogin {
            access,
            refresh,
            session,
        })
    }

    /// Mint a new access token for an already validated session.
    /// The session id is reused and no refresh token is issued.
    pub fn refresh_access(
        &self,
        session_id: &str,
        subject_id: i64,
        fingerprint: &str,
    ) -> Result<IssuedToken, JwtError> {
        if subject_id == 0 {
            return Err(JwtError::MissingSubject);
        }
        self.access_token(session_id, subject_id, fingerprint, now_secs()?)
    }

    fn access_token(
        &self,
        session_id: &str,
        subject_id: i64,
        fingerprint: &str,
        now: u64,
    ) -> Result<IssuedToken, JwtError> {
        let duration = self.settings.access_ttl.as_secs();
        let expires_at = now + duration;
        let claims = AccessClaims {
            uid: subject_id,
            sid: session_id.to_string(),
            fpr: fingerprint.to_string(),
            token_type: TokenType::Access,
            iat: now,
            exp: expires_at,
        };

        Ok(IssuedToken {
            token: self.codec.encode_access(&claims)?,
            expires_at,
            duration,
        })
    }
}
