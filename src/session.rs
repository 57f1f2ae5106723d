//! Login sessions and token horizons.

use std::time::Duration;

use crate::jwt::{JwtError, now_secs};

/// Default access token horizon: 30 minutes
pub const ACCESS_TOKEN_DURATION: Duration = Duration::from_secs(30 * 60);

/// Default refresh token horizon: 7 days
pub const REFRESH_TOKEN_DURATION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// One login event. Only ever persisted as a revocation tombstone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub subject_id: i64,
    /// Unix timestamp (seconds)
    pub created_at: u64,
}

impl Session {
    /// Start a new session for `subject_id` with a fresh random id.
    pub fn start(subject_id: i64) -> Result<Self, JwtError> {
        Ok(Self {
            id: new_session_id(),
            subject_id,
            created_at: now_secs()?,
        })
    }
}

/// Generate an unpredictable session id (122 random bits from the OS CSPRNG).
pub fn new_session_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Token lifetimes shared by issuance and revocation.
#[derive(Debug, Clone, Copy)]
pub struct AuthSettings {
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            access_ttl: ACCESS_TOKEN_DURATION,
            refresh_ttl: REFRESH_TOKEN_DURATION,
        }
    }
}

impl AuthSettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.access_ttl.as_secs() == 0 {
            return Err("access token lifetime must be at least one second".into());
        }
        if self.access_ttl >= self.refresh_ttl {
            return Err("access token lifetime must be shorter than refresh token lifetime".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_session_ids_are_unique() {
        let ids: HashSet<String> = (0..1000).map(|_| new_session_id()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_session_id_format() {
        let id = new_session_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_start_session() {
        let session = Session::start(7).unwrap();
        assert_eq!(session.subject_id, 7);
        assert!(session.created_at > 0);
    }

    #[test]
    fn test_default_settings_are_valid() {
        assert!(AuthSettings::default().validate().is_ok());
    }

    #[test]
    fn test_access_must_be_shorter_than_refresh() {
        let settings = AuthSettings {
            access_ttl: Duration::from_secs(3600),
            refresh_ttl: Duration::from_secs(3600),
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_zero_access_ttl_rejected() {
        let settings = AuthSettings {
            access_ttl: Duration::ZERO,
            refresh_ttl: Duration::from_secs(3600),
        };
        assert!(settings.validate().is_err());
    }
}
