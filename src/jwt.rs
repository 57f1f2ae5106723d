//! Signed claim encoding and decoding.
//!
//! Access and refresh claims are signed with HS512 under two disjoint keys, so
//! a refresh token can never verify as an access token and a leaked refresh
//! key cannot forge access tokens.

use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind,
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::time::{SystemTime, UNIX_EPOCH};

/// Minimum accepted length of each signing secret, in bytes.
pub const MIN_SECRET_LENGTH: usize = 32;

const ALGORITHM: Algorithm = Algorithm::HS512;

/// Token type for distinguishing access vs refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Short-lived token presented on every request
    Access,
    /// Long-lived token used only to obtain new access tokens
    Refresh,
}

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (user id); zero when absent
    #[serde(default)]
    pub uid: i64,
    /// Session id shared with the refresh token from the same login
    pub sid: String,
    /// Binding fingerprint (client user agent at issuance)
    pub fpr: String,
    #[serde(rename = "typ")]
    pub token_type: TokenType,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Claims carried by a refresh token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    #[serde(default)]
    pub uid: i64,
    pub sid: String,
    #[serde(rename = "typ")]
    pub token_type: TokenType,
    pub iat: u64,
    pub exp: u64,
}

trait TypedClaims {
    const TYPE: TokenType;
    fn token_type(&self) -> TokenType;
    fn exp(&self) -> u64;
}

impl TypedClaims for AccessClaims {
    const TYPE: TokenType = TokenType::Access;
    fn token_type(&self) -> TokenType {
        self.token_type
    }
    fn exp(&self) -> u64 {
        self.exp
    }
}

impl TypedClaims for RefreshClaims {
    const TYPE: TokenType = TokenType::Refresh;
    fn token_type(&self) -> TokenType {
        self.token_type
    }
    fn exp(&self) -> u64 {
        self.exp
    }
}

/// The two signing secrets, one per key domain.
pub struct SigningKeys {
    pub access: Vec<u8>,
    pub refresh: Vec<u8>,
}

impl SigningKeys {
    /// Check length and separation of the two secrets.
    pub fn validate(&self) -> Result<(), JwtError> {
        if self.access.len() < MIN_SECRET_LENGTH || self.refresh.len() < MIN_SECRET_LENGTH {
            return Err(JwtError::WeakKey);
        }
        if self.access == self.refresh {
            return Err(JwtError::SharedKey);
        }
        Ok(())
    }
}

struct KeyDomain {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyDomain {
    fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

/// Encodes and decodes claims under the access and refresh key domains.
pub struct ClaimsCodec {
    access: KeyDomain,
    refresh: KeyDomain,
}

impl ClaimsCodec {
    pub fn new(keys: &SigningKeys) -> Result<Self, JwtError> {
        keys.validate()?;
        Ok(Self {
            access: KeyDomain::new(&keys.access),
            refresh: KeyDomain::new(&keys.refresh),
        })
    }

    pub fn encode_access(&self, claims: &AccessClaims) -> Result<String, JwtError> {
        encode(claims, &self.access)
    }

    pub fn encode_refresh(&self, claims: &RefreshClaims) -> Result<String, JwtError> {
        encode(claims, &self.refresh)
    }

    pub fn decode_access(&self, token: &str) -> Result<AccessClaims, JwtError> {
        decode(token, &self.access)
    }

    pub fn decode_refresh(&self, token: &str) -> Result<RefreshClaims, JwtError> {
        decode(token, &self.refresh)
    }
}

fn encode<C: Serialize>(claims: &C, domain: &KeyDomain) -> Result<String, JwtError> {
    jsonwebtoken::encode(&Header::new(ALGORITHM), claims, &domain.encoding)
        .map_err(JwtError::Encoding)
}

fn decode<C: DeserializeOwned + TypedClaims>(
    token: &str,
    domain: &KeyDomain,
) -> Result<C, JwtError> {
    let mut validation = Validation::new(ALGORITHM);
    validation.leeway = 0;

    let claims = jsonwebtoken::decode::<C>(token, &domain.decoding, &validation)
        .map_err(JwtError::from_decode)?
        .claims;

    if claims.token_type() != C::TYPE {
        return Err(JwtError::Malformed);
    }

    // The library accepts exp == now; a token is dead at its expiry second
    if claims.exp() <= now_secs()? {
        return Err(JwtError::Expired);
    }

    Ok(claims)
}

/// Current Unix time in seconds.
pub fn now_secs() -> Result<u64, JwtError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|_| JwtError::TimeError)
}

/// Errors that can occur during claim encoding and decoding.
#[derive(Debug)]
pub enum JwtError {
    /// Error encoding the token
    Encoding(jsonwebtoken::errors::Error),
    /// Token does not parse into the expected claim shape
    Malformed,
    /// MAC does not verify under the expected key
    SignatureInvalid,
    /// Expiry is at or before the current time
    Expired,
    /// System time error
    TimeError,
    /// A signing secret is shorter than the minimum length
    WeakKey,
    /// Access and refresh secrets are identical
    SharedKey,
    /// Refusing to sign claims without a subject
    MissingSubject,
}

impl JwtError {
    fn from_decode(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::InvalidSignature => JwtError::SignatureInvalid,
            ErrorKind::ExpiredSignature => JwtError::Expired,
            _ => JwtError::Malformed,
        }
    }
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
            JwtError::Malformed => write!(f, "Malformed token"),
            JwtError::SignatureInvalid => write!(f, "Invalid token signature"),
            JwtError::Expired => write!(f, "Token expired"),
            JwtError::TimeError => write!(f, "System time error"),
            JwtError::WeakKey => write!(
                f,
                "Signing secrets must be at least {} bytes",
                MIN_SECRET_LENGTH
            ),
            JwtError::SharedKey => write!(f, "Access and refresh secrets must differ"),
            JwtError::MissingSubject => write!(f, "Cannot issue a token without a subject"),
        }
    }
}

impl std::error::Error for JwtError {}
