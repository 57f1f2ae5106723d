//! Bearer-token authentication for HTTP handlers.
//!
//! Dual-token system: short-lived access tokens bound to the client's
//! User-Agent, and long-lived refresh tokens that can only mint new access
//! tokens. Both are invalidated together by revoking their session.

mod errors;
mod extractors;
mod header;
mod ip;
mod state;

pub use errors::{ApiAuthError, AuthErrorKind};
pub use extractors::{AccessAuth, AccessGuard, RefreshAuth, require_access};
pub use header::{
    ACCESS_TOKEN_HEADER, REFRESH_TOKEN_HEADER, access_token_header, bearer_token, binding_fingerprint,
    cleared_token_headers, token_headers,
};
pub use ip::{ClientIpHeader, HasHeadersAndExtensions, extract_client_ip};
pub use state::HasAuthBackend;
