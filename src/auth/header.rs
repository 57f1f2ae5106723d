//! Token transport over HTTP headers.

use std::borrow::Cow;

use axum::http::{HeaderMap, HeaderName, HeaderValue, header};

use crate::issuer::{IssuedLogin, IssuedToken};

/// Response header carrying a newly issued access token.
pub const ACCESS_TOKEN_HEADER: &str = "x-access-token";

/// Response header carrying a newly issued refresh token.
pub const REFRESH_TOKEN_HEADER: &str = "x-refresh-token";

/// Extract the token from `Authorization: Bearer <token>`.
///
/// The header must split into exactly two space-separated segments; anything
/// else counts as no token at all. The scheme is matched case-insensitively.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let mut parts = value.split(' ');
    let (scheme, token) = (parts.next()?, parts.next()?);
    if parts.next().is_some() || !scheme.eq_ignore_ascii_case("Bearer") || token.is_empty() {
        return None;
    }
    Some(token)
}

/// The client context a token is bound to: the request's User-Agent, or an
/// empty string when the client sends none.
///
/// Non-ASCII and non-UTF-8 agents are kept (invalid bytes become U+FFFD) so
/// they never collapse into the empty fingerprint of a client without one.
pub fn binding_fingerprint(headers: &HeaderMap) -> Cow<'_, str> {
    match headers.get(header::USER_AGENT) {
        Some(value) => String::from_utf8_lossy(value.as_bytes()),
        None => Cow::Borrowed(""),
    }
}

/// Headers handing a fresh login's tokens to the client.
pub fn token_headers(login: &IssuedLogin) -> [(HeaderName, HeaderValue); 2] {
    [
        (
            HeaderName::from_static(ACCESS_TOKEN_HEADER),
            token_value(&login.access.token),
        ),
        (
            HeaderName::from_static(REFRESH_TOKEN_HEADER),
            token_value(&login.refresh.token),
        ),
    ]
}

/// Header handing a refreshed access token to the client.
pub fn access_token_header(access: &IssuedToken) -> [(HeaderName, HeaderValue); 1] {
    [(
        HeaderName::from_static(ACCESS_TOKEN_HEADER),
        token_value(&access.token),
    )]
}

/// Empty token headers instructing the client to drop both tokens.
pub fn cleared_token_headers() -> [(HeaderName, HeaderValue); 2] {
    [
        (
            HeaderName::from_static(ACCESS_TOKEN_HEADER),
            HeaderValue::from_static(""),
        ),
        (
            HeaderName::from_static(REFRESH_TOKEN_HEADER),
            HeaderValue::from_static(""),
        ),
    ]
}

fn token_value(token: &str) -> HeaderValue {
    // JWTs are base64url segments joined by dots, always a valid header value
    HeaderValue::from_str(token).unwrap_or_else(|_| HeaderValue::from_static(""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_auth(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(&with_auth("Bearer abc.def.ghi")), Some("abc.def.ghi"));
    }

    #[test]
    fn test_bearer_token_missing() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_bearer_token_wrong_segment_count() {
        assert_eq!(bearer_token(&with_auth("Bearer")), None);
        assert_eq!(bearer_token(&with_auth("Bearer a b")), None);
        assert_eq!(bearer_token(&with_auth("Bearer ")), None);
        assert_eq!(bearer_token(&with_auth("abc.def.ghi")), None);
    }

    #[test]
    fn test_bearer_token_other_scheme() {
        assert_eq!(bearer_token(&with_auth("Basic dXNlcjpwYXNz")), None);
    }

    #[test]
    fn test_bearer_scheme_is_case_insensitive() {
        assert_eq!(bearer_token(&with_auth("bearer abc.def.ghi")), Some("abc.def.ghi"));
        assert_eq!(bearer_token(&with_auth("BEARER abc.def.ghi")), Some("abc.def.ghi"));
    }

    #[test]
    fn test_binding_fingerprint() {
        let mut headers = HeaderMap::new();
        assert_eq!(binding_fingerprint(&headers), "");

        headers.insert(header::USER_AGENT, HeaderValue::from_static("Mozilla/5.0"));
        assert_eq!(binding_fingerprint(&headers), "Mozilla/5.0");
    }

    #[test]
    fn test_non_ascii_fingerprint_is_not_empty() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            HeaderValue::from_bytes(b"Mozilla/5.0 (Linux; \xc3\xa9dition)").unwrap(),
        );
        assert_eq!(binding_fingerprint(&headers), "Mozilla/5.0 (Linux; \u{e9}dition)");

        let mut other = HeaderMap::new();
        other.insert(
            header::USER_AGENT,
            HeaderValue::from_bytes(b"curl/\xff").unwrap(),
        );
        assert_eq!(binding_fingerprint(&other), "curl/\u{fffd}");
    }

    #[test]
    fn test_cleared_token_headers() {
        for (name, value) in cleared_token_headers() {
            assert!(name == ACCESS_TOKEN_HEADER || name == REFRESH_TOKEN_HEADER);
            assert!(value.is_empty());
        }
    }
}
