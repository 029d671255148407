/*
 * Responsibility
 * - Authorization header → raw bearer token
 * - Format checks only; the token itself is not decoded here
 */
use axum::http::{HeaderMap, header};

use crate::services::auth::error::AuthError;

const BEARER: &str = "Bearer";

/// Pull the bearer token out of the request headers.
pub fn extract_bearer(headers: &HeaderMap) -> Result<&str, AuthError> {
    match headers.get(header::AUTHORIZATION) {
        None => Err(AuthError::MissingHeader),
        Some(value) => {
            let raw = value.to_str().map_err(|_| AuthError::MalformedHeader)?;
            parse_bearer(Some(raw))
        }
    }
}

/// `<scheme> <token>`: exactly two parts separated by a single space.
/// The scheme is compared ASCII case-insensitively (RFC 7235).
pub fn parse_bearer(raw: Option<&str>) -> Result<&str, AuthError> {
    let raw = raw.ok_or(AuthError::MissingHeader)?;

    let mut parts = raw.split(' ');
    let (Some(scheme), Some(token), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(AuthError::MalformedHeader);
    };

    if scheme.is_empty() || token.is_empty() {
        return Err(AuthError::MalformedHeader);
    }

    if !scheme.eq_ignore_ascii_case(BEARER) {
        return Err(AuthError::UnsupportedScheme);
    }

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn returns_token_verbatim() {
        assert_eq!(parse_bearer(Some("Bearer abc.def.ghi")), Ok("abc.def.ghi"));
        assert_eq!(parse_bearer(Some("bearer abc")), Ok("abc"));
    }

    #[test]
    fn missing_header() {
        assert_eq!(extract_bearer(&HeaderMap::new()), Err(AuthError::MissingHeader));
        assert_eq!(parse_bearer(None), Err(AuthError::MissingHeader));
    }

    #[test]
    fn wrong_number_of_parts() {
        assert_eq!(parse_bearer(Some("Bearer")), Err(AuthError::MalformedHeader));
        assert_eq!(parse_bearer(Some("Bearer ")), Err(AuthError::MalformedHeader));
        assert_eq!(parse_bearer(Some("Bearer a b")), Err(AuthError::MalformedHeader));
        assert_eq!(parse_bearer(Some("Bearer  a")), Err(AuthError::MalformedHeader));
        assert_eq!(parse_bearer(Some("")), Err(AuthError::MalformedHeader));
    }

    #[test]
    fn other_schemes_are_rejected() {
        assert_eq!(
            parse_bearer(Some("Basic dXNlcjpwYXNz")),
            Err(AuthError::UnsupportedScheme)
        );
        assert_eq!(parse_bearer(Some("Token abc")), Err(AuthError::UnsupportedScheme));
    }

    #[test]
    fn non_ascii_header_value_is_malformed() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_bytes(b"Bearer \xfftoken").unwrap(),
        );
        assert_eq!(extract_bearer(&headers), Err(AuthError::MalformedHeader));
    }
}
