//! DTOs for decoding storefront API replies.
//!
//! Login and registration replies carry the identity either at the top level
//! or under `user`. A `token` may sit at the top level or inside `user`.

use serde::Deserialize;
use serde_json::Value;

use crate::domain::{Identity, SessionGrant, SessionToken};

#[derive(Debug, Deserialize)]
pub(super) struct ErrorBodyDto {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ErrorBodyDto {
    pub(super) fn into_message(self) -> Option<String> {
        self.message
            .into_iter()
            .chain(self.error)
            .map(|text| text.trim().to_owned())
            .find(|text| !text.is_empty())
    }
}

/// Decode a login or registration reply.
///
/// Token precedence: top-level `token`, then `user.token`, then the
/// response header.
pub(super) fn parse_grant(
    body: &[u8],
    header_token: Option<SessionToken>,
) -> Result<SessionGrant, String> {
    let mut reply: Value =
        serde_json::from_slice(body).map_err(|error| format!("invalid session JSON: {error}"))?;
    let top_token = token_field(&reply);
    let nested = reply
        .get_mut("user")
        .filter(|user| user.is_object())
        .map(Value::take);
    let nested_token = nested.as_ref().and_then(token_field);
    let identity = nested.unwrap_or(reply);
    let identity: Identity = serde_json::from_value(identity)
        .map_err(|error| format!("invalid identity payload: {error}"))?;
    Ok(SessionGrant {
        identity,
        token: top_token.or(nested_token).or(header_token),
    })
}

fn token_field(object: &Value) -> Option<SessionToken> {
    object
        .get("token")
        .and_then(Value::as_str)
        .and_then(SessionToken::new)
}

/// Token from an `Authorization: Bearer <token>` response header value.
pub(super) fn bearer_token(header: &str) -> Option<SessionToken> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") {
        SessionToken::new(token.trim())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;
    use rstest::rstest;

    const ADMIN: &str = r#"{"id":1,"username":"admin","role":"admin","email":"admin@shop.test","displayName":"Admin"}"#;

    #[test]
    fn top_level_identity_with_body_token() {
        let body = format!(r#"{{"token":"t-1",{}"#, &ADMIN[1..]);
        let grant = parse_grant(body.as_bytes(), None).expect("grant decodes");
        assert_eq!(grant.identity.role(), Role::Admin);
        assert_eq!(grant.token.as_ref().map(SessionToken::expose), Some("t-1"));
    }

    #[test]
    fn nested_user_falls_back_to_header_token() {
        let body = format!(r#"{{"user":{ADMIN}}}"#);
        let grant = parse_grant(body.as_bytes(), SessionToken::new("from-header"))
            .expect("grant decodes");
        assert_eq!(grant.identity.username(), "admin");
        assert_eq!(
            grant.token.as_ref().map(SessionToken::expose),
            Some("from-header")
        );
    }

    #[test]
    fn token_inside_nested_user_is_read() {
        let body = format!(r#"{{"user":{{"token":"inner",{}}}"#, &ADMIN[1..]);
        let grant = parse_grant(body.as_bytes(), SessionToken::new("from-header"))
            .expect("grant decodes");
        assert_eq!(grant.identity.username(), "admin");
        assert_eq!(grant.token.as_ref().map(SessionToken::expose), Some("inner"));
    }

    #[test]
    fn top_level_token_wins_over_nested_one() {
        let body = format!(r#"{{"token":"outer","user":{{"token":"inner",{}}}"#, &ADMIN[1..]);
        let grant = parse_grant(body.as_bytes(), None).expect("grant decodes");
        assert_eq!(grant.token.as_ref().map(SessionToken::expose), Some("outer"));
    }

    #[test]
    fn unknown_role_is_a_decode_error() {
        let body = ADMIN.replace("\"admin\",\"email\"", "\"superuser\",\"email\"");
        assert!(parse_grant(body.as_bytes(), None).is_err());
    }

    #[rstest]
    #[case("Bearer abc", Some("abc"))]
    #[case("bearer  abc ", Some("abc"))]
    #[case("Basic abc", None)]
    #[case("Bearer", None)]
    fn bearer_header_parsing(#[case] header: &str, #[case] expected: Option<&str>) {
        assert_eq!(
            bearer_token(header).as_ref().map(SessionToken::expose),
            expected
        );
    }

    #[rstest]
    #[case(r#"{"message":"Invalid username or password"}"#, Some("Invalid username or password"))]
    #[case(r#"{"error":" Admin access required "}"#, Some("Admin access required"))]
    #[case(r#"{"message":"","error":"fallback"}"#, Some("fallback"))]
    #[case(r#"{"detail":"ignored"}"#, None)]
    fn error_bodies_yield_first_non_blank_message(
        #[case] body: &str,
        #[case] expected: Option<&str>,
    ) {
        let dto: ErrorBodyDto = serde_json::from_str(body).expect("error body decodes");
        assert_eq!(dto.into_message().as_deref(), expected);
    }
}
