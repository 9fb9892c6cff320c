//! Access-token inspection
//!
//! Reads the `exp` claim of a JWT access token. The signature is never
//! checked: the server remains the authority on trust, the client only avoids
//! sending tokens it already knows are stale.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// What the client can tell about a token without asking the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStatus {
    /// Carries an `exp` claim in the future
    Valid { expires_at: DateTime<Utc> },
    /// Carries an `exp` claim at or before now
    Expired { expired_at: DateTime<Utc> },
    /// Not a JWT, or no readable `exp` claim
    Opaque,
}

impl TokenStatus {
    pub fn is_expired(&self) -> bool {
        matches!(self, TokenStatus::Expired { .. })
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, TokenStatus::Valid { .. })
    }
}

#[derive(Deserialize)]
struct Claims {
    exp: Option<f64>,
}

/// Expiry time embedded in the token, if any
pub fn expiry(token: &str) -> Option<DateTime<Utc>> {
    let mut parts = token.split('.');
    let (_header, payload, _signature) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: Claims = serde_json::from_slice(&bytes).ok()?;
    DateTime::from_timestamp(claims.exp? as i64, 0)
}

pub fn status_at(token: &str, now: DateTime<Utc>) -> TokenStatus {
    match expiry(token) {
        Some(expires_at) if expires_at > now => TokenStatus::Valid { expires_at },
        Some(expired_at) => TokenStatus::Expired { expired_at },
        None => TokenStatus::Opaque,
    }
}

pub fn status(token: &str) -> TokenStatus {
    status_at(token, Utc::now())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Unsigned JWT carrying the given `exp`
    pub fn jwt_with_exp(exp: i64) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"token_type":"access","exp":{exp},"user_id":1}}"#));
        format!("{header}.{payload}.signature")
    }

    pub fn fresh_jwt() -> String {
        jwt_with_exp(Utc::now().timestamp() + 3600)
    }

    pub fn expired_jwt() -> String {
        jwt_with_exp(Utc::now().timestamp() - 60)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_valid_token() {
        let token = jwt_with_exp(2_000_000_000);
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        assert!(status_at(&token, now).is_valid());
        assert_eq!(expiry(&token).unwrap().timestamp(), 2_000_000_000);
    }

    #[test]
    fn test_expired_token() {
        let token = jwt_with_exp(1_700_000_000);
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        assert!(status_at(&token, now).is_expired());
        assert!(status_at(&token, now - Duration::seconds(1)).is_valid());
    }

    #[test]
    fn test_opaque_tokens() {
        assert_eq!(status("tok1"), TokenStatus::Opaque);
        assert_eq!(status("a.b.c.d"), TokenStatus::Opaque);
        assert_eq!(status("a.!!!.c"), TokenStatus::Opaque);

        let no_exp = format!(
            "{}.{}.sig",
            URL_SAFE_NO_PAD.encode(b"{}"),
            URL_SAFE_NO_PAD.encode(br#"{"user_id":1}"#)
        );
        assert_eq!(status(&no_exp), TokenStatus::Opaque);
    }

    #[test]
    fn test_padded_payload_accepted() {
        let token = jwt_with_exp(2_000_000_000);
        let mut parts: Vec<String> = token.split('.').map(String::from).collect();
        parts[1].push_str("==");
        assert!(expiry(&parts.join(".")).is_some());
    }
}
