//! Decode-only JWT handling
//!
//! The client never verifies signatures; it only reads the subject and the
//! expiry so it knows who is logged in and when to refresh.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;
use uuid::Uuid;

/// Seconds before expiry at which the token is refreshed
pub const REFRESH_LEAD_SECS: i64 = 300;

/// Claims the client cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Claims {
    /// User the token was issued for
    pub subject_id: Uuid,
    /// Expiry as Unix epoch seconds
    pub expires_at: i64,
}

impl Claims {
    /// Whether the token is no longer usable at `now`
    pub const fn is_expired(&self, now: i64) -> bool {
        self.expires_at <= now
    }

    /// Delay until the refresh should fire, if there is still time to arm one
    pub fn refresh_delay(&self, now: i64) -> Option<Duration> {
        let secs = self.expires_at - now - REFRESH_LEAD_SECS;
        (secs > 0).then(|| Duration::from_secs(secs as u64))
    }

    /// Whether the token is inside the refresh window (or past it)
    pub fn needs_refresh(&self, now: i64) -> bool {
        self.refresh_delay(now).is_none()
    }
}

#[derive(Deserialize)]
struct RawClaims {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    sub: Option<String>,
    #[serde(default, rename = "subjectId")]
    subject_id: Option<String>,
    #[serde(default)]
    exp: Option<i64>,
}

/// Decode a token's claims without verifying it.
///
/// Never fails outward: anything malformed yields `None`, which callers
/// treat as an invalid token.
pub fn decode_token(token: &str) -> Option<Claims> {
    let mut parts = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return None;
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    let raw: RawClaims = serde_json::from_slice(&bytes).ok()?;

    let subject = raw.id.or(raw.sub).or(raw.subject_id)?;
    let subject_id = Uuid::parse_str(&subject).ok()?;
    let expires_at = raw.exp?;

    Some(Claims {
        subject_id,
        expires_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::make_token;

    #[test]
    fn test_decode_valid_token() {
        let id = Uuid::new_v4();
        let claims = decode_token(&make_token(id, 1_700_000_000)).unwrap();
        assert_eq!(claims.subject_id, id);
        assert_eq!(claims.expires_at, 1_700_000_000);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_token("").is_none());
        assert!(decode_token("not-a-token").is_none());
        assert!(decode_token("a.b").is_none());
        assert!(decode_token("a.b.c.d").is_none());
        assert!(decode_token("e30.!!!.sig").is_none());
    }

    #[test]
    fn test_decode_requires_exp_and_subject() {
        let no_exp = format!(
            "e30.{}.sig",
            URL_SAFE_NO_PAD.encode(format!(r#"{{"id":"{}"}}"#, Uuid::new_v4()))
        );
        assert!(decode_token(&no_exp).is_none());

        let no_subject = format!("e30.{}.sig", URL_SAFE_NO_PAD.encode(r#"{"exp":10}"#));
        assert!(decode_token(&no_subject).is_none());
    }

    #[test]
    fn test_sub_claim_is_accepted() {
        let id = Uuid::new_v4();
        let token = format!(
            "e30.{}.sig",
            URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"{id}","exp":42}}"#))
        );
        assert_eq!(decode_token(&token).unwrap().subject_id, id);
    }

    #[test]
    fn test_refresh_delay() {
        let claims = Claims {
            subject_id: Uuid::new_v4(),
            expires_at: 10_000,
        };
        assert_eq!(claims.refresh_delay(6_400), Some(Duration::from_secs(3_300)));
        assert_eq!(claims.refresh_delay(9_700), None);
        assert!(claims.needs_refresh(9_800));
        assert!(!claims.is_expired(9_999));
        assert!(claims.is_expired(10_000));
    }
}
