//! Stateless session tokens.
//!
//! A token carries its own expiry and an opaque JSON payload (for this tool,
//! the MySQL credentials). Nothing is stored server-side: a token is valid
//! iff its integrity check passes and `now < exp.access`.
//!
//! Two interchangeable codecs exist:
//! - [`SignedCodec`]: base64url JSON followed by a keyed MD5 digest. Readable
//!   by the client, tamper-evident only.
//! - [`SealedCodec`]: AES-256-GCM, so the payload is also confidential.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

mod sealed;
mod signed;

pub use sealed::SealedCodec;
pub use signed::SignedCodec;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token too short")]
    TooShort,
    #[error("token digest mismatch")]
    Digest,
    #[error("token is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("token payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("token could not be decrypted")]
    Decrypt,
    #[error("token could not be encrypted")]
    Encrypt,
    #[error("token expired")]
    Expired,
}

/// Unix-epoch seconds after which the token stops being accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expiry {
    pub access: i64,
    pub refresh: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Token {
    #[serde(default)]
    pub exp: Expiry,
    #[serde(default)]
    pub data: Map<String, Value>,
}

/// Token lifetimes in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lifetimes {
    pub access_minutes: i64,
    pub refresh_minutes: i64,
}

impl Default for Lifetimes {
    fn default() -> Self {
        Self {
            access_minutes: 14 * 24 * 60,
            refresh_minutes: 28 * 24 * 60,
        }
    }
}

impl Token {
    /// A fresh token with an empty payload, expiring relative to `now`.
    pub fn issue(lifetimes: Lifetimes, now: i64) -> Self {
        Self {
            exp: Expiry {
                access: now + lifetimes.access_minutes * 60,
                refresh: now + lifetimes.refresh_minutes * 60,
            },
            data: Map::new(),
        }
    }

    fn check_expiry(self, now: i64) -> Result<Self, TokenError> {
        if now >= self.exp.access {
            return Err(TokenError::Expired);
        }
        Ok(self)
    }
}

#[derive(Clone)]
pub enum TokenCodec {
    Signed(SignedCodec),
    Sealed(SealedCodec),
}

impl TokenCodec {
    pub fn signed(secret: &str) -> Self {
        TokenCodec::Signed(SignedCodec::new(secret))
    }

    pub fn sealed(secret: &str) -> Self {
        TokenCodec::Sealed(SealedCodec::new(secret))
    }

    pub fn serialize(&self, token: &Token) -> Result<String, TokenError> {
        let json = serde_json::to_vec(token)?;
        match self {
            TokenCodec::Signed(codec) => Ok(codec.encode(&json)),
            TokenCodec::Sealed(codec) => codec.encode(&json),
        }
    }

    pub fn deserialize(&self, s: &str) -> Result<Token, TokenError> {
        self.deserialize_at(s, Utc::now().timestamp())
    }

    /// Decodes and verifies `s`, treating `now` as the current time.
    pub fn deserialize_at(&self, s: &str, now: i64) -> Result<Token, TokenError> {
        let json = match self {
            TokenCodec::Signed(codec) => codec.decode(s)?,
            TokenCodec::Sealed(codec) => codec.decode(s)?,
        };
        let token: Token = serde_json::from_slice(&json)?;
        token.check_expiry(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NOW: i64 = 1_700_000_000;

    fn codecs() -> Vec<TokenCodec> {
        vec![
            TokenCodec::Signed(SignedCodec::new("__secret__")),
            TokenCodec::Sealed(SealedCodec::new("__secret__")),
        ]
    }

    fn sample() -> Token {
        let mut token = Token::issue(Lifetimes::default(), NOW);
        token.data.insert("mysql_host".into(), json!("127.0.0.1"));
        token.data.insert("mysql_port".into(), json!(3306));
        token.data.insert("nested".into(), json!({"a": [1, 2, null]}));
        token
    }

    #[test]
    fn issue_sets_both_expiries() {
        let token = Token::issue(
            Lifetimes {
                access_minutes: 10,
                refresh_minutes: 20,
            },
            NOW,
        );
        assert_eq!(token.exp.access, NOW + 600);
        assert_eq!(token.exp.refresh, NOW + 1200);
        assert!(token.data.is_empty());
    }

    #[test]
    fn round_trip() {
        for codec in codecs() {
            let token = sample();
            let s = codec.serialize(&token).unwrap();
            assert_eq!(codec.deserialize_at(&s, NOW).unwrap(), token);
        }
    }

    #[test]
    fn any_single_byte_flip_is_rejected() {
        for codec in codecs() {
            let s = codec.serialize(&sample()).unwrap();
            let bytes = s.as_bytes();
            for i in 0..bytes.len() {
                let mut tampered = bytes.to_vec();
                tampered[i] = if tampered[i] == b'A' { b'B' } else { b'A' };
                let tampered = String::from_utf8(tampered).unwrap();
                assert!(
                    codec.deserialize_at(&tampered, NOW).is_err(),
                    "flip at {} accepted",
                    i
                );
            }
        }
    }

    #[test]
    fn expired_token_is_rejected() {
        for codec in codecs() {
            let mut token = sample();
            token.exp.access = NOW - 1;
            let s = codec.serialize(&token).unwrap();
            assert!(matches!(codec.deserialize_at(&s, NOW), Err(TokenError::Expired)));

            token.exp.access = NOW;
            let s = codec.serialize(&token).unwrap();
            assert!(matches!(codec.deserialize_at(&s, NOW), Err(TokenError::Expired)));
        }
    }

    #[test]
    fn short_and_garbage_inputs_are_invalid() {
        for codec in codecs() {
            for input in ["", "abc", "é", "not a token at all, clearly"] {
                assert!(codec.deserialize_at(input, NOW).is_err(), "{input:?}");
            }
        }
    }

    #[test]
    fn codecs_do_not_accept_each_other() {
        let signed = TokenCodec::Signed(SignedCodec::new("k"));
        let sealed = TokenCodec::Sealed(SealedCodec::new("k"));
        let s = signed.serialize(&sample()).unwrap();
        assert!(sealed.deserialize_at(&s, NOW).is_err());
        let s = sealed.serialize(&sample()).unwrap();
        assert!(signed.deserialize_at(&s, NOW).is_err());
    }

    #[test]
    fn different_secret_is_rejected() {
        let a = TokenCodec::Sealed(SealedCodec::new("one"));
        let b = TokenCodec::Sealed(SealedCodec::new("two"));
        let s = a.serialize(&sample()).unwrap();
        assert!(b.deserialize_at(&s, NOW).is_err());

        let a = TokenCodec::Signed(SignedCodec::new("one"));
        let b = TokenCodec::Signed(SignedCodec::new("two"));
        let s = a.serialize(&sample()).unwrap();
        assert!(matches!(b.deserialize_at(&s, NOW), Err(TokenError::Digest)));
    }
}
