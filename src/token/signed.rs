use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use super::TokenError;

/// Hex MD5 digest length appended to every signed token.
const DIGEST_LEN: usize = 32;

/// `base64url(json) ‖ hex(md5(base64url(json) ‖ secret))`.
///
/// MD5 is used for tamper evidence only; the payload is readable by anyone
/// holding the token.
#[derive(Clone)]
pub struct SignedCodec {
    secret: String,
}

impl SignedCodec {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    fn digest(&self, body: &str) -> String {
        let mut input = String::with_capacity(body.len() + self.secret.len());
        input.push_str(body);
        input.push_str(&self.secret);
        format!("{:x}", md5::compute(input.as_bytes()))
    }

    pub(super) fn encode(&self, json: &[u8]) -> String {
        let body = URL_SAFE_NO_PAD.encode(json);
        let digest = self.digest(&body);
        body + &digest
    }

    pub(super) fn decode(&self, s: &str) -> Result<Vec<u8>, TokenError> {
        if s.len() < DIGEST_LEN {
            return Err(TokenError::TooShort);
        }

        let split = s.len() - DIGEST_LEN;
        let (body, digest) = match (s.get(..split), s.get(split..)) {
            (Some(body), Some(digest)) => (body, digest),
            _ => return Err(TokenError::Digest),
        };

        if digest != self.digest(body) {
            return Err(TokenError::Digest);
        }

        Ok(URL_SAFE_NO_PAD.decode(body)?)
    }
}
