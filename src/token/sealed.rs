use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};

use super::TokenError;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// `base64url(nonce ‖ AES-256-GCM(json) ‖ tag)` with a fresh nonce per token.
/// The key is the SHA-256 of the configured secret.
#[derive(Clone)]
pub struct SealedCodec {
    cipher: Aes256Gcm,
}

impl SealedCodec {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let key = Sha256::digest(secret.as_ref());
        Self {
            cipher: Aes256Gcm::new(&key),
        }
    }

    pub(super) fn encode(&self, json: &[u8]) -> Result<String, TokenError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, json)
            .map_err(|_| TokenError::Encrypt)?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(URL_SAFE_NO_PAD.encode(out))
    }

    pub(super) fn decode(&self, s: &str) -> Result<Vec<u8>, TokenError> {
        let raw = URL_SAFE_NO_PAD.decode(s)?;
        if raw.len() < NONCE_LEN + TAG_LEN {
            return Err(TokenError::TooShort);
        }

        let (nonce, ciphertext) = raw.split_at(NONCE_LEN);
        self.cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| TokenError::Decrypt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonce_is_fresh_per_token() {
        let codec = SealedCodec::new("k");
        let a = codec.encode(b"{}").unwrap();
        let b = codec.encode(b"{}").unwrap();
        assert_ne!(a, b);
        assert_eq!(codec.decode(&a).unwrap(), b"{}");
        assert_eq!(codec.decode(&b).unwrap(), b"{}");
    }

    #[test]
    fn payload_is_not_readable() {
        let codec = SealedCodec::new("k");
        let s = codec.encode(br#"{"mysql_password":"hunter2"}"#).unwrap();
        let raw = URL_SAFE_NO_PAD.decode(&s).unwrap();
        assert!(!raw.windows(7).any(|w| w == b"hunter2"));
    }

    #[test]
    fn truncated_input_is_too_short() {
        let codec = SealedCodec::new("k");
        let s = URL_SAFE_NO_PAD.encode([0u8; NONCE_LEN + TAG_LEN - 1]);
        assert!(matches!(codec.decode(&s), Err(TokenError::TooShort)));
    }
}
