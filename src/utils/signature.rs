//! HMAC-SHA256 request signatures.
//!
//! The tag is `base64(HMAC-SHA256(secret, body))` over the raw body bytes, carried in the
//! `X-Signature` header.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "X-Signature";

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Signature header missing")]
    Missing,
    #[error("Invalid signature")]
    Invalid,
}

/// Verifies request bodies against a shared secret fixed at startup.
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: Vec<u8>,
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier").finish_non_exhaustive()
    }
}

impl SignatureVerifier {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    fn mac(&self, body: &[u8]) -> HmacSha256 {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts keys of any length");
        mac.update(body);
        mac
    }

    /// Produces the tag a client must send for `body`.
    pub fn sign(&self, body: &[u8]) -> String {
        STANDARD.encode(self.mac(body).finalize().into_bytes())
    }

    /// Checks `tag` against `body`. The comparison runs in constant time.
    pub fn verify(&self, body: &[u8], tag: Option<&str>) -> Result<(), SignatureError> {
        let tag = match tag {
            Some(tag) if !tag.is_empty() => tag,
            _ => return Err(SignatureError::Missing),
        };

        let supplied = STANDARD.decode(tag).map_err(|_| SignatureError::Invalid)?;
        self.mac(body)
            .verify_slice(&supplied)
            .map_err(|_| SignatureError::Invalid)
    }
}
