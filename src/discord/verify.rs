//! Verification of inbound interaction signatures.
//!
//! Discord signs `timestamp || body` with the application's ed25519 key and
//! sends the hex encoded signature in `X-Signature-Ed25519`.

use anyhow::{Context, Result};
use ring::signature::{ED25519, UnparsedPublicKey};

pub const SIGNATURE_HEADER: &str = "X-Signature-Ed25519";
pub const TIMESTAMP_HEADER: &str = "X-Signature-Timestamp";

const PUBLIC_KEY_LEN: usize = 32;

pub struct SignatureVerifier {
    public_key: Vec<u8>,
}

impl SignatureVerifier {
    pub fn from_hex(public_key: &str) -> Result<Self> {
        let public_key = hex::decode(public_key.trim())
            .context("Could not decode public_key as hex string")?;

        if public_key.len() != PUBLIC_KEY_LEN {
            anyhow::bail!(
                "Incorrect public_key size of {} bytes after hex decoding, expected {}",
                public_key.len(),
                PUBLIC_KEY_LEN
            );
        }

        Ok(SignatureVerifier { public_key })
    }

    pub fn verify(&self, signature: &str, timestamp: &str, body: &[u8]) -> bool {
        let Ok(signature) = hex::decode(signature) else {
            return false;
        };

        let mut message = Vec::with_capacity(timestamp.len() + body.len());
        message.extend_from_slice(timestamp.as_bytes());
        message.extend_from_slice(body);

        UnparsedPublicKey::new(&ED25519, &self.public_key)
            .verify(&message, &signature)
            .is_ok()
    }
}
