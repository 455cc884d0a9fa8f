//! `lm:` message envelope
//!
//! Chat messages travel inside the proof as `lm:<salt hex>:<body hex>`. The
//! body is the text XORed with a SHA-256 chain seeded from the salt:
//!
//! ```text
//! key = SHA256(salt)
//! body[i] = text[i] ^ key[i % 32]      (key = SHA256(key) every 32 bytes)
//! ```
//!
//! The salt is carried in the clear right next to the body, so anyone who
//! can decode the proof can also open the envelope. This is a framing and
//! obfuscation layer only; confidentiality comes from the shared nonce.

use crate::{Result, StegoError};
use sha2::{Digest, Sha256};
use std::fmt;

/// Tag opening every envelope
pub const ENVELOPE_TAG: &str = "lm";

/// Salt length used by [`Envelope::seal_random`]
pub const SALT_SIZE: usize = 32;

/// A parsed or freshly sealed `lm:` envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    salt: Vec<u8>,
    body: Vec<u8>,
}

fn xor_chain(salt: &[u8], data: &mut [u8]) {
    let mut key: [u8; 32] = Sha256::digest(salt).into();
    for (i, byte) in data.iter_mut().enumerate() {
        if i > 0 && i % 32 == 0 {
            key = Sha256::digest(key).into();
        }
        *byte ^= key[i % 32];
    }
}

impl Envelope {
    /// Seal `text` under `salt`
    pub fn seal(text: &str, salt: &[u8]) -> Self {
        let mut body = text.as_bytes().to_vec();
        xor_chain(salt, &mut body);
        Self {
            salt: salt.to_vec(),
            body,
        }
    }

    /// Seal `text` under a fresh random salt
    #[cfg(feature = "rand")]
    pub fn seal_random(text: &str) -> Self {
        use rand::RngCore;

        let mut salt = [0u8; SALT_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut salt);
        Self::seal(text, &salt)
    }

    /// Parse `lm:<salt hex>:<body hex>`; trailing components are ignored
    ///
    /// # Errors
    ///
    /// `StegoError::InvalidEnvelope` for a missing tag or component,
    /// `StegoError::InvalidHex` for undecodable hex.
    pub fn parse(frame: &str) -> Result<Self> {
        let mut parts = frame.split(':');
        let tag = parts.next().unwrap_or_default();
        if tag != ENVELOPE_TAG {
            return Err(StegoError::InvalidEnvelope(format!("unexpected tag {tag:?}")));
        }

        let salt = parts
            .next()
            .ok_or_else(|| StegoError::InvalidEnvelope("missing salt".into()))?;
        let body = parts
            .next()
            .ok_or_else(|| StegoError::InvalidEnvelope("missing body".into()))?;

        Ok(Self {
            salt: hex::decode(salt)?,
            body: hex::decode(body)?,
        })
    }

    /// Undo the XOR chain over the whole body
    ///
    /// A zero body byte is ordinary ciphertext: it appears whenever a text
    /// byte equals the key byte at that position.
    pub fn open_bytes(&self) -> Vec<u8> {
        let mut text = self.body.clone();
        xor_chain(&self.salt, &mut text);
        text
    }

    /// [`Envelope::open_bytes`] as text, replacing invalid UTF-8
    pub fn open(&self) -> String {
        String::from_utf8_lossy(&self.open_bytes()).into_owned()
    }

    /// Salt bytes
    pub fn salt(&self) -> &[u8] {
        &self.salt
    }

    /// Obfuscated body bytes
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            ENVELOPE_TAG,
            hex::encode(&self.salt),
            hex::encode(&self.body)
        )
    }
}
