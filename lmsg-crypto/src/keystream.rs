//! Deterministic keystream
//!
//! RFC6979-style HMAC-SHA256 DRBG, byte-compatible with
//! `secp256k1_rfc6979_hmac_sha256_*` in libsecp256k1. Both the prover's
//! secret scalars and the fake ring responses are drawn from it, so a
//! receiver holding the same seed can reproduce every byte.
//!
//! ```text
//! K = 0x00..00, V = 0x01..01
//! K = HMAC_K(V || 0x00 || seed); V = HMAC_K(V)
//! K = HMAC_K(V || 0x01 || seed); V = HMAC_K(V)
//!
//! generate(n):
//!   if retry: K = HMAC_K(V || 0x00); V = HMAC_K(V)
//!   while n > 0: V = HMAC_K(V); emit V[..min(n, 32)]
//!   retry = 1
//! ```

use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::Zeroize;

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 deterministic random byte generator
///
/// The state advances on every call; an instance must not be shared between
/// two proof constructions.
pub struct HmacDrbg {
    k: [u8; 32],
    v: [u8; 32],
    retry: bool,
}

fn hmac(key: &[u8; 32], parts: &[&[u8]]) -> [u8; 32] {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC init");
    for part in parts {
        mac.update(part);
    }
    mac.finalize().into_bytes().into()
}

impl HmacDrbg {
    /// Initialize the generator from arbitrary seed material (RFC 6979 3.2.b-f)
    pub fn new(seed: &[u8]) -> Self {
        let mut k = [0u8; 32];
        let mut v = [1u8; 32];

        k = hmac(&k, &[&v, &[0x00], seed]);
        v = hmac(&k, &[&v]);
        k = hmac(&k, &[&v, &[0x01], seed]);
        v = hmac(&k, &[&v]);

        log::trace!("keystream seeded from {} bytes", seed.len());
        Self { k, v, retry: false }
    }

    /// Draw `len` bytes, truncating the final 32-byte block (RFC 6979 3.2.h)
    pub fn generate(&mut self, len: usize) -> Vec<u8> {
        if self.retry {
            self.k = hmac(&self.k, &[&self.v, &[0x00]]);
            self.v = hmac(&self.k, &[&self.v]);
        }

        let mut out = Vec::with_capacity(len);
        while out.len() < len {
            self.v = hmac(&self.k, &[&self.v]);
            let now = (len - out.len()).min(32);
            out.extend_from_slice(&self.v[..now]);
        }

        self.retry = true;
        out
    }

    /// Draw exactly one 32-byte block
    pub fn generate_block(&mut self) -> [u8; 32] {
        if self.retry {
            self.k = hmac(&self.k, &[&self.v, &[0x00]]);
            self.v = hmac(&self.k, &[&self.v]);
        }
        self.v = hmac(&self.k, &[&self.v]);
        self.retry = true;
        self.v
    }
}

impl Drop for HmacDrbg {
    fn drop(&mut self) {
        self.k.zeroize();
        self.v.zeroize();
    }
}
