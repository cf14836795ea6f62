//! X25519 key pair generation for the provisioning handshake
//!
//! The private scalar is clamped before the public key is derived, so the
//! stored private key is already in canonical WireGuard form. Both halves are
//! exposed as standard padded base64, the encoding WireGuard configs use.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use std::fmt;
use thiserror::Error;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::{Zeroize, Zeroizing};

pub const KEY_LEN: usize = 32;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Secure random source failed: {0}")]
    RandomSource(#[from] rand::Error),

    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

/// Apply the X25519 scalar clamp
pub fn clamp(mut scalar: [u8; KEY_LEN]) -> [u8; KEY_LEN] {
    scalar[0] &= 248;
    scalar[31] &= 127;
    scalar[31] |= 64;
    scalar
}

/// Freshly generated key pair; the secret is wiped on drop
pub struct KeyPair {
    secret: StaticSecret,
    public: PublicKey,
}

impl KeyPair {
    /// Generate a key pair from the OS random source
    pub fn generate() -> Result<Self, CryptoError> {
        Self::generate_with(&mut OsRng)
    }

    pub fn generate_with<R: RngCore + CryptoRng>(rng: &mut R) -> Result<Self, CryptoError> {
        let mut seed = [0u8; KEY_LEN];
        rng.try_fill_bytes(&mut seed)?;
        let pair = Self::from_private_bytes(seed);
        seed.zeroize();
        Ok(pair)
    }

    /// Build a key pair from raw private bytes, clamping them first
    pub fn from_private_bytes(bytes: [u8; KEY_LEN]) -> Self {
        let secret = StaticSecret::from(clamp(bytes));
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Rebuild a key pair from a base64 private key, e.g. to retry a request
    pub fn from_private_base64(text: &str) -> Result<Self, CryptoError> {
        let decoded = Zeroizing::new(
            STANDARD
                .decode(text.trim())
                .map_err(|e| CryptoError::InvalidKey(e.to_string()))?,
        );
        let bytes: [u8; KEY_LEN] = decoded.as_slice().try_into().map_err(|_| {
            CryptoError::InvalidKey(format!("expected {} bytes, got {}", KEY_LEN, decoded.len()))
        })?;
        Ok(Self::from_private_bytes(bytes))
    }

    pub fn public_bytes(&self) -> [u8; KEY_LEN] {
        self.public.to_bytes()
    }

    pub fn private_bytes(&self) -> Zeroizing<[u8; KEY_LEN]> {
        Zeroizing::new(self.secret.to_bytes())
    }

    pub fn public_key_base64(&self) -> String {
        STANDARD.encode(self.public.as_bytes())
    }

    pub fn private_key_base64(&self) -> Zeroizing<String> {
        Zeroizing::new(STANDARD.encode(self.secret.as_bytes()))
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public_key_base64())
            .field("private", &"<redacted>")
            .finish()
    }
}
