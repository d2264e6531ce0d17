//! ---
//! warden_section: "06-security-access-control"
//! warden_subsection: "module"
//! warden_type: "source"
//! warden_scope: "code"
//! warden_description: "Access policies, route gating, and cryptographic utilities."
//! warden_version: "v0.0.0-prealpha"
//! warden_owner: "tbd"
//! ---
//! At-rest encryption for settings values.
//!
//! Values are sealed with AES-256-GCM under a fresh random nonce and stored as
//! `nonce_hex:ciphertext_hex`.

use std::fmt;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Nonce length for AES-GCM in bytes.
pub const NONCE_LEN: usize = 12;

/// Default environment variable holding the settings key as hex.
pub const DEFAULT_KEY_ENV: &str = "WARDEN_SETTINGS_KEY";

/// Errors produced by [`KeyMaterial`] and [`SettingsCipher`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// Key material is missing or has the wrong shape.
    #[error("invalid key material: {0}")]
    InvalidKey(String),
    /// Stored value is not in `nonce_hex:ciphertext_hex` form.
    #[error("malformed ciphertext: {0}")]
    Malformed(&'static str),
    /// Authentication failed (corruption or a different key).
    #[error("ciphertext could not be authenticated")]
    Authentication,
    /// Encryption backend failure.
    #[error("encryption failed")]
    Encryption,
}

/// Opaque symmetric key material (32 bytes).
#[derive(Clone)]
pub struct KeyMaterial([u8; 32]);

impl KeyMaterial {
    /// Generate random key material.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Parse 64 hex characters.
    pub fn from_hex(raw: &str) -> Result<Self, CryptoError> {
        let decoded = hex::decode(raw.trim())
            .map_err(|err| CryptoError::InvalidKey(format!("not hex: {err}")))?;
        let bytes: [u8; 32] = decoded.try_into().map_err(|bytes: Vec<u8>| {
            CryptoError::InvalidKey(format!("expected 32 bytes, got {}", bytes.len()))
        })?;
        Ok(Self(bytes))
    }

    /// Read hex key material from the named environment variable.
    pub fn from_env(var: &str) -> Result<Self, CryptoError> {
        let raw = std::env::var(var).map_err(|_| {
            CryptoError::InvalidKey(format!("environment variable {var} is not set"))
        })?;
        Self::from_hex(&raw)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// SHA-256 fingerprint of the key for audit/logging.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.0);
        hex::encode(hasher.finalize())
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("KeyMaterial")
            .field(&&self.fingerprint()[..16])
            .finish()
    }
}

/// Seals and opens settings values under one process-wide key.
#[derive(Clone)]
pub struct SettingsCipher {
    cipher: Aes256Gcm,
    fingerprint: String,
}

impl SettingsCipher {
    pub fn new(key: &KeyMaterial) -> Result<Self, CryptoError> {
        let cipher = Aes256Gcm::new_from_slice(&key.0)
            .map_err(|_| CryptoError::InvalidKey("expected a 256-bit key".into()))?;
        Ok(Self {
            cipher,
            fingerprint: key.fingerprint(),
        })
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);
        let sealed = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|_| CryptoError::Encryption)?;
        Ok(format!("{}:{}", hex::encode(nonce), hex::encode(sealed)))
    }

    pub fn decrypt(&self, stored: &str) -> Result<String, CryptoError> {
        let (nonce_hex, sealed_hex) = stored
            .split_once(':')
            .ok_or(CryptoError::Malformed("missing nonce separator"))?;
        let nonce = hex::decode(nonce_hex).map_err(|_| CryptoError::Malformed("nonce is not hex"))?;
        if nonce.len() != NONCE_LEN {
            return Err(CryptoError::Malformed("nonce has the wrong length"));
        }
        let sealed =
            hex::decode(sealed_hex).map_err(|_| CryptoError::Malformed("ciphertext is not hex"))?;
        let opened = self
            .cipher
            .decrypt(Nonce::from_slice(&nonce), sealed.as_slice())
            .map_err(|_| CryptoError::Authentication)?;
        String::from_utf8(opened).map_err(|_| CryptoError::Malformed("plaintext is not utf-8"))
    }
}

impl fmt::Debug for SettingsCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsCipher")
            .field("fingerprint", &&self.fingerprint[..16])
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher() -> SettingsCipher {
        SettingsCipher::new(&KeyMaterial::generate()).unwrap()
    }

    #[test]
    fn random_key_round_trips_through_hex() {
        let key = KeyMaterial::generate();
        let parsed = KeyMaterial::from_hex(&key.to_hex()).unwrap();
        assert_eq!(parsed.fingerprint(), key.fingerprint());
        assert_eq!(key.fingerprint().len(), 64);
        assert!(KeyMaterial::from_hex("abcd").is_err());
        assert!(KeyMaterial::from_hex("zz").is_err());
    }

    #[test]
    fn decrypt_inverts_encrypt_with_fresh_nonces() {
        let cipher = cipher();
        let first = cipher.encrypt("sk_live_123").unwrap();
        let second = cipher.encrypt("sk_live_123").unwrap();
        assert_ne!(first, second);
        assert_eq!(cipher.decrypt(&first).unwrap(), "sk_live_123");
        assert_eq!(cipher.decrypt(&second).unwrap(), "sk_live_123");
        assert_eq!(cipher.decrypt(&cipher.encrypt("").unwrap()).unwrap(), "");
    }

    #[test]
    fn stored_form_is_nonce_and_ciphertext_hex() {
        let stored = cipher().encrypt("hello").unwrap();
        let (nonce, sealed) = stored.split_once(':').unwrap();
        assert_eq!(nonce.len(), NONCE_LEN * 2);
        assert!(hex::decode(sealed).is_ok());
    }

    #[test]
    fn malformed_and_tampered_values_are_typed_errors() {
        let cipher = cipher();
        assert_eq!(
            cipher.decrypt("no-separator"),
            Err(CryptoError::Malformed("missing nonce separator"))
        );
        assert!(matches!(cipher.decrypt("zz:00"), Err(CryptoError::Malformed(_))));
        assert!(matches!(cipher.decrypt("00:00"), Err(CryptoError::Malformed(_))));

        let stored = cipher.encrypt("secret").unwrap();
        let mut tampered = stored.clone();
        let last = tampered.pop().unwrap();
        tampered.push(if last == '0' { '1' } else { '0' });
        assert_eq!(cipher.decrypt(&tampered), Err(CryptoError::Authentication));

        let other = self::cipher();
        assert_eq!(other.decrypt(&stored), Err(CryptoError::Authentication));
    }

    #[test]
    fn debug_output_hides_key_bytes() {
        let key = KeyMaterial::generate();
        let rendered = format!("{key:?}");
        assert!(!rendered.contains(&key.to_hex()));
    }
}
