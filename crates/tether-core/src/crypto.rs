//! Shared-secret encryption for endpoint traffic.
//!
//! Both ends of a link are configured with the same secret string. The
//! cipher key is derived from it with HKDF-SHA256, and every message is
//! sealed with XChaCha20-Poly1305 under a fresh random nonce.
//!
//! Sealed layout: `nonce (24) || ciphertext || tag (16)`.

use std::fmt;

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use hkdf::Hkdf;
use sha2::Sha256;

use crate::TetherError;

/// HKDF info string for domain separation.
const HKDF_INFO: &[u8] = b"tether-shared-secret-xchacha20poly1305-v1";

/// XChaCha20 extended nonce length.
pub const NONCE_LEN: usize = 24;

/// Poly1305 authentication tag length.
pub const TAG_LEN: usize = 16;

/// Encrypts and decrypts payloads under a key fixed at construction.
///
/// The supervisor owns one per endpoint; endpoint protocol code uses it.
/// Output depends only on the key, the input, and the random nonce.
pub struct Cryptor {
    cipher: XChaCha20Poly1305,
}

impl Cryptor {
    pub fn new(shared_secret: &str) -> Self {
        let key = derive_key(shared_secret.as_bytes());
        Self {
            cipher: XChaCha20Poly1305::new(&key.into()),
        }
    }

    /// Seal `plaintext`, returning `nonce || ciphertext || tag`.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, TetherError> {
        use chacha20poly1305::aead::rand_core::{OsRng, RngCore};

        // Random 24-byte nonce (safe for random generation with XChaCha20)
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = XNonce::from(nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|e| TetherError::Crypto(format!("encryption failed: {e}")))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    /// Open a payload produced by [`Cryptor::encrypt`] under the same secret.
    pub fn decrypt(&self, sealed: &[u8]) -> Result<Vec<u8>, TetherError> {
        if sealed.len() < NONCE_LEN + TAG_LEN {
            return Err(TetherError::Crypto(format!(
                "payload too short: {} bytes (min {})",
                sealed.len(),
                NONCE_LEN + TAG_LEN
            )));
        }

        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
        self.cipher
            .decrypt(XNonce::from_slice(nonce), ciphertext)
            .map_err(|_| TetherError::Crypto("decryption failed: authentication error".into()))
    }

    /// Seal a UTF-8 string.
    pub fn encrypt_str(&self, plaintext: &str) -> Result<Vec<u8>, TetherError> {
        self.encrypt(plaintext.as_bytes())
    }

    /// Open a payload that must contain UTF-8 text.
    pub fn decrypt_str(&self, sealed: &[u8]) -> Result<String, TetherError> {
        let bytes = self.decrypt(sealed)?;
        String::from_utf8(bytes)
            .map_err(|_| TetherError::Crypto("decrypted payload is not valid UTF-8".into()))
    }
}

impl fmt::Debug for Cryptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Cryptor(<redacted>)")
    }
}

/// Derive a 32-byte cipher key from the shared secret using HKDF-SHA256.
fn derive_key(shared_secret: &[u8]) -> [u8; 32] {
    let hkdf = Hkdf::<Sha256>::new(None, shared_secret);
    let mut key = [0u8; 32];
    hkdf.expand(HKDF_INFO, &mut key)
        .expect("HKDF-SHA256 expand to 32 bytes always succeeds");
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let cryptor = Cryptor::new("k");
        let sealed = cryptor.encrypt(b"Hello, tether!").unwrap();
        assert_eq!(cryptor.decrypt(&sealed).unwrap(), b"Hello, tether!");
    }

    #[test]
    fn encrypt_decrypt_empty_payload() {
        let cryptor = Cryptor::new("k");
        let sealed = cryptor.encrypt(b"").unwrap();
        assert_eq!(sealed.len(), NONCE_LEN + TAG_LEN);
        assert_eq!(cryptor.decrypt(&sealed).unwrap(), b"");
    }

    #[test]
    fn same_secret_on_both_ends() {
        let alice = Cryptor::new("shared secret");
        let bob = Cryptor::new("shared secret");
        let sealed = alice.encrypt_str("ping").unwrap();
        assert_eq!(bob.decrypt_str(&sealed).unwrap(), "ping");
    }

    #[test]
    fn wrong_secret_fails() {
        let sealed = Cryptor::new("one").encrypt(b"secret").unwrap();
        assert!(Cryptor::new("two").decrypt(&sealed).is_err());
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let cryptor = Cryptor::new("k");
        let mut sealed = cryptor.encrypt(b"secret").unwrap();
        if let Some(byte) = sealed.last_mut() {
            *byte ^= 0xFF;
        }
        assert!(cryptor.decrypt(&sealed).is_err());
    }

    #[test]
    fn tampered_nonce_fails() {
        let cryptor = Cryptor::new("k");
        let mut sealed = cryptor.encrypt(b"secret").unwrap();
        sealed[0] ^= 0xFF;
        assert!(cryptor.decrypt(&sealed).is_err());
    }

    #[test]
    fn truncated_payload_rejected() {
        let cryptor = Cryptor::new("k");
        let err = cryptor.decrypt(&[0u8; NONCE_LEN + TAG_LEN - 1]).unwrap_err();
        assert!(err.to_string().contains("payload too short"));
    }

    #[test]
    fn different_encryptions_differ() {
        let cryptor = Cryptor::new("k");
        let e1 = cryptor.encrypt(b"same message").unwrap();
        let e2 = cryptor.encrypt(b"same message").unwrap();
        assert_ne!(e1, e2);
    }

    #[test]
    fn key_derivation_is_deterministic() {
        assert_eq!(derive_key(b"k"), derive_key(b"k"));
        assert_ne!(derive_key(b"k"), derive_key(b"K"));
    }

    #[test]
    fn non_utf8_plaintext_rejected_by_decrypt_str() {
        let cryptor = Cryptor::new("k");
        let sealed = cryptor.encrypt(&[0xFF, 0xFE]).unwrap();
        assert!(cryptor.decrypt_str(&sealed).is_err());
    }

    #[test]
    fn debug_redacts_key() {
        assert_eq!(format!("{:?}", Cryptor::new("hunter2")), "Cryptor(<redacted>)");
    }
}
