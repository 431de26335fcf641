//! Symmetric at-rest protection for stored SMTP passwords.
//!
//! Key material is derived once from two site-wide secrets: the key is the
//! first 32 bytes of the lowercase hex SHA-256 of the auth key, the IV the
//! first 16 bytes of the lowercase hex SHA-256 of the auth salt. Both are
//! installation constants; there is no per-record nonce and no rotation.
//!
//! When the secrets are not configured the codec degrades to plain base64
//! encoding. The two modes produce incompatible ciphertext formats — a value
//! written in one mode does not decode in the other.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use sha2::{Digest, Sha256};
use thiserror::Error;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("ciphertext is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("ciphertext does not decrypt with the configured site secrets")]
    Decrypt,

    #[error("decrypted value is not valid utf-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

enum Mode {
    Aes { key: [u8; 32], iv: [u8; 16] },
    Encoded,
}

/// Encrypt/decrypt helper for stored credentials. Opaque on purpose so key
/// material never shows up in logs or serialized state.
pub struct CredentialCodec {
    mode: Mode,
}

impl CredentialCodec {
    /// Build a codec from the two site secrets. Either secret being empty
    /// selects the encoding-only fallback mode.
    pub fn from_secrets(auth_key: &str, auth_salt: &str) -> Self {
        if auth_key.is_empty() || auth_salt.is_empty() {
            return Self { mode: Mode::Encoded };
        }

        let key_hex = hex::encode(Sha256::digest(auth_key.as_bytes()));
        let iv_hex = hex::encode(Sha256::digest(auth_salt.as_bytes()));

        let mut key = [0u8; 32];
        key.copy_from_slice(&key_hex.as_bytes()[..32]);
        let mut iv = [0u8; 16];
        iv.copy_from_slice(&iv_hex.as_bytes()[..16]);

        Self {
            mode: Mode::Aes { key, iv },
        }
    }

    /// Whether real encryption is in effect (as opposed to the fallback).
    pub fn is_encrypting(&self) -> bool {
        matches!(self.mode, Mode::Aes { .. })
    }

    pub fn encrypt(&self, plaintext: &str) -> String {
        match &self.mode {
            Mode::Aes { key, iv } => {
                let ciphertext = Aes256CbcEnc::new(key.into(), iv.into())
                    .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());
                BASE64.encode(ciphertext)
            }
            Mode::Encoded => BASE64.encode(plaintext),
        }
    }

    pub fn decrypt(&self, ciphertext: &str) -> Result<String, CodecError> {
        let raw = BASE64.decode(ciphertext)?;
        match &self.mode {
            Mode::Aes { key, iv } => {
                let plaintext = Aes256CbcDec::new(key.into(), iv.into())
                    .decrypt_padded_vec_mut::<Pkcs7>(&raw)
                    .map_err(|_| CodecError::Decrypt)?;
                Ok(String::from_utf8(plaintext)?)
            }
            Mode::Encoded => Ok(String::from_utf8(raw)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher_codec() -> CredentialCodec {
        CredentialCodec::from_secrets("site auth key", "site auth salt")
    }

    #[test]
    fn round_trip_with_cipher() {
        let codec = cipher_codec();
        assert!(codec.is_encrypting());
        for input in ["", "hunter2", "pässwörd with ünicode", "a much longer secret value"] {
            let ct = codec.encrypt(input);
            assert_ne!(ct, input);
            assert_eq!(codec.decrypt(&ct).unwrap(), input);
        }
    }

    #[test]
    fn round_trip_with_encoding_fallback() {
        let codec = CredentialCodec::from_secrets("", "");
        assert!(!codec.is_encrypting());
        let ct = codec.encrypt("hunter2");
        assert_eq!(ct, "aHVudGVyMg==");
        assert_eq!(codec.decrypt(&ct).unwrap(), "hunter2");
    }

    #[test]
    fn same_secrets_same_ciphertext() {
        // Fixed key and IV: the scheme is deterministic by design.
        let a = cipher_codec().encrypt("hunter2");
        let b = cipher_codec().encrypt("hunter2");
        assert_eq!(a, b);
    }

    #[test]
    fn modes_are_not_interchangeable() {
        let cipher = cipher_codec();
        let encoded = CredentialCodec::from_secrets("", "");

        let ct = cipher.encrypt("hunter2");
        // Either an outright error or garbage, but never the plaintext.
        match encoded.decrypt(&ct) {
            Ok(out) => assert_ne!(out, "hunter2"),
            Err(_) => {}
        }

        let enc = encoded.encrypt("hunter2");
        assert!(cipher.decrypt(&enc).is_err());
    }

    #[test]
    fn different_secrets_fail_to_decrypt() {
        let ct = cipher_codec().encrypt("hunter2");
        let other = CredentialCodec::from_secrets("other key", "other salt");
        assert!(other.decrypt(&ct).is_err());
    }
}
