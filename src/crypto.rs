//! Payload cipher codec.
//!
//! Configuration payloads are delivered as hex text, encrypted with
//! AES-256-CBC (PKCS#7 padding) under the caller's shared secret. Two wire
//! layouts exist:
//!
//! ```text
//! explicit IV:  hex(iv, 16 bytes) "$" hex(ciphertext)
//! legacy:       hex(ciphertext)
//! ```
//!
//! The layout is chosen by the 33rd character: `$` means explicit IV.
//!
//! The raw secret bytes are used directly as the AES key. There is no key
//! derivation step, so explicit-IV payloads require a 32-byte secret.
//!
//! Legacy payloads derive both key and IV from the secret with OpenSSL's
//! `EVP_BytesToKey` (MD5, one round, no salt), so every legacy payload under
//! one secret shares an IV. New payloads use the explicit-IV layout.
//!
//! Every failure maps to [`SconfigError::DecryptionFailure`] with no further
//! detail. Callers treat it as a data-integrity signal.

use aes::Aes256;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use md5::{Digest, Md5};
use ring::rand::{SecureRandom, SystemRandom};
use zeroize::Zeroize;

use crate::error::SconfigError;
use crate::keys::{Secret, SECRET_LEN};

type Aes256CbcDec = cbc::Decryptor<Aes256>;
type Aes256CbcEnc = cbc::Encryptor<Aes256>;

/// Size of the CBC initialisation vector in bytes.
pub const IV_LEN: usize = 16;

/// Separator between the hex IV and the hex ciphertext.
pub const IV_DELIMITER: char = '$';

/// Number of hex characters that encode the IV.
const IV_HEX_LEN: usize = IV_LEN * 2;

/// Decrypt a payload blob, picking the layout from the blob itself.
///
/// Returns the UTF-8 plaintext. Fails on an empty blob or secret, on any
/// malformed hex, on a key or IV of the wrong length, on a padding mismatch
/// (the usual symptom of a wrong secret) and on non-UTF-8 plaintext.
pub fn decrypt(blob: &str, secret: &Secret) -> Result<String, SconfigError> {
    if blob.is_empty() || secret.is_empty() {
        return Err(SconfigError::DecryptionFailure);
    }

    match split_explicit_iv(blob) {
        Some((iv_hex, body)) => {
            let iv = hex::decode(iv_hex).map_err(|_| SconfigError::DecryptionFailure)?;
            decrypt_with(secret.as_bytes(), &iv, body)
        }
        None => decrypt_legacy(blob, secret),
    }
}

/// Decrypt a legacy (implicit IV) payload.
///
/// Compatibility path for payloads issued before the explicit-IV layout.
/// Any secret length is accepted since key and IV are derived from it.
pub fn decrypt_legacy(blob: &str, secret: &Secret) -> Result<String, SconfigError> {
    if blob.is_empty() || secret.is_empty() {
        return Err(SconfigError::DecryptionFailure);
    }
    let (mut key, iv) = legacy_key_iv(secret.as_bytes());
    let result = decrypt_with(&key, &iv, blob);
    key.zeroize();
    result
}

/// Encrypt a plaintext in the explicit-IV layout with a fresh random IV.
///
/// The secret must be exactly 32 bytes.
pub fn encrypt(plaintext: &str, secret: &Secret) -> Result<String, SconfigError> {
    let iv = generate_iv()?;
    encrypt_with_iv(plaintext, secret, &iv)
}

/// Encrypt a plaintext in the explicit-IV layout with the given IV.
pub fn encrypt_with_iv(
    plaintext: &str,
    secret: &Secret,
    iv: &[u8; IV_LEN],
) -> Result<String, SconfigError> {
    if secret.len() != SECRET_LEN {
        return Err(SconfigError::InvalidSecretLength);
    }
    let ciphertext = encrypt_with(secret.as_bytes(), iv, plaintext.as_bytes())?;
    Ok(format!(
        "{}{}{}",
        hex::encode(iv),
        IV_DELIMITER,
        hex::encode(ciphertext)
    ))
}

/// Encrypt a plaintext in the legacy layout.
///
/// Only for compatibility testing: new payloads should use [`encrypt`].
pub fn encrypt_legacy(plaintext: &str, secret: &Secret) -> Result<String, SconfigError> {
    if secret.is_empty() {
        return Err(SconfigError::InvalidSecretLength);
    }
    let (mut key, iv) = legacy_key_iv(secret.as_bytes());
    let result = encrypt_with(&key, &iv, plaintext.as_bytes()).map(hex::encode);
    key.zeroize();
    result
}

/// Split `iv$body` when the 33rd character is the delimiter.
fn split_explicit_iv(blob: &str) -> Option<(&str, &str)> {
    // The delimiter is ASCII, so both slice bounds fall on char boundaries.
    if blob.as_bytes().get(IV_HEX_LEN) == Some(&(IV_DELIMITER as u8)) {
        Some((&blob[..IV_HEX_LEN], &blob[IV_HEX_LEN + 1..]))
    } else {
        None
    }
}

fn decrypt_with(key: &[u8], iv: &[u8], body_hex: &str) -> Result<String, SconfigError> {
    let ciphertext = hex::decode(body_hex).map_err(|_| SconfigError::DecryptionFailure)?;
    let decryptor =
        Aes256CbcDec::new_from_slices(key, iv).map_err(|_| SconfigError::DecryptionFailure)?;
    let plaintext = decryptor
        .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
        .map_err(|_| SconfigError::DecryptionFailure)?;
    String::from_utf8(plaintext).map_err(|_| SconfigError::DecryptionFailure)
}

fn encrypt_with(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, SconfigError> {
    let encryptor =
        Aes256CbcEnc::new_from_slices(key, iv).map_err(|_| SconfigError::InvalidSecretLength)?;
    Ok(encryptor.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
}

/// OpenSSL `EVP_BytesToKey` with MD5, a single round and no salt:
///
/// ```text
/// D_1 = MD5(secret), D_i = MD5(D_{i-1} || secret)
/// key = (D_1 || D_2 || D_3)[..32], iv = next 16 bytes
/// ```
fn legacy_key_iv(secret: &[u8]) -> ([u8; SECRET_LEN], [u8; IV_LEN]) {
    let mut material = Vec::with_capacity(SECRET_LEN + IV_LEN);
    let mut block: Vec<u8> = Vec::new();
    while material.len() < SECRET_LEN + IV_LEN {
        let mut hasher = Md5::new();
        hasher.update(&block);
        hasher.update(secret);
        block = hasher.finalize().to_vec();
        material.extend_from_slice(&block);
    }

    let mut key = [0u8; SECRET_LEN];
    let mut iv = [0u8; IV_LEN];
    key.copy_from_slice(&material[..SECRET_LEN]);
    iv.copy_from_slice(&material[SECRET_LEN..SECRET_LEN + IV_LEN]);
    material.zeroize();
    block.zeroize();
    (key, iv)
}

/// Generate a random IV with `ring`'s system RNG.
fn generate_iv() -> Result<[u8; IV_LEN], SconfigError> {
    let rng = SystemRandom::new();
    let mut iv = [0u8; IV_LEN];
    rng.fill(&mut iv).map_err(|_| SconfigError::RandomnessFailure)?;
    Ok(iv)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_explicit_iv_layout() {
        // AES-256-CBC, key = SECRET, iv = 00..0f, plaintext "A=1".
        let secret = Secret::from(SECRET);
        let iv: [u8; IV_LEN] = core::array::from_fn(|i| i as u8);
        let blob = encrypt_with_iv("A=1", &secret, &iv).unwrap();

        assert!(blob.starts_with("000102030405060708090a0b0c0d0e0f$"));
        // One padded block of ciphertext.
        assert_eq!(blob.len(), IV_HEX_LEN + 1 + 32);
        assert_eq!(decrypt(&blob, &secret).unwrap(), "A=1");
    }

    #[test]
    fn test_legacy_key_derivation_matches_openssl() {
        // `openssl enc -aes-256-cbc -k password -nosalt -md md5 -P`
        let (key, iv) = legacy_key_iv(b"password");
        assert_eq!(
            hex::encode(key),
            "5f4dcc3b5aa765d61d8327deb882cf992b95990a9151374abd8ff8c5a7a0fe08"
        );
        assert_eq!(hex::encode(iv), "b7b4372cdfbcb3d16a2631b59b509e94");
    }

    #[test]
    fn test_generated_ivs_are_fresh() {
        let first = generate_iv().unwrap();
        let second = generate_iv().unwrap();
        assert_ne!(first, second);

        let blob = encrypt("A=1", &Secret::from(SECRET)).unwrap();
        assert_eq!(&blob[IV_HEX_LEN..IV_HEX_LEN + 1], "$");
        assert_eq!(decrypt(&blob, &Secret::from(SECRET)).unwrap(), "A=1");
    }

    #[test]
    fn test_delimiter_position_selects_layout() {
        let with_iv = format!("{}${}", "ab".repeat(16), "cd".repeat(16));
        assert!(split_explicit_iv(&with_iv).is_some());

        let shifted = format!("{}${}", "ab".repeat(15), "cd".repeat(16));
        assert!(split_explicit_iv(&shifted).is_none());
    }

    #[test]
    fn test_explicit_iv_rejects_short_secret() {
        let iv = [7u8; IV_LEN];
        let blob = encrypt_with_iv("x", &Secret::from(SECRET), &iv).unwrap();
        assert!(matches!(
            decrypt(&blob, &Secret::from("too-short")),
            Err(SconfigError::DecryptionFailure)
        ));
    }

    #[test]
    fn test_multibyte_input_does_not_panic() {
        let secret = Secret::from(SECRET);
        let blob = "é".repeat(40);
        assert!(decrypt(&blob, &secret).is_err());
    }
}
