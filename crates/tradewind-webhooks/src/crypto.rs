//! Cryptographic operations for webhook secrets and payload signing.
//!
//! - High-entropy secret generation for endpoints and API credentials
//! - AES-256-GCM encryption/decryption for endpoint signing secrets at rest
//! - SHA-256 one-way hashing for API credential storage
//! - HMAC-SHA256 payload signatures over `{timestamp_millis}.{body}`

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::WebhookError;

/// Nonce size for AES-GCM (96 bits).
const NONCE_SIZE: usize = 12;

/// Random bytes in a generated secret (hex-encoded to 64 chars).
const SECRET_BYTES: usize = 32;

type HmacSha256 = Hmac<Sha256>;

// ---------------------------------------------------------------------------
// Secret generation & hashing
// ---------------------------------------------------------------------------

/// Generate a 64-hex-char secret from the operating system's CSPRNG.
///
/// Used for endpoint signing secrets and as the random portion of API keys.
#[must_use]
pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Hex-encoded SHA-256 of a plaintext API key.
///
/// The hash is what gets persisted; the plaintext cannot be recovered from it.
#[must_use]
pub fn hash_api_key(plaintext: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(plaintext.as_bytes());
    hex::encode(hasher.finalize())
}

// ---------------------------------------------------------------------------
// AES-256-GCM secret-at-rest
// ---------------------------------------------------------------------------

/// Encrypt an endpoint signing secret for storage.
///
/// Output format: `base64(nonce || ciphertext || auth_tag)` with a fresh
/// random nonce per call.
pub fn encrypt_secret(plaintext: &str, key: &[u8]) -> Result<String, WebhookError> {
    let cipher = cipher_for_key(key)?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|e| WebhookError::EncryptionFailed(e.to_string()))?;

    let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);

    Ok(BASE64.encode(&out))
}

/// Decrypt a stored endpoint signing secret.
///
/// Only the delivery engine (and secret rotation) call this; everything else
/// treats the stored value as opaque.
pub fn decrypt_secret(encoded: &str, key: &[u8]) -> Result<String, WebhookError> {
    let cipher = cipher_for_key(key)?;

    let bytes = BASE64
        .decode(encoded)
        .map_err(|e| WebhookError::EncryptionFailed(format!("Base64 decode failed: {e}")))?;

    if bytes.len() <= NONCE_SIZE {
        return Err(WebhookError::EncryptionFailed(
            "Ciphertext too short".to_string(),
        ));
    }

    let nonce = Nonce::from_slice(&bytes[..NONCE_SIZE]);
    let plaintext = cipher
        .decrypt(nonce, &bytes[NONCE_SIZE..])
        .map_err(|e| WebhookError::EncryptionFailed(e.to_string()))?;

    String::from_utf8(plaintext).map_err(|e| WebhookError::EncryptionFailed(e.to_string()))
}

fn cipher_for_key(key: &[u8]) -> Result<Aes256Gcm, WebhookError> {
    if key.len() != 32 {
        return Err(WebhookError::EncryptionFailed(format!(
            "Invalid key length: expected 32 bytes, got {}",
            key.len()
        )));
    }
    Aes256Gcm::new_from_slice(key).map_err(|e| WebhookError::EncryptionFailed(e.to_string()))
}

// ---------------------------------------------------------------------------
// HMAC-SHA256 payload signing
// ---------------------------------------------------------------------------

/// Compute the hex HMAC-SHA256 signature for an outbound webhook.
///
/// The MAC covers `{timestamp_millis}.{body}` where `body` is exactly the
/// bytes sent as the request body, so a receiver holding the same secret,
/// timestamp header, and body reproduces the signature verbatim.
#[must_use]
pub fn compute_signature(secret: &str, timestamp_millis: i64, body: &[u8]) -> String {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");

    mac.update(timestamp_millis.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);

    hex::encode(mac.finalize().into_bytes())
}

/// Verify a signature in constant time.
#[must_use]
pub fn verify_signature(
    expected_hex: &str,
    secret: &str,
    timestamp_millis: i64,
    body: &[u8],
) -> bool {
    use subtle::ConstantTimeEq;

    let computed = compute_signature(secret, timestamp_millis, body);
    expected_hex
        .as_bytes()
        .ct_eq(computed.as_bytes())
        .into()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> [u8; 32] {
        [0x17u8; 32]
    }

    // --- secret generation & hashing ---

    #[test]
    fn test_generated_secret_is_64_hex_chars() {
        let secret = generate_secret();
        assert_eq!(secret.len(), 64);
        assert!(secret.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generated_secrets_are_unique() {
        assert_ne!(generate_secret(), generate_secret());
    }

    #[test]
    fn test_hash_api_key_is_deterministic() {
        let hash = hash_api_key("tw_live_abc123");
        assert_eq!(hash, hash_api_key("tw_live_abc123"));
        assert_eq!(hash.len(), 64);
    }

    #[test]
    fn test_hash_api_key_differs_per_key() {
        assert_ne!(hash_api_key("key-one"), hash_api_key("key-two"));
    }

    // --- AES-GCM ---

    #[test]
    fn test_encrypt_decrypt_round_trip() {
        let key = test_key();
        let encrypted = encrypt_secret("endpoint-signing-secret", &key).unwrap();
        assert_eq!(
            decrypt_secret(&encrypted, &key).unwrap(),
            "endpoint-signing-secret"
        );
    }

    #[test]
    fn test_fresh_nonce_per_encryption() {
        let key = test_key();
        let a = encrypt_secret("same", &key).unwrap();
        let b = encrypt_secret("same", &key).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_decrypt_rejects_wrong_key() {
        let encrypted = encrypt_secret("secret", &test_key()).unwrap();
        assert!(decrypt_secret(&encrypted, &[0x42u8; 32]).is_err());
    }

    #[test]
    fn test_rejects_short_key() {
        assert!(encrypt_secret("secret", &[0u8; 16]).is_err());
        assert!(decrypt_secret("anything", &[0u8; 16]).is_err());
    }

    #[test]
    fn test_decrypt_rejects_garbage() {
        assert!(decrypt_secret("!!not-base64!!", &test_key()).is_err());
        assert!(decrypt_secret(&BASE64.encode([0u8; 4]), &test_key()).is_err());
    }

    // --- HMAC signatures ---

    #[test]
    fn test_signature_is_reproducible() {
        let sig1 = compute_signature("secret", 1_754_000_000_000, b"{\"order\":1}");
        let sig2 = compute_signature("secret", 1_754_000_000_000, b"{\"order\":1}");
        assert_eq!(sig1, sig2);
        assert_eq!(sig1.len(), 64);
    }

    #[test]
    fn test_signature_binds_all_inputs() {
        let base = compute_signature("secret", 1_754_000_000_000, b"body");
        assert_ne!(base, compute_signature("other", 1_754_000_000_000, b"body"));
        assert_ne!(base, compute_signature("secret", 1_754_000_000_001, b"body"));
        assert_ne!(base, compute_signature("secret", 1_754_000_000_000, b"tail"));
    }

    #[test]
    fn test_verify_signature() {
        let sig = compute_signature("secret", 42, b"payload");
        assert!(verify_signature(&sig, "secret", 42, b"payload"));
        assert!(!verify_signature(&sig, "secret", 43, b"payload"));
        assert!(!verify_signature("deadbeef", "secret", 42, b"payload"));
    }
}
