use aes_gcm::{
    aead::{rand_core::RngCore, Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use anyhow::{anyhow, Result};
use base64::{engine::general_purpose, Engine as _};

const NONCE_LEN: usize = 12;

fn cipher_from_key(key_base64: &str) -> Result<Aes256Gcm> {
    let key_bytes = general_purpose::STANDARD
        .decode(key_base64)
        .map_err(|e| anyhow!("Invalid base64 encryption key: {}", e))?;

    if key_bytes.len() != 32 {
        return Err(anyhow!(
            "Encryption key must be 32 bytes (256 bits), got {} bytes",
            key_bytes.len()
        ));
    }

    Aes256Gcm::new_from_slice(&key_bytes).map_err(|e| anyhow!("Failed to create cipher: {}", e))
}

/// Encrypt an access token with AES-256-GCM before it hits the database.
/// Output is base64 of nonce || ciphertext.
pub fn encrypt(plaintext: &str, key_base64: &str) -> Result<String> {
    let cipher = cipher_from_key(key_base64)?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    aes_gcm::aead::OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|e| anyhow!("Encryption failed: {}", e))?;

    let mut combined = nonce.to_vec();
    combined.extend_from_slice(&ciphertext);

    Ok(general_purpose::STANDARD.encode(&combined))
}

/// Decrypt a token produced by [`encrypt`].
pub fn decrypt(ciphertext_base64: &str, key_base64: &str) -> Result<String> {
    let cipher = cipher_from_key(key_base64)?;

    let combined = general_purpose::STANDARD
        .decode(ciphertext_base64)
        .map_err(|e| anyhow!("Invalid base64 ciphertext: {}", e))?;

    if combined.len() < NONCE_LEN {
        return Err(anyhow!("Ciphertext too short to contain nonce"));
    }

    let (nonce_bytes, ciphertext) = combined.split_at(NONCE_LEN);
    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|e| anyhow!("Decryption failed: {}", e))?;

    String::from_utf8(plaintext).map_err(|e| anyhow!("Invalid UTF-8 in decrypted text: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key(byte: u8) -> String {
        general_purpose::STANDARD.encode([byte; 32])
    }

    #[test]
    fn test_encrypt_decrypt() {
        let key = test_key(0);
        let token = "EAABsbCS1234|facebook-access-token";

        let encrypted = encrypt(token, &key).unwrap();
        assert_ne!(encrypted, token);
        assert_eq!(decrypt(&encrypted, &key).unwrap(), token);
    }

    #[test]
    fn test_decrypt_with_wrong_key() {
        let encrypted = encrypt("token", &test_key(0)).unwrap();
        assert!(decrypt(&encrypted, &test_key(1)).is_err());
    }

    #[test]
    fn test_invalid_key_length() {
        let short_key = general_purpose::STANDARD.encode([0u8; 16]);
        assert!(encrypt("token", &short_key).is_err());
    }
}
