use crate::errors::{StoreError, StoreResult};
use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, Nonce};
use pbkdf2::pbkdf2_hmac;
use serde::{Deserialize, Serialize};
use sha2::Sha512;

// AES-256-GCM with a 16-byte nonce, matching the on-disk file format.
type EnvelopeCipher = AesGcm<Aes256, U16>;

const SALT_LEN: usize = 64;
const NONCE_LEN: usize = 16;
const TAG_LEN: usize = 16;
const PBKDF2_ROUNDS: u32 = 100_000;

/// The at-rest form of one encrypted record: a JSON object with hex fields.
/// Salt and nonce are fresh per encryption call, never reused across saves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedEnvelope {
    pub salt: String,
    pub iv: String,
    pub tag: String,
    pub content: String,
}

fn derive_key(passphrase: &str, salt: &[u8]) -> [u8; 32] {
    let mut key = [0u8; 32];
    pbkdf2_hmac::<Sha512>(passphrase.as_bytes(), salt, PBKDF2_ROUNDS, &mut key);
    key
}

pub fn encrypt(plaintext: &[u8], passphrase: &str) -> StoreResult<EncryptedEnvelope> {
    let salt: [u8; SALT_LEN] = rand::random();
    let nonce_bytes: [u8; NONCE_LEN] = rand::random();

    let key = derive_key(passphrase, &salt);
    let cipher = EnvelopeCipher::new_from_slice(&key)
        .map_err(|error| StoreError::Filesystem(error.to_string()))?;
    let nonce = Nonce::<U16>::from_slice(&nonce_bytes);
    let mut sealed = cipher
        .encrypt(nonce, plaintext)
        .map_err(|error| StoreError::Authentication(error.to_string()))?;

    // The aead crate appends the tag; the envelope stores it separately.
    let tag = sealed.split_off(sealed.len() - TAG_LEN);
    Ok(EncryptedEnvelope {
        salt: hex::encode(salt),
        iv: hex::encode(nonce_bytes),
        tag: hex::encode(tag),
        content: hex::encode(sealed),
    })
}

/// Fails closed: wrong passphrase and tampered ciphertext are
/// indistinguishable at this layer, and no partial plaintext ever escapes.
pub fn decrypt(envelope: &EncryptedEnvelope, passphrase: &str) -> StoreResult<Vec<u8>> {
    let salt = decode_field(&envelope.salt, "salt")?;
    let nonce_bytes = decode_field(&envelope.iv, "iv")?;
    let tag = decode_field(&envelope.tag, "tag")?;
    let mut sealed = decode_field(&envelope.content, "content")?;

    if nonce_bytes.len() != NONCE_LEN {
        return Err(StoreError::Parse(format!(
            "envelope iv must be {NONCE_LEN} bytes, got {}",
            nonce_bytes.len()
        )));
    }
    if tag.len() != TAG_LEN {
        return Err(StoreError::Parse(format!(
            "envelope tag must be {TAG_LEN} bytes, got {}",
            tag.len()
        )));
    }

    let key = derive_key(passphrase, &salt);
    let cipher = EnvelopeCipher::new_from_slice(&key)
        .map_err(|error| StoreError::Filesystem(error.to_string()))?;
    let nonce = Nonce::<U16>::from_slice(&nonce_bytes);
    sealed.extend_from_slice(&tag);

    cipher.decrypt(nonce, sealed.as_slice()).map_err(|_| {
        StoreError::Authentication("decryption failed: wrong passphrase or corrupted file".to_string())
    })
}

fn decode_field(value: &str, field: &str) -> StoreResult<Vec<u8>> {
    hex::decode(value)
        .map_err(|error| StoreError::Parse(format!("envelope {field} is not valid hex: {error}")))
}

#[cfg(test)]
mod tests {
    use super::{decrypt, encrypt};
    use crate::errors::StoreError;

    #[test]
    fn round_trips_arbitrary_bytes() {
        let plaintext = b"{\"user\":\"alice\"}\xff\x00\x01";
        let envelope = encrypt(plaintext, "secret").expect("encrypt");
        let decrypted = decrypt(&envelope, "secret").expect("decrypt");
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn wrong_passphrase_is_rejected() {
        let envelope = encrypt(b"payload", "secret").expect("encrypt");
        let error = decrypt(&envelope, "not-the-secret").expect_err("must fail");
        assert!(matches!(error, StoreError::Authentication(_)));
    }

    #[test]
    fn tampered_ciphertext_is_rejected() {
        let envelope = encrypt(b"payload", "secret").expect("encrypt");

        let mut content = hex::decode(&envelope.content).expect("hex");
        content[0] ^= 0x01;
        let mut tampered = envelope.clone();
        tampered.content = hex::encode(content);
        assert!(matches!(
            decrypt(&tampered, "secret"),
            Err(StoreError::Authentication(_))
        ));

        let mut tag = hex::decode(&envelope.tag).expect("hex");
        tag[0] ^= 0x01;
        let mut tampered = envelope;
        tampered.tag = hex::encode(tag);
        assert!(matches!(
            decrypt(&tampered, "secret"),
            Err(StoreError::Authentication(_))
        ));
    }

    #[test]
    fn repeated_encryption_is_fresh() {
        let first = encrypt(b"same input", "secret").expect("encrypt");
        let second = encrypt(b"same input", "secret").expect("encrypt");
        assert_ne!(first.salt, second.salt);
        assert_ne!(first.iv, second.iv);
        assert_ne!(first.content, second.content);
    }

    #[test]
    fn malformed_hex_is_a_parse_error() {
        let mut envelope = encrypt(b"payload", "secret").expect("encrypt");
        envelope.iv = "zz".to_string();
        assert!(matches!(
            decrypt(&envelope, "secret"),
            Err(StoreError::Parse(_))
        ));
    }

    #[test]
    fn truncated_iv_is_a_parse_error() {
        let mut envelope = encrypt(b"payload", "secret").expect("encrypt");
        envelope.iv = "aabb".to_string();
        assert!(matches!(
            decrypt(&envelope, "secret"),
            Err(StoreError::Parse(_))
        ));
    }
}
