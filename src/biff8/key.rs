//! `Biff8EncryptionKey` (C3): derives and verifies the per-document RC4 key
//! for the legacy (non-CryptoAPI) BIFF8 encryption scheme, and mints a fresh
//! [`crate::rc4::Rc4`] for any 1024-byte block index.
//!
//! The derivation follows the documented legacy scheme (password hashed
//! with the document id, re-hashed 16 times, truncated to a 40-bit base
//! secret; each block's RC4 key is `MD5(baseSecret || blockIndexLE)`),
//! the same construction implemented by `Biff8EncryptionKey` in other
//! widely deployed BIFF8 readers.

use crate::rc4::Rc4;

#[derive(Clone)]
pub struct Biff8EncryptionKey {
    /// The 5-byte (40-bit) base secret shared by every block's RC4 key.
    base_secret: [u8; 5],
}

impl Biff8EncryptionKey {
    /// Password defaulted by the caller to [`crate::constants::DEFAULT_XOR_PASSWORD`]
    /// ("VelvetSweatshop") for the common "protected but openable" case.
    pub fn derive(password: &str, doc_id: &[u8; 16]) -> Self {
        let password_utf16le = utf16le_truncated(password, 16);
        let h0 = md5::compute(&password_utf16le);

        let mut intermediate = Vec::with_capacity(16 * 21);
        for _ in 0..16 {
            intermediate.extend_from_slice(&h0[0..5]);
            intermediate.extend_from_slice(doc_id);
        }
        let final_hash = md5::compute(&intermediate);

        let mut base_secret = [0u8; 5];
        base_secret.copy_from_slice(&final_hash[0..5]);
        Biff8EncryptionKey { base_secret }
    }

    /// Mints the RC4 instance for `block_index`'s 1024-byte window: the
    /// key material is the full 16-byte `MD5(baseSecret || blockIndexLE)`
    /// digest (not further truncated).
    pub fn create_rc4(&self, block_index: u32) -> Rc4 {
        let mut buf = Vec::with_capacity(5 + 4);
        buf.extend_from_slice(&self.base_secret);
        buf.extend_from_slice(&block_index.to_le_bytes());
        let digest = md5::compute(&buf);
        Rc4::new(&digest.0)
    }

    /// Verifies the derived key against the document's `SaltData`/`SaltHash`
    /// pair: block 0's keystream decrypts `SaltData` to the plaintext salt,
    /// and decrypts `SaltHash` to `MD5(salt)` if (and only if) the password
    /// was correct.
    pub fn verify(&self, salt_data: &[u8; 16], salt_hash: &[u8; 16]) -> bool {
        let mut rc4 = self.create_rc4(0);
        let mut salt = *salt_data;
        rc4.encrypt(&mut salt);
        let mut hash = *salt_hash;
        rc4.encrypt(&mut hash);
        md5::compute(salt).0 == hash
    }
}

/// Encodes `password` as UTF-16LE, truncated to `max_chars` UTF-16 code
/// units (the documented limit for this scheme).
fn utf16le_truncated(password: &str, max_chars: usize) -> Vec<u8> {
    password
        .encode_utf16()
        .take(max_chars)
        .flat_map(|unit| unit.to_le_bytes())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_password_derives_a_stable_key() {
        let doc_id = [0x11u8; 16];
        let key_a = Biff8EncryptionKey::derive("VelvetSweatshop", &doc_id);
        let key_b = Biff8EncryptionKey::derive("VelvetSweatshop", &doc_id);
        assert_eq!(key_a.base_secret, key_b.base_secret);
    }

    #[test]
    fn different_passwords_derive_different_keys() {
        let doc_id = [0x22u8; 16];
        let key_a = Biff8EncryptionKey::derive("VelvetSweatshop", &doc_id);
        let key_b = Biff8EncryptionKey::derive("hunter2", &doc_id);
        assert_ne!(key_a.base_secret, key_b.base_secret);
    }

    #[test]
    fn verify_round_trips_through_the_same_key() {
        let doc_id = [0x33u8; 16];
        let key = Biff8EncryptionKey::derive("VelvetSweatshop", &doc_id);

        let salt = [0x44u8; 16];
        let mut rc4 = key.create_rc4(0);
        let mut salt_data = salt;
        rc4.encrypt(&mut salt_data);
        let mut salt_hash = md5::compute(salt).0;
        rc4.encrypt(&mut salt_hash);

        assert!(key.verify(&salt_data, &salt_hash));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let doc_id = [0x55u8; 16];
        let key = Biff8EncryptionKey::derive("VelvetSweatshop", &doc_id);
        let wrong_key = Biff8EncryptionKey::derive("not the password", &doc_id);

        let salt = [0x66u8; 16];
        let mut rc4 = key.create_rc4(0);
        let mut salt_data = salt;
        rc4.encrypt(&mut salt_data);
        let mut salt_hash = md5::compute(salt).0;
        rc4.encrypt(&mut salt_hash);

        assert!(!wrong_key.verify(&salt_data, &salt_hash));
    }
}
