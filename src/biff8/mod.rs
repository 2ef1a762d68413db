//! BIFF8 legacy RC4 decryption (C3 + C4).
//!
//! Excel 97-2003 workbooks may be protected with the legacy ("RC4", not
//! "RC4 CryptoAPI"/Agile) encryption scheme. This module recognizes the
//! `FilePass` record, derives the per-document key from it, and exposes a
//! record-aware decrypting cursor over the rest of the `Workbook` stream.

mod key;
mod stream;

pub use key::Biff8EncryptionKey;
pub use stream::Biff8Rc4;

use crate::byteorder::ByteReader;
use crate::constants;
use crate::error::Error;
use crate::Result;

/// The encryption scheme declared by a `FilePass` record's `wEncryptionType`
/// + version fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilePassScheme {
    /// `wEncryptionType == 0`: classic XOR obfuscation.
    XorObfuscation,
    /// `wEncryptionType == 1`, version 1.1: the legacy (40-bit) RC4 scheme
    /// this crate can actually decrypt.
    LegacyRc4,
    /// `wEncryptionType == 1` with a version other than 1.1: RC4 CryptoAPI
    /// or the Agile scheme. Out of scope.
    CryptoApiOrAgile,
}

/// The parsed body of a `FilePass` record (SID `0x002F`).
#[derive(Debug, Clone)]
pub struct FilePass {
    pub scheme: FilePassScheme,
    pub doc_id: Option<[u8; 16]>,
    pub salt_data: Option<[u8; 16]>,
    pub salt_hash: Option<[u8; 16]>,
}

impl FilePass {
    /// Parses the record payload (the bytes after the `(sid, length)`
    /// record header have already been stripped).
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let mut r = ByteReader::new(payload);
        let encryption_type = r.read_u16()?;
        match encryption_type {
            0x0000 => {
                // XOR obfuscation: wKey, wHash follow. We don't implement
                // this scheme; surface it as an unsupported configuration
                // rather than attempting to keep reading.
                Ok(FilePass {
                    scheme: FilePassScheme::XorObfuscation,
                    doc_id: None,
                    salt_data: None,
                    salt_hash: None,
                })
            }
            0x0001 => {
                let major = r.read_u16()?;
                let minor = r.read_u16()?;
                if major == 1 && minor == 1 {
                    let doc_id: [u8; 16] = r.read_fully(16)?.try_into().unwrap();
                    let salt_data: [u8; 16] = r.read_fully(16)?.try_into().unwrap();
                    let salt_hash: [u8; 16] = r.read_fully(16)?.try_into().unwrap();
                    Ok(FilePass {
                        scheme: FilePassScheme::LegacyRc4,
                        doc_id: Some(doc_id),
                        salt_data: Some(salt_data),
                        salt_hash: Some(salt_hash),
                    })
                } else {
                    Ok(FilePass {
                        scheme: FilePassScheme::CryptoApiOrAgile,
                        doc_id: None,
                        salt_data: None,
                        salt_hash: None,
                    })
                }
            }
            other => Err(Error::ExcelConfiguration(format!(
                "unrecognized FilePass wEncryptionType {:#06x}",
                other
            ))),
        }
    }
}

/// Scans a `Workbook`/`WorkBook` stream's BIFF record framing for a
/// `FilePass` record, returning its parsed body if present. Does not
/// require the first record to be BOF (unlike the visibility mutator,
/// which is stricter because it must also locate and mutate `WINDOW1`).
pub fn find_file_pass(workbook_stream: &[u8]) -> Option<FilePass> {
    let mut offset = 0usize;
    while offset + 4 <= workbook_stream.len() {
        let sid = u16::from_le_bytes([workbook_stream[offset], workbook_stream[offset + 1]]);
        let len = u16::from_le_bytes([workbook_stream[offset + 2], workbook_stream[offset + 3]])
            as usize;
        let body_start = offset + 4;
        let body_end = body_start + len;
        if body_end > workbook_stream.len() {
            break;
        }
        if sid == constants::BIFF_FILEPASS {
            return FilePass::parse(&workbook_stream[body_start..body_end]).ok();
        }
        offset = body_end;
    }
    None
}

/// Decrypts a whole BIFF8 `Workbook` stream given a password, implementing
/// the external interface `decryptBiff8Stream`.
///
/// Walks the stream's record framing twice: discovery of `FilePass` is
/// folded into the same pass that drives the `Biff8Rc4` record-aware
/// decryption, since `StartRecord` must see every SID in order including
/// `FilePass` itself (a never-encrypted record).
pub fn decrypt_biff8_stream(stream: &[u8], password: &str) -> Result<Vec<u8>> {
    let file_pass = find_file_pass(stream).ok_or_else(|| {
        Error::GenericError("stream has no FilePass record; it is not encrypted")
    })?;

    match file_pass.scheme {
        FilePassScheme::XorObfuscation => {
            return Err(Error::ExcelConfiguration(
                "XOR obfuscation encryption is not supported".to_string(),
            ))
        }
        FilePassScheme::CryptoApiOrAgile => {
            return Err(Error::ExcelConfiguration(
                "RC4 CryptoAPI / Agile encryption is not supported".to_string(),
            ))
        }
        FilePassScheme::LegacyRc4 => {}
    }

    let doc_id = file_pass.doc_id.unwrap();
    let salt_data = file_pass.salt_data.unwrap();
    let salt_hash = file_pass.salt_hash.unwrap();

    let key = Biff8EncryptionKey::derive(password, &doc_id);
    if !key.verify(&salt_data, &salt_hash) {
        return Err(Error::PasswordProtected(format!(
            "password did not verify against the document's SaltHash"
        )));
    }

    let mut out = stream.to_vec();
    let mut cursor = Biff8Rc4::new(0, key);
    let mut offset = 0usize;
    while offset + 4 <= out.len() {
        let sid = u16::from_le_bytes([out[offset], out[offset + 1]]);
        let len = u16::from_le_bytes([out[offset + 2], out[offset + 3]]) as usize;
        let body_start = offset + 4;
        let body_end = body_start + len;
        if body_end > out.len() {
            break;
        }
        cursor.start_record(sid);
        // The 2-byte SID and 2-byte length fields both still advance the
        // keystream, even though the framer reads them directly from the
        // plaintext buffer above rather than through this cursor.
        cursor.skip_two_bytes();
        cursor.skip_two_bytes();
        cursor.xor(&mut out[body_start..body_end]);
        offset = body_end;
    }
    Ok(out)
}
