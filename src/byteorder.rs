//! Little-endian scalar and length-prefixed string readers over an in-memory
//! byte buffer (C1). Every reader fails with [`Error::CorruptFile`] on short
//! read, matching the "never silently truncate" rule the header parser
//! (`header.rs`) already follows for the fixed-layout CFB header.

use crate::error::Error;
use crate::Result;

/// A forward-only cursor over a borrowed byte slice.
///
/// This is the byte-level counterpart to the `Readable` (`AsyncRead`) trait
/// used for the outer compound-file image: once a stream's bytes have been
/// materialized by the sector engine, every record decoder in `records/`
/// walks them with a `ByteReader`.
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        ByteReader { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Moves the cursor to an absolute offset from the start of the buffer.
    pub fn seek(&mut self, offset: usize) -> Result<()> {
        if offset > self.data.len() {
            return Err(Error::CorruptFile(format!(
                "seek past end of buffer: {} > {}",
                offset,
                self.data.len()
            )));
        }
        self.pos = offset;
        Ok(())
    }

    pub fn skip(&mut self, len: usize) -> Result<()> {
        let target = self.pos.checked_add(len).ok_or_else(|| {
            Error::CorruptFile("skip length overflowed cursor position".to_string())
        })?;
        self.seek(target)
    }

    pub fn read_fully(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .ok_or_else(|| Error::CorruptFile("read length overflowed cursor position".to_string()))?;
        if end > self.data.len() {
            return Err(Error::CorruptFile(format!(
                "short read: wanted {} bytes at offset {}, buffer has {}",
                len,
                self.pos,
                self.data.len()
            )));
        }
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_fully(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let b = self.read_fully(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(self.read_u16()? as i16)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let b = self.read_fully(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.read_u32()? as i32)
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        let b = self.read_fully(8)?;
        Ok(i64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        let bits = self.read_i64()? as u64;
        Ok(f64::from_bits(bits))
    }

    /// Null-terminated ANSI string: reads bytes until the first `0x00`,
    /// decodes as Latin-1 (the non-Windows stand-in for the system code
    /// page), and does not consume the terminator's position twice.
    pub fn read_null_terminated_ansi(&mut self) -> Result<String> {
        let start = self.pos;
        let mut end = start;
        while end < self.data.len() && self.data[end] != 0x00 {
            end += 1;
        }
        if end >= self.data.len() {
            return Err(Error::CorruptFile(
                "unterminated ANSI string (no NUL before EOF)".to_string(),
            ));
        }
        let s = latin1_to_string(&self.data[start..end]);
        self.pos = end + 1;
        Ok(s)
    }

    /// 1-byte length-prefixed ANSI string, trimmed of trailing NULs.
    pub fn read_ansi_1(&mut self) -> Result<String> {
        let len = self.read_u8()? as usize;
        let bytes = self.read_fully(len)?;
        Ok(latin1_to_string(bytes).trim_end_matches('\0').to_string())
    }

    /// 4-byte length-prefixed ANSI string.
    pub fn read_ansi_4(&mut self) -> Result<String> {
        let len = self.read_u32()? as usize;
        let bytes = self.read_fully(len)?;
        Ok(latin1_to_string(bytes))
    }

    /// 4-byte length-prefixed UTF-16LE string; the length is in characters.
    pub fn read_utf16_4(&mut self) -> Result<String> {
        let char_count = self.read_u32()? as usize;
        let byte_len = char_count.checked_mul(2).ok_or_else(|| {
            Error::CorruptFile("UTF-16 length-prefix overflowed byte count".to_string())
        })?;
        let bytes = self.read_fully(byte_len)?;
        let units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        Ok(String::from_utf16(&units)?)
    }
}

/// Decodes bytes as Latin-1: every byte maps to the Unicode scalar of the
/// same numeric value, which matches the system default ANSI code page for
/// the ASCII-range filenames and user-type strings actually encountered in
/// these record families.
pub fn latin1_to_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_scalars_little_endian() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
        let mut r = ByteReader::new(&data);
        assert_eq!(r.read_u8().unwrap(), 0x01);
        assert_eq!(r.read_u16().unwrap(), 0x0302);
        assert_eq!(r.read_u32().unwrap(), 0x0807_0605);
    }

    #[test]
    fn short_read_is_corrupt_file() {
        let data = [0x01u8];
        let mut r = ByteReader::new(&data);
        assert!(r.read_u32().is_err());
    }

    #[test]
    fn null_terminated_ansi_stops_at_nul() {
        let data = b"hello\0world";
        let mut r = ByteReader::new(data);
        assert_eq!(r.read_null_terminated_ansi().unwrap(), "hello");
        assert_eq!(r.read_fully(5).unwrap(), b"world");
    }

    #[test]
    fn length_prefixed_ansi_variants() {
        let mut buf = vec![3u8];
        buf.extend_from_slice(b"abc");
        let mut r = ByteReader::new(&buf);
        assert_eq!(r.read_ansi_1().unwrap(), "abc");

        let mut buf4 = 2u32.to_le_bytes().to_vec();
        buf4.extend_from_slice(b"hi");
        let mut r4 = ByteReader::new(&buf4);
        assert_eq!(r4.read_ansi_4().unwrap(), "hi");
    }

    #[test]
    fn utf16_length_prefixed() {
        let mut buf = 2u32.to_le_bytes().to_vec();
        buf.extend_from_slice(&[0x48, 0x00, 0x69, 0x00]); // "Hi"
        let mut r = ByteReader::new(&buf);
        assert_eq!(r.read_utf16_4().unwrap(), "Hi");
    }
}
