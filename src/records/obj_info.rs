//! `\3ObjInfo` stream decoder: a pair of bit fields plus a clipboard format.

use crate::byteorder::ByteReader;
use crate::Result;

#[derive(Debug, Clone, Copy, Default)]
pub struct ObjInfoStream {
    pub f_def_handler: bool,
    pub f_link: bool,
    pub f_icon: bool,
    pub f_is_ole1: bool,
    pub f_manual: bool,
    pub f_recompose_on_resize: bool,
    pub f_ocx: bool,
    pub f_stream: bool,
    pub f_view_object: bool,
    pub cf: u16,
    pub f_emf: bool,
    pub f_queried_emf: bool,
    pub f_stored_as_emf: bool,
}

fn bit(value: u16, n: u32) -> bool {
    value & (1 << (n - 1)) != 0
}

impl ObjInfoStream {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut r = ByteReader::new(data);
        let flags = r.read_u16()?;
        let cf = r.read_u16()?;

        let mut parsed = ObjInfoStream {
            f_def_handler: bit(flags, 1),
            f_link: bit(flags, 4),
            f_icon: bit(flags, 6),
            f_is_ole1: bit(flags, 7),
            f_manual: bit(flags, 8),
            f_recompose_on_resize: bit(flags, 9),
            f_ocx: bit(flags, 12),
            f_stream: bit(flags, 13),
            f_view_object: bit(flags, 15),
            cf,
            f_emf: false,
            f_queried_emf: false,
            f_stored_as_emf: false,
        };

        if r.remaining() >= 2 {
            let emf_flags = r.read_u16()?;
            parsed.f_emf = bit(emf_flags, 1);
            parsed.f_queried_emf = bit(emf_flags, 2);
            parsed.f_stored_as_emf = bit(emf_flags, 3);
        }

        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_flag_bits_and_clipboard_format() {
        let flags: u16 = (1 << 0) | (1 << 3) | (1 << 14); // fDefHandler, fLink, fViewObject
        let mut buf = flags.to_le_bytes().to_vec();
        buf.extend_from_slice(&3u16.to_le_bytes());
        let parsed = ObjInfoStream::parse(&buf).unwrap();
        assert!(parsed.f_def_handler);
        assert!(parsed.f_link);
        assert!(parsed.f_view_object);
        assert!(!parsed.f_icon);
        assert_eq!(parsed.cf, 3);
        assert!(!parsed.f_emf);
    }

    #[test]
    fn reads_trailing_emf_bitfield_when_present() {
        let mut buf = 0u16.to_le_bytes().to_vec();
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&0b011u16.to_le_bytes());
        let parsed = ObjInfoStream::parse(&buf).unwrap();
        assert!(parsed.f_emf);
        assert!(parsed.f_queried_emf);
        assert!(!parsed.f_stored_as_emf);
    }
}
