//! `\1CompObj` stream decoder.

use crate::byteorder::ByteReader;
use crate::Result;

/// A registered clipboard format id, or a named format string — the two
/// shapes `markerOrLength` can resolve to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatInfo {
    None,
    Clipboard(u32),
    Named(String),
}

#[derive(Debug, Clone)]
pub struct CompObjStream {
    pub ansi_user_type: String,
    pub format: FormatInfo,
    pub reserved1: Option<String>,
}

impl CompObjStream {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut r = ByteReader::new(data);
        r.skip(28)?;
        let ansi_user_type = r.read_ansi_4()?;
        let mut format = read_marker_or_format(&mut r)?;

        let reserved1_len = r.read_u32()? as usize;
        let reserved1_bytes = r.read_fully(reserved1_len)?;
        let reserved1 = if reserved1_len <= 0x28 {
            Some(crate::byteorder::latin1_to_string(reserved1_bytes))
        } else {
            None
        };

        if r.remaining() >= 4 {
            let unicode_marker = r.read_u32()?;
            if unicode_marker == 0x71B2_39F4 {
                // the unicode arm overrides whatever the ANSI arm produced
                format = read_marker_or_format(&mut r)?;
            }
        }

        Ok(CompObjStream {
            ansi_user_type,
            format,
            reserved1,
        })
    }
}

fn read_marker_or_format(r: &mut ByteReader) -> Result<FormatInfo> {
    let marker_or_length = r.read_u32()?;
    match marker_or_length {
        0x0000_0000 => Ok(FormatInfo::None),
        0xFFFF_FFFF | 0xFFFF_FFFE => Ok(FormatInfo::Clipboard(r.read_u32()?)),
        _ => {
            r.seek(r.position() - 4)?;
            Ok(FormatInfo::Named(r.read_ansi_4()?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_stream(user_type: &str, marker: u32, marker_payload: &[u8]) -> Vec<u8> {
        let mut buf = vec![0u8; 28];
        buf.extend_from_slice(&(user_type.len() as u32).to_le_bytes());
        buf.extend_from_slice(user_type.as_bytes());
        buf.extend_from_slice(&marker.to_le_bytes());
        buf.extend_from_slice(marker_payload);
        buf.extend_from_slice(&0u32.to_le_bytes()); // empty Reserved1
        buf
    }

    #[test]
    fn no_format_info_marker() {
        let data = build_stream("Example", 0, &[]);
        let parsed = CompObjStream::parse(&data).unwrap();
        assert_eq!(parsed.ansi_user_type, "Example");
        assert_eq!(parsed.format, FormatInfo::None);
    }

    #[test]
    fn clipboard_format_marker() {
        let data = build_stream("Example", 0xFFFF_FFFF, &42u32.to_le_bytes());
        let parsed = CompObjStream::parse(&data).unwrap();
        assert_eq!(parsed.format, FormatInfo::Clipboard(42));
    }

    #[test]
    fn string_format_marker_rewinds_and_reads_length_prefixed_ansi() {
        let name = "MyCustomFormat";
        let mut payload = (name.len() as u32).to_le_bytes().to_vec();
        payload.extend_from_slice(name.as_bytes());
        // marker field itself holds the string's length (non-sentinel), so
        // `read_marker_or_format` rewinds 4 bytes and re-reads it as the
        // length prefix of a `read_ansi_4` call.
        let data = build_stream("Example", name.len() as u32, name.as_bytes());
        let parsed = CompObjStream::parse(&data).unwrap();
        assert_eq!(parsed.format, FormatInfo::Named(name.to_string()));
        let _ = payload; // illustrates the equivalent hand-built encoding above
    }
}
