//! `\1Ole` stream decoder: embedded-vs-linked object metadata, plus the
//! moniker sub-record linked objects carry.

use crate::byteorder::ByteReader;
use crate::error::Error;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OleLinkKind {
    Embedded,
    Linked,
}

#[derive(Debug, Clone)]
pub struct MonikerStream {
    pub class_id: [u8; 16],
    pub data: Vec<u8>,
}

impl MonikerStream {
    pub fn parse(r: &mut ByteReader, size: usize) -> Result<Self> {
        if size < 16 {
            return Err(Error::CorruptFile(format!(
                "moniker stream size {} is smaller than its 16-byte CLSID",
                size
            )));
        }
        let class_id: [u8; 16] = r.read_fully(16)?.try_into().unwrap();
        let data = r.read_fully(size - 16)?.to_vec();
        Ok(MonikerStream { class_id, data })
    }
}

#[derive(Debug, Clone)]
pub struct LinkedObjectInfo {
    pub relative_source_moniker: Option<MonikerStream>,
    pub absolute_source_moniker: Option<MonikerStream>,
    pub class_id: [u8; 16],
    pub local_update_time: u32,
    pub local_check_time: u32,
    pub remote_update_time: u32,
}

#[derive(Debug, Clone)]
pub struct OleStream {
    pub version: u16,
    pub kind: OleLinkKind,
    pub link_update_options: u32,
    pub link: Option<LinkedObjectInfo>,
}

impl OleStream {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut r = ByteReader::new(data);
        let version = r.read_u16()?;
        let flags = r.read_u32()?;
        let kind = match flags {
            0x0000 | 0x1000 => OleLinkKind::Embedded,
            0x0001 | 0x1001 => OleLinkKind::Linked,
            other => {
                return Err(Error::CorruptFile(format!(
                    "unrecognized OLE stream flags {:#010x}",
                    other
                )))
            }
        };
        let link_update_options = r.read_u32()?;
        let reserved = r.read_u32()?;
        if reserved != 0 {
            return Err(Error::CorruptFile(
                "OLE stream reserved field was non-zero".to_string(),
            ));
        }
        let reserved_moniker_size = r.read_u32()? as usize;
        r.skip(reserved_moniker_size)?;

        let link = match kind {
            OleLinkKind::Embedded => None,
            OleLinkKind::Linked => {
                let relative_size = r.read_u32()? as usize;
                let relative_source_moniker = if relative_size > 0 {
                    Some(MonikerStream::parse(&mut r, relative_size)?)
                } else {
                    None
                };
                let absolute_size = r.read_u32()? as usize;
                let absolute_source_moniker = if absolute_size > 0 {
                    Some(MonikerStream::parse(&mut r, absolute_size)?)
                } else {
                    None
                };
                let clsid_indicator = r.read_i32()?;
                if clsid_indicator != -1 {
                    return Err(Error::CorruptFile(format!(
                        "expected clsidIndicator == -1, found {}",
                        clsid_indicator
                    )));
                }
                let class_id: [u8; 16] = r.read_fully(16)?.try_into().unwrap();
                let reserved_display_name_size = r.read_u32()? as usize;
                r.skip(reserved_display_name_size)?;
                r.skip(4)?; // reserved int
                let local_update_time = r.read_u32()?;
                let local_check_time = r.read_u32()?;
                let remote_update_time = r.read_u32()?;
                Some(LinkedObjectInfo {
                    relative_source_moniker,
                    absolute_source_moniker,
                    class_id,
                    local_update_time,
                    local_check_time,
                    remote_update_time,
                })
            }
        };

        Ok(OleStream {
            version,
            kind,
            link_update_options,
            link,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedded_stream() -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&2u16.to_le_bytes()); // version
        buf.extend_from_slice(&0x1000u32.to_le_bytes()); // embedded
        buf.extend_from_slice(&0u32.to_le_bytes()); // link update options
        buf.extend_from_slice(&0u32.to_le_bytes()); // reserved
        buf.extend_from_slice(&0u32.to_le_bytes()); // reserved moniker size
        buf
    }

    #[test]
    fn embedded_object_stops_after_the_moniker_skip() {
        let parsed = OleStream::parse(&embedded_stream()).unwrap();
        assert_eq!(parsed.kind, OleLinkKind::Embedded);
        assert!(parsed.link.is_none());
    }

    #[test]
    fn rejects_non_zero_reserved_field() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&2u16.to_le_bytes());
        buf.extend_from_slice(&0x1000u32.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&1u32.to_le_bytes()); // reserved, must be 0
        let err = OleStream::parse(&buf).unwrap_err();
        assert!(matches!(err, Error::CorruptFile(_)));
    }
}
