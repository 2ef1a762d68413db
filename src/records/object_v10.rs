//! OLE 1.0 `ObjectHeader`-family decoders: the top-level Link/File/
//! Presentation records found in the native-format `\1Ole10Native`-style
//! streams some legacy compound files carry directly as `ObjectPool`
//! entries, rather than through the `OLE Package` wrapper.

use crate::byteorder::ByteReader;
use crate::error::Error;
use crate::Result;

const CF_BITMAP: u32 = 2;
const CF_DIB: u32 = 8;
const CF_METAFILEPICT: u32 = 3;
const CF_ENHMETAFILE: u32 = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectV10Format {
    NotSet,
    Link,
    File,
    Presentation,
}

impl ObjectV10Format {
    fn from_u32(value: u32) -> Result<Self> {
        match value {
            0 => Ok(ObjectV10Format::NotSet),
            1 => Ok(ObjectV10Format::Link),
            2 => Ok(ObjectV10Format::File),
            5 => Ok(ObjectV10Format::Presentation),
            other => Err(Error::CorruptFile(format!(
                "unrecognized ObjectHeader format {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ObjectHeader {
    pub class_name: String,
    pub topic_name: String,
    pub item_name: String,
}

fn parse_object_header(r: &mut ByteReader) -> Result<ObjectHeader> {
    let class_name = r.read_ansi_4()?;
    let topic_name = r.read_ansi_4()?;
    let item_name = r.read_ansi_4()?;
    Ok(ObjectHeader {
        class_name,
        topic_name,
        item_name,
    })
}

#[derive(Debug, Clone)]
pub enum ClipboardPayload {
    Standard { format: u32, data: Vec<u8> },
    Registered { format_name: String, data: Vec<u8> },
}

#[derive(Debug, Clone)]
pub struct Presentation {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub payload: ClipboardPayload,
}

fn is_standard_presentation_class(class_name: &str) -> bool {
    matches!(class_name, "METAFILEPICT" | "BITMAP" | "DIB")
}

fn parse_standard_presentation(r: &mut ByteReader, class_name: &str) -> Result<Presentation> {
    let _data_size = r.read_u32()?;
    if class_name == "METAFILEPICT" {
        let _mapping_mode = r.read_u32()?;
        let width = r.read_u32()?;
        let height = r.read_u32()?;
        let remaining = r.remaining();
        let data = r.read_fully(remaining)?.to_vec();
        Ok(Presentation {
            width: Some(width),
            height: Some(height),
            payload: ClipboardPayload::Standard {
                format: CF_METAFILEPICT,
                data,
            },
        })
    } else {
        let remaining = r.remaining();
        let data = r.read_fully(remaining)?.to_vec();
        let format = if class_name == "DIB" { CF_DIB } else { CF_BITMAP };
        Ok(Presentation {
            width: None,
            height: None,
            payload: ClipboardPayload::Standard { format, data },
        })
    }
}

fn parse_generic_presentation(r: &mut ByteReader) -> Result<Presentation> {
    let clipboard_format = r.read_u32()?;
    let payload = match clipboard_format {
        0xFFFF_FFFF | 0xFFFF_FFFE => {
            let format_name = r.read_ansi_4()?;
            let data_size = r.read_u32()? as usize;
            let data = r.read_fully(data_size)?.to_vec();
            ClipboardPayload::Registered { format_name, data }
        }
        CF_BITMAP | CF_DIB | CF_ENHMETAFILE | CF_METAFILEPICT => {
            let data_size = r.read_u32()? as usize;
            let data = r.read_fully(data_size)?.to_vec();
            ClipboardPayload::Standard {
                format: clipboard_format,
                data,
            }
        }
        other => {
            return Err(Error::CorruptFile(format!(
                "unrecognized generic presentation clipboard format {}",
                other
            )))
        }
    };
    Ok(Presentation {
        width: None,
        height: None,
        payload,
    })
}

fn parse_presentation(r: &mut ByteReader, class_name: Option<&str>) -> Result<Presentation> {
    match class_name {
        Some(name) if is_standard_presentation_class(name) => parse_standard_presentation(r, name),
        _ => parse_generic_presentation(r),
    }
}

#[derive(Debug, Clone)]
pub struct LinkedObject {
    pub header: ObjectHeader,
    pub network_name: String,
    pub link_update_options: u32,
    pub presentation: Option<Presentation>,
}

#[derive(Debug, Clone)]
pub struct EmbeddedFile {
    pub header: ObjectHeader,
    pub native_data: Vec<u8>,
    pub presentation: Option<Presentation>,
}

#[derive(Debug, Clone)]
pub enum ObjectV10 {
    Link(LinkedObject),
    File(EmbeddedFile),
    Presentation(Presentation),
}

impl ObjectV10 {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut r = ByteReader::new(data);
        let _version = r.read_u32()?;
        let format = ObjectV10Format::from_u32(r.read_u32()?)?;
        match format {
            ObjectV10Format::Link => {
                let header = parse_object_header(&mut r)?;
                let network_name = r.read_ansi_4()?;
                let _topic_name_again = r.read_ansi_4()?;
                r.skip(4)?;
                let link_update_options = r.read_u32()?;
                let presentation = if r.remaining() > 0 {
                    let presentation_format = ObjectV10Format::from_u32(r.read_u32()?)?;
                    if presentation_format == ObjectV10Format::Presentation {
                        Some(parse_presentation(&mut r, Some(header.class_name.as_str()))?)
                    } else {
                        None
                    }
                } else {
                    None
                };
                Ok(ObjectV10::Link(LinkedObject {
                    header,
                    network_name,
                    link_update_options,
                    presentation,
                }))
            }
            ObjectV10Format::File => {
                let header = parse_object_header(&mut r)?;
                let native_data_size = r.read_u32()? as usize;
                let native_data = r.read_fully(native_data_size)?.to_vec();
                let presentation = if r.remaining() > 0 {
                    let presentation_format = ObjectV10Format::from_u32(r.read_u32()?)?;
                    if presentation_format == ObjectV10Format::Presentation {
                        Some(parse_presentation(&mut r, Some(header.class_name.as_str()))?)
                    } else {
                        None
                    }
                } else {
                    None
                };
                Ok(ObjectV10::File(EmbeddedFile {
                    header,
                    native_data,
                    presentation,
                }))
            }
            ObjectV10Format::Presentation => {
                let class_name = r.read_ansi_4()?;
                Ok(ObjectV10::Presentation(parse_presentation(
                    &mut r,
                    Some(class_name.as_str()),
                )?))
            }
            ObjectV10Format::NotSet => Err(Error::CorruptFile(
                "ObjectHeader format was 0 (not set)".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes(class_name: &str, topic: &str, item: &str) -> Vec<u8> {
        let mut buf = Vec::new();
        for s in [class_name, topic, item] {
            buf.extend_from_slice(&(s.len() as u32).to_le_bytes());
            buf.extend_from_slice(s.as_bytes());
        }
        buf
    }

    #[test]
    fn parses_embedded_file_without_presentation() {
        let mut buf = 0u32.to_le_bytes().to_vec(); // Version
        buf.extend_from_slice(&2u32.to_le_bytes()); // File
        buf.extend_from_slice(&header_bytes("Word.Document.8", "topic", "item"));
        buf.extend_from_slice(&3u32.to_le_bytes());
        buf.extend_from_slice(b"abc");
        let parsed = ObjectV10::parse(&buf).unwrap();
        match parsed {
            ObjectV10::File(f) => {
                assert_eq!(f.native_data, b"abc");
                assert!(f.presentation.is_none());
            }
            _ => panic!("expected File variant"),
        }
    }

    #[test]
    fn generic_presentation_registered_format_reads_name_then_data() {
        let mut buf = 0u32.to_le_bytes().to_vec(); // Version
        buf.extend_from_slice(&5u32.to_le_bytes()); // Presentation
        buf.extend_from_slice(&4u32.to_le_bytes());
        buf.extend_from_slice(b"Quux"); // ClassName, not a standard presentation class
        buf.extend_from_slice(&0xFFFF_FFFFu32.to_le_bytes());
        let name = "MyFormat";
        buf.extend_from_slice(&(name.len() as u32).to_le_bytes());
        buf.extend_from_slice(name.as_bytes());
        buf.extend_from_slice(&2u32.to_le_bytes());
        buf.extend_from_slice(b"hi");
        let parsed = ObjectV10::parse(&buf).unwrap();
        match parsed {
            ObjectV10::Presentation(p) => match p.payload {
                ClipboardPayload::Registered { format_name, data } => {
                    assert_eq!(format_name, "MyFormat");
                    assert_eq!(data, b"hi");
                }
                _ => panic!("expected registered format"),
            },
            _ => panic!("expected Presentation variant"),
        }
    }

    #[test]
    fn top_level_presentation_dispatches_to_standard_by_class_name() {
        let mut buf = 0u32.to_le_bytes().to_vec(); // Version
        buf.extend_from_slice(&5u32.to_le_bytes()); // Presentation
        buf.extend_from_slice(&14u32.to_le_bytes());
        buf.extend_from_slice(b"METAFILEPICT");
        buf.extend_from_slice(&16u32.to_le_bytes()); // data_size
        buf.extend_from_slice(&0u32.to_le_bytes()); // mapping_mode
        buf.extend_from_slice(&100u32.to_le_bytes()); // width
        buf.extend_from_slice(&200u32.to_le_bytes()); // height
        buf.extend_from_slice(b"wmfdata");
        let parsed = ObjectV10::parse(&buf).unwrap();
        match parsed {
            ObjectV10::Presentation(p) => {
                assert_eq!(p.width, Some(100));
                assert_eq!(p.height, Some(200));
                match p.payload {
                    ClipboardPayload::Standard { format, data } => {
                        assert_eq!(format, CF_METAFILEPICT);
                        assert_eq!(data, b"wmfdata");
                    }
                    _ => panic!("expected standard format"),
                }
            }
            _ => panic!("expected Presentation variant"),
        }
    }

    #[test]
    fn rejects_not_set_format() {
        let mut buf = 0u32.to_le_bytes().to_vec(); // Version
        buf.extend_from_slice(&0u32.to_le_bytes()); // Format = NotSet
        let err = ObjectV10::parse(&buf).unwrap_err();
        assert!(matches!(err, Error::CorruptFile(_)));
    }
}
