//! `Package` record decoder: the payload carried inside `\1Ole10Native`
//! when `CompObjStream::ansi_user_type == "OLE Package"`.

use crate::byteorder::ByteReader;
use crate::error::Error;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageFormat {
    Link,
    File,
}

#[derive(Debug, Clone)]
pub struct Package {
    pub file_name: String,
    pub file_path: String,
    pub format: PackageFormat,
    pub temporary_path: String,
    pub data: Option<Vec<u8>>,
}

impl Package {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut r = ByteReader::new(data);
        r.skip(4)?; // total payload length, already known to the caller
        let signature = r.read_u16()?;
        if signature != 0x0002 {
            return Err(Error::CorruptFile(format!(
                "expected Package signature 0x0002, found {:#06x}",
                signature
            )));
        }

        skip_optional_nul_padding(&mut r)?;
        let mut file_name = r.read_null_terminated_ansi()?;
        let mut file_path = r.read_null_terminated_ansi()?;
        r.skip(2)?; // unused
        let raw_format = r.read_u16()?;
        let format = match raw_format {
            0x0001 => PackageFormat::Link,
            0x0003 => PackageFormat::File,
            other => {
                return Err(Error::CorruptFile(format!(
                    "unrecognized Package format {:#06x}",
                    other
                )))
            }
        };
        let mut temporary_path = r.read_ansi_4()?;

        let data = if format == PackageFormat::File {
            let data_size = r.read_u32()? as usize;
            Some(r.read_fully(data_size)?.to_vec())
        } else {
            None
        };

        if r.remaining() >= 4 {
            if let Ok(wide) = r.read_utf16_4() {
                file_name = wide;
            }
        }
        if r.remaining() >= 4 {
            if let Ok(wide) = r.read_utf16_4() {
                file_path = wide;
            }
        }
        if r.remaining() >= 4 {
            if let Ok(wide) = r.read_utf16_4() {
                temporary_path = wide;
            }
        }

        Ok(Package {
            file_name,
            file_path,
            format,
            temporary_path,
            data,
        })
    }
}

/// `Package` allows a single stray `0x00` byte between the signature and
/// `FileName`; `ByteReader` has no peek, so this reads the byte and seeks
/// back if it turns out to belong to `FileName` itself.
fn skip_optional_nul_padding(r: &mut ByteReader) -> Result<()> {
    let pos = r.position();
    let b = r.read_u8()?;
    if b != 0 {
        r.seek(pos)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_file_package(name: &str, path: &str, temp: &str, contents: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&2u16.to_le_bytes());
        body.extend_from_slice(name.as_bytes());
        body.push(0);
        body.extend_from_slice(path.as_bytes());
        body.push(0);
        body.extend_from_slice(&0u16.to_le_bytes()); // unused
        body.extend_from_slice(&0x0003u16.to_le_bytes()); // File
        body.extend_from_slice(&(temp.len() as u32).to_le_bytes());
        body.extend_from_slice(temp.as_bytes());
        body.extend_from_slice(&(contents.len() as u32).to_le_bytes());
        body.extend_from_slice(contents);

        let mut buf = (body.len() as u32).to_le_bytes().to_vec();
        buf.extend_from_slice(&body);
        buf
    }

    #[test]
    fn parses_file_format_package() {
        let raw = build_file_package("readme.txt", "C:\\temp\\readme.txt", "C:\\temp", b"hello");
        let parsed = Package::parse(&raw).unwrap();
        assert_eq!(parsed.file_name, "readme.txt");
        assert_eq!(parsed.format, PackageFormat::File);
        assert_eq!(parsed.data.as_deref(), Some(&b"hello"[..]));
    }

    #[test]
    fn rejects_bad_signature() {
        let mut buf = 2u32.to_le_bytes().to_vec();
        buf.extend_from_slice(&0x0009u16.to_le_bytes());
        let err = Package::parse(&buf).unwrap_err();
        assert!(matches!(err, Error::CorruptFile(_)));
    }
}
