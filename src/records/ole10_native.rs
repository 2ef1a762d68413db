//! `\1Ole10Native` stream decoder: dispatches on the sibling `\1CompObj`
//! stream's `AnsiUserType` to decide whether the native payload is worth
//! extracting, and if so, under what file name.

use crate::byteorder::ByteReader;
use crate::error::Error;
use crate::records::comp_obj::CompObjStream;
use crate::records::package::{Package, PackageFormat};
use crate::util::windows_basename;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ole10NativeOutcome {
    Extract { file_name: String, data: Vec<u8> },
    Skip,
}

/// Raw `\1Ole10Native` streams that aren't an `OLE Package` are just a
/// 4-byte length prefix followed by the native bytes.
fn read_length_prefixed_blob(data: &[u8]) -> Result<Vec<u8>> {
    let mut r = ByteReader::new(data);
    let len = r.read_u32()? as usize;
    Ok(r.read_fully(len)?.to_vec())
}

pub fn decode(comp_obj: Option<&[u8]>, ole10_native: &[u8]) -> Result<Ole10NativeOutcome> {
    let ansi_user_type = match comp_obj {
        Some(bytes) => Some(CompObjStream::parse(bytes)?.ansi_user_type),
        None => None,
    };

    match ansi_user_type.as_deref() {
        Some("OLE Package") => {
            let package = Package::parse(ole10_native)?;
            match package.format {
                PackageFormat::File => Ok(Ole10NativeOutcome::Extract {
                    file_name: windows_basename(&package.file_name).to_string(),
                    data: package.data.unwrap_or_default(),
                }),
                PackageFormat::Link => Ok(Ole10NativeOutcome::Skip),
            }
        }
        Some("PBrush") | Some("Paintbrush-Bild") | Some("Paintbrush-afbeelding") => {
            Ok(Ole10NativeOutcome::Extract {
                file_name: "Embedded PBrush image.bmp".to_string(),
                data: read_length_prefixed_blob(ole10_native)?,
            })
        }
        Some("Pakket")
        | Some("MathType 5.0 Equation")
        | Some("MS_ClipArt_Gallery")
        | Some("Microsoft ClipArt Gallery")
        | Some("Bitmap Image") => Ok(Ole10NativeOutcome::Skip),
        Some(other) => Err(Error::ObjectTypeNotSupported(other.to_string())),
        None => {
            let package = Package::parse(ole10_native)
                .map_err(|_| Error::ObjectTypeNotSupported("unknown".to_string()))?;
            match package.format {
                PackageFormat::File => Ok(Ole10NativeOutcome::Extract {
                    file_name: windows_basename(&package.file_name).to_string(),
                    data: package.data.unwrap_or_default(),
                }),
                PackageFormat::Link => Ok(Ole10NativeOutcome::Skip),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_comp_obj(user_type: &str) -> Vec<u8> {
        let mut buf = vec![0u8; 28];
        buf.extend_from_slice(&(user_type.len() as u32).to_le_bytes());
        buf.extend_from_slice(user_type.as_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes()); // markerOrLength = None
        buf.extend_from_slice(&0u32.to_le_bytes()); // Reserved1 len
        buf
    }

    #[test]
    fn pbrush_always_extracts_with_fixed_name() {
        let comp_obj = build_comp_obj("PBrush");
        let mut native = 3u32.to_le_bytes().to_vec();
        native.extend_from_slice(b"abc");
        let outcome = decode(Some(&comp_obj), &native).unwrap();
        assert_eq!(
            outcome,
            Ole10NativeOutcome::Extract {
                file_name: "Embedded PBrush image.bmp".to_string(),
                data: b"abc".to_vec(),
            }
        );
    }

    #[test]
    fn unknown_user_type_is_object_type_not_supported() {
        let comp_obj = build_comp_obj("Something Unexpected");
        let err = decode(Some(&comp_obj), &[]).unwrap_err();
        assert!(matches!(err, Error::ObjectTypeNotSupported(_)));
    }

    #[test]
    fn mathtype_is_skipped() {
        let comp_obj = build_comp_obj("MathType 5.0 Equation");
        let outcome = decode(Some(&comp_obj), &[]).unwrap();
        assert_eq!(outcome, Ole10NativeOutcome::Skip);
    }
}
