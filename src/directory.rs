use crate::{constants, error::Error, header::OleHeader, Result};
use chrono::NaiveDateTime;
use derivative::Derivative;
use std::array::TryFromSliceError;
use std::cmp::Ordering;

#[derive(Clone, Derivative, Copy, PartialEq)]
#[derivative(Debug)]
pub enum ObjectType {
    Storage,
    Stream,
    RootStorage,
}

#[derive(Clone, Derivative, Copy)]
#[derivative(Debug)]
pub enum NodeColor {
    Red,
    Black,
}

/**
https://winprotocoldoc.blob.core.windows.net/productionwindowsarchives/MS-CFB/%5bMS-CFB%5d.pdf
The directory entry array is an array of directory entries that are grouped into a directory sector.
Each storage object or stream object within a compound file is represented by a single directory
entry. The space for the directory sectors that are holding the array is allocated from the FAT.
The valid values for a stream ID, which are used in the Child ID, Right Sibling ID, and Left Sibling
ID fields, are 0 through MAXREGSID (0xFFFFFFFA). The special value NOSTREAM (0xFFFFFFFF) is
used as a terminator.
 */
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct DirectoryEntryRaw {
    name: [u8; 64],
    name_len: [u8; 2],
    object_type: [u8; 1],
    color_flag: [u8; 1],
    left_sibling_id: [u8; 4],
    right_sibling_id: [u8; 4],
    child_id: [u8; 4],
    class_id: [u8; 16],
    state_bits: [u8; 4],
    creation_time: [u8; 8],
    modification_time: [u8; 8],
    starting_sector_location: [u8; 4],
    stream_size: [u8; 8],
}

impl DirectoryEntryRaw {
    pub fn parse(unparsed_entry: &[u8]) -> Result<Self> {
        let name: [u8; 64] =
            unparsed_entry[0..64]
                .try_into()
                .map_err(|err: TryFromSliceError| {
                    Error::OleInvalidDirectoryEntry("name", err.to_string())
                })?;
        let name_len: [u8; 2] =
            unparsed_entry[64..66]
                .try_into()
                .map_err(|err: TryFromSliceError| {
                    Error::OleInvalidDirectoryEntry("name_len", err.to_string())
                })?;
        let object_type: [u8; 1] =
            unparsed_entry[66..67]
                .try_into()
                .map_err(|err: TryFromSliceError| {
                    Error::OleInvalidDirectoryEntry("object_type", err.to_string())
                })?;
        let color_flag: [u8; 1] =
            unparsed_entry[67..68]
                .try_into()
                .map_err(|err: TryFromSliceError| {
                    Error::OleInvalidDirectoryEntry("color_flag", err.to_string())
                })?;
        let left_sibling_id: [u8; 4] =
            unparsed_entry[68..72]
                .try_into()
                .map_err(|err: TryFromSliceError| {
                    Error::OleInvalidDirectoryEntry("left_sibling_id", err.to_string())
                })?;
        let right_sibling_id: [u8; 4] =
            unparsed_entry[72..76]
                .try_into()
                .map_err(|err: TryFromSliceError| {
                    Error::OleInvalidDirectoryEntry("right_sibling_id", err.to_string())
                })?;
        let child_id: [u8; 4] =
            unparsed_entry[76..80]
                .try_into()
                .map_err(|err: TryFromSliceError| {
                    Error::OleInvalidDirectoryEntry("child_id", err.to_string())
                })?;
        let class_id: [u8; 16] =
            unparsed_entry[80..96]
                .try_into()
                .map_err(|err: TryFromSliceError| {
                    Error::OleInvalidDirectoryEntry("class_id", err.to_string())
                })?;
        let state_bits: [u8; 4] =
            unparsed_entry[96..100]
                .try_into()
                .map_err(|err: TryFromSliceError| {
                    Error::OleInvalidDirectoryEntry("state_bits", err.to_string())
                })?;
        let creation_time: [u8; 8] =
            unparsed_entry[100..108]
                .try_into()
                .map_err(|err: TryFromSliceError| {
                    Error::OleInvalidDirectoryEntry("creation_time", err.to_string())
                })?;
        let modification_time: [u8; 8] =
            unparsed_entry[108..116]
                .try_into()
                .map_err(|err: TryFromSliceError| {
                    Error::OleInvalidDirectoryEntry("modification_time", err.to_string())
                })?;
        let starting_sector_location: [u8; 4] =
            unparsed_entry[116..120]
                .try_into()
                .map_err(|err: TryFromSliceError| {
                    Error::OleInvalidDirectoryEntry("starting_sector_location", err.to_string())
                })?;
        let stream_size: [u8; 8] =
            unparsed_entry[120..128]
                .try_into()
                .map_err(|err: TryFromSliceError| {
                    Error::OleInvalidDirectoryEntry("stream_size", err.to_string())
                })?;

        Ok(DirectoryEntryRaw {
            name,
            name_len,
            object_type,
            color_flag,
            left_sibling_id,
            right_sibling_id,
            child_id,
            class_id,
            state_bits,
            creation_time,
            modification_time,
            starting_sector_location,
            stream_size,
        })
    }
}

#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct DirectoryEntry {
    pub(crate) index: usize,
    pub(crate) object_type: ObjectType,
    pub(crate) name: String,
    color: NodeColor,
    pub(crate) left_sibling_id: Option<u32>,
    pub(crate) right_sibling_id: Option<u32>,
    pub(crate) child_id: Option<u32>,

    pub(crate) class_id: Option<String>,

    #[derivative(Debug = "ignore")]
    _state_bits: [u8; 4],

    pub(crate) creation_time: Option<NaiveDateTime>,
    pub(crate) modification_time: Option<NaiveDateTime>,
    /// The on-disk FILETIME bytes `creation_time`/`modification_time` were
    /// parsed from, kept verbatim since `epochs::windows_file` has no
    /// inverse — re-serialization writes these back rather than re-deriving
    /// a tick count from the parsed `NaiveDateTime`.
    pub(crate) creation_time_raw: [u8; 8],
    pub(crate) modification_time_raw: [u8; 8],
    pub(crate) starting_sector_location: Option<u32>,
    pub(crate) stream_size: u64,
}

impl DirectoryEntry {
    pub(crate) fn from_raw(
        ole_file_header: &OleHeader,
        raw_directory_entry: DirectoryEntryRaw,
        index: usize,
    ) -> Result<Self> {
        let object_type = match raw_directory_entry.object_type {
            constants::OBJECT_TYPE_UNKNOWN_OR_UNALLOCATED => {
                Err(Error::OleUnknownOrUnallocatedDirectoryEntry)
            }
            constants::OBJECT_TYPE_ROOT_STORAGE => Ok(ObjectType::RootStorage),
            constants::OBJECT_TYPE_STORAGE => Ok(ObjectType::Storage),
            constants::OBJECT_TYPE_STREAM => Ok(ObjectType::Stream),
            anything_else => Err(Error::OleInvalidDirectoryEntry(
                "object_type",
                format!("invalid value: {:x?}", anything_else),
            )),
        }?;

        let name_len = u16::from_le_bytes(raw_directory_entry.name_len);
        if name_len as usize > raw_directory_entry.name.len() {
            return Err(Error::OleInvalidDirectoryEntry(
                "name_len",
                format!("name length {} exceeds the 64-byte name field", name_len),
            ));
        }
        let name_raw = &raw_directory_entry.name[0..(name_len as usize)]
            .chunks(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect::<Vec<_>>();
        let mut name = String::from_utf16(&name_raw[..])?;
        if name.ends_with('\u{0}') {
            let _ = name.pop();
        }
        let color = match raw_directory_entry.color_flag {
            constants::NODE_COLOR_RED => Ok(NodeColor::Red),
            constants::NODE_COLOR_BLACK => Ok(NodeColor::Black),
            anything_else => Err(Error::OleInvalidDirectoryEntry(
                "node_color",
                format!("invalid value: {:x?}", anything_else),
            )),
        }?;

        let left_sibling_id = parse_sid(raw_directory_entry.left_sibling_id, "left_sibling_id")?;
        let right_sibling_id =
            parse_sid(raw_directory_entry.right_sibling_id, "right_sibling_id")?;
        let child_id = parse_sid(raw_directory_entry.child_id, "child_id")?;

        let creation_time = match i64::from_le_bytes(raw_directory_entry.creation_time) {
            0 => None,
            time => epochs::windows_file(time),
        };
        let modification_time = match i64::from_le_bytes(raw_directory_entry.modification_time) {
            0 => None,
            time => epochs::windows_file(time),
        };
        let creation_time_raw = raw_directory_entry.creation_time;
        let modification_time_raw = raw_directory_entry.modification_time;

        // This field contains the first sector location if this is a stream
        // object. For a root storage object, this field MUST contain the first sector of the mini stream, if the
        // mini stream exists. For a storage object, this field MUST be set to all zeroes.
        let starting_sector_location =
            // some real-world files leave garbage here for storage entries; only trust it
            // for stream/root entries, matching widely deployed lenient readers.
            match (object_type, raw_directory_entry.starting_sector_location) {
                (ObjectType::Storage, _assumed_zero) => None,
                (_, location) => Some(u32::from_le_bytes(location)),
            };

        let stream_size = if ole_file_header.major_version == constants::MAJOR_VERSION_3_VALUE {
            // For a version 3 compound file the most significant 32 bits of this
            // field are to be ignored (some writers leave them uninitialized).
            let mut stream_size_modified = raw_directory_entry.stream_size;
            stream_size_modified[4] = 0x00;
            stream_size_modified[5] = 0x00;
            stream_size_modified[6] = 0x00;
            stream_size_modified[7] = 0x00;
            stream_size_modified
        } else {
            raw_directory_entry.stream_size
        };
        let stream_size = u64::from_le_bytes(stream_size);
        if stream_size != 0 && object_type == ObjectType::Storage {
            return Err(Error::OleInvalidDirectoryEntry(
                "stream_size",
                "storage object type has non-zero stream size".to_string(),
            ));
        } else if object_type == ObjectType::RootStorage && stream_size % 64 != 0 {
            return Err(Error::OleInvalidDirectoryEntry(
                "stream_size",
                "root storage object type must have stream size % 64 === 0".to_string(),
            ));
        }

        let class_id = match raw_directory_entry.class_id {
            empty if empty == [0x00; 16] => None,
            bytes => {
                let a = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
                let b = u16::from_le_bytes([bytes[4], bytes[5]]);
                let c = u16::from_le_bytes([bytes[6], bytes[7]]);

                Some(
                    format!(
                        "{:08X}-{:04X}-{:04X}-{:02X}{:02X}-{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}",
                        a,
                        b,
                        c,
                        bytes[8],
                        bytes[9],
                        bytes[10],
                        bytes[11],
                        bytes[12],
                        bytes[13],
                        bytes[14],
                        bytes[15]
                    ),
                )
            }
        };

        Ok(Self {
            index,
            object_type,
            name,
            color,
            left_sibling_id,
            right_sibling_id,
            child_id,
            class_id,
            _state_bits: raw_directory_entry.state_bits,
            creation_time,
            modification_time,
            creation_time_raw,
            modification_time_raw,
            starting_sector_location,
            stream_size,
        })
    }

    pub fn color(&self) -> NodeColor {
        self.color
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn object_type(&self) -> ObjectType {
        self.object_type
    }

    pub(crate) fn state_bits(&self) -> [u8; 4] {
        self._state_bits
    }
}

/// Parses a `{xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx}`-shaped CLSID string (as
/// produced by [`DirectoryEntry::from_raw`]) back into its on-disk 16-byte
/// packetized form. Inverse of the formatting in `from_raw`.
pub fn parse_class_id(class_id: &str) -> Result<[u8; 16]> {
    let hex_only: String = class_id.chars().filter(|c| *c != '-').collect();
    if hex_only.len() != 32 {
        return Err(Error::OleInvalidDirectoryEntry(
            "class_id",
            format!("expected 32 hex digits, found {}", hex_only.len()),
        ));
    }
    let mut raw = [0u8; 16];
    for (i, byte_slot) in raw.iter_mut().enumerate() {
        let byte_str = &hex_only[i * 2..i * 2 + 2];
        *byte_slot = u8::from_str_radix(byte_str, 16)
            .map_err(|e| Error::OleInvalidDirectoryEntry("class_id", e.to_string()))?;
    }
    let a = u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]);
    let b = u16::from_be_bytes([raw[4], raw[5]]);
    let c = u16::from_be_bytes([raw[6], raw[7]]);
    let mut out = [0u8; 16];
    out[0..4].copy_from_slice(&a.to_le_bytes());
    out[4..6].copy_from_slice(&b.to_le_bytes());
    out[6..8].copy_from_slice(&c.to_le_bytes());
    out[8..16].copy_from_slice(&raw[8..16]);
    Ok(out)
}

fn parse_sid(raw: [u8; 4], field: &'static str) -> Result<Option<u32>> {
    match raw {
        constants::NO_STREAM => Ok(None),
        potential_value => {
            let potential_value = u32::from_le_bytes(potential_value);
            if potential_value > constants::MAX_REG_STREAM_ID_VALUE {
                Err(Error::OleInvalidDirectoryEntry(
                    field,
                    format!("invalid value: {:x?}", potential_value),
                ))
            } else {
                Ok(Some(potential_value))
            }
        }
    }
}

/// Orders two entry names by `(NameLength, upper-cased UTF-16 code units)`,
/// matching the on-disk red-black tree's key.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    let a_units: Vec<u16> = a.encode_utf16().collect();
    let b_units: Vec<u16> = b.encode_utf16().collect();
    match a_units.len().cmp(&b_units.len()) {
        Ordering::Equal => {
            let a_upper: Vec<u16> = a.to_uppercase().encode_utf16().collect();
            let b_upper: Vec<u16> = b.to_uppercase().encode_utf16().collect();
            a_upper.cmp(&b_upper)
        }
        other => other,
    }
}

pub fn names_equal(a: &str, b: &str) -> bool {
    compare_names(a, b) == Ordering::Equal
}

/// In-order walk of the sibling tree rooted at `root`, invoking `visit` for
/// every entry. When `recursive` is true and an entry is a storage, its own
/// child tree is walked immediately after the entry's own callback, so a
/// caller always sees a storage before anything nested inside it.
pub fn visit_entries(
    entries: &[DirectoryEntry],
    root: Option<u32>,
    recursive: bool,
    visit: &mut dyn FnMut(&DirectoryEntry),
) {
    let Some(root) = root else { return };
    // An explicit in-order traversal over the sibling BST: push left spine,
    // pop, visit, push right, repeat — classic iterative in-order walk.
    let mut work: Vec<(u32, bool)> = vec![(root, false)];
    while let Some((node_id, visited_left)) = work.pop() {
        let node = &entries[node_id as usize];
        if visited_left {
            visit(node);
            if recursive && node.object_type != ObjectType::Stream {
                if let Some(child) = node.child_id {
                    visit_entries(entries, Some(child), recursive, visit);
                }
            }
            if let Some(right) = node.right_sibling_id {
                work.push((right, false));
            }
        } else {
            work.push((node_id, true));
            if let Some(left) = node.left_sibling_id {
                work.push((left, false));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_ordering_is_length_then_uppercase() {
        assert_eq!(compare_names("Workbook", "WorkBook"), Ordering::Equal);
        assert_eq!(compare_names("a", "bb"), Ordering::Less);
        assert_eq!(compare_names("zz", "a"), Ordering::Greater);
    }

    #[test]
    fn class_id_round_trips_through_its_string_form() {
        let raw: [u8; 16] = [
            0x06, 0x09, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0xC0, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x46,
        ];
        let a = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
        let b = u16::from_le_bytes([raw[4], raw[5]]);
        let c = u16::from_le_bytes([raw[6], raw[7]]);
        let formatted = format!(
            "{:08X}-{:04X}-{:04X}-{:02X}{:02X}-{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}",
            a, b, c, raw[8], raw[9], raw[10], raw[11], raw[12], raw[13], raw[14], raw[15]
        );
        assert_eq!(parse_class_id(&formatted).unwrap(), raw);
    }
}
