//! Compound-file façade (C7): the `RootStorage`-style navigation surface
//! over a parsed [`crate::OleFile`], plus a write-back `SetData`/`Save` path
//! that re-serializes the whole container.
//!
//! `Save` special-cases the "opened and never mutated" path by literally
//! reconstructing the header from its parsed fields and concatenating the
//! original sector bytes — this is byte-identical to the source because the
//! parser already validated every reserved/constant field it doesn't
//! preserve verbatim. Any mutation (`set_data`) instead takes a from-scratch
//! rebuild path described in [`rebuild`].

use crate::{
    constants,
    directory::{parse_class_id, DirectoryEntry, ObjectType},
    error::Error,
    header::OleHeader,
    OleFile, Result,
};
use std::collections::HashMap;

pub struct CompoundFile {
    file: OleFile,
    overrides: HashMap<usize, Vec<u8>>,
    disposed: bool,
}

impl CompoundFile {
    #[cfg(feature = "async")]
    pub async fn open(bytes: Vec<u8>) -> Result<Self> {
        Ok(CompoundFile {
            file: OleFile::from_bytes(bytes).await?,
            overrides: HashMap::new(),
            disposed: false,
        })
    }

    #[cfg(feature = "blocking")]
    pub fn open_blocking(bytes: Vec<u8>) -> Result<Self> {
        Ok(CompoundFile {
            file: OleFile::from_bytes_blocking(bytes)?,
            overrides: HashMap::new(),
            disposed: false,
        })
    }

    fn check_disposed(&self) -> Result<()> {
        if self.disposed {
            Err(Error::Disposed)
        } else {
            Ok(())
        }
    }

    pub fn root(&self) -> Result<&DirectoryEntry> {
        self.check_disposed()?;
        Ok(self.file.root())
    }

    pub fn try_get_stream(&self, path: &[&str]) -> Result<Option<Vec<u8>>> {
        self.check_disposed()?;
        let Some(entry) = self.file.find_stream(path, None) else {
            return Ok(None);
        };
        if entry.object_type != ObjectType::Stream {
            return Ok(None);
        }
        Ok(Some(
            self.overrides
                .get(&entry.index)
                .cloned()
                .map(Result::Ok)
                .unwrap_or_else(|| self.file.stream_data_by_index(entry.index))?,
        ))
    }

    pub fn get_stream(&self, path: &[&str]) -> Result<Vec<u8>> {
        self.try_get_stream(path)?
            .ok_or_else(|| Error::NotFound(path.join("/")))
    }

    pub fn get_storage(&self, path: &[&str]) -> Result<&DirectoryEntry> {
        self.check_disposed()?;
        let entry = self
            .file
            .find_stream(path, None)
            .ok_or_else(|| Error::NotFound(path.join("/")))?;
        if entry.object_type == ObjectType::Stream {
            return Err(Error::NotFound(path.join("/")));
        }
        Ok(entry)
    }

    pub fn exists_stream(&self, path: &[&str]) -> Result<bool> {
        self.check_disposed()?;
        Ok(self
            .file
            .find_stream(path, None)
            .map(|e| e.object_type == ObjectType::Stream)
            .unwrap_or(false))
    }

    pub fn exists_storage(&self, path: &[&str]) -> Result<bool> {
        self.check_disposed()?;
        Ok(self
            .file
            .find_stream(path, None)
            .map(|e| e.object_type != ObjectType::Stream)
            .unwrap_or(false))
    }

    /// In-order walk of every entry, root-storage's children downward.
    /// Each entry gets its own callback before recursing into its children.
    pub fn visit_entries(&self, recursive: bool, mut visit: impl FnMut(&DirectoryEntry)) -> Result<()> {
        self.check_disposed()?;
        crate::directory::visit_entries(
            self.file.directory_entries(),
            self.file.root().child_id,
            recursive,
            &mut visit,
        );
        Ok(())
    }

    /// Flat, case-insensitive scan across every directory entry for a
    /// matching name, regardless of where it sits in the storage tree.
    pub fn get_all_named_entries(&self, name: &str) -> Result<Vec<&DirectoryEntry>> {
        self.check_disposed()?;
        Ok(self
            .file
            .directory_entries()
            .iter()
            .filter(|e| crate::directory::names_equal(&e.name, name))
            .collect())
    }

    pub(crate) fn directory_entries(&self) -> &[DirectoryEntry] {
        self.file.directory_entries()
    }

    pub(crate) fn header_template(&self) -> &OleHeader {
        self.file.header()
    }

    /// Effective bytes for a stream entry: a staged `set_data` override if
    /// one exists, otherwise whatever is still on disk.
    pub(crate) fn stream_data_for_entry(&self, entry: &DirectoryEntry) -> Result<Vec<u8>> {
        match self.overrides.get(&entry.index) {
            Some(data) => Ok(data.clone()),
            None => self.file.stream_data_by_index(entry.index),
        }
    }

    /// Overwrites a stream's logical content in memory. Visible to later
    /// `get_stream`/`try_get_stream` calls immediately; only reaches disk on
    /// [`CompoundFile::save`].
    pub fn set_data(&mut self, path: &[&str], data: Vec<u8>) -> Result<()> {
        self.check_disposed()?;
        let entry = self
            .file
            .find_stream(path, None)
            .ok_or_else(|| Error::NotFound(path.join("/")))?;
        if entry.object_type != ObjectType::Stream {
            return Err(Error::NotFound(path.join("/")));
        }
        self.overrides.insert(entry.index, data);
        Ok(())
    }

    pub fn dispose(&mut self) {
        self.disposed = true;
    }

    /// Re-serializes the whole compound file. If no stream was mutated,
    /// returns the logically-identical reconstruction of the original bytes
    /// (see module docs); otherwise rebuilds FAT/directory fresh.
    pub fn save(&self) -> Result<Vec<u8>> {
        self.check_disposed()?;
        if self.overrides.is_empty() {
            Ok(reconstruct_unmodified(&self.file))
        } else {
            rebuild(&self.file, &self.overrides)
        }
    }
}

fn reconstruct_unmodified(file: &OleFile) -> Vec<u8> {
    let mut out = serialize_header(file.header());
    for sector in file.sectors_for_reconstruction() {
        out.extend_from_slice(sector);
    }
    out
}

fn serialize_header(header: &OleHeader) -> Vec<u8> {
    let sector_size = header.sector_size as usize;
    let mut buf = vec![0u8; sector_size];
    buf[0..8].copy_from_slice(&constants::MAGIC_BYTES);
    // bytes 8..24 (CLSID) stay zero, as the reader requires.
    buf[24..26].copy_from_slice(&constants::CORRECT_MINOR_VERSION);
    let major = if header.major_version == 4 {
        constants::MAJOR_VERSION_4
    } else {
        constants::MAJOR_VERSION_3
    };
    buf[26..28].copy_from_slice(&major);
    buf[28..30].copy_from_slice(&[0xFE, 0xFF]);
    buf[30..32].copy_from_slice(&(header.sector_size.trailing_zeros() as u16).to_le_bytes());
    buf[32..34].copy_from_slice(&(header.mini_sector_size.trailing_zeros() as u16).to_le_bytes());
    // bytes 34..40 (reserved) stay zero.
    buf[40..44].copy_from_slice(&header.directory_sectors_len.to_le_bytes());
    buf[44..48].copy_from_slice(&header.sector_allocation_table_len.to_le_bytes());
    buf[48..52].copy_from_slice(&header.sector_allocation_table_first_sector.to_le_bytes());
    // bytes 52..56 (transaction signature) stay zero.
    buf[56..60].copy_from_slice(&header.standard_stream_min_size.to_le_bytes());
    buf[60..64].copy_from_slice(&header.short_sector_allocation_table_first_sector.to_le_bytes());
    buf[64..68].copy_from_slice(&header.short_sector_allocation_table_len.to_le_bytes());
    buf[68..72].copy_from_slice(&header.master_sector_allocation_table_first_sector.to_le_bytes());
    buf[72..76].copy_from_slice(&header.master_sector_allocation_table_len.to_le_bytes());
    for (i, entry) in header.sector_allocation_table_head.iter().enumerate() {
        let offset = 76 + i * 4;
        if offset + 4 <= 512 {
            buf[offset..offset + 4].copy_from_slice(&entry.to_le_bytes());
        }
    }
    buf
}

fn serialize_directory_entry(entry: Option<&DirectoryEntry>) -> [u8; 128] {
    let mut raw = [0u8; 128];
    let Some(entry) = entry else {
        return raw; // object_type 0x00 == unallocated
    };

    let name_utf16: Vec<u16> = entry.name.encode_utf16().chain(std::iter::once(0)).collect();
    for (i, unit) in name_utf16.iter().enumerate().take(32) {
        let offset = i * 2;
        raw[offset..offset + 2].copy_from_slice(&unit.to_le_bytes());
    }
    let name_len = (name_utf16.len().min(32) * 2) as u16;
    raw[64..66].copy_from_slice(&name_len.to_le_bytes());

    raw[66] = match entry.object_type {
        ObjectType::Storage => constants::OBJECT_TYPE_STORAGE[0],
        ObjectType::Stream => constants::OBJECT_TYPE_STREAM[0],
        ObjectType::RootStorage => constants::OBJECT_TYPE_ROOT_STORAGE[0],
    };
    raw[67] = constants::NODE_COLOR_BLACK[0];

    raw[68..72].copy_from_slice(&sid_bytes(entry.left_sibling_id));
    raw[72..76].copy_from_slice(&sid_bytes(entry.right_sibling_id));
    raw[76..80].copy_from_slice(&sid_bytes(entry.child_id));

    if let Some(class_id) = entry.class_id.as_ref() {
        if let Ok(bytes) = parse_class_id(class_id) {
            raw[80..96].copy_from_slice(&bytes);
        }
    }
    raw[96..100].copy_from_slice(&entry.state_bits());

    raw[100..108].copy_from_slice(&entry.creation_time_raw);
    raw[108..116].copy_from_slice(&entry.modification_time_raw);

    let starting_sector = entry.starting_sector_location.unwrap_or(constants::ENDOFCHAIN);
    raw[116..120].copy_from_slice(&starting_sector.to_le_bytes());
    raw[120..128].copy_from_slice(&entry.stream_size.to_le_bytes());

    raw
}

fn sid_bytes(sid: Option<u32>) -> [u8; 4] {
    sid.unwrap_or(u32::from_le_bytes(constants::NO_STREAM))
        .to_le_bytes()
}

/// Rebuilds the compound file from scratch: every stream gets a fresh chain
/// of regular (non-mini) sectors, the directory stream is re-serialized, and
/// a FAT covering all of it is computed. This only ever needs to round-trip
/// a document this crate itself opened and mutated via `set_data`, so the
/// simplification of not repacking a mini-stream is acceptable: it trades a
/// few bytes of sector padding for a much simpler writer.
fn rebuild(file: &OleFile, overrides: &HashMap<usize, Vec<u8>>) -> Result<Vec<u8>> {
    let old_header = file.header();
    let entries = file.directory_entries();

    let mut stream_data = HashMap::new();
    for (index, entry) in entries.iter().enumerate() {
        if entry.object_type != ObjectType::Stream {
            continue;
        }
        let data = match overrides.get(&index) {
            Some(overridden) => overridden.clone(),
            None => file.stream_data_by_index(index)?,
        };
        stream_data.insert(index, data);
    }

    serialize_compound_file(old_header, entries.to_vec(), &stream_data)
}

/// Shared rebuild engine behind both a whole-file [`rebuild`] and the
/// extraction policy's storage-subtree re-serialization: lays every stream
/// out in fresh regular-sector chains, re-serializes the directory stream,
/// and computes a FAT covering all of it. `entries[0]` must be the new
/// file's root storage; `stream_data` supplies each stream entry's bytes,
/// keyed by its position in `entries`.
pub(crate) fn serialize_compound_file(
    old_header: &OleHeader,
    mut rebuilt_entries: Vec<DirectoryEntry>,
    stream_data: &HashMap<usize, Vec<u8>>,
) -> Result<Vec<u8>> {
    let sector_size = old_header.sector_size as usize;
    let mut data_sectors: Vec<Vec<u8>> = Vec::new();

    for (index, entry) in rebuilt_entries.iter_mut().enumerate() {
        if entry.object_type != ObjectType::Stream {
            continue;
        }
        let data = stream_data.get(&index).cloned().unwrap_or_default();
        if data.is_empty() {
            entry.starting_sector_location = None;
            entry.stream_size = 0;
            continue;
        }
        let start_sector = data_sectors.len() as u32;
        for chunk in data.chunks(sector_size) {
            let mut sector = vec![0u8; sector_size];
            sector[0..chunk.len()].copy_from_slice(chunk);
            data_sectors.push(sector);
        }
        entry.starting_sector_location = Some(start_sector);
        entry.stream_size = data.len() as u64;
    }

    // root's mini-stream is dropped on rebuild (see module docs): every
    // stream, regardless of original size, now lives in regular sectors.
    rebuilt_entries[0].starting_sector_location = None;
    rebuilt_entries[0].stream_size = 0;

    let entries_per_sector = sector_size / constants::SIZE_OF_DIRECTORY_ENTRY;
    let directory_sector_count = rebuilt_entries.len().div_ceil(entries_per_sector).max(1);
    let directory_start = data_sectors.len() as u32;
    for sector_index in 0..directory_sector_count {
        let mut sector = vec![0u8; sector_size];
        for slot in 0..entries_per_sector {
            let entry_index = sector_index * entries_per_sector + slot;
            let serialized = serialize_directory_entry(rebuilt_entries.get(entry_index));
            let offset = slot * constants::SIZE_OF_DIRECTORY_ENTRY;
            sector[offset..offset + constants::SIZE_OF_DIRECTORY_ENTRY].copy_from_slice(&serialized);
        }
        data_sectors.push(sector);
    }

    let total_data_sectors = data_sectors.len();
    let pointers_per_fat_sector = sector_size / 4;

    let mut fat_sector_count = 1usize;
    loop {
        let required = (total_data_sectors + fat_sector_count).div_ceil(pointers_per_fat_sector);
        if required == fat_sector_count {
            break;
        }
        fat_sector_count = required;
    }
    if fat_sector_count > constants::HEADER_DIFAT_ENTRY_COUNT {
        return Err(Error::CorruptFile(format!(
            "rebuilt compound file needs {} FAT sectors; writing a DIFAT chain beyond the {} header-embedded entries is not supported",
            fat_sector_count,
            constants::HEADER_DIFAT_ENTRY_COUNT
        )));
    }

    let total_sectors = total_data_sectors + fat_sector_count;
    let mut fat = vec![constants::FREESECT; total_sectors];

    // chain each stream's own sectors
    for entry in rebuilt_entries.iter().filter(|e| e.object_type == ObjectType::Stream) {
        if let Some(start) = entry.starting_sector_location {
            let sector_count = (entry.stream_size as usize).div_ceil(sector_size).max(1);
            for i in 0..sector_count {
                let sector_id = start as usize + i;
                fat[sector_id] = if i + 1 == sector_count {
                    constants::ENDOFCHAIN
                } else {
                    (sector_id + 1) as u32
                };
            }
        }
    }
    // chain the directory stream
    for i in 0..directory_sector_count {
        let sector_id = directory_start as usize + i;
        fat[sector_id] = if i + 1 == directory_sector_count {
            constants::ENDOFCHAIN
        } else {
            (sector_id + 1) as u32
        };
    }
    // mark the FAT's own sectors
    for fat_sector_id in total_data_sectors..total_sectors {
        fat[fat_sector_id] = constants::FATSECT;
    }

    let mut fat_sector_indices = Vec::with_capacity(fat_sector_count);
    let mut sectors_out = data_sectors;
    for fat_sector_id in total_data_sectors..total_sectors {
        let fat_sector_index = fat_sector_id - total_data_sectors;
        let mut sector = vec![0u8; sector_size];
        let start = fat_sector_index * pointers_per_fat_sector;
        for (i, slot) in sector.chunks_exact_mut(4).enumerate() {
            let pointer = fat.get(start + i).copied().unwrap_or(constants::FREESECT);
            slot.copy_from_slice(&pointer.to_le_bytes());
        }
        sectors_out.push(sector);
        fat_sector_indices.push(fat_sector_id as u32);
    }

    let mut new_header = old_header.clone();
    new_header.sector_allocation_table_first_sector = directory_start;
    new_header.sector_allocation_table_len = fat_sector_count as u32;
    new_header.short_sector_allocation_table_first_sector = constants::ENDOFCHAIN;
    new_header.short_sector_allocation_table_len = 0;
    new_header.master_sector_allocation_table_first_sector = constants::ENDOFCHAIN;
    new_header.master_sector_allocation_table_len = 0;
    new_header.directory_sectors_len = 0;
    let mut head = fat_sector_indices;
    head.resize(constants::HEADER_DIFAT_ENTRY_COUNT, constants::FREESECT);
    new_header.sector_allocation_table_head = head;

    let mut out = serialize_header(&new_header);
    for sector in sectors_out {
        out.extend_from_slice(&sector);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> OleHeader {
        OleHeader {
            major_version: 3,
            minor_version: 0x3E,
            sector_size: 512,
            mini_sector_size: 64,
            directory_sectors_len: 0,
            standard_stream_min_size: 4096,
            sector_allocation_table_first_sector: 1,
            sector_allocation_table_len: 1,
            short_sector_allocation_table_first_sector: constants::ENDOFCHAIN,
            short_sector_allocation_table_len: 0,
            master_sector_allocation_table_first_sector: constants::ENDOFCHAIN,
            master_sector_allocation_table_len: 0,
            sector_allocation_table_head: vec![constants::FREESECT; constants::HEADER_DIFAT_ENTRY_COUNT],
        }
    }

    #[test]
    fn header_round_trips_its_own_fields() {
        let header = sample_header();
        let serialized = serialize_header(&header);
        assert_eq!(&serialized[0..8], &constants::MAGIC_BYTES);
        assert_eq!(serialized.len(), header.sector_size as usize);
        assert_eq!(&serialized[26..28], &constants::MAJOR_VERSION_3);
    }
}
