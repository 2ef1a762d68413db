#[macro_use]
extern crate lazy_static;

mod biff8;
mod byteorder;
pub mod compound_file;
mod constants;
mod directory;
mod encryption;
mod extraction;
mod header;
mod rc4;
mod records;
mod sector;
mod util;
mod workbook;

mod ftype;
pub use ftype::{file_type, OleFileType};

pub mod error;
pub type Result<T> = std::result::Result<T, Error>;

pub use biff8::decrypt_biff8_stream;
pub use compound_file::CompoundFile;
pub use directory::{DirectoryEntry, ObjectType};
pub use extraction::{extract_embedded_objects, ExtractedObject};
pub use workbook::set_workbook_visibility;

use crate::{
    constants::Readable,
    directory::DirectoryEntryRaw,
    header::{parse_raw_header, OleHeader},
};
use derivative::Derivative;
use error::{Error, HeaderErrorType};
use tokio::io::AsyncReadExt;

#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct OleFile {
    header: OleHeader,
    #[derivative(Debug = "ignore")]
    sectors: Vec<Vec<u8>>,
    #[derivative(Debug = "ignore")]
    sector_allocation_table: Vec<u32>,
    #[derivative(Debug = "ignore")]
    short_sector_allocation_table: Vec<u32>,
    directory_entries: Vec<DirectoryEntry>,
    #[derivative(Debug = "ignore")]
    mini_stream: Vec<[u8; 64]>,
    file_type: OleFileType,
    pub encrypted: bool,
}

impl OleFile {
    #[cfg(feature = "async")]
    pub async fn from_file<P: AsRef<std::path::Path>>(file: P) -> Result<Self> {
        //! Read from a OLE file and parse it
        //!
        //! ## Example usage
        //! ```rust
        //! use ole::OleFile;
        //!
        //! #[tokio::main]
        //! async fn main() {
        //!     let file = "data/oledoc1.doc_";
        //!
        //!     let res = OleFile::from_file(file).await;
        //!     assert!(res.is_ok());
        //! }
        //! ```
        let f = tokio::fs::File::open(file).await?;
        Self::parse(f).await
    }

    #[cfg(feature = "blocking")]
    pub fn from_file_blocking<P: AsRef<std::path::Path>>(file: P) -> Result<Self> {
        //! Read from a OLE file and parse it
        //!
        //! ## Example usage
        //! ```rust
        //! use ole::OleFile;
        //! let file = "data/oledoc1.doc_";
        //!
        //! let res = OleFile::from_file_blocking(file);
        //! assert!(res.is_ok())
        //! ```
        let rt = tokio::runtime::Runtime::new()?;
        let f = rt.block_on(tokio::fs::File::open(file))?;
        rt.block_on(Self::parse(f))
    }

    #[cfg(feature = "async")]
    pub async fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        //! Parse an OLE file already held in memory.
        Self::parse(std::io::Cursor::new(bytes)).await
    }

    #[cfg(feature = "blocking")]
    pub fn from_bytes_blocking(bytes: Vec<u8>) -> Result<Self> {
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(Self::parse(std::io::Cursor::new(bytes)))
    }

    pub fn root(&self) -> &DirectoryEntry {
        &self.directory_entries[0]
    }

    pub(crate) fn directory_entries(&self) -> &[DirectoryEntry] {
        &self.directory_entries
    }

    pub(crate) fn header(&self) -> &OleHeader {
        &self.header
    }

    pub(crate) fn sectors_for_reconstruction(&self) -> &[Vec<u8>] {
        &self.sectors
    }

    pub fn list_streams(&self) -> Vec<String> {
        //! List the streams from a parsed OLE file
        self.list_object(ObjectType::Stream)
    }

    pub fn list_storage(&self) -> Vec<String> {
        //! List the Storages from a parsed OLE file
        self.list_object(ObjectType::Storage)
    }

    pub fn is_encrypted(&self) -> bool {
        //! Returns true or false if a file is encrypted/password protected
        self.encrypted
    }

    pub fn file_type(&self) -> OleFileType {
        self.file_type
    }

    pub fn open_stream(&self, stream_path: &[&str]) -> Result<Vec<u8>> {
        let entry = self
            .find_stream(stream_path, None)
            .ok_or(Error::OleDirectoryEntryNotFound)?;
        if entry.object_type != ObjectType::Stream {
            return Err(Error::OleDirectoryEntryNotFound);
        }
        self.read_entry_data(entry)
    }

    pub(crate) fn stream_data_by_index(&self, index: usize) -> Result<Vec<u8>> {
        let entry = self
            .directory_entries
            .get(index)
            .ok_or(Error::OleDirectoryEntryNotFound)?;
        self.read_entry_data(entry)
    }

    fn read_entry_data(&self, entry: &DirectoryEntry) -> Result<Vec<u8>> {
        // the unwrap is safe because the location is guaranteed to exist for this object type
        let start_sector = entry.starting_sector_location.unwrap();
        if entry.stream_size < self.header.standard_stream_min_size as u64 {
            sector::read_mini_stream(
                &self.short_sector_allocation_table,
                &self.mini_stream,
                start_sector,
                entry.stream_size,
            )
        } else {
            sector::read_stream(
                &self.sector_allocation_table,
                &self.sectors,
                start_sector,
                entry.stream_size,
            )
        }
    }

    pub(crate) fn find_stream(
        &self,
        stream_path: &[&str],
        parent: Option<&DirectoryEntry>,
    ) -> Option<&DirectoryEntry> {
        let first_entry = stream_path[0];
        let remainder = &stream_path[1..];
        let remaining_len = remainder.len();

        match parent {
            Some(parent) => {
                let mut entries_to_search = vec![];
                if let Some(child_id) = parent.child_id {
                    let child = self.directory_entries.get(child_id as usize).unwrap();
                    entries_to_search.push((child, true));
                }
                if let Some(left_sibling_id) = parent.left_sibling_id {
                    entries_to_search.push((
                        self.directory_entries
                            .get(left_sibling_id as usize)
                            .unwrap(),
                        false,
                    ));
                }
                if let Some(right_sibling_id) = parent.right_sibling_id {
                    entries_to_search.push((
                        self.directory_entries
                            .get(right_sibling_id as usize)
                            .unwrap(),
                        false,
                    ));
                }
                for (entry, is_child) in entries_to_search {
                    if directory::names_equal(&entry.name, first_entry) {
                        return if remaining_len == 0 {
                            Some(entry)
                        } else if is_child {
                            self.find_stream(remainder, Some(entry))
                        } else {
                            self.find_stream(stream_path, Some(entry))
                        };
                    } else if let Some(found_entry) = self.find_stream(stream_path, Some(entry)) {
                        return Some(found_entry);
                    }
                }
                None
            }
            None => {
                if stream_path.is_empty() {
                    return None;
                }
                if let Some(found_entry) = self
                    .directory_entries
                    .iter()
                    .find(|entry| directory::names_equal(&entry.name, first_entry))
                {
                    if remaining_len == 0 {
                        Some(found_entry)
                    } else {
                        self.find_stream(remainder, Some(found_entry))
                    }
                } else {
                    None
                }
            }
        }
    }

    fn list_object(&self, object_type: ObjectType) -> Vec<String> {
        self.directory_entries
            .iter()
            .filter_map(|entry| {
                if entry.object_type == object_type {
                    Some(entry.name.clone())
                } else {
                    None
                }
            })
            .collect()
    }

    async fn parse<R>(mut read: R) -> Result<Self>
    where
        R: Readable,
    {
        let raw_file_header = parse_raw_header(&mut read).await?;
        let file_header = OleHeader::from_raw(raw_file_header);
        let sector_size = file_header.sector_size as usize;

        if sector_size > constants::HEADER_LENGTH {
            let should_read_size = sector_size - constants::HEADER_LENGTH;
            let mut should_read = vec![0u8; should_read_size];
            let did_read_size = read.read(&mut should_read).await?;
            if did_read_size != should_read_size {
                return Err(Error::OleInvalidHeader(HeaderErrorType::NotEnoughBytes(
                    should_read_size,
                    did_read_size,
                )));
            } else if should_read != vec![0u8; should_read_size] {
                return Err(Error::OleInvalidHeader(HeaderErrorType::Parsing(
                    "all bytes must be zero for larger header sizes",
                    "n/a".to_string(),
                )));
            }
        }

        let mut sectors = vec![];
        loop {
            let mut buf = vec![0u8; sector_size];
            match read.read(&mut buf).await {
                Ok(actually_read_size) if actually_read_size == sector_size => {
                    sectors.push((&buf[0..actually_read_size]).to_vec());
                }
                Ok(wrong_size) if wrong_size != 0 => {
                    return Err(Error::OleUnexpectedEof(format!(
                        "short read when parsing sector number: {}",
                        sectors.len()
                    )));
                }
                Ok(_empty) => {
                    break;
                }
                Err(error) => {
                    return Err(Error::StdIo(error));
                }
            }
        }

        let sector_allocation_table =
            sector::build_sector_allocation_table(&file_header, &sectors)?;
        let short_sector_allocation_table =
            sector::build_mini_fat(&file_header, &sector_allocation_table, &sectors)?;

        let mut self_to_init = OleFile {
            header: file_header,
            sectors,
            sector_allocation_table,
            short_sector_allocation_table,
            directory_entries: vec![],
            mini_stream: vec![],
            file_type: OleFileType::Generic,
            encrypted: false,
        };

        self_to_init.initialize_directory_stream()?;
        self_to_init.initialize_mini_stream()?;
        self_to_init.file_type = ftype::file_type(self_to_init.root());
        self_to_init.encrypted = encryption::is_encrypted(&self_to_init);
        Ok(self_to_init)
    }

    fn initialize_directory_stream(&mut self) -> Result<()> {
        let directory_stream_data = sector::read_fat_chain(
            &self.sector_allocation_table,
            &self.sectors,
            self.header.sector_allocation_table_first_sector,
        )?;

        if directory_stream_data.len() % constants::SIZE_OF_DIRECTORY_ENTRY != 0 {
            return Err(Error::OleInvalidDirectoryEntry(
                "directory_stream_size",
                format!(
                    "size of directory stream data is not correct? {}",
                    directory_stream_data.len()
                ),
            ));
        }

        self.directory_entries =
            Vec::with_capacity(directory_stream_data.len() / constants::SIZE_OF_DIRECTORY_ENTRY);
        for (index, unparsed_entry) in directory_stream_data
            .chunks(constants::SIZE_OF_DIRECTORY_ENTRY)
            .enumerate()
        {
            let raw_directory_entry = DirectoryEntryRaw::parse(unparsed_entry)?;
            match DirectoryEntry::from_raw(&self.header, raw_directory_entry, index) {
                Ok(directory_entry) => self.directory_entries.push(directory_entry),
                Err(Error::OleUnknownOrUnallocatedDirectoryEntry) => continue,
                Err(anything_else) => return Err(anything_else),
            }
        }

        if self.directory_entries.is_empty() {
            return Err(Error::OleInvalidDirectoryEntry(
                "directory_stream_size",
                "no directory entries found; a root entry is mandatory".to_string(),
            ));
        }

        Ok(())
    }

    fn initialize_mini_stream(&mut self) -> Result<()> {
        let (next_sector, mini_stream_size) = {
            let root_entry = &self.directory_entries[0];
            match root_entry.starting_sector_location {
                None => return Ok(()), //no mini-stream here
                Some(starting_sector_location) => {
                    (starting_sector_location, root_entry.stream_size)
                }
            }
        };

        if next_sector == constants::ENDOFCHAIN {
            return Ok(());
        }

        let mut raw_mini_stream_data = sector::read_fat_chain(
            &self.sector_allocation_table,
            &self.sectors,
            next_sector,
        )?;
        raw_mini_stream_data.truncate(mini_stream_size as usize);
        raw_mini_stream_data.chunks_exact(64).for_each(|chunk| {
            self.mini_stream.push(<[u8; 64]>::try_from(chunk).unwrap());
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    pub async fn test_word_encryption_detection_on() {
        let ole_file = OleFile::from_file("data/encryption/encrypted/rc4cryptoapi_password.doc")
            .await
            .unwrap();
        assert!(ole_file.is_encrypted());
    }

    #[tokio::test]
    pub async fn test_word_encryption_detection_off() {
        let ole_file = OleFile::from_file("data/encryption/plaintext/plain.doc")
            .await
            .unwrap();
        assert!(!ole_file.is_encrypted());
    }

    #[tokio::test]
    pub async fn test_excel_encryption_detection_on() {
        let ole_file = OleFile::from_file("data/encryption/encrypted/rc4cryptoapi_password.xls")
            .await
            .unwrap();
        assert!(ole_file.is_encrypted());
    }

    #[tokio::test]
    pub async fn test_excel_encryption_detection_off() {
        let ole_file = OleFile::from_file("data/encryption/plaintext/plain.xls")
            .await
            .unwrap();
        assert!(!ole_file.is_encrypted());
    }
}
