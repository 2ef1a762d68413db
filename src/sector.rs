//! Compound-file sector engine (C5): FAT/DIFAT/mini-FAT chain
//! reconstruction and chain-following stream reads, with cycle detection.

use crate::{constants, error::Error, header::OleHeader, Result};

/// Walks the 109 DIFAT entries embedded in the header plus any DIFAT chain
/// sectors, producing the full FAT (as a flat `next-sector` array indexed by
/// sector number).
pub fn build_sector_allocation_table(header: &OleHeader, sectors: &[Vec<u8>]) -> Result<Vec<u32>> {
    let mut fat_sector_indices: Vec<u32> = Vec::new();
    for sector_index in header.sector_allocation_table_head.iter() {
        if *sector_index == constants::FREESECT {
            continue;
        }
        fat_sector_indices.push(*sector_index);
    }

    if header.master_sector_allocation_table_len > 0 {
        let sector_size = header.sector_size as usize;
        let pointers_per_difat_sector = sector_size / 4 - 1;
        let mut next_difat_sector = header.master_sector_allocation_table_first_sector;
        let mut difat_sectors_seen = 0usize;
        let mut visited = std::collections::HashSet::new();

        while next_difat_sector != constants::ENDOFCHAIN {
            if !visited.insert(next_difat_sector) {
                return Err(Error::SectorChainCycle(next_difat_sector));
            }
            let sector = sectors.get(next_difat_sector as usize).ok_or_else(|| {
                Error::CorruptFile(format!(
                    "DIFAT chain references out-of-range sector {}",
                    next_difat_sector
                ))
            })?;
            let pointers = sector
                .chunks_exact(4)
                .map(|quad| u32::from_le_bytes([quad[0], quad[1], quad[2], quad[3]]))
                .collect::<Vec<_>>();
            for &pointer in pointers.iter().take(pointers_per_difat_sector) {
                if pointer != constants::FREESECT {
                    fat_sector_indices.push(pointer);
                }
            }
            next_difat_sector = *pointers.last().unwrap_or(&constants::ENDOFCHAIN);
            difat_sectors_seen += 1;
            if difat_sectors_seen > sectors.len() {
                return Err(Error::SectorChainCycle(next_difat_sector));
            }
        }
    }

    let mut fat = Vec::new();
    for sector_index in fat_sector_indices {
        let sector = sectors.get(sector_index as usize).ok_or_else(|| {
            Error::CorruptFile(format!("FAT references out-of-range sector {}", sector_index))
        })?;
        fat.extend(
            sector
                .chunks_exact(4)
                .map(|quad| u32::from_le_bytes([quad[0], quad[1], quad[2], quad[3]])),
        );
    }
    Ok(fat)
}

/// Chases `start_sector` through `fat`, concatenating full sector contents,
/// detecting cycles by bounding the number of hops to the sector count.
pub fn read_fat_chain(fat: &[u32], sectors: &[Vec<u8>], start_sector: u32) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut next = start_sector;
    let mut visited = std::collections::HashSet::new();
    while next != constants::ENDOFCHAIN {
        if !visited.insert(next) {
            return Err(Error::SectorChainCycle(next));
        }
        if visited.len() > sectors.len() + 1 {
            return Err(Error::SectorChainCycle(next));
        }
        let sector = sectors
            .get(next as usize)
            .ok_or_else(|| Error::CorruptFile(format!("chain references out-of-range sector {}", next)))?;
        out.extend_from_slice(sector);
        next = *fat.get(next as usize).ok_or_else(|| {
            Error::CorruptFile(format!("FAT has no entry for sector {}", next))
        })?;
    }
    Ok(out)
}

/// Builds the mini-FAT by chasing the header's mini-FAT chain through the
/// already-built ordinary FAT.
pub fn build_mini_fat(header: &OleHeader, fat: &[u32], sectors: &[Vec<u8>]) -> Result<Vec<u32>> {
    if header.short_sector_allocation_table_len == 0
        || header.short_sector_allocation_table_first_sector == constants::ENDOFCHAIN
    {
        return Ok(Vec::new());
    }
    let raw = read_fat_chain(
        fat,
        sectors,
        header.short_sector_allocation_table_first_sector,
    )?;
    Ok(raw
        .chunks_exact(4)
        .map(|quad| u32::from_le_bytes([quad[0], quad[1], quad[2], quad[3]]))
        .collect())
}

/// Reads exactly `size` bytes of a stream's logical content, walking the
/// regular FAT from `start_sector` and truncating the trailing sector's
/// garbage bytes beyond `size`.
pub fn read_stream(fat: &[u32], sectors: &[Vec<u8>], start_sector: u32, size: u64) -> Result<Vec<u8>> {
    let mut data = read_fat_chain(fat, sectors, start_sector)?;
    if (data.len() as u64) < size {
        return Err(Error::CorruptFile(format!(
            "stream chain yielded {} bytes, expected at least {}",
            data.len(),
            size
        )));
    }
    data.truncate(size as usize);
    Ok(data)
}

/// Reads exactly `size` bytes of a mini-stream-resident stream, chasing the
/// mini-FAT and indexing into the pre-assembled mini-stream's 64-byte
/// sub-sectors.
pub fn read_mini_stream(
    mini_fat: &[u32],
    mini_stream: &[[u8; 64]],
    start_sector: u32,
    size: u64,
) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    let mut next = start_sector;
    let mut visited = std::collections::HashSet::new();
    while next != constants::ENDOFCHAIN {
        if !visited.insert(next) {
            return Err(Error::SectorChainCycle(next));
        }
        if visited.len() > mini_stream.len() + 1 {
            return Err(Error::SectorChainCycle(next));
        }
        let chunk = mini_stream.get(next as usize).ok_or_else(|| {
            Error::CorruptFile(format!("mini-stream references out-of-range sector {}", next))
        })?;
        data.extend_from_slice(chunk);
        next = *mini_fat.get(next as usize).ok_or_else(|| {
            Error::CorruptFile(format!("mini-FAT has no entry for sector {}", next))
        })?;
    }
    if (data.len() as u64) < size {
        return Err(Error::CorruptFile(format!(
            "mini-stream chain yielded {} bytes, expected at least {}",
            data.len(),
            size
        )));
    }
    data.truncate(size as usize);
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_with(
        fat_head: Vec<u32>,
        difat_first: u32,
        difat_len: u32,
        sector_size: u16,
    ) -> OleHeader {
        OleHeader {
            major_version: 3,
            minor_version: 0x3E,
            sector_size,
            mini_sector_size: 64,
            directory_sectors_len: 0,
            standard_stream_min_size: 4096,
            sector_allocation_table_first_sector: 0,
            sector_allocation_table_len: fat_head.len() as u32,
            short_sector_allocation_table_first_sector: constants::ENDOFCHAIN,
            short_sector_allocation_table_len: 0,
            master_sector_allocation_table_first_sector: difat_first,
            master_sector_allocation_table_len: difat_len,
            sector_allocation_table_head: fat_head,
        }
    }

    #[test]
    fn builds_fat_from_header_entries_only() {
        let sector_size = 512usize;
        let mut fat_sector = vec![0u8; sector_size];
        // sector 0's FAT contents: itself is FATSECT, sector 1 is ENDOFCHAIN.
        fat_sector[0..4].copy_from_slice(&constants::FATSECT.to_le_bytes());
        fat_sector[4..8].copy_from_slice(&constants::ENDOFCHAIN.to_le_bytes());
        let sectors = vec![fat_sector];

        let mut fat_head = vec![constants::FREESECT; 109];
        fat_head[0] = 0;
        let header = header_with(fat_head, constants::ENDOFCHAIN, 0, 512);

        let fat = build_sector_allocation_table(&header, &sectors).unwrap();
        assert_eq!(fat[0], constants::FATSECT);
        assert_eq!(fat[1], constants::ENDOFCHAIN);
    }

    #[test]
    fn detects_cycle_in_chain() {
        let sector_size = 512usize;
        // sector 0 points to sector 1, sector 1 points back to sector 0: a cycle.
        let fat = vec![1u32, 0u32];
        let sectors = vec![vec![0u8; sector_size], vec![0u8; sector_size]];
        let err = read_fat_chain(&fat, &sectors, 0).unwrap_err();
        assert!(matches!(err, Error::SectorChainCycle(_)));
    }

    #[test]
    fn reads_stream_truncated_to_declared_size() {
        let sector_size = 8usize;
        let sectors = vec![vec![1u8; sector_size], vec![2u8; sector_size]];
        let fat = vec![1u32, constants::ENDOFCHAIN];
        let data = read_stream(&fat, &sectors, 0, 10).unwrap();
        assert_eq!(data.len(), 10);
        assert_eq!(&data[0..8], &[1u8; 8]);
        assert_eq!(&data[8..10], &[2u8; 2]);
    }
}
