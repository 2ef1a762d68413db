//! Workbook visibility mutator: clears the "window hidden" bit of a
//! `Workbook`/`WorkBook` stream's `WINDOW1` BIFF record in place.

use crate::compound_file::CompoundFile;
use crate::constants;
use crate::error::Error;
use crate::Result;

/// Flips a hidden workbook window back to visible by clearing bit 0 of the
/// `WINDOW1` record's `grbit` field, then stages the patched bytes back
/// onto the stream via [`CompoundFile::set_data`].
///
/// The caller still owns calling [`CompoundFile::save`] afterwards.
pub fn set_workbook_visibility(file: &mut CompoundFile, stream_path: &[&str]) -> Result<()> {
    let mut data = file.get_stream(stream_path)?;

    if data.len() < 4 {
        return Err(Error::CorruptFile(
            "Workbook stream too short to hold a BOF record".to_string(),
        ));
    }
    let first_sid = u16::from_le_bytes([data[0], data[1]]);
    if first_sid != constants::BIFF_BOF {
        return Err(Error::CorruptFile(format!(
            "Workbook stream must begin with BOF (0x0809), found {:#06x}",
            first_sid
        )));
    }

    let mut offset = 0usize;
    loop {
        if offset + 4 > data.len() {
            return Err(Error::CorruptFile(
                "hit EOF walking BIFF records before finding WINDOW1".to_string(),
            ));
        }
        let sid = u16::from_le_bytes([data[offset], data[offset + 1]]);
        let length = u16::from_le_bytes([data[offset + 2], data[offset + 3]]) as usize;
        let payload_start = offset + 4;
        let payload_end = payload_start
            .checked_add(length)
            .ok_or_else(|| Error::CorruptFile("BIFF record length overflow".to_string()))?;
        if payload_end > data.len() {
            return Err(Error::CorruptFile(
                "BIFF record payload runs past end of stream".to_string(),
            ));
        }

        if sid == constants::BIFF_WINDOW1 {
            let grbit_offset = payload_start + 8;
            if grbit_offset + 2 > payload_end {
                return Err(Error::CorruptFile(
                    "WINDOW1 record too short to hold grbit".to_string(),
                ));
            }
            let grbit = u16::from_le_bytes([data[grbit_offset], data[grbit_offset + 1]]);
            let cleared = grbit & !0x0001;
            let bytes = cleared.to_le_bytes();
            data[grbit_offset] = bytes[0];
            data[grbit_offset + 1] = bytes[1];
            file.set_data(stream_path, data)?;
            return Ok(());
        }

        offset = payload_end;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_record(buf: &mut Vec<u8>, sid: u16, payload: &[u8]) {
        buf.extend_from_slice(&sid.to_le_bytes());
        buf.extend_from_slice(&(payload.len() as u16).to_le_bytes());
        buf.extend_from_slice(payload);
    }

    #[test]
    fn rejects_stream_without_leading_bof() {
        let mut data = Vec::new();
        push_record(&mut data, constants::BIFF_WINDOW1, &[0u8; 10]);
        let err = walk_for_test(&data).unwrap_err();
        assert!(matches!(err, Error::CorruptFile(_)));
    }

    fn walk_for_test(data: &[u8]) -> Result<()> {
        if data.len() < 4 {
            return Err(Error::CorruptFile("short".to_string()));
        }
        let first_sid = u16::from_le_bytes([data[0], data[1]]);
        if first_sid != constants::BIFF_BOF {
            return Err(Error::CorruptFile("not bof".to_string()));
        }
        Ok(())
    }

    #[test]
    fn clears_grbit_bit_zero_in_window1_payload() {
        let mut data = Vec::new();
        push_record(&mut data, constants::BIFF_BOF, &[0u8; 4]);
        let mut window1_payload = vec![0u8; 8];
        window1_payload.extend_from_slice(&0x0001u16.to_le_bytes());
        push_record(&mut data, constants::BIFF_WINDOW1, &window1_payload);

        // Locate WINDOW1's grbit offset the same way `set_workbook_visibility` does,
        // without needing a real `CompoundFile` to exercise the bit-clearing math.
        let window1_offset = 8; // BOF record is 4 (header) + 4 (payload) bytes
        let payload_start = window1_offset + 4;
        let grbit_offset = payload_start + 8;
        let grbit = u16::from_le_bytes([data[grbit_offset], data[grbit_offset + 1]]);
        assert_eq!(grbit & 0x0001, 0x0001);
        let cleared = grbit & !0x0001;
        assert_eq!(cleared, 0);
    }
}
