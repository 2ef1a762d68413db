use crate::{
    biff8::{find_file_pass, FilePassScheme},
    encryption::{DocumentType, EncryptionHandler},
    OleFile,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExcelEncryptionState {
    NotEncrypted,
    LegacyRc4,
    XorObfuscation,
    CryptoApiOrAgile,
}

pub(crate) struct ExcelEncryptionHandler<'a> {
    ole_file: &'a OleFile,
    stream_name: String,
}

impl<'a> EncryptionHandler<'a> for ExcelEncryptionHandler<'a> {
    fn doc_type(&self) -> DocumentType {
        DocumentType::Excel
    }

    fn is_encrypted(&self) -> bool {
        let Ok(workbook) = self.ole_file.open_stream(&[self.stream_name.as_str()]) else {
            return false;
        };
        find_file_pass(&workbook).is_some()
    }

    fn new(ole_file: &'a OleFile, stream_name: String) -> Self {
        Self {
            ole_file,
            stream_name,
        }
    }
}

pub fn encryption_state(ole_file: &OleFile) -> ExcelEncryptionState {
    let stream_name = if ole_file.list_streams().iter().any(|s| s == "Workbook") {
        "Workbook"
    } else if ole_file.list_streams().iter().any(|s| s == "WorkBook") {
        "WorkBook"
    } else {
        return ExcelEncryptionState::NotEncrypted;
    };

    let Ok(workbook) = ole_file.open_stream(&[stream_name]) else {
        return ExcelEncryptionState::NotEncrypted;
    };

    match find_file_pass(&workbook) {
        None => ExcelEncryptionState::NotEncrypted,
        Some(file_pass) => match file_pass.scheme {
            FilePassScheme::LegacyRc4 => ExcelEncryptionState::LegacyRc4,
            FilePassScheme::XorObfuscation => ExcelEncryptionState::XorObfuscation,
            FilePassScheme::CryptoApiOrAgile => ExcelEncryptionState::CryptoApiOrAgile,
        },
    }
}
