use ole::OleFileType;
use ole::OleFile;
use std::fmt::{Debug, Formatter};

/// Constants for risk values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Risk {
    High,
    Medium,
    Low,
    None,
    Info,
    Unknown,
    /// If a check triggered an unexpected error.
    Error,
}

/// Piece of information of an `OleID` object.
/// Contains an ID, value, type, name and description. No other functionality.
#[derive(Clone)]
pub struct Indicator {
    id: String,
    value: Option<String>,
    _type: String,
    name: Option<String>,
    description: Option<String>,
    risk: Risk,
    hide_if_false: bool,
}

impl Indicator {
    pub fn new(
        id: &str,
        value: Option<&str>,
        _type: &str,
        name: Option<&str>,
        description: Option<&str>,
        risk: Risk,
        hide_if_false: bool,
    ) -> Self {
        Indicator {
            id: id.to_string(),
            value: value.map(|x| x.to_string()),
            _type: _type.to_string(),
            name: name.map(|x| x.to_string()),
            description: description.map(|x| x.to_string()),
            risk,
            hide_if_false,
        }
    }

    pub fn risk(&self) -> &Risk {
        &self.risk
    }

    pub fn should_display(&self) -> bool {
        !self.hide_if_false || self.value.as_deref() != Some("False")
    }
}

impl Debug for Indicator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Indicator")
            .field("name", &self.name)
            .field("value", &self.value)
            .field("risk", &self.risk)
            .field("description", &self.description)
            .finish()
    }
}

/// Summary of information about an OLE file (and a few other MS Office
/// formats). Call [`OleId::check`] to gather all info on a given file, or
/// run one of the `check_*` functions to just get a specific piece of info.
pub struct OleId {
    indicators: Vec<Indicator>,
    ole: OleFile,
}

impl OleId {
    /// Opens `filename` as an OLE compound file. Does not run any checks
    /// yet; call [`OleId::check`] for that.
    pub fn new(filename: &str) -> ole::Result<Self> {
        Ok(OleId {
            indicators: Vec::new(),
            ole: OleFile::from_file_blocking(filename)?,
        })
    }

    /// Runs every check and returns the full list of indicators produced.
    pub fn check(&mut self) -> Vec<Indicator> {
        let file_type = self.ole.file_type();
        let description = match file_type {
            OleFileType::Generic => Some("Unrecognized OLE file."),
            _ => None,
        };
        let filetype_indicator = Indicator::new(
            "FType",
            Some(format!("{:?}", file_type).as_str()),
            "String",
            Some("File format"),
            description,
            Risk::Info,
            true,
        );
        self.indicators.push(filetype_indicator);

        self.check_encrypted();
        self.check_object_pool();
        self.check_embedded_object_streams();
        self.check_flash();
        self.indicators.clone()
    }

    /// Checks whether the file is encrypted, and whether it's encrypted in
    /// a way this crate can't decrypt (XOR obfuscation, CryptoAPI/Agile) as
    /// opposed to the legacy BIFF8 RC4 scheme it can.
    pub fn check_encrypted(&mut self) -> Indicator {
        let mut encrypted_indicator = Indicator::new(
            "Encrypted",
            Some("False"),
            "Bool",
            Some("Encrypted"),
            Some("The file is not encrypted"),
            Risk::None,
            false,
        );
        if self.ole.is_encrypted() {
            encrypted_indicator.value = Some("True".to_string());
            encrypted_indicator.risk = Risk::Low;
            encrypted_indicator.description = Some(
                "The file is encrypted (legacy BIFF8 RC4). Content may still be recoverable with a password."
                    .to_string(),
            );
        }
        self.indicators.push(encrypted_indicator.clone());
        encrypted_indicator
    }

    /// Checks whether this file contains an `ObjectPool` storage, a strong
    /// indicator for embedded OLE objects or files.
    pub fn check_object_pool(&mut self) -> Indicator {
        let mut object_pool_indicator = Indicator::new(
            "ObjectPool",
            Some("False"),
            "Bool",
            Some("Object Pool"),
            Some("Contains an ObjectPool storage, very likely to contain embedded OLE objects or files. Use oleobj to extract them."),
            Risk::None,
            false,
        );
        if self.ole.list_storage().iter().any(|s| s == "ObjectPool") {
            object_pool_indicator.value = Some("True".to_string());
            object_pool_indicator.risk = Risk::Low;
        }
        self.indicators.push(object_pool_indicator.clone());
        object_pool_indicator
    }

    /// Checks for the specific child streams the extraction policy looks
    /// for (`\1Ole10Native`, `Package`, `CONTENTS`) anywhere in the file,
    /// walking every storage rather than just the root.
    pub fn check_embedded_object_streams(&mut self) -> Indicator {
        let interesting = ["\u{1}Ole10Native", "Package", "CONTENTS", "EmbeddedOdf"];
        let hit_count = self
            .ole
            .list_streams()
            .iter()
            .filter(|name| interesting.iter().any(|i| i.eq_ignore_ascii_case(name)))
            .count();

        let mut indicator = Indicator::new(
            "EmbeddedObjects",
            Some("0"),
            "Int",
            Some("Embedded Objects"),
            Some("Number of streams found that the extraction policy recognizes as embedded-object carriers."),
            Risk::None,
            false,
        );
        if hit_count > 0 {
            indicator.value = Some(hit_count.to_string());
            indicator.risk = Risk::Low;
        }
        self.indicators.push(indicator.clone());
        indicator
    }

    /// Checks whether this file contains Flash objects: scans every stream
    /// for the `FWS`/`CWS` SWF magic.
    pub fn check_flash(&mut self) -> Indicator {
        let found = self
            .ole
            .list_streams()
            .iter()
            .filter(|name| {
                self.ole
                    .open_stream(&[name.as_str()])
                    .map(|data| detect_flash(&data))
                    .unwrap_or(false)
            })
            .count();

        let mut flash_indicator = Indicator::new(
            "Flash",
            Some("0"),
            "Int",
            Some("Flash Objects"),
            Some("Number of streams containing an embedded Flash (SWF) signature. Not 100% accurate, there may be false positives."),
            Risk::None,
            false,
        );
        if found > 0 {
            flash_indicator.value = Some(found.to_string());
            flash_indicator.risk = Risk::Medium;
        }
        self.indicators.push(flash_indicator.clone());
        flash_indicator
    }

    /// Returns an indicator if present (or `None`).
    pub fn get_indicator(&self, indicator_id: &str) -> Option<Indicator> {
        self.indicators
            .iter()
            .find(|indicator| indicator.id == indicator_id)
            .cloned()
    }
}

/// SWF files start with `FWS` (uncompressed) or `CWS` (zlib-compressed).
fn detect_flash(stream_data: &[u8]) -> bool {
    stream_data.windows(3).any(|w| w == b"FWS" || w == b"CWS")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_uncompressed_swf_signature() {
        let mut data = vec![0u8; 16];
        data.extend_from_slice(b"FWS");
        data.extend_from_slice(&[1, 2, 3]);
        assert!(detect_flash(&data));
    }

    #[test]
    fn no_signature_means_no_flash() {
        assert!(!detect_flash(b"just some plain bytes"));
    }
}
