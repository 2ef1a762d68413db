use crate::{
    encryption::{DocumentType, EncryptionHandler},
    OleFile,
};

/// OOXML (`.docx`/`.xlsx`/`.pptx`) encryption is detected by the presence of
/// an `EncryptionInfo` stream inside the outer OLE wrapper these containers
/// use when protected; decoding that stream's Agile/Standard encryption
/// descriptor is out of scope (only legacy BIFF8 RC4 is
/// decrypted).
pub(crate) struct OpenOfficeXmlEncryptionHandler<'a> {
    _ole_file: &'a OleFile,
    _stream_name: String,
}

impl<'a> EncryptionHandler<'a> for OpenOfficeXmlEncryptionHandler<'a> {
    fn doc_type(&self) -> DocumentType {
        DocumentType::Ooxml
    }

    fn is_encrypted(&self) -> bool {
        // Presence of EncryptionInfo is itself the encrypted signal; there is
        // no plaintext/encrypted distinction to make without decoding it.
        true
    }

    fn new(ole_file: &'a OleFile, stream_name: String) -> Self {
        Self {
            _ole_file: ole_file,
            _stream_name: stream_name,
        }
    }
}
