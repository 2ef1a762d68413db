//! Extraction policy (C9): given a storage node, find the single embedded
//! object it carries and produce its bytes under a decided filename.

use crate::compound_file::serialize_compound_file;
use crate::directory::{DirectoryEntry, ObjectType};
use crate::records::{decode_ole10_native, Ole10NativeOutcome};
use crate::workbook::set_workbook_visibility;
use crate::{CompoundFile, Result};
use std::collections::HashMap;

const FALLBACK_NAME: &str = "Embedded object";
const DOCUMENT_OLE_PREFIX: &str = "%DocumentOle:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractedObject {
    /// Raw bytes to write under `file_name`.
    Bytes { file_name: String, data: Vec<u8> },
    /// A freshly re-serialized compound file to write under `file_name`.
    CompoundFile { file_name: String, data: Vec<u8> },
}

/// Walks the priority-ordered list of child streams a storage node might
/// carry and extracts the first match. Returns `Ok(None)` rather than an
/// error when the node simply doesn't carry an embedded object.
pub fn extract_embedded_objects(
    file: &mut CompoundFile,
    storage_path: &[&str],
    preferred_filename: Option<&str>,
) -> Result<Option<ExtractedObject>> {
    if file.exists_stream(&append(storage_path, "CONTENTS"))? {
        let data = file.get_stream(&append(storage_path, "CONTENTS"))?;
        let file_name = contents_file_name(&data, preferred_filename);
        return Ok(Some(ExtractedObject::Bytes { file_name, data }));
    }

    if file.exists_stream(&append(storage_path, "Package"))? {
        let data = file.get_stream(&append(storage_path, "Package"))?;
        let file_name = preferred_filename.unwrap_or(FALLBACK_NAME).to_string();
        return Ok(Some(ExtractedObject::Bytes { file_name, data }));
    }

    if file.exists_stream(&append(storage_path, "EmbeddedOdf"))? {
        let data = file.get_stream(&append(storage_path, "EmbeddedOdf"))?;
        let file_name = preferred_filename.unwrap_or(FALLBACK_NAME).to_string();
        return Ok(Some(ExtractedObject::Bytes { file_name, data }));
    }

    if file.exists_stream(&append(storage_path, "\u{1}Ole10Native"))? {
        let native_path = append(storage_path, "\u{1}Ole10Native");
        let comp_obj_path = append(storage_path, "\u{1}CompObj");
        let ole10_native = file.get_stream(&native_path)?;
        let comp_obj = file.try_get_stream(&comp_obj_path)?;
        return match decode_ole10_native(comp_obj.as_deref(), &ole10_native)? {
            Ole10NativeOutcome::Extract { file_name, data } => {
                Ok(Some(ExtractedObject::Bytes { file_name, data }))
            }
            Ole10NativeOutcome::Skip => Ok(None),
        };
    }

    if file.exists_stream(&append(storage_path, "WordDocument"))? {
        let file_name = preferred_filename
            .unwrap_or("Embedded Word document.doc")
            .to_string();
        let data = reserialize_subtree(file, storage_path)?;
        return Ok(Some(ExtractedObject::CompoundFile { file_name, data }));
    }

    if file.exists_stream(&append(storage_path, "Workbook"))?
        || file.exists_stream(&append(storage_path, "WorkBook"))?
    {
        let workbook_name = if file.exists_stream(&append(storage_path, "Workbook"))? {
            "Workbook"
        } else {
            "WorkBook"
        };
        set_workbook_visibility(file, &append(storage_path, workbook_name))?;
        let file_name = preferred_filename
            .unwrap_or("Embedded Excel document.xls")
            .to_string();
        let data = reserialize_subtree(file, storage_path)?;
        return Ok(Some(ExtractedObject::CompoundFile { file_name, data }));
    }

    if file.exists_stream(&append(storage_path, "PowerPoint Document"))? {
        let file_name = preferred_filename
            .unwrap_or("Embedded PowerPoint document.ppt")
            .to_string();
        let data = reserialize_subtree(file, storage_path)?;
        return Ok(Some(ExtractedObject::CompoundFile { file_name, data }));
    }

    Ok(None)
}

fn append<'a>(path: &[&'a str], last: &'a str) -> Vec<&'a str> {
    let mut owned: Vec<&str> = path.to_vec();
    owned.push(last);
    owned
}

fn contents_file_name(data: &[u8], preferred_filename: Option<&str>) -> String {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Some(rest) = text.strip_prefix(DOCUMENT_OLE_PREFIX) {
            if let Some(end) = rest.find('%') {
                return rest[..end].to_string();
            }
        }
    }
    preferred_filename.unwrap_or(FALLBACK_NAME).to_string()
}

/// Copies every storage and stream under `storage_path` into a freshly
/// built standalone compound file, preserving names, CLSIDs, timestamps,
/// and stream bytes; sibling/child links are renumbered to a contiguous
/// index space rooted at a brand-new `Root Entry`.
fn reserialize_subtree(file: &CompoundFile, storage_path: &[&str]) -> Result<Vec<u8>> {
    let storage = if storage_path.is_empty() {
        file.root()?.clone()
    } else {
        file.get_storage(storage_path)?.clone()
    };
    let all_entries = file.directory_entries();

    let mut order: Vec<u32> = Vec::new();
    if let Some(child) = storage.child_id {
        collect_subtree(all_entries, child, &mut order);
    }

    let mut old_to_new: HashMap<u32, usize> = HashMap::new();
    for (position, &old_index) in order.iter().enumerate() {
        old_to_new.insert(old_index, position + 1);
    }
    let remap = |id: Option<u32>| id.and_then(|old| old_to_new.get(&old).map(|&n| n as u32));

    let mut new_entries = Vec::with_capacity(order.len() + 1);
    let mut root = storage.clone();
    root.index = 0;
    root.object_type = ObjectType::RootStorage;
    root.name = "Root Entry".to_string();
    root.left_sibling_id = None;
    root.right_sibling_id = None;
    root.child_id = remap(storage.child_id);
    new_entries.push(root);

    let mut stream_data = HashMap::new();
    for (position, &old_index) in order.iter().enumerate() {
        let original = &all_entries[old_index as usize];
        let mut entry = original.clone();
        entry.index = position + 1;
        entry.left_sibling_id = remap(original.left_sibling_id);
        entry.right_sibling_id = remap(original.right_sibling_id);
        entry.child_id = remap(original.child_id);
        if entry.object_type == ObjectType::Stream {
            let data = file.stream_data_for_entry(original)?;
            stream_data.insert(position + 1, data);
        }
        new_entries.push(entry);
    }

    serialize_compound_file(file.header_template(), new_entries, &stream_data)
}

fn collect_subtree(entries: &[DirectoryEntry], node: u32, out: &mut Vec<u32>) {
    out.push(node);
    let entry = &entries[node as usize];
    if let Some(left) = entry.left_sibling_id {
        collect_subtree(entries, left, out);
    }
    if let Some(right) = entry.right_sibling_id {
        collect_subtree(entries, right, out);
    }
    if entry.object_type != ObjectType::Stream {
        if let Some(child) = entry.child_id {
            collect_subtree(entries, child, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contents_prefix_is_stripped_into_file_name() {
        let data = b"%DocumentOle:report.xlsx%rest of the payload".to_vec();
        assert_eq!(contents_file_name(&data, None), "report.xlsx");
    }

    #[test]
    fn falls_back_to_preferred_or_default_name() {
        let data = b"just raw bytes".to_vec();
        assert_eq!(contents_file_name(&data, Some("custom.bin")), "custom.bin");
        assert_eq!(contents_file_name(&data, None), FALLBACK_NAME);
    }
}
