use log::{debug, error, info};
use ole::{extract_embedded_objects, CompoundFile, ExtractedObject};
use std::fs;
use std::path::Path;

/// Finds and extracts embedded objects from the given file, writing any
/// hits next to the input file with a `<sane-name>_<embedded-name>` name.
pub fn process_file(filepath: &str) {
    println!("{}", vec!["-"; 79].join(""));
    println!("File: {}", filepath);

    let bytes = match fs::read(filepath) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("Could not read {}: {}", filepath, e);
            return;
        }
    };

    let mut file = match CompoundFile::open_blocking(bytes) {
        Ok(file) => file,
        Err(e) => {
            error!("Open failed: {} (or its data) is not an OLE file: {}", filepath, e);
            return;
        }
    };

    let sane_filename = sanitize_filepath(filepath);

    // The root storage itself, plus every top-level storage (the common
    // ObjectPool-nesting case a PowerPoint/Word host document carries its
    // embedded objects under) are each a candidate extraction site.
    let mut candidate_paths: Vec<Vec<String>> = vec![vec![]];
    for storage_name in list_top_level_storages(&file) {
        candidate_paths.push(vec![storage_name]);
    }

    for path in candidate_paths {
        let path_refs: Vec<&str> = path.iter().map(String::as_str).collect();
        extract_one(&mut file, &path_refs, &sane_filename);
    }
}

fn list_top_level_storages(file: &CompoundFile) -> Vec<String> {
    let mut names = Vec::new();
    let _ = file.visit_entries(false, |entry| {
        if entry.object_type() != ole::ObjectType::Stream {
            names.push(entry.name().to_string());
        }
    });
    names
}

fn extract_one(file: &mut CompoundFile, storage_path: &[&str], sane_filename: &str) {
    match extract_embedded_objects(file, storage_path, None) {
        Ok(Some(object)) => {
            let (file_name, data) = match object {
                ExtractedObject::Bytes { file_name, data } => (file_name, data),
                ExtractedObject::CompoundFile { file_name, data } => (file_name, data),
            };
            let out_name = format!("{}_{}", sane_filename, sanitize_filepath(&file_name));
            info!("Extracting embedded object from storage {:?} to {}", storage_path, out_name);
            if let Err(e) = fs::write(&out_name, &data) {
                error!("Failed to write {}: {}", out_name, e);
            } else {
                println!("Saved to file {}", out_name);
            }
        }
        Ok(None) => debug!("No embedded object found under storage {:?}", storage_path),
        Err(e) => error!("Extraction under storage {:?} failed: {}", storage_path, e),
    }
}

/// Return filename that is safe to work with.
/// Removes path components, replaces `..`, and strips directory separators.
fn sanitize_filepath(filepath: &str) -> String {
    let base_name = Path::new(filepath)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| filepath.to_string());
    base_name.replace("..", ".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_directory_and_double_dots() {
        assert_eq!(sanitize_filepath("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filepath("report..docx"), "report.docx");
    }
}
