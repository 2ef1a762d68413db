use clap::{Arg, Command};
use log::{error, info, Level};
use ole::{extract_embedded_objects, CompoundFile, ExtractedObject, ObjectType};
use simple_logger::init_with_level;
use std::fs;
use std::process::exit;

fn main() {
    init_with_level(Level::Info).unwrap();

    let matches = Command::new("olecli")
        .about("Interactive inspector for OLE compound files: list streams/storages, extract embedded objects, toggle workbook visibility.")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .subcommand(
            Command::new("list")
                .about("List every stream and storage in the file")
                .arg(Arg::new("file").long("file").short('f').takes_value(true).required(true)),
        )
        .subcommand(
            Command::new("extract")
                .about("Run the extraction policy against a storage node and write the result")
                .arg(Arg::new("file").long("file").short('f').takes_value(true).required(true))
                .arg(
                    Arg::new("storage")
                        .long("storage")
                        .short('s')
                        .takes_value(true)
                        .help("Slash-separated storage path to extract from (default: root)"),
                )
                .arg(Arg::new("out").long("out").short('o').takes_value(true).required(true)),
        )
        .subcommand(
            Command::new("unhide-workbook")
                .about("Clear the hidden-window bit of a Workbook/WorkBook stream and save")
                .arg(Arg::new("file").long("file").short('f').takes_value(true).required(true))
                .arg(Arg::new("out").long("out").short('o').takes_value(true).required(true)),
        )
        .get_matches();

    let result = match matches.subcommand() {
        Some(("list", sub)) => run_list(sub.value_of("file").unwrap()),
        Some(("extract", sub)) => run_extract(
            sub.value_of("file").unwrap(),
            sub.value_of("storage"),
            sub.value_of("out").unwrap(),
        ),
        Some(("unhide-workbook", sub)) => {
            run_unhide_workbook(sub.value_of("file").unwrap(), sub.value_of("out").unwrap())
        }
        _ => unreachable!("clap enforces subcommand_required"),
    };

    if let Err(e) = result {
        error!("{}", e);
        exit(1);
    }
}

fn open(path: &str) -> ole::Result<CompoundFile> {
    let bytes = fs::read(path)?;
    CompoundFile::open_blocking(bytes)
}

fn run_list(path: &str) -> ole::Result<()> {
    let file = open(path)?;
    file.visit_entries(true, |entry| {
        let kind = match entry.object_type() {
            ObjectType::RootStorage => "root",
            ObjectType::Storage => "storage",
            ObjectType::Stream => "stream",
        };
        println!("{:<8} {}", kind, entry.name());
    })?;
    Ok(())
}

fn run_extract(path: &str, storage: Option<&str>, out_dir: &str) -> ole::Result<()> {
    let mut file = open(path)?;
    let storage_segments: Vec<&str> = storage
        .map(|s| s.split('/').filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();

    match extract_embedded_objects(&mut file, &storage_segments, None)? {
        Some(ExtractedObject::Bytes { file_name, data })
        | Some(ExtractedObject::CompoundFile { file_name, data }) => {
            let out_path = format!("{}/{}", out_dir.trim_end_matches('/'), file_name);
            fs::write(&out_path, &data)?;
            info!("Extracted {} ({} bytes)", out_path, data.len());
        }
        None => info!("No embedded object found under that storage"),
    }
    Ok(())
}

fn run_unhide_workbook(path: &str, out_path: &str) -> ole::Result<()> {
    let mut file = open(path)?;
    let stream_name = if file.exists_stream(&["Workbook"])? {
        "Workbook"
    } else {
        "WorkBook"
    };
    ole::set_workbook_visibility(&mut file, &[stream_name])?;
    let data = file.save()?;
    fs::write(out_path, &data)?;
    info!("Wrote unhidden workbook to {}", out_path);
    Ok(())
}
