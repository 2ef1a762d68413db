#[derive(thiserror::Error, Debug)]
pub enum Error {
    // --- Format: the outer container is not a compound file at all. ---
    #[error("InvalidHeader => {0}")]
    OleInvalidHeader(HeaderErrorType),

    // --- CorruptFile: valid outer shape, inconsistent internals. ---
    #[error("CurrentlyUnimplemented => {0}")]
    CurrentlyUnimplemented(String),
    #[error("InvalidDirectoryEntry => {0}")]
    OleInvalidDirectoryEntry(&'static str, String),
    #[error("UnknownOrUnallocatedDirectoryEntry")]
    OleUnknownOrUnallocatedDirectoryEntry,
    #[error("UnexpectedEof => {0}")]
    OleUnexpectedEof(String),
    #[error("CorruptFile => {0}")]
    CorruptFile(String),
    #[error("SectorChainCycle => cycle detected chasing sector chain starting at {0}")]
    SectorChainCycle(u32),

    // --- NotFound: named stream/storage absent. ---
    #[error("DirectoryEntryNotFound")]
    OleDirectoryEntryNotFound,
    #[error("NotFound => {0}")]
    NotFound(String),

    // --- Disposed: handle used after owning file closed. ---
    #[error("Disposed => compound file handle used after disposal")]
    Disposed,

    // --- DuplicateItem: write path attempted to add a colliding name. ---
    #[error("DuplicateItem => {0}")]
    DuplicateItem(String),

    // --- PasswordProtected: BIFF8 FilePass present, no valid password. ---
    #[error("PasswordProtected => {0}")]
    PasswordProtected(String),

    // --- ExcelConfiguration: encryption scheme present but unsupported. ---
    #[error("ExcelConfiguration => {0}")]
    ExcelConfiguration(String),

    // --- ObjectTypeNotSupported: recognized container, unknown embedded type. ---
    #[error("ObjectTypeNotSupported => {0}")]
    ObjectTypeNotSupported(String),

    // --- FileTypeNotSupported: input is not a format the extractor handles. ---
    #[error("FileTypeNotSupported => {0}")]
    FileTypeNotSupported(String),

    // Std Errors
    #[error("StdIo => {0}")]
    StdIo(#[from] std::io::Error),
    #[error("FromUtf16 => {0}")]
    FromUtf16(#[from] std::string::FromUtf16Error),

    // Generic Error
    #[error("{0}")]
    GenericError(&'static str),
}

#[derive(thiserror::Error, Debug)]
pub enum HeaderErrorType {
    #[error("the magic number was expected but not found, found {0:?} instead")]
    WrongMagicBytes(Vec<u8>),
    #[error("tried to read {0} bytes, found {1} bytes")]
    NotEnoughBytes(usize, usize),
    #[error("ParsingLocation => {0} UnderlyingError => {1}")]
    Parsing(&'static str, String),
}
