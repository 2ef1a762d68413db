//! Decoders for the small binary records embedded object storages carry
//! alongside their native document streams — `\1CompObj`, `\1Ole`,
//! `\3ObjInfo`, and the `\1Ole10Native` family.

pub mod comp_obj;
pub mod obj_info;
pub mod ole10_native;
pub mod ole_stream;
pub mod object_v10;
pub mod package;

pub use comp_obj::{CompObjStream, FormatInfo};
pub use obj_info::ObjInfoStream;
pub use ole10_native::{decode as decode_ole10_native, Ole10NativeOutcome};
pub use ole_stream::{LinkedObjectInfo, MonikerStream, OleLinkKind, OleStream};
pub use object_v10::{
    ClipboardPayload, EmbeddedFile, LinkedObject, ObjectHeader, ObjectV10, ObjectV10Format,
    Presentation,
};
pub use package::{Package, PackageFormat};
