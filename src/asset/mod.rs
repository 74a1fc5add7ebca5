//! Persisted state
//!
//! - `registry`: asset paths registered with the engine
//! - `book_file`: the `.bvrb` binary scene metadata file

mod codec;
pub mod book_file;
pub mod registry;

pub use book_file::{read_book, write_book, ActorRecord, BookData, BookError, BOOK_MAGIC};
pub use codec::DecodeError;
pub use registry::{AssetError, AssetRecord, AssetRegistry, OpenMode};
