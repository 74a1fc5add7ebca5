//! Asset registry
//!
//! Registered asset paths are kept as a flat byte stream so it can be
//! written into a book file as-is. One record per asset:
//!
//! ```text
//! uuid (36 bytes, hyphenated text) | u16 path length | path bytes + NUL | u8 open mode
//! ```

use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use super::codec::{write_u8, write_uuid, ByteReader, DecodeError};
use crate::buffer::string::BvrString;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OpenMode {
    #[default]
    Read,
    Write,
}

impl OpenMode {
    pub fn as_u8(self) -> u8 {
        match self {
            OpenMode::Read => 1,
            OpenMode::Write => 2,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(OpenMode::Read),
            2 => Some(OpenMode::Write),
            _ => None,
        }
    }
}

/// Error type for asset registration and lookup
#[derive(Debug)]
pub enum AssetError {
    /// The path does not exist on disk
    NotFound(PathBuf),
    /// The asset stream could not be parsed
    Malformed(DecodeError),
    Io(std::io::Error),
}

impl fmt::Display for AssetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetError::NotFound(p) => write!(f, "{} does not exist", p.display()),
            AssetError::Malformed(e) => write!(f, "malformed asset stream: {:?}", e),
            AssetError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for AssetError {}

impl From<std::io::Error> for AssetError {
    fn from(e: std::io::Error) -> Self {
        AssetError::Io(e)
    }
}

impl From<DecodeError> for AssetError {
    fn from(e: DecodeError) -> Self {
        AssetError::Malformed(e)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRecord {
    pub id: Uuid,
    pub path: BvrString,
    pub mode: OpenMode,
}

impl AssetRecord {
    /// Open the asset file for reading or writing, per its mode.
    pub fn open(&self) -> std::io::Result<File> {
        match self.mode {
            OpenMode::Read => File::open(self.path.as_str()),
            OpenMode::Write => File::create(self.path.as_str()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetRegistry {
    stream: Vec<u8>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopt a stream read from a book file, checking every record parses.
    pub fn from_stream(stream: Vec<u8>) -> Result<Self, AssetError> {
        let mut reader = ByteReader::new(&stream);
        while !reader.is_empty() {
            read_record(&mut reader)?;
        }
        Ok(Self { stream })
    }

    /// Raw stream bytes, as written into a book file
    pub fn as_bytes(&self) -> &[u8] {
        &self.stream
    }

    /// Register an existing file under a fresh id.
    ///
    /// Registering the same path twice returns the existing record.
    pub fn register<P: AsRef<Path>>(&mut self, path: P, mode: OpenMode) -> Result<AssetRecord, AssetError> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(path = %path.display(), "asset does not exist");
            return Err(AssetError::NotFound(path.to_path_buf()));
        }

        let path_str = path.to_string_lossy();
        if let Some(existing) = self.find(&path_str) {
            return Ok(existing);
        }

        let record = AssetRecord {
            id: Uuid::new_v4(),
            path: BvrString::new(&path_str),
            mode,
        };
        write_uuid(&mut self.stream, &record.id);
        record.path.write_to(&mut self.stream);
        write_u8(&mut self.stream, mode.as_u8());

        debug!(path = %path_str, id = %record.id, "registered asset");
        Ok(record)
    }

    /// Linear scan for a record by path.
    pub fn find(&self, path: &str) -> Option<AssetRecord> {
        self.iter().find(|record| record.path.as_str() == path)
    }

    pub fn find_by_id(&self, id: Uuid) -> Option<AssetRecord> {
        self.iter().find(|record| record.id == id)
    }

    /// Records in registration order. Stops at the first malformed record.
    pub fn iter(&self) -> impl Iterator<Item = AssetRecord> + '_ {
        let mut reader = ByteReader::new(&self.stream);
        std::iter::from_fn(move || {
            if reader.is_empty() {
                return None;
            }
            read_record(&mut reader).ok()
        })
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.stream.is_empty()
    }
}

fn read_record(reader: &mut ByteReader<'_>) -> Result<AssetRecord, DecodeError> {
    let id = reader.read_uuid()?;
    let path = reader.read_string()?;
    let offset = reader.position();
    let mode = OpenMode::from_u8(reader.read_u8()?)
        .ok_or(DecodeError::Invalid { offset, what: "asset open mode" })?;
    Ok(AssetRecord { id, path, mode })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_find() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("tiles.png");
        let b = dir.path().join("player.png");
        std::fs::write(&a, b"png").unwrap();
        std::fs::write(&b, b"png").unwrap();

        let mut registry = AssetRegistry::new();
        let ra = registry.register(&a, OpenMode::Read).unwrap();
        let rb = registry.register(&b, OpenMode::Write).unwrap();
        assert_ne!(ra.id, rb.id);
        assert_eq!(registry.len(), 2);

        let found = registry.find(&b.to_string_lossy()).unwrap();
        assert_eq!(found, rb);
        assert_eq!(registry.find_by_id(ra.id).unwrap().path, ra.path);
    }

    #[test]
    fn test_register_twice_keeps_one_record() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut registry = AssetRegistry::new();
        let first = registry.register(file.path(), OpenMode::Read).unwrap();
        let second = registry.register(file.path(), OpenMode::Read).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_missing_path_rejected() {
        let mut registry = AssetRegistry::new();
        let err = registry.register("/definitely/not/here.png", OpenMode::Read).unwrap_err();
        assert!(matches!(err, AssetError::NotFound(_)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_stream_roundtrip_and_validation() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut registry = AssetRegistry::new();
        registry.register(file.path(), OpenMode::Read).unwrap();

        let restored = AssetRegistry::from_stream(registry.as_bytes().to_vec()).unwrap();
        assert_eq!(restored, registry);

        let mut broken = registry.as_bytes().to_vec();
        broken.pop();
        assert!(matches!(AssetRegistry::from_stream(broken), Err(AssetError::Malformed(_))));
    }
}
