//! Book files (`.bvrb`)
//!
//! Scene metadata save/load. All integers little-endian.
//!
//! ```text
//! "BVRB" | u32 file size
//! u32 asset stream size | u32 asset offset | asset stream bytes
//! page name (u16 length incl. NUL | bytes | NUL)
//! chunk*: u32 payload length | u16 flag | payload
//! ```
//!
//! Colliders are not stored: they are rebuilt from mesh or mask data when
//! actors are constructed.

use std::fmt;
use std::fs;
use std::path::Path;

use tracing::{debug, info};
use uuid::Uuid;

use super::codec::{
    write_f32, write_transform, write_u16, write_u32, write_u8, write_uuid, ByteReader, DecodeError,
};
use super::registry::{AssetError, AssetRegistry};
use crate::buffer::string::BvrString;
use crate::scene::actor::{Actor, ActorFlags, ActorType};
use crate::scene::camera::{Camera, CameraMode};
use crate::scene::page::Page;
use crate::scene::transform::Transform;

pub const BOOK_MAGIC: [u8; 4] = *b"BVRB";

/// Chunk flags
pub mod chunk {
    pub const CAMERA: u16 = 0x010;
    pub const ACTOR: u16 = 0x100;
}

/// Error type for book files
#[derive(Debug)]
pub enum BookError {
    Io(std::io::Error),
    BadMagic([u8; 4]),
    /// Header size disagrees with the data length
    SizeMismatch { header: u32, actual: usize },
    Decode(DecodeError),
    UnknownChunk { flag: u16, offset: usize },
    Assets(AssetError),
}

impl fmt::Display for BookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookError::Io(e) => write!(f, "IO error: {}", e),
            BookError::BadMagic(m) => write!(f, "not a book file (magic {:?})", m),
            BookError::SizeMismatch { header, actual } => {
                write!(f, "header says {} bytes, file has {}", header, actual)
            }
            BookError::Decode(DecodeError::Truncated { offset, needed }) => {
                write!(f, "truncated at byte {} (needed {} more)", offset, needed)
            }
            BookError::Decode(DecodeError::Invalid { offset, what }) => {
                write!(f, "invalid {} at byte {}", what, offset)
            }
            BookError::UnknownChunk { flag, offset } => {
                write!(f, "unknown chunk flag {:#05x} at byte {}", flag, offset)
            }
            BookError::Assets(e) => write!(f, "asset section: {}", e),
        }
    }
}

impl std::error::Error for BookError {}

impl From<std::io::Error> for BookError {
    fn from(e: std::io::Error) -> Self {
        BookError::Io(e)
    }
}

impl From<DecodeError> for BookError {
    fn from(e: DecodeError) -> Self {
        BookError::Decode(e)
    }
}

impl From<AssetError> for BookError {
    fn from(e: AssetError) -> Self {
        BookError::Assets(e)
    }
}

/// Persisted actor header (no mesh, no collider)
#[derive(Debug, Clone, PartialEq)]
pub struct ActorRecord {
    pub name: BvrString,
    pub actor_type: ActorType,
    pub id: Uuid,
    pub flags: ActorFlags,
    pub active: bool,
    pub order_in_layer: u16,
    pub transform: Transform,
}

impl ActorRecord {
    pub fn from_actor(actor: &Actor) -> Self {
        Self {
            name: actor.name.clone(),
            actor_type: actor.actor_type(),
            id: actor.id,
            flags: actor.flags,
            active: actor.active,
            order_in_layer: actor.order_in_layer,
            transform: actor.transform,
        }
    }
}

/// Everything a book file holds
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookData {
    pub page_name: BvrString,
    pub camera: Option<Camera>,
    pub actors: Vec<ActorRecord>,
    pub assets: AssetRegistry,
}

impl BookData {
    /// Snapshot a page and the asset registry.
    pub fn from_page(page: &Page, assets: &AssetRegistry) -> Self {
        Self {
            page_name: page.name.clone(),
            camera: Some(page.camera),
            actors: page.actors().map(|(_, actor)| ActorRecord::from_actor(actor)).collect(),
            assets: assets.clone(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&BOOK_MAGIC);
        write_u32(&mut out, 0); // patched below

        let stream = self.assets.as_bytes();
        write_u32(&mut out, stream.len() as u32);
        write_u32(&mut out, 0);
        out.extend_from_slice(stream);

        self.page_name.write_to(&mut out);

        if let Some(camera) = &self.camera {
            let mut payload = Vec::new();
            write_u32(&mut payload, camera.mode.as_u32());
            write_f32(&mut payload, camera.near);
            write_f32(&mut payload, camera.far);
            write_f32(&mut payload, camera.scale);
            write_transform(&mut payload, &camera.transform);
            write_chunk(&mut out, chunk::CAMERA, &payload);
        }

        for actor in &self.actors {
            let mut payload = Vec::new();
            actor.name.write_to(&mut payload);
            write_u16(&mut payload, actor.actor_type.as_u16());
            write_uuid(&mut payload, &actor.id);
            write_u32(&mut payload, actor.flags.bits());
            write_u8(&mut payload, actor.active as u8);
            write_u16(&mut payload, actor.order_in_layer);
            write_transform(&mut payload, &actor.transform);
            write_chunk(&mut out, chunk::ACTOR, &payload);
        }

        let size = out.len() as u32;
        out[4..8].copy_from_slice(&size.to_le_bytes());
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, BookError> {
        let mut r = ByteReader::new(bytes);

        let mut magic = [0u8; 4];
        magic.copy_from_slice(r.take(4)?);
        if magic != BOOK_MAGIC {
            return Err(BookError::BadMagic(magic));
        }

        // Size 0 is accepted for writers that never patch the header
        let size = r.read_u32()?;
        if size != 0 && size as usize != bytes.len() {
            return Err(BookError::SizeMismatch { header: size, actual: bytes.len() });
        }

        let stream_size = r.read_u32()? as usize;
        let _asset_offset = r.read_u32()?;
        let assets = AssetRegistry::from_stream(r.take(stream_size)?.to_vec())?;

        let page_name = r.read_string()?;

        let mut data = BookData { page_name, camera: None, actors: Vec::new(), assets };

        while !r.is_empty() {
            let offset = r.position();
            let len = r.read_u32()? as usize;
            let flag = r.read_u16()?;
            let mut p = r.sub_reader(len)?;

            match flag {
                chunk::CAMERA => {
                    let mode_offset = p.position();
                    let mode = CameraMode::from_u32(p.read_u32()?)
                        .ok_or(DecodeError::Invalid { offset: mode_offset, what: "camera mode" })?;
                    data.camera = Some(Camera {
                        mode,
                        near: p.read_f32()?,
                        far: p.read_f32()?,
                        scale: p.read_f32()?,
                        transform: p.read_transform()?,
                    });
                }
                chunk::ACTOR => {
                    let name = p.read_string()?;
                    let type_offset = p.position();
                    let actor_type = ActorType::from_u16(p.read_u16()?)
                        .ok_or(DecodeError::Invalid { offset: type_offset, what: "actor type" })?;
                    data.actors.push(ActorRecord {
                        name,
                        actor_type,
                        id: p.read_uuid()?,
                        flags: ActorFlags::from_bits(p.read_u32()?),
                        active: p.read_u8()? != 0,
                        order_in_layer: p.read_u16()?,
                        transform: p.read_transform()?,
                    });
                }
                flag => return Err(BookError::UnknownChunk { flag, offset }),
            }
        }

        debug!(page = %data.page_name, actors = data.actors.len(), "decoded book");
        Ok(data)
    }
}

fn write_chunk(out: &mut Vec<u8>, flag: u16, payload: &[u8]) {
    write_u32(out, payload.len() as u32);
    write_u16(out, flag);
    out.extend_from_slice(payload);
}

/// Write a book file, replacing any existing file.
pub fn write_book<P: AsRef<Path>>(path: P, data: &BookData) -> Result<(), BookError> {
    let bytes = data.encode();
    fs::write(path.as_ref(), &bytes)?;
    info!(path = %path.as_ref().display(), bytes = bytes.len(), "wrote book");
    Ok(())
}

pub fn read_book<P: AsRef<Path>>(path: P) -> Result<BookData, BookError> {
    let bytes = fs::read(path)?;
    BookData::decode(&bytes)
}
