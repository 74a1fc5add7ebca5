//! Little-endian cursor over a byte slice, and the matching writers.

use std::mem::size_of;

use uuid::Uuid;

use crate::buffer::string::BvrString;
use crate::math::{Quat, Vec3};
use crate::scene::transform::Transform;

/// Length of a hyphenated uuid as stored on disk
pub const UUID_TEXT_LEN: usize = 36;

/// Read failure: where it happened and what was wrong
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    Truncated { offset: usize, needed: usize },
    Invalid { offset: usize, what: &'static str },
}

pub type DecodeResult<T> = Result<T, DecodeError>;

/// Reads from the front of a slice. Offsets in errors and
/// [`ByteReader::position`] are absolute within the outermost buffer.
pub struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
    base: usize,
}

macro_rules! read_le_bytes {
    ($($m:ident($t:ident),)*) => {$(
        pub fn $m(&mut self) -> DecodeResult<$t> {
            let buf: [u8; size_of::<$t>()] = self.array()?;
            Ok($t::from_le_bytes(buf))
        }
    )*};
}

impl<'a> ByteReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0, base: 0 }
    }

    pub fn position(&self) -> usize {
        self.base + self.pos
    }

    /// Split off the next `len` bytes as their own reader.
    pub fn sub_reader(&mut self, len: usize) -> DecodeResult<ByteReader<'a>> {
        let base = self.position();
        let bytes = self.take(len)?;
        Ok(ByteReader { bytes, pos: 0, base })
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn take(&mut self, len: usize) -> DecodeResult<&'a [u8]> {
        if self.remaining() < len {
            return Err(DecodeError::Truncated { offset: self.position(), needed: len });
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> DecodeResult<[u8; N]> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.take(N)?);
        Ok(buf)
    }

    read_le_bytes!(
        read_u8(u8),
        read_u16(u16),
        read_u32(u32),
        read_f32(f32),
    );

    pub fn read_string(&mut self) -> DecodeResult<BvrString> {
        let offset = self.position();
        match BvrString::read_from(&self.bytes[self.pos..]) {
            Some((string, used)) => {
                self.pos += used;
                Ok(string)
            }
            None => Err(DecodeError::Truncated { offset, needed: 2 }),
        }
    }

    pub fn read_uuid(&mut self) -> DecodeResult<Uuid> {
        let offset = self.position();
        let text = self.take(UUID_TEXT_LEN)?;
        std::str::from_utf8(text)
            .ok()
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or(DecodeError::Invalid { offset, what: "uuid" })
    }

    pub fn read_vec3(&mut self) -> DecodeResult<Vec3> {
        Ok(Vec3::new(self.read_f32()?, self.read_f32()?, self.read_f32()?))
    }

    /// position, scale, rotation (x y z w)
    pub fn read_transform(&mut self) -> DecodeResult<Transform> {
        let position = self.read_vec3()?;
        let scale = self.read_vec3()?;
        let rotation = Quat::new(self.read_f32()?, self.read_f32()?, self.read_f32()?, self.read_f32()?);
        Ok(Transform::new(position, scale, rotation))
    }
}

pub fn write_u8(out: &mut Vec<u8>, v: u8) {
    out.push(v);
}

pub fn write_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_le_bytes());
}

pub fn write_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

pub fn write_f32(out: &mut Vec<u8>, v: f32) {
    out.extend_from_slice(&v.to_le_bytes());
}

pub fn write_uuid(out: &mut Vec<u8>, id: &Uuid) {
    out.extend_from_slice(id.hyphenated().to_string().as_bytes());
}

pub fn write_vec3(out: &mut Vec<u8>, v: Vec3) {
    write_f32(out, v.x);
    write_f32(out, v.y);
    write_f32(out, v.z);
}

pub fn write_transform(out: &mut Vec<u8>, t: &Transform) {
    write_vec3(out, t.position);
    write_vec3(out, t.scale);
    for c in [t.rotation.x, t.rotation.y, t.rotation.z, t.rotation.w] {
        write_f32(out, c);
    }
}
