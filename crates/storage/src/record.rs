use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

/// A record with a fixed on-disk width, encoded little-endian — the unit of
/// storage for [`crate::paged_file::PagedFile`].
pub trait FixedSizeRecord: Sized + Clone {
    const ENCODED_LEN: usize;

    fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()>;
    fn read_from<R: Read>(r: &mut R) -> io::Result<Self>;
}

/// A small, fixed-width scalar usable as a B+-tree key or value (§4.5). The
/// source hashes long strings down to 64-bit integers to keep tree nodes
/// small (§9, "Hash-keyed B+-trees") and composes pairs of such integers for
/// two-part keys (e.g. `byPair`); both cases are covered by implementations
/// of this trait for integers and for `(A, B)` tuples.
pub trait Codec: Sized + Copy + Ord + Default {
    const WIDTH: usize;
    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()>;
    fn decode<R: Read>(r: &mut R) -> io::Result<Self>;
}

/// Supplies the caller-provided sentinel that always sorts greater than any
/// real key, stored as the last key of the B+-tree root (§4.5.1, GLOSSARY).
pub trait Bounded: Codec {
    const MAX: Self;
}

impl Codec for u64 {
    const WIDTH: usize = 8;
    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u64::<LittleEndian>(*self)
    }
    fn decode<R: Read>(r: &mut R) -> io::Result<Self> {
        r.read_u64::<LittleEndian>()
    }
}
impl Bounded for u64 {
    const MAX: Self = u64::MAX;
}

impl Codec for i64 {
    const WIDTH: usize = 8;
    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_i64::<LittleEndian>(*self)
    }
    fn decode<R: Read>(r: &mut R) -> io::Result<Self> {
        r.read_i64::<LittleEndian>()
    }
}
impl Bounded for i64 {
    const MAX: Self = i64::MAX;
}

impl Codec for u16 {
    const WIDTH: usize = 2;
    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u16::<LittleEndian>(*self)
    }
    fn decode<R: Read>(r: &mut R) -> io::Result<Self> {
        r.read_u16::<LittleEndian>()
    }
}
impl Bounded for u16 {
    const MAX: Self = u16::MAX;
}

impl Codec for i32 {
    const WIDTH: usize = 4;
    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_i32::<LittleEndian>(*self)
    }
    fn decode<R: Read>(r: &mut R) -> io::Result<Self> {
        r.read_i32::<LittleEndian>()
    }
}
impl Bounded for i32 {
    const MAX: Self = i32::MAX;
}

impl Codec for u32 {
    const WIDTH: usize = 4;
    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u32::<LittleEndian>(*self)
    }
    fn decode<R: Read>(r: &mut R) -> io::Result<Self> {
        r.read_u32::<LittleEndian>()
    }
}
impl Bounded for u32 {
    const MAX: Self = u32::MAX;
}

impl<A: Codec, B: Codec> Codec for (A, B) {
    const WIDTH: usize = A::WIDTH + B::WIDTH;
    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        self.0.encode(w)?;
        self.1.encode(w)
    }
    fn decode<R: Read>(r: &mut R) -> io::Result<Self> {
        let a = A::decode(r)?;
        let b = B::decode(r)?;
        Ok((a, b))
    }
}
impl<A: Bounded, B: Bounded> Bounded for (A, B) {
    const MAX: Self = (A::MAX, B::MAX);
}
