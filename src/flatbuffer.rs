//! Minimal FlatBuffers accessor.
//!
//! Reads tables, vectors and strings out of a FlatBuffers buffer by vtable
//! slot, using a hand-written reader (no generated code). Every offset is
//! checked against the buffer, so a corrupt offset table surfaces as
//! [`Error::UnexpectedEof`] or [`Error::InvalidFileStructure`] instead of a
//! panic.

use std::borrow::Cow;
use std::marker::PhantomData;

use crate::error::Error;

/// Size of a `uoffset_t` in bytes.
const SIZE_UOFFSET: usize = 4;

/// Little-endian scalar that can be stored inline in a table or vector.
pub trait Scalar: Sized + Copy + 'static {
    const SIZE: usize;
    fn from_le_slice(bytes: &[u8]) -> Self;
}

macro_rules! impl_scalar {
    ($t:ty) => {
        impl Scalar for $t {
            const SIZE: usize = std::mem::size_of::<$t>();
            fn from_le_slice(bytes: &[u8]) -> Self {
                let mut raw = [0u8; std::mem::size_of::<$t>()];
                raw.copy_from_slice(bytes);
                <$t>::from_le_bytes(raw)
            }
        }
    };
}

impl_scalar!(u8);
impl_scalar!(i8);
impl_scalar!(u16);
impl_scalar!(i16);
impl_scalar!(u32);
impl_scalar!(i32);
impl_scalar!(u64);
impl_scalar!(i64);
impl_scalar!(f32);
impl_scalar!(f64);

impl Scalar for bool {
    const SIZE: usize = 1;
    fn from_le_slice(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }
}

fn read_bytes(buf: &[u8], pos: usize, len: usize) -> Result<&[u8], Error> {
    let end = pos.checked_add(len).ok_or(Error::UnexpectedEof)?;
    buf.get(pos..end).ok_or(Error::UnexpectedEof)
}

fn read_scalar<T: Scalar>(buf: &[u8], pos: usize) -> Result<T, Error> {
    Ok(T::from_le_slice(read_bytes(buf, pos, T::SIZE)?))
}

/// Follows the `uoffset_t` stored at `pos`, returning the absolute target.
fn follow(buf: &[u8], pos: usize) -> Result<usize, Error> {
    let offset = read_scalar::<u32>(buf, pos)? as usize;
    let target = pos.checked_add(offset).ok_or(Error::UnexpectedEof)?;
    if target >= buf.len() {
        return Err(Error::UnexpectedEof);
    }
    Ok(target)
}

/// Returns true if the 4-byte file identifier after the root offset matches.
pub fn buffer_has_identifier(buf: &[u8], identifier: &[u8; 4]) -> bool {
    buf.get(SIZE_UOFFSET..SIZE_UOFFSET * 2) == Some(&identifier[..])
}

/// A table inside a FlatBuffers buffer.
#[derive(Clone, Copy, Debug)]
pub struct Table<'a> {
    buf: &'a [u8],
    loc: usize,
}

impl<'a> Table<'a> {
    /// Resolves the root table of `buf`.
    pub fn root(buf: &'a [u8]) -> Result<Self, Error> {
        let loc = follow(buf, 0)?;
        Ok(Self { buf, loc })
    }

    fn vtable(&self) -> Result<usize, Error> {
        let soffset = read_scalar::<i32>(self.buf, self.loc)? as i64;
        let vtable = self.loc as i64 - soffset;
        if vtable < 0 || vtable as usize >= self.buf.len() {
            return Err(Error::InvalidFileStructure(format!(
                "vtable for table at {} lies outside the buffer",
                self.loc
            )));
        }
        Ok(vtable as usize)
    }

    /// Absolute position of the field in `slot`, or `None` when absent.
    fn field(&self, slot: u16) -> Result<Option<usize>, Error> {
        let vtable = self.vtable()?;
        let vtable_len = read_scalar::<u16>(self.buf, vtable)?;
        if slot >= vtable_len {
            return Ok(None);
        }
        let offset = read_scalar::<u16>(self.buf, vtable + slot as usize)?;
        if offset == 0 {
            return Ok(None);
        }
        Ok(Some(self.loc + offset as usize))
    }

    /// Reads an inline scalar, falling back to the schema default.
    pub fn get<T: Scalar>(&self, slot: u16, default: T) -> Result<T, Error> {
        match self.field(slot)? {
            Some(pos) => read_scalar(self.buf, pos),
            None => Ok(default),
        }
    }

    /// Reads a string field. Invalid UTF-8 is replaced rather than rejected.
    pub fn get_str(&self, slot: u16) -> Result<Option<Cow<'a, str>>, Error> {
        let Some(bytes) = self.get_vector::<u8>(slot)? else {
            return Ok(None);
        };
        let text = String::from_utf8_lossy(bytes.as_bytes());
        if let Cow::Owned(ref lossy) = text {
            tracing::warn!("invalid UTF-8 in string field, decoded as '{}'", lossy);
        }
        Ok(Some(text))
    }

    pub fn get_table(&self, slot: u16) -> Result<Option<Table<'a>>, Error> {
        match self.field(slot)? {
            Some(pos) => Ok(Some(Table {
                buf: self.buf,
                loc: follow(self.buf, pos)?,
            })),
            None => Ok(None),
        }
    }

    /// Start of the element data and element count of the vector in `slot`.
    /// The whole element range is validated up front.
    fn vector_range(&self, slot: u16, element_size: usize) -> Result<Option<(usize, usize)>, Error> {
        let Some(pos) = self.field(slot)? else {
            return Ok(None);
        };
        let start = follow(self.buf, pos)?;
        let len = read_scalar::<u32>(self.buf, start)? as usize;
        let byte_len = len.checked_mul(element_size).ok_or(Error::UnexpectedEof)?;
        read_bytes(self.buf, start + SIZE_UOFFSET, byte_len)?;
        Ok(Some((start + SIZE_UOFFSET, len)))
    }

    pub fn get_vector<T: Scalar>(&self, slot: u16) -> Result<Option<Vector<'a, T>>, Error> {
        let Some((start, len)) = self.vector_range(slot, T::SIZE)? else {
            return Ok(None);
        };
        Ok(Some(Vector {
            data: &self.buf[start..start + len * T::SIZE],
            len,
            _marker: PhantomData,
        }))
    }

    pub fn get_tables(&self, slot: u16) -> Result<Option<Tables<'a>>, Error> {
        let Some((start, len)) = self.vector_range(slot, SIZE_UOFFSET)? else {
            return Ok(None);
        };
        Ok(Some(Tables {
            buf: self.buf,
            start,
            len,
        }))
    }
}

/// A vector of inline scalars.
#[derive(Clone, Copy, Debug)]
pub struct Vector<'a, T> {
    data: &'a [u8],
    len: usize,
    _marker: PhantomData<T>,
}

impl<'a, T: Scalar> Vector<'a, T> {
    pub fn empty() -> Self {
        Self {
            data: &[],
            len: 0,
            _marker: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, index: usize) -> Option<T> {
        if index >= self.len {
            return None;
        }
        let start = index * T::SIZE;
        Some(T::from_le_slice(&self.data[start..start + T::SIZE]))
    }

    pub fn iter(self) -> impl Iterator<Item = T> + 'a {
        self.data.chunks_exact(T::SIZE).map(T::from_le_slice)
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.data
    }
}

/// A vector of tables.
#[derive(Clone, Copy, Debug)]
pub struct Tables<'a> {
    buf: &'a [u8],
    start: usize,
    len: usize,
}

impl<'a> Tables<'a> {
    pub fn empty() -> Self {
        Self {
            buf: &[],
            start: 0,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, index: usize) -> Result<Table<'a>, Error> {
        if index >= self.len {
            return Err(Error::InvalidFileStructure(format!(
                "Table index {} out of range for vector of length {}",
                index, self.len
            )));
        }
        let pos = self.start + index * SIZE_UOFFSET;
        Ok(Table {
            buf: self.buf,
            loc: follow(self.buf, pos)?,
        })
    }

    pub fn iter(self) -> impl Iterator<Item = Result<Table<'a>, Error>> + 'a {
        (0..self.len).map(move |i| self.get(i))
    }
}
