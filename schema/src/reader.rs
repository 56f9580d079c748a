//! Read-side of the infobuf wire format.
//!
//! All accessors are bounds-checked and alias the underlying byte slice;
//! nothing is copied except strings containing invalid UTF-8.
//!
//! Example usage:
//!
//! ```
//! use std::borrow::Cow;
//! let reader = infobuf_schema::Reader::new(&[2, 0, 0, 0, 104, 105, 0, 0]);
//! assert_eq!(reader.string_at(0), Ok(Cow::Borrowed("hi")));
//! ```

use std::borrow::Cow;

use crate::builder::Scalar;

/// A finished payload wrapped for reading. Positions are absolute byte
/// offsets from the start of the slice.
#[derive(Clone, Copy)]
pub struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Reader<'a> {
        Reader { buf }
    }

    pub fn data(&self) -> &'a [u8] {
        self.buf
    }

    /// Read one little-endian scalar at `pos`.
    pub fn read<T: Scalar>(&self, pos: usize) -> Result<T, ()> {
        match self.buf.get(pos..pos + T::SIZE) {
            Some(bytes) => Ok(T::read_le(bytes)),
            None => Err(()),
        }
    }

    /// Absolute position of the root table.
    pub fn root(&self) -> Result<usize, ()> {
        Ok(self.read::<u32>(0)? as usize)
    }

    /// Follow the relative offset stored at `pos`.
    pub fn indirect(&self, pos: usize) -> Result<usize, ()> {
        let off = self.read::<u32>(pos)? as usize;
        let target = pos.checked_add(off).ok_or(())?;
        if target > self.buf.len() {
            return Err(());
        }
        Ok(target)
    }

    /// Read the `[len][bytes][NUL]` string whose length word is at `pos`.
    pub fn string_at(&self, pos: usize) -> Result<Cow<'a, str>, ()> {
        let len = self.read::<u32>(pos)? as usize;
        let start = pos + 4;
        match self.buf.get(start..start + len) {
            Some(bytes) => Ok(String::from_utf8_lossy(bytes)),
            None => Err(()),
        }
    }

    /// Element count and position of the first element of the vector whose
    /// length word is at `pos`.
    pub fn vector_at(&self, pos: usize) -> Result<(usize, usize), ()> {
        let len = self.read::<u32>(pos)? as usize;
        Ok((len, pos + 4))
    }

    /// View the table whose header is at `pos`.
    pub fn table_at(&self, pos: usize) -> TableReader<'a> {
        TableReader { reader: *self, pos }
    }
}

/// One table within a payload: header position plus vtable-indexed field
/// lookup.
#[derive(Clone, Copy)]
pub struct TableReader<'a> {
    reader: Reader<'a>,
    pos: usize,
}

impl<'a> TableReader<'a> {
    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn reader(&self) -> Reader<'a> {
        self.reader
    }

    /// Absolute position of the field stored in `slot`, or `None` when the
    /// slot is absent from this table's vtable.
    pub fn field(&self, slot: u16) -> Result<Option<usize>, ()> {
        let back_offset = self.reader.read::<i32>(self.pos)?;
        let vtable = self.pos as i64 - back_offset as i64;
        if vtable < 0 {
            return Err(());
        }
        let vtable = vtable as usize;
        let vtable_len = self.reader.read::<u16>(vtable)?;
        if slot >= vtable_len {
            return Ok(None);
        }
        let entry = self.reader.read::<u16>(vtable + slot as usize)?;
        if entry == 0 {
            Ok(None)
        } else {
            Ok(Some(self.pos + entry as usize))
        }
    }

    /// Read the scalar in `slot`, or `None` when it was elided.
    pub fn scalar<T: Scalar>(&self, slot: u16) -> Result<Option<T>, ()> {
        match self.field(slot)? {
            Some(pos) => Ok(Some(self.reader.read::<T>(pos)?)),
            None => Ok(None),
        }
    }

    /// Follow the offset field in `slot` to its target position.
    pub fn indirect(&self, slot: u16) -> Result<Option<usize>, ()> {
        match self.field(slot)? {
            Some(pos) => Ok(Some(self.reader.indirect(pos)?)),
            None => Ok(None),
        }
    }
}
