//! Runtime support for the infobuf wire format.
//!
//! A payload is little-endian and offset-addressed: it begins with a 32-bit
//! offset to the root table; each table holds a signed 32-bit back-offset to
//! its vtable (`[u16 vtable_len][u16 table_len][u16 slot]...`, zero meaning
//! absent); strings are `[u32 len][bytes][NUL]`; vectors are
//! `[u32 count][elements]`; fixed structs are inline. The [`Builder`] writes
//! payloads back to front and the [`Reader`] gives bounds-checked zero-copy
//! access to finished ones.

pub mod builder;
pub mod reader;

pub use builder::{
    field_index_to_offset, padding_bytes, Builder, SOffset, Scalar, UOffset, VOffset,
    SIZE_SOFFSET, SIZE_UOFFSET, SIZE_VOFFSET,
};
pub use reader::{Reader, TableReader};
