//! Write-side of the infobuf wire format.
//!
//! The buffer grows from the high address downward: every push prepends
//! bytes, so the offsets handed out by the builder are distances from the
//! *end* of the finished buffer. Tables, vectors and strings are therefore
//! written children-first, and the 32-bit root offset is the very last thing
//! pushed, which conveniently puts it at byte 0 of the finished payload.
//!
//! Example usage:
//!
//! ```
//! let mut b = infobuf_schema::Builder::new();
//! let s = b.create_string("hi");
//! assert_eq!(s, 8);
//! assert_eq!(b.finished_data(), [2, 0, 0, 0, 104, 105, 0, 0]);
//! ```

/// Unsigned offset measured from the end of the buffer.
pub type UOffset = u32;
/// Signed back-offset from a table to its vtable.
pub type SOffset = i32;
/// Vtable slot offsets and entries.
pub type VOffset = u16;

pub const SIZE_UOFFSET: usize = 4;
pub const SIZE_SOFFSET: usize = 4;
pub const SIZE_VOFFSET: usize = 2;

/// Byte offset of a field's slot within a vtable, given its field index.
/// The first two slots hold the vtable and table byte lengths.
pub fn field_index_to_offset(index: VOffset) -> VOffset {
    (index + 2) * SIZE_VOFFSET as VOffset
}

/// Zero bytes needed after `size` to reach a multiple of `align`.
/// `align` must be a power of two.
pub fn padding_bytes(size: usize, align: usize) -> usize {
    (!size).wrapping_add(1) & (align - 1)
}

/// A little-endian primitive that can be pushed into a [`Builder`] or read
/// back by the [`Reader`](crate::Reader).
pub trait Scalar: Copy + PartialEq {
    const SIZE: usize;
    fn write_le(self, out: &mut [u8]);
    fn read_le(bytes: &[u8]) -> Self;
}

macro_rules! impl_scalar {
    ($($t:ty),*) => {$(
        impl Scalar for $t {
            const SIZE: usize = std::mem::size_of::<$t>();
            fn write_le(self, out: &mut [u8]) {
                out.copy_from_slice(&self.to_le_bytes());
            }
            fn read_le(bytes: &[u8]) -> Self {
                let mut raw = [0u8; std::mem::size_of::<$t>()];
                raw.copy_from_slice(&bytes[..std::mem::size_of::<$t>()]);
                <$t>::from_le_bytes(raw)
            }
        }
    )*};
}

impl_scalar!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

impl Scalar for bool {
    const SIZE: usize = 1;
    fn write_le(self, out: &mut [u8]) {
        out[0] = self as u8;
    }
    fn read_le(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }
}

/// One recorded table field: which vtable slot it fills and where its data
/// ended up.
#[derive(Debug, Clone, Copy)]
struct FieldLoc {
    off: UOffset,
    slot: VOffset,
}

/// A backward-growing byte buffer that assembles one payload.
pub struct Builder {
    buf: Vec<u8>,
    head: usize,
    minalign: usize,
    field_locs: Vec<FieldLoc>,
    vtables: Vec<UOffset>,
    nested: bool,
    finished: bool,
}

impl Builder {
    pub fn new() -> Builder {
        Builder::with_capacity(1024)
    }

    pub fn with_capacity(capacity: usize) -> Builder {
        Builder {
            buf: vec![0; capacity],
            head: capacity,
            minalign: 1,
            field_locs: Vec::new(),
            vtables: Vec::new(),
            nested: false,
            finished: false,
        }
    }

    /// Number of bytes written so far.
    pub fn size(&self) -> UOffset {
        (self.buf.len() - self.head) as UOffset
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// The bytes written so far, front first.
    pub fn finished_data(&self) -> &[u8] {
        &self.buf[self.head..]
    }

    /// Consume the builder and return the payload.
    pub fn data(mut self) -> Vec<u8> {
        self.buf.split_off(self.head)
    }

    fn make_space(&mut self, len: usize) {
        if len <= self.head {
            return;
        }
        let old_len = self.buf.len();
        let growth = std::cmp::max(len - self.head, std::cmp::max(old_len, 64));
        let mut grown = vec![0u8; old_len + growth];
        grown[self.head + growth..].copy_from_slice(&self.buf[self.head..]);
        self.buf = grown;
        self.head += growth;
    }

    /// Prepend `n` zero bytes.
    pub fn pad(&mut self, n: usize) {
        self.make_space(n);
        self.head -= n;
        for byte in &mut self.buf[self.head..self.head + n] {
            *byte = 0;
        }
    }

    fn track_min_align(&mut self, align: usize) {
        if align > self.minalign {
            self.minalign = align;
        }
    }

    /// Pad until the current size is a multiple of `align`.
    pub fn align(&mut self, align: usize) {
        debug_assert!(align.is_power_of_two());
        self.track_min_align(align);
        let padding = padding_bytes(self.size() as usize, align);
        self.pad(padding);
    }

    /// Pad so that `len` more bytes will end on a multiple of `align`.
    pub fn pre_align(&mut self, len: usize, align: usize) {
        debug_assert!(align.is_power_of_two());
        self.track_min_align(align);
        let padding = padding_bytes(self.size() as usize + len, align);
        self.pad(padding);
    }

    /// Prepend one naturally-aligned scalar and return its offset.
    pub fn push<T: Scalar>(&mut self, value: T) -> UOffset {
        self.align(T::SIZE);
        self.make_space(T::SIZE);
        self.head -= T::SIZE;
        value.write_le(&mut self.buf[self.head..self.head + T::SIZE]);
        self.size()
    }

    /// Prepend raw bytes with no alignment.
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.make_space(bytes.len());
        self.head -= bytes.len();
        self.buf[self.head..self.head + bytes.len()].copy_from_slice(bytes);
    }

    /// Discard the `n` most recently written bytes.
    pub fn pop_bytes(&mut self, n: usize) {
        debug_assert!(n <= self.size() as usize);
        self.head += n;
    }

    /// The `n` most recently written bytes.
    pub fn front_bytes(&self, n: usize) -> &[u8] {
        &self.buf[self.head..self.head + n]
    }

    /// Turn an offset-from-end into the relative offset a reader will follow
    /// forward from the field about to be written.
    fn refer_to(&mut self, referenced: UOffset) -> UOffset {
        self.align(SIZE_UOFFSET);
        debug_assert!(referenced <= self.size());
        self.size() + SIZE_UOFFSET as UOffset - referenced
    }

    /// Drop any slots recorded since the last table or struct started.
    pub fn clear_offsets(&mut self) {
        self.field_locs.clear();
    }

    /// Record the data-end marker of a new table and reset its slot map.
    pub fn start_table(&mut self) -> UOffset {
        debug_assert!(!self.nested);
        self.nested = true;
        self.field_locs.clear();
        self.size()
    }

    /// Push a scalar field unless it equals its declared default, recording
    /// its vtable slot when written.
    pub fn add_scalar<T: Scalar>(&mut self, slot: VOffset, value: T, default: T) {
        if value == default {
            return;
        }
        let off = self.push(value);
        self.field_locs.push(FieldLoc { off, slot });
    }

    /// Push a relative offset field. Offsets are always written.
    pub fn add_offset(&mut self, slot: VOffset, referenced: UOffset) {
        let relative = self.refer_to(referenced);
        let off = self.push::<UOffset>(relative);
        self.field_locs.push(FieldLoc { off, slot });
    }

    /// Record a slot for struct data already pushed at `position`.
    pub fn add_struct(&mut self, slot: VOffset, position: UOffset) {
        self.field_locs.push(FieldLoc { off: position, slot });
    }

    /// Close the table that began at `start`: build its vtable, share it with
    /// any identical vtable written earlier, and prepend the table header.
    /// Returns the table's offset.
    pub fn end_table(&mut self, start: UOffset, num_fields: VOffset) -> UOffset {
        debug_assert!(self.nested);
        // Header placeholder, patched once the vtable position is known.
        let table_start = self.push::<SOffset>(0);

        let mut vtable = vec![0 as VOffset; num_fields as usize + 2];
        vtable[0] = field_index_to_offset(num_fields);
        vtable[1] = (table_start - start) as VOffset;
        for loc in &self.field_locs {
            let index = (loc.slot as usize) / SIZE_VOFFSET;
            debug_assert_eq!(vtable[index], 0, "table field set twice");
            vtable[index] = (table_start - loc.off) as VOffset;
        }
        self.field_locs.clear();

        let mut serialized = Vec::with_capacity(vtable.len() * SIZE_VOFFSET);
        for entry in &vtable {
            serialized.extend_from_slice(&entry.to_le_bytes());
        }
        let mut vtable_offset = None;
        for &existing in &self.vtables {
            let pos = self.buf.len() - existing as usize;
            if pos + serialized.len() <= self.buf.len()
                && self.buf[pos..pos + serialized.len()] == serialized[..]
            {
                vtable_offset = Some(existing);
                break;
            }
        }
        let vtable_offset = match vtable_offset {
            Some(existing) => existing,
            None => {
                // Entries are pushed back to front so they read forward.
                for entry in vtable.iter().rev() {
                    self.push::<VOffset>(*entry);
                }
                let off = self.size();
                self.vtables.push(off);
                off
            }
        };

        let pos = self.buf.len() - table_start as usize;
        let back_offset = vtable_offset as SOffset - table_start as SOffset;
        self.buf[pos..pos + SIZE_SOFFSET].copy_from_slice(&back_offset.to_le_bytes());
        self.nested = false;
        table_start
    }

    /// Bracket a fixed struct. The struct's bytes are pushed between these
    /// two calls; `end_struct` returns the struct's offset.
    pub fn start_struct(&mut self, minalign: usize) -> UOffset {
        debug_assert!(!self.nested);
        self.nested = true;
        self.align(minalign);
        self.size()
    }

    pub fn end_struct(&mut self) -> UOffset {
        debug_assert!(self.nested);
        self.nested = false;
        self.size()
    }

    /// Prepend `[len][bytes][NUL]` and return the offset of the length word.
    pub fn create_string(&mut self, value: &str) -> UOffset {
        // Terminator goes in first: the buffer grows backwards.
        self.pre_align(value.len() + 1, SIZE_UOFFSET);
        self.push_bytes(&[0]);
        self.push_bytes(value.as_bytes());
        self.push::<UOffset>(value.len() as UOffset)
    }

    /// Prepare alignment for `count` elements of `elem_size` bytes. Elements
    /// are then pushed in reverse index order, followed by `end_vector`.
    pub fn start_vector(&mut self, count: usize, elem_size: usize, alignment: usize) {
        debug_assert!(!self.nested);
        self.pre_align(count * elem_size, SIZE_UOFFSET);
        self.pre_align(count * elem_size, alignment);
    }

    /// Push one offset-valued vector element, relative to its own position.
    pub fn push_offset_element(&mut self, referenced: UOffset) -> UOffset {
        let relative = self.refer_to(referenced);
        self.push::<UOffset>(relative)
    }

    /// Prepend the element count and return the vector's offset.
    pub fn end_vector(&mut self, count: usize) -> UOffset {
        self.push::<UOffset>(count as UOffset)
    }

    /// Align for the largest alignment seen and prepend the root offset.
    pub fn finish(&mut self, root: UOffset) {
        debug_assert!(!self.nested);
        let minalign = self.minalign;
        self.pre_align(SIZE_UOFFSET, minalign);
        let relative = self.refer_to(root);
        self.push::<UOffset>(relative);
        self.finished = true;
    }
}

impl Default for Builder {
    fn default() -> Builder {
        Builder::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_once(cb: fn(&mut Builder)) -> Vec<u8> {
        let mut b = Builder::new();
        cb(&mut b);
        b.data()
    }

    #[test]
    fn push_scalars_little_endian() {
        assert_eq!(build_once(|b| {
            b.push(1u8);
        }), [1]);
        assert_eq!(build_once(|b| {
            b.push(0x0102u16);
        }), [2, 1]);
        assert_eq!(build_once(|b| {
            b.push(0x01020304u32);
        }), [4, 3, 2, 1]);
        assert_eq!(build_once(|b| {
            b.push(-2i8);
        }), [0xFE]);
        assert_eq!(build_once(|b| {
            b.push(1.0f32);
        }), [0, 0, 0x80, 0x3F]);
        assert_eq!(build_once(|b| {
            b.push(true);
        }), [1]);
    }

    #[test]
    fn push_aligns_naturally() {
        let mut b = Builder::new();
        b.push(1u8);
        b.push(0x0203u16);
        // One pad byte keeps the u16 two-byte aligned.
        assert_eq!(b.data(), [3, 2, 0, 1]);
    }

    #[test]
    fn pad_and_align() {
        let mut b = Builder::new();
        b.push(1u8);
        b.align(4);
        assert_eq!(b.size(), 4);
        b.pad(2);
        assert_eq!(b.data(), [0, 0, 0, 0, 0, 1]);
    }

    #[test]
    fn grows_past_initial_capacity() {
        let mut b = Builder::with_capacity(4);
        for i in 0..100u8 {
            b.push(i);
        }
        let data = b.data();
        assert_eq!(data.len(), 100);
        assert_eq!(data[0], 99);
        assert_eq!(data[99], 0);
    }

    #[test]
    fn create_string_layout() {
        // [len][bytes][NUL], length word four-byte aligned.
        let mut b = Builder::new();
        let off = b.create_string("hi");
        assert_eq!(off, 8);
        assert_eq!(b.data(), [2, 0, 0, 0, 104, 105, 0, 0]);
    }

    #[test]
    fn empty_table_has_zero_slots() {
        let mut b = Builder::new();
        let start = b.start_table();
        b.add_scalar(field_index_to_offset(0), 0i32, 0);
        b.add_scalar(field_index_to_offset(1), 7i32, 7);
        let table = b.end_table(start, 2);
        assert_eq!(table, 4);
        // vtable length, table length, two absent slots.
        assert_eq!(b.finished_data(), [8, 0, 4, 0, 0, 0, 0, 0, 8, 0, 0, 0]);
    }

    #[test]
    fn table_with_one_scalar() {
        let mut b = Builder::new();
        let start = b.start_table();
        b.add_scalar(field_index_to_offset(0), 5i32, 0);
        let table = b.end_table(start, 1);
        assert_eq!(table, 8);
        assert_eq!(
            b.finished_data(),
            [6, 0, 8, 0, 4, 0, 6, 0, 0, 0, 5, 0, 0, 0]
        );
    }

    #[test]
    fn identical_vtables_are_shared() {
        let mut b = Builder::new();
        let start = b.start_table();
        let first = b.end_table(start, 0);
        let start = b.start_table();
        let second = b.end_table(start, 0);
        let data = b.finished_data();
        let read_soffset = |table: UOffset| {
            let pos = data.len() - table as usize;
            let mut raw = [0u8; 4];
            raw.copy_from_slice(&data[pos..pos + 4]);
            i32::from_le_bytes(raw)
        };
        // Both headers resolve to the same vtable position.
        let first_pos = data.len() as i64 - first as i64;
        let second_pos = data.len() as i64 - second as i64;
        let first_vtable = first_pos - read_soffset(first) as i64;
        let second_vtable = second_pos - read_soffset(second) as i64;
        assert_eq!(first_vtable, second_vtable);
    }

    #[test]
    fn struct_bytes_round_through_side_buffer() {
        let mut b = Builder::new();
        b.start_struct(4);
        b.push(2.0f32);
        b.push(1.0f32);
        b.end_struct();
        let staged = b.front_bytes(8).to_vec();
        b.pop_bytes(8);
        assert_eq!(b.size(), 0);
        b.push_bytes(&staged);
        assert_eq!(b.data(), [0, 0, 0x80, 0x3F, 0, 0, 0, 0x40]);
    }

    #[test]
    fn vector_of_ints() {
        let mut b = Builder::new();
        b.start_vector(3, 4, 4);
        b.push(3i32);
        b.push(2i32);
        b.push(1i32);
        let off = b.end_vector(3);
        assert_eq!(off, 16);
        assert_eq!(
            b.finished_data(),
            [3, 0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0, 3, 0, 0, 0]
        );
    }

    #[test]
    fn finish_prepends_root_offset() {
        let mut b = Builder::new();
        let start = b.start_table();
        let table = b.end_table(start, 0);
        b.finish(table);
        assert!(b.is_finished());
        let data = b.data();
        // Leading u32 points at the table header.
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&data[..4]);
        let root = u32::from_le_bytes(raw) as usize;
        assert_eq!(root, data.len() - table as usize);
    }
}
