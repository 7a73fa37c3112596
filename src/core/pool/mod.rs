//! Slab storage for in-memory postings.
//!
//! Every posting stream lives in a chain of byte slices carved from
//! [`ByteBlockPool`] blocks. A term's write cursors live in an [`IntBlockPool`].
//! Blocks are borrowed from, and recycled to, a shared [`BlockAllocator`].

mod block_allocator;
mod byte_block_pool;
mod byte_slice_reader;
mod byte_slice_writer;
mod int_block_pool;

pub use block_allocator::BlockAllocator;
pub use byte_block_pool::ByteBlockPool;
pub use byte_slice_reader::ByteSliceReader;
pub use byte_slice_writer::ByteSliceWriter;
pub use int_block_pool::IntBlockPool;

pub const BYTE_BLOCK_SHIFT: usize = 15;
pub const BYTE_BLOCK_SIZE: usize = 1 << BYTE_BLOCK_SHIFT;
pub const BYTE_BLOCK_MASK: usize = BYTE_BLOCK_SIZE - 1;

pub const INT_BLOCK_SHIFT: usize = 13;
pub const INT_BLOCK_SIZE: usize = 1 << INT_BLOCK_SHIFT;
pub const INT_BLOCK_MASK: usize = INT_BLOCK_SIZE - 1;

/// Size of each slice level, indexed by level.
pub const LEVEL_SIZE_ARRAY: [usize; 10] = [5, 14, 20, 30, 40, 40, 80, 80, 120, 200];

/// Level that follows each level. The last level repeats.
pub const NEXT_LEVEL_ARRAY: [usize; 10] = [1, 2, 3, 4, 5, 6, 7, 8, 9, 9];

pub const FIRST_LEVEL_SIZE: usize = LEVEL_SIZE_ARRAY[0];

/// Byte pool addresses are kept as `u32` in the int pool, the postings
/// arrays and the slice forwarding bytes.
pub fn pool_address(addr: usize) -> crate::Result<u32> {
    u32::try_from(addr).map_err(|_| {
        crate::TextIndexError::InternalError(format!(
            "byte pool address {addr} does not fit in 32 bits, lower ram_budget_bytes"
        ))
    })
}
