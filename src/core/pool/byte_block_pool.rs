use std::sync::Arc;

use super::{
    pool_address, BlockAllocator, BYTE_BLOCK_MASK, BYTE_BLOCK_SHIFT, BYTE_BLOCK_SIZE,
    LEVEL_SIZE_ARRAY, NEXT_LEVEL_ARRAY,
};

/// Append-only pool of 32 KiB byte blocks addressed by a single `usize`.
///
/// An address is `block_index * BYTE_BLOCK_SIZE + offset`. Slices carved with
/// [`new_slice`](ByteBlockPool::new_slice) never straddle two blocks; a stream
/// grows by chaining slices of increasing level through forwarding addresses
/// (see [`alloc_slice`](ByteBlockPool::alloc_slice)).
///
/// The same pool type also stores term text (`append_term`/`term_at`).
pub struct ByteBlockPool {
    buffers: Vec<Box<[u8]>>,
    /// 当前 block 内下一个可写的偏移
    byte_upto: usize,
    allocator: Arc<BlockAllocator<u8>>,
}

impl ByteBlockPool {
    pub fn new(allocator: Arc<BlockAllocator<u8>>) -> Self {
        debug_assert_eq!(allocator.block_size(), BYTE_BLOCK_SIZE);
        ByteBlockPool { buffers: Vec::new(), byte_upto: BYTE_BLOCK_SIZE, allocator }
    }

    /// Address of the first byte of the current block.
    pub fn byte_offset(&self) -> usize {
        self.buffers.len().saturating_sub(1) * BYTE_BLOCK_SIZE
    }

    /// Absolute address of the next free byte.
    pub fn address(&self) -> usize {
        self.byte_offset() + self.byte_upto
    }

    pub fn num_blocks(&self) -> usize {
        self.buffers.len()
    }

    pub fn bytes_used(&self) -> usize {
        self.buffers.len() * BYTE_BLOCK_SIZE
    }

    /// Start a fresh block.
    pub fn next_buffer(&mut self) {
        self.buffers.push(self.allocator.allocate());
        self.byte_upto = 0;
    }

    /// Make sure `size` contiguous bytes are available in the current block.
    pub fn ensure_room(&mut self, size: usize) {
        if self.buffers.is_empty() || self.byte_upto + size > BYTE_BLOCK_SIZE {
            self.next_buffer();
        }
    }

    /// Carve a new slice of `size` bytes and return its start address.
    /// The last byte of the slice holds the level-0 end marker.
    pub fn new_slice(&mut self, size: usize) -> usize {
        self.ensure_room(size);
        let upto = self.address();
        self.byte_upto += size;
        self.set_byte(upto + size - 1, 16);
        upto
    }

    /// Called when a slice writer hits the end marker at `marker_addr`.
    ///
    /// Carves a slice of the next level, moves the last three data bytes of
    /// the exhausted slice into it and overwrites the last four bytes of the
    /// exhausted slice with the big-endian address of the new slice.
    /// Returns the address where writing continues.
    pub fn alloc_slice(&mut self, marker_addr: usize) -> crate::Result<usize> {
        let level = (self.byte_at(marker_addr) & 15) as usize;
        let new_level = NEXT_LEVEL_ARRAY[level];
        let new_size = LEVEL_SIZE_ARRAY[new_level];

        self.ensure_room(new_size);
        let new_upto = self.address();
        let forward = pool_address(new_upto)?.to_be_bytes();
        self.byte_upto += new_size;

        // 把旧 slice 末尾的 3 个数据字节挪到新 slice 开头
        for i in 0..3 {
            let b = self.byte_at(marker_addr - 3 + i);
            self.set_byte(new_upto + i, b);
        }

        // 旧 slice 的最后 4 个字节改写成指向新 slice 的地址
        for (i, b) in forward.iter().enumerate() {
            self.set_byte(marker_addr - 3 + i, *b);
        }

        self.set_byte(new_upto + new_size - 1, 16 | new_level as u8);
        Ok(new_upto + 3)
    }

    #[inline]
    pub fn byte_at(&self, addr: usize) -> u8 {
        self.buffers[addr >> BYTE_BLOCK_SHIFT][addr & BYTE_BLOCK_MASK]
    }

    #[inline]
    pub fn set_byte(&mut self, addr: usize, b: u8) {
        self.buffers[addr >> BYTE_BLOCK_SHIFT][addr & BYTE_BLOCK_MASK] = b;
    }

    pub fn block(&self, index: usize) -> &[u8] {
        &self.buffers[index]
    }

    /// Contiguous bytes `[start, end)`. Both ends must lie in one block.
    pub fn bytes(&self, start: usize, end: usize) -> &[u8] {
        let block = &self.buffers[start >> BYTE_BLOCK_SHIFT];
        let offset = start & BYTE_BLOCK_MASK;
        &block[offset..offset + (end - start)]
    }

    /// Store `text` with a one or two byte length prefix, never crossing a block.
    /// Returns the address of the prefix.
    pub fn append_term(&mut self, text: &[u8]) -> usize {
        let prefix = if text.len() < 128 { 1 } else { 2 };
        assert!(text.len() + prefix <= BYTE_BLOCK_SIZE, "term too long for one block");
        self.ensure_room(text.len() + prefix);
        let start = self.address();
        let current = self.buffers.len() - 1;
        let block = &mut self.buffers[current];
        let mut offset = self.byte_upto;
        if prefix == 1 {
            block[offset] = text.len() as u8;
            offset += 1;
        } else {
            block[offset] = 0x80 | (text.len() & 0x7F) as u8;
            block[offset + 1] = (text.len() >> 7) as u8;
            offset += 2;
        }
        block[offset..offset + text.len()].copy_from_slice(text);
        self.byte_upto = offset + text.len();
        start
    }

    /// Term text stored by [`append_term`](ByteBlockPool::append_term) at `addr`.
    pub fn term_at(&self, addr: usize) -> &[u8] {
        let block = &self.buffers[addr >> BYTE_BLOCK_SHIFT];
        let offset = addr & BYTE_BLOCK_MASK;
        let first = block[offset] as usize;
        if first & 0x80 == 0 {
            &block[offset + 1..offset + 1 + first]
        } else {
            let len = (first & 0x7F) | ((block[offset + 1] as usize) << 7);
            &block[offset + 2..offset + 2 + len]
        }
    }

    /// Give every block back to the allocator. Addresses handed out so far become invalid.
    pub fn reset(&mut self) {
        self.allocator.recycle(self.buffers.drain(..));
        self.byte_upto = BYTE_BLOCK_SIZE;
    }
}

impl Drop for ByteBlockPool {
    fn drop(&mut self) {
        self.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pool::FIRST_LEVEL_SIZE;

    fn pool() -> ByteBlockPool {
        ByteBlockPool::new(BlockAllocator::new(BYTE_BLOCK_SIZE))
    }

    #[test]
    fn test_new_slice_sets_marker() {
        let mut pool = pool();
        let a = pool.new_slice(FIRST_LEVEL_SIZE);
        let b = pool.new_slice(FIRST_LEVEL_SIZE);
        assert_eq!(a, 0);
        assert_eq!(b, FIRST_LEVEL_SIZE);
        assert_eq!(pool.byte_at(a + 4), 16);
        assert_eq!(pool.byte_at(a), 0);
    }

    #[test]
    fn test_alloc_slice_forwards_tail_bytes() {
        let mut pool = pool();
        let start = pool.new_slice(FIRST_LEVEL_SIZE);
        for i in 0..4 {
            pool.set_byte(start + i, i as u8 + 1);
        }
        let next = pool.alloc_slice(start + 4).unwrap();
        // 第一个数据字节保留在旧 slice, 其余 3 个被移到新 slice
        assert_eq!(pool.byte_at(start), 1);
        let forward = u32::from_be_bytes([
            pool.byte_at(start + 1),
            pool.byte_at(start + 2),
            pool.byte_at(start + 3),
            pool.byte_at(start + 4),
        ]) as usize;
        assert_eq!(next, forward + 3);
        assert_eq!(pool.byte_at(forward), 2);
        assert_eq!(pool.byte_at(forward + 1), 3);
        assert_eq!(pool.byte_at(forward + 2), 4);
        assert_eq!(pool.byte_at(forward + LEVEL_SIZE_ARRAY[1] - 1), 16 | 1);
    }

    #[test]
    fn test_slices_do_not_cross_blocks() {
        let mut pool = pool();
        let mut last = 0;
        for _ in 0..(BYTE_BLOCK_SIZE / FIRST_LEVEL_SIZE + 10) {
            last = pool.new_slice(FIRST_LEVEL_SIZE);
            assert_eq!(last >> BYTE_BLOCK_SHIFT, (last + FIRST_LEVEL_SIZE - 1) >> BYTE_BLOCK_SHIFT);
        }
        assert_eq!(pool.num_blocks(), 2);
        assert!(last >= BYTE_BLOCK_SIZE);
    }

    #[test]
    fn test_terms_round_trip() {
        let mut pool = pool();
        let short = pool.append_term(b"lucene");
        let long_text = vec![b'x'; 300];
        let long = pool.append_term(&long_text);
        let empty = pool.append_term(b"");
        assert_eq!(pool.term_at(short), b"lucene");
        assert_eq!(pool.term_at(long), &long_text[..]);
        assert_eq!(pool.term_at(empty), b"");
    }

    #[test]
    fn test_reset_recycles_blocks() {
        let allocator = BlockAllocator::new(BYTE_BLOCK_SIZE);
        let mut pool = ByteBlockPool::new(allocator.clone());
        pool.new_slice(FIRST_LEVEL_SIZE);
        pool.next_buffer();
        assert_eq!(allocator.bytes_used(), 2 * BYTE_BLOCK_SIZE);
        pool.reset();
        assert_eq!(allocator.bytes_used(), 0);
        assert_eq!(allocator.num_free_blocks(), 2);
        assert_eq!(pool.new_slice(FIRST_LEVEL_SIZE), 0);
    }
}
