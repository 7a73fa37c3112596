use std::sync::Arc;

use super::{BlockAllocator, INT_BLOCK_MASK, INT_BLOCK_SHIFT, INT_BLOCK_SIZE};

/// Pool of `u32` blocks holding, per term, the current write address of each
/// of its byte-slice streams.
pub struct IntBlockPool {
    buffers: Vec<Box<[u32]>>,
    int_upto: usize,
    allocator: Arc<BlockAllocator<u32>>,
}

impl IntBlockPool {
    pub fn new(allocator: Arc<BlockAllocator<u32>>) -> Self {
        debug_assert_eq!(allocator.block_size(), INT_BLOCK_SIZE);
        IntBlockPool { buffers: Vec::new(), int_upto: INT_BLOCK_SIZE, allocator }
    }

    fn int_offset(&self) -> usize {
        self.buffers.len().saturating_sub(1) * INT_BLOCK_SIZE
    }

    /// Reserve `count` consecutive slots in one block, returns the address of the first.
    pub fn alloc(&mut self, count: usize) -> usize {
        debug_assert!(count <= INT_BLOCK_SIZE);
        if self.buffers.is_empty() || self.int_upto + count > INT_BLOCK_SIZE {
            self.buffers.push(self.allocator.allocate());
            self.int_upto = 0;
        }
        let addr = self.int_offset() + self.int_upto;
        self.int_upto += count;
        addr
    }

    #[inline]
    pub fn get(&self, addr: usize) -> u32 {
        self.buffers[addr >> INT_BLOCK_SHIFT][addr & INT_BLOCK_MASK]
    }

    #[inline]
    pub fn set(&mut self, addr: usize, value: u32) {
        self.buffers[addr >> INT_BLOCK_SHIFT][addr & INT_BLOCK_MASK] = value;
    }

    pub fn bytes_used(&self) -> usize {
        self.buffers.len() * INT_BLOCK_SIZE * std::mem::size_of::<u32>()
    }

    pub fn reset(&mut self) {
        self.allocator.recycle(self.buffers.drain(..));
        self.int_upto = INT_BLOCK_SIZE;
    }
}

impl Drop for IntBlockPool {
    fn drop(&mut self) {
        self.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_keeps_runs_in_one_block() {
        let mut pool = IntBlockPool::new(BlockAllocator::new(INT_BLOCK_SIZE));
        let mut addrs = Vec::new();
        for i in 0..(INT_BLOCK_SIZE / 2 + 5) {
            let addr = pool.alloc(2);
            assert_eq!(addr >> INT_BLOCK_SHIFT, (addr + 1) >> INT_BLOCK_SHIFT);
            pool.set(addr, i as u32);
            pool.set(addr + 1, i as u32 * 10);
            addrs.push(addr);
        }
        for (i, addr) in addrs.iter().enumerate() {
            assert_eq!(pool.get(*addr), i as u32);
            assert_eq!(pool.get(addr + 1), i as u32 * 10);
        }
        assert_eq!(pool.bytes_used(), 2 * INT_BLOCK_SIZE * 4);
    }

    #[test]
    fn test_odd_sized_runs_skip_block_tail() {
        let mut pool = IntBlockPool::new(BlockAllocator::new(INT_BLOCK_SIZE));
        pool.alloc(INT_BLOCK_SIZE - 1);
        let addr = pool.alloc(2);
        assert_eq!(addr, INT_BLOCK_SIZE);
    }
}
