use std::mem::size_of;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// Hands out fixed-size zeroed blocks and takes them back for reuse.
///
/// One allocator is shared by every shard of an `IndexWriter`; the mutex is
/// only taken when a whole block changes hands, never per write.
/// `bytes_used` is the RAM accounting the flush trigger reads.
pub struct BlockAllocator<T> {
    block_size: usize,
    free_blocks: Mutex<Vec<Box<[T]>>>,
    bytes_used: AtomicUsize,
}

impl<T: Copy + Default> BlockAllocator<T> {
    pub fn new(block_size: usize) -> Arc<Self> {
        Arc::new(BlockAllocator {
            block_size,
            free_blocks: Mutex::new(Vec::new()),
            bytes_used: AtomicUsize::new(0),
        })
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    fn block_bytes(&self) -> usize {
        self.block_size * size_of::<T>()
    }

    /// A zero-filled block, recycled when one is available.
    pub fn allocate(&self) -> Box<[T]> {
        self.bytes_used.fetch_add(self.block_bytes(), Ordering::Relaxed);
        if let Some(block) = self.free_blocks.lock().pop() {
            return block;
        }
        vec![T::default(); self.block_size].into_boxed_slice()
    }

    /// Take blocks back. They are zero-filled before being handed out again.
    pub fn recycle<I: IntoIterator<Item = Box<[T]>>>(&self, blocks: I) {
        let mut returned = 0usize;
        let mut cleared: Vec<Box<[T]>> = Vec::new();
        for mut block in blocks {
            debug_assert_eq!(block.len(), self.block_size);
            block.fill(T::default());
            cleared.push(block);
            returned += 1;
        }
        if returned == 0 {
            return;
        }
        self.bytes_used.fetch_sub(returned * self.block_bytes(), Ordering::Relaxed);
        self.free_blocks.lock().extend(cleared);
    }

    /// Bytes held by blocks currently handed out.
    pub fn bytes_used(&self) -> usize {
        self.bytes_used.load(Ordering::Relaxed)
    }

    /// Number of recycled blocks waiting for reuse.
    pub fn num_free_blocks(&self) -> usize {
        self.free_blocks.lock().len()
    }

    /// Drop every recycled block.
    pub fn trim(&self) {
        self.free_blocks.lock().clear();
    }
}
