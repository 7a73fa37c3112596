use super::ByteBlockPool;
use crate::directory::DataOutput;

/// Appends bytes to a chain of slices, moving to the next level whenever the
/// end marker of the current slice is hit.
pub struct ByteSliceWriter<'a> {
    pool: &'a mut ByteBlockPool,
    upto: usize,
}

impl<'a> ByteSliceWriter<'a> {
    /// Continue writing at `address` (as returned by a previous [`address`](Self::address)
    /// or by [`ByteBlockPool::new_slice`]).
    pub fn new(pool: &'a mut ByteBlockPool, address: usize) -> Self {
        ByteSliceWriter { pool, upto: address }
    }

    pub fn init(&mut self, address: usize) {
        self.upto = address;
    }

    /// Address of the next byte to be written, i.e. the stream end so far.
    pub fn address(&self) -> usize {
        self.upto
    }

    #[inline]
    fn push(&mut self, b: u8) -> crate::Result<()> {
        if self.pool.byte_at(self.upto) != 0 {
            self.upto = self.pool.alloc_slice(self.upto)?;
        }
        self.pool.set_byte(self.upto, b);
        self.upto += 1;
        Ok(())
    }
}

impl DataOutput for ByteSliceWriter<'_> {
    fn write_byte(&mut self, b: u8) -> crate::Result<()> {
        self.push(b)
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> crate::Result<()> {
        for b in bytes {
            self.push(*b)?;
        }
        Ok(())
    }
}
