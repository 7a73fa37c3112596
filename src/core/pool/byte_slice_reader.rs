use super::{ByteBlockPool, BYTE_BLOCK_SIZE, FIRST_LEVEL_SIZE, LEVEL_SIZE_ARRAY, NEXT_LEVEL_ARRAY};
use crate::directory::DataInput;

/// Reads back a stream written by [`ByteSliceWriter`](super::ByteSliceWriter),
/// following forwarding addresses from slice to slice until `end`.
///
/// Reading past `end` is a bug in the caller and panics.
pub struct ByteSliceReader<'a> {
    pool: &'a ByteBlockPool,
    buffer: &'a [u8],
    buffer_offset: usize,
    upto: usize,
    limit: usize,
    level: usize,
    end_index: usize,
}

impl<'a> ByteSliceReader<'a> {
    /// Reader over the stream whose first slice starts at `start` and whose
    /// next write address (exclusive end) is `end`.
    pub fn new(pool: &'a ByteBlockPool, start: usize, end: usize) -> Self {
        assert!(end >= start, "slice stream ends before it starts");
        let block_index = start / BYTE_BLOCK_SIZE;
        let buffer_offset = block_index * BYTE_BLOCK_SIZE;
        let upto = start - buffer_offset;
        let limit = if start + FIRST_LEVEL_SIZE >= end {
            // 整个 stream 都还在第一个 slice 里
            end - buffer_offset
        } else {
            upto + FIRST_LEVEL_SIZE - 4
        };
        ByteSliceReader {
            pool,
            buffer: pool.block(block_index),
            buffer_offset,
            upto,
            limit,
            level: 0,
            end_index: end,
        }
    }

    pub fn eof(&self) -> bool {
        debug_assert!(self.upto + self.buffer_offset <= self.end_index);
        self.upto + self.buffer_offset == self.end_index
    }

    fn next_slice(&mut self) {
        let next_index = u32::from_be_bytes([
            self.buffer[self.limit],
            self.buffer[self.limit + 1],
            self.buffer[self.limit + 2],
            self.buffer[self.limit + 3],
        ]) as usize;

        self.level = NEXT_LEVEL_ARRAY[self.level];
        let new_size = LEVEL_SIZE_ARRAY[self.level];

        let block_index = next_index / BYTE_BLOCK_SIZE;
        self.buffer_offset = block_index * BYTE_BLOCK_SIZE;
        self.buffer = self.pool.block(block_index);
        self.upto = next_index - self.buffer_offset;

        if next_index + new_size >= self.end_index {
            // 最后一个 slice, 以 end_index 为界
            assert!(self.end_index >= next_index);
            self.limit = self.end_index - self.buffer_offset;
        } else {
            self.limit = self.upto + new_size - 4;
        }
    }

    #[inline]
    fn next_byte(&mut self) -> u8 {
        assert!(!self.eof(), "read past the end of a byte slice stream");
        if self.upto == self.limit {
            self.next_slice();
        }
        let b = self.buffer[self.upto];
        self.upto += 1;
        b
    }
}

impl DataInput for ByteSliceReader<'_> {
    fn read_byte(&mut self) -> crate::Result<u8> {
        Ok(self.next_byte())
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> crate::Result<()> {
        let mut offset = 0;
        let mut len = buf.len();
        while len > 0 {
            assert!(!self.eof(), "read past the end of a byte slice stream");
            if self.upto == self.limit {
                self.next_slice();
            }
            let num_left = (self.limit - self.upto).min(len);
            buf[offset..offset + num_left]
                .copy_from_slice(&self.buffer[self.upto..self.upto + num_left]);
            self.upto += num_left;
            offset += num_left;
            len -= num_left;
        }
        Ok(())
    }
}
