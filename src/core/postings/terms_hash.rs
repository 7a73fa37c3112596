use std::hash::Hasher;
use std::sync::Arc;

use fnv::FnvHasher;

use super::{FreqProxPostingsArray, TermId};
use crate::core::pool::{pool_address, BlockAllocator, ByteBlockPool, IntBlockPool};

const EMPTY_SLOT: TermId = TermId::MAX;
const INITIAL_HASH_SIZE: usize = 4;

/// Everything a shard accumulates postings into. Owned by exactly one worker.
pub struct TermsHashPools {
    /// Posting streams (doc codes, positions).
    pub byte_pool: ByteBlockPool,
    /// Per-term stream write addresses.
    pub int_pool: IntBlockPool,
    /// Term text.
    pub term_pool: ByteBlockPool,
    pub postings: FreqProxPostingsArray,
}

impl TermsHashPools {
    pub fn new(
        byte_allocator: Arc<BlockAllocator<u8>>,
        int_allocator: Arc<BlockAllocator<u32>>,
    ) -> Self {
        TermsHashPools {
            byte_pool: ByteBlockPool::new(byte_allocator.clone()),
            int_pool: IntBlockPool::new(int_allocator),
            term_pool: ByteBlockPool::new(byte_allocator),
            postings: FreqProxPostingsArray::new(),
        }
    }

    /// Text of the posting `term_id`.
    pub fn term_text(&self, term_id: TermId) -> &[u8] {
        self.term_pool.term_at(self.postings.text_starts[term_id as usize] as usize)
    }

    pub fn bytes_used(&self) -> usize {
        self.byte_pool.bytes_used()
            + self.term_pool.bytes_used()
            + self.int_pool.bytes_used()
            + self.postings.bytes_used()
    }

    /// Recycle every block. Postings must have been released by their fields beforehand.
    pub fn reset(&mut self) {
        self.byte_pool.reset();
        self.int_pool.reset();
        self.term_pool.reset();
    }
}

/// Outcome of [`TermsHash::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermLookup {
    /// First occurrence of the term since the last flush.
    New(TermId),
    Existing(TermId),
}

/// Open addressing hash from term text to [`TermId`], one per field.
///
/// The table only stores handles; text lives in the term pool, so probing
/// compares against pool bytes. The table doubles when half full.
#[derive(Debug)]
pub struct TermsHash {
    slots: Vec<TermId>,
    mask: usize,
    num_terms: usize,
}

impl Default for TermsHash {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn hash_code(text: &[u8]) -> usize {
    let mut hasher = FnvHasher::default();
    hasher.write(text);
    hasher.finish() as usize
}

impl TermsHash {
    pub fn new() -> Self {
        TermsHash {
            slots: vec![EMPTY_SLOT; INITIAL_HASH_SIZE],
            mask: INITIAL_HASH_SIZE - 1,
            num_terms: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.num_terms
    }

    pub fn is_empty(&self) -> bool {
        self.num_terms == 0
    }

    fn find_slot(&self, pools: &TermsHashPools, text: &[u8]) -> usize {
        let mut code = hash_code(text);
        let mut pos = code & self.mask;
        let inc = ((code >> 8).wrapping_add(code)) | 1;
        loop {
            let term_id = self.slots[pos];
            if term_id == EMPTY_SLOT || pools.term_text(term_id) == text {
                return pos;
            }
            code = code.wrapping_add(inc);
            pos = code & self.mask;
        }
    }

    /// Look `text` up, allocating a posting and storing the text when it is new.
    pub fn add(&mut self, pools: &mut TermsHashPools, text: &[u8]) -> crate::Result<TermLookup> {
        let pos = self.find_slot(pools, text);
        let term_id = self.slots[pos];
        if term_id != EMPTY_SLOT {
            return Ok(TermLookup::Existing(term_id));
        }
        let text_start = pool_address(pools.term_pool.append_term(text))?;
        let term_id = pools.postings.allocate();
        pools.postings.text_starts[term_id as usize] = text_start;
        self.slots[pos] = term_id;
        self.num_terms += 1;
        if self.num_terms * 2 > self.slots.len() {
            self.rehash(self.slots.len() * 2, pools);
        }
        Ok(TermLookup::New(term_id))
    }

    fn rehash(&mut self, new_size: usize, pools: &TermsHashPools) {
        let old_slots = std::mem::replace(&mut self.slots, vec![EMPTY_SLOT; new_size]);
        self.mask = new_size - 1;
        for term_id in old_slots.into_iter().filter(|id| *id != EMPTY_SLOT) {
            let pos = self.find_slot(pools, pools.term_text(term_id));
            self.slots[pos] = term_id;
        }
    }

    pub fn term_ids(&self) -> impl Iterator<Item = TermId> + '_ {
        self.slots.iter().copied().filter(|id| *id != EMPTY_SLOT)
    }

    /// Handles ordered by term text bytes.
    pub fn sorted_term_ids(&self, pools: &TermsHashPools) -> Vec<TermId> {
        let mut ids: Vec<TermId> = self.term_ids().collect();
        ids.sort_unstable_by(|a, b| pools.term_text(*a).cmp(pools.term_text(*b)));
        ids
    }

    /// Release every handle back to `postings` and shrink the table.
    pub fn clear(&mut self, postings: &mut FreqProxPostingsArray) {
        postings.release(self.term_ids());
        self.slots = vec![EMPTY_SLOT; INITIAL_HASH_SIZE];
        self.mask = INITIAL_HASH_SIZE - 1;
        self.num_terms = 0;
    }

    pub fn bytes_used(&self) -> usize {
        self.slots.len() * std::mem::size_of::<TermId>()
    }
}
