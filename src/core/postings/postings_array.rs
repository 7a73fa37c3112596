use std::mem::size_of;

/// Handle of one in-RAM posting (one unique term of one field, since the last flush).
pub type TermId = u32;

/// Columnar storage for every in-RAM posting of a shard.
///
/// A posting is an index into these parallel vectors. Released handles are
/// pushed onto a free list and handed out again before the vectors grow.
#[derive(Debug, Default)]
pub struct FreqProxPostingsArray {
    /// Term pool address of the term text.
    pub text_starts: Vec<u32>,
    /// Int pool address of the per-stream write cursors.
    pub int_starts: Vec<u32>,
    /// Byte pool address of the first slice of stream 0.
    pub byte_starts: Vec<u32>,
    /// Last doc id this term occurred in.
    pub last_doc_ids: Vec<u32>,
    /// Pending doc code of `last_doc_ids`, not yet written to the freq stream.
    pub last_doc_codes: Vec<u32>,
    /// Occurrences of the term in `last_doc_ids` so far.
    pub doc_freqs: Vec<u32>,
    /// Last position written for the term in `last_doc_ids`.
    pub last_positions: Vec<u32>,
    /// Payload length most recently written to the prox stream of the term.
    pub last_payload_lens: Vec<u32>,
    free_list: Vec<TermId>,
}

impl FreqProxPostingsArray {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of slots, in use or free.
    pub fn capacity(&self) -> usize {
        self.text_starts.len()
    }

    pub fn num_free(&self) -> usize {
        self.free_list.len()
    }

    pub fn num_live(&self) -> usize {
        self.capacity() - self.num_free()
    }

    /// A fresh posting with every per-term counter zeroed.
    pub fn allocate(&mut self) -> TermId {
        if let Some(term_id) = self.free_list.pop() {
            let i = term_id as usize;
            self.text_starts[i] = 0;
            self.int_starts[i] = 0;
            self.byte_starts[i] = 0;
            self.last_doc_ids[i] = 0;
            self.last_doc_codes[i] = 0;
            self.doc_freqs[i] = 0;
            self.last_positions[i] = 0;
            self.last_payload_lens[i] = 0;
            return term_id;
        }
        let term_id = self.text_starts.len() as TermId;
        self.text_starts.push(0);
        self.int_starts.push(0);
        self.byte_starts.push(0);
        self.last_doc_ids.push(0);
        self.last_doc_codes.push(0);
        self.doc_freqs.push(0);
        self.last_positions.push(0);
        self.last_payload_lens.push(0);
        term_id
    }

    pub fn release<I: IntoIterator<Item = TermId>>(&mut self, term_ids: I) {
        self.free_list.extend(term_ids);
    }

    pub fn bytes_used(&self) -> usize {
        8 * self.capacity() * size_of::<u32>() + self.free_list.capacity() * size_of::<TermId>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_released_handles_are_reused_zeroed() {
        let mut postings = FreqProxPostingsArray::new();
        let a = postings.allocate();
        let b = postings.allocate();
        postings.doc_freqs[a as usize] = 3;
        postings.last_payload_lens[a as usize] = 9;
        postings.release([a]);
        assert_eq!(postings.num_live(), 1);

        let c = postings.allocate();
        assert_eq!(c, a);
        assert_eq!(postings.doc_freqs[c as usize], 0);
        assert_eq!(postings.last_payload_lens[c as usize], 0);
        assert_ne!(b, c);
        assert_eq!(postings.capacity(), 2);
    }
}
