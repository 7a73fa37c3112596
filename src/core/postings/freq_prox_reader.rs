use super::freq_prox_writer::{FREQ_STREAM, PROX_STREAM};
use super::{FreqProxTermsWriterPerField, TermDocs, TermId, TermPositions, TermsHashPools};
use crate::common::errors::TextIndexError;
use crate::core::pool::{ByteSliceReader, FIRST_LEVEL_SIZE};
use crate::core::Term;
use crate::directory::DataInput;
use crate::DocId;

/// Sequential reader over the buffered postings of one field of one shard,
/// term by term in byte order. Used by flush to merge shards.
///
/// The pending last document of each term (never written to stream 0) is
/// produced once the stream is exhausted. Reading leaves the shard untouched.
///
/// Only sequential iteration is supported: `seek` and batch `read` fail with
/// `UnsupportedOperation`.
pub struct FreqProxFieldMergeState<'a> {
    field: &'a FreqProxTermsWriterPerField,
    pools: &'a TermsHashPools,
    term_ids: Vec<TermId>,
    next_term_index: usize,
    current: Option<TermId>,

    freq: Option<ByteSliceReader<'a>>,
    prox: Option<ByteSliceReader<'a>>,
    pending_last_doc: bool,

    doc_id: DocId,
    term_freq: u32,

    positions_left: u32,
    position: u32,
    payload_length: u32,
    payload: Vec<u8>,
    payload_available: bool,
}

impl<'a> FreqProxFieldMergeState<'a> {
    pub fn new(field: &'a FreqProxTermsWriterPerField, pools: &'a TermsHashPools) -> Self {
        FreqProxFieldMergeState {
            field,
            pools,
            term_ids: field.terms().sorted_term_ids(pools),
            next_term_index: 0,
            current: None,
            freq: None,
            prox: None,
            pending_last_doc: false,
            doc_id: 0,
            term_freq: 0,
            positions_left: 0,
            position: 0,
            payload_length: 0,
            payload: Vec::new(),
            payload_available: false,
        }
    }

    pub fn field(&self) -> &FreqProxTermsWriterPerField {
        self.field
    }

    pub fn num_terms(&self) -> usize {
        self.term_ids.len()
    }

    /// Text of the current term. Empty before the first `next_term`.
    pub fn term_text(&self) -> &'a [u8] {
        match self.current {
            Some(term_id) => self.pools.term_text(term_id),
            None => &[],
        }
    }

    fn stream_reader(&self, term_id: TermId, stream: usize) -> ByteSliceReader<'a> {
        let i = term_id as usize;
        let start = self.pools.postings.byte_starts[i] as usize + stream * FIRST_LEVEL_SIZE;
        let end = self.pools.int_pool.get(self.pools.postings.int_starts[i] as usize + stream);
        ByteSliceReader::new(&self.pools.byte_pool, start, end as usize)
    }

    /// Move to the next term. The cursor is then before the term's first document.
    pub fn next_term(&mut self) -> crate::Result<bool> {
        if self.next_term_index >= self.term_ids.len() {
            self.current = None;
            self.freq = None;
            self.prox = None;
            return Ok(false);
        }
        let term_id = self.term_ids[self.next_term_index];
        self.next_term_index += 1;
        self.current = Some(term_id);
        self.freq = Some(self.stream_reader(term_id, FREQ_STREAM));
        self.prox = if self.field.omit_term_freq_and_positions() {
            None
        } else {
            Some(self.stream_reader(term_id, PROX_STREAM))
        };
        self.pending_last_doc = true;
        self.doc_id = 0;
        self.term_freq = 0;
        self.positions_left = 0;
        self.payload_length = 0;
        self.payload_available = false;
        Ok(true)
    }

    fn read_position(&mut self) -> crate::Result<u32> {
        let prox = self.prox.as_mut().ok_or_else(|| {
            TextIndexError::InternalError("no prox stream for the current term".to_string())
        })?;
        let code = prox.read_vint()?;
        self.position += code >> 1;
        if code & 1 != 0 {
            self.payload_length = prox.read_vint()?;
        }
        self.payload.resize(self.payload_length as usize, 0);
        if self.payload_length > 0 {
            prox.read_bytes(&mut self.payload)?;
        }
        self.payload_available = self.payload_length > 0;
        self.positions_left -= 1;
        Ok(self.position)
    }
}

impl TermDocs for FreqProxFieldMergeState<'_> {
    fn seek(&mut self, term: &Term) -> crate::Result<bool> {
        Err(TextIndexError::UnsupportedOperation(format!(
            "buffered postings of field `{}` can only be iterated in order, cannot seek to {:?}",
            self.field.field_name(),
            term
        )))
    }

    fn doc(&self) -> DocId {
        self.doc_id
    }

    fn freq(&self) -> u32 {
        self.term_freq
    }

    fn next(&mut self) -> crate::Result<bool> {
        // 跳过当前文档中未读取的 position
        while self.positions_left > 0 {
            self.read_position()?;
        }
        let term_id = match self.current {
            Some(term_id) => term_id as usize,
            None => return Ok(false),
        };
        let omit_tf = self.field.omit_term_freq_and_positions();
        let freq = match self.freq.as_mut() {
            Some(freq) => freq,
            None => return Ok(false),
        };
        if freq.eof() {
            if !self.pending_last_doc {
                return Ok(false);
            }
            // 最后一个文档还没写入 stream 0, 直接从 postings array 中取
            self.pending_last_doc = false;
            self.doc_id = self.pools.postings.last_doc_ids[term_id];
            self.term_freq = if omit_tf { 1 } else { self.pools.postings.doc_freqs[term_id] };
        } else {
            let code = freq.read_vint()?;
            if omit_tf {
                self.doc_id += code;
                self.term_freq = 1;
            } else {
                self.doc_id += code >> 1;
                self.term_freq = if code & 1 != 0 { 1 } else { freq.read_vint()? };
            }
        }
        self.position = 0;
        self.positions_left = if omit_tf { 0 } else { self.term_freq };
        self.payload_available = false;
        Ok(true)
    }

    fn read(&mut self, _docs: &mut [DocId], _freqs: &mut [u32]) -> crate::Result<usize> {
        Err(TextIndexError::UnsupportedOperation(
            "a positions cursor does not support batch reads".to_string(),
        ))
    }

    fn skip_to(&mut self, target: DocId) -> crate::Result<bool> {
        loop {
            if !self.next()? {
                return Ok(false);
            }
            if self.doc_id >= target {
                return Ok(true);
            }
        }
    }
}

impl TermPositions for FreqProxFieldMergeState<'_> {
    fn next_position(&mut self) -> crate::Result<u32> {
        if self.field.omit_term_freq_and_positions() {
            return Ok(0);
        }
        if self.positions_left == 0 {
            return Err(TextIndexError::InternalError(format!(
                "all {} positions of doc {} were already read",
                self.term_freq, self.doc_id
            )));
        }
        self.read_position()
    }

    fn payload_length(&self) -> u32 {
        self.payload_length
    }

    fn payload(&mut self) -> crate::Result<&[u8]> {
        if !self.payload_available {
            return Err(TextIndexError::UnsupportedOperation(
                "either no payload exists at this position or it was already read".to_string(),
            ));
        }
        self.payload_available = false;
        Ok(&self.payload)
    }

    fn is_payload_available(&self) -> bool {
        self.payload_available
    }
}
