use log::warn;

use super::{TermId, TermLookup, TermsHash, TermsHashPools};
use crate::common::constants::{MAX_DOCS_PER_SEGMENT, MAX_POSITION, MAX_TERM_LENGTH};
use crate::common::errors::TextIndexError;
use crate::core::pool::{pool_address, ByteSliceWriter, FIRST_LEVEL_SIZE};
use crate::directory::DataOutput;
use crate::DocId;

/// Stream holding doc codes and frequencies.
pub const FREQ_STREAM: usize = 0;
/// Stream holding position codes and payloads.
pub const PROX_STREAM: usize = 1;

/// Accumulates the postings of one field of one shard.
///
/// Per term, stream 0 receives one entry for every *finished* document:
/// `(doc_delta << 1) | 1` when the term occurred once, otherwise
/// `doc_delta << 1` followed by the frequency. The entry of the most recent
/// document stays pending in the postings array until the term shows up in
/// a later document (or the field is flushed).
///
/// Stream 1 receives, per occurrence, `(position_delta << 1) | payload_len_changed`,
/// the new payload length when it changed, then the payload bytes.
///
/// Fields omitting term freqs and positions only have stream 0, holding plain
/// doc deltas.
#[derive(Debug)]
pub struct FreqProxTermsWriterPerField {
    field_name: String,
    omit_term_freq_and_positions: bool,
    has_payloads: bool,
    terms: TermsHash,
}

/// Append a VInt to stream `stream` of the term whose cursors start at `int_start`.
fn write_vint(pools: &mut TermsHashPools, int_start: usize, stream: usize, value: u32) -> crate::Result<()> {
    let addr = pools.int_pool.get(int_start + stream) as usize;
    let mut writer = ByteSliceWriter::new(&mut pools.byte_pool, addr);
    writer.write_vint(value)?;
    let end = pool_address(writer.address())?;
    pools.int_pool.set(int_start + stream, end);
    Ok(())
}

fn write_bytes(pools: &mut TermsHashPools, int_start: usize, stream: usize, bytes: &[u8]) -> crate::Result<()> {
    let addr = pools.int_pool.get(int_start + stream) as usize;
    let mut writer = ByteSliceWriter::new(&mut pools.byte_pool, addr);
    writer.write_bytes(bytes)?;
    let end = pool_address(writer.address())?;
    pools.int_pool.set(int_start + stream, end);
    Ok(())
}

impl FreqProxTermsWriterPerField {
    pub fn new(field_name: &str, omit_term_freq_and_positions: bool) -> Self {
        FreqProxTermsWriterPerField {
            field_name: field_name.to_string(),
            omit_term_freq_and_positions,
            has_payloads: false,
            terms: TermsHash::new(),
        }
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub fn omit_term_freq_and_positions(&self) -> bool {
        self.omit_term_freq_and_positions
    }

    /// Whether any occurrence since the last flush carried a non-empty payload.
    pub fn has_payloads(&self) -> bool {
        self.has_payloads
    }

    pub fn stream_count(&self) -> usize {
        if self.omit_term_freq_and_positions {
            1
        } else {
            2
        }
    }

    pub fn num_terms(&self) -> usize {
        self.terms.len()
    }

    pub fn terms(&self) -> &TermsHash {
        &self.terms
    }

    /// Record one occurrence of `text` at `position` in `doc_id`.
    ///
    /// Documents must arrive in increasing doc id order and positions of one
    /// term of one document in non-decreasing order, anything else is an
    /// `InvalidArgument` and leaves the field untouched.
    /// Returns `false` when the term was dropped for being too long.
    pub fn add_occurrence(
        &mut self,
        pools: &mut TermsHashPools,
        doc_id: DocId,
        text: &[u8],
        position: u32,
        payload: Option<&[u8]>,
    ) -> crate::Result<bool> {
        if text.len() > MAX_TERM_LENGTH {
            warn!(
                "[{}] skip immense term in field `{}`, {} bytes is longer than the limit {}",
                std::thread::current().name().unwrap_or_default(),
                self.field_name,
                text.len(),
                MAX_TERM_LENGTH
            );
            return Ok(false);
        }
        if doc_id >= MAX_DOCS_PER_SEGMENT {
            return Err(TextIndexError::InvalidArgument(format!(
                "doc id {} of field `{}` is past the {} docs a segment holds",
                doc_id, self.field_name, MAX_DOCS_PER_SEGMENT
            )));
        }
        if !self.omit_term_freq_and_positions && position > MAX_POSITION {
            return Err(TextIndexError::InvalidArgument(format!(
                "position {} in field `{}` is larger than {}",
                position, self.field_name, MAX_POSITION
            )));
        }
        match self.terms.add(pools, text)? {
            TermLookup::New(term_id) => {
                self.init_streams(pools, term_id)?;
                self.new_term(pools, term_id, doc_id, position, payload)?;
            }
            TermLookup::Existing(term_id) => {
                self.check_order(pools, term_id, doc_id, position)?;
                self.add_term(pools, term_id, doc_id, position, payload)?;
            }
        }
        Ok(true)
    }

    /// The doc cannot go back, nor a position inside the same doc.
    fn check_order(&self, pools: &TermsHashPools, term_id: TermId, doc_id: DocId, position: u32) -> crate::Result<()> {
        let i = term_id as usize;
        let last_doc_id = pools.postings.last_doc_ids[i];
        if doc_id < last_doc_id {
            return Err(TextIndexError::InvalidArgument(format!(
                "doc {} arrived after doc {} in field `{}`",
                doc_id, last_doc_id, self.field_name
            )));
        }
        let last_position = pools.postings.last_positions[i];
        if !self.omit_term_freq_and_positions && doc_id == last_doc_id && position < last_position {
            return Err(TextIndexError::InvalidArgument(format!(
                "position {} of doc {} in field `{}` is before the previous position {}",
                position, doc_id, self.field_name, last_position
            )));
        }
        Ok(())
    }

    fn init_streams(&self, pools: &mut TermsHashPools, term_id: TermId) -> crate::Result<()> {
        let stream_count = self.stream_count();
        let int_start = pools.int_pool.alloc(stream_count);
        // 所有 stream 的首个 slice 需要连续分配, 读取时按 byte_start + i * FIRST_LEVEL_SIZE 定位
        pools.byte_pool.ensure_room(stream_count * FIRST_LEVEL_SIZE);
        for stream in 0..stream_count {
            let upto = pool_address(pools.byte_pool.new_slice(FIRST_LEVEL_SIZE))?;
            pools.int_pool.set(int_start + stream, upto);
        }
        let i = term_id as usize;
        pools.postings.int_starts[i] = pool_address(int_start)?;
        pools.postings.byte_starts[i] = pools.int_pool.get(int_start);
        Ok(())
    }

    /// First occurrence of the term since the last flush.
    fn new_term(
        &mut self,
        pools: &mut TermsHashPools,
        term_id: TermId,
        doc_id: DocId,
        position: u32,
        payload: Option<&[u8]>,
    ) -> crate::Result<()> {
        let i = term_id as usize;
        pools.postings.last_doc_ids[i] = doc_id;
        if self.omit_term_freq_and_positions {
            pools.postings.last_doc_codes[i] = doc_id;
        } else {
            pools.postings.last_doc_codes[i] = doc_id << 1;
            pools.postings.doc_freqs[i] = 1;
            self.write_prox(pools, term_id, position, position, payload)?;
        }
        Ok(())
    }

    fn add_term(
        &mut self,
        pools: &mut TermsHashPools,
        term_id: TermId,
        doc_id: DocId,
        position: u32,
        payload: Option<&[u8]>,
    ) -> crate::Result<()> {
        let i = term_id as usize;
        let int_start = pools.postings.int_starts[i] as usize;
        let last_doc_id = pools.postings.last_doc_ids[i];

        if self.omit_term_freq_and_positions {
            if doc_id != last_doc_id {
                let last_doc_code = pools.postings.last_doc_codes[i];
                write_vint(pools, int_start, FREQ_STREAM, last_doc_code)?;
                pools.postings.last_doc_codes[i] = doc_id - last_doc_id;
                pools.postings.last_doc_ids[i] = doc_id;
            }
            return Ok(());
        }

        if doc_id != last_doc_id {
            // 该 term 在之前的文档出现过, 先把上一个文档的 doc code 和 freq 写入 stream 0
            let last_doc_code = pools.postings.last_doc_codes[i];
            let doc_freq = pools.postings.doc_freqs[i];
            if doc_freq == 1 {
                write_vint(pools, int_start, FREQ_STREAM, last_doc_code | 1)?;
            } else {
                write_vint(pools, int_start, FREQ_STREAM, last_doc_code)?;
                write_vint(pools, int_start, FREQ_STREAM, doc_freq)?;
            }
            pools.postings.doc_freqs[i] = 1;
            pools.postings.last_doc_codes[i] = (doc_id - last_doc_id) << 1;
            pools.postings.last_doc_ids[i] = doc_id;
            self.write_prox(pools, term_id, position, position, payload)?;
        } else {
            pools.postings.doc_freqs[i] += 1;
            let delta = position - pools.postings.last_positions[i];
            self.write_prox(pools, term_id, delta, position, payload)?;
        }
        Ok(())
    }

    fn write_prox(
        &mut self,
        pools: &mut TermsHashPools,
        term_id: TermId,
        delta: u32,
        position: u32,
        payload: Option<&[u8]>,
    ) -> crate::Result<()> {
        let i = term_id as usize;
        let int_start = pools.postings.int_starts[i] as usize;
        let payload = payload.unwrap_or_default();
        let payload_len = payload.len() as u32;

        if payload_len != pools.postings.last_payload_lens[i] {
            write_vint(pools, int_start, PROX_STREAM, (delta << 1) | 1)?;
            write_vint(pools, int_start, PROX_STREAM, payload_len)?;
            pools.postings.last_payload_lens[i] = payload_len;
        } else {
            write_vint(pools, int_start, PROX_STREAM, delta << 1)?;
        }
        if payload_len > 0 {
            write_bytes(pools, int_start, PROX_STREAM, payload)?;
            self.has_payloads = true;
        }
        pools.postings.last_positions[i] = position;
        Ok(())
    }

    /// Drop every buffered posting of the field, handing the handles back.
    pub fn reset(&mut self, pools: &mut TermsHashPools) {
        self.terms.clear(&mut pools.postings);
        self.has_payloads = false;
    }
}
