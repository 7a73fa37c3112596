use std::sync::Arc;

use super::segment_term_docs::{DocsCursor, ProxHooks};
use super::{SegmentTermEnum, TermInfosReader};
use crate::common::constants::MAX_POSITION;
use crate::common::errors::{DataCorruption, TextIndexError};
use crate::core::postings::{TermDocs, TermPositions};
use crate::core::Term;
use crate::directory::{DataInput, IndexInput};
use crate::index::DeletedDocs;
use crate::DocId;

/// Position state of a [`SegmentTermPositions`].
///
/// Positions of skipped documents are not decoded right away: the cursor
/// remembers where to seek and how many positions to pass over, and catches
/// up on the next `next_position`.
struct ProxCursor {
    prox_template: Option<IndexInput>,
    prox_stream: Option<IndexInput>,
    store_payloads: bool,

    /// Positions of the current doc not read yet.
    prox_count: u32,
    position: u32,
    payload_length: u32,
    need_to_load_payload: bool,
    payload: Vec<u8>,

    lazy_skip_pointer: Option<u64>,
    lazy_skip_prox_count: u64,
}

impl ProxHooks for ProxCursor {
    fn term_changed(&mut self, prox_pointer: u64, store_payloads: bool) {
        self.store_payloads = store_payloads;
        self.lazy_skip_pointer = Some(prox_pointer);
        self.lazy_skip_prox_count = 0;
        self.prox_count = 0;
        self.payload_length = 0;
        self.need_to_load_payload = false;
    }

    fn before_next(&mut self) {
        self.lazy_skip_prox_count += self.prox_count as u64;
        self.prox_count = 0;
    }

    fn skipping_doc(&mut self, freq: u32) {
        self.lazy_skip_prox_count += freq as u64;
    }

    fn doc_started(&mut self, freq: u32) {
        self.prox_count = freq;
        self.position = 0;
    }

    fn skip_prox(&mut self, prox_pointer: u64, payload_length: u32) {
        self.lazy_skip_pointer = Some(prox_pointer);
        self.lazy_skip_prox_count = 0;
        self.prox_count = 0;
        self.payload_length = payload_length;
        self.need_to_load_payload = false;
    }
}

impl ProxCursor {
    fn stream(&mut self) -> crate::Result<&mut IndexInput> {
        if self.prox_stream.is_none() {
            let template = self.prox_template.as_ref().ok_or_else(|| {
                TextIndexError::InternalError("the segment has no positions file".to_string())
            })?;
            self.prox_stream = Some(template.clone());
        }
        self.prox_stream
            .as_mut()
            .ok_or_else(|| TextIndexError::InternalError("positions stream unavailable".to_string()))
    }

    fn corruption(&self, comment: String) -> TextIndexError {
        let name = self.prox_template.as_ref().map(|input| input.name()).unwrap_or_default();
        DataCorruption::new(name.into(), comment).into()
    }

    fn read_delta_position(&mut self) -> crate::Result<u32> {
        let store_payloads = self.store_payloads;
        let stream = self.stream()?;
        let mut delta = stream.read_vint()?;
        if store_payloads {
            if delta & 1 != 0 {
                let stream = self.stream()?;
                let payload_length = stream.read_vint()?;
                if payload_length as u64 > stream.len() - stream.file_pointer() {
                    return Err(self.corruption(format!(
                        "payload of {payload_length} bytes runs past the end of the positions stream"
                    )));
                }
                self.payload_length = payload_length;
            }
            delta >>= 1;
            self.need_to_load_payload = true;
        }
        Ok(delta)
    }

    fn skip_payload(&mut self) -> crate::Result<()> {
        if self.need_to_load_payload && self.payload_length > 0 {
            let payload_length = self.payload_length as u64;
            let stream = self.stream()?;
            let pos = stream.file_pointer() + payload_length;
            stream.seek(pos)?;
        }
        self.need_to_load_payload = false;
        Ok(())
    }

    fn skip_positions(&mut self, n: u64) -> crate::Result<()> {
        for _ in 0..n {
            self.read_delta_position()?;
            self.skip_payload()?;
        }
        Ok(())
    }

    /// Apply the pending seek and position skips.
    fn lazy_skip(&mut self) -> crate::Result<()> {
        self.skip_payload()?;
        if let Some(pointer) = self.lazy_skip_pointer.take() {
            self.stream()?.seek(pointer)?;
        }
        if self.lazy_skip_prox_count != 0 {
            let count = std::mem::take(&mut self.lazy_skip_prox_count);
            self.skip_positions(count)?;
        }
        Ok(())
    }
}

/// [`SegmentTermDocs`](super::SegmentTermDocs) plus positions and payloads.
///
/// Batch [`read`](TermDocs::read) is not supported.
pub struct SegmentTermPositions {
    cursor: DocsCursor,
    prox: ProxCursor,
}

impl SegmentTermPositions {
    pub(crate) fn new(
        freq_stream: IndexInput,
        prox_stream: Option<IndexInput>,
        term_infos: Arc<TermInfosReader>,
        deleted_docs: Option<Arc<DeletedDocs>>,
        max_doc: u32,
    ) -> Self {
        SegmentTermPositions {
            cursor: DocsCursor::new(freq_stream, term_infos, deleted_docs, max_doc),
            prox: ProxCursor {
                prox_template: prox_stream,
                prox_stream: None,
                store_payloads: false,
                prox_count: 0,
                position: 0,
                payload_length: 0,
                need_to_load_payload: false,
                payload: Vec::new(),
                lazy_skip_pointer: None,
                lazy_skip_prox_count: 0,
            },
        }
    }

    pub fn seek_enum(&mut self, term_enum: &SegmentTermEnum) -> crate::Result<bool> {
        self.cursor.seek_enum(term_enum, &mut self.prox)
    }

    pub fn doc_freq(&self) -> u32 {
        self.cursor.doc_freq()
    }
}

impl TermDocs for SegmentTermPositions {
    fn seek(&mut self, term: &Term) -> crate::Result<bool> {
        self.cursor.seek_term(term, &mut self.prox)
    }

    fn doc(&self) -> DocId {
        self.cursor.doc
    }

    fn freq(&self) -> u32 {
        self.cursor.freq
    }

    fn next(&mut self) -> crate::Result<bool> {
        self.cursor.next(&mut self.prox)
    }

    fn read(&mut self, _docs: &mut [DocId], _freqs: &mut [u32]) -> crate::Result<usize> {
        Err(TextIndexError::UnsupportedOperation(
            "a positions cursor does not support batch reads".to_string(),
        ))
    }

    fn skip_to(&mut self, target: DocId) -> crate::Result<bool> {
        self.cursor.skip_to(target, &mut self.prox)
    }
}

impl TermPositions for SegmentTermPositions {
    fn next_position(&mut self) -> crate::Result<u32> {
        if self.cursor.omit_tf {
            return Ok(0);
        }
        if self.prox.prox_count == 0 {
            return Err(TextIndexError::InternalError(format!(
                "all {} positions of doc {} were already read",
                self.cursor.freq, self.cursor.doc
            )));
        }
        self.prox.lazy_skip()?;
        self.prox.prox_count -= 1;
        let delta = self.prox.read_delta_position()?;
        let position = self.prox.position;
        self.prox.position = position.checked_add(delta).filter(|p| *p <= MAX_POSITION).ok_or_else(|| {
            self.prox.corruption(format!(
                "position {} + delta {} of doc {} is larger than {}",
                position, delta, self.cursor.doc, MAX_POSITION
            ))
        })?;
        Ok(self.prox.position)
    }

    fn payload_length(&self) -> u32 {
        self.prox.payload_length
    }

    /// Payload at the current position; may be empty when the length is zero.
    fn payload(&mut self) -> crate::Result<&[u8]> {
        if !self.prox.need_to_load_payload {
            return Err(TextIndexError::UnsupportedOperation(
                "either no payload exists at this position or it was already read".to_string(),
            ));
        }
        let payload_length = self.prox.payload_length as usize;
        let stream = self.prox.stream()?;
        if payload_length as u64 > stream.len() - stream.file_pointer() {
            return Err(self.prox.corruption(format!(
                "payload of {payload_length} bytes runs past the end of the positions stream"
            )));
        }
        let mut payload = std::mem::take(&mut self.prox.payload);
        payload.resize(payload_length, 0);
        self.prox.stream()?.read_bytes(&mut payload)?;
        self.prox.payload = payload;
        self.prox.need_to_load_payload = false;
        Ok(&self.prox.payload)
    }

    fn is_payload_available(&self) -> bool {
        self.prox.need_to_load_payload && self.prox.payload_length > 0
    }
}
