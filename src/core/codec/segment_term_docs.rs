use std::sync::Arc;

use super::{FieldInfo, SegmentTermEnum, TermInfo, TermInfosReader};
use crate::common::errors::{DataCorruption, TextIndexError};
use crate::core::postings::TermDocs;
use crate::core::skip_list::SkipListReader;
use crate::core::Term;
use crate::directory::{DataInput, IndexInput};
use crate::index::DeletedDocs;
use crate::DocId;

/// Callbacks letting a positions cursor follow the doc cursor it wraps.
pub(crate) trait ProxHooks {
    /// A new term was selected; its positions start at `prox_pointer`.
    fn term_changed(&mut self, _prox_pointer: u64, _store_payloads: bool) {}
    /// `next` is about to decode the next doc.
    fn before_next(&mut self) {}
    /// A deleted doc with `freq` positions was passed over.
    fn skipping_doc(&mut self, _freq: u32) {}
    /// `next` stopped on a doc with `freq` positions.
    fn doc_started(&mut self, _freq: u32) {}
    /// The skip list moved the doc stream; positions resume at `prox_pointer`.
    fn skip_prox(&mut self, _prox_pointer: u64, _payload_length: u32) {}
}

/// Hooks of a plain doc cursor.
pub(crate) struct NoProx;

impl ProxHooks for NoProx {}

/// Decoder of one term's doc stream, shared by [`SegmentTermDocs`] and
/// [`SegmentTermPositions`](super::SegmentTermPositions).
pub(crate) struct DocsCursor {
    freq_stream: IndexInput,
    term_infos: Arc<TermInfosReader>,
    deleted_docs: Option<Arc<DeletedDocs>>,
    skip_interval: u32,
    max_skip_levels: usize,
    /// Every decoded doc id must be below it.
    max_doc: u32,

    skip_list_reader: Option<SkipListReader>,
    have_skipped: bool,

    /// Docs decoded so far, deleted ones included.
    count: u32,
    df: u32,
    pub(crate) doc: DocId,
    pub(crate) freq: u32,

    freq_base_pointer: u64,
    prox_base_pointer: u64,
    skip_pointer: u64,
    pub(crate) store_payloads: bool,
    pub(crate) omit_tf: bool,
}

impl DocsCursor {
    pub(crate) fn new(
        freq_stream: IndexInput,
        term_infos: Arc<TermInfosReader>,
        deleted_docs: Option<Arc<DeletedDocs>>,
        max_doc: u32,
    ) -> Self {
        let skip_interval = term_infos.skip_interval();
        let max_skip_levels = term_infos.max_skip_levels() as usize;
        DocsCursor {
            freq_stream,
            term_infos,
            deleted_docs,
            skip_interval,
            max_skip_levels,
            max_doc,
            skip_list_reader: None,
            have_skipped: false,
            count: 0,
            df: 0,
            doc: 0,
            freq: 0,
            freq_base_pointer: 0,
            prox_base_pointer: 0,
            skip_pointer: 0,
            store_payloads: false,
            omit_tf: false,
        }
    }

    pub(crate) fn doc_freq(&self) -> u32 {
        self.df
    }

    pub(crate) fn seek_term<H: ProxHooks>(&mut self, term: &Term, hooks: &mut H) -> crate::Result<bool> {
        let info = self.term_infos.get(term)?;
        let field = self.term_infos.field_infos().field_info(term.field()).cloned();
        self.seek_info(field.as_ref(), info.as_ref(), hooks)?;
        Ok(self.df > 0)
    }

    pub(crate) fn seek_enum<H: ProxHooks>(
        &mut self,
        term_enum: &SegmentTermEnum,
        hooks: &mut H,
    ) -> crate::Result<bool> {
        let Some((field_number, _)) = term_enum.term_bytes() else {
            self.seek_info(None, None, hooks)?;
            return Ok(false);
        };
        let field = self.term_infos.field_infos().field_info_by_number(field_number).cloned();
        let info = term_enum.term_info();
        self.seek_info(field.as_ref(), Some(&info), hooks)?;
        Ok(self.df > 0)
    }

    fn seek_info<H: ProxHooks>(
        &mut self,
        field: Option<&FieldInfo>,
        info: Option<&TermInfo>,
        hooks: &mut H,
    ) -> crate::Result<()> {
        self.count = 0;
        self.omit_tf = field.map(|fi| fi.omit_term_freq_and_positions).unwrap_or_default();
        self.store_payloads = field.map(|fi| fi.store_payloads).unwrap_or_default();
        match info {
            None => {
                self.df = 0;
            }
            Some(info) => {
                if info.doc_freq > self.max_doc {
                    return Err(self.corruption(format!(
                        "doc freq {} exceeds the {} docs of the segment",
                        info.doc_freq, self.max_doc
                    )));
                }
                self.skip_pointer = if info.doc_freq >= self.skip_interval {
                    info.freq_pointer
                        .checked_add(info.skip_offset as u64)
                        .filter(|pointer| {
                            // 有 skip level 时 skip 数据不可能为空
                            let len = self.freq_stream.len();
                            info.skip_offset > 0 && (*pointer < len || self.max_skip_levels == 0 && *pointer == len)
                        })
                        .ok_or_else(|| {
                            self.corruption(format!(
                                "skip offset {} of a term starting at {} is outside the {} byte freq stream",
                                info.skip_offset,
                                info.freq_pointer,
                                self.freq_stream.len()
                            ))
                        })?
                } else {
                    0
                };
                self.df = info.doc_freq;
                self.doc = 0;
                self.freq_base_pointer = info.freq_pointer;
                self.prox_base_pointer = info.prox_pointer;
                self.freq_stream.seek(info.freq_pointer)?;
                self.have_skipped = false;
                hooks.term_changed(info.prox_pointer, self.store_payloads);
            }
        }
        Ok(())
    }

    fn is_deleted(&self, doc: DocId) -> bool {
        self.deleted_docs.as_ref().is_some_and(|deleted| deleted.is_deleted(doc))
    }

    fn corruption(&self, comment: String) -> TextIndexError {
        DataCorruption::new(self.freq_stream.name().into(), comment).into()
    }

    fn read_doc(&mut self) -> crate::Result<()> {
        let doc_code = self.freq_stream.read_vint()?;
        let delta = if self.omit_tf {
            self.freq = 1;
            doc_code
        } else {
            self.freq = if doc_code & 1 != 0 { 1 } else { self.freq_stream.read_vint()? };
            doc_code >> 1
        };
        if self.freq == 0 {
            return Err(self.corruption(format!("doc {} of the term has freq 0", self.count + 1)));
        }
        // 只有第一个 doc 的 delta 可以为 0
        if delta == 0 && self.count > 0 {
            return Err(self.corruption(format!("doc ids do not increase after doc {}", self.doc)));
        }
        self.doc = self.doc.checked_add(delta).filter(|doc| *doc < self.max_doc).ok_or_else(|| {
            self.corruption(format!(
                "doc {} + delta {} is not below max_doc {}",
                self.doc, delta, self.max_doc
            ))
        })?;
        self.count += 1;
        Ok(())
    }

    pub(crate) fn next<H: ProxHooks>(&mut self, hooks: &mut H) -> crate::Result<bool> {
        hooks.before_next();
        loop {
            if self.count == self.df {
                return Ok(false);
            }
            self.read_doc()?;
            if !self.is_deleted(self.doc) {
                break;
            }
            hooks.skipping_doc(self.freq);
        }
        hooks.doc_started(self.freq);
        Ok(true)
    }

    pub(crate) fn read(&mut self, docs: &mut [DocId], freqs: &mut [u32]) -> crate::Result<usize> {
        let length = docs.len().min(freqs.len());
        let mut i = 0;
        while i < length && self.count < self.df {
            self.read_doc()?;
            if !self.is_deleted(self.doc) {
                docs[i] = self.doc;
                freqs[i] = self.freq;
                i += 1;
            }
        }
        Ok(i)
    }

    pub(crate) fn skip_to<H: ProxHooks>(&mut self, target: DocId, hooks: &mut H) -> crate::Result<bool> {
        if self.df >= self.skip_interval {
            let reader = self.skip_list_reader.get_or_insert_with(|| {
                SkipListReader::new(self.freq_stream.clone(), self.max_skip_levels, self.skip_interval)
            });
            if !self.have_skipped {
                reader.init(
                    self.skip_pointer,
                    self.freq_base_pointer,
                    self.prox_base_pointer,
                    self.df,
                    self.store_payloads,
                );
                self.have_skipped = true;
            }
            let new_count = reader.skip_to(target)?;
            let (skip_doc, freq_pointer, prox_pointer, payload_length) =
                (reader.doc(), reader.freq_pointer(), reader.prox_pointer(), reader.payload_length());
            if new_count > self.count as i64 {
                if new_count > self.df as i64 || skip_doc >= self.max_doc {
                    return Err(self.corruption(format!(
                        "skip point to doc {} after {} docs is inconsistent with df {} and max_doc {}",
                        skip_doc, new_count, self.df, self.max_doc
                    )));
                }
                self.freq_stream.seek(freq_pointer)?;
                hooks.skip_prox(prox_pointer, payload_length);
                self.doc = skip_doc;
                self.count = new_count as u32;
            }
        }

        // 剩下的部分线性扫描
        loop {
            if !self.next(hooks)? {
                return Ok(false);
            }
            if self.doc >= target {
                return Ok(true);
            }
        }
    }
}

/// Cursor over the (doc, freq) postings of one term of a segment.
///
/// Deleted documents are never returned. Cursors are not shared between
/// threads, each query thread asks the segment reader for its own.
pub struct SegmentTermDocs {
    cursor: DocsCursor,
}

impl SegmentTermDocs {
    pub(crate) fn new(
        freq_stream: IndexInput,
        term_infos: Arc<TermInfosReader>,
        deleted_docs: Option<Arc<DeletedDocs>>,
        max_doc: u32,
    ) -> Self {
        SegmentTermDocs { cursor: DocsCursor::new(freq_stream, term_infos, deleted_docs, max_doc) }
    }

    /// Position on the current term of `term_enum` without a dictionary lookup.
    pub fn seek_enum(&mut self, term_enum: &SegmentTermEnum) -> crate::Result<bool> {
        self.cursor.seek_enum(term_enum, &mut NoProx)
    }

    /// Doc freq of the current term as stored in the dictionary (deleted docs included).
    pub fn doc_freq(&self) -> u32 {
        self.cursor.doc_freq()
    }
}

impl TermDocs for SegmentTermDocs {
    fn seek(&mut self, term: &Term) -> crate::Result<bool> {
        self.cursor.seek_term(term, &mut NoProx)
    }

    fn doc(&self) -> DocId {
        self.cursor.doc
    }

    fn freq(&self) -> u32 {
        self.cursor.freq
    }

    fn next(&mut self) -> crate::Result<bool> {
        self.cursor.next(&mut NoProx)
    }

    fn read(&mut self, docs: &mut [DocId], freqs: &mut [u32]) -> crate::Result<usize> {
        if docs.len() != freqs.len() {
            return Err(TextIndexError::InvalidArgument(format!(
                "docs ({}) and freqs ({}) buffers differ in length",
                docs.len(),
                freqs.len()
            )));
        }
        self.cursor.read(docs, freqs)
    }

    fn skip_to(&mut self, target: DocId) -> crate::Result<bool> {
        self.cursor.skip_to(target, &mut NoProx)
    }
}
