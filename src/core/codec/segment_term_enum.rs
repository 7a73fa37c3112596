use std::cmp::Ordering;
use std::sync::Arc;

use super::{FieldInfos, TermInfo};
use crate::common::errors::DataCorruption;
use crate::core::Term;
use crate::directory::{DataInput, IndexInput};

/// Sequential cursor over the `.tis` records of a segment.
///
/// Starts before the first term; each [`next`](SegmentTermEnum::next)
/// decodes one record.
#[derive(Clone)]
pub struct SegmentTermEnum {
    input: IndexInput,
    field_infos: Arc<FieldInfos>,
    size: u64,
    skip_interval: u32,

    /// Number of records decoded so far.
    position: u64,
    field_number: Option<u32>,
    term_buffer: Vec<u8>,
    term_info: TermInfo,
}

impl SegmentTermEnum {
    /// `input` must be positioned on the first record.
    pub(crate) fn new(
        input: IndexInput,
        field_infos: Arc<FieldInfos>,
        size: u64,
        skip_interval: u32,
    ) -> Self {
        SegmentTermEnum {
            input,
            field_infos,
            size,
            skip_interval,
            position: 0,
            field_number: None,
            term_buffer: Vec::new(),
            term_info: TermInfo::default(),
        }
    }

    /// Resume decoding at an indexed record.
    pub(crate) fn seek(
        &mut self,
        pointer: u64,
        position: u64,
        prev_freq_pointer: u64,
        prev_prox_pointer: u64,
    ) -> crate::Result<()> {
        self.input.seek(pointer)?;
        self.position = position;
        self.field_number = None;
        self.term_buffer.clear();
        self.term_info = TermInfo {
            doc_freq: 0,
            freq_pointer: prev_freq_pointer,
            prox_pointer: prev_prox_pointer,
            skip_offset: 0,
        };
        Ok(())
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    fn corruption(&self, comment: String) -> crate::TextIndexError {
        DataCorruption::new(self.input.name().into(), comment).into()
    }

    /// Decode the next record, `false` once every term was read.
    pub fn next(&mut self) -> crate::Result<bool> {
        if self.position >= self.size {
            self.field_number = None;
            self.term_buffer.clear();
            return Ok(false);
        }
        let prefix = self.input.read_vint()? as usize;
        let suffix_len = self.input.read_vint()? as usize;
        if prefix > self.term_buffer.len() {
            return Err(self.corruption(format!(
                "shared prefix {} longer than the previous term ({} bytes) at record {}",
                prefix,
                self.term_buffer.len(),
                self.position
            )));
        }
        if suffix_len as u64 > self.input.len() - self.input.file_pointer() {
            return Err(self.corruption(format!("term suffix of {suffix_len} bytes runs past the end")));
        }
        self.term_buffer.truncate(prefix);
        self.term_buffer.resize(prefix + suffix_len, 0);
        self.input.read_bytes(&mut self.term_buffer[prefix..])?;

        let field_number = self.input.read_vint()?;
        if field_number as usize >= self.field_infos.len() {
            return Err(self.corruption(format!(
                "field number {} out of range, the segment has {} fields",
                field_number,
                self.field_infos.len()
            )));
        }
        let doc_freq = self.input.read_vint()?;
        let freq_delta = self.input.read_vlong()?;
        let prox_delta = self.input.read_vlong()?;
        let skip_offset = if doc_freq >= self.skip_interval { self.input.read_vint()? } else { 0 };

        let (Some(freq_pointer), Some(prox_pointer)) = (
            self.term_info.freq_pointer.checked_add(freq_delta),
            self.term_info.prox_pointer.checked_add(prox_delta),
        ) else {
            return Err(self.corruption(format!("postings pointers overflow at record {}", self.position)));
        };
        if doc_freq == 0 {
            return Err(self.corruption(format!("term of record {} has no docs", self.position)));
        }

        self.field_number = Some(field_number);
        self.term_info = TermInfo { doc_freq, freq_pointer, prox_pointer, skip_offset };
        self.position += 1;
        Ok(true)
    }

    /// Field number and text bytes of the current term.
    pub fn term_bytes(&self) -> Option<(u32, &[u8])> {
        self.field_number.map(|number| (number, self.term_buffer.as_slice()))
    }

    /// Current term, `None` before the first or after the last record.
    pub fn term(&self) -> crate::Result<Option<Term>> {
        let Some((number, bytes)) = self.term_bytes() else {
            return Ok(None);
        };
        let field = self
            .field_infos
            .field_info_by_number(number)
            .ok_or_else(|| self.corruption(format!("unknown field number {number}")))?;
        let text = std::str::from_utf8(bytes)
            .map_err(|e| self.corruption(format!("term text is not valid UTF-8: {e}")))?;
        Ok(Some(Term::new(field.name.as_str(), text)))
    }

    pub fn term_info(&self) -> TermInfo {
        self.term_info
    }

    pub fn doc_freq(&self) -> u32 {
        self.term_info.doc_freq
    }

    /// Compare the current term against `(field_number, text)`.
    /// A finished enum compares greater than everything.
    pub(crate) fn compare_current(&self, field_number: u32, text: &[u8]) -> Ordering {
        match self.term_bytes() {
            Some((number, bytes)) => number.cmp(&field_number).then_with(|| bytes.cmp(text)),
            None => Ordering::Greater,
        }
    }

    /// Advance until the current term is `>= (field_number, text)`.
    /// Returns `false` when the dictionary ran out first.
    pub(crate) fn scan_to(&mut self, field_number: u32, text: &[u8]) -> crate::Result<bool> {
        loop {
            if self.field_number.is_some() && self.compare_current(field_number, text) != Ordering::Less {
                return Ok(true);
            }
            if !self.next()? {
                return Ok(false);
            }
        }
    }
}
