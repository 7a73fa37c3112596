use std::sync::Arc;

use super::{FieldInfo, FieldInfos, TermInfo, TermInfosWriter};
use crate::common::errors::TextIndexError;
use crate::core::skip_list::SkipListWriter;
use crate::directory::{DataOutput, Directory, IndexOutput};
use crate::index::SegmentComponent;
use crate::DocId;

/// Parameters persisted with a segment that writer and readers must agree on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostingsFormat {
    pub skip_interval: u32,
    pub max_skip_levels: u32,
    pub term_index_interval: u32,
}

/// Writes the postings of a segment: `.frq` (doc stream + skip data), `.prx`
/// (positions and payloads) and the term dictionary.
///
/// Call order: `start_field`, then per term `start_term`, `add_doc` (each
/// followed by its `add_position` calls) and `finish_term`; `close` at the end.
pub struct SegmentPostingsWriter {
    field_infos: Arc<FieldInfos>,
    freq_out: Box<dyn IndexOutput>,
    prox_out: Option<Box<dyn IndexOutput>>,
    terms_writer: TermInfosWriter,
    skip_writer: SkipListWriter,
    skip_interval: u32,

    field: Option<FieldInfo>,

    freq_start: u64,
    prox_start: u64,
    doc_freq: u32,
    last_doc_id: Option<DocId>,
    positions_left: u32,
    last_position: u32,
    /// Payload length of the last position written for the current term.
    last_payload_length: Option<u32>,
}

impl SegmentPostingsWriter {
    /// `doc_count` is the number of documents of the segment, it bounds the skip levels.
    pub fn create(
        directory: &dyn Directory,
        segment: &str,
        field_infos: Arc<FieldInfos>,
        doc_count: u32,
        format: PostingsFormat,
    ) -> crate::Result<Self> {
        let freq_out = directory.create_output(&SegmentComponent::Freq.file_name(segment))?;
        let prox_out = if field_infos.has_prox() {
            Some(directory.create_output(&SegmentComponent::Prox.file_name(segment))?)
        } else {
            None
        };
        let terms_writer = TermInfosWriter::create(
            directory,
            &SegmentComponent::TermInfos.file_name(segment),
            &SegmentComponent::TermIndex.file_name(segment),
            format.term_index_interval,
            format.skip_interval,
            format.max_skip_levels,
        )?;
        Ok(SegmentPostingsWriter {
            field_infos,
            freq_out,
            prox_out,
            terms_writer,
            skip_writer: SkipListWriter::new(
                format.skip_interval,
                format.max_skip_levels as usize,
                doc_count,
            ),
            skip_interval: format.skip_interval,
            field: None,
            freq_start: 0,
            prox_start: 0,
            doc_freq: 0,
            last_doc_id: None,
            positions_left: 0,
            last_position: 0,
            last_payload_length: None,
        })
    }

    fn prox_pointer(&self) -> u64 {
        self.prox_out.as_ref().map(|out| out.file_pointer()).unwrap_or_default()
    }

    fn current_field(&self) -> crate::Result<&FieldInfo> {
        self.field
            .as_ref()
            .ok_or_else(|| TextIndexError::InternalError("no field was started".to_string()))
    }

    pub fn start_field(&mut self, field_name: &str) -> crate::Result<()> {
        let field = self.field_infos.field_info(field_name).cloned().ok_or_else(|| {
            TextIndexError::InternalError(format!("field `{field_name}` is not in the field infos"))
        })?;
        self.field = Some(field);
        Ok(())
    }

    pub fn start_term(&mut self) -> crate::Result<()> {
        self.current_field()?;
        self.freq_start = self.freq_out.file_pointer();
        self.prox_start = self.prox_pointer();
        self.skip_writer.reset_skip(self.freq_start, self.prox_start);
        self.doc_freq = 0;
        self.last_doc_id = None;
        self.positions_left = 0;
        self.last_payload_length = None;
        Ok(())
    }

    /// Add the next document of the current term. Must be followed by exactly
    /// `freq` calls to [`add_position`](Self::add_position) unless the field
    /// omits positions.
    pub fn add_doc(&mut self, doc_id: DocId, freq: u32) -> crate::Result<()> {
        let (omit_tf, store_payloads) = {
            let field = self.current_field()?;
            (field.omit_term_freq_and_positions, field.store_payloads)
        };
        if self.positions_left > 0 {
            return Err(TextIndexError::InternalError(format!(
                "{} positions of the previous doc are missing",
                self.positions_left
            )));
        }
        if let Some(last_doc_id) = self.last_doc_id {
            if doc_id <= last_doc_id {
                return Err(TextIndexError::InternalError(format!(
                    "docs out of order: {doc_id} after {last_doc_id}"
                )));
            }
        }
        if freq == 0 {
            return Err(TextIndexError::InternalError(format!("doc {doc_id} has a zero freq")));
        }

        self.doc_freq += 1;
        if self.doc_freq % self.skip_interval == 0 {
            // skip entry 记录的是写入当前文档之前的状态
            let prox_pointer = self.prox_pointer();
            self.skip_writer.set_skip_data(
                self.last_doc_id.unwrap_or_default(),
                store_payloads,
                self.last_payload_length.unwrap_or_default(),
                self.freq_out.file_pointer(),
                prox_pointer,
            );
            self.skip_writer.buffer_skip(self.doc_freq)?;
        }

        let delta = doc_id - self.last_doc_id.unwrap_or_default();
        if omit_tf {
            self.freq_out.write_vint(delta)?;
        } else if freq == 1 {
            self.freq_out.write_vint((delta << 1) | 1)?;
        } else {
            self.freq_out.write_vint(delta << 1)?;
            self.freq_out.write_vint(freq)?;
        }
        self.last_doc_id = Some(doc_id);
        self.last_position = 0;
        self.positions_left = if omit_tf { 0 } else { freq };
        Ok(())
    }

    pub fn add_position(&mut self, position: u32, payload: &[u8]) -> crate::Result<()> {
        let store_payloads = self.current_field()?.store_payloads;
        if self.positions_left == 0 {
            return Err(TextIndexError::InternalError(
                "more positions than the doc freq".to_string(),
            ));
        }
        if position < self.last_position {
            return Err(TextIndexError::InternalError(format!(
                "positions out of order: {} after {}",
                position, self.last_position
            )));
        }
        let prox_out = self
            .prox_out
            .as_mut()
            .ok_or_else(|| TextIndexError::InternalError("segment has no prox file".to_string()))?;
        let delta = position - self.last_position;
        if store_payloads {
            let payload_length = payload.len() as u32;
            if self.last_payload_length == Some(payload_length) {
                prox_out.write_vint(delta << 1)?;
            } else {
                prox_out.write_vint((delta << 1) | 1)?;
                prox_out.write_vint(payload_length)?;
                self.last_payload_length = Some(payload_length);
            }
            prox_out.write_bytes(payload)?;
        } else {
            prox_out.write_vint(delta)?;
        }
        self.last_position = position;
        self.positions_left -= 1;
        Ok(())
    }

    /// Append the skip data and the dictionary entry of the current term.
    /// A term without documents is dropped.
    pub fn finish_term(&mut self, text: &[u8]) -> crate::Result<()> {
        let field_number = self.current_field()?.number;
        if self.positions_left > 0 {
            return Err(TextIndexError::InternalError(format!(
                "{} positions of the last doc are missing",
                self.positions_left
            )));
        }
        if self.doc_freq == 0 {
            return Ok(());
        }
        let skip_pointer = self.skip_writer.write_skip(self.freq_out.as_mut())?;
        let skip_offset = u32::try_from(skip_pointer - self.freq_start).map_err(|_| {
            TextIndexError::InternalError(format!(
                "doc stream of {} docs is too large for a skip offset",
                self.doc_freq
            ))
        })?;
        let info = TermInfo {
            doc_freq: self.doc_freq,
            freq_pointer: self.freq_start,
            prox_pointer: self.prox_start,
            skip_offset,
        };
        self.terms_writer.add(field_number, text, &info)
    }

    pub fn num_terms(&self) -> u64 {
        self.terms_writer.size()
    }

    pub fn close(mut self) -> crate::Result<()> {
        self.terms_writer.close()?;
        self.freq_out.close()?;
        if let Some(prox_out) = self.prox_out.as_mut() {
            prox_out.close()?;
        }
        Ok(())
    }
}
