use std::cmp::Ordering;

use log::debug;

use super::TermInfo;
use crate::common::constants::TERM_INFOS_FORMAT;
use crate::common::errors::TextIndexError;
use crate::directory::{DataOutput, Directory, IndexOutput};

/// Byte offset of the entry count in `.tis`/`.tii` headers.
pub(crate) const SIZE_OFFSET: u64 = 4;

fn shared_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

/// Writes the term dictionary of a segment: every term into `.tis`, every
/// `index_interval`-th term also into `.tii`.
///
/// `.tis` record: shared prefix length, suffix length, suffix bytes, field
/// number, doc freq, freq pointer delta, prox pointer delta and, when
/// `doc_freq >= skip_interval`, the skip offset. Indexed records always use
/// a zero shared prefix so a reader can start decoding at them.
///
/// `.tii` record: shared prefix with the previous index term, suffix, field
/// number, then deltas of the `.tis` offset and of the freq/prox pointers of
/// the term *preceding* the indexed one (the base of its pointer deltas).
pub struct TermInfosWriter {
    tis: Box<dyn IndexOutput>,
    tii: Box<dyn IndexOutput>,
    index_interval: u32,
    skip_interval: u32,

    size: u64,
    last_field_number: Option<u32>,
    last_term: Vec<u8>,
    last_info: TermInfo,

    index_size: u64,
    last_index_term: Vec<u8>,
    last_index_pointer: u64,
    last_index_freq_pointer: u64,
    last_index_prox_pointer: u64,
}

fn write_header(
    output: &mut dyn IndexOutput,
    index_interval: u32,
    skip_interval: u32,
    max_skip_levels: u32,
) -> crate::Result<()> {
    output.write_int(TERM_INFOS_FORMAT)?;
    // entry count, patched on close
    output.write_long(0)?;
    output.write_int(index_interval as i32)?;
    output.write_int(skip_interval as i32)?;
    output.write_int(max_skip_levels as i32)?;
    Ok(())
}

impl TermInfosWriter {
    pub fn create(
        directory: &dyn Directory,
        tis_name: &str,
        tii_name: &str,
        index_interval: u32,
        skip_interval: u32,
        max_skip_levels: u32,
    ) -> crate::Result<Self> {
        let mut tis = directory.create_output(tis_name)?;
        let mut tii = directory.create_output(tii_name)?;
        write_header(tis.as_mut(), index_interval, skip_interval, max_skip_levels)?;
        write_header(tii.as_mut(), index_interval, skip_interval, max_skip_levels)?;
        Ok(TermInfosWriter {
            tis,
            tii,
            index_interval,
            skip_interval,
            size: 0,
            last_field_number: None,
            last_term: Vec::new(),
            last_info: TermInfo::default(),
            index_size: 0,
            last_index_term: Vec::new(),
            last_index_pointer: 0,
            last_index_freq_pointer: 0,
            last_index_prox_pointer: 0,
        })
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Append a term. Terms must arrive in strictly increasing
    /// `(field_number, text)` order.
    pub fn add(&mut self, field_number: u32, text: &[u8], info: &TermInfo) -> crate::Result<()> {
        if let Some(last_field_number) = self.last_field_number {
            let order = last_field_number
                .cmp(&field_number)
                .then_with(|| self.last_term.as_slice().cmp(text));
            if order != Ordering::Less {
                return Err(TextIndexError::InternalError(format!(
                    "terms out of order: ({}, {:?}) after ({}, {:?})",
                    field_number,
                    String::from_utf8_lossy(text),
                    last_field_number,
                    String::from_utf8_lossy(&self.last_term)
                )));
            }
        }
        if info.freq_pointer < self.last_info.freq_pointer
            || info.prox_pointer < self.last_info.prox_pointer
        {
            return Err(TextIndexError::InternalError(format!(
                "postings pointers went backwards: {:?} after {:?}",
                info, self.last_info
            )));
        }

        let is_indexed = self.size % self.index_interval as u64 == 0;
        if is_indexed {
            self.add_index_term(field_number, text)?;
        }

        let prefix = if is_indexed { 0 } else { shared_prefix_len(&self.last_term, text) };
        let suffix = &text[prefix..];
        self.tis.write_vint(prefix as u32)?;
        self.tis.write_vint(suffix.len() as u32)?;
        self.tis.write_bytes(suffix)?;
        self.tis.write_vint(field_number)?;
        self.tis.write_vint(info.doc_freq)?;
        self.tis.write_vlong(info.freq_pointer - self.last_info.freq_pointer)?;
        self.tis.write_vlong(info.prox_pointer - self.last_info.prox_pointer)?;
        if info.doc_freq >= self.skip_interval {
            self.tis.write_vint(info.skip_offset)?;
        }

        self.last_field_number = Some(field_number);
        self.last_term.clear();
        self.last_term.extend_from_slice(text);
        self.last_info = *info;
        self.size += 1;
        Ok(())
    }

    fn add_index_term(&mut self, field_number: u32, text: &[u8]) -> crate::Result<()> {
        let term_pointer = self.tis.file_pointer();
        let prefix = shared_prefix_len(&self.last_index_term, text);
        let suffix = &text[prefix..];
        self.tii.write_vint(prefix as u32)?;
        self.tii.write_vint(suffix.len() as u32)?;
        self.tii.write_bytes(suffix)?;
        self.tii.write_vint(field_number)?;
        self.tii.write_vlong(term_pointer - self.last_index_pointer)?;
        self.tii.write_vlong(self.last_info.freq_pointer - self.last_index_freq_pointer)?;
        self.tii.write_vlong(self.last_info.prox_pointer - self.last_index_prox_pointer)?;

        self.last_index_term.clear();
        self.last_index_term.extend_from_slice(text);
        self.last_index_pointer = term_pointer;
        self.last_index_freq_pointer = self.last_info.freq_pointer;
        self.last_index_prox_pointer = self.last_info.prox_pointer;
        self.index_size += 1;
        Ok(())
    }

    /// Patch the entry counts into both headers and close the files.
    pub fn close(mut self) -> crate::Result<()> {
        self.tis.seek(SIZE_OFFSET)?;
        self.tis.write_long(self.size as i64)?;
        self.tis.close()?;
        self.tii.seek(SIZE_OFFSET)?;
        self.tii.write_long(self.index_size as i64)?;
        self.tii.close()?;
        debug!("term dictionary closed with {} terms, {} index terms", self.size, self.index_size);
        Ok(())
    }
}
