use super::num_skip_levels;
use crate::directory::{DataOutput, IndexOutput, RamOutput};
use crate::DocId;

/// Buffers the skip entries of one term in memory, one buffer per level,
/// and appends them to the freq stream when the term is finished.
///
/// An entry describes the state right *before* a document: the previous doc
/// id, the payload length in effect, and the freq/prox file pointers.
pub struct SkipListWriter {
    skip_interval: u32,
    number_of_skip_levels: usize,
    skip_buffer: Vec<RamOutput>,

    last_skip_doc: Vec<DocId>,
    last_skip_payload_length: Vec<Option<u32>>,
    last_skip_freq_pointer: Vec<u64>,
    last_skip_prox_pointer: Vec<u64>,

    cur_doc: DocId,
    cur_store_payloads: bool,
    cur_payload_length: u32,
    cur_freq_pointer: u64,
    cur_prox_pointer: u64,
}

impl SkipListWriter {
    /// `doc_count` bounds the doc freq of every term that will be written.
    pub fn new(skip_interval: u32, max_skip_levels: usize, doc_count: u32) -> Self {
        let number_of_skip_levels = num_skip_levels(doc_count, skip_interval, max_skip_levels);
        SkipListWriter {
            skip_interval,
            number_of_skip_levels,
            skip_buffer: (0..number_of_skip_levels).map(|_| RamOutput::new()).collect(),
            last_skip_doc: vec![0; number_of_skip_levels],
            last_skip_payload_length: vec![None; number_of_skip_levels],
            last_skip_freq_pointer: vec![0; number_of_skip_levels],
            last_skip_prox_pointer: vec![0; number_of_skip_levels],
            cur_doc: 0,
            cur_store_payloads: false,
            cur_payload_length: 0,
            cur_freq_pointer: 0,
            cur_prox_pointer: 0,
        }
    }

    pub fn number_of_skip_levels(&self) -> usize {
        self.number_of_skip_levels
    }

    /// Start a new term whose postings begin at the given file pointers.
    pub fn reset_skip(&mut self, freq_pointer: u64, prox_pointer: u64) {
        for buffer in self.skip_buffer.iter_mut() {
            buffer.reset();
        }
        self.last_skip_doc.fill(0);
        self.last_skip_payload_length.fill(None);
        self.last_skip_freq_pointer.fill(freq_pointer);
        self.last_skip_prox_pointer.fill(prox_pointer);
    }

    /// State of the next entry to buffer.
    pub fn set_skip_data(
        &mut self,
        doc: DocId,
        store_payloads: bool,
        payload_length: u32,
        freq_pointer: u64,
        prox_pointer: u64,
    ) {
        self.cur_doc = doc;
        self.cur_store_payloads = store_payloads;
        self.cur_payload_length = payload_length;
        self.cur_freq_pointer = freq_pointer;
        self.cur_prox_pointer = prox_pointer;
    }

    /// Buffer the current skip data on every level whose interval divides `df`.
    pub fn buffer_skip(&mut self, df: u32) -> crate::Result<()> {
        let mut num_levels = 0;
        let mut remaining = df;
        while remaining % self.skip_interval == 0 && num_levels < self.number_of_skip_levels {
            num_levels += 1;
            remaining /= self.skip_interval;
        }

        let mut child_pointer = 0u64;
        for level in 0..num_levels {
            self.write_skip_data(level)?;
            let new_child_pointer = self.skip_buffer[level].file_pointer();
            if level != 0 {
                // 指向下一层中刚写入的 entry 之后的位置
                self.skip_buffer[level].write_vlong(child_pointer)?;
            }
            child_pointer = new_child_pointer;
        }
        Ok(())
    }

    fn write_skip_data(&mut self, level: usize) -> crate::Result<()> {
        let buffer = &mut self.skip_buffer[level];
        let doc_delta = self.cur_doc - self.last_skip_doc[level];
        if self.cur_store_payloads {
            if self.last_skip_payload_length[level] == Some(self.cur_payload_length) {
                buffer.write_vint(doc_delta << 1)?;
            } else {
                buffer.write_vint((doc_delta << 1) | 1)?;
                buffer.write_vint(self.cur_payload_length)?;
                self.last_skip_payload_length[level] = Some(self.cur_payload_length);
            }
        } else {
            buffer.write_vint(doc_delta)?;
        }
        buffer.write_vlong(self.cur_freq_pointer - self.last_skip_freq_pointer[level])?;
        buffer.write_vlong(self.cur_prox_pointer - self.last_skip_prox_pointer[level])?;

        self.last_skip_doc[level] = self.cur_doc;
        self.last_skip_freq_pointer[level] = self.cur_freq_pointer;
        self.last_skip_prox_pointer[level] = self.cur_prox_pointer;
        Ok(())
    }

    /// Append the buffered levels to `output`, highest first, returning the
    /// file pointer the skip data starts at.
    pub fn write_skip(&self, output: &mut dyn IndexOutput) -> crate::Result<u64> {
        let skip_pointer = output.file_pointer();
        if self.skip_buffer.is_empty() {
            return Ok(skip_pointer);
        }
        for level in (1..self.number_of_skip_levels).rev() {
            let length = self.skip_buffer[level].file_pointer();
            if length > 0 {
                output.write_vlong(length)?;
                self.skip_buffer[level].write_to(output)?;
            }
        }
        self.skip_buffer[0].write_to(output)?;
        Ok(skip_pointer)
    }
}
