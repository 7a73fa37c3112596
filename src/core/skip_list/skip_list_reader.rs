use super::num_skip_levels;
use crate::common::constants::NO_MORE_DOCS;
use crate::common::errors::{DataCorruption, TextIndexError};
use crate::directory::{DataInput, IndexInput};
use crate::DocId;

/// Reads the skip data written by [`SkipListWriter`](super::SkipListWriter).
///
/// Each level has its own clone of the freq stream. Every level keeps one
/// entry of lookahead: `skip_doc[level]` is the doc of the next entry, the
/// `last_*` fields describe the entry the caller may jump to.
pub struct SkipListReader {
    max_skip_levels: usize,
    number_of_skip_levels: usize,
    /// `skip_interval^(level+1)`.
    skip_interval: Vec<u64>,
    doc_count: u32,
    have_loaded_levels: bool,

    skip_stream: Vec<Option<IndexInput>>,
    skip_pointer: Vec<u64>,
    skip_doc: Vec<DocId>,
    num_skipped: Vec<u64>,
    child_pointer: Vec<u64>,

    freq_pointer: Vec<u64>,
    prox_pointer: Vec<u64>,
    payload_length: Vec<u32>,
    store_payloads: bool,

    last_doc: DocId,
    last_child_pointer: u64,
    last_freq_pointer: u64,
    last_prox_pointer: u64,
    last_payload_length: u32,
}

impl SkipListReader {
    pub fn new(skip_stream: IndexInput, max_skip_levels: usize, skip_interval: u32) -> Self {
        let mut intervals = Vec::with_capacity(max_skip_levels);
        let mut interval = skip_interval as u64;
        for _ in 0..max_skip_levels {
            intervals.push(interval);
            interval = interval.saturating_mul(skip_interval as u64);
        }
        let mut streams = vec![None; max_skip_levels];
        if let Some(first) = streams.first_mut() {
            *first = Some(skip_stream);
        }
        SkipListReader {
            max_skip_levels,
            number_of_skip_levels: 0,
            skip_interval: intervals,
            doc_count: 0,
            have_loaded_levels: false,
            skip_stream: streams,
            skip_pointer: vec![0; max_skip_levels],
            skip_doc: vec![0; max_skip_levels],
            num_skipped: vec![0; max_skip_levels],
            child_pointer: vec![0; max_skip_levels],
            freq_pointer: vec![0; max_skip_levels],
            prox_pointer: vec![0; max_skip_levels],
            payload_length: vec![0; max_skip_levels],
            store_payloads: false,
            last_doc: 0,
            last_child_pointer: 0,
            last_freq_pointer: 0,
            last_prox_pointer: 0,
            last_payload_length: 0,
        }
    }

    /// Prepare to skip over the postings of a term. Levels are read lazily on
    /// the first `skip_to`.
    pub fn init(
        &mut self,
        skip_pointer: u64,
        freq_base_pointer: u64,
        prox_base_pointer: u64,
        doc_count: u32,
        store_payloads: bool,
    ) {
        if let Some(first) = self.skip_pointer.first_mut() {
            *first = skip_pointer;
        }
        self.doc_count = doc_count;
        self.store_payloads = store_payloads;
        self.skip_doc.fill(0);
        self.num_skipped.fill(0);
        self.child_pointer.fill(0);
        self.freq_pointer.fill(freq_base_pointer);
        self.prox_pointer.fill(prox_base_pointer);
        self.payload_length.fill(0);
        self.have_loaded_levels = false;
        for stream in self.skip_stream.iter_mut().skip(1) {
            *stream = None;
        }
        self.last_doc = 0;
        self.last_child_pointer = 0;
        self.last_freq_pointer = freq_base_pointer;
        self.last_prox_pointer = prox_base_pointer;
        self.last_payload_length = 0;
    }

    /// Doc id of the last skip point taken.
    pub fn doc(&self) -> DocId {
        self.last_doc
    }

    pub fn freq_pointer(&self) -> u64 {
        self.last_freq_pointer
    }

    pub fn prox_pointer(&self) -> u64 {
        self.last_prox_pointer
    }

    pub fn payload_length(&self) -> u32 {
        self.last_payload_length
    }

    /// Jump to the last skip point whose doc is `< target`.
    ///
    /// Returns how many documents precede the resume position, or a negative
    /// number when no skip point was taken.
    pub fn skip_to(&mut self, target: DocId) -> crate::Result<i64> {
        if self.max_skip_levels == 0 {
            return Ok(-1);
        }
        if !self.have_loaded_levels {
            self.load_skip_levels()?;
            self.have_loaded_levels = true;
        }

        // 先找到最高的、下一个 skip doc 仍小于 target 的层
        let mut level = 0;
        while level + 1 < self.number_of_skip_levels && target > self.skip_doc[level + 1] {
            level += 1;
        }

        loop {
            if target > self.skip_doc[level] {
                // 读完的层会把 skip_doc 置为 NO_MORE_DOCS, 下一轮就会下降
                self.load_next_skip(level)?;
                continue;
            }
            if level > 0 && self.last_child_pointer > self.stream_pointer(level - 1) {
                self.seek_child(level - 1)?;
            }
            if level == 0 {
                break;
            }
            level -= 1;
        }

        Ok(self.num_skipped[0] as i64 - self.skip_interval[0] as i64 - 1)
    }

    fn stream_pointer(&self, level: usize) -> u64 {
        self.skip_stream[level].as_ref().map(|s| s.file_pointer()).unwrap_or_default()
    }

    fn stream(&mut self, level: usize) -> crate::Result<&mut IndexInput> {
        self.skip_stream[level].as_mut().ok_or_else(|| {
            crate::TextIndexError::InternalError(format!("skip level {level} was not loaded"))
        })
    }

    fn load_next_skip(&mut self, level: usize) -> crate::Result<bool> {
        self.set_last_skip_data(level);

        self.num_skipped[level] += self.skip_interval[level];
        if self.num_skipped[level] > self.doc_count as u64 {
            // 当前层已经读完
            self.skip_doc[level] = NO_MORE_DOCS;
            if self.number_of_skip_levels > level {
                self.number_of_skip_levels = level;
            }
            return Ok(false);
        }

        let delta = self.read_skip_data(level)?;
        let skip_doc = self.skip_doc[level];
        self.skip_doc[level] = skip_doc
            .checked_add(delta)
            .filter(|doc| *doc != NO_MORE_DOCS)
            .ok_or_else(|| self.corruption(format!("skip doc {skip_doc} + delta {delta} on level {level}")))?;

        if level != 0 {
            let child = self.stream(level)?.read_vlong()?;
            self.child_pointer[level] = self.add_pointer(self.skip_pointer[level - 1], child, "child")?;
        }
        Ok(true)
    }

    fn corruption(&self, comment: String) -> TextIndexError {
        let name = self.skip_stream.first().and_then(Option::as_ref).map(|s| s.name()).unwrap_or_default();
        DataCorruption::new(name.into(), comment).into()
    }

    fn add_pointer(&self, base: u64, delta: u64, kind: &str) -> crate::Result<u64> {
        base.checked_add(delta)
            .ok_or_else(|| self.corruption(format!("{kind} pointer {base} + {delta} overflows")))
    }

    fn read_skip_data(&mut self, level: usize) -> crate::Result<DocId> {
        let store_payloads = self.store_payloads;
        let stream = self.stream(level)?;
        let mut delta = stream.read_vint()?;
        let mut payload_length = None;
        if store_payloads {
            if delta & 1 != 0 {
                payload_length = Some(stream.read_vint()?);
            }
            delta >>= 1;
        }
        let freq_delta = stream.read_vlong()?;
        let prox_delta = stream.read_vlong()?;

        if let Some(payload_length) = payload_length {
            self.payload_length[level] = payload_length;
        }
        self.freq_pointer[level] = self.add_pointer(self.freq_pointer[level], freq_delta, "freq")?;
        self.prox_pointer[level] = self.add_pointer(self.prox_pointer[level], prox_delta, "prox")?;
        Ok(delta)
    }

    fn seek_child(&mut self, level: usize) -> crate::Result<()> {
        let last_child_pointer = self.last_child_pointer;
        self.stream(level)?.seek(last_child_pointer)?;
        self.num_skipped[level] = self.num_skipped[level + 1] - self.skip_interval[level + 1];
        self.skip_doc[level] = self.last_doc;
        self.freq_pointer[level] = self.last_freq_pointer;
        self.prox_pointer[level] = self.last_prox_pointer;
        self.payload_length[level] = self.last_payload_length;
        if level > 0 {
            let child = self.stream(level)?.read_vlong()?;
            self.child_pointer[level] = self.add_pointer(self.skip_pointer[level - 1], child, "child")?;
        }
        Ok(())
    }

    fn set_last_skip_data(&mut self, level: usize) {
        self.last_doc = self.skip_doc[level];
        self.last_child_pointer = self.child_pointer[level];
        self.last_freq_pointer = self.freq_pointer[level];
        self.last_prox_pointer = self.prox_pointer[level];
        self.last_payload_length = self.payload_length[level];
    }

    /// Read the level lengths and open one stream clone per level.
    fn load_skip_levels(&mut self) -> crate::Result<()> {
        self.number_of_skip_levels =
            num_skip_levels(self.doc_count, self.skip_interval[0] as u32, self.max_skip_levels);

        let base = self.skip_pointer[0];
        let stream0 = self.stream(0)?;
        stream0.seek(base)?;
        for level in (1..self.number_of_skip_levels).rev() {
            let stream0 = self.stream(0)?;
            let length = stream0.read_vlong()?;
            let level_start = stream0.file_pointer();
            let level_stream = stream0.clone();
            let level_end = level_start.checked_add(length).unwrap_or(u64::MAX);
            stream0.seek(level_end)?;
            self.skip_pointer[level] = level_start;
            self.skip_stream[level] = Some(level_stream);
        }
        self.skip_pointer[0] = self.stream_pointer(0);
        Ok(())
    }
}
