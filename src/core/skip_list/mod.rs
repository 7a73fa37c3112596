//! Multi-level skip data stored after the doc stream of every term with
//! enough documents.
//!
//! Level 0 has one entry every `skip_interval` documents, level `k` one entry
//! every `skip_interval^(k+1)` documents. Levels above 0 carry a pointer into
//! the level below so a seek walks down the levels like a B-tree.

mod skip_list_reader;
mod skip_list_writer;

pub use skip_list_reader::SkipListReader;
pub use skip_list_writer::SkipListWriter;

/// `min(max_skip_levels, floor(log_skip_interval(doc_count)))`, in integer math.
pub fn num_skip_levels(doc_count: u32, skip_interval: u32, max_skip_levels: usize) -> usize {
    let mut levels = 0;
    let mut remaining = doc_count;
    while remaining >= skip_interval && levels < max_skip_levels {
        remaining /= skip_interval;
        levels += 1;
    }
    levels
}
