/// Dictionary entry of one term: where its postings start and how many docs it has.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TermInfo {
    pub doc_freq: u32,
    /// Start of the term's doc stream in `.frq`.
    pub freq_pointer: u64,
    /// Start of the term's positions in `.prx`.
    pub prox_pointer: u64,
    /// Offset of the skip data from `freq_pointer`, only meaningful when
    /// `doc_freq >= skip_interval`.
    pub skip_offset: u32,
}
