mod freq_prox_reader;
mod freq_prox_writer;
mod postings_array;
mod term_docs;
mod terms_hash;

pub use freq_prox_reader::FreqProxFieldMergeState;
pub use freq_prox_writer::{FreqProxTermsWriterPerField, FREQ_STREAM, PROX_STREAM};
pub use postings_array::{FreqProxPostingsArray, TermId};
pub use term_docs::{TermDocs, TermPositions};
pub use terms_hash::{TermLookup, TermsHash, TermsHashPools};
