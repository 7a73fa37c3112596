//! Inverted index write/read pipeline: in-RAM posting accumulation in block
//! pools, segment flush with multi-level skip lists, and term dictionary and
//! postings cursors over flushed segments.

pub mod common;
pub mod core;
pub mod directory;
pub mod index;
pub mod indexer;
mod macros;

pub use crate::common::errors::TextIndexError;
pub use crate::core::codec::{SegmentTermDocs, SegmentTermEnum, SegmentTermPositions};
pub use crate::core::postings::{TermDocs, TermPositions};
pub use crate::core::Term;
pub use crate::directory::{Directory, MmapDirectory, RamDirectory};
pub use crate::index::{delete_documents, IndexWriterConfig, SegmentMeta, SegmentReader};
pub use crate::indexer::{DocAddress, DocField, Document, FieldOptions, IndexWriter, Token};

/// 索引文件格式版本, 读到不一致的版本会返回 `IncompatibleIndex`
pub const INDEX_FORMAT_VERSION: u32 = 1;

/// Document id inside a segment.
pub type DocId = u32;

pub type Result<T> = std::result::Result<T, TextIndexError>;

