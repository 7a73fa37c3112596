/// Format marker written at the head of `.tis` and `.tii` files.
pub const TERM_INFOS_FORMAT: i32 = -4;

/// Format marker written at the head of `.fnm` files.
pub const FIELD_INFOS_FORMAT: i32 = -2;

/// Terms longer than this many bytes are dropped at indexing time.
/// Term text must fit (with its two byte length prefix) inside one term pool block.
pub const MAX_TERM_LENGTH: usize = crate::core::pool::BYTE_BLOCK_SIZE - 2;

/// Default number of documents between two level-0 skip entries.
pub const DEFAULT_SKIP_INTERVAL: u32 = 16;

/// Default maximum number of skip levels.
pub const DEFAULT_MAX_SKIP_LEVELS: u32 = 10;

/// Default number of terms between two term dictionary index entries.
pub const DEFAULT_TERM_INDEX_INTERVAL: u32 = 128;

/// Default RAM budget for buffered postings before an automatic flush (16 MiB).
pub const DEFAULT_RAM_BUDGET_BYTES: usize = 16 * 1024 * 1024;

/// Sentinel doc id used when a skip level is exhausted.
pub const NO_MORE_DOCS: u32 = u32::MAX;

/// Largest accepted token position.
pub const MAX_POSITION: u32 = i32::MAX as u32;

/// Doc ids of a segment are below this bound, so a doc code `doc << 1 | flag` fits in a `u32`.
pub const MAX_DOCS_PER_SEGMENT: u32 = i32::MAX as u32;
