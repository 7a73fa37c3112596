mod deleted_docs;
mod index_settings;
mod segment_component;
mod segment_meta;
mod segment_reader;

pub use deleted_docs::{delete_documents, DeletedDocs};
pub use index_settings::{IndexWriterConfig, MAX_NUM_THREADS, MAX_RAM_BUDGET_BYTES, MIN_RAM_BUDGET_BYTES};
pub use segment_component::SegmentComponent;
pub use segment_meta::SegmentMeta;
pub use segment_reader::SegmentReader;
