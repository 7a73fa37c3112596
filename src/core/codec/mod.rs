//! On-disk segment format: field infos, term dictionary, postings streams
//! and the cursors reading them back.

mod field_infos;
mod postings_writer;
mod segment_term_docs;
mod segment_term_enum;
mod segment_term_positions;
mod term_info;
mod term_infos_reader;
mod term_infos_writer;

pub use field_infos::{FieldInfo, FieldInfos};
pub use postings_writer::{PostingsFormat, SegmentPostingsWriter};
pub use segment_term_docs::SegmentTermDocs;
pub use segment_term_enum::SegmentTermEnum;
pub use segment_term_positions::SegmentTermPositions;
pub use term_info::TermInfo;
pub use term_infos_reader::{TermInfosHeader, TermInfosReader};
pub use term_infos_writer::TermInfosWriter;
