mod document;
mod index_writer;
mod operation;
mod shard_merger;
mod shard_writer;

use crossbeam_channel as channel;
use smallvec::SmallVec;

pub use self::document::{DocField, Document, FieldOptions, Token};
pub use self::index_writer::{DocAddress, IndexWriter};
pub use crate::common::constants::MAX_POSITION;
pub use self::operation::AddOperation;
pub use self::shard_merger::ShardMerger;
pub use self::shard_writer::ShardWriter;

// Batch of documents.
// Most of the time, users will send operation one-by-one, but it can be useful to
// send them as a small block to ensure that
// - all docs in the operation will happen on the same shard and continuous doc_ids.
// - all operations in the group are flushed into the same segment.
type AddBatch = SmallVec<[AddOperation; 4]>;
type AddBatchSender = channel::Sender<AddBatch>;
type AddBatchReceiver = channel::Receiver<AddBatch>;
