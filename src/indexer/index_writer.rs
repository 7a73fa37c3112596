use std::sync::Arc;
use std::thread;
use std::thread::JoinHandle;

use fnv::FnvHashMap;
use log::{debug, error, info, trace};
use smallvec::smallvec;

use super::{AddBatch, AddBatchReceiver, AddBatchSender, AddOperation, Document, FieldOptions};
use super::{ShardMerger, ShardWriter};
use crate::common::constants::{MAX_DOCS_PER_SEGMENT, MAX_POSITION};
use crate::common::errors::TextIndexError;
use crate::core::pool::{BlockAllocator, BYTE_BLOCK_SIZE, INT_BLOCK_SIZE};
use crate::directory::Directory;
use crate::index::{IndexWriterConfig, SegmentMeta};
use crate::DocId;

/// Add document will block if the number of docs waiting in the queue to be indexed reaches `PIPELINE_MAX_SIZE_IN_DOCS`
const PIPELINE_MAX_SIZE_IN_DOCS: usize = 10_000;

fn error_in_index_worker_thread(context: &str) -> TextIndexError {
    TextIndexError::ErrorInThread(format!(
        "{context}. A worker thread encountered an error or panicked."
    ))
}

/// Wait for a worker, logging its error or panic.
fn join_worker(join_handle: JoinHandle<crate::Result<ShardWriter>>, context: &str) -> crate::Result<ShardWriter> {
    let result = join_handle
        .join()
        .map_err(|_| error_in_index_worker_thread("Worker thread panicked."))
        .and_then(|res| res);
    if let Err(e) = &result {
        error!("[{}] [{}] {:?}", thread::current().name().unwrap_or_default(), context, e);
    }
    result
}

/// Segment names are `_` followed by a base 36 counter.
fn segment_name(counter: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut digits = Vec::new();
    let mut n = counter;
    loop {
        digits.push(DIGITS[(n % 36) as usize]);
        n /= 36;
        if n == 0 {
            break;
        }
    }
    digits.reverse();
    format!("_{}", String::from_utf8_lossy(&digits))
}

fn parse_segment_counter(name: &str) -> Option<u64> {
    u64::from_str_radix(name.strip_prefix('_')?, 36).ok()
}

/// Where a document ended up: its segment and its doc id inside the segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocAddress {
    pub segment: Arc<str>,
    pub doc_id: DocId,
}

/// `IndexWriter` 负责把文档写入 directory </br>
/// 它管理了一组 indexing 线程, 以及一个共享的 indexing 队列 </br>
///
/// 每个 indexing 线程独占一个 `ShardWriter`, flush 时所有 shard 合并成一个 segment.
/// Doc ids are handed out on the caller thread, in order, starting at 0 in
/// every segment.
pub struct IndexWriter {
    directory: Arc<dyn Directory>,
    config: IndexWriterConfig,

    byte_allocator: Arc<BlockAllocator<u8>>,
    int_allocator: Arc<BlockAllocator<u32>>,

    /// 存储多线程句柄, 每个线程结束后交还自己的 shard
    workers_join_handle: Vec<JoinHandle<crate::Result<ShardWriter>>>,
    operation_sender: AddBatchSender,
    worker_id: usize,

    /// Options of every field seen in the buffered docs.
    field_options: FnvHashMap<String, FieldOptions>,
    num_buffered_docs: u32,
    segment_counter: u64,
    current_segment: Arc<str>,

    /// Segments flushed by this writer.
    segments: Vec<SegmentMeta>,
}

impl IndexWriter {
    /// Start a writer on `directory`. New segments are numbered after the ones already there.
    pub fn open(directory: Arc<dyn Directory>, config: IndexWriterConfig) -> crate::Result<Self> {
        config.validate()?;
        let segment_counter = SegmentMeta::list_segments(directory.as_ref())?
            .iter()
            .filter_map(|name| parse_segment_counter(name))
            .max()
            .map_or(0, |max| max + 1);
        let (sender, _receiver) = crossbeam_channel::bounded(1);

        let mut index_writer = IndexWriter {
            directory,
            byte_allocator: BlockAllocator::new(BYTE_BLOCK_SIZE),
            int_allocator: BlockAllocator::new(INT_BLOCK_SIZE),
            workers_join_handle: vec![],
            operation_sender: sender,
            worker_id: 0,
            field_options: FnvHashMap::default(),
            num_buffered_docs: 0,
            segment_counter,
            current_segment: Arc::from(segment_name(segment_counter)),
            segments: vec![],
            config,
        };
        let shards = (0..index_writer.config.num_threads)
            .map(|_| ShardWriter::new(index_writer.byte_allocator.clone(), index_writer.int_allocator.clone()))
            .collect();
        index_writer.start_workers(shards)?;
        info!(
            "[{}] [open] index writer started with {} threads, next segment {}",
            thread::current().name().unwrap_or_default(),
            index_writer.config.num_threads,
            index_writer.current_segment
        );
        Ok(index_writer)
    }

    pub fn config(&self) -> &IndexWriterConfig {
        &self.config
    }

    pub fn directory(&self) -> &Arc<dyn Directory> {
        &self.directory
    }

    /// Docs added since the last flush.
    pub fn num_buffered_docs(&self) -> u32 {
        self.num_buffered_docs
    }

    /// Pool bytes currently held by the buffered postings of every shard.
    pub fn buffered_bytes(&self) -> usize {
        self.byte_allocator.bytes_used() + self.int_allocator.bytes_used()
    }

    /// Segments flushed by this writer, oldest first.
    pub fn segments(&self) -> &[SegmentMeta] {
        &self.segments
    }

    fn drop_sender(&mut self) {
        let (sender, _receiver) = crossbeam_channel::bounded(1);
        self.operation_sender = sender;
    }

    /// Spawns a new worker thread for indexing.
    /// The thread consumes documents from the pipeline until the sender is dropped.
    fn add_indexing_worker(&mut self, receiver: AddBatchReceiver, mut shard: ShardWriter) -> crate::Result<()> {
        let join_handle: JoinHandle<crate::Result<ShardWriter>> = thread::Builder::new()
            .name(format!("thrd-text-index{}", self.worker_id))
            .spawn(move || {
                debug!("[{}] [index worker] enter", thread::current().name().unwrap_or_default());
                for batch in receiver {
                    for operation in batch {
                        shard.add_document(&operation)?;
                    }
                }
                debug!(
                    "[{}] [index worker] exit with {} buffered docs",
                    thread::current().name().unwrap_or_default(),
                    shard.num_docs()
                );
                Ok(shard)
            })?;
        self.worker_id += 1;
        self.workers_join_handle.push(join_handle);
        Ok(())
    }

    fn start_workers(&mut self, shards: Vec<ShardWriter>) -> crate::Result<()> {
        let (sender, receiver) = crossbeam_channel::bounded(PIPELINE_MAX_SIZE_IN_DOCS);
        self.operation_sender = sender;
        for shard in shards {
            self.add_indexing_worker(receiver.clone(), shard)?;
        }
        Ok(())
    }

    /// Close the queue and wait for every worker, taking their shards back.
    fn stop_workers(&mut self) -> crate::Result<Vec<ShardWriter>> {
        self.drop_sender();
        let mut shards = Vec::with_capacity(self.workers_join_handle.len());
        let mut first_error = None;
        for join_handle in std::mem::take(&mut self.workers_join_handle) {
            match join_worker(join_handle, "stop_workers") {
                Ok(shard) => shards.push(shard),
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => {
                // 剩下的 shard 已经不完整, 丢弃后重启
                self.restart_with(shards)?;
                Err(e)
            }
            None => Ok(shards),
        }
    }

    /// Reset `shards`, top them up to `num_threads` and start a new buffering round.
    fn restart_with(&mut self, mut shards: Vec<ShardWriter>) -> crate::Result<()> {
        for shard in shards.iter_mut() {
            shard.reset();
        }
        while shards.len() < self.config.num_threads {
            shards.push(ShardWriter::new(self.byte_allocator.clone(), self.int_allocator.clone()));
        }
        self.num_buffered_docs = 0;
        self.field_options.clear();
        self.start_workers(shards)
    }

    /// Check a document before it gets a doc id, recording its field options.
    fn validate_document(&mut self, document: &Document) -> crate::Result<()> {
        let mut seen: FnvHashMap<&str, (FieldOptions, u32)> = FnvHashMap::default();
        for field in &document.fields {
            let expected = seen
                .get(field.name.as_str())
                .map(|(options, _)| *options)
                .or_else(|| self.field_options.get(&field.name).copied());
            if expected.is_some_and(|options| options != field.options) {
                return Err(TextIndexError::InvalidArgument(format!(
                    "field `{}` is indexed with options {:?}, it was {:?} for earlier docs",
                    field.name,
                    field.options,
                    expected.unwrap_or_default()
                )));
            }
            let mut last_position = seen.get(field.name.as_str()).map_or(0, |(_, last)| *last);
            if !field.options.omit_term_freq_and_positions {
                for token in &field.tokens {
                    if token.position < last_position || token.position > MAX_POSITION {
                        return Err(TextIndexError::InvalidArgument(format!(
                            "position {} of term `{}` in field `{}` is out of order or too large (last {})",
                            token.position, token.text, field.name, last_position
                        )));
                    }
                    last_position = token.position;
                }
            }
            seen.insert(field.name.as_str(), (field.options, last_position));
        }
        for (name, (options, _)) in seen {
            self.field_options.entry(name.to_string()).or_insert(options);
        }
        Ok(())
    }

    fn maybe_flush(&mut self) -> crate::Result<()> {
        let bytes = self.buffered_bytes();
        if self.num_buffered_docs > 0 && bytes > self.config.ram_budget_bytes {
            info!(
                "[{}] [add_document] ram budget reached ({} > {}), flushing {} docs",
                thread::current().name().unwrap_or_default(),
                bytes,
                self.config.ram_budget_bytes,
                self.num_buffered_docs
            );
            self.flush()?;
        }
        Ok(())
    }

    fn send_add_documents_batch(&self, add_ops: AddBatch) -> crate::Result<()> {
        self.operation_sender
            .send(add_ops)
            .map_err(|_| error_in_index_worker_thread("An index writer was killed."))
    }

    /// Adds a document.
    ///
    /// If the indexing pipeline is full, this call may block. It may also
    /// flush the buffered docs first when the RAM budget is exceeded.
    pub fn add_document(&mut self, document: Document) -> crate::Result<DocAddress> {
        let mut addresses = self.add_documents(std::iter::once(document))?;
        addresses.pop().ok_or_else(|| TextIndexError::InternalError("no address assigned".to_string()))
    }

    /// 添加一组文档, 这组文档会被同一个线程索引并写入同一个 segment, doc id 连续
    pub fn add_documents<I>(&mut self, documents: I) -> crate::Result<Vec<DocAddress>>
    where
        I: IntoIterator<Item = Document>,
    {
        let documents: Vec<Document> = documents.into_iter().collect();
        if documents.is_empty() {
            return Ok(vec![]);
        }
        self.maybe_flush()?;
        let saved_options = self.field_options.clone();
        for document in &documents {
            if let Err(e) = self.validate_document(document) {
                self.field_options = saved_options;
                return Err(e);
            }
        }
        let count = documents.len() as u32;
        let first_doc_id = self.num_buffered_docs;
        if first_doc_id.checked_add(count).map_or(true, |end| end > MAX_DOCS_PER_SEGMENT) {
            self.field_options = saved_options;
            return Err(TextIndexError::InvalidArgument(format!(
                "segment {} cannot hold {} more docs, a segment holds at most {}",
                self.current_segment, count, MAX_DOCS_PER_SEGMENT
            )));
        }

        let mut batch: AddBatch = smallvec![];
        for (doc_id, document) in (first_doc_id..).zip(documents) {
            trace!(
                "[{}] [add_documents] doc {} of segment {} queued",
                thread::current().name().unwrap_or_default(),
                doc_id,
                self.current_segment
            );
            batch.push(AddOperation { doc_id, document });
        }
        self.send_add_documents_batch(batch)?;
        self.num_buffered_docs += count;
        Ok((first_doc_id..first_doc_id + count)
            .map(|doc_id| DocAddress { segment: self.current_segment.clone(), doc_id })
            .collect())
    }

    fn flush(&mut self) -> crate::Result<Option<SegmentMeta>> {
        let shards = self.stop_workers()?;
        if self.num_buffered_docs == 0 {
            self.restart_with(shards)?;
            return Ok(None);
        }
        let name = self.current_segment.clone();
        let result = ShardMerger::new(&shards, self.num_buffered_docs, self.config.postings_format())
            .flush(self.directory.as_ref(), &name);
        self.restart_with(shards)?;
        let meta = result?;
        self.segment_counter += 1;
        self.current_segment = Arc::from(segment_name(self.segment_counter));
        self.segments.push(meta.clone());
        Ok(Some(meta))
    }

    /// Flush every buffered doc into a new segment.
    ///
    /// A call to commit blocks until the segment is on disk. Returns `None`
    /// when nothing was buffered.
    pub fn commit(&mut self) -> crate::Result<Option<SegmentMeta>> {
        info!(
            "[{}] [commit] committing {} docs into {}",
            thread::current().name().unwrap_or_default(),
            self.num_buffered_docs,
            self.current_segment
        );
        self.flush()
    }

    /// Discard every doc added since the last flush.
    pub fn rollback(&mut self) -> crate::Result<()> {
        info!(
            "[{}] [rollback] dropping {} buffered docs",
            thread::current().name().unwrap_or_default(),
            self.num_buffered_docs
        );
        let shards = self.stop_workers()?;
        self.restart_with(shards)
    }
}

impl Drop for IndexWriter {
    fn drop(&mut self) {
        self.drop_sender();
        for work in self.workers_join_handle.drain(..) {
            // 错误已经在 join_worker 中打印
            let _ = join_worker(work, "drop");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rand::prelude::*;

    use super::*;
    use crate::core::postings::{TermDocs, TermPositions};
    use crate::core::Term;
    use crate::directory::RamDirectory;
    use crate::index::SegmentReader;
    use crate::indexer::{DocField, Token};

    fn config(num_threads: usize) -> IndexWriterConfig {
        IndexWriterConfig::builder().num_threads(num_threads).skip_interval(4).max_skip_levels(3).build()
    }

    #[test]
    fn test_segment_names() {
        assert_eq!(segment_name(0), "_0");
        assert_eq!(segment_name(35), "_z");
        assert_eq!(segment_name(36), "_10");
        assert_eq!(parse_segment_counter("_10"), Some(36));
        assert_eq!(parse_segment_counter("segments"), None);
    }

    #[test]
    fn test_multi_thread_round_trip() {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir: Arc<dyn Directory> = Arc::new(RamDirectory::create());
        let mut writer = IndexWriter::open(dir.clone(), config(4)).unwrap();

        let mut rng = StdRng::seed_from_u64(7);
        // term -> doc -> positions
        let mut expected: BTreeMap<String, BTreeMap<u32, Vec<u32>>> = BTreeMap::new();
        for doc in 0..500u32 {
            let mut tokens = Vec::new();
            let mut position = 0u32;
            for _ in 0..rng.gen_range(1..12) {
                position += rng.gen_range(0..3);
                let text = format!("t{}", rng.gen_range(0..40));
                expected.entry(text.clone()).or_default().entry(doc).or_default().push(position);
                tokens.push(Token::new(&text, position));
            }
            let mut document = Document::new();
            document.add_field(DocField::new("body", FieldOptions::default(), tokens));
            let address = writer.add_document(document).unwrap();
            assert_eq!(address.doc_id, doc);
            assert_eq!(&*address.segment, "_0");
        }
        let meta = writer.commit().unwrap().unwrap();
        assert_eq!(meta.doc_count, 500);
        assert_eq!(meta.num_terms, expected.len() as u64);
        assert_eq!(writer.num_buffered_docs(), 0);

        let reader = SegmentReader::open(dir.as_ref(), "_0").unwrap();
        for (text, docs) in &expected {
            let mut positions = reader.term_positions();
            assert!(positions.seek(&Term::new("body", text.as_str())).unwrap());
            for (doc, doc_positions) in docs {
                assert!(positions.next().unwrap());
                assert_eq!(positions.doc(), *doc);
                assert_eq!(positions.freq() as usize, doc_positions.len());
                for position in doc_positions {
                    assert_eq!(positions.next_position().unwrap(), *position);
                }
            }
            assert!(!positions.next().unwrap());
        }
    }

    #[test]
    fn test_commit_without_docs_and_next_segment() {
        let dir: Arc<dyn Directory> = Arc::new(RamDirectory::create());
        let mut writer = IndexWriter::open(dir.clone(), config(2)).unwrap();
        assert!(writer.commit().unwrap().is_none());
        writer.add_document(crate::doc!("f" => "a")).unwrap();
        assert_eq!(writer.commit().unwrap().unwrap().name, "_0");
        let address = writer.add_document(crate::doc!("f" => "b")).unwrap();
        assert_eq!(address, DocAddress { segment: Arc::from("_1"), doc_id: 0 });
        writer.commit().unwrap();
        drop(writer);

        // a new writer continues the numbering
        let mut writer = IndexWriter::open(dir.clone(), config(1)).unwrap();
        let address = writer.add_document(crate::doc!("f" => "c")).unwrap();
        assert_eq!(&*address.segment, "_2");
        assert_eq!(SegmentMeta::list_segments(dir.as_ref()).unwrap(), vec!["_0", "_1"]);
    }

    #[test]
    fn test_rollback_discards_buffered_docs() {
        let dir: Arc<dyn Directory> = Arc::new(RamDirectory::create());
        let mut writer = IndexWriter::open(dir.clone(), config(2)).unwrap();
        for _ in 0..10 {
            writer.add_document(crate::doc!("f" => "gone")).unwrap();
        }
        writer.rollback().unwrap();
        assert_eq!(writer.num_buffered_docs(), 0);
        writer.add_document(crate::doc!("f" => "kept")).unwrap();
        let meta = writer.commit().unwrap().unwrap();
        assert_eq!(meta.doc_count, 1);

        let reader = SegmentReader::open(dir.as_ref(), &meta.name).unwrap();
        assert_eq!(reader.doc_freq(&Term::new("f", "gone")).unwrap(), 0);
        assert_eq!(reader.doc_freq(&Term::new("f", "kept")).unwrap(), 1);
    }

    #[test]
    fn test_rejects_invalid_documents() {
        let dir: Arc<dyn Directory> = Arc::new(RamDirectory::create());
        let mut writer = IndexWriter::open(dir, config(1)).unwrap();

        let mut document = Document::new();
        document.add_field(DocField::new("f", FieldOptions::default(), vec![Token::new("a", 3), Token::new("b", 1)]));
        assert!(matches!(writer.add_document(document), Err(TextIndexError::InvalidArgument(_))));

        let mut document = Document::new();
        document.add_field(DocField::new("f", FieldOptions::default(), vec![Token::new("a", MAX_POSITION + 1)]));
        assert!(matches!(writer.add_document(document), Err(TextIndexError::InvalidArgument(_))));

        writer.add_document(crate::doc!("f" => "a")).unwrap();
        let mut document = Document::new();
        document.add_field(DocField::new("f", FieldOptions::docs_only(), vec![Token::new("a", 0)]));
        assert!(matches!(writer.add_document(document.clone()), Err(TextIndexError::InvalidArgument(_))));
        assert_eq!(writer.num_buffered_docs(), 1);

        // field options only have to agree inside a segment
        writer.commit().unwrap();
        writer.add_document(document).unwrap();
    }

    fn backwards_positions() -> AddBatch {
        let mut document = Document::new();
        document.add_field(DocField::new(
            "f",
            FieldOptions::default(),
            vec![Token::new("a", 3), Token::new("a", 1)],
        ));
        smallvec![AddOperation { doc_id: 0, document }]
    }

    #[test]
    fn test_worker_error_surfaces_on_commit_and_drop() {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir: Arc<dyn Directory> = Arc::new(RamDirectory::create());
        let mut writer = IndexWriter::open(dir.clone(), config(1)).unwrap();

        // the batch skips validate_document, the shard rejects it on the worker thread
        writer.send_add_documents_batch(backwards_positions()).unwrap();
        writer.num_buffered_docs += 1;
        assert!(matches!(writer.commit(), Err(TextIndexError::InvalidArgument(_))));
        assert_eq!(writer.num_buffered_docs(), 0);

        writer.add_document(crate::doc!("f" => "a b")).unwrap();
        let meta = writer.commit().unwrap().unwrap();
        assert_eq!((meta.name.as_str(), meta.doc_count), ("_0", 1));

        writer.send_add_documents_batch(backwards_positions()).unwrap();
        drop(writer);
        assert_eq!(SegmentMeta::list_segments(dir.as_ref()).unwrap(), vec!["_0".to_string()]);
    }

    #[test]
    fn test_auto_flush_on_ram_budget() {
        let dir: Arc<dyn Directory> = Arc::new(RamDirectory::create());
        let config = IndexWriterConfig::builder().num_threads(2).ram_budget_bytes(1 << 20).build();
        let mut writer = IndexWriter::open(dir.clone(), config).unwrap();
        let mut added = 0u32;
        while writer.segments().is_empty() && added < 200_000 {
            let text = format!("u{added}a u{added}b u{added}c u{added}d shared");
            writer.add_document(crate::doc!("body" => text.as_str())).unwrap();
            added += 1;
        }
        assert!(!writer.segments().is_empty());
        writer.commit().unwrap();
        let total: u32 = writer.segments().iter().map(|meta| meta.doc_count).sum();
        assert_eq!(total, added);
        assert!(writer.buffered_bytes() < (1 << 20));
    }
}
