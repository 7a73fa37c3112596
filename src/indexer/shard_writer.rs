use std::sync::Arc;

use fnv::FnvHashMap;
use log::trace;

use super::AddOperation;
use crate::common::errors::TextIndexError;
use crate::core::pool::BlockAllocator;
use crate::core::postings::{FreqProxTermsWriterPerField, TermsHashPools};

/// In-RAM postings accumulated by one indexing worker.
///
/// A shard only ever sees increasing doc ids. It owns its pools, the blocks
/// come from the allocators shared by every shard of the writer.
pub struct ShardWriter {
    pools: TermsHashPools,
    fields: FnvHashMap<String, FreqProxTermsWriterPerField>,
    num_docs: u32,
}

impl ShardWriter {
    pub fn new(byte_allocator: Arc<BlockAllocator<u8>>, int_allocator: Arc<BlockAllocator<u32>>) -> Self {
        ShardWriter {
            pools: TermsHashPools::new(byte_allocator, int_allocator),
            fields: FnvHashMap::default(),
            num_docs: 0,
        }
    }

    /// Index one document. Out of order doc ids or positions are rejected
    /// with `InvalidArgument`; the tokens of the document before the bad one
    /// stay buffered, so the shard should be reset after an error.
    pub fn add_document(&mut self, operation: &AddOperation) -> crate::Result<()> {
        let doc_id = operation.doc_id;
        for field in &operation.document.fields {
            let omit_tf = field.options.omit_term_freq_and_positions;
            let writer = self
                .fields
                .entry(field.name.clone())
                .or_insert_with(|| FreqProxTermsWriterPerField::new(&field.name, omit_tf));
            if writer.omit_term_freq_and_positions() != omit_tf {
                return Err(TextIndexError::InvalidArgument(format!(
                    "field `{}` of doc {} is indexed with conflicting options",
                    field.name, doc_id
                )));
            }
            for token in &field.tokens {
                writer.add_occurrence(
                    &mut self.pools,
                    doc_id,
                    token.text.as_bytes(),
                    token.position,
                    token.payload.as_deref(),
                )?;
            }
        }
        self.num_docs += 1;
        trace!(
            "[{}] [shard add_document] doc {} indexed, {} docs buffered",
            std::thread::current().name().unwrap_or_default(),
            doc_id,
            self.num_docs
        );
        Ok(())
    }

    /// Docs added since the last reset.
    pub fn num_docs(&self) -> u32 {
        self.num_docs
    }

    pub fn is_empty(&self) -> bool {
        self.num_docs == 0
    }

    pub fn bytes_used(&self) -> usize {
        self.pools.bytes_used() + self.fields.values().map(|f| f.terms().bytes_used()).sum::<usize>()
    }

    pub fn pools(&self) -> &TermsHashPools {
        &self.pools
    }

    pub fn field(&self, name: &str) -> Option<&FreqProxTermsWriterPerField> {
        self.fields.get(name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Drop everything buffered and hand the pool blocks back to the allocators.
    pub fn reset(&mut self) {
        for field in self.fields.values_mut() {
            field.reset(&mut self.pools);
        }
        self.fields.clear();
        self.pools.reset();
        self.num_docs = 0;
    }
}
