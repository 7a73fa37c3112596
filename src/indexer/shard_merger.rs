use std::sync::Arc;

use itertools::Itertools;
use log::{debug, info};

use super::ShardWriter;
use crate::core::codec::{FieldInfos, PostingsFormat, SegmentPostingsWriter};
use crate::core::postings::{FreqProxFieldMergeState, TermDocs, TermPositions};
use crate::directory::Directory;
use crate::index::{SegmentComponent, SegmentMeta};

/// Flushes the shards of a writer into one segment.
///
/// Every doc id lives in exactly one shard, so merging boils down to a k-way
/// merge of the shards' terms, then of the docs of each term by doc id.
pub struct ShardMerger<'a> {
    shards: &'a [ShardWriter],
    doc_count: u32,
    format: PostingsFormat,
}

impl<'a> ShardMerger<'a> {
    /// `doc_count` is the number of docs of the new segment, every doc id of the shards is below it.
    pub fn new(shards: &'a [ShardWriter], doc_count: u32, format: PostingsFormat) -> Self {
        ShardMerger { shards, doc_count, format }
    }

    fn field_infos(&self) -> FieldInfos {
        let names: Vec<&str> =
            self.shards.iter().flat_map(|shard| shard.field_names()).sorted().dedup().collect();
        FieldInfos::new(names.into_iter().map(|name| {
            let fields = self.shards.iter().filter_map(|shard| shard.field(name));
            let (omit_tf, has_payloads) = fields.fold((false, false), |(omit, payloads), field| {
                (omit || field.omit_term_freq_and_positions(), payloads || field.has_payloads())
            });
            (name.to_string(), omit_tf, has_payloads)
        }))
    }

    /// Write the segment `segment_name` and return its metadata.
    ///
    /// `.si` is written last, a segment without it is incomplete.
    pub fn flush(&self, directory: &dyn Directory, segment_name: &str) -> crate::Result<SegmentMeta> {
        let field_infos = Arc::new(self.field_infos());
        let mut postings_writer = SegmentPostingsWriter::create(
            directory,
            segment_name,
            field_infos.clone(),
            self.doc_count,
            self.format,
        )?;

        for field_info in field_infos.iter() {
            let omit_tf = field_info.omit_term_freq_and_positions;
            let mut states: Vec<FreqProxFieldMergeState> = Vec::with_capacity(self.shards.len());
            for shard in self.shards {
                if let Some(field) = shard.field(&field_info.name) {
                    let mut state = FreqProxFieldMergeState::new(field, shard.pools());
                    if state.next_term()? {
                        states.push(state);
                    }
                }
            }
            debug!(
                "[{}] [flush] field `{}` merging {} shards",
                std::thread::current().name().unwrap_or_default(),
                field_info.name,
                states.len()
            );
            postings_writer.start_field(&field_info.name)?;

            while !states.is_empty() {
                let text = states.iter().map(|state| state.term_text()).min().unwrap_or_default();
                let mut matching: Vec<usize> =
                    (0..states.len()).filter(|i| states[*i].term_text() == text).collect();

                postings_writer.start_term()?;
                let mut docs_left: Vec<usize> = Vec::with_capacity(matching.len());
                for i in &matching {
                    if states[*i].next()? {
                        docs_left.push(*i);
                    }
                }
                while let Some(k) = docs_left.iter().position_min_by_key(|i| states[**i].doc()) {
                    let state = &mut states[docs_left[k]];
                    let freq = state.freq();
                    postings_writer.add_doc(state.doc(), freq)?;
                    if !omit_tf {
                        for _ in 0..freq {
                            let position = state.next_position()?;
                            let payload: &[u8] =
                                if state.is_payload_available() { state.payload()? } else { &[] };
                            postings_writer.add_position(position, payload)?;
                        }
                    }
                    if !state.next()? {
                        docs_left.swap_remove(k);
                    }
                }
                postings_writer.finish_term(text)?;

                // 从后往前删除，保证下标有效
                matching.sort_unstable_by(|a, b| b.cmp(a));
                for i in matching {
                    if !states[i].next_term()? {
                        states.swap_remove(i);
                    }
                }
            }
        }

        let num_terms = postings_writer.num_terms();
        postings_writer.close()?;
        field_infos.write(directory, &SegmentComponent::FieldInfos.file_name(segment_name))?;
        let meta = SegmentMeta::new(segment_name, self.doc_count, self.format, field_infos.has_prox(), num_terms);
        meta.write(directory)?;
        info!(
            "[{}] [flush] segment {} written: {} docs, {} fields, {} terms",
            std::thread::current().name().unwrap_or_default(),
            segment_name,
            self.doc_count,
            field_infos.len(),
            num_terms
        );
        Ok(meta)
    }
}
