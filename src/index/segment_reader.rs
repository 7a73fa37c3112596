use std::fmt;
use std::sync::Arc;

use log::info;

use super::{DeletedDocs, SegmentComponent, SegmentMeta};
use crate::common::errors::DataCorruption;
use crate::core::codec::{
    FieldInfos, SegmentTermDocs, SegmentTermEnum, SegmentTermPositions, TermInfosReader,
};
use crate::core::Term;
use crate::directory::{Directory, IndexInput};
use crate::DocId;

struct InnerSegmentReader {
    meta: SegmentMeta,
    field_infos: Arc<FieldInfos>,
    term_infos: Arc<TermInfosReader>,
    freq_stream: IndexInput,
    prox_stream: Option<IndexInput>,
    deleted_docs: Option<Arc<DeletedDocs>>,
}

/// Read access to one flushed segment.
///
/// Cheap to clone and safe to share between threads. Every cursor it hands
/// out owns its own stream clones.
#[derive(Clone)]
pub struct SegmentReader {
    inner: Arc<InnerSegmentReader>,
}

impl fmt::Debug for SegmentReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SegmentReader({}, docs={})", self.inner.meta.name, self.inner.meta.doc_count)
    }
}

impl SegmentReader {
    pub fn open(directory: &dyn Directory, segment_name: &str) -> crate::Result<Self> {
        let meta = SegmentMeta::read(directory, segment_name)?;
        let field_infos =
            FieldInfos::read(directory, &meta.file_name(SegmentComponent::FieldInfos))?;
        let tis_name = meta.file_name(SegmentComponent::TermInfos);
        let term_infos = TermInfosReader::open(
            directory,
            &tis_name,
            &meta.file_name(SegmentComponent::TermIndex),
            field_infos.clone(),
        )?;

        let header = term_infos.header();
        let format = meta.postings_format();
        if header.skip_interval != format.skip_interval
            || header.max_skip_levels != format.max_skip_levels
            || header.index_interval != format.term_index_interval
            || header.size != meta.num_terms
        {
            return Err(DataCorruption::new(
                tis_name.into(),
                format!("dictionary header {header:?} disagrees with segment metadata {meta:?}"),
            )
            .into());
        }
        if meta.has_prox != field_infos.has_prox() {
            return Err(DataCorruption::new(
                meta.file_name(SegmentComponent::FieldInfos).into(),
                format!("field infos disagree with has_prox={} of the segment", meta.has_prox),
            )
            .into());
        }

        let freq_stream = directory.open_input(&meta.file_name(SegmentComponent::Freq))?;
        let prox_stream = if meta.has_prox {
            Some(directory.open_input(&meta.file_name(SegmentComponent::Prox))?)
        } else {
            None
        };
        let deleted_docs = if meta.has_deletions() {
            let deleted = DeletedDocs::read(directory, &meta.file_name(SegmentComponent::Deletes))?;
            if deleted.len() != meta.del_count as u64 {
                return Err(DataCorruption::new(
                    meta.file_name(SegmentComponent::Deletes).into(),
                    format!("{} deleted docs, metadata expects {}", deleted.len(), meta.del_count),
                )
                .into());
            }
            Some(Arc::new(deleted))
        } else {
            None
        };

        info!(
            "opened segment {}: {} docs, {} deleted, {} terms, {} fields",
            meta.name,
            meta.doc_count,
            meta.del_count,
            header.size,
            field_infos.len()
        );
        Ok(SegmentReader {
            inner: Arc::new(InnerSegmentReader {
                meta,
                field_infos,
                term_infos: Arc::new(term_infos),
                freq_stream,
                prox_stream,
                deleted_docs,
            }),
        })
    }

    pub fn meta(&self) -> &SegmentMeta {
        &self.inner.meta
    }

    pub fn name(&self) -> &str {
        &self.inner.meta.name
    }

    /// Documents in the segment, deleted ones included.
    pub fn max_doc(&self) -> u32 {
        self.inner.meta.doc_count
    }

    pub fn num_docs(&self) -> u32 {
        self.inner.meta.num_live_docs()
    }

    pub fn field_infos(&self) -> &FieldInfos {
        &self.inner.field_infos
    }

    pub fn is_deleted(&self, doc: DocId) -> bool {
        self.inner.deleted_docs.as_ref().is_some_and(|deleted| deleted.is_deleted(doc))
    }

    pub fn num_terms(&self) -> u64 {
        self.inner.term_infos.size()
    }

    /// Docs containing `term` according to the dictionary, deleted ones included.
    pub fn doc_freq(&self, term: &Term) -> crate::Result<u32> {
        Ok(self.inner.term_infos.get(term)?.map(|info| info.doc_freq).unwrap_or_default())
    }

    /// Every term of the segment in `(field, text)` order.
    pub fn terms(&self) -> crate::Result<SegmentTermEnum> {
        self.inner.term_infos.terms()
    }

    /// Terms starting at the first term `>= term`.
    pub fn terms_from(&self, term: &Term) -> crate::Result<SegmentTermEnum> {
        self.inner.term_infos.terms_from(term)
    }

    /// An unpositioned doc cursor, call `seek` first.
    pub fn term_docs(&self) -> SegmentTermDocs {
        SegmentTermDocs::new(
            self.inner.freq_stream.clone(),
            self.inner.term_infos.clone(),
            self.inner.deleted_docs.clone(),
            self.inner.meta.doc_count,
        )
    }

    /// An unpositioned positions cursor, call `seek` first.
    pub fn term_positions(&self) -> SegmentTermPositions {
        SegmentTermPositions::new(
            self.inner.freq_stream.clone(),
            self.inner.prox_stream.clone(),
            self.inner.term_infos.clone(),
            self.inner.deleted_docs.clone(),
            self.inner.meta.doc_count,
        )
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rand::prelude::*;

    use super::*;
    use crate::common::errors::TextIndexError;
    use crate::core::codec::{PostingsFormat, SegmentPostingsWriter};
    use crate::core::postings::{TermDocs, TermPositions};
    use crate::directory::RamDirectory;
    use crate::index::delete_documents;

    type DocPostings = Vec<(DocId, Vec<(u32, Vec<u8>)>)>;
    type Postings = BTreeMap<(String, String), DocPostings>;

    const SMALL_SKIPS: PostingsFormat = PostingsFormat { skip_interval: 4, max_skip_levels: 3, term_index_interval: 4 };
    const DEFAULT_SKIPS: PostingsFormat =
        PostingsFormat { skip_interval: 16, max_skip_levels: 10, term_index_interval: 128 };

    // (name, omit_tf, store_payloads)
    const FIELDS: [(&str, bool, bool); 3] = [("body", false, true), ("plain", false, false), ("tag", true, false)];

    fn write_segment(dir: &dyn Directory, name: &str, postings: &Postings, doc_count: u32, format: PostingsFormat) {
        let field_infos =
            Arc::new(FieldInfos::new(FIELDS.iter().map(|(n, omit, payloads)| (n.to_string(), *omit, *payloads))));
        let mut writer = SegmentPostingsWriter::create(dir, name, field_infos.clone(), doc_count, format).unwrap();
        let mut current_field: Option<&str> = None;
        for ((field, text), docs) in postings {
            if current_field != Some(field.as_str()) {
                writer.start_field(field).unwrap();
                current_field = Some(field.as_str());
            }
            let omit_tf = field_infos.field_info(field).unwrap().omit_term_freq_and_positions;
            writer.start_term().unwrap();
            for (doc, positions) in docs {
                writer.add_doc(*doc, positions.len() as u32).unwrap();
                if !omit_tf {
                    for (position, payload) in positions {
                        writer.add_position(*position, payload).unwrap();
                    }
                }
            }
            writer.finish_term(text.as_bytes()).unwrap();
        }
        let num_terms = writer.num_terms();
        writer.close().unwrap();
        field_infos.write(dir, &SegmentComponent::FieldInfos.file_name(name)).unwrap();
        SegmentMeta::new(name, doc_count, format, field_infos.has_prox(), num_terms).write(dir).unwrap();
    }

    fn random_docs(rng: &mut StdRng, doc_count: u32, doc_freq: usize, with_payloads: bool) -> DocPostings {
        let mut docs: Vec<DocId> = (0..doc_count).collect();
        docs.shuffle(rng);
        docs.truncate(doc_freq);
        docs.sort_unstable();
        docs.into_iter()
            .map(|doc| {
                let mut position = rng.gen_range(0..5);
                let positions = (0..rng.gen_range(1..5))
                    .map(|_| {
                        position += rng.gen_range(0..4);
                        let payload = if with_payloads && rng.gen_bool(0.5) {
                            (0..rng.gen_range(0..4)).map(|_| rng.gen()).collect()
                        } else {
                            vec![]
                        };
                        (position, payload)
                    })
                    .collect();
                (doc, positions)
            })
            .collect()
    }

    /// Terms with doc freqs around the skip interval and far above it.
    fn random_postings(rng: &mut StdRng, doc_count: u32) -> Postings {
        let mut postings = Postings::new();
        for (i, doc_freq) in [1usize, 3, 4, 5, 15, 16, 17, 64, 300, 900].into_iter().enumerate() {
            for (field, _, payloads) in FIELDS {
                let docs = random_docs(rng, doc_count, doc_freq, payloads);
                postings.insert((field.to_string(), format!("term{i:02}")), docs);
            }
        }
        postings
    }

    fn open(postings: &Postings, doc_count: u32, format: PostingsFormat) -> (RamDirectory, SegmentReader) {
        let dir = RamDirectory::create();
        write_segment(&dir, "_0", postings, doc_count, format);
        let reader = SegmentReader::open(&dir, "_0").unwrap();
        (dir, reader)
    }

    fn term(key: &(String, String)) -> Term {
        Term::new(key.0.as_str(), key.1.as_str())
    }

    fn omits_tf(field: &str) -> bool {
        field == "tag"
    }

    #[test]
    fn test_postings_round_trip() {
        let mut rng = StdRng::seed_from_u64(42);
        let postings = random_postings(&mut rng, 1000);
        for format in [SMALL_SKIPS, DEFAULT_SKIPS] {
            let (_dir, reader) = open(&postings, 1000, format);
            assert_eq!(reader.num_terms(), postings.len() as u64);
            for (key, docs) in &postings {
                let mut positions = reader.term_positions();
                assert!(positions.seek(&term(key)).unwrap());
                assert_eq!(positions.doc_freq() as usize, docs.len());
                let mut last_doc = None;
                for (doc, doc_positions) in docs {
                    assert!(positions.next().unwrap());
                    assert_eq!(positions.doc(), *doc);
                    assert!(last_doc < Some(*doc));
                    last_doc = Some(*doc);
                    if omits_tf(&key.0) {
                        assert_eq!(positions.freq(), 1);
                        assert_eq!(positions.next_position().unwrap(), 0);
                        continue;
                    }
                    assert_eq!(positions.freq() as usize, doc_positions.len());
                    let mut last_position = 0;
                    for (position, payload) in doc_positions {
                        let read = positions.next_position().unwrap();
                        assert_eq!(read, *position);
                        assert!(read >= last_position);
                        last_position = read;
                        assert_eq!(positions.payload_length() as usize, payload.len());
                        if payload.is_empty() {
                            assert!(!positions.is_payload_available());
                        } else {
                            assert_eq!(positions.payload().unwrap(), payload.as_slice());
                            assert!(!positions.is_payload_available());
                        }
                    }
                }
                assert!(!positions.next().unwrap());
            }
        }
    }

    #[test]
    fn test_term_enum_and_lookup() {
        let mut rng = StdRng::seed_from_u64(1);
        let postings = random_postings(&mut rng, 200);
        let (_dir, reader) = open(&postings, 200, SMALL_SKIPS);

        let mut terms = reader.terms().unwrap();
        let mut enumerated = Vec::new();
        while terms.next().unwrap() {
            let current = terms.term().unwrap().unwrap();
            enumerated.push((current.field().to_string(), current.text().to_string()));
            let mut docs = reader.term_docs();
            assert!(docs.seek_enum(&terms).unwrap());
            assert_eq!(docs.doc_freq(), terms.doc_freq());
        }
        assert_eq!(enumerated, postings.keys().cloned().collect::<Vec<_>>());

        let from = reader.terms_from(&Term::new("plain", "term05x")).unwrap();
        assert_eq!(from.term().unwrap(), Some(Term::new("plain", "term06")));
        let from = reader.terms_from(&Term::new("missing", "")).unwrap();
        assert_eq!(from.term().unwrap(), Some(Term::new("plain", "term00")));
        let from = reader.terms_from(&Term::new("zzz", "")).unwrap();
        assert_eq!(from.term().unwrap(), None);

        assert_eq!(reader.doc_freq(&Term::new("body", "term07")).unwrap(), 64);
        assert_eq!(reader.doc_freq(&Term::new("body", "nope")).unwrap(), 0);
        let mut docs = reader.term_docs();
        assert!(!docs.seek(&Term::new("nope", "term00")).unwrap());
        assert!(!docs.next().unwrap());
    }

    #[test]
    fn test_skip_to_matches_linear_scan() {
        let doc_count = 1000;
        let mut rng = StdRng::seed_from_u64(3);
        let postings = random_postings(&mut rng, doc_count);
        for format in [SMALL_SKIPS, DEFAULT_SKIPS] {
            let (_dir, reader) = open(&postings, doc_count, format);
            for (key, docs) in &postings {
                // every target on a fresh cursor
                for target in (0..doc_count + 2).step_by(7) {
                    let expected = docs.iter().find(|(doc, _)| *doc >= target);
                    let mut positions = reader.term_positions();
                    positions.seek(&term(key)).unwrap();
                    assert_eq!(positions.skip_to(target).unwrap(), expected.is_some(), "{key:?} -> {target}");
                    if let Some((doc, doc_positions)) = expected {
                        assert_eq!(positions.doc(), *doc);
                        if !omits_tf(&key.0) {
                            assert_eq!(positions.next_position().unwrap(), doc_positions[0].0);
                        }
                    }

                    let mut term_docs = reader.term_docs();
                    term_docs.seek(&term(key)).unwrap();
                    assert_eq!(term_docs.skip_to(target).unwrap(), expected.is_some());
                    if let Some((doc, _)) = expected {
                        assert_eq!(term_docs.doc(), *doc);
                    }
                }

                // successive skips on one cursor, reading part of the positions in between
                let mut positions = reader.term_positions();
                positions.seek(&term(key)).unwrap();
                let mut current: Option<DocId> = None;
                let mut target = 0;
                loop {
                    target += rng.gen_range(0..40);
                    let expected = docs.iter().find(|(doc, _)| *doc >= target && current < Some(*doc));
                    let found = positions.skip_to(target).unwrap();
                    assert_eq!(found, expected.is_some());
                    let Some((doc, doc_positions)) = expected else {
                        break;
                    };
                    assert_eq!(positions.doc(), *doc);
                    current = Some(*doc);
                    if !omits_tf(&key.0) && rng.gen_bool(0.5) {
                        let (position, payload) = &doc_positions[0];
                        assert_eq!(positions.next_position().unwrap(), *position);
                        assert_eq!(positions.payload_length() as usize, payload.len());
                    }
                }
            }
        }
    }

    #[test]
    fn test_deleted_docs_never_surface() {
        let doc_count = 600;
        let mut rng = StdRng::seed_from_u64(9);
        let postings = random_postings(&mut rng, doc_count);
        let dir = RamDirectory::create();
        write_segment(&dir, "_0", &postings, doc_count, SMALL_SKIPS);
        let meta = delete_documents(&dir, "_0", (0..doc_count).filter(|doc| doc % 3 == 0)).unwrap();
        assert_eq!(meta.del_count, 200);

        let reader = SegmentReader::open(&dir, "_0").unwrap();
        assert_eq!(reader.num_docs(), 400);
        assert_eq!(reader.max_doc(), 600);
        assert!(reader.is_deleted(3) && !reader.is_deleted(4));
        for (key, docs) in &postings {
            let live: Vec<(DocId, u32)> = docs
                .iter()
                .filter(|(doc, _)| doc % 3 != 0)
                .map(|(doc, positions)| (*doc, if omits_tf(&key.0) { 1 } else { positions.len() as u32 }))
                .collect();

            let mut term_docs = reader.term_docs();
            term_docs.seek(&term(key)).unwrap();
            let mut seen = Vec::new();
            while term_docs.next().unwrap() {
                seen.push((term_docs.doc(), term_docs.freq()));
            }
            assert_eq!(seen, live);

            let mut term_docs = reader.term_docs();
            term_docs.seek(&term(key)).unwrap();
            let mut read = Vec::new();
            let mut doc_buf = [0; 5];
            let mut freq_buf = [0; 5];
            loop {
                let n = term_docs.read(&mut doc_buf, &mut freq_buf).unwrap();
                if n == 0 {
                    break;
                }
                read.extend(doc_buf[..n].iter().copied().zip(freq_buf[..n].iter().copied()));
            }
            assert_eq!(read, live);

            for target in (0..doc_count).step_by(11) {
                let mut positions = reader.term_positions();
                positions.seek(&term(key)).unwrap();
                let expected = live.iter().find(|(doc, _)| *doc >= target);
                assert_eq!(positions.skip_to(target).unwrap(), expected.is_some());
                if let Some((doc, freq)) = expected {
                    assert_eq!(positions.doc(), *doc);
                    assert_eq!(positions.freq(), *freq);
                    if !omits_tf(&key.0) {
                        let (_, doc_positions) = docs.iter().find(|(d, _)| d == doc).unwrap();
                        assert_eq!(positions.next_position().unwrap(), doc_positions[0].0);
                    }
                }
            }
        }
    }

    #[test]
    fn test_unsupported_cursor_operations() {
        let mut postings = Postings::new();
        postings.insert(("plain".to_string(), "a".to_string()), vec![(0, vec![(1, vec![]), (4, vec![])])]);
        postings.insert(("tag".to_string(), "t".to_string()), vec![(2, vec![(0, vec![])])]);
        let (_dir, reader) = open(&postings, 3, DEFAULT_SKIPS);

        let mut positions = reader.term_positions();
        positions.seek(&Term::new("plain", "a")).unwrap();
        assert!(matches!(positions.read(&mut [0; 2], &mut [0; 2]), Err(TextIndexError::UnsupportedOperation(_))));
        assert!(positions.next().unwrap());
        assert_eq!(positions.next_position().unwrap(), 1);
        assert!(!positions.is_payload_available());
        assert!(matches!(positions.payload(), Err(TextIndexError::UnsupportedOperation(_))));
        assert_eq!(positions.next_position().unwrap(), 4);
        assert!(matches!(positions.next_position(), Err(TextIndexError::InternalError(_))));

        let mut term_docs = reader.term_docs();
        term_docs.seek(&Term::new("tag", "t")).unwrap();
        assert!(matches!(term_docs.read(&mut [0; 2], &mut [0; 3]), Err(TextIndexError::InvalidArgument(_))));
        assert!(term_docs.next().unwrap());
        assert_eq!((term_docs.doc(), term_docs.freq()), (2, 1));
    }

    #[test]
    fn test_open_rejects_inconsistent_segments() {
        let mut postings = Postings::new();
        postings.insert(("plain".to_string(), "a".to_string()), vec![(0, vec![(0, vec![])])]);
        let dir = RamDirectory::create();
        write_segment(&dir, "_0", &postings, 1, DEFAULT_SKIPS);

        let mut meta = SegmentMeta::read(&dir, "_0").unwrap();
        meta.num_terms = 2;
        meta.write(&dir).unwrap();
        assert!(matches!(SegmentReader::open(&dir, "_0"), Err(TextIndexError::DataCorruption(_))));
        meta.num_terms = 1;
        meta.write(&dir).unwrap();
        assert!(SegmentReader::open(&dir, "_0").is_ok());

        let tis = meta.file_name(SegmentComponent::TermInfos);
        let mut garbage = vec![0u8; 24];
        garbage[3] = 1;
        dir.atomic_write(&tis, &garbage).unwrap();
        assert!(matches!(SegmentReader::open(&dir, "_0"), Err(TextIndexError::IncompatibleIndex(_))));

        assert!(SegmentReader::open(&dir, "_missing").is_err());
    }

    #[test]
    fn test_truncated_freq_stream_is_an_error() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut postings = Postings::new();
        postings.insert(("plain".to_string(), "a".to_string()), random_docs(&mut rng, 100, 50, false));
        let dir = RamDirectory::create();
        write_segment(&dir, "_0", &postings, 100, DEFAULT_SKIPS);
        let frq = SegmentComponent::Freq.file_name("_0");
        let bytes = dir.atomic_read(&frq).unwrap();
        dir.atomic_write(&frq, &bytes[..bytes.len() / 2]).unwrap();

        let reader = SegmentReader::open(&dir, "_0").unwrap();
        let mut term_docs = reader.term_docs();
        term_docs.seek(&Term::new("plain", "a")).unwrap();
        let mut result = Ok(true);
        while let Ok(true) = result {
            result = term_docs.next();
        }
        assert!(result.is_err());
    }

    /// Segment with one term `field:t` in docs `0..df`, freq 1, then `.frq` replaced by `frq`.
    fn segment_with_freq_bytes(field: &str, df: u32, format: PostingsFormat, frq: Option<&[u8]>) -> (RamDirectory, SegmentReader) {
        let mut postings = Postings::new();
        postings.insert((field.to_string(), "t".to_string()), (0..df).map(|doc| (doc, vec![(0, vec![])])).collect());
        let dir = RamDirectory::create();
        write_segment(&dir, "_0", &postings, df, format);
        if let Some(frq) = frq {
            dir.atomic_write(&SegmentComponent::Freq.file_name("_0"), frq).unwrap();
        }
        let reader = SegmentReader::open(&dir, "_0").unwrap();
        (dir, reader)
    }

    fn collect_docs(reader: &SegmentReader, field: &str) -> (Vec<DocId>, crate::Result<bool>) {
        let mut term_docs = reader.term_docs();
        assert!(term_docs.seek(&Term::new(field, "t")).unwrap());
        let mut docs = Vec::new();
        loop {
            match term_docs.next() {
                Ok(true) => docs.push(term_docs.doc()),
                other => return (docs, other),
            }
        }
    }

    #[test]
    fn test_corrupt_doc_deltas_are_errors() {
        // doc 2, then a delta that overflows u32
        let (_dir, reader) = segment_with_freq_bytes("tag", 3, DEFAULT_SKIPS, Some(&[0x02, 0xFF, 0xFF, 0xFF, 0xFF, 0x0F, 0x01]));
        let (docs, result) = collect_docs(&reader, "tag");
        assert_eq!(docs, vec![2]);
        assert!(matches!(result, Err(TextIndexError::DataCorruption(_))));

        // first doc already past max_doc
        let (_dir, reader) =
            segment_with_freq_bytes("tag", 3, DEFAULT_SKIPS, Some(&[0xFF, 0xFF, 0xFF, 0xFF, 0x0F, 0xFF, 0xFF, 0xFF, 0xFF, 0x0F, 0x01]));
        let (docs, result) = collect_docs(&reader, "tag");
        assert!(docs.is_empty());
        assert!(matches!(result, Err(TextIndexError::DataCorruption(_))));

        // doc 3 == max_doc
        let (_dir, reader) = segment_with_freq_bytes("tag", 3, DEFAULT_SKIPS, Some(&[0x00, 0x01, 0x02]));
        let (docs, result) = collect_docs(&reader, "tag");
        assert_eq!(docs, vec![0, 1]);
        assert!(matches!(result, Err(TextIndexError::DataCorruption(_))));

        // repeated doc id
        let (_dir, reader) = segment_with_freq_bytes("tag", 3, DEFAULT_SKIPS, Some(&[0x00, 0x01, 0x00]));
        let (docs, result) = collect_docs(&reader, "tag");
        assert_eq!(docs, vec![0, 1]);
        assert!(matches!(result, Err(TextIndexError::DataCorruption(_))));

        // zero freq: code `delta << 1` followed by freq 0
        let (_dir, reader) = segment_with_freq_bytes("plain", 3, DEFAULT_SKIPS, Some(&[0x01, 0x02, 0x00, 0x03]));
        let (docs, result) = collect_docs(&reader, "plain");
        assert_eq!(docs, vec![0]);
        assert!(matches!(result, Err(TextIndexError::DataCorruption(_))));

        // the batch read decodes the same way
        let (_dir, reader) = segment_with_freq_bytes("tag", 3, DEFAULT_SKIPS, Some(&[0x00, 0x01, 0x02]));
        let mut term_docs = reader.term_docs();
        term_docs.seek(&Term::new("tag", "t")).unwrap();
        assert!(matches!(term_docs.read(&mut [0; 4], &mut [0; 4]), Err(TextIndexError::DataCorruption(_))));
    }

    #[test]
    fn test_inconsistent_skip_data_is_an_error() {
        // 20 docs of freq 1 take one byte each, the skip data starts at offset 20
        let (dir, reader) = segment_with_freq_bytes("plain", 20, SMALL_SKIPS, None);
        let frq = SegmentComponent::Freq.file_name("_0");
        let bytes = dir.atomic_read(&frq).unwrap();
        assert!(bytes.len() > 20);
        let mut term_docs = reader.term_docs();
        term_docs.seek(&Term::new("plain", "t")).unwrap();
        assert!(term_docs.skip_to(13).unwrap());
        assert_eq!(term_docs.doc(), 13);

        // skip pointer at the end of a file that lost its skip data
        dir.atomic_write(&frq, &bytes[..20]).unwrap();
        let reader = SegmentReader::open(&dir, "_0").unwrap();
        let mut term_docs = reader.term_docs();
        assert!(matches!(term_docs.seek(&Term::new("plain", "t")), Err(TextIndexError::DataCorruption(_))));
        let mut positions = reader.term_positions();
        assert!(matches!(positions.seek(&Term::new("plain", "t")), Err(TextIndexError::DataCorruption(_))));

        // a level length pointing far past the end
        let mut broken = bytes[..20].to_vec();
        broken.extend_from_slice(&[0xFF; 9]);
        broken.push(0x01);
        broken.extend_from_slice(&bytes[20..]);
        dir.atomic_write(&frq, &broken).unwrap();
        let reader = SegmentReader::open(&dir, "_0").unwrap();
        let mut term_docs = reader.term_docs();
        term_docs.seek(&Term::new("plain", "t")).unwrap();
        assert!(matches!(term_docs.skip_to(13), Err(TextIndexError::DataCorruption(_))));

        // the doc stream itself is intact
        let mut scanned = reader.term_docs();
        scanned.seek(&Term::new("plain", "t")).unwrap();
        let mut n = 0;
        while scanned.next().unwrap() {
            n += 1;
        }
        assert_eq!(n, 20);
    }
}
