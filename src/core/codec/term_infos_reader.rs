use std::cmp::Ordering;
use std::sync::Arc;

use log::debug;

use super::{FieldInfos, SegmentTermEnum, TermInfo};
use crate::common::constants::TERM_INFOS_FORMAT;
use crate::common::errors::{DataCorruption, Incompatibility};
use crate::core::Term;
use crate::directory::{DataInput, Directory, IndexInput};

/// Header shared by `.tis` and `.tii`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermInfosHeader {
    pub size: u64,
    pub index_interval: u32,
    pub skip_interval: u32,
    pub max_skip_levels: u32,
}

impl TermInfosHeader {
    fn read(input: &mut IndexInput) -> crate::Result<Self> {
        let format = input.read_int()?;
        if format != TERM_INFOS_FORMAT {
            return Err(Incompatibility {
                file_name: input.name().to_string(),
                library_format: TERM_INFOS_FORMAT,
                index_format: format,
            }
            .into());
        }
        let size = input.read_long()?;
        let index_interval = input.read_int()?;
        let skip_interval = input.read_int()?;
        let max_skip_levels = input.read_int()?;
        if size < 0 || index_interval < 1 || skip_interval < 2 || max_skip_levels < 0 {
            return Err(DataCorruption::new(
                input.name().into(),
                format!(
                    "invalid header: size={size}, index_interval={index_interval}, \
                     skip_interval={skip_interval}, max_skip_levels={max_skip_levels}"
                ),
            )
            .into());
        }
        Ok(TermInfosHeader {
            size: size as u64,
            index_interval: index_interval as u32,
            skip_interval: skip_interval as u32,
            max_skip_levels: max_skip_levels as u32,
        })
    }
}

/// One `.tii` entry, held in memory.
#[derive(Debug, Clone)]
struct IndexTerm {
    field_number: u32,
    text: Vec<u8>,
    /// `.tis` offset of the indexed record.
    term_pointer: u64,
    /// Freq/prox pointers of the record before the indexed one.
    prev_freq_pointer: u64,
    prev_prox_pointer: u64,
}

/// Term dictionary of one segment.
///
/// The sampled index is loaded in memory; a lookup binary searches it then
/// decodes at most `index_interval` records of `.tis`. Each lookup works on
/// its own clone of the `.tis` input, so the reader can be shared by threads.
pub struct TermInfosReader {
    tis: IndexInput,
    first_record_pointer: u64,
    field_infos: Arc<FieldInfos>,
    header: TermInfosHeader,
    index: Vec<IndexTerm>,
}

impl TermInfosReader {
    pub fn open(
        directory: &dyn Directory,
        tis_name: &str,
        tii_name: &str,
        field_infos: Arc<FieldInfos>,
    ) -> crate::Result<Self> {
        let mut tis = directory.open_input(tis_name)?;
        let header = TermInfosHeader::read(&mut tis)?;
        let first_record_pointer = tis.file_pointer();

        let mut tii = directory.open_input(tii_name)?;
        let index_header = TermInfosHeader::read(&mut tii)?;
        if index_header.index_interval != header.index_interval
            || index_header.skip_interval != header.skip_interval
            || index_header.max_skip_levels != header.max_skip_levels
        {
            return Err(DataCorruption::new(
                tii_name.into(),
                format!("header {index_header:?} does not match `{tis_name}` header {header:?}"),
            )
            .into());
        }
        let expected_index_size = header.size.div_ceil(header.index_interval as u64);
        if index_header.size != expected_index_size {
            return Err(DataCorruption::new(
                tii_name.into(),
                format!(
                    "{} index terms for {} terms with interval {}, expected {}",
                    index_header.size, header.size, header.index_interval, expected_index_size
                ),
            )
            .into());
        }

        // 每个 entry 至少 6 个字节
        let mut index = Vec::with_capacity(index_header.size.min(tii.len() / 6) as usize);
        let mut text: Vec<u8> = Vec::new();
        let mut term_pointer = 0u64;
        let mut prev_freq_pointer = 0u64;
        let mut prev_prox_pointer = 0u64;
        for _ in 0..index_header.size {
            let prefix = tii.read_vint()? as usize;
            let suffix_len = tii.read_vint()? as usize;
            if prefix > text.len() || suffix_len as u64 > tii.len() - tii.file_pointer() {
                return Err(DataCorruption::new(
                    tii_name.into(),
                    format!("bad term index entry: prefix {prefix}, suffix {suffix_len}"),
                )
                .into());
            }
            text.truncate(prefix);
            text.resize(prefix + suffix_len, 0);
            tii.read_bytes(&mut text[prefix..])?;
            let field_number = tii.read_vint()?;
            let term_delta = tii.read_vlong()?;
            let freq_delta = tii.read_vlong()?;
            let prox_delta = tii.read_vlong()?;
            match (
                term_pointer.checked_add(term_delta),
                prev_freq_pointer.checked_add(freq_delta),
                prev_prox_pointer.checked_add(prox_delta),
            ) {
                (Some(term), Some(freq), Some(prox)) => {
                    term_pointer = term;
                    prev_freq_pointer = freq;
                    prev_prox_pointer = prox;
                }
                _ => {
                    return Err(DataCorruption::new(
                        tii_name.into(),
                        format!("pointers of term index entry {} overflow", index.len()),
                    )
                    .into());
                }
            }
            if field_number as usize >= field_infos.len() || term_pointer >= tis.len() {
                return Err(DataCorruption::new(
                    tii_name.into(),
                    format!("term index entry points outside the dictionary: {field_number}@{term_pointer}"),
                )
                .into());
            }
            index.push(IndexTerm {
                field_number,
                text: text.clone(),
                term_pointer,
                prev_freq_pointer,
                prev_prox_pointer,
            });
        }
        debug!(
            "opened term dictionary `{}`: {} terms, {} index terms",
            tis_name,
            header.size,
            index.len()
        );

        Ok(TermInfosReader { tis, first_record_pointer, field_infos, header, index })
    }

    pub fn size(&self) -> u64 {
        self.header.size
    }

    pub fn skip_interval(&self) -> u32 {
        self.header.skip_interval
    }

    pub fn max_skip_levels(&self) -> u32 {
        self.header.max_skip_levels
    }

    pub fn index_interval(&self) -> u32 {
        self.header.index_interval
    }

    pub fn header(&self) -> TermInfosHeader {
        self.header
    }

    pub fn field_infos(&self) -> &Arc<FieldInfos> {
        &self.field_infos
    }

    /// Enum over every term, positioned before the first one.
    pub fn terms(&self) -> crate::Result<SegmentTermEnum> {
        let mut input = self.tis.clone();
        input.seek(self.first_record_pointer)?;
        Ok(SegmentTermEnum::new(input, self.field_infos.clone(), self.header.size, self.header.skip_interval))
    }

    /// Enum positioned at the nearest index term `<= key`, or at the start.
    fn enum_near(&self, field_number: u32, text: &[u8]) -> crate::Result<SegmentTermEnum> {
        let mut term_enum = self.terms()?;
        let idx = self.index.partition_point(|entry| {
            entry.field_number.cmp(&field_number).then_with(|| entry.text.as_slice().cmp(text))
                != Ordering::Greater
        });
        if idx > 0 {
            let entry = &self.index[idx - 1];
            term_enum.seek(
                entry.term_pointer,
                (idx as u64 - 1) * self.header.index_interval as u64,
                entry.prev_freq_pointer,
                entry.prev_prox_pointer,
            )?;
        }
        Ok(term_enum)
    }

    /// Look up the dictionary entry of `term`.
    pub fn get(&self, term: &Term) -> crate::Result<Option<TermInfo>> {
        let Some(field_number) = self.field_infos.field_number(term.field()) else {
            return Ok(None);
        };
        let text = term.text().as_bytes();
        let mut term_enum = self.enum_near(field_number, text)?;
        if !term_enum.scan_to(field_number, text)? {
            return Ok(None);
        }
        if term_enum.compare_current(field_number, text) == Ordering::Equal {
            Ok(Some(term_enum.term_info()))
        } else {
            Ok(None)
        }
    }

    /// Enum whose current term is the first term `>= term`. When no such term
    /// exists the enum is exhausted and `term()` is `None`.
    pub fn terms_from(&self, term: &Term) -> crate::Result<SegmentTermEnum> {
        // 字段不存在时, 从下一个字段的第一个 term 开始
        let (field_number, text) = match self.field_infos.field_number(term.field()) {
            Some(number) => (number, term.text().as_bytes()),
            None => {
                let next_field = self.field_infos.iter().find(|fi| fi.name.as_str() > term.field());
                match next_field {
                    Some(fi) => (fi.number, &[][..]),
                    None => (self.field_infos.len() as u32, &[][..]),
                }
            }
        };
        let mut term_enum = self.enum_near(field_number, text)?;
        term_enum.scan_to(field_number, text)?;
        Ok(term_enum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::errors::TextIndexError;
    use crate::core::codec::TermInfosWriter;
    use crate::directory::{DataOutput, IndexOutput, RamDirectory};

    fn field_infos() -> Arc<FieldInfos> {
        Arc::new(FieldInfos::new(vec![
            ("body".to_string(), false, false),
            ("title".to_string(), false, false),
        ]))
    }

    fn words(n: usize) -> Vec<String> {
        let mut words: Vec<String> = (0..n).map(|i| format!("w{:05}", i * 7)).collect();
        words.sort();
        words
    }

    fn build(dir: &RamDirectory, index_interval: u32, words: &[String]) {
        let mut writer =
            TermInfosWriter::create(dir, "_0.tis", "_0.tii", index_interval, 16, 10).unwrap();
        let mut pointer = 0;
        for field in 0..2 {
            for word in words {
                pointer += 3;
                let info = TermInfo {
                    doc_freq: (pointer % 40) as u32 + 1,
                    freq_pointer: pointer,
                    prox_pointer: pointer * 2,
                    skip_offset: 1,
                };
                writer.add(field, word.as_bytes(), &info).unwrap();
            }
        }
        writer.close().unwrap();
    }

    #[test]
    fn test_get_every_term_and_misses() {
        let dir = RamDirectory::create();
        let words = words(500);
        for index_interval in [1, 4, 128] {
            build(&dir, index_interval, &words);
            let reader = TermInfosReader::open(&dir, "_0.tis", "_0.tii", field_infos()).unwrap();
            assert_eq!(reader.size(), 1000);
            let mut pointer = 0;
            for field in ["body", "title"] {
                for word in &words {
                    pointer += 3;
                    let info = reader.get(&Term::new(field, word.as_str())).unwrap().unwrap();
                    assert_eq!(info.freq_pointer, pointer);
                    assert_eq!(info.prox_pointer, pointer * 2);
                    assert_eq!(info.doc_freq, (pointer % 40) as u32 + 1);
                }
            }
            assert!(reader.get(&Term::new("body", "a")).unwrap().is_none());
            assert!(reader.get(&Term::new("body", "w00001")).unwrap().is_none());
            assert!(reader.get(&Term::new("body", "zzz")).unwrap().is_none());
            assert!(reader.get(&Term::new("missing", "w00000")).unwrap().is_none());
        }
    }

    #[test]
    fn test_terms_enum_and_terms_from() {
        let dir = RamDirectory::create();
        let words = words(50);
        build(&dir, 8, &words);
        let reader = TermInfosReader::open(&dir, "_0.tis", "_0.tii", field_infos()).unwrap();

        let mut all = Vec::new();
        let mut terms = reader.terms().unwrap();
        while terms.next().unwrap() {
            all.push(terms.term().unwrap().unwrap());
        }
        assert_eq!(all.len(), 100);
        assert!(all.windows(2).all(|w| w[0] < w[1]));

        let from = reader.terms_from(&Term::new("body", "w00008")).unwrap();
        assert_eq!(from.term().unwrap(), Some(Term::new("body", "w00014")));
        let from = reader.terms_from(&Term::new("body", "zzz")).unwrap();
        assert_eq!(from.term().unwrap(), Some(Term::new("title", "w00000")));
        let from = reader.terms_from(&Term::new("content", "")).unwrap();
        assert_eq!(from.term().unwrap(), Some(Term::new("title", "w00000")));
        let from = reader.terms_from(&Term::new("zfield", "")).unwrap();
        assert_eq!(from.term().unwrap(), None);
    }

    #[test]
    fn test_incompatible_and_truncated_dictionary() {
        let dir = RamDirectory::create();
        build(&dir, 4, &words(20));
        let mut out = dir.create_output("_0.tis").unwrap();
        out.write_int(-3).unwrap();
        out.close().unwrap();
        assert!(matches!(
            TermInfosReader::open(&dir, "_0.tis", "_0.tii", field_infos()),
            Err(TextIndexError::IncompatibleIndex(_))
        ));

        build(&dir, 4, &words(20));
        let data = dir.atomic_read("_0.tis").unwrap();
        dir.atomic_write("_0.tis", &data[..data.len() - 5]).unwrap();
        let reader = TermInfosReader::open(&dir, "_0.tis", "_0.tii", field_infos()).unwrap();
        let mut terms = reader.terms().unwrap();
        let result = (0..40).try_for_each(|_| terms.next().map(|_| ()));
        assert!(matches!(result, Err(TextIndexError::DataCorruption(_))));
    }

    #[test]
    fn test_huge_term_count_in_headers() {
        let dir = RamDirectory::create();
        build(&dir, 4, &words(20));
        // 两个 header 的 size 保持一致, 只有 entry 数量是假的
        let size: i64 = 1 << 50;
        for (name, claimed) in [("_0.tis", size), ("_0.tii", size / 4)] {
            let mut data = dir.atomic_read(name).unwrap();
            data[4..12].copy_from_slice(&claimed.to_be_bytes());
            dir.atomic_write(name, &data).unwrap();
        }
        assert!(matches!(
            TermInfosReader::open(&dir, "_0.tis", "_0.tii", field_infos()),
            Err(TextIndexError::DataCorruption(_))
        ));
    }
}
