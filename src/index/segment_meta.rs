use serde::{Deserialize, Serialize};

use super::SegmentComponent;
use crate::common::errors::{DataCorruption, Incompatibility};
use crate::common::version::{self, Version};
use crate::core::codec::PostingsFormat;
use crate::directory::Directory;
use crate::INDEX_FORMAT_VERSION;

/// Commit metadata of one flushed segment, stored as json in `<segment>.si`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentMeta {
    pub name: String,
    /// Documents added to the segment, deleted ones included.
    pub doc_count: u32,
    pub del_count: u32,
    pub skip_interval: u32,
    pub max_skip_levels: u32,
    pub term_index_interval: u32,
    /// Whether the segment has a `.prx` file.
    pub has_prox: bool,
    pub num_terms: u64,
    pub version: Version,
}

impl SegmentMeta {
    pub fn new(name: &str, doc_count: u32, format: PostingsFormat, has_prox: bool, num_terms: u64) -> Self {
        SegmentMeta {
            name: name.to_string(),
            doc_count,
            del_count: 0,
            skip_interval: format.skip_interval,
            max_skip_levels: format.max_skip_levels,
            term_index_interval: format.term_index_interval,
            has_prox,
            num_terms,
            version: version::version().clone(),
        }
    }

    pub fn postings_format(&self) -> PostingsFormat {
        PostingsFormat {
            skip_interval: self.skip_interval,
            max_skip_levels: self.max_skip_levels,
            term_index_interval: self.term_index_interval,
        }
    }

    pub fn has_deletions(&self) -> bool {
        self.del_count > 0
    }

    pub fn num_live_docs(&self) -> u32 {
        self.doc_count - self.del_count
    }

    pub fn file_name(&self, component: SegmentComponent) -> String {
        component.file_name(&self.name)
    }

    /// Files of the segment that exist on disk.
    pub fn files(&self) -> Vec<String> {
        SegmentComponent::iterator()
            .filter(|component| match component {
                SegmentComponent::Prox => self.has_prox,
                SegmentComponent::Deletes => self.has_deletions(),
                _ => true,
            })
            .map(|component| self.file_name(*component))
            .collect()
    }

    pub fn write(&self, directory: &dyn Directory) -> crate::Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        directory.atomic_write(&self.file_name(SegmentComponent::Meta), &json)
    }

    pub fn read(directory: &dyn Directory, segment_name: &str) -> crate::Result<Self> {
        let file_name = SegmentComponent::Meta.file_name(segment_name);
        let bytes = directory.atomic_read(&file_name)?;
        let meta: SegmentMeta = serde_json::from_slice(&bytes).map_err(|e| {
            DataCorruption::new(file_name.as_str().into(), format!("invalid segment metadata: {e}"))
        })?;
        if meta.version.index_format_version != INDEX_FORMAT_VERSION {
            return Err(Incompatibility {
                file_name,
                library_format: INDEX_FORMAT_VERSION as i32,
                index_format: meta.version.index_format_version as i32,
            }
            .into());
        }
        if meta.name != segment_name || meta.del_count > meta.doc_count {
            return Err(DataCorruption::new(
                file_name.as_str().into(),
                format!(
                    "metadata of `{}` with {} deletions for {} docs",
                    meta.name, meta.del_count, meta.doc_count
                ),
            )
            .into());
        }
        Ok(meta)
    }

    /// Names of the segments of `directory` having a `.si` file, sorted.
    pub fn list_segments(directory: &dyn Directory) -> crate::Result<Vec<String>> {
        let suffix = format!(".{}", SegmentComponent::Meta.extension());
        let mut names: Vec<String> = directory
            .list_all()?
            .into_iter()
            .filter_map(|file| file.strip_suffix(suffix.as_str()).map(str::to_string))
            .collect();
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::errors::TextIndexError;
    use crate::directory::RamDirectory;

    fn format() -> PostingsFormat {
        PostingsFormat { skip_interval: 16, max_skip_levels: 10, term_index_interval: 128 }
    }

    #[test]
    fn test_write_read() {
        let dir = RamDirectory::create();
        let mut meta = SegmentMeta::new("_3", 42, format(), false, 7);
        assert_eq!(meta.files(), vec!["_3.si", "_3.fnm", "_3.tis", "_3.tii", "_3.frq"]);
        meta.del_count = 2;
        meta.write(&dir).unwrap();
        let read = SegmentMeta::read(&dir, "_3").unwrap();
        assert_eq!(read, meta);
        assert_eq!(read.num_live_docs(), 40);
        assert!(read.files().contains(&"_3.del".to_string()));
        SegmentMeta::new("_a", 1, format(), false, 1).write(&dir).unwrap();
        assert_eq!(SegmentMeta::list_segments(&dir).unwrap(), vec!["_3", "_a"]);
    }

    #[test]
    fn test_future_format_is_incompatible() {
        let dir = RamDirectory::create();
        let mut meta = SegmentMeta::new("_0", 1, format(), true, 1);
        meta.version.index_format_version = INDEX_FORMAT_VERSION + 1;
        meta.write(&dir).unwrap();
        assert!(matches!(SegmentMeta::read(&dir, "_0"), Err(TextIndexError::IncompatibleIndex(_))));
    }
}
