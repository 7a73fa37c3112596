use log::debug;
use roaring::RoaringBitmap;

use super::{SegmentComponent, SegmentMeta};
use crate::common::errors::{DataCorruption, TextIndexError};
use crate::directory::Directory;
use crate::DocId;

/// Deleted documents of a segment, stored as a roaring bitmap in `.del`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeletedDocs {
    bitmap: RoaringBitmap,
}

impl DeletedDocs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `doc` deleted, returns `false` when it already was.
    pub fn delete(&mut self, doc: DocId) -> bool {
        self.bitmap.insert(doc)
    }

    pub fn is_deleted(&self, doc: DocId) -> bool {
        self.bitmap.contains(doc)
    }

    pub fn len(&self) -> u64 {
        self.bitmap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bitmap.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = DocId> + '_ {
        self.bitmap.iter()
    }

    pub fn write(&self, directory: &dyn Directory, file_name: &str) -> crate::Result<()> {
        let mut bytes = Vec::with_capacity(self.bitmap.serialized_size());
        self.bitmap.serialize_into(&mut bytes)?;
        directory.atomic_write(file_name, &bytes)?;
        debug!("wrote {} deleted docs to `{}`", self.bitmap.len(), file_name);
        Ok(())
    }

    pub fn read(directory: &dyn Directory, file_name: &str) -> crate::Result<Self> {
        let bytes = directory.atomic_read(file_name)?;
        let bitmap = RoaringBitmap::deserialize_from(bytes.as_slice()).map_err(|e| {
            DataCorruption::new(file_name.into(), format!("invalid deleted docs bitmap: {e}"))
        })?;
        Ok(DeletedDocs { bitmap })
    }
}

/// Mark `docs` deleted in the flushed segment `segment_name`, rewriting its
/// `.del` and `.si` files. Readers opened before keep their view.
pub fn delete_documents<I>(
    directory: &dyn Directory,
    segment_name: &str,
    docs: I,
) -> crate::Result<SegmentMeta>
where
    I: IntoIterator<Item = DocId>,
{
    let mut meta = SegmentMeta::read(directory, segment_name)?;
    let del_file = meta.file_name(SegmentComponent::Deletes);
    let mut deleted =
        if meta.has_deletions() { DeletedDocs::read(directory, &del_file)? } else { DeletedDocs::new() };
    let before = deleted.len();
    for doc in docs {
        if doc >= meta.doc_count {
            return Err(TextIndexError::InvalidArgument(format!(
                "doc {} is out of range, segment {} has {} docs",
                doc, segment_name, meta.doc_count
            )));
        }
        deleted.delete(doc);
    }
    if deleted.len() == before {
        return Ok(meta);
    }
    deleted.write(directory, &del_file)?;
    meta.del_count = deleted.len() as u32;
    meta.write(directory)?;
    Ok(meta)
}

impl FromIterator<DocId> for DeletedDocs {
    fn from_iter<I: IntoIterator<Item = DocId>>(iter: I) -> Self {
        DeletedDocs { bitmap: iter.into_iter().collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::RamDirectory;

    #[test]
    fn test_write_read() {
        let dir = RamDirectory::create();
        let mut deleted = DeletedDocs::new();
        assert!(deleted.delete(3));
        assert!(!deleted.delete(3));
        deleted.delete(100_000);
        deleted.write(&dir, "_0.del").unwrap();

        let read = DeletedDocs::read(&dir, "_0.del").unwrap();
        assert_eq!(read, deleted);
        assert!(read.is_deleted(3));
        assert!(!read.is_deleted(4));
        assert_eq!(read.iter().collect::<Vec<_>>(), vec![3, 100_000]);
    }

    #[test]
    fn test_delete_documents_updates_meta() {
        use crate::core::codec::PostingsFormat;

        let dir = RamDirectory::create();
        let format = PostingsFormat { skip_interval: 16, max_skip_levels: 10, term_index_interval: 128 };
        SegmentMeta::new("_0", 10, format, true, 0).write(&dir).unwrap();

        let meta = delete_documents(&dir, "_0", [1, 4]).unwrap();
        assert_eq!(meta.del_count, 2);
        let meta = delete_documents(&dir, "_0", [4, 9]).unwrap();
        assert_eq!(meta.del_count, 3);
        assert_eq!(SegmentMeta::read(&dir, "_0").unwrap().del_count, 3);
        let deleted = DeletedDocs::read(&dir, "_0.del").unwrap();
        assert_eq!(deleted.iter().collect::<Vec<_>>(), vec![1, 4, 9]);

        assert!(matches!(
            delete_documents(&dir, "_0", [10]),
            Err(TextIndexError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_garbage_is_corruption() {
        let dir = RamDirectory::create();
        dir.atomic_write("_0.del", &[1, 2, 3]).unwrap();
        assert!(matches!(DeletedDocs::read(&dir, "_0.del"), Err(TextIndexError::DataCorruption(_))));
    }
}
