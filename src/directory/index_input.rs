use std::fmt;
use std::ops::Deref;
use std::path::PathBuf;
use std::sync::Arc;

use super::DataInput;
use crate::common::errors::DataCorruption;

/// Immutable, cheaply cloneable view over the bytes of one file.
///
/// Backed either by a `Vec<u8>` (RAM directory) or a memory map.
#[derive(Clone)]
pub struct FileSlice {
    data: Arc<dyn Deref<Target = [u8]> + Send + Sync>,
}

impl FileSlice {
    pub fn new(data: Arc<dyn Deref<Target = [u8]> + Send + Sync>) -> Self {
        FileSlice { data }
    }

    pub fn from_vec(bytes: Vec<u8>) -> Self {
        FileSlice { data: Arc::new(bytes) }
    }

    pub fn empty() -> Self {
        FileSlice::from_vec(Vec::new())
    }

    pub fn as_slice(&self) -> &[u8] {
        self.data.deref()
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for FileSlice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileSlice({} bytes)", self.len())
    }
}

/// Random access reader over a [`FileSlice`].
///
/// Clones share the bytes but carry their own file pointer, so every cursor
/// of a segment reader gets an independent clone of the stream it reads.
#[derive(Clone)]
pub struct IndexInput {
    name: Arc<str>,
    data: FileSlice,
    pos: usize,
}

impl IndexInput {
    pub fn new(name: &str, data: FileSlice) -> Self {
        IndexInput { name: Arc::from(name), data, pos: 0 }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn file_pointer(&self) -> u64 {
        self.pos as u64
    }

    /// Seeking to `len()` is allowed, the next read then fails.
    pub fn seek(&mut self, pos: u64) -> crate::Result<()> {
        if pos > self.len() {
            return Err(self.corruption(format!(
                "seek to {pos} past the end of a {} byte file",
                self.len()
            )));
        }
        self.pos = pos as usize;
        Ok(())
    }

    fn corruption(&self, comment: String) -> crate::TextIndexError {
        DataCorruption::new(PathBuf::from(self.name.as_ref()), comment).into()
    }
}

impl fmt::Debug for IndexInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexInput")
            .field("name", &self.name)
            .field("len", &self.data.len())
            .field("pos", &self.pos)
            .finish()
    }
}

impl DataInput for IndexInput {
    fn read_byte(&mut self) -> crate::Result<u8> {
        match self.data.as_slice().get(self.pos) {
            Some(b) => {
                self.pos += 1;
                Ok(*b)
            }
            None => Err(self.corruption(format!("read past EOF at {}", self.pos))),
        }
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> crate::Result<()> {
        let end = self.pos + buf.len();
        if end > self.data.len() {
            return Err(self.corruption(format!(
                "read of {} bytes at {} past EOF ({} bytes)",
                buf.len(),
                self.pos,
                self.data.len()
            )));
        }
        buf.copy_from_slice(&self.data.as_slice()[self.pos..end]);
        self.pos = end;
        Ok(())
    }
}
