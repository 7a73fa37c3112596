use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use log::debug;
use parking_lot::RwLock;

use super::{DataOutput, Directory, FileSlice, IndexInput, IndexOutput, RamOutput};
use crate::common::errors::TextIndexError;

type FileMap = Arc<RwLock<HashMap<String, FileSlice>>>;

/// A Directory storing everything in anonymous memory.
///
/// It is mainly meant for unit testing.
#[derive(Clone, Default)]
pub struct RamDirectory {
    files: FileMap,
}

impl RamDirectory {
    pub fn create() -> RamDirectory {
        RamDirectory::default()
    }

    /// Sum of the length of every file.
    pub fn total_mem_usage(&self) -> usize {
        self.files.read().values().map(|f| f.len()).sum()
    }
}

impl fmt::Debug for RamDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RamDirectory({} files)", self.files.read().len())
    }
}

impl Directory for RamDirectory {
    fn open_input(&self, name: &str) -> crate::Result<IndexInput> {
        let files = self.files.read();
        let data = files
            .get(name)
            .ok_or_else(|| TextIndexError::FileDoesNotExist(PathBuf::from(name)))?;
        Ok(IndexInput::new(name, data.clone()))
    }

    fn create_output(&self, name: &str) -> crate::Result<Box<dyn IndexOutput>> {
        Ok(Box::new(RamIndexOutput {
            name: name.to_string(),
            buffer: RamOutput::new(),
            files: self.files.clone(),
            closed: false,
        }))
    }

    fn delete_file(&self, name: &str) -> crate::Result<()> {
        match self.files.write().remove(name) {
            Some(_) => Ok(()),
            None => Err(TextIndexError::FileDoesNotExist(PathBuf::from(name))),
        }
    }

    fn file_exists(&self, name: &str) -> bool {
        self.files.read().contains_key(name)
    }

    fn list_all(&self) -> crate::Result<Vec<String>> {
        let mut names: Vec<String> = self.files.read().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn atomic_read(&self, name: &str) -> crate::Result<Vec<u8>> {
        let files = self.files.read();
        files
            .get(name)
            .map(|data| data.as_slice().to_vec())
            .ok_or_else(|| TextIndexError::FileDoesNotExist(PathBuf::from(name)))
    }

    fn atomic_write(&self, name: &str, data: &[u8]) -> crate::Result<()> {
        self.files.write().insert(name.to_string(), FileSlice::from_vec(data.to_vec()));
        Ok(())
    }
}

/// Output of a [`RamDirectory`] file, published into the directory on close.
struct RamIndexOutput {
    name: String,
    buffer: RamOutput,
    files: FileMap,
    closed: bool,
}

impl DataOutput for RamIndexOutput {
    fn write_byte(&mut self, b: u8) -> crate::Result<()> {
        self.buffer.write_byte(b)
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> crate::Result<()> {
        self.buffer.write_bytes(bytes)
    }
}

impl IndexOutput for RamIndexOutput {
    fn file_pointer(&self) -> u64 {
        self.buffer.file_pointer()
    }

    fn seek(&mut self, pos: u64) -> crate::Result<()> {
        if pos > self.buffer.len() as u64 {
            return Err(TextIndexError::InvalidArgument(format!(
                "cannot seek `{}` to {pos}, only {} bytes written",
                self.name,
                self.buffer.len()
            )));
        }
        self.buffer.seek(pos);
        Ok(())
    }

    fn close(&mut self) -> crate::Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let bytes = std::mem::take(&mut self.buffer).into_inner();
        debug!("[RamDirectory] publish `{}` ({} bytes)", self.name, bytes.len());
        self.files.write().insert(self.name.clone(), FileSlice::from_vec(bytes));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::DataInput;

    #[test]
    fn test_file_visible_after_close() {
        let directory = RamDirectory::create();
        let mut output = directory.create_output("_0.frq").unwrap();
        output.write_vint(300).unwrap();
        assert!(!directory.file_exists("_0.frq"));
        output.close().unwrap();
        assert!(directory.file_exists("_0.frq"));

        let mut input = directory.open_input("_0.frq").unwrap();
        assert_eq!(input.read_vint().unwrap(), 300);
        assert_eq!(directory.list_all().unwrap(), vec!["_0.frq".to_string()]);
    }

    #[test]
    fn test_missing_file() {
        let directory = RamDirectory::create();
        assert!(matches!(
            directory.open_input("nope"),
            Err(TextIndexError::FileDoesNotExist(_))
        ));
        assert!(directory.delete_file("nope").is_err());
    }

    #[test]
    fn test_atomic_read_write() {
        let directory = RamDirectory::create();
        directory.atomic_write("_0.si", b"{}").unwrap();
        directory.atomic_write("_0.si", b"{\"a\":1}").unwrap();
        assert_eq!(directory.atomic_read("_0.si").unwrap(), b"{\"a\":1}".to_vec());
        directory.delete_file("_0.si").unwrap();
        assert!(!directory.file_exists("_0.si"));
    }
}
