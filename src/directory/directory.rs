use std::fmt;

use super::{DataOutput, IndexInput};

/// Write side of a directory file.
///
/// Bytes become visible to readers once `close` returned successfully.
pub trait IndexOutput: DataOutput + Send {
    /// Current write offset.
    fn file_pointer(&self) -> u64;

    /// Move the write offset back into already written bytes, used to patch headers.
    fn seek(&mut self, pos: u64) -> crate::Result<()>;

    /// Flush and publish the file. Calling twice is a no-op.
    fn close(&mut self) -> crate::Result<()>;
}

/// Storage abstraction the index pipeline reads from and writes to.
///
/// File names are flat, segment files are named `<segment>.<extension>`.
pub trait Directory: Send + Sync + fmt::Debug {
    /// Open a file for reading. Fails with `FileDoesNotExist` when missing.
    fn open_input(&self, name: &str) -> crate::Result<IndexInput>;

    /// Create (or truncate) a file for writing.
    fn create_output(&self, name: &str) -> crate::Result<Box<dyn IndexOutput>>;

    fn delete_file(&self, name: &str) -> crate::Result<()>;

    fn file_exists(&self, name: &str) -> bool;

    /// Sorted names of every file in the directory.
    fn list_all(&self) -> crate::Result<Vec<String>>;

    /// Read a whole small file at once (metadata).
    fn atomic_read(&self, name: &str) -> crate::Result<Vec<u8>>;

    /// Replace a small file atomically (metadata).
    fn atomic_write(&self, name: &str, data: &[u8]) -> crate::Result<()>;
}
