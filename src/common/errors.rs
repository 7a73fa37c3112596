use std::{fmt, io};
use std::{path::PathBuf, sync::Arc};
use thiserror::Error;

use crate::common::file_operations::FileOperationError;

/// Represents a `DataCorruption` error.
///
/// Returned when a stream read from the directory does not decode the way it was written:
/// truncated files, malformed VInts, field numbers out of range, mismatched headers.
#[derive(Clone)]
pub struct DataCorruption {
    filepath: Option<PathBuf>,
    comment: String,
}

impl DataCorruption {
    /// Creates a `DataCorruption` Error.
    pub fn new(filepath: PathBuf, comment: String) -> DataCorruption {
        DataCorruption { filepath: Some(filepath), comment }
    }

    /// Creates a `DataCorruption` Error, when the filepath is irrelevant.
    pub fn comment_only<TStr: ToString>(comment: TStr) -> DataCorruption {
        DataCorruption { filepath: None, comment: comment.to_string() }
    }
}

impl fmt::Debug for DataCorruption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "Data corruption")?;
        if let Some(ref filepath) = &self.filepath {
            write!(f, " (in file `{filepath:?}`)")?;
        }
        write!(f, ": {}.", self.comment)?;
        Ok(())
    }
}

/// The format version found on disk isn't the one this library writes.
#[derive(Clone, Debug)]
pub struct Incompatibility {
    /// File carrying the unexpected header.
    pub file_name: String,
    /// Format version this library understands.
    pub library_format: i32,
    /// Format version read from the file.
    pub index_format: i32,
}

/// The library's error enum
#[derive(Debug, Error)]
pub enum TextIndexError {
    /// IO Error.
    #[error("An IO error occurred: '{0}'")]
    IoError(Arc<io::Error>),
    /// Data corruption.
    #[error("Data corrupted: '{0:?}'")]
    DataCorruption(DataCorruption),
    /// Index written with a format this version cannot read.
    #[error("Incompatible index: '{0:?}'")]
    IncompatibleIndex(Incompatibility),
    /// Tried to open a file that does not exist.
    #[error("File does not exist: '{0:?}'")]
    FileDoesNotExist(PathBuf),
    /// Invalid argument was passed by the user.
    #[error("An invalid argument was passed: '{0}'")]
    InvalidArgument(String),
    /// The cursor (or reader) does not implement the requested operation.
    #[error("Unsupported operation: '{0}'")]
    UnsupportedOperation(String),
    /// An internal error occurred. This is are internal states that should not be reached.
    /// e.g. a datastructure is incorrectly inititalized.
    #[error("Internal error: '{0}'")]
    InternalError(String),
    /// An Error occurred in one of the threads.
    #[error("An error occurred in a thread: '{0}'")]
    ErrorInThread(String),
    /// System error. (e.g.: We failed spawning a new thread).
    #[error("System error.'{0}'")]
    SystemError(String),

    #[error("'{0:?}'")]
    FileOperationError(#[from] FileOperationError),
}

impl From<io::Error> for TextIndexError {
    fn from(io_err: io::Error) -> TextIndexError {
        TextIndexError::IoError(Arc::new(io_err))
    }
}

impl From<DataCorruption> for TextIndexError {
    fn from(data_corruption: DataCorruption) -> TextIndexError {
        TextIndexError::DataCorruption(data_corruption)
    }
}

impl From<Incompatibility> for TextIndexError {
    fn from(incompatibility: Incompatibility) -> TextIndexError {
        TextIndexError::IncompatibleIndex(incompatibility)
    }
}

impl From<serde_json::Error> for TextIndexError {
    fn from(serde_error: serde_json::Error) -> TextIndexError {
        TextIndexError::FileOperationError(FileOperationError::SerdeJsonError(serde_error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_corruption_debug_message() {
        let err = DataCorruption::new(PathBuf::from("_0.frq"), "read past EOF".to_string());
        assert_eq!(format!("{err:?}"), "Data corruption (in file `\"_0.frq\"`): read past EOF.");

        let err = DataCorruption::comment_only("invalid vint");
        assert_eq!(format!("{err:?}"), "Data corruption: invalid vint.");
    }

    #[test]
    fn test_io_error_conversion() {
        let err: TextIndexError = io::Error::new(io::ErrorKind::Other, "boom").into();
        assert!(matches!(err, TextIndexError::IoError(_)));
    }
}
