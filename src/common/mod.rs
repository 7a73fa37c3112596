pub mod constants;
pub mod errors;
pub mod file_operations;
pub mod logger;
pub mod version;

pub use errors::{DataCorruption, Incompatibility, TextIndexError};
pub use version::{version, version_string, Version};
