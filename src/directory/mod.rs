mod data_io;
#[allow(clippy::module_inception)]
mod directory;
mod index_input;
mod mmap_directory;
mod ram_directory;

pub use self::data_io::{DataInput, DataOutput, RamOutput};
pub use self::directory::{Directory, IndexOutput};
pub use self::index_input::{FileSlice, IndexInput};
pub use self::mmap_directory::MmapDirectory;
pub use self::ram_directory::RamDirectory;
