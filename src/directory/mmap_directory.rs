use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info};
use memmap2::Mmap;

use super::{DataOutput, Directory, FileSlice, IndexInput, IndexOutput};
use crate::common::errors::TextIndexError;
use crate::common::file_operations::atomic_save_bytes;

/// Directory over a filesystem folder: files are read through memory maps and
/// written through buffered file handles.
#[derive(Clone)]
pub struct MmapDirectory {
    root_path: Arc<PathBuf>,
}

impl MmapDirectory {
    /// Open (creating if needed) the directory at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> crate::Result<MmapDirectory> {
        let root_path = path.as_ref().to_path_buf();
        if !root_path.exists() {
            info!("[MmapDirectory] create index directory {:?}", root_path);
            fs::create_dir_all(&root_path)?;
        } else if !root_path.is_dir() {
            return Err(TextIndexError::InvalidArgument(format!(
                "{root_path:?} exists but is not a directory"
            )));
        }
        Ok(MmapDirectory { root_path: Arc::new(root_path) })
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    fn resolve(&self, name: &str) -> PathBuf {
        self.root_path.join(name)
    }
}

impl fmt::Debug for MmapDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MmapDirectory({:?})", self.root_path)
    }
}

fn open_read_mmap(path: &Path) -> Result<Option<Mmap>, io::Error> {
    let file = OpenOptions::new().read(true).open(path)?;
    if file.metadata()?.len() == 0 {
        // mapping an empty file is refused on some platforms
        return Ok(None);
    }
    let mmap = unsafe { Mmap::map(&file)? };
    Ok(Some(mmap))
}

fn not_found_to_missing(err: io::Error, path: &Path) -> TextIndexError {
    if err.kind() == io::ErrorKind::NotFound {
        TextIndexError::FileDoesNotExist(path.to_path_buf())
    } else {
        err.into()
    }
}

impl Directory for MmapDirectory {
    fn open_input(&self, name: &str) -> crate::Result<IndexInput> {
        let path = self.resolve(name);
        let data = match open_read_mmap(&path).map_err(|e| not_found_to_missing(e, &path))? {
            Some(mmap) => FileSlice::new(Arc::new(mmap)),
            None => FileSlice::empty(),
        };
        Ok(IndexInput::new(name, data))
    }

    fn create_output(&self, name: &str) -> crate::Result<Box<dyn IndexOutput>> {
        let path = self.resolve(name);
        let file = OpenOptions::new().write(true).create(true).truncate(true).open(&path)?;
        Ok(Box::new(FsIndexOutput { path, writer: BufWriter::new(file), pos: 0, closed: false }))
    }

    fn delete_file(&self, name: &str) -> crate::Result<()> {
        let path = self.resolve(name);
        fs::remove_file(&path).map_err(|e| not_found_to_missing(e, &path))
    }

    fn file_exists(&self, name: &str) -> bool {
        self.resolve(name).exists()
    }

    fn list_all(&self) -> crate::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(self.root_path.as_ref())? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn atomic_read(&self, name: &str) -> crate::Result<Vec<u8>> {
        let path = self.resolve(name);
        fs::read(&path).map_err(|e| not_found_to_missing(e, &path))
    }

    fn atomic_write(&self, name: &str, data: &[u8]) -> crate::Result<()> {
        let path = self.resolve(name);
        debug!("[MmapDirectory] atomic write {:?} ({} bytes)", path, data.len());
        atomic_save_bytes(&path, data)?;
        Ok(())
    }
}

struct FsIndexOutput {
    path: PathBuf,
    writer: BufWriter<File>,
    pos: u64,
    closed: bool,
}

impl DataOutput for FsIndexOutput {
    fn write_byte(&mut self, b: u8) -> crate::Result<()> {
        self.writer.write_all(&[b])?;
        self.pos += 1;
        Ok(())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> crate::Result<()> {
        self.writer.write_all(bytes)?;
        self.pos += bytes.len() as u64;
        Ok(())
    }
}

impl IndexOutput for FsIndexOutput {
    fn file_pointer(&self) -> u64 {
        self.pos
    }

    fn seek(&mut self, pos: u64) -> crate::Result<()> {
        self.writer.seek(SeekFrom::Start(pos))?;
        self.pos = pos;
        Ok(())
    }

    fn close(&mut self) -> crate::Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        debug!("[MmapDirectory] closed {:?}", self.path);
        Ok(())
    }
}
