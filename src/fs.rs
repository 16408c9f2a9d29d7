//! The ZXFS engine: flat file operations over one backing image.
//!
//! File bytes reach the backing store as soon as `write` returns, but the
//! allocation and directory tables only live in memory until `persist` is
//! called. A write that is never persisted is invisible to the next `load`.

use std::path::Path;

use log::{debug, info};

use crate::directory::{Directory, FileEntry};
use crate::error::{Result, ZxfsError};
use crate::fat::AllocationTable;
use crate::fs_layout::{
    block_offset, load_metadata, persist_metadata, BlockId, BLOCK_SIZE, MAX_FILENAME_LEN,
    MAX_FILE_SIZE,
};
use crate::storage::{BackingStore, ImageFile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Open an existing image and load its metadata.
    ReadWrite,
    /// Create or truncate the image and start with empty tables.
    Create,
}

#[derive(Debug)]
pub struct Zxfs<S: BackingStore> {
    store: S,
    fat: AllocationTable,
    directory: Directory,
}

impl Zxfs<ImageFile> {
    pub fn open<P: AsRef<Path>>(path: P, mode: OpenMode) -> Result<Self> {
        let path = path.as_ref();
        info!("opening {} ({:?})", path.display(), mode);
        match mode {
            OpenMode::ReadWrite => Self::load_from(ImageFile::open(path)?),
            OpenMode::Create => Ok(Self::with_store(ImageFile::create(path)?)),
        }
    }
}

impl<S: BackingStore> Zxfs<S> {
    /// Wraps `store` with empty tables, without reading it.
    pub fn with_store(store: S) -> Self {
        Self {
            store,
            fat: AllocationTable::new(),
            directory: Directory::new(),
        }
    }

    /// Wraps `store` and decodes its metadata.
    pub fn load_from(store: S) -> Result<Self> {
        let mut fs = Self::with_store(store);
        fs.load()?;
        Ok(fs)
    }

    /// Replaces the in-memory tables with the ones stored in the image.
    pub fn load(&mut self) -> Result<()> {
        let (fat, directory) = load_metadata(&mut self.store)?;
        self.fat = fat;
        self.directory = directory;
        Ok(())
    }

    /// Writes the in-memory tables to the image's metadata region.
    pub fn persist(&mut self) -> Result<()> {
        persist_metadata(&mut self.store, &self.fat, &self.directory)?;
        info!(
            "persisted {} files, {} free blocks",
            self.directory.len(),
            self.fat.free_count()
        );
        Ok(())
    }

    /// Creates `name`, or replaces its contents if it already exists.
    ///
    /// Data blocks are written before the directory is touched, and an
    /// existing file's old blocks are released only after the new ones are
    /// in place. Any error leaves both tables as they were.
    pub fn write(&mut self, name: &str, data: &[u8]) -> Result<()> {
        validate_name(name)?;
        if data.len() > MAX_FILE_SIZE {
            return Err(ZxfsError::FileTooLarge { size: data.len() });
        }
        let existing = self.directory.position(name);
        if existing.is_none() && self.directory.is_full() {
            return Err(ZxfsError::DirectoryFull);
        }

        let blocks = self.fat.allocate_blocks(data.len().div_ceil(BLOCK_SIZE))?;
        if let Err(e) = self.write_blocks(&blocks, data) {
            self.fat.release(&blocks);
            return Err(e);
        }

        let size = data.len() as u32;
        match existing {
            Some(index) => {
                let old = self.directory.replace_contents(index, size, blocks);
                debug!("{}: releasing previous blocks {:?}", name, old);
                self.fat.release(&old);
            }
            None => self.directory.push(FileEntry {
                name: name.to_string(),
                size,
                blocks,
            })?,
        }
        Ok(())
    }

    fn write_blocks(&mut self, blocks: &[BlockId], data: &[u8]) -> Result<()> {
        for (&block, chunk) in blocks.iter().zip(data.chunks(BLOCK_SIZE)) {
            let mut buf = [0u8; BLOCK_SIZE];
            buf[..chunk.len()].copy_from_slice(chunk);
            self.store.write_at(block_offset(block), &buf)?;
            debug!("wrote block {} ({} bytes)", block, chunk.len());
        }
        Ok(())
    }

    /// Returns the contents of `name`, or `None` if no such file exists.
    pub fn read(&mut self, name: &str) -> Result<Option<Vec<u8>>> {
        let Some(entry) = self.directory.find(name) else {
            return Ok(None);
        };
        let size = entry.size as usize;
        let blocks = entry.blocks.clone();

        let mut data = Vec::with_capacity(blocks.len() * BLOCK_SIZE);
        let mut buf = [0u8; BLOCK_SIZE];
        for block in blocks {
            self.store.read_at(block_offset(block), &mut buf)?;
            data.extend_from_slice(&buf);
        }
        data.truncate(size);
        Ok(Some(data))
    }

    /// `(name, size)` of every file, in directory order.
    pub fn list(&self) -> Vec<(String, u32)> {
        self.directory
            .iter()
            .map(|e| (e.name.clone(), e.size))
            .collect()
    }

    pub fn entry(&self, name: &str) -> Option<&FileEntry> {
        self.directory.find(name)
    }

    pub fn entries(&self) -> &[FileEntry] {
        self.directory.entries()
    }

    pub fn allocation_table(&self) -> &AllocationTable {
        &self.fat
    }

    pub fn free_blocks(&self) -> usize {
        self.fat.free_count()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Releases the handle and hands back the store. Unpersisted
    /// metadata is dropped.
    pub fn into_store(self) -> S {
        self.store
    }

    /// Flushes the store and releases the handle. Does not persist.
    pub fn close(mut self) -> Result<()> {
        self.store.flush()?;
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ZxfsError::EmptyName);
    }
    if name.len() > MAX_FILENAME_LEN {
        return Err(ZxfsError::NameTooLong { len: name.len() });
    }
    Ok(())
}
