use crate::error::{Result, ZxfsError};
use crate::fs_layout::{BlockId, DIR_ENTRIES};

/// One file in the directory table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    /// Logical length in bytes; the last block is zero-padded past it.
    pub size: u32,
    /// Block chain, head first.
    pub blocks: Vec<BlockId>,
}

/// Flat, insertion-ordered table of at most `DIR_ENTRIES` files.
/// Lookups are linear; the table never holds more than 64 entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directory {
    entries: Vec<FileEntry>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= DIR_ENTRIES
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileEntry> {
        self.entries.iter()
    }

    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }

    pub fn find(&self, name: &str) -> Option<&FileEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Swaps in a new size and block chain for the entry at `index`,
    /// returning the chain it replaced.
    pub fn replace_contents(&mut self, index: usize, size: u32, blocks: Vec<BlockId>) -> Vec<BlockId> {
        let entry = &mut self.entries[index];
        entry.size = size;
        std::mem::replace(&mut entry.blocks, blocks)
    }

    /// Appends `entry` at the end of the table.
    pub fn push(&mut self, entry: FileEntry) -> Result<()> {
        if self.is_full() {
            return Err(ZxfsError::DirectoryFull);
        }
        self.entries.push(entry);
        Ok(())
    }
}
