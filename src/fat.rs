//! The allocation table: one entry per block, chaining each file's blocks.

use log::debug;

use crate::error::{Result, ZxfsError};
use crate::fs_layout::{BlockId, FatEntry, TOTAL_BLOCKS};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationTable {
    entries: Vec<FatEntry>,
}

impl Default for AllocationTable {
    fn default() -> Self {
        Self::new()
    }
}

impl AllocationTable {
    /// A table with every block free.
    pub fn new() -> Self {
        Self {
            entries: vec![FatEntry::Free; TOTAL_BLOCKS],
        }
    }

    pub(crate) fn from_entries(mut entries: Vec<FatEntry>) -> Self {
        entries.resize(TOTAL_BLOCKS, FatEntry::Free);
        Self { entries }
    }

    pub fn entries(&self) -> &[FatEntry] {
        &self.entries
    }

    pub fn entry(&self, block: BlockId) -> Option<FatEntry> {
        self.entries.get(block as usize).copied()
    }

    /// Lowest free block, starting from 1. Block 0 is never handed out:
    /// a zero index in a directory record means "no block".
    pub fn find_free_block(&self) -> Option<BlockId> {
        self.entries
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, e)| **e == FatEntry::Free)
            .map(|(i, _)| i as BlockId)
    }

    /// Number of blocks that `allocate_blocks` could still hand out.
    pub fn free_count(&self) -> usize {
        self.entries
            .iter()
            .skip(1)
            .filter(|e| **e == FatEntry::Free)
            .count()
    }

    /// Allocates `count` blocks and links them into one chain, in
    /// ascending discovery order. On `NoSpace` the table is unchanged.
    pub fn allocate_blocks(&mut self, count: usize) -> Result<Vec<BlockId>> {
        if self.free_count() < count {
            return Err(ZxfsError::NoSpace);
        }

        let mut blocks = Vec::with_capacity(count);
        for _ in 0..count {
            let block = self.find_free_block().ok_or(ZxfsError::NoSpace)?;
            self.entries[block as usize] = FatEntry::EndOfChain;
            blocks.push(block);
        }
        for pair in blocks.windows(2) {
            self.entries[pair[0] as usize] = FatEntry::Next(pair[1]);
        }

        debug!("allocated blocks {:?}", blocks);
        Ok(blocks)
    }

    /// Marks every listed block free. Out of range ids are ignored.
    pub fn release(&mut self, blocks: &[BlockId]) {
        for &block in blocks {
            if let Some(e) = self.entries.get_mut(block as usize) {
                *e = FatEntry::Free;
            }
        }
    }

    /// Follows `Next` links from `head`. Stops at the end-of-chain marker,
    /// at a free or out of range block, or after visiting every block once.
    pub fn chain(&self, head: BlockId) -> Vec<BlockId> {
        let mut out = Vec::new();
        let mut cur = head;
        while out.len() < TOTAL_BLOCKS {
            match self.entry(cur) {
                Some(FatEntry::Next(next)) => {
                    out.push(cur);
                    cur = next;
                }
                Some(FatEntry::EndOfChain) => {
                    out.push(cur);
                    break;
                }
                Some(FatEntry::Free) | None => break,
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_table_skips_block_zero() {
        let fat = AllocationTable::new();
        assert_eq!(fat.find_free_block(), Some(1));
        assert_eq!(fat.free_count(), TOTAL_BLOCKS - 1);
    }

    #[test]
    fn allocation_links_chain() {
        let mut fat = AllocationTable::new();
        let blocks = fat.allocate_blocks(3).unwrap();
        assert_eq!(blocks, vec![1, 2, 3]);
        assert_eq!(fat.entry(1), Some(FatEntry::Next(2)));
        assert_eq!(fat.entry(2), Some(FatEntry::Next(3)));
        assert_eq!(fat.entry(3), Some(FatEntry::EndOfChain));
        assert_eq!(fat.chain(1), blocks);
    }

    #[test]
    fn allocation_fills_holes_first() {
        let mut fat = AllocationTable::new();
        let a = fat.allocate_blocks(2).unwrap();
        let _b = fat.allocate_blocks(2).unwrap();
        fat.release(&a);

        let c = fat.allocate_blocks(3).unwrap();
        assert_eq!(c, vec![1, 2, 5]);
        assert_eq!(fat.chain(1), c);
    }

    #[test]
    fn zero_blocks_is_empty_chain() {
        let mut fat = AllocationTable::new();
        assert!(fat.allocate_blocks(0).unwrap().is_empty());
        assert_eq!(fat.free_count(), TOTAL_BLOCKS - 1);
    }

    #[test]
    fn exhaustion_leaves_table_untouched() {
        let mut fat = AllocationTable::new();
        fat.allocate_blocks(TOTAL_BLOCKS - 10).unwrap();
        let before = fat.clone();

        assert!(matches!(fat.allocate_blocks(10), Err(ZxfsError::NoSpace)));
        assert_eq!(fat, before);

        fat.allocate_blocks(9).unwrap();
        assert_eq!(fat.find_free_block(), None);
    }

    #[test]
    fn chain_walk_is_bounded_on_cycles() {
        let mut entries = vec![FatEntry::Free; TOTAL_BLOCKS];
        entries[1] = FatEntry::Next(2);
        entries[2] = FatEntry::Next(1);
        let fat = AllocationTable::from_entries(entries);
        assert_eq!(fat.chain(1).len(), TOTAL_BLOCKS);
    }
}
