//! On-disk layout of a ZXFS image.
//!
//! ```text
//! offset 0      magic "ZXFS"                      4 bytes
//! offset 4      allocation table, 1024 x u16      2048 bytes
//! offset 2052   directory table, 64 x record      6464 bytes
//! offset 8516   data region, 1024 x block         512 bytes each
//! ```
//!
//! All integers are little-endian. A directory record is
//! `name_len: u8, name: [u8; 32], size: u32, blocks: [u32; 16]`,
//! where a zero block index marks an unused slot.

use std::io::{self, Cursor, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::{debug, info, warn};

use crate::directory::{Directory, FileEntry};
use crate::error::{Result, ZxfsError};
use crate::fat::AllocationTable;
use crate::storage::BackingStore;

pub const MAGIC: [u8; 4] = *b"ZXFS";

pub const BLOCK_SIZE: usize = 512;
pub const TOTAL_BLOCKS: usize = 1024;
pub const MAX_FILENAME_LEN: usize = 32;
pub const DIR_ENTRIES: usize = 64;
pub const MAX_FILE_BLOCKS: usize = 16;
pub const MAX_FILE_SIZE: usize = MAX_FILE_BLOCKS * BLOCK_SIZE;

pub const FAT_FREE: u16 = 0x0000;
pub const FAT_EOC: u16 = 0xFFFF;

pub const FAT_OFFSET: u64 = MAGIC.len() as u64;
pub const FAT_SIZE: usize = TOTAL_BLOCKS * 2;
pub const DIR_OFFSET: u64 = FAT_OFFSET + FAT_SIZE as u64;
pub const DIR_RECORD_SIZE: usize = 1 + MAX_FILENAME_LEN + 4 + MAX_FILE_BLOCKS * 4;
pub const METADATA_SIZE: u64 = DIR_OFFSET + (DIR_ENTRIES * DIR_RECORD_SIZE) as u64;

/// Data blocks live past the metadata so that persisting never clobbers file bytes.
pub const DATA_REGION_START: u64 = METADATA_SIZE;
pub const IMAGE_SIZE: u64 = DATA_REGION_START + (TOTAL_BLOCKS * BLOCK_SIZE) as u64;

pub type BlockId = u32;

/// Byte offset of `block` inside the image.
pub fn block_offset(block: BlockId) -> u64 {
    DATA_REGION_START + u64::from(block) * BLOCK_SIZE as u64
}

/// State of one block in the allocation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatEntry {
    Free,
    Next(BlockId),
    EndOfChain,
}

impl FatEntry {
    pub fn from_raw(raw: u16) -> Self {
        match raw {
            FAT_FREE => FatEntry::Free,
            FAT_EOC => FatEntry::EndOfChain,
            next => FatEntry::Next(BlockId::from(next)),
        }
    }

    pub fn to_raw(self) -> u16 {
        match self {
            FatEntry::Free => FAT_FREE,
            FatEntry::EndOfChain => FAT_EOC,
            // Block ids never exceed TOTAL_BLOCKS, so they always fit.
            FatEntry::Next(next) => next as u16,
        }
    }
}

/// Decodes one fixed-size directory record.
/// Returns `None` for an empty slot: name length 0 or over the limit,
/// or name bytes that are not UTF-8.
pub fn decode_record(raw: &[u8; DIR_RECORD_SIZE]) -> io::Result<Option<FileEntry>> {
    let name_len = raw[0] as usize;
    if name_len == 0 {
        return Ok(None);
    }
    if name_len > MAX_FILENAME_LEN {
        warn!("skipping directory record with name length {}", name_len);
        return Ok(None);
    }

    let name = match std::str::from_utf8(&raw[1..1 + name_len]) {
        Ok(name) => name.to_string(),
        Err(_) => {
            warn!("skipping directory record with a non UTF-8 name");
            return Ok(None);
        }
    };

    let mut cur = Cursor::new(&raw[1 + MAX_FILENAME_LEN..]);
    let size = cur.read_u32::<LittleEndian>()?;

    let mut blocks = Vec::with_capacity(MAX_FILE_BLOCKS);
    for _ in 0..MAX_FILE_BLOCKS {
        let block = cur.read_u32::<LittleEndian>()?;
        if block != 0 {
            blocks.push(block);
        }
    }

    Ok(Some(FileEntry { name, size, blocks }))
}

/// Appends the fixed-size record for `entry` to `out`.
pub fn encode_record<W: Write>(entry: &FileEntry, out: &mut W) -> io::Result<()> {
    let name = entry.name.as_bytes();
    let name = &name[..name.len().min(MAX_FILENAME_LEN)];
    let mut name_field = [0u8; MAX_FILENAME_LEN];
    name_field[..name.len()].copy_from_slice(name);

    out.write_u8(name.len() as u8)?;
    out.write_all(&name_field)?;
    out.write_u32::<LittleEndian>(entry.size)?;
    for slot in 0..MAX_FILE_BLOCKS {
        out.write_u32::<LittleEndian>(entry.blocks.get(slot).copied().unwrap_or(0))?;
    }
    Ok(())
}

/// Reads the metadata region of `store` into fresh tables.
pub fn load_metadata<S: BackingStore>(store: &mut S) -> Result<(AllocationTable, Directory)> {
    let mut magic = [0u8; 4];
    match store.read_at(0, &mut magic) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Err(ZxfsError::InvalidImage),
        Err(e) => return Err(e.into()),
    }
    if magic != MAGIC {
        return Err(ZxfsError::InvalidImage);
    }

    let mut raw_fat = vec![0u8; FAT_SIZE];
    store.read_at(FAT_OFFSET, &mut raw_fat)?;
    let mut cur = Cursor::new(raw_fat);
    let mut entries = Vec::with_capacity(TOTAL_BLOCKS);
    for _ in 0..TOTAL_BLOCKS {
        entries.push(FatEntry::from_raw(cur.read_u16::<LittleEndian>()?));
    }
    let fat = AllocationTable::from_entries(entries);

    let mut directory = Directory::new();
    let mut raw = [0u8; DIR_RECORD_SIZE];
    for slot in 0..DIR_ENTRIES {
        let offset = DIR_OFFSET + (slot * DIR_RECORD_SIZE) as u64;
        match store.read_at(offset, &mut raw) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                warn!("directory table truncated at record {}", slot);
                break;
            }
            Err(e) => return Err(e.into()),
        }
        if let Some(entry) = decode_record(&raw)? {
            directory.push(entry)?;
        }
    }

    info!(
        "loaded metadata: {} files, {} free blocks",
        directory.len(),
        fat.free_count()
    );
    Ok((fat, directory))
}

/// Writes the tables over the metadata region of `store`.
/// Data blocks are left untouched.
pub fn persist_metadata<S: BackingStore>(
    store: &mut S,
    fat: &AllocationTable,
    directory: &Directory,
) -> Result<()> {
    let mut buf = Vec::with_capacity(METADATA_SIZE as usize);
    buf.extend_from_slice(&MAGIC);
    for entry in fat.entries() {
        buf.write_u16::<LittleEndian>(entry.to_raw())?;
    }
    for entry in directory.iter() {
        encode_record(entry, &mut buf)?;
    }
    // unused slots stay zero so every record keeps its fixed position
    buf.resize(METADATA_SIZE as usize, 0);

    store.write_at(0, &buf)?;
    store.flush()?;
    debug!("persisted {} bytes of metadata", buf.len());
    Ok(())
}
