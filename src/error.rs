use std::io;

use crate::fs_layout::{MAX_FILENAME_LEN, MAX_FILE_SIZE};

/// Errors returned by ZXFS operations.
#[derive(Debug, thiserror::Error)]
pub enum ZxfsError {
    /// The backing store failed a positioned read or write.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Missing or wrong magic tag at offset 0.
    #[error("not a ZXFS image")]
    InvalidImage,

    #[error("file name is {len} bytes, limit is {}", MAX_FILENAME_LEN)]
    NameTooLong { len: usize },

    #[error("file name is empty")]
    EmptyName,

    #[error("file is {size} bytes, limit is {}", MAX_FILE_SIZE)]
    FileTooLarge { size: usize },

    /// The allocation table has fewer free blocks than requested.
    #[error("no space left in allocation table")]
    NoSpace,

    #[error("directory table is full")]
    DirectoryFull,

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ZxfsError>;
