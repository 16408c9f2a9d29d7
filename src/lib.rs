//! ZXFS library
//!
//! A flat file store packed into a single fixed-size image: a FAT-style
//! allocation table plus a bounded directory table. Shared by the `zxfs`
//! and `zxfs_info` binaries.

pub mod config;
pub mod directory;
pub mod error;
pub mod fat;
pub mod fs;
pub mod fs_layout;
pub mod logger;
pub mod storage;

pub use directory::{Directory, FileEntry};
pub use error::{Result, ZxfsError};
pub use fat::AllocationTable;
pub use fs::{OpenMode, Zxfs};
pub use fs_layout::{BlockId, FatEntry};
pub use storage::{BackingStore, ImageFile, MemImage};
