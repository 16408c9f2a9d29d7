//! Backing stores for ZXFS images.
//!
//! The engine only needs positioned reads and writes over a flat byte
//! range. [`ImageFile`] serves them from a host file, [`MemImage`] from a
//! byte vector held in memory.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

pub trait BackingStore {
    /// Fills `buf` with the bytes starting at `offset`.
    /// Fails with `UnexpectedEof` if the store ends before `buf` is full.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()>;

    /// Writes `data` at `offset`, growing the store if needed.
    fn write_at(&mut self, offset: u64, data: &[u8]) -> io::Result<()>;

    /// Pushes buffered writes down to the underlying medium.
    fn flush(&mut self) -> io::Result<()>;
}

/// A ZXFS image stored in a host file.
#[derive(Debug)]
pub struct ImageFile {
    file: File,
    path: PathBuf,
}

impl ImageFile {
    /// Opens an existing image for reading and writing.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        Ok(Self { file, path })
    }

    /// Creates the image, truncating any existing file at `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(true)
            .open(&path)?;
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current length of the image file in bytes.
    pub fn len(&self) -> io::Result<u64> {
        Ok(self.file.metadata()?.len())
    }
}

impl BackingStore for ImageFile {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(buf)
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(data)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()?;
        self.file.sync_data()
    }
}

/// A ZXFS image held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemImage {
    bytes: Vec<u8>,
}

impl MemImage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl BackingStore for MemImage {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let start = usize::try_from(offset)
            .map_err(|_| io::Error::from(io::ErrorKind::UnexpectedEof))?;
        let src = start
            .checked_add(buf.len())
            .and_then(|end| self.bytes.get(start..end))
            .ok_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof))?;
        buf.copy_from_slice(src);
        Ok(())
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> io::Result<()> {
        let start = usize::try_from(offset)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let end = start
            .checked_add(data.len())
            .ok_or_else(|| io::Error::from(io::ErrorKind::InvalidInput))?;
        if self.bytes.len() < end {
            self.bytes.resize(end, 0);
        }
        self.bytes[start..end].copy_from_slice(data);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mem_image_grows_on_write() {
        let mut img = MemImage::new();
        img.write_at(10, b"abc").unwrap();
        assert_eq!(img.as_bytes().len(), 13);
        assert_eq!(&img.as_bytes()[..10], &[0u8; 10]);

        let mut buf = [0u8; 3];
        img.read_at(10, &mut buf).unwrap();
        assert_eq!(&buf, b"abc");
    }

    #[test]
    fn mem_image_short_read_is_eof() {
        let mut img = MemImage::from_bytes(vec![1, 2, 3]);
        let mut buf = [0u8; 4];
        let err = img.read_at(0, &mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn mem_image_rejects_offset_overflow() {
        let mut img = MemImage::new();
        let err = img.write_at(u64::MAX, b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(img.as_bytes().is_empty());
    }

    #[test]
    fn image_file_round_trips_ranges() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.img");
        let mut img = ImageFile::create(&path).unwrap();
        assert_eq!(img.path(), path.as_path());
        img.write_at(600, b"hello").unwrap();
        assert_eq!(img.len().unwrap(), 605);

        let mut buf = [0u8; 5];
        img.read_at(600, &mut buf).unwrap();
        assert_eq!(&buf, b"hello");

        let mut past = [0u8; 8];
        assert!(img.read_at(600, &mut past).is_err());
    }
}
