//! Byte-addressed persistent storage holding fixed-size entity records.

use crate::error::StorageError;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

pub trait RecordStore {
    fn capacity(&self) -> usize;
    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError>;
    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StorageError>;

    fn check_bounds(&self, offset: usize, len: usize) -> Result<(), StorageError> {
        let capacity = self.capacity();
        match offset.checked_add(len) {
            Some(end) if end <= capacity => Ok(()),
            _ => Err(StorageError::OutOfBounds {
                offset,
                len,
                capacity,
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MemoryStore {
    bytes: Vec<u8>,
}

impl MemoryStore {
    pub fn new(capacity: usize) -> Self {
        MemoryStore {
            bytes: vec![0; capacity],
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl RecordStore for MemoryStore {
    fn capacity(&self) -> usize {
        self.bytes.len()
    }

    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError> {
        self.check_bounds(offset, buf.len())?;
        buf.copy_from_slice(&self.bytes[offset..offset + buf.len()]);
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StorageError> {
        self.check_bounds(offset, data.len())?;
        self.bytes[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }
}

/// File-backed store. Writes go straight through to the file; reads are
/// served from an in-memory image loaded at open.
#[derive(Debug)]
pub struct FileStore {
    file: File,
    image: Vec<u8>,
    fresh: bool,
}

impl FileStore {
    /// Opens or creates `path` and sizes it to exactly `capacity` bytes,
    /// zero-filling any growth.
    pub fn open(path: &Path, capacity: usize) -> Result<Self, StorageError> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        let mut image = Vec::with_capacity(capacity);
        file.read_to_end(&mut image)?;
        let fresh = image.len() != capacity;
        if image.len() < capacity {
            image.resize(capacity, 0);
            file.seek(SeekFrom::Start(0))?;
            file.write_all(&image)?;
            file.flush()?;
        } else if image.len() > capacity {
            image.truncate(capacity);
            file.set_len(capacity as u64)?;
        }
        Ok(FileStore { file, image, fresh })
    }

    /// The file was created or resized by `open`, so its contents are not
    /// a table of the requested size and must be provisioned.
    pub fn is_fresh(&self) -> bool {
        self.fresh
    }
}

impl RecordStore for FileStore {
    fn capacity(&self) -> usize {
        self.image.len()
    }

    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError> {
        self.check_bounds(offset, buf.len())?;
        buf.copy_from_slice(&self.image[offset..offset + buf.len()]);
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StorageError> {
        self.check_bounds(offset, data.len())?;
        self.file.seek(SeekFrom::Start(offset as u64))?;
        self.file.write_all(data)?;
        self.file.flush()?;
        self.image[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }
}

/// Store double that refuses one chosen write.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::io;

    pub struct FailingStore {
        pub inner: MemoryStore,
        writes: usize,
        fail_at: Option<usize>,
    }

    impl FailingStore {
        pub fn new(inner: MemoryStore) -> Self {
            FailingStore {
                inner,
                writes: 0,
                fail_at: None,
            }
        }

        /// Refuse the write `n` writes from now (0 is the next one).
        pub fn fail_write(&mut self, n: usize) {
            self.fail_at = Some(self.writes + n);
        }
    }

    impl RecordStore for FailingStore {
        fn capacity(&self) -> usize {
            self.inner.capacity()
        }

        fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError> {
            self.inner.read(offset, buf)
        }

        fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StorageError> {
            let this = self.writes;
            self.writes += 1;
            if self.fail_at == Some(this) {
                return Err(io::Error::new(io::ErrorKind::Other, "write refused").into());
            }
            self.inner.write(offset, data)
        }
    }
}
