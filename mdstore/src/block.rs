//! Positioned block I/O over the underlying file.
//!
//! Reads and writes are addressed by absolute byte offset rather than
//! through a shared cursor, so multiple chains can be walked concurrently
//! without serializing on a `Seek`. On Unix this maps directly onto
//! `pread`/`pwrite` via [`FileExt`](std::os::unix::fs::FileExt); elsewhere
//! we fall back to a mutex-guarded seek-then-read/write.

use std::fs::{File, OpenOptions};
use std::path::Path;

use crate::error::{Result, StoreError};

#[cfg(unix)]
use std::os::unix::fs::FileExt;

#[cfg(not(unix))]
use std::io::{Read, Seek, SeekFrom, Write};
#[cfg(not(unix))]
use std::sync::Mutex;

/// A file opened for positioned, potentially concurrent block access.
pub struct BlockIo {
    #[cfg(unix)]
    file: File,
    #[cfg(not(unix))]
    file: Mutex<File>,
}

impl BlockIo {
    pub fn open(path: &Path, writable: bool) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(writable)
            .create(writable)
            .open(path)?;
        Ok(Self::from_file(file))
    }

    #[cfg(unix)]
    fn from_file(file: File) -> Self {
        BlockIo { file }
    }

    #[cfg(not(unix))]
    fn from_file(file: File) -> Self {
        BlockIo {
            file: Mutex::new(file),
        }
    }

    pub fn file_size(&self) -> Result<u64> {
        #[cfg(unix)]
        {
            Ok(self.file.metadata()?.len())
        }
        #[cfg(not(unix))]
        {
            let file = self.file.lock().expect("block io mutex poisoned");
            Ok(file.metadata()?.len())
        }
    }

    /// Read exactly `len` bytes starting at `offset`. Reading past the end
    /// of the file is a hard error, never a short read.
    pub fn read_at(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        let file_size = self.file_size()?;
        if offset.saturating_add(len as u64) > file_size {
            return Err(StoreError::ReadPastEof {
                offset,
                len: len as u64,
                file_size,
            });
        }

        let mut buf = vec![0u8; len];
        #[cfg(unix)]
        {
            self.file
                .read_exact_at(&mut buf, offset)
                .map_err(|source| StoreError::IoAtOffset {
                    offset,
                    context: "read",
                    source,
                })?;
        }
        #[cfg(not(unix))]
        {
            let mut file = self.file.lock().expect("block io mutex poisoned");
            (|| -> std::io::Result<()> {
                file.seek(SeekFrom::Start(offset))?;
                file.read_exact(&mut buf)
            })()
            .map_err(|source| StoreError::IoAtOffset {
                offset,
                context: "read",
                source,
            })?;
        }
        Ok(buf)
    }

    pub fn write_at(&self, offset: u64, data: &[u8]) -> Result<()> {
        #[cfg(unix)]
        {
            self.file
                .write_all_at(data, offset)
                .map_err(|source| StoreError::IoAtOffset {
                    offset,
                    context: "write",
                    source,
                })?;
        }
        #[cfg(not(unix))]
        {
            let mut file = self.file.lock().expect("block io mutex poisoned");
            (|| -> std::io::Result<()> {
                file.seek(SeekFrom::Start(offset))?;
                file.write_all(data)
            })()
            .map_err(|source| StoreError::IoAtOffset {
                offset,
                context: "write",
                source,
            })?;
        }
        Ok(())
    }
}
