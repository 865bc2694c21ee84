use crate::error::ChatstoreError;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    Read,
    ReadWrite,
    Append,
}

/// Single-owner wrapper around one open file descriptor.
///
/// All operations must be invoked from the logical context that opened the
/// handle; the engine guarantees this by construction, so the check is a
/// debug-only assertion rather than runtime synchronization. The descriptor
/// is released exactly once when the handle drops, whether or not the owner
/// finished cleanly.
#[derive(Debug)]
pub struct DurableFile {
    file: File,
    mode: FileMode,
    #[cfg(debug_assertions)]
    owner: std::thread::ThreadId,
}

impl DurableFile {
    pub fn open(path: &Path, mode: FileMode) -> Result<Self, ChatstoreError> {
        let mut options = OpenOptions::new();
        match mode {
            FileMode::Read => {
                options.read(true);
            }
            FileMode::ReadWrite => {
                options.read(true).write(true).create(true);
            }
            FileMode::Append => {
                options.append(true).create(true);
            }
        }
        let file = options.open(path)?;
        Ok(Self {
            file,
            mode,
            #[cfg(debug_assertions)]
            owner: std::thread::current().id(),
        })
    }

    #[inline]
    fn check_owner(&self) {
        #[cfg(debug_assertions)]
        debug_assert_eq!(
            std::thread::current().id(),
            self.owner,
            "durable file used outside its owning context"
        );
    }

    pub fn mode(&self) -> FileMode {
        self.mode
    }

    /// Writes at the current position, returning the number of bytes written.
    pub fn write(&mut self, bytes: &[u8]) -> Result<usize, ChatstoreError> {
        self.check_owner();
        Ok(self.file.write(bytes)?)
    }

    pub fn write_all(&mut self, bytes: &[u8]) -> Result<(), ChatstoreError> {
        self.check_owner();
        Ok(self.file.write_all(bytes)?)
    }

    /// Reads into `buf` at the current position, returning the bytes read.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, ChatstoreError> {
        self.check_owner();
        Ok(self.file.read(buf)?)
    }

    /// Reads exactly `count` bytes.
    ///
    /// A short read here means the caller's length bookkeeping disagrees with
    /// the file, i.e. storage corruption; that is a fatal integrity violation,
    /// not a recoverable error. Callers must pre-validate `count` against
    /// `size()`.
    pub fn read_exact(&mut self, count: usize) -> Result<Vec<u8>, ChatstoreError> {
        self.check_owner();
        let mut out = vec![0u8; count];
        match self.file.read_exact(&mut out) {
            Ok(()) => Ok(out),
            Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
                panic!("short read of {count} bytes from durable file: {err}");
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn seek(&mut self, position: u64) -> Result<(), ChatstoreError> {
        self.check_owner();
        self.file.seek(SeekFrom::Start(position))?;
        Ok(())
    }

    pub fn truncate(&mut self, length: u64) -> Result<(), ChatstoreError> {
        self.check_owner();
        self.file.set_len(length)?;
        Ok(())
    }

    pub fn size(&self) -> Option<u64> {
        self.check_owner();
        self.file.metadata().ok().map(|m| m.len())
    }

    /// Flushes file content to durable storage.
    pub fn sync(&self) -> Result<(), ChatstoreError> {
        self.check_owner();
        self.file.sync_all()?;
        Ok(())
    }
}
