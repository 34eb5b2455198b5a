//! Scratch buffers for staging stream data
//!
//! A [`ScratchCache`] hands out seekable temporary byte stores. A buffer is
//! released when it is dropped.

use crate::error::Result;
use std::cell::Cell;
use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::rc::Rc;

/// A seekable, readable and writable temporary byte store
pub trait RandomAccessBuffer: Read + Write + Seek {
    /// Number of bytes stored
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Source of scratch buffers
pub trait ScratchCache {
    fn create_buffer(&self) -> Result<Box<dyn RandomAccessBuffer>>;
}

/// Buffer accounting for a [`MemoryScratchCache`]
#[derive(Debug, Default)]
pub struct ScratchStats {
    live: Cell<usize>,
    peak: Cell<usize>,
    created: Cell<usize>,
}

impl ScratchStats {
    /// Buffers currently alive
    pub fn live(&self) -> usize {
        self.live.get()
    }

    /// Most buffers ever alive at once
    pub fn peak(&self) -> usize {
        self.peak.get()
    }

    /// Buffers handed out in total
    pub fn created(&self) -> usize {
        self.created.get()
    }

    fn acquire(&self) {
        let live = self.live.get() + 1;
        self.live.set(live);
        self.peak.set(self.peak.get().max(live));
        self.created.set(self.created.get() + 1);
    }

    fn release(&self) {
        self.live.set(self.live.get().saturating_sub(1));
    }
}

/// Heap-backed scratch buffers
#[derive(Debug, Default, Clone)]
pub struct MemoryScratchCache {
    stats: Rc<ScratchStats>,
    limit: Option<usize>,
}

impl MemoryScratchCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffers refuse writes that would grow them past `limit` bytes
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn stats(&self) -> Rc<ScratchStats> {
        Rc::clone(&self.stats)
    }
}

impl ScratchCache for MemoryScratchCache {
    fn create_buffer(&self) -> Result<Box<dyn RandomAccessBuffer>> {
        self.stats.acquire();
        Ok(Box::new(MemoryBuffer {
            cursor: Cursor::new(Vec::new()),
            stats: Rc::clone(&self.stats),
            limit: self.limit,
        }))
    }
}

struct MemoryBuffer {
    cursor: Cursor<Vec<u8>>,
    stats: Rc<ScratchStats>,
    limit: Option<usize>,
}

impl Read for MemoryBuffer {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.cursor.read(buf)
    }
}

impl Write for MemoryBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Some(limit) = self.limit {
            let end = usize::try_from(self.cursor.position())
                .unwrap_or(usize::MAX)
                .saturating_add(buf.len());
            if end > limit {
                return Err(io::Error::other(format!(
                    "scratch buffer limit of {} bytes exceeded",
                    limit
                )));
            }
        }
        self.cursor.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for MemoryBuffer {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.cursor.seek(pos)
    }
}

impl RandomAccessBuffer for MemoryBuffer {
    fn len(&self) -> u64 {
        self.cursor.get_ref().len() as u64
    }
}

impl Drop for MemoryBuffer {
    fn drop(&mut self) {
        self.stats.release();
    }
}

/// Scratch buffers backed by anonymous temporary files, removed by the
/// OS once closed
#[derive(Debug, Default, Clone, Copy)]
pub struct TempFileScratchCache;

impl TempFileScratchCache {
    pub fn new() -> Self {
        Self
    }
}

impl ScratchCache for TempFileScratchCache {
    fn create_buffer(&self) -> Result<Box<dyn RandomAccessBuffer>> {
        let file = tempfile::tempfile()?;
        Ok(Box::new(FileBuffer { file }))
    }
}

struct FileBuffer {
    file: File,
}

impl Read for FileBuffer {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for FileBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Seek for FileBuffer {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}

impl RandomAccessBuffer for FileBuffer {
    fn len(&self) -> u64 {
        self.file.metadata().map(|meta| meta.len()).unwrap_or(0)
    }
}
