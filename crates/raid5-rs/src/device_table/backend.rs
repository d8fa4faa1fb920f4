//! A single back-end block device: a memory-mapped file offering positional
//! block read/write. Grounded on the teacher's `retention::disk::Disk`, minus
//! the hot-swap (`fail`/`replace`) machinery — slot state in this design is
//! fixed at startup (see [`super::DeviceTable`]).

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use memmap2::{MmapMut, MmapOptions};

pub struct Backend {
    path: PathBuf,
    #[allow(dead_code)]
    file: File,
    map: Option<MmapMut>,
    len: u64,
}

impl Backend {
    /// Opens an existing back-end file read-write and maps its full length.
    /// The caller determines the block count from `len() / block_size`.
    pub fn open(path: &str) -> Result<Self> {
        let path = PathBuf::from(path);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .with_context(|| format!("opening back-end {}", path.display()))?;
        let len = file
            .metadata()
            .with_context(|| format!("stat back-end {}", path.display()))?
            .len();
        let map_len = usize::try_from(len)
            .with_context(|| format!("back-end {} too large to map", path.display()))?;
        let map = if map_len == 0 {
            None
        } else {
            Some(unsafe { MmapOptions::new().len(map_len).map_mut(&file)? })
        };

        Ok(Self {
            path,
            file,
            map,
            len,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub const fn len(&self) -> u64 {
        self.len
    }

    /// Copies exactly `buf.len()` bytes from `off` into `buf`. Returns the
    /// number of bytes actually copied — short of `buf.len()` means `off` ran
    /// past the end of the file, which the caller reports as a back-end I/O
    /// error.
    pub fn read_block(&self, off: u64, buf: &mut [u8]) -> usize {
        let Some(map) = self.map.as_ref() else {
            return 0;
        };
        let Ok(off) = usize::try_from(off) else {
            return 0;
        };
        if off >= map.len() {
            return 0;
        }
        let end = off.saturating_add(buf.len()).min(map.len());
        let n = end - off;
        buf[..n].copy_from_slice(&map[off..end]);
        n
    }

    /// Copies exactly `data.len()` bytes from `data` into the mapping at `off`.
    /// Returns the number of bytes actually written, short of `data.len()` on
    /// an out-of-range offset.
    pub fn write_block(&mut self, off: u64, data: &[u8]) -> usize {
        let Some(map) = self.map.as_mut() else {
            return 0;
        };
        let Ok(off) = usize::try_from(off) else {
            return 0;
        };
        if off >= map.len() {
            return 0;
        }
        let end = off.saturating_add(data.len()).min(map.len());
        let n = end - off;
        map[off..end].copy_from_slice(&data[..n]);
        n
    }

    pub fn flush(&self) -> Result<()> {
        let Some(map) = self.map.as_ref() else {
            return Ok(());
        };
        map.flush()
            .with_context(|| format!("fsync back-end {}", self.path.display()))
    }
}
