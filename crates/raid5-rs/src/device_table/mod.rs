//! The device table: N back-end slots, each `Present`, `Missing`, or the one
//! `PresentRebuildTarget`, fixed at startup per §4.2/§4.8.

mod backend;
#[cfg(test)]
mod device_table_tests;

use anyhow::{Result, bail};
use backend::Backend;

use crate::error::RaidError;

const MIN_DEVICES: usize = 3;
const MAX_DEVICES: usize = 16;

/// One parsed startup specifier: `MISSING`, a bare path, or a `+`-prefixed
/// rebuild-target path.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DeviceSpec {
    Missing,
    Present(String),
    RebuildTarget(String),
}

impl DeviceSpec {
    /// Parses one positional device argument per §4.2.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        if raw == "MISSING" {
            Self::Missing
        } else if let Some(path) = raw.strip_prefix('+') {
            Self::RebuildTarget(path.to_string())
        } else {
            Self::Present(raw.to_string())
        }
    }
}

struct Slot {
    backend: Option<Backend>,
    missing: bool,
    rebuild_target: bool,
}

/// The N-slot back-end array plus derived geometry (`min_blocks`, `S`, `K`).
pub struct DeviceTable {
    slots: Vec<Slot>,
    block_size: u64,
    min_blocks: u64,
}

impl DeviceTable {
    /// Opens every non-missing slot and validates the startup contract from §4.2.
    ///
    /// # Errors
    /// Returns an error identifying the offending slot/path on any open
    /// failure, or a `RaidError::Config` on a startup validation failure
    /// (device count out of range, more than one rebuild target, a slot
    /// marked both missing and rebuild target, or every slot missing).
    pub fn open(specs: &[DeviceSpec], block_size: u64) -> Result<Self> {
        let n = specs.len();
        if !(MIN_DEVICES..=MAX_DEVICES).contains(&n) {
            bail!(RaidError::Config(format!(
                "device count must be between {MIN_DEVICES} and {MAX_DEVICES}, got {n}"
            )));
        }
        if block_size == 0 {
            bail!(RaidError::Config("block size must be positive".to_string()));
        }

        let rebuild_targets = specs
            .iter()
            .filter(|s| matches!(s, DeviceSpec::RebuildTarget(_)))
            .count();
        if rebuild_targets > 1 {
            bail!(RaidError::Config(
                "at most one device may be prefixed with '+'".to_string()
            ));
        }

        let mut slots = Vec::with_capacity(n);
        for (i, spec) in specs.iter().enumerate() {
            let slot = match spec {
                DeviceSpec::Missing => Slot {
                    backend: None,
                    missing: true,
                    rebuild_target: false,
                },
                DeviceSpec::Present(path) => {
                    let backend = Backend::open(path)
                        .map_err(|_| RaidError::BackendOpen {
                            slot: i,
                            path: path.clone(),
                        })?;
                    Slot {
                        backend: Some(backend),
                        missing: false,
                        rebuild_target: false,
                    }
                }
                DeviceSpec::RebuildTarget(path) => {
                    let backend = Backend::open(path)
                        .map_err(|_| RaidError::BackendOpen {
                            slot: i,
                            path: path.clone(),
                        })?;
                    Slot {
                        backend: Some(backend),
                        missing: false,
                        rebuild_target: true,
                    }
                }
            };
            slots.push(slot);
        }

        if slots.iter().all(|s| s.missing) {
            bail!(RaidError::Config("every device is MISSING".to_string()));
        }

        let min_blocks = slots
            .iter()
            .filter(|s| !s.missing)
            .map(|s| s.backend.as_ref().expect("present slot has a backend").len() / block_size)
            .min()
            .expect("at least one non-missing slot validated above");

        Ok(Self {
            slots,
            block_size,
            min_blocks,
        })
    }

    #[must_use]
    pub fn n(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub const fn block_size(&self) -> u64 {
        self.block_size
    }

    #[must_use]
    pub const fn min_blocks(&self) -> u64 {
        self.min_blocks
    }

    /// `K`, the stripe count (identical to `min_blocks`).
    #[must_use]
    pub const fn stripe_count(&self) -> u64 {
        self.min_blocks
    }

    /// `S`, the virtual device size in bytes: `(N-1) * min_blocks * B`.
    #[must_use]
    pub fn virtual_size(&self) -> u64 {
        (self.n() as u64 - 1) * self.min_blocks * self.block_size
    }

    #[must_use]
    pub fn is_missing(&self, i: usize) -> bool {
        self.slots[i].missing
    }

    #[must_use]
    pub fn rebuild_target(&self) -> Option<usize> {
        self.slots.iter().position(|s| s.rebuild_target)
    }

    /// Reads exactly `buf.len()` bytes from slot `i` at `phys_off`.
    ///
    /// # Errors
    /// Returns a `RaidError::BackendIo` if the read comes up short.
    ///
    /// # Panics
    /// Panics if slot `i` is missing — callers must check [`Self::is_missing`] first.
    pub fn read_block(&self, i: usize, phys_off: u64, buf: &mut [u8]) -> Result<()> {
        let slot = &self.slots[i];
        assert!(!slot.missing, "read_block on missing slot {i}");
        let backend = slot.backend.as_ref().expect("present slot has a backend");
        if backend.read_block(phys_off, buf) != buf.len() {
            bail!(RaidError::BackendIo {
                slot: i,
                path: backend.path().display().to_string(),
                phys_off
            });
        }
        Ok(())
    }

    /// Writes exactly `data.len()` bytes to slot `i` at `phys_off`.
    ///
    /// # Errors
    /// Returns a `RaidError::BackendIo` if the write comes up short.
    ///
    /// # Panics
    /// Panics if slot `i` is missing — callers must check [`Self::is_missing`] first.
    pub fn write_block(&mut self, i: usize, phys_off: u64, data: &[u8]) -> Result<()> {
        let slot = &mut self.slots[i];
        assert!(!slot.missing, "write_block on missing slot {i}");
        let backend = slot.backend.as_mut().expect("present slot has a backend");
        if backend.write_block(phys_off, data) != data.len() {
            bail!(RaidError::BackendIo {
                slot: i,
                path: backend.path().display().to_string(),
                phys_off
            });
        }
        Ok(())
    }

    /// Flushes every present back-end. Per-slot failures are logged and
    /// skipped; if any slot failed, an aggregate error is returned after all
    /// slots have been attempted (§7.1).
    pub fn flush_all(&self) -> Result<()> {
        let mut failed = Vec::new();
        for (i, slot) in self.slots.iter().enumerate() {
            let Some(backend) = slot.backend.as_ref() else {
                continue;
            };
            if let Err(err) = backend.flush() {
                tracing::warn!(
                    slot = i,
                    path = %backend.path().display(),
                    error = %err,
                    "flush failed for back-end"
                );
                failed.push(i);
            }
        }
        if failed.is_empty() {
            Ok(())
        } else {
            bail!("flush failed for slots {failed:?}");
        }
    }
}
