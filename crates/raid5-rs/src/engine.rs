//! The per-request read/write state machine: degraded-mode parity
//! substitution on read, full-stripe fast path and read-modify-write slow
//! path on write (§4.4, §4.5).


use anyhow::{Result, bail};

use crate::device_table::DeviceTable;
use crate::error::RaidError;
use crate::geometry::{is_full_stripe_boundary, logical_to_placement, stripe_span_bytes};
use crate::xor::xor_into;

/// Owns the device table and drives reads/writes against the virtual device.
/// This is the "global engine state" described in §9: callbacks close over
/// one `Engine` value.
pub struct Engine {
    table: DeviceTable,
    verbose: bool,
}

impl Engine {
    #[must_use]
    pub const fn new(table: DeviceTable, verbose: bool) -> Self {
        Self { table, verbose }
    }

    /// `S`: the virtual device size in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.table.virtual_size()
    }

    fn n(&self) -> usize {
        self.table.n()
    }

    fn block_size(&self) -> u64 {
        self.table.block_size()
    }

    fn require_aligned(&self, offset: u64, len: u64) -> Result<()> {
        let b = self.block_size();
        if !offset.is_multiple_of(b) || !len.is_multiple_of(b) {
            bail!(RaidError::Config(format!(
                "offset {offset} / len {len} not aligned to block size {b}"
            )));
        }
        Ok(())
    }

    /// Reads `buf.len()` bytes from the virtual device starting at `offset`.
    /// Both must be multiples of the block size.
    ///
    /// # Errors
    /// Fails the whole request on any back-end I/O error, or if a block maps
    /// to a stripe with two unavailable slots (§4.4).
    pub fn read(&self, buf: &mut [u8], offset: u64) -> Result<()> {
        let b = self.block_size();
        self.require_aligned(offset, buf.len() as u64)?;

        for (i, chunk) in buf.chunks_mut(b as usize).enumerate() {
            let logical_offset = offset + i as u64 * b;
            let l = logical_offset / b;
            let placement = logical_to_placement(self.n(), b, l);

            if self.verbose {
                tracing::debug!(
                    stripe = placement.stripe,
                    data = placement.data,
                    parity = placement.parity,
                    "read block"
                );
            }

            if !self.table.is_missing(placement.data) {
                self.table
                    .read_block(placement.data, placement.phys_off, chunk)?;
                continue;
            }

            // Degraded read: reconstruct from parity and peers.
            if self.table.is_missing(placement.parity) {
                bail!(RaidError::DegradedUnrecoverable {
                    stripe: placement.stripe
                });
            }

            let mut acc = vec![0u8; b as usize];
            self.table
                .read_block(placement.parity, placement.phys_off, &mut acc)?;

            for slot in 0..self.n() {
                if slot == placement.parity || slot == placement.data {
                    continue;
                }
                if self.table.is_missing(slot) {
                    bail!(RaidError::DegradedUnrecoverable {
                        stripe: placement.stripe
                    });
                }
                let mut peer = vec![0u8; b as usize];
                self.table.read_block(slot, placement.phys_off, &mut peer)?;
                xor_into(&mut acc, &peer);
            }

            chunk.copy_from_slice(&acc);
        }

        Ok(())
    }

    /// Writes `data` to the virtual device starting at `offset`. Both must be
    /// multiples of the block size. Internally splits the request into
    /// full-stripe fast-path groups and single-block read-modify-write groups
    /// (§4.5).
    ///
    /// # Errors
    /// Fails the whole request if the parity slot is missing and would need
    /// to be written, or on any back-end I/O error.
    pub fn write(&mut self, mut data: &[u8], mut offset: u64) -> Result<()> {
        let b = self.block_size();
        self.require_aligned(offset, data.len() as u64)?;

        while !data.is_empty() {
            let span = stripe_span_bytes(self.n(), b);
            if is_full_stripe_boundary(self.n(), b, offset, data.len() as u64) {
                let (stripe_bytes, rest) = data.split_at(span as usize);
                self.write_full_stripe(offset, stripe_bytes)?;
                data = rest;
                offset += span;
            } else {
                let (block, rest) = data.split_at(b as usize);
                self.write_block_rmw(offset, block)?;
                data = rest;
                offset += b;
            }
        }

        Ok(())
    }

    fn write_full_stripe(&mut self, offset: u64, stripe_data: &[u8]) -> Result<()> {
        let b = self.block_size();
        let data_slots = self.n() - 1;
        let l0 = offset / b;
        let placement0 = logical_to_placement(self.n(), b, l0);
        let stripe = placement0.stripe;
        let phys_off = placement0.phys_off;

        let mut parity = vec![0u8; b as usize];
        for pos in 0..data_slots {
            let chunk = &stripe_data[pos * b as usize..(pos + 1) * b as usize];
            xor_into(&mut parity, chunk);
        }

        if self.verbose {
            tracing::debug!(stripe, "full-stripe write");
        }

        for pos in 0..data_slots {
            let placement = logical_to_placement(self.n(), b, stripe * data_slots as u64 + pos as u64);
            if self.table.is_missing(placement.data) {
                continue;
            }
            let chunk = &stripe_data[pos * b as usize..(pos + 1) * b as usize];
            self.table.write_block(placement.data, phys_off, chunk)?;
        }

        let parity_slot = (stripe % self.n() as u64) as usize;
        if self.table.is_missing(parity_slot) {
            bail!(RaidError::DegradedUnrecoverable { stripe });
        }
        self.table.write_block(parity_slot, phys_off, &parity)?;

        Ok(())
    }

    fn write_block_rmw(&mut self, offset: u64, new_data: &[u8]) -> Result<()> {
        let b = self.block_size();
        let l = offset / b;
        let placement = logical_to_placement(self.n(), b, l);

        if self.verbose {
            tracing::debug!(stripe = placement.stripe, data = placement.data, "rmw write");
        }

        let mut old_parity = vec![0u8; b as usize];
        if !self.table.is_missing(placement.parity) {
            self.table
                .read_block(placement.parity, placement.phys_off, &mut old_parity)?;
        }

        let mut old_data = vec![0u8; b as usize];
        if !self.table.is_missing(placement.data) {
            self.table
                .read_block(placement.data, placement.phys_off, &mut old_data)?;
        }

        let mut new_parity = old_parity;
        xor_into(&mut new_parity, &old_data);
        xor_into(&mut new_parity, new_data);

        if !self.table.is_missing(placement.data) {
            self.table
                .write_block(placement.data, placement.phys_off, new_data)?;
        }

        if self.table.is_missing(placement.parity) {
            bail!(RaidError::DegradedUnrecoverable {
                stripe: placement.stripe
            });
        }
        self.table
            .write_block(placement.parity, placement.phys_off, &new_parity)?;

        Ok(())
    }

    /// fsyncs every present back-end.
    ///
    /// # Errors
    /// Returns an error if any slot's fsync failed (best-effort per slot;
    /// see §7.1).
    pub fn flush(&self) -> Result<()> {
        self.table.flush_all()
    }

    /// Logged, best-effort teardown hook. Never fails.
    pub fn disconnect(&self) {
        tracing::info!("engine disconnecting");
    }

    #[must_use]
    pub const fn table(&self) -> &DeviceTable {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut DeviceTable {
        &mut self.table
    }
}
