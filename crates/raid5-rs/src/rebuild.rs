//! Offline rebuild: reconstructs the `rebuild_target` slot from survivors
//! before any client I/O is served (§4.6).


use anyhow::{Result, bail};

use crate::device_table::DeviceTable;
use crate::error::RaidError;
use crate::xor::xor_into;

/// Runs the rebuild scan if `table` has a `rebuild_target` slot configured.
/// A no-op otherwise.
///
/// # Errors
/// Returns a `RaidError::RebuildImpossible` if any stripe needs a block from
/// a missing non-target slot (§4.6). Rebuild failure is fatal — the caller
/// must not serve client I/O afterwards.
pub fn rebuild(table: &mut DeviceTable) -> Result<()> {
    let Some(target) = table.rebuild_target() else {
        return Ok(());
    };

    let n = table.n();
    let block_size = table.block_size();
    let stripes = table.stripe_count();

    tracing::info!(target, stripes, "rebuild starting");

    let mut acc = vec![0u8; block_size as usize];
    for stripe in 0..stripes {
        let phys_off = stripe * block_size;
        let parity = (stripe % n as u64) as usize;

        acc.iter_mut().for_each(|b| *b = 0);

        if target == parity {
            for i in 0..n {
                if i == parity {
                    continue;
                }
                if table.is_missing(i) {
                    bail!(RaidError::RebuildImpossible { stripe, slot: i });
                }
                let mut block = vec![0u8; block_size as usize];
                table.read_block(i, phys_off, &mut block)?;
                xor_into(&mut acc, &block);
            }
        } else {
            // This design treats a missing parity slot during a data-slot
            // rebuild as impossible rather than silently reconstructing
            // against a zeroed parity block (see SPEC_FULL.md §9).
            if table.is_missing(parity) {
                bail!(RaidError::RebuildImpossible {
                    stripe,
                    slot: parity
                });
            }
            table.read_block(parity, phys_off, &mut acc)?;
            for i in 0..n {
                if i == parity || i == target {
                    continue;
                }
                if table.is_missing(i) {
                    bail!(RaidError::RebuildImpossible { stripe, slot: i });
                }
                let mut block = vec![0u8; block_size as usize];
                table.read_block(i, phys_off, &mut block)?;
                xor_into(&mut acc, &block);
            }
        }

        table.write_block(target, phys_off, &acc)?;
    }

    tracing::info!(target, "rebuild complete");
    Ok(())
}
