//! Failure kinds the engine distinguishes internally.
//!
//! Everything here is wrapped in `anyhow::Error` at call sites; `RaidError` only
//! exists so the few places that need to tell failure kinds apart (CLI exit
//! codes, rebuild-vs-request reporting) can `downcast_ref` instead of matching
//! on message text.

use std::fmt;

/// A failure kind owned by the RAID5 engine, distinct from generic I/O errors.
#[derive(Debug)]
pub enum RaidError {
    /// Startup validation failed: device count, prefix conflicts, unparseable sizes.
    Config(String),
    /// A back-end path could not be opened read-write.
    BackendOpen { slot: usize, path: String },
    /// A positional read or write against a present back-end failed or came up short.
    BackendIo { slot: usize, path: String, phys_off: u64 },
    /// A read needed reconstruction but more than one peer in the stripe is missing.
    DegradedUnrecoverable { stripe: u64 },
    /// A rebuild step needed a block from a missing non-target slot.
    RebuildImpossible { stripe: u64, slot: usize },
}

impl fmt::Display for RaidError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
            Self::BackendOpen { slot, path } => {
                write!(f, "slot {slot}: failed to open back-end {path:?}")
            }
            Self::BackendIo { slot, path, phys_off } => {
                write!(f, "slot {slot} ({path}): back-end I/O failed at offset {phys_off}")
            }
            Self::DegradedUnrecoverable { stripe } => {
                write!(f, "stripe {stripe}: two slots unavailable, cannot reconstruct")
            }
            Self::RebuildImpossible { stripe, slot } => {
                write!(f, "stripe {stripe}: rebuild needs missing slot {slot}")
            }
        }
    }
}

impl std::error::Error for RaidError {}
