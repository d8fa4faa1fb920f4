//! Command-line argument definitions for the RAID5 engine binary.

use clap::Parser;

/// Cli defines the root command for the raid5 binary: the positional
/// startup contract from §6.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Block size in bytes.
    pub block_size: u64,

    /// Opaque name handed to the block-device shim.
    pub raid_device: String,

    /// 3..=16 device specifiers: a path, `MISSING`, or a `+`-prefixed rebuild target.
    #[arg(num_args = 3..=16, required = true)]
    pub devices: Vec<String>,

    /// Enables human-readable I/O traces to the diagnostic stream.
    #[arg(short, long)]
    pub verbose: bool,
}
