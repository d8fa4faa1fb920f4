use std::io;
use std::process::ExitCode;

use clap::Parser;
use raid5_rs::device_table::DeviceSpec;
use raid5_rs::{DeviceTable, Engine, RaidError};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod cli;
mod harness;
mod shim;

use cli::Cli;
use shim::{BlockDeviceShim, EngineShim};

const EXIT_CONFIG_ERROR: u8 = 2;
const EXIT_REBUILD_ERROR: u8 = 3;

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            let code = exit_code_for(&err);
            tracing::error!(error = %err, "fatal");
            ExitCode::from(code)
        }
    }
}

/// Picks the process exit code for a top-level failure by downcasting to
/// `RaidError` and matching on its kind (§6.1, §7.1): configuration and
/// back-end-open failures exit `2`, rebuild failures exit `3`, anything else
/// (including a non-`RaidError` failure) exits `1`.
fn exit_code_for(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<RaidError>() {
        Some(RaidError::Config(_) | RaidError::BackendOpen { .. }) => EXIT_CONFIG_ERROR,
        Some(RaidError::RebuildImpossible { .. }) => EXIT_REBUILD_ERROR,
        Some(RaidError::BackendIo { .. } | RaidError::DegradedUnrecoverable { .. }) | None => 1,
    }
}

fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();
}

fn run(cli: Cli) -> anyhow::Result<u8> {
    info!(raid_device = %cli.raid_device, "starting");

    let specs: Vec<DeviceSpec> = cli.devices.iter().map(|s| DeviceSpec::parse(s)).collect();
    let mut table = DeviceTable::open(&specs, cli.block_size)?;

    if table.rebuild_target().is_some() {
        raid5_rs::rebuild::rebuild(&mut table)?;
    }

    let engine = Engine::new(table, cli.verbose);
    let mut shim = EngineShim::new(engine);
    info!(size = shim.size(), "virtual device ready");

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();
    let code = harness::run(&mut shim, &mut input, &mut output)?;
    Ok(u8::try_from(code).unwrap_or(1))
}
