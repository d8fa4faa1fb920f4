//! Stand-in for the out-of-scope kernel transport (§4.9): reads a
//! line-oriented protocol from a `BufRead` and drives a [`BlockDeviceShim`],
//! so the engine is exercisable end-to-end without a kernel module.
//!
//! Protocol, one command per line:
//! - `READ <offset> <len>`
//! - `WRITE <offset> <hex-bytes>`
//! - `FLUSH`
//! - `DISCONNECT`

use std::io::{BufRead, Write};

use anyhow::{Context, Result, bail};

use crate::shim::BlockDeviceShim;

/// Runs the request loop until `DISCONNECT` or end of input. Returns the
/// exit code the shim's last failure (if any) should map to: `0` for a
/// clean disconnect, `1` if any request failed along the way.
pub fn run(
    shim: &mut dyn BlockDeviceShim,
    input: &mut dyn BufRead,
    output: &mut dyn Write,
) -> Result<i32> {
    let mut had_error = false;
    let mut line = String::new();

    loop {
        line.clear();
        let n = input.read_line(&mut line).context("reading from harness input")?;
        if n == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut parts = line.split_whitespace();
        let cmd = parts.next().unwrap_or_default();

        match cmd {
            "READ" => {
                let offset: u64 = parts.next().context("READ missing offset")?.parse()?;
                let len: usize = parts.next().context("READ missing len")?.parse()?;
                let mut buf = vec![0u8; len];
                let rc = shim.read(&mut buf, offset);
                if rc == 0 {
                    writeln!(output, "OK {}", hex_encode(&buf))?;
                } else {
                    had_error = true;
                    writeln!(output, "ERR {rc}")?;
                }
            }
            "WRITE" => {
                let offset: u64 = parts.next().context("WRITE missing offset")?.parse()?;
                let hex = parts.next().context("WRITE missing data")?;
                let data = hex_decode(hex)?;
                let rc = shim.write(&data, offset);
                if rc == 0 {
                    writeln!(output, "OK")?;
                } else {
                    had_error = true;
                    writeln!(output, "ERR {rc}")?;
                }
            }
            "FLUSH" => {
                let rc = shim.flush();
                if rc == 0 {
                    writeln!(output, "OK")?;
                } else {
                    had_error = true;
                    writeln!(output, "ERR {rc}")?;
                }
            }
            "DISCONNECT" => {
                shim.disconnect();
                writeln!(output, "OK")?;
                break;
            }
            other => bail!("unrecognized harness command {other:?}"),
        }
    }

    Ok(i32::from(had_error))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn hex_decode(s: &str) -> Result<Vec<u8>> {
    if !s.len().is_multiple_of(2) {
        bail!("hex payload {s:?} has odd length");
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).with_context(|| format!("invalid hex byte in {s:?}")))
        .collect()
}
