//! The block-device shim boundary (§4.9, §6): a small trait the kernel
//! transport would call into, plus the one production implementor that
//! drives a [`raid5_rs::Engine`].

/// Callback interface a block-device transport drives. Mirrors the four
/// request kinds the shim delivers one at a time (§5: single-threaded
/// cooperative scheduling, no request overlaps another).
pub trait BlockDeviceShim {
    fn size(&self) -> u64;
    fn read(&self, buf: &mut [u8], offset: u64) -> i32;
    fn write(&mut self, buf: &[u8], offset: u64) -> i32;
    fn flush(&self) -> i32;
    fn disconnect(&self);
}

/// Owns the engine and translates each callback into an `Engine` call,
/// mapping failures down to the shim's `i32` convention.
pub struct EngineShim {
    engine: raid5_rs::Engine,
}

impl EngineShim {
    #[must_use]
    pub const fn new(engine: raid5_rs::Engine) -> Self {
        Self { engine }
    }
}

impl BlockDeviceShim for EngineShim {
    fn size(&self) -> u64 {
        self.engine.size()
    }

    fn read(&self, buf: &mut [u8], offset: u64) -> i32 {
        match self.engine.read(buf, offset) {
            Ok(()) => 0,
            Err(err) => {
                tracing::error!(offset, error = %err, "read failed");
                -1
            }
        }
    }

    fn write(&mut self, buf: &[u8], offset: u64) -> i32 {
        match self.engine.write(buf, offset) {
            Ok(()) => 0,
            Err(err) => {
                tracing::error!(offset, error = %err, "write failed");
                -1
            }
        }
    }

    fn flush(&self) -> i32 {
        match self.engine.flush() {
            Ok(()) => 0,
            Err(err) => {
                tracing::error!(error = %err, "flush failed");
                -1
            }
        }
    }

    fn disconnect(&self) {
        self.engine.disconnect();
    }
}

#[cfg(test)]
mod shim_tests {
    use super::*;
    use raid5_rs::DeviceTable;
    use raid5_rs::device_table::DeviceSpec;

    fn harness(n: usize, blocks: u64, block_size: u64) -> (Vec<tempfile::TempPath>, EngineShim) {
        let paths: Vec<_> = (0..n)
            .map(|_| {
                let f = tempfile::NamedTempFile::new().unwrap();
                f.as_file().set_len(blocks * block_size).unwrap();
                f.into_temp_path()
            })
            .collect();
        let specs: Vec<_> = paths
            .iter()
            .map(|p| DeviceSpec::Present(p.to_str().unwrap().to_string()))
            .collect();
        let table = DeviceTable::open(&specs, block_size).unwrap();
        let engine = raid5_rs::Engine::new(table, false);
        (paths, EngineShim::new(engine))
    }

    #[test]
    fn round_trips_through_the_shim_interface() {
        let (_paths, mut shim) = harness(3, 2, 4);
        assert_eq!(shim.write(b"AAAABBBB", 0), 0);
        let mut out = [0u8; 8];
        assert_eq!(shim.read(&mut out, 0), 0);
        assert_eq!(&out, b"AAAABBBB");
        assert_eq!(shim.flush(), 0);
    }

    #[test]
    fn reports_errors_as_nonzero() {
        let (_paths, shim) = harness(3, 2, 4);
        let mut out = [0u8; 3];
        assert_ne!(shim.read(&mut out, 0), 0);
    }

    #[test]
    fn size_matches_virtual_device_size() {
        let (_paths, shim) = harness(3, 2, 4);
        assert_eq!(shim.size(), 2 * 2 * 4);
    }
}
