//! Shared scratch-device setup for the integration suite.
//!
//! Each `tests/*.rs` file links this module as its own separate binary, so
//! a helper only one file uses looks dead to the others.
#![allow(dead_code)]

use raid5_rs::device_table::DeviceSpec;

pub struct Harness {
    pub paths: Vec<tempfile::TempPath>,
    pub block_size: u64,
}

impl Harness {
    pub fn new(n: usize, blocks: u64, block_size: u64) -> Self {
        let paths = (0..n)
            .map(|_| {
                let f = tempfile::NamedTempFile::new().unwrap();
                f.as_file().set_len(blocks * block_size).unwrap();
                f.into_temp_path()
            })
            .collect();
        Self { paths, block_size }
    }

    pub fn specs(&self) -> Vec<DeviceSpec> {
        self.paths
            .iter()
            .map(|p| DeviceSpec::Present(p.to_str().unwrap().to_string()))
            .collect()
    }

    pub fn specs_with_missing(&self, missing: usize) -> Vec<DeviceSpec> {
        self.paths
            .iter()
            .enumerate()
            .map(|(i, p)| {
                if i == missing {
                    DeviceSpec::Missing
                } else {
                    DeviceSpec::Present(p.to_str().unwrap().to_string())
                }
            })
            .collect()
    }
}
