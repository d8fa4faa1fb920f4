//! RAID5 address-translation, I/O, and reconstruction engine.

pub mod device_table;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod rebuild;
pub mod xor;

pub use device_table::{DeviceSpec, DeviceTable};
pub use engine::Engine;
pub use error::RaidError;
pub use geometry::Placement;
