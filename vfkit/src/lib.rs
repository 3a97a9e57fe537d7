//! vfkit: declarative virtual machine configuration and lifecycle.
//!
//! A [`VirtualMachineSpec`] describes a guest (bootloader, CPUs, memory,
//! devices). [`VirtualMachine`] turns it into an engine configuration on
//! first start:
//!
//! ```text
//! VirtualMachineSpec ─► platform ─► base config ─► devices ─► validate ─► instance
//! ```
//!
//! The hypervisor itself sits behind the [`Engine`] trait.

pub mod config;
pub mod devices;
pub mod engine;
pub mod logging;
pub mod pipeline;
pub mod vm;

pub use config::{Bootloader, FirmwareIdentity, Timesync, VirtualMachineSpec};
pub use devices::{DeviceContribution, DeviceSpec};
pub use engine::{DryRunEngine, Engine, EngineInstance, MachineConfiguration, PlatformKind};
pub use vfkit_shared::{VfkitError, VfkitResult};
pub use vm::{MachineConfigurationBuilder, VirtualMachine, VmStatus};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
