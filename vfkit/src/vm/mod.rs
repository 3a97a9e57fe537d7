//! Configuration assembly and lifecycle.
//!
//! - `platform`: picks the one platform for a bootloader
//! - `builder`: per-category accumulator the devices write into
//! - `build`: the ordered build plan (platform → devices → validation)
//! - `machine`: the [`VirtualMachine`] handle that builds lazily on start

mod build;
mod builder;
mod machine;
mod platform;

pub use build::{BuildMetrics, BuildOutput, build_configuration, implicit_devices};
pub use builder::MachineConfigurationBuilder;
pub use machine::{VirtualMachine, VmStatus};
pub use platform::select_platform;

#[cfg(test)]
pub(crate) use builder::test_builder;
