//! Hypervisor engine seam.
//!
//! The engine is the opaque backend that actually runs virtual machines.
//! vfkit only talks to it through two traits:
//!
//! - **Engine**: construction and validation of configuration objects
//! - **EngineInstance**: runtime operations on a VM created from a validated
//!   configuration (start, stop, state)
//!
//! The split mirrors the backend contract: configuration is assembled and
//! validated once, then an instance is materialized and activated.

mod dry_run;
mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use dry_run::{DryRunEngine, DryRunInstance};
pub use types::{
    BootLoaderConfig, ConsoleDeviceConfig, ConsolePortConfig, DirectoryShare,
    DirectorySharingDeviceConfig, DiskImageAttachment, EntropyDeviceConfig, GraphicsDeviceConfig,
    GraphicsDisplay, KeyboardConfig, MacAddress, MachineConfiguration, MachineIdentifier,
    NetworkAttachment, NetworkDeviceConfig, PlatformConfiguration, PlatformKind,
    PointingDeviceConfig, SerialAttachment, SerialPortConfig, SocketDeviceConfig,
    StorageDeviceConfig, VsockPortConfig,
};

use crate::config::FirmwareIdentity;
use async_trait::async_trait;
use std::sync::Arc;
use vfkit_shared::VfkitResult;

/// Runtime state reported by an engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    Stopped,
    Running,
}

/// Configuration-side operations of a hypervisor backend.
pub trait Engine: Send + Sync {
    /// Create the base configuration from bootloader, CPU count and memory.
    fn new_base_configuration(
        &self,
        bootloader: &BootLoaderConfig,
        cpu_count: u32,
        memory_size: u64,
    ) -> VfkitResult<MachineConfiguration>;

    /// Build a firmware platform from persisted identity state.
    fn new_firmware_platform(
        &self,
        identity: &FirmwareIdentity,
    ) -> VfkitResult<PlatformConfiguration>;

    /// Generate a fresh identity for a generic platform.
    fn new_generic_machine_identifier(&self) -> VfkitResult<MachineIdentifier>;

    /// Build a generic platform around `identifier`.
    fn new_generic_platform(
        &self,
        identifier: MachineIdentifier,
    ) -> VfkitResult<PlatformConfiguration>;

    /// Toggle nested virtualization on a generic platform.
    fn set_nested_virtualization(
        &self,
        platform: &mut PlatformConfiguration,
        enabled: bool,
    ) -> VfkitResult<()>;

    /// Structural validation.
    ///
    /// `Ok(false)` means invalid without an explanation; callers must not
    /// treat it as success.
    fn validate(&self, config: &MachineConfiguration) -> VfkitResult<bool>;

    /// Materialize a VM instance from a validated configuration.
    fn new_instance(
        &self,
        config: Arc<MachineConfiguration>,
    ) -> VfkitResult<Box<dyn EngineInstance>>;
}

/// Runtime operations on a VM created by an [`Engine`].
#[async_trait]
pub trait EngineInstance: Send + Sync {
    /// Start (or resume starting) the VM.
    async fn start(&mut self) -> VfkitResult<()>;

    /// Request the VM to stop.
    async fn stop(&mut self) -> VfkitResult<()>;

    fn state(&self) -> InstanceState;
}
