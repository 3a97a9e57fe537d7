//! Declarative virtual machine description.
//!
//! A [`VirtualMachineSpec`] is the sole input of the configuration build.
//! It arrives already shaped (from JSON or constructed in code); vfkit only
//! rejects values no engine could accept.

mod bootloader;

pub use bootloader::{Bootloader, FirmwareIdentity};

use crate::devices::DeviceSpec;
use serde::{Deserialize, Serialize};
use vfkit_shared::errors::{VfkitError, VfkitResult};

const MIB: u64 = 1024 * 1024;

/// Host/guest clock sync over vsock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timesync {
    /// Guest agent port. `0` disables the implicit vsock device.
    pub vsock_port: u32,
}

/// Virtual machine description (immutable once handed to a builder).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualMachineSpec {
    pub vcpus: u32,
    /// Guest memory in bytes.
    pub memory_bytes: u64,
    pub bootloader: Bootloader,
    /// Request nested virtualization (generic platforms only).
    #[serde(default)]
    pub nested: bool,
    /// Explicit devices, contributed in this order.
    #[serde(default)]
    pub devices: Vec<DeviceSpec>,
    #[serde(default)]
    pub timesync: Option<Timesync>,
}

impl VirtualMachineSpec {
    pub fn new(vcpus: u32, memory_mib: u64, bootloader: Bootloader) -> Self {
        Self {
            vcpus,
            memory_bytes: memory_mib * MIB,
            bootloader,
            nested: false,
            devices: Vec::new(),
            timesync: None,
        }
    }

    pub fn with_device(mut self, device: impl Into<DeviceSpec>) -> Self {
        self.devices.push(device.into());
        self
    }

    pub fn with_nested(mut self, nested: bool) -> Self {
        self.nested = nested;
        self
    }

    pub fn with_timesync(mut self, vsock_port: u32) -> Self {
        self.timesync = Some(Timesync { vsock_port });
        self
    }

    /// Port of the implicit timesync vsock device, if one is requested.
    pub fn timesync_port(&self) -> Option<u32> {
        self.timesync
            .as_ref()
            .map(|t| t.vsock_port)
            .filter(|port| *port != 0)
    }

    /// Reject shapes that no engine could accept.
    pub fn sanitize(&self) -> VfkitResult<()> {
        if self.vcpus == 0 {
            return Err(VfkitError::Config("vcpu count must be positive".into()));
        }
        if self.memory_bytes == 0 {
            return Err(VfkitError::Config("memory size must be positive".into()));
        }
        Ok(())
    }
}
