//! Device descriptors and the contribution protocol.
//!
//! Every device implements [`DeviceContribution`]: given the in-progress
//! [`MachineConfigurationBuilder`], it converts its own parameters into the
//! engine-native form and appends them to the right category. The builder
//! never special-cases device types, so adding a category means adding a
//! type here and nothing else.
//!
//! [`DeviceSpec`] is the serializable, closed set of built-in devices. The
//! builder takes any `&dyn DeviceContribution`, so library users can bring
//! their own.

mod entropy;
mod fs;
mod graphics;
mod input;
mod network;
mod serial;
mod storage;
mod vsock;

pub use entropy::VirtioRng;
pub use fs::{Rosetta, VirtioFs};
pub use graphics::VirtioGpu;
pub use input::{InputDevice, VirtioInput};
pub use network::{NetworkMode, VirtioNet};
pub use serial::{SerialOutput, VirtioSerial};
pub use storage::{Nvme, UsbMassStorage, VirtioBlk};
pub use vsock::VirtioVsock;

use crate::vm::MachineConfigurationBuilder;
use serde::{Deserialize, Serialize};
use std::path::Path;
use vfkit_shared::errors::{VfkitError, VfkitResult};

/// A device that knows how to add itself to a machine configuration.
pub trait DeviceContribution: Send + Sync {
    /// Convert this device and append it to `builder`.
    ///
    /// Errors abort the whole build and reach the caller unchanged.
    fn contribute(&self, builder: &mut MachineConfigurationBuilder) -> VfkitResult<()>;

    /// Short device name for logs and errors.
    fn kind(&self) -> &'static str;
}

/// Built-in device descriptors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum DeviceSpec {
    VirtioBlk(VirtioBlk),
    Nvme(Nvme),
    UsbMassStorage(UsbMassStorage),
    VirtioNet(VirtioNet),
    VirtioSerial(VirtioSerial),
    VirtioRng,
    VirtioVsock(VirtioVsock),
    VirtioInput(VirtioInput),
    VirtioGpu(VirtioGpu),
    VirtioFs(VirtioFs),
    Rosetta(Rosetta),
}

impl DeviceSpec {
    fn as_contribution(&self) -> &dyn DeviceContribution {
        match self {
            DeviceSpec::VirtioBlk(dev) => dev,
            DeviceSpec::Nvme(dev) => dev,
            DeviceSpec::UsbMassStorage(dev) => dev,
            DeviceSpec::VirtioNet(dev) => dev,
            DeviceSpec::VirtioSerial(dev) => dev,
            DeviceSpec::VirtioRng => &VirtioRng,
            DeviceSpec::VirtioVsock(dev) => dev,
            DeviceSpec::VirtioInput(dev) => dev,
            DeviceSpec::VirtioGpu(dev) => dev,
            DeviceSpec::VirtioFs(dev) => dev,
            DeviceSpec::Rosetta(dev) => dev,
        }
    }
}

impl DeviceContribution for DeviceSpec {
    fn contribute(&self, builder: &mut MachineConfigurationBuilder) -> VfkitResult<()> {
        self.as_contribution().contribute(builder)
    }

    fn kind(&self) -> &'static str {
        self.as_contribution().kind()
    }
}

macro_rules! impl_from_device {
    ($($ty:ident),* $(,)?) => {
        $(
            impl From<$ty> for DeviceSpec {
                fn from(dev: $ty) -> Self {
                    DeviceSpec::$ty(dev)
                }
            }
        )*
    };
}

impl_from_device!(
    VirtioBlk,
    Nvme,
    UsbMassStorage,
    VirtioNet,
    VirtioSerial,
    VirtioVsock,
    VirtioInput,
    VirtioGpu,
    VirtioFs,
    Rosetta,
);

impl From<VirtioRng> for DeviceSpec {
    fn from(_: VirtioRng) -> Self {
        DeviceSpec::VirtioRng
    }
}

/// Fail with a device error unless `path` is set and exists on the host.
pub(crate) fn require_existing_path(device: &str, what: &str, path: &Path) -> VfkitResult<()> {
    if path.as_os_str().is_empty() {
        return Err(VfkitError::device(device, format!("{} path is empty", what)));
    }
    if !path.exists() {
        return Err(VfkitError::device(
            device,
            format!("{} not found: {}", what, path.display()),
        ));
    }
    Ok(())
}
