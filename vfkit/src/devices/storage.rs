//! Disk-image backed storage devices.

use super::{DeviceContribution, require_existing_path};
use crate::engine::{DiskImageAttachment, StorageDeviceConfig};
use crate::vm::MachineConfigurationBuilder;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use vfkit_shared::errors::{VfkitError, VfkitResult};

/// Longest virtio-blk serial the engine accepts, in bytes.
const MAX_BLOCK_IDENTIFIER_LEN: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtioBlk {
    pub image_path: PathBuf,
    #[serde(default)]
    pub read_only: bool,
    /// Serial reported to the guest (`/dev/disk/by-id`).
    #[serde(default)]
    pub device_id: Option<String>,
}

impl DeviceContribution for VirtioBlk {
    fn contribute(&self, builder: &mut MachineConfigurationBuilder) -> VfkitResult<()> {
        let attachment = disk_attachment(self.kind(), &self.image_path, self.read_only)?;

        if let Some(id) = &self.device_id
            && (id.len() > MAX_BLOCK_IDENTIFIER_LEN || !id.is_ascii())
        {
            return Err(VfkitError::device(
                self.kind(),
                format!(
                    "device id {:?} must be ascii and at most {} bytes",
                    id, MAX_BLOCK_IDENTIFIER_LEN
                ),
            ));
        }

        builder.add_storage_device(StorageDeviceConfig::VirtioBlock {
            attachment,
            identifier: self.device_id.clone(),
        });
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "virtio-blk"
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nvme {
    pub image_path: PathBuf,
    #[serde(default)]
    pub read_only: bool,
}

impl DeviceContribution for Nvme {
    fn contribute(&self, builder: &mut MachineConfigurationBuilder) -> VfkitResult<()> {
        let attachment = disk_attachment(self.kind(), &self.image_path, self.read_only)?;
        builder.add_storage_device(StorageDeviceConfig::Nvme { attachment });
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "nvme"
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsbMassStorage {
    pub image_path: PathBuf,
    #[serde(default)]
    pub read_only: bool,
}

impl DeviceContribution for UsbMassStorage {
    fn contribute(&self, builder: &mut MachineConfigurationBuilder) -> VfkitResult<()> {
        let attachment = disk_attachment(self.kind(), &self.image_path, self.read_only)?;
        builder.add_storage_device(StorageDeviceConfig::UsbMassStorage { attachment });
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "usb-mass-storage"
    }
}

fn disk_attachment(
    device: &str,
    image_path: &std::path::Path,
    read_only: bool,
) -> VfkitResult<DiskImageAttachment> {
    require_existing_path(device, "disk image", image_path)?;
    Ok(DiskImageAttachment {
        path: image_path.to_path_buf(),
        read_only,
    })
}
