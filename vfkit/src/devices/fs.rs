//! Directory sharing devices (virtiofs).

use super::{DeviceContribution, require_existing_path};
use crate::engine::{DirectoryShare, DirectorySharingDeviceConfig};
use crate::vm::MachineConfigurationBuilder;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use vfkit_shared::errors::{VfkitError, VfkitResult};

/// Longest virtiofs mount tag the engine accepts, in bytes.
const MAX_MOUNT_TAG_LEN: usize = 36;

/// Share a host directory with the guest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtioFs {
    pub shared_dir: PathBuf,
    pub mount_tag: String,
    #[serde(default)]
    pub read_only: bool,
}

impl DeviceContribution for VirtioFs {
    fn contribute(&self, builder: &mut MachineConfigurationBuilder) -> VfkitResult<()> {
        validate_mount_tag(self.kind(), &self.mount_tag)?;
        require_existing_path(self.kind(), "shared directory", &self.shared_dir)?;
        if !self.shared_dir.is_dir() {
            return Err(VfkitError::device(
                self.kind(),
                format!("not a directory: {}", self.shared_dir.display()),
            ));
        }

        builder.add_directory_sharing_device(DirectorySharingDeviceConfig {
            tag: self.mount_tag.clone(),
            share: DirectoryShare::Single {
                path: self.shared_dir.clone(),
                read_only: self.read_only,
            },
        });
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "virtio-fs"
    }
}

/// Share the Rosetta translation runtime with a Linux guest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rosetta {
    pub mount_tag: String,
    #[serde(default)]
    pub install_if_missing: bool,
}

impl DeviceContribution for Rosetta {
    fn contribute(&self, builder: &mut MachineConfigurationBuilder) -> VfkitResult<()> {
        validate_mount_tag(self.kind(), &self.mount_tag)?;

        builder.add_directory_sharing_device(DirectorySharingDeviceConfig {
            tag: self.mount_tag.clone(),
            share: DirectoryShare::Rosetta {
                install_if_missing: self.install_if_missing,
            },
        });
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "rosetta"
    }
}

fn validate_mount_tag(device: &str, tag: &str) -> VfkitResult<()> {
    if tag.is_empty() {
        return Err(VfkitError::device(device, "mount tag is empty"));
    }
    if tag.len() > MAX_MOUNT_TAG_LEN {
        return Err(VfkitError::device(
            device,
            format!("mount tag {:?} exceeds {} bytes", tag, MAX_MOUNT_TAG_LEN),
        ));
    }
    Ok(())
}
