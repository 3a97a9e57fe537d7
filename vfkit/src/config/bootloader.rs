//! Bootloader variants.

use crate::engine::BootLoaderConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use vfkit_shared::errors::{VfkitError, VfkitResult};

/// Persisted identity state of a firmware-identity guest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareIdentity {
    pub machine_identifier_path: PathBuf,
    pub hardware_model_path: PathBuf,
    pub aux_image_path: PathBuf,
}

/// How the guest boots.
///
/// `Firmware` selects the firmware platform; every other variant is generic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Bootloader {
    Linux {
        kernel: PathBuf,
        #[serde(default)]
        initrd: Option<PathBuf>,
        #[serde(default)]
        command_line: String,
    },
    Efi {
        variable_store: PathBuf,
        #[serde(default)]
        create: bool,
    },
    Firmware(FirmwareIdentity),
}

impl Bootloader {
    pub fn firmware_identity(&self) -> Option<&FirmwareIdentity> {
        match self {
            Bootloader::Firmware(identity) => Some(identity),
            _ => None,
        }
    }

    /// Convert to the engine's bootloader form.
    pub fn to_engine(&self) -> VfkitResult<BootLoaderConfig> {
        match self {
            Bootloader::Linux {
                kernel,
                initrd,
                command_line,
            } => {
                require_path("linux kernel", kernel)?;
                if let Some(initrd) = initrd {
                    require_path("linux initrd", initrd)?;
                }
                Ok(BootLoaderConfig::Linux {
                    kernel: kernel.clone(),
                    initrd: initrd.clone(),
                    command_line: command_line.clone(),
                })
            }
            Bootloader::Efi {
                variable_store,
                create,
            } => {
                require_path("efi variable store", variable_store)?;
                Ok(BootLoaderConfig::Efi {
                    variable_store: variable_store.clone(),
                    create_variable_store: *create,
                })
            }
            Bootloader::Firmware(identity) => {
                require_path("machine identifier", &identity.machine_identifier_path)?;
                require_path("hardware model", &identity.hardware_model_path)?;
                require_path("auxiliary image", &identity.aux_image_path)?;
                Ok(BootLoaderConfig::MacOs)
            }
        }
    }
}

fn require_path(what: &str, path: &Path) -> VfkitResult<()> {
    if path.as_os_str().is_empty() {
        return Err(VfkitError::Config(format!("{} path is empty", what)));
    }
    Ok(())
}
