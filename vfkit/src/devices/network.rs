//! Virtio network device.

use super::{DeviceContribution, require_existing_path};
use crate::engine::{MacAddress, NetworkAttachment, NetworkDeviceConfig};
use crate::vm::MachineConfigurationBuilder;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use vfkit_shared::errors::{VfkitError, VfkitResult};

/// How guest traffic leaves the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum NetworkMode {
    /// Engine-provided NAT.
    #[default]
    Nat,
    /// Datagram unix socket owned by a user-space network stack.
    UnixSocket { path: PathBuf },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtioNet {
    /// `aa:bb:cc:dd:ee:ff`; a random local address is used when unset.
    #[serde(default)]
    pub mac: Option<String>,
    #[serde(default)]
    pub mode: NetworkMode,
}

impl DeviceContribution for VirtioNet {
    fn contribute(&self, builder: &mut MachineConfigurationBuilder) -> VfkitResult<()> {
        let mac = match &self.mac {
            Some(mac) => mac
                .parse::<MacAddress>()
                .map_err(|e| VfkitError::device(self.kind(), e))?,
            None => MacAddress::random_local(),
        };

        let attachment = match &self.mode {
            NetworkMode::Nat => NetworkAttachment::Nat,
            NetworkMode::UnixSocket { path } => {
                require_existing_path(self.kind(), "network socket", path)?;
                NetworkAttachment::UnixSocket { path: path.clone() }
            }
        };

        tracing::debug!(mac = %mac, "Configured virtio-net device");
        builder.add_network_device(NetworkDeviceConfig { mac, attachment });
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "virtio-net"
    }
}
