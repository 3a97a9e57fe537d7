//! Virtio socket (vsock) device.

use super::DeviceContribution;
use crate::engine::VsockPortConfig;
use crate::vm::MachineConfigurationBuilder;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use vfkit_shared::errors::{VfkitError, VfkitResult};

/// A vsock port exposed between host and guest.
///
/// All vsock devices share the engine's single socket device; each one only
/// adds a port binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtioVsock {
    pub port: u32,
    /// Host unix socket bridged to the port.
    #[serde(default)]
    pub socket_path: Option<PathBuf>,
    /// `true`: host listens for guest connections. `false`: host connects
    /// to a guest listener.
    #[serde(default)]
    pub listen: bool,
}

impl DeviceContribution for VirtioVsock {
    fn contribute(&self, builder: &mut MachineConfigurationBuilder) -> VfkitResult<()> {
        if self.port == 0 {
            return Err(VfkitError::device(self.kind(), "port must be non-zero"));
        }

        builder.add_vsock_port(VsockPortConfig {
            port: self.port,
            listen: self.listen,
            socket_path: self.socket_path.clone(),
        });
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "virtio-vsock"
    }
}
