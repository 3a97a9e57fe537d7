//! Virtio serial/console device.

use super::DeviceContribution;
use crate::engine::{ConsolePortConfig, SerialAttachment, SerialPortConfig};
use crate::vm::MachineConfigurationBuilder;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use vfkit_shared::errors::{VfkitError, VfkitResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SerialOutput {
    /// Append guest output to a file.
    LogFile { path: PathBuf },
    /// Wire the guest console to the process stdio.
    Stdio,
    /// Expose the guest console as a pseudo terminal.
    Pty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtioSerial {
    pub output: SerialOutput,
}

impl DeviceContribution for VirtioSerial {
    fn contribute(&self, builder: &mut MachineConfigurationBuilder) -> VfkitResult<()> {
        match &self.output {
            SerialOutput::LogFile { path } => {
                if path.as_os_str().is_empty() {
                    return Err(VfkitError::device(self.kind(), "log file path is empty"));
                }
                builder.add_serial_port(SerialPortConfig {
                    attachment: SerialAttachment::File { path: path.clone() },
                });
            }
            SerialOutput::Stdio => builder.add_serial_port(SerialPortConfig {
                attachment: SerialAttachment::Stdio,
            }),
            SerialOutput::Pty => builder.add_console_port(ConsolePortConfig {
                name: None,
                is_console: true,
            }),
        }
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "virtio-serial"
    }
}
