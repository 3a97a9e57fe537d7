//! Engine-native configuration objects.
//!
//! These mirror what a hypervisor framework expects: one base configuration
//! (bootloader, CPUs, memory, platform) plus one device list per category.
//! Devices produce these values; engines consume them.

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

// ============================================================================
// BOOTLOADER & PLATFORM
// ============================================================================

/// Bootloader in the form the engine consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum BootLoaderConfig {
    Linux {
        kernel: PathBuf,
        initrd: Option<PathBuf>,
        command_line: String,
    },
    Efi {
        variable_store: PathBuf,
        create_variable_store: bool,
    },
    MacOs,
}

/// Opaque machine identity, displayed and serialized as hex.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct MachineIdentifier(Vec<u8>);

impl MachineIdentifier {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for MachineIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

impl fmt::Debug for MachineIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MachineIdentifier({})", self)
    }
}

impl Serialize for MachineIdentifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Which platform path a configuration was built on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformKind {
    /// Firmware/identity platform (needs machine identifier, hardware model
    /// and auxiliary storage).
    Firmware,
    /// Generic platform with a freshly generated identity.
    Generic,
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformKind::Firmware => f.write_str("firmware"),
            PlatformKind::Generic => f.write_str("generic"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PlatformConfiguration {
    Firmware {
        machine_identifier: MachineIdentifier,
        hardware_model: PathBuf,
        auxiliary_storage: PathBuf,
    },
    Generic {
        machine_identifier: MachineIdentifier,
        nested_virtualization: bool,
    },
}

impl PlatformConfiguration {
    pub fn kind(&self) -> PlatformKind {
        match self {
            PlatformConfiguration::Firmware { .. } => PlatformKind::Firmware,
            PlatformConfiguration::Generic { .. } => PlatformKind::Generic,
        }
    }

    pub fn machine_identifier(&self) -> &MachineIdentifier {
        match self {
            PlatformConfiguration::Firmware {
                machine_identifier, ..
            }
            | PlatformConfiguration::Generic {
                machine_identifier, ..
            } => machine_identifier,
        }
    }

    pub fn nested_virtualization(&self) -> bool {
        matches!(
            self,
            PlatformConfiguration::Generic {
                nested_virtualization: true,
                ..
            }
        )
    }
}

// ============================================================================
// DEVICES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiskImageAttachment {
    pub path: PathBuf,
    pub read_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StorageDeviceConfig {
    VirtioBlock {
        attachment: DiskImageAttachment,
        identifier: Option<String>,
    },
    Nvme {
        attachment: DiskImageAttachment,
    },
    UsbMassStorage {
        attachment: DiskImageAttachment,
    },
}

impl StorageDeviceConfig {
    pub fn attachment(&self) -> &DiskImageAttachment {
        match self {
            StorageDeviceConfig::VirtioBlock { attachment, .. }
            | StorageDeviceConfig::Nvme { attachment }
            | StorageDeviceConfig::UsbMassStorage { attachment } => attachment,
        }
    }
}

/// Ethernet MAC address.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    pub fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    /// Random unicast address with the locally-administered bit set.
    pub fn random_local() -> Self {
        let mut octets: [u8; 6] = rand::random();
        octets[0] = (octets[0] & 0xfe) | 0x02;
        Self(octets)
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    pub fn is_local(&self) -> bool {
        self.0[0] & 0x02 != 0
    }

    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl fmt::Debug for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MacAddress({})", self)
    }
}

impl FromStr for MacAddress {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 6 {
            return Err(format!("invalid mac address: {}", s));
        }
        let mut octets = [0u8; 6];
        for (octet, part) in octets.iter_mut().zip(parts) {
            if part.len() != 2 {
                return Err(format!("invalid mac address: {}", s));
            }
            *octet =
                u8::from_str_radix(part, 16).map_err(|_| format!("invalid mac address: {}", s))?;
        }
        Ok(Self(octets))
    }
}

impl Serialize for MacAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum NetworkAttachment {
    Nat,
    UnixSocket { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkDeviceConfig {
    pub mac: MacAddress,
    pub attachment: NetworkAttachment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SerialAttachment {
    File { path: PathBuf },
    Stdio,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SerialPortConfig {
    pub attachment: SerialAttachment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsolePortConfig {
    pub name: Option<String>,
    pub is_console: bool,
}

/// Virtio console device holding ports at explicit indices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConsoleDeviceConfig {
    ports: BTreeMap<u32, ConsolePortConfig>,
}

impl ConsoleDeviceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_port(&mut self, index: u32, port: ConsolePortConfig) {
        self.ports.insert(index, port);
    }

    pub fn port(&self, index: u32) -> Option<&ConsolePortConfig> {
        self.ports.get(&index)
    }

    pub fn ports(&self) -> impl Iterator<Item = (u32, &ConsolePortConfig)> {
        self.ports.iter().map(|(index, port)| (*index, port))
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntropyDeviceConfig;

/// Virtio socket device. Port bindings live in [`VsockPortConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SocketDeviceConfig;

/// A vsock port to wire up once the instance runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VsockPortConfig {
    pub port: u32,
    /// `true` when the host listens, `false` when it connects to the guest.
    pub listen: bool,
    pub socket_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyboardConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PointingDeviceConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphicsDisplay {
    pub width: u32,
    pub height: u32,
    pub pixels_per_inch: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphicsDeviceConfig {
    pub displays: Vec<GraphicsDisplay>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum DirectoryShare {
    Single { path: PathBuf, read_only: bool },
    Rosetta { install_if_missing: bool },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectorySharingDeviceConfig {
    pub tag: String,
    pub share: DirectoryShare,
}

// ============================================================================
// MACHINE CONFIGURATION
// ============================================================================

/// The engine's virtual machine configuration.
///
/// Created by [`Engine::new_base_configuration`](super::Engine::new_base_configuration),
/// populated through the per-category setters, then validated by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MachineConfiguration {
    bootloader: BootLoaderConfig,
    cpu_count: u32,
    memory_size: u64,
    platform: Option<PlatformConfiguration>,
    storage_devices: Vec<StorageDeviceConfig>,
    directory_sharing_devices: Vec<DirectorySharingDeviceConfig>,
    keyboards: Vec<KeyboardConfig>,
    pointing_devices: Vec<PointingDeviceConfig>,
    graphics_devices: Vec<GraphicsDeviceConfig>,
    network_devices: Vec<NetworkDeviceConfig>,
    entropy_devices: Vec<EntropyDeviceConfig>,
    serial_ports: Vec<SerialPortConfig>,
    console_devices: Vec<ConsoleDeviceConfig>,
    socket_devices: Vec<SocketDeviceConfig>,
    vsock_ports: Vec<VsockPortConfig>,
}

impl MachineConfiguration {
    pub fn new(bootloader: BootLoaderConfig, cpu_count: u32, memory_size: u64) -> Self {
        Self {
            bootloader,
            cpu_count,
            memory_size,
            platform: None,
            storage_devices: Vec::new(),
            directory_sharing_devices: Vec::new(),
            keyboards: Vec::new(),
            pointing_devices: Vec::new(),
            graphics_devices: Vec::new(),
            network_devices: Vec::new(),
            entropy_devices: Vec::new(),
            serial_ports: Vec::new(),
            console_devices: Vec::new(),
            socket_devices: Vec::new(),
            vsock_ports: Vec::new(),
        }
    }

    pub fn bootloader(&self) -> &BootLoaderConfig {
        &self.bootloader
    }

    pub fn cpu_count(&self) -> u32 {
        self.cpu_count
    }

    pub fn memory_size(&self) -> u64 {
        self.memory_size
    }

    pub fn platform(&self) -> Option<&PlatformConfiguration> {
        self.platform.as_ref()
    }

    pub fn platform_kind(&self) -> Option<PlatformKind> {
        self.platform.as_ref().map(PlatformConfiguration::kind)
    }

    pub fn storage_devices(&self) -> &[StorageDeviceConfig] {
        &self.storage_devices
    }

    pub fn directory_sharing_devices(&self) -> &[DirectorySharingDeviceConfig] {
        &self.directory_sharing_devices
    }

    pub fn keyboards(&self) -> &[KeyboardConfig] {
        &self.keyboards
    }

    pub fn pointing_devices(&self) -> &[PointingDeviceConfig] {
        &self.pointing_devices
    }

    pub fn graphics_devices(&self) -> &[GraphicsDeviceConfig] {
        &self.graphics_devices
    }

    pub fn network_devices(&self) -> &[NetworkDeviceConfig] {
        &self.network_devices
    }

    pub fn entropy_devices(&self) -> &[EntropyDeviceConfig] {
        &self.entropy_devices
    }

    pub fn serial_ports(&self) -> &[SerialPortConfig] {
        &self.serial_ports
    }

    pub fn console_devices(&self) -> &[ConsoleDeviceConfig] {
        &self.console_devices
    }

    pub fn socket_devices(&self) -> &[SocketDeviceConfig] {
        &self.socket_devices
    }

    pub fn vsock_ports(&self) -> &[VsockPortConfig] {
        &self.vsock_ports
    }

    pub fn set_platform(&mut self, platform: PlatformConfiguration) {
        self.platform = Some(platform);
    }

    pub fn set_storage_devices(&mut self, devices: Vec<StorageDeviceConfig>) {
        self.storage_devices = devices;
    }

    pub fn set_directory_sharing_devices(&mut self, devices: Vec<DirectorySharingDeviceConfig>) {
        self.directory_sharing_devices = devices;
    }

    pub fn set_keyboards(&mut self, devices: Vec<KeyboardConfig>) {
        self.keyboards = devices;
    }

    pub fn set_pointing_devices(&mut self, devices: Vec<PointingDeviceConfig>) {
        self.pointing_devices = devices;
    }

    pub fn set_graphics_devices(&mut self, devices: Vec<GraphicsDeviceConfig>) {
        self.graphics_devices = devices;
    }

    pub fn set_network_devices(&mut self, devices: Vec<NetworkDeviceConfig>) {
        self.network_devices = devices;
    }

    pub fn set_entropy_devices(&mut self, devices: Vec<EntropyDeviceConfig>) {
        self.entropy_devices = devices;
    }

    pub fn set_serial_ports(&mut self, ports: Vec<SerialPortConfig>) {
        self.serial_ports = ports;
    }

    pub fn set_console_devices(&mut self, devices: Vec<ConsoleDeviceConfig>) {
        self.console_devices = devices;
    }

    pub fn set_socket_devices(&mut self, devices: Vec<SocketDeviceConfig>) {
        self.socket_devices = devices;
    }

    pub fn set_vsock_ports(&mut self, ports: Vec<VsockPortConfig>) {
        self.vsock_ports = ports;
    }
}
