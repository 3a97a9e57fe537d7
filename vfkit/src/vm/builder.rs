//! Per-category device accumulator.

use crate::devices::DeviceContribution;
use crate::engine::{
    ConsoleDeviceConfig, ConsolePortConfig, DirectorySharingDeviceConfig, EntropyDeviceConfig,
    GraphicsDeviceConfig, KeyboardConfig, MachineConfiguration, NetworkDeviceConfig,
    PlatformConfiguration, PlatformKind, PointingDeviceConfig, SerialPortConfig,
    SocketDeviceConfig, StorageDeviceConfig, VsockPortConfig,
};
use vfkit_shared::errors::{VfkitError, VfkitResult};

/// Collects engine-native device configurations before they are flushed
/// into the base [`MachineConfiguration`].
///
/// Devices append through the `add_*` methods; insertion order within a
/// category is kept. The builder is short-lived: [`finish`](Self::finish)
/// consumes it, and on error it is simply dropped.
#[derive(Debug)]
pub struct MachineConfigurationBuilder {
    config: MachineConfiguration,
    storage_devices: Vec<StorageDeviceConfig>,
    directory_sharing_devices: Vec<DirectorySharingDeviceConfig>,
    keyboards: Vec<KeyboardConfig>,
    pointing_devices: Vec<PointingDeviceConfig>,
    graphics_devices: Vec<GraphicsDeviceConfig>,
    network_devices: Vec<NetworkDeviceConfig>,
    entropy_devices: Vec<EntropyDeviceConfig>,
    serial_ports: Vec<SerialPortConfig>,
    console_ports: Vec<ConsolePortConfig>,
    // The engine accepts a single socket device; see `add_vsock_port`.
    socket_devices: Vec<SocketDeviceConfig>,
    vsock_ports: Vec<VsockPortConfig>,
}

impl MachineConfigurationBuilder {
    /// Start from a base configuration and attach its one platform.
    pub fn new(mut config: MachineConfiguration, platform: PlatformConfiguration) -> Self {
        config.set_platform(platform);
        Self {
            config,
            storage_devices: Vec::new(),
            directory_sharing_devices: Vec::new(),
            keyboards: Vec::new(),
            pointing_devices: Vec::new(),
            graphics_devices: Vec::new(),
            network_devices: Vec::new(),
            entropy_devices: Vec::new(),
            serial_ports: Vec::new(),
            console_ports: Vec::new(),
            socket_devices: Vec::new(),
            vsock_ports: Vec::new(),
        }
    }

    /// Let `device` add itself.
    pub fn contribute(&mut self, device: &dyn DeviceContribution) -> VfkitResult<()> {
        tracing::debug!(device = device.kind(), "Adding device to configuration");
        device.contribute(self)
    }

    pub fn platform_kind(&self) -> Option<PlatformKind> {
        self.config.platform_kind()
    }

    pub fn add_storage_device(&mut self, device: StorageDeviceConfig) {
        self.storage_devices.push(device);
    }

    pub fn add_directory_sharing_device(&mut self, device: DirectorySharingDeviceConfig) {
        self.directory_sharing_devices.push(device);
    }

    pub fn add_keyboard(&mut self, device: KeyboardConfig) {
        self.keyboards.push(device);
    }

    pub fn add_pointing_device(&mut self, device: PointingDeviceConfig) {
        self.pointing_devices.push(device);
    }

    pub fn add_graphics_device(&mut self, device: GraphicsDeviceConfig) {
        self.graphics_devices.push(device);
    }

    pub fn add_network_device(&mut self, device: NetworkDeviceConfig) {
        self.network_devices.push(device);
    }

    pub fn add_entropy_device(&mut self, device: EntropyDeviceConfig) {
        self.entropy_devices.push(device);
    }

    pub fn add_serial_port(&mut self, port: SerialPortConfig) {
        self.serial_ports.push(port);
    }

    /// Console ports are wrapped into one console device by `finish`.
    pub fn add_console_port(&mut self, port: ConsolePortConfig) {
        self.console_ports.push(port);
    }

    /// Record a vsock port binding.
    ///
    /// The first binding creates the virtio socket device; later ones reuse
    /// it, so at most one socket device ever reaches the engine.
    pub fn add_vsock_port(&mut self, port: VsockPortConfig) {
        if self.socket_devices.is_empty() {
            self.socket_devices.push(SocketDeviceConfig);
        } else {
            tracing::debug!(
                port = port.port,
                "virtio-vsock device already present, not adding a second one"
            );
        }
        self.vsock_ports.push(port);
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

    pub fn console_ports(&self) -> &[ConsolePortConfig] {
        &self.console_ports
    }

    pub fn socket_devices(&self) -> &[SocketDeviceConfig] {
        &self.socket_devices
    }

    pub fn vsock_ports(&self) -> &[VsockPortConfig] {
        &self.vsock_ports
    }

    /// Flush every category into the base configuration.
    ///
    /// Console ports become a single console device, each port indexed by
    /// its insertion position.
    pub fn finish(self) -> VfkitResult<MachineConfiguration> {
        let Self {
            mut config,
            storage_devices,
            directory_sharing_devices,
            keyboards,
            pointing_devices,
            graphics_devices,
            network_devices,
            entropy_devices,
            serial_ports,
            console_ports,
            socket_devices,
            vsock_ports,
        } = self;

        config.set_storage_devices(storage_devices);
        config.set_directory_sharing_devices(directory_sharing_devices);
        config.set_pointing_devices(pointing_devices);
        config.set_keyboards(keyboards);
        config.set_graphics_devices(graphics_devices);
        config.set_network_devices(network_devices);
        config.set_entropy_devices(entropy_devices);
        config.set_serial_ports(serial_ports);

        if !console_ports.is_empty() {
            let mut console = ConsoleDeviceConfig::new();
            for (index, port) in console_ports.into_iter().enumerate() {
                let index = u32::try_from(index)
                    .map_err(|_| VfkitError::Internal("too many console ports".into()))?;
                console.set_port(index, port);
            }
            config.set_console_devices(vec![console]);
        }

        config.set_socket_devices(socket_devices);
        config.set_vsock_ports(vsock_ports);

        Ok(config)
    }
}

/// Builder over a generic Linux base configuration, for device tests.
#[cfg(test)]
pub(crate) fn test_builder() -> MachineConfigurationBuilder {
    use crate::engine::{BootLoaderConfig, MachineIdentifier};

    let config = MachineConfiguration::new(
        BootLoaderConfig::Linux {
            kernel: "/vm/vmlinuz".into(),
            initrd: None,
            command_line: String::new(),
        },
        2,
        512 * 1024 * 1024,
    );
    let platform = PlatformConfiguration::Generic {
        machine_identifier: MachineIdentifier::from_bytes(vec![1, 2, 3, 4]),
        nested_virtualization: false,
    };
    MachineConfigurationBuilder::new(config, platform)
}
