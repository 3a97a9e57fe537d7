//! Structural engine that never boots anything.
//!
//! Checks the same things a real hypervisor framework checks up front
//! (paths, limits, device cardinality) and records state transitions.
//! Used by the CLI to vet a configuration without a hypervisor.

use super::{
    BootLoaderConfig, DirectoryShare, Engine, EngineInstance, InstanceState,
    MachineConfiguration, MachineIdentifier, PlatformConfiguration,
};
use crate::config::FirmwareIdentity;
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use vfkit_shared::errors::{VfkitError, VfkitResult};

const MIN_CPU_COUNT: u32 = 1;
const MAX_CPU_COUNT: u32 = 64;
const MIN_MEMORY_SIZE: u64 = 4 * 1024 * 1024;

/// Engine that validates structure only.
#[derive(Debug, Clone)]
pub struct DryRunEngine {
    nested_supported: bool,
}

impl Default for DryRunEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DryRunEngine {
    pub fn new() -> Self {
        Self {
            nested_supported: true,
        }
    }

    /// Pretend the host does (or does not) support nested virtualization.
    pub fn nested_virtualization_supported(mut self, supported: bool) -> Self {
        self.nested_supported = supported;
        self
    }
}

fn require_file(what: &str, path: &Path) -> VfkitResult<()> {
    if !path.exists() {
        return Err(VfkitError::Engine(format!(
            "{} not found: {}",
            what,
            path.display()
        )));
    }
    Ok(())
}

impl Engine for DryRunEngine {
    fn new_base_configuration(
        &self,
        bootloader: &BootLoaderConfig,
        cpu_count: u32,
        memory_size: u64,
    ) -> VfkitResult<MachineConfiguration> {
        match bootloader {
            BootLoaderConfig::Linux { kernel, initrd, .. } => {
                require_file("kernel", kernel)?;
                if let Some(initrd) = initrd {
                    require_file("initrd", initrd)?;
                }
            }
            BootLoaderConfig::Efi {
                variable_store,
                create_variable_store,
            } => {
                if !create_variable_store {
                    require_file("efi variable store", variable_store)?;
                }
            }
            BootLoaderConfig::MacOs => {}
        }

        Ok(MachineConfiguration::new(
            bootloader.clone(),
            cpu_count,
            memory_size,
        ))
    }

    fn new_firmware_platform(
        &self,
        identity: &FirmwareIdentity,
    ) -> VfkitResult<PlatformConfiguration> {
        let bytes = std::fs::read(&identity.machine_identifier_path).map_err(|e| {
            VfkitError::Engine(format!(
                "failed to read machine identifier {}: {}",
                identity.machine_identifier_path.display(),
                e
            ))
        })?;
        if bytes.is_empty() {
            return Err(VfkitError::Engine(format!(
                "machine identifier {} is empty",
                identity.machine_identifier_path.display()
            )));
        }
        require_file("hardware model", &identity.hardware_model_path)?;
        require_file("auxiliary storage", &identity.aux_image_path)?;

        Ok(PlatformConfiguration::Firmware {
            machine_identifier: MachineIdentifier::from_bytes(bytes),
            hardware_model: identity.hardware_model_path.clone(),
            auxiliary_storage: identity.aux_image_path.clone(),
        })
    }

    fn new_generic_machine_identifier(&self) -> VfkitResult<MachineIdentifier> {
        Ok(MachineIdentifier::from_bytes(
            uuid::Uuid::new_v4().as_bytes().to_vec(),
        ))
    }

    fn new_generic_platform(
        &self,
        identifier: MachineIdentifier,
    ) -> VfkitResult<PlatformConfiguration> {
        Ok(PlatformConfiguration::Generic {
            machine_identifier: identifier,
            nested_virtualization: false,
        })
    }

    fn set_nested_virtualization(
        &self,
        platform: &mut PlatformConfiguration,
        enabled: bool,
    ) -> VfkitResult<()> {
        match platform {
            PlatformConfiguration::Generic {
                nested_virtualization,
                ..
            } => {
                if enabled && !self.nested_supported {
                    return Err(VfkitError::Engine(
                        "nested virtualization is not supported on this host".into(),
                    ));
                }
                *nested_virtualization = enabled;
                Ok(())
            }
            PlatformConfiguration::Firmware { .. } => Err(VfkitError::Engine(
                "nested virtualization requires a generic platform".into(),
            )),
        }
    }

    fn validate(&self, config: &MachineConfiguration) -> VfkitResult<bool> {
        if config.platform().is_none() {
            return Ok(false);
        }

        let cpus = config.cpu_count();
        if !(MIN_CPU_COUNT..=MAX_CPU_COUNT).contains(&cpus) {
            return Err(VfkitError::Validation(format!(
                "cpu count {} outside {}..={}",
                cpus, MIN_CPU_COUNT, MAX_CPU_COUNT
            )));
        }
        if config.memory_size() < MIN_MEMORY_SIZE {
            return Err(VfkitError::Validation(format!(
                "memory size {} below minimum {}",
                config.memory_size(),
                MIN_MEMORY_SIZE
            )));
        }
        if config.socket_devices().len() > 1 {
            return Err(VfkitError::Validation(
                "at most one virtio socket device is supported".into(),
            ));
        }
        if config.console_devices().len() > 1 {
            return Err(VfkitError::Validation(
                "at most one virtio console device is supported".into(),
            ));
        }

        let mut tags = HashSet::new();
        for dev in config.directory_sharing_devices() {
            if !tags.insert(dev.tag.as_str()) {
                return Err(VfkitError::Validation(format!(
                    "duplicate directory share tag: {}",
                    dev.tag
                )));
            }
            if let DirectoryShare::Single { path, .. } = &dev.share {
                require_file("shared directory", path)
                    .map_err(|e| VfkitError::Validation(e.to_string()))?;
            }
        }

        let mut ports = HashSet::new();
        for binding in config.vsock_ports() {
            if !ports.insert(binding.port) {
                return Err(VfkitError::Validation(format!(
                    "duplicate vsock port: {}",
                    binding.port
                )));
            }
        }

        Ok(true)
    }

    fn new_instance(
        &self,
        config: Arc<MachineConfiguration>,
    ) -> VfkitResult<Box<dyn EngineInstance>> {
        Ok(Box::new(DryRunInstance::new(config)))
    }
}

/// Instance of a [`DryRunEngine`]; tracks state and logs transitions.
#[derive(Debug)]
pub struct DryRunInstance {
    config: Arc<MachineConfiguration>,
    state: InstanceState,
}

impl DryRunInstance {
    pub fn new(config: Arc<MachineConfiguration>) -> Self {
        Self {
            config,
            state: InstanceState::Stopped,
        }
    }

    pub fn configuration(&self) -> &MachineConfiguration {
        &self.config
    }
}

#[async_trait]
impl EngineInstance for DryRunInstance {
    async fn start(&mut self) -> VfkitResult<()> {
        if self.state == InstanceState::Running {
            tracing::debug!("Dry-run instance already running");
            return Ok(());
        }

        tracing::info!(
            cpus = self.config.cpu_count(),
            memory_bytes = self.config.memory_size(),
            platform_type = ?self.config.platform_kind(),
            vsock_ports = self.config.vsock_ports().len(),
            "Dry-run instance started"
        );
        self.state = InstanceState::Running;
        Ok(())
    }

    async fn stop(&mut self) -> VfkitResult<()> {
        tracing::info!("Dry-run instance stopped");
        self.state = InstanceState::Stopped;
        Ok(())
    }

    fn state(&self) -> InstanceState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{
        ConsoleDeviceConfig, DirectorySharingDeviceConfig, SocketDeviceConfig, VsockPortConfig,
    };
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn generic_config(engine: &DryRunEngine, cpus: u32, memory: u64) -> MachineConfiguration {
        let mut config = MachineConfiguration::new(BootLoaderConfig::MacOs, cpus, memory);
        let id = engine.new_generic_machine_identifier().unwrap();
        config.set_platform(engine.new_generic_platform(id).unwrap());
        config
    }

    fn vsock(port: u32) -> VsockPortConfig {
        VsockPortConfig {
            port,
            listen: false,
            socket_path: None,
        }
    }

    #[test]
    fn test_linux_kernel_must_exist() {
        let engine = DryRunEngine::new();
        let dir = TempDir::new().unwrap();
        let kernel = dir.path().join("vmlinuz");

        let bootloader = BootLoaderConfig::Linux {
            kernel: kernel.clone(),
            initrd: None,
            command_line: String::new(),
        };
        assert!(matches!(
            engine.new_base_configuration(&bootloader, 1, MIN_MEMORY_SIZE),
            Err(VfkitError::Engine(_))
        ));

        std::fs::write(&kernel, b"kernel").unwrap();
        let config = engine
            .new_base_configuration(&bootloader, 1, MIN_MEMORY_SIZE)
            .unwrap();
        assert_eq!(config.cpu_count(), 1);
        assert!(config.platform().is_none());
    }

    #[test]
    fn test_efi_store_may_be_created() {
        let engine = DryRunEngine::new();
        let store = PathBuf::from("/nonexistent/efi-store");

        let create = BootLoaderConfig::Efi {
            variable_store: store.clone(),
            create_variable_store: true,
        };
        assert!(engine.new_base_configuration(&create, 1, MIN_MEMORY_SIZE).is_ok());

        let existing = BootLoaderConfig::Efi {
            variable_store: store,
            create_variable_store: false,
        };
        assert!(engine
            .new_base_configuration(&existing, 1, MIN_MEMORY_SIZE)
            .is_err());
    }

    #[test]
    fn test_firmware_platform_reads_identity() {
        let engine = DryRunEngine::new();
        let dir = TempDir::new().unwrap();
        let identity = FirmwareIdentity {
            machine_identifier_path: dir.path().join("machine-id"),
            hardware_model_path: dir.path().join("hw-model"),
            aux_image_path: dir.path().join("aux.img"),
        };

        assert!(matches!(
            engine.new_firmware_platform(&identity),
            Err(VfkitError::Engine(_))
        ));

        std::fs::write(&identity.machine_identifier_path, [0xab, 0xcd]).unwrap();
        std::fs::write(&identity.hardware_model_path, b"model").unwrap();
        std::fs::write(&identity.aux_image_path, b"aux").unwrap();

        let platform = engine.new_firmware_platform(&identity).unwrap();
        assert_eq!(platform.machine_identifier().to_string(), "abcd");
        assert!(!platform.nested_virtualization());
    }

    #[test]
    fn test_generic_identifiers_are_unique() {
        let engine = DryRunEngine::new();
        let a = engine.new_generic_machine_identifier().unwrap();
        let b = engine.new_generic_machine_identifier().unwrap();
        assert_eq!(a.as_bytes().len(), 16);
        assert_ne!(a, b);
    }

    #[test]
    fn test_nested_support_toggle() {
        let engine = DryRunEngine::new();
        let id = engine.new_generic_machine_identifier().unwrap();
        let mut platform = engine.new_generic_platform(id).unwrap();
        engine.set_nested_virtualization(&mut platform, true).unwrap();
        assert!(platform.nested_virtualization());

        let engine = DryRunEngine::new().nested_virtualization_supported(false);
        let id = engine.new_generic_machine_identifier().unwrap();
        let mut platform = engine.new_generic_platform(id).unwrap();
        assert!(engine.set_nested_virtualization(&mut platform, true).is_err());
        assert!(engine.set_nested_virtualization(&mut platform, false).is_ok());
    }

    #[test]
    fn test_validate_without_platform_is_bare_invalid() {
        let engine = DryRunEngine::new();
        let config = MachineConfiguration::new(BootLoaderConfig::MacOs, 2, MIN_MEMORY_SIZE);
        assert!(!engine.validate(&config).unwrap());
    }

    #[test]
    fn test_validate_limits() {
        let engine = DryRunEngine::new();

        assert!(engine
            .validate(&generic_config(&engine, 2, MIN_MEMORY_SIZE))
            .unwrap());
        assert!(matches!(
            engine.validate(&generic_config(&engine, 65, MIN_MEMORY_SIZE)),
            Err(VfkitError::Validation(_))
        ));
        assert!(matches!(
            engine.validate(&generic_config(&engine, 2, MIN_MEMORY_SIZE - 1)),
            Err(VfkitError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_device_cardinality() {
        let engine = DryRunEngine::new();

        let mut config = generic_config(&engine, 2, MIN_MEMORY_SIZE);
        config.set_socket_devices(vec![SocketDeviceConfig, SocketDeviceConfig]);
        assert!(engine.validate(&config).is_err());

        let mut config = generic_config(&engine, 2, MIN_MEMORY_SIZE);
        config.set_console_devices(vec![ConsoleDeviceConfig::new(), ConsoleDeviceConfig::new()]);
        assert!(engine.validate(&config).is_err());

        let mut config = generic_config(&engine, 2, MIN_MEMORY_SIZE);
        config.set_vsock_ports(vec![vsock(1024), vsock(1024)]);
        let err = engine.validate(&config).unwrap_err();
        assert!(err.to_string().contains("duplicate vsock port"));
    }

    #[test]
    fn test_validate_duplicate_share_tags() {
        let engine = DryRunEngine::new();
        let dir = TempDir::new().unwrap();
        let share = DirectorySharingDeviceConfig {
            tag: "shared".into(),
            share: DirectoryShare::Single {
                path: dir.path().to_path_buf(),
                read_only: false,
            },
        };

        let mut config = generic_config(&engine, 2, MIN_MEMORY_SIZE);
        config.set_directory_sharing_devices(vec![share.clone()]);
        assert!(engine.validate(&config).unwrap());

        config.set_directory_sharing_devices(vec![share.clone(), share]);
        let err = engine.validate(&config).unwrap_err();
        assert!(err.to_string().contains("duplicate directory share tag"));
    }

    #[tokio::test]
    async fn test_instance_state_transitions() {
        let engine = DryRunEngine::new();
        let config = Arc::new(generic_config(&engine, 2, MIN_MEMORY_SIZE));
        let mut instance = engine.new_instance(config).unwrap();

        assert_eq!(instance.state(), InstanceState::Stopped);
        instance.start().await.unwrap();
        assert_eq!(instance.state(), InstanceState::Running);
        instance.start().await.unwrap();
        assert_eq!(instance.state(), InstanceState::Running);
        instance.stop().await.unwrap();
        assert_eq!(instance.state(), InstanceState::Stopped);
    }
}
