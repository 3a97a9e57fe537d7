//! Virtual machine lifecycle handle.

use super::build::{BuildMetrics, build_configuration};
use crate::config::VirtualMachineSpec;
use crate::engine::{Engine, EngineInstance, MachineConfiguration, PlatformKind};
use std::fmt;
use std::sync::Arc;
use vfkit_shared::errors::{VfkitError, VfkitResult};

/// Lifecycle status of a [`VirtualMachine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmStatus {
    /// No engine instance exists yet.
    Unconfigured,
    Running,
    Stopped,
}

impl VmStatus {
    /// Whether an engine instance exists.
    pub fn is_configured(&self) -> bool {
        !matches!(self, VmStatus::Unconfigured)
    }
}

impl fmt::Display for VmStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VmStatus::Unconfigured => f.write_str("unconfigured"),
            VmStatus::Running => f.write_str("running"),
            VmStatus::Stopped => f.write_str("stopped"),
        }
    }
}

/// Handle owning one virtual machine.
///
/// **Lazy Initialization**: the engine configuration is built, validated and
/// turned into an instance on the first [`start`](Self::start). Later calls
/// reuse that instance.
///
/// `start` and `stop` take `&mut self`, so callers serialize them.
pub struct VirtualMachine {
    spec: VirtualMachineSpec,
    engine: Arc<dyn Engine>,
    configuration: Option<Arc<MachineConfiguration>>,
    instance: Option<Box<dyn EngineInstance>>,
    metrics: Option<BuildMetrics>,
    status: VmStatus,
}

impl VirtualMachine {
    /// Wrap `spec` without touching the engine.
    pub fn new(spec: VirtualMachineSpec, engine: Arc<dyn Engine>) -> VfkitResult<Self> {
        spec.sanitize()?;

        tracing::trace!(
            vcpus = spec.vcpus,
            memory_bytes = spec.memory_bytes,
            devices = spec.devices.len(),
            "VirtualMachine created"
        );

        Ok(Self {
            spec,
            engine,
            configuration: None,
            instance: None,
            metrics: None,
            status: VmStatus::Unconfigured,
        })
    }

    pub fn spec(&self) -> &VirtualMachineSpec {
        &self.spec
    }

    pub fn status(&self) -> VmStatus {
        self.status
    }

    /// Platform the configuration was built on, once built.
    pub fn platform_kind(&self) -> Option<PlatformKind> {
        self.configuration
            .as_ref()
            .and_then(|config| config.platform_kind())
    }

    pub fn build_metrics(&self) -> Option<&BuildMetrics> {
        self.metrics.as_ref()
    }

    /// The validated engine configuration, once built.
    pub fn configuration(&self) -> Option<&MachineConfiguration> {
        self.configuration.as_deref()
    }

    /// Start the virtual machine.
    ///
    /// The first call builds and validates the configuration, creates the
    /// engine instance and starts it. If any of that fails, the handle stays
    /// `Unconfigured` and the next call starts over. Later calls only start
    /// the existing instance again.
    pub async fn start(&mut self) -> VfkitResult<()> {
        if let Some(instance) = self.instance.as_mut() {
            tracing::debug!(status = %self.status, "Reusing existing engine instance");
            instance.start().await?;
            self.status = VmStatus::Running;
            return Ok(());
        }

        let output = build_configuration(&self.spec, self.engine.as_ref()).inspect_err(|e| {
            tracing::error!(error = %e, "Failed to build virtual machine configuration");
        })?;

        let configuration = Arc::new(output.configuration);
        let mut instance = self.engine.new_instance(Arc::clone(&configuration))?;
        instance.start().await.inspect_err(|e| {
            tracing::error!(error = %e, "Engine instance failed to start");
        })?;

        tracing::info!(
            platform_type = ?configuration.platform_kind(),
            duration_ms = output.metrics.total_duration_ms(),
            "Virtual machine started"
        );

        self.configuration = Some(configuration);
        self.metrics = Some(output.metrics);
        self.instance = Some(instance);
        self.status = VmStatus::Running;
        Ok(())
    }

    /// Ask the engine to stop the virtual machine.
    pub async fn stop(&mut self) -> VfkitResult<()> {
        let instance = self.instance.as_mut().ok_or_else(|| {
            VfkitError::InvalidState("virtual machine has not been started".into())
        })?;

        instance.stop().await?;
        self.status = VmStatus::Stopped;
        tracing::info!("Virtual machine stopped");
        Ok(())
    }
}

impl fmt::Debug for VirtualMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualMachine")
            .field("spec", &self.spec)
            .field("status", &self.status)
            .field("platform_kind", &self.platform_kind())
            .finish()
    }
}

// ============================================================================
// THREAD SAFETY ASSERTIONS
// ============================================================================

const _: () = {
    const fn assert_send_sync<T: Send + Sync>() {}
    let _ = assert_send_sync::<VirtualMachine>;
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Bootloader, FirmwareIdentity};
    use crate::devices::{SerialOutput, VirtioRng, VirtioSerial, VirtioVsock};
    use crate::engine::DryRunEngine;
    use crate::engine::testing::MockEngine;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn linux_spec() -> VirtualMachineSpec {
        VirtualMachineSpec::new(
            2,
            512,
            Bootloader::Linux {
                kernel: PathBuf::from("/vm/vmlinuz"),
                initrd: None,
                command_line: String::new(),
            },
        )
    }

    fn machine(spec: VirtualMachineSpec) -> (VirtualMachine, Arc<MockEngine>) {
        let engine = Arc::new(MockEngine::new());
        let vm = VirtualMachine::new(spec, engine.clone()).unwrap();
        (vm, engine)
    }

    #[test]
    fn test_new_rejects_zero_vcpus() {
        let mut spec = linux_spec();
        spec.vcpus = 0;
        let err = VirtualMachine::new(spec, Arc::new(MockEngine::new())).unwrap_err();
        assert!(matches!(err, VfkitError::Config(_)));
    }

    #[tokio::test]
    async fn test_start_twice_builds_once() {
        let (mut vm, engine) = machine(linux_spec().with_device(VirtioRng));
        assert_eq!(vm.status(), VmStatus::Unconfigured);
        assert!(vm.configuration().is_none());

        vm.start().await.unwrap();
        vm.start().await.unwrap();

        let calls = engine.calls();
        assert_eq!(calls.base_configs, 1);
        assert_eq!(calls.identifiers, 1);
        assert_eq!(calls.validations, 1);
        assert_eq!(calls.instances, 1);
        assert_eq!(calls.starts, 2);
        assert_eq!(vm.status(), VmStatus::Running);
        assert_eq!(vm.platform_kind(), Some(PlatformKind::Generic));
        assert!(vm.build_metrics().is_some());
    }

    #[tokio::test]
    async fn test_firmware_nested_fails_before_engine() {
        let spec = VirtualMachineSpec::new(
            2,
            512,
            Bootloader::Firmware(FirmwareIdentity {
                machine_identifier_path: PathBuf::from("/vm/id"),
                hardware_model_path: PathBuf::from("/vm/hw"),
                aux_image_path: PathBuf::from("/vm/aux"),
            }),
        )
        .with_nested(true);
        let (mut vm, engine) = machine(spec);

        let err = vm.start().await.unwrap_err();

        assert!(matches!(err, VfkitError::Config(_)));
        assert_eq!(engine.calls().total(), 0);
        assert_eq!(vm.status(), VmStatus::Unconfigured);
    }

    #[tokio::test]
    async fn test_device_error_leaves_unconfigured() {
        let spec = linux_spec().with_device(VirtioVsock {
            port: 0,
            socket_path: None,
            listen: true,
        });
        let (mut vm, engine) = machine(spec);

        let err = vm.start().await.unwrap_err();

        assert!(matches!(err, VfkitError::Device { .. }));
        assert_eq!(vm.status(), VmStatus::Unconfigured);
        assert!(vm.configuration().is_none());
        assert_eq!(engine.calls().instances, 0);
    }

    #[tokio::test]
    async fn test_bare_invalid_fails_start() {
        let engine = Arc::new(MockEngine::new().invalid());
        let mut vm = VirtualMachine::new(linux_spec(), engine.clone()).unwrap();

        let err = vm.start().await.unwrap_err();

        assert!(matches!(err, VfkitError::InvalidConfiguration));
        assert_eq!(err.to_string(), "invalid virtual machine configuration");
        assert_eq!(engine.calls().instances, 0);
    }

    #[tokio::test]
    async fn test_failed_first_start_rebuilds_next_time() {
        let engine = Arc::new(MockEngine::new().failing_start());
        let mut vm = VirtualMachine::new(linux_spec(), engine.clone()).unwrap();

        assert!(vm.start().await.is_err());
        assert_eq!(vm.status(), VmStatus::Unconfigured);
        assert!(vm.start().await.is_err());

        let calls = engine.calls();
        assert_eq!(calls.base_configs, 2);
        assert_eq!(calls.instances, 2);
    }

    #[tokio::test]
    async fn test_stop_requires_instance() {
        let (mut vm, engine) = machine(linux_spec());

        let err = vm.stop().await.unwrap_err();
        assert!(matches!(err, VfkitError::InvalidState(_)));

        vm.start().await.unwrap();
        vm.stop().await.unwrap();
        assert_eq!(vm.status(), VmStatus::Stopped);
        assert!(vm.status().is_configured());
        assert_eq!(engine.calls().stops, 1);

        vm.start().await.unwrap();
        assert_eq!(vm.status(), VmStatus::Running);
        assert_eq!(engine.calls().base_configs, 1);
    }

    #[tokio::test]
    async fn test_console_ports_indexed_in_started_configuration() {
        let pty = VirtioSerial {
            output: SerialOutput::Pty,
        };
        let spec = linux_spec()
            .with_device(VirtioRng)
            .with_device(pty.clone())
            .with_device(VirtioRng)
            .with_device(pty);
        let (mut vm, _engine) = machine(spec);

        vm.start().await.unwrap();

        let config = vm.configuration().unwrap();
        let console = &config.console_devices()[0];
        assert!(console.port(0).is_some());
        assert!(console.port(1).is_some());
        assert!(console.port(2).is_none());
    }

    #[tokio::test]
    async fn test_dry_run_engine_end_to_end() {
        let dir = TempDir::new().unwrap();
        let kernel = dir.path().join("vmlinuz");
        std::fs::write(&kernel, b"kernel").unwrap();

        let spec = VirtualMachineSpec::new(
            2,
            256,
            Bootloader::Linux {
                kernel,
                initrd: None,
                command_line: "console=hvc0".into(),
            },
        )
        .with_device(VirtioRng)
        .with_device(VirtioVsock {
            port: 1024,
            socket_path: None,
            listen: true,
        })
        .with_timesync(1234);

        let mut vm = VirtualMachine::new(spec, Arc::new(DryRunEngine::new())).unwrap();
        vm.start().await.unwrap();

        let config = vm.configuration().unwrap();
        assert_eq!(config.socket_devices().len(), 1);
        assert_eq!(config.vsock_ports().len(), 2);
        assert_eq!(vm.spec().devices.len(), 2);

        vm.stop().await.unwrap();
        assert_eq!(vm.status(), VmStatus::Stopped);
    }
}
