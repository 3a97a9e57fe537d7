//! Call-recording engine for unit tests.

use super::{
    BootLoaderConfig, Engine, EngineInstance, InstanceState, MachineConfiguration,
    MachineIdentifier, PlatformConfiguration,
};
use crate::config::FirmwareIdentity;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use vfkit_shared::errors::{VfkitError, VfkitResult};

/// Number of times each engine operation was invoked.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct EngineCalls {
    pub base_configs: usize,
    pub firmware_platforms: usize,
    pub identifiers: usize,
    pub generic_platforms: usize,
    pub nested_requests: usize,
    pub validations: usize,
    pub instances: usize,
    pub starts: usize,
    pub stops: usize,
}

impl EngineCalls {
    pub fn total(&self) -> usize {
        self.base_configs
            + self.firmware_platforms
            + self.identifiers
            + self.generic_platforms
            + self.nested_requests
            + self.validations
            + self.instances
            + self.starts
            + self.stops
    }
}

enum Validation {
    Valid,
    Invalid,
    Error(String),
}

pub(crate) struct MockEngine {
    calls: Arc<Mutex<EngineCalls>>,
    next_identifier: AtomicU64,
    validation: Validation,
    reject_nested: bool,
    fail_start: bool,
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(EngineCalls::default())),
            next_identifier: AtomicU64::new(1),
            validation: Validation::Valid,
            reject_nested: false,
            fail_start: false,
        }
    }

    /// `validate` answers `Ok(false)`.
    pub fn invalid(mut self) -> Self {
        self.validation = Validation::Invalid;
        self
    }

    /// `validate` fails with a descriptive error.
    pub fn validation_error(mut self, message: &str) -> Self {
        self.validation = Validation::Error(message.to_string());
        self
    }

    pub fn reject_nested(mut self) -> Self {
        self.reject_nested = true;
        self
    }

    /// Instances fail every `start`.
    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    pub fn calls(&self) -> EngineCalls {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, f: impl FnOnce(&mut EngineCalls)) {
        f(&mut self.calls.lock().unwrap());
    }
}

impl Engine for MockEngine {
    fn new_base_configuration(
        &self,
        bootloader: &BootLoaderConfig,
        cpu_count: u32,
        memory_size: u64,
    ) -> VfkitResult<MachineConfiguration> {
        self.record(|c| c.base_configs += 1);
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
        self.record(|c| c.firmware_platforms += 1);
        Ok(PlatformConfiguration::Firmware {
            machine_identifier: MachineIdentifier::from_bytes(b"firmware".to_vec()),
            hardware_model: identity.hardware_model_path.clone(),
            auxiliary_storage: identity.aux_image_path.clone(),
        })
    }

    fn new_generic_machine_identifier(&self) -> VfkitResult<MachineIdentifier> {
        self.record(|c| c.identifiers += 1);
        let n = self.next_identifier.fetch_add(1, Ordering::Relaxed);
        Ok(MachineIdentifier::from_bytes(n.to_be_bytes().to_vec()))
    }

    fn new_generic_platform(
        &self,
        identifier: MachineIdentifier,
    ) -> VfkitResult<PlatformConfiguration> {
        self.record(|c| c.generic_platforms += 1);
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
        self.record(|c| c.nested_requests += 1);
        if self.reject_nested {
            return Err(VfkitError::Engine(
                "nested virtualization is not supported on this host".into(),
            ));
        }
        if let PlatformConfiguration::Generic {
            nested_virtualization,
            ..
        } = platform
        {
            *nested_virtualization = enabled;
        }
        Ok(())
    }

    fn validate(&self, _config: &MachineConfiguration) -> VfkitResult<bool> {
        self.record(|c| c.validations += 1);
        match &self.validation {
            Validation::Valid => Ok(true),
            Validation::Invalid => Ok(false),
            Validation::Error(message) => Err(VfkitError::Validation(message.clone())),
        }
    }

    fn new_instance(
        &self,
        _config: Arc<MachineConfiguration>,
    ) -> VfkitResult<Box<dyn EngineInstance>> {
        self.record(|c| c.instances += 1);
        Ok(Box::new(MockInstance {
            calls: Arc::clone(&self.calls),
            state: InstanceState::Stopped,
            fail_start: self.fail_start,
        }))
    }
}

struct MockInstance {
    calls: Arc<Mutex<EngineCalls>>,
    state: InstanceState,
    fail_start: bool,
}

#[async_trait]
impl EngineInstance for MockInstance {
    async fn start(&mut self) -> VfkitResult<()> {
        self.calls.lock().unwrap().starts += 1;
        if self.fail_start {
            return Err(VfkitError::Engine("instance refused to start".into()));
        }
        self.state = InstanceState::Running;
        Ok(())
    }

    async fn stop(&mut self) -> VfkitResult<()> {
        self.calls.lock().unwrap().stops += 1;
        self.state = InstanceState::Stopped;
        Ok(())
    }

    fn state(&self) -> InstanceState {
        self.state
    }
}
