use super::DeviceContribution;
use crate::engine::EntropyDeviceConfig;
use crate::vm::MachineConfigurationBuilder;
use vfkit_shared::errors::VfkitResult;

/// Virtio entropy source backed by the host RNG.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtioRng;

impl DeviceContribution for VirtioRng {
    fn contribute(&self, builder: &mut MachineConfigurationBuilder) -> VfkitResult<()> {
        builder.add_entropy_device(EntropyDeviceConfig);
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "virtio-rng"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::test_builder;

    #[test]
    fn test_adds_entropy_device() {
        let mut builder = test_builder();
        VirtioRng.contribute(&mut builder).unwrap();
        assert_eq!(builder.entropy_devices().len(), 1);
    }
}
