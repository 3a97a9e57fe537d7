use super::DeviceContribution;
use crate::engine::{KeyboardConfig, PointingDeviceConfig};
use crate::vm::MachineConfigurationBuilder;
use serde::{Deserialize, Serialize};
use vfkit_shared::errors::VfkitResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputDevice {
    Keyboard,
    Pointing,
}

/// USB keyboard or pointing device for graphical guests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtioInput {
    pub device: InputDevice,
}

impl DeviceContribution for VirtioInput {
    fn contribute(&self, builder: &mut MachineConfigurationBuilder) -> VfkitResult<()> {
        match self.device {
            InputDevice::Keyboard => builder.add_keyboard(KeyboardConfig),
            InputDevice::Pointing => builder.add_pointing_device(PointingDeviceConfig),
        }
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "virtio-input"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::test_builder;

    #[test]
    fn test_keyboard_and_pointing_go_to_separate_categories() {
        let mut builder = test_builder();
        for device in [InputDevice::Keyboard, InputDevice::Pointing, InputDevice::Pointing] {
            VirtioInput { device }.contribute(&mut builder).unwrap();
        }

        assert_eq!(builder.keyboards().len(), 1);
        assert_eq!(builder.pointing_devices().len(), 2);
    }
}
