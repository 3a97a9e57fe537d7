use super::DeviceContribution;
use crate::engine::{GraphicsDeviceConfig, GraphicsDisplay};
use crate::vm::MachineConfigurationBuilder;
use serde::{Deserialize, Serialize};
use vfkit_shared::errors::{VfkitError, VfkitResult};

const DEFAULT_WIDTH: u32 = 800;
const DEFAULT_HEIGHT: u32 = 600;
const PIXELS_PER_INCH: u32 = 80;

/// Virtio GPU with a single scanout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtioGpu {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
}

fn default_width() -> u32 {
    DEFAULT_WIDTH
}

fn default_height() -> u32 {
    DEFAULT_HEIGHT
}

impl Default for VirtioGpu {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }
}

impl DeviceContribution for VirtioGpu {
    fn contribute(&self, builder: &mut MachineConfigurationBuilder) -> VfkitResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(VfkitError::device(
                self.kind(),
                format!("invalid resolution {}x{}", self.width, self.height),
            ));
        }

        builder.add_graphics_device(GraphicsDeviceConfig {
            displays: vec![GraphicsDisplay {
                width: self.width,
                height: self.height,
                pixels_per_inch: PIXELS_PER_INCH,
            }],
        });
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "virtio-gpu"
    }
}
