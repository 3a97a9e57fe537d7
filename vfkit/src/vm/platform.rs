//! Platform selection from the bootloader variant.

use crate::config::Bootloader;
use crate::engine::{Engine, PlatformConfiguration};
use vfkit_shared::errors::{VfkitError, VfkitResult};

/// Pick and construct the one platform configuration for `bootloader`.
///
/// - Firmware-identity bootloader: platform from the persisted identity
///   files. Nested virtualization is refused before the engine is touched.
/// - Any other bootloader: generic platform around a freshly generated
///   identity, with nested virtualization enabled only on request.
///
/// Nothing is returned on failure, so no partial platform can be attached.
pub fn select_platform(
    engine: &dyn Engine,
    bootloader: &Bootloader,
    nested: bool,
) -> VfkitResult<PlatformConfiguration> {
    let platform = match bootloader.firmware_identity() {
        Some(identity) => {
            if nested {
                return Err(VfkitError::Config(
                    "nested virtualization is not supported with the firmware bootloader".into(),
                ));
            }
            engine.new_firmware_platform(identity)?
        }
        None => {
            let identifier = engine.new_generic_machine_identifier().inspect_err(|e| {
                tracing::warn!(error = %e, "Failed to generate machine identifier");
            })?;
            let mut platform = engine.new_generic_platform(identifier)?;
            if nested {
                engine.set_nested_virtualization(&mut platform, true)?;
            }
            platform
        }
    };

    tracing::debug!(
        platform_type = %platform.kind(),
        machine_identifier = %platform.machine_identifier(),
        nested = platform.nested_virtualization(),
        "Selected platform"
    );

    Ok(platform)
}
