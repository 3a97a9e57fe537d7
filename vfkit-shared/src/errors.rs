//! Error types for vfkit.
//!
//! Messages are lowercase and carry the failing entity when one is known.
//! Backend errors pass through untouched; vfkit only adds context when the
//! backend gives none (see [`VfkitError::InvalidConfiguration`]).

use thiserror::Error;

/// Result type alias using [`VfkitError`].
pub type VfkitResult<T> = Result<T, VfkitError>;

#[derive(Error, Debug)]
pub enum VfkitError {
    /// Unsupported or contradictory combination of spec fields.
    #[error("configuration error: {0}")]
    Config(String),

    /// The engine rejected a parameter while constructing an object.
    #[error("engine construction failed: {0}")]
    Engine(String),

    /// Engine validation failed and explained why.
    #[error("configuration validation failed: {0}")]
    Validation(String),

    /// Engine validation reported an invalid configuration without a cause.
    #[error("invalid virtual machine configuration")]
    InvalidConfiguration,

    /// A device failed to convert itself into its engine form.
    #[error("{device} device: {message}")]
    Device { device: String, message: String },

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl VfkitError {
    /// Shorthand for [`VfkitError::Device`].
    pub fn device(device: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Device {
            device: device.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_configuration_message() {
        assert_eq!(
            VfkitError::InvalidConfiguration.to_string(),
            "invalid virtual machine configuration"
        );
    }

    #[test]
    fn test_device_error_names_device() {
        let err = VfkitError::device("virtio-blk", "image not found: /tmp/x.img");
        assert_eq!(err.to_string(), "virtio-blk device: image not found: /tmp/x.img");
    }
}
