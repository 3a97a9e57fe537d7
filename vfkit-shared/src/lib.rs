//! Types shared across vfkit crates.

pub mod errors;

pub use errors::{VfkitError, VfkitResult};
