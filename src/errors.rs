//! Error Types
//!
//! The main error type [`VesperError`] covers the failure modes that are
//! reported to the caller: GPU initialization, probe baking and GPU readback.
//!
//! Missing scene resources (geometry, material, texture, shader program) are
//! deliberately *not* errors: the affected draw call is skipped and a warning
//! is logged, so a half-loaded scene still renders.

use thiserror::Error;

/// The main error type for the Vesper renderer core.
#[derive(Error, Debug)]
pub enum VesperError {
    /// Failed to request a compatible GPU adapter.
    #[error("Failed to request WGPU adapter: {0}")]
    AdapterRequestFailed(String),

    /// Failed to create the GPU device.
    #[error("Failed to create WGPU device: {0}")]
    DeviceCreateFailed(#[from] wgpu::RequestDeviceError),

    /// A blocking GPU readback (probe baking) failed.
    #[error("GPU readback failed: {0}")]
    ReadbackFailed(String),

    /// The irradiance probe grid description is unusable.
    #[error("Invalid probe grid: {0}")]
    InvalidProbeGrid(String),
}

/// Alias for `Result<T, VesperError>`.
pub type Result<T> = std::result::Result<T, VesperError>;
