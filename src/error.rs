//! Error types shared by both simulation backends

use crate::config::ConfigError;
use crate::simulation::BackendKind;
use thiserror::Error;

/// Errors raised while constructing or driving a simulation backend
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("no compatible GPU adapter: {0}")]
    NoAdapter(#[from] wgpu::RequestAdapterError),

    #[error("failed to open GPU device: {0}")]
    NoDevice(#[from] wgpu::RequestDeviceError),

    #[error("adapter '{0}' does not support compute shaders")]
    ComputeUnsupported(String),

    #[error("life kernel failed to compile: {0}")]
    KernelCompilation(String),

    #[error("grid of {cells} cells exceeds the device limit of {max_cells} cells")]
    GridTooLarge { cells: usize, max_cells: usize },

    #[error("device error: {0}")]
    Device(String),

    #[error("failed to read grid back from the device: {0}")]
    Readback(String),

    #[error("grid buffer holds {actual} cells, expected {expected}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("publication buffer must allow COPY_DST")]
    PublicationUsage,

    #[error("{0} backend is not available")]
    Unavailable(BackendKind),

    #[error(transparent)]
    Sync(#[from] SyncError),
}

/// Violations of the publication buffer hand-off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("publication buffer is held by the {0}")]
    Busy(Holder),
}

/// Which execution domain currently owns the publication buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Holder {
    Simulation,
    Renderer,
}

impl std::fmt::Display for Holder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Holder::Simulation => f.write_str("simulation"),
            Holder::Renderer => f.write_str("renderer"),
        }
    }
}
