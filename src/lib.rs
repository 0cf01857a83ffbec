// src/lib.rs
//! Toroid
//!
//! Conway's Game of Life on a torus with a serial CPU backend and a parallel
//! wgpu compute backend that can be swapped at runtime without losing state.
//! The parallel backend publishes every generation into a GPU buffer the
//! rendering side draws from directly.

pub mod compute;
pub mod config;
pub mod error;
pub mod prelude;
pub mod simulation;
pub mod wgpu_utils;

pub use config::SimulationConfig;
pub use error::BackendError;
pub use simulation::SimulationManager;

/// Session on the shared GPU context with the default configuration
pub fn default() -> Result<SimulationManager, BackendError> {
    SimulationManager::new(SimulationConfig::default())
}
