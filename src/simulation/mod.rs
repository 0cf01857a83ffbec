// src/simulation/mod.rs
//! Simulation system
//!
//! Two engines stepping the same toroidal Game of Life grid, a serial one on
//! the host and a parallel one on the GPU, plus the switcher and session
//! manager that drive them.

pub mod cpu;
pub mod gpu;
pub mod grid;
pub mod manager;
pub mod patterns;
pub mod publication;
pub mod switcher;
pub mod traits;

pub use cpu::SerialBackend;
pub use gpu::ParallelBackend;
pub use grid::{GridShape, GridState};
pub use manager::{CellEdit, SimulationManager, StepClock};
pub use patterns::LifePattern;
pub use publication::{PublicationBuffer, PublicationHandle, RenderAccess, SimulationAccess};
pub use switcher::BackendSwitcher;
pub use traits::{BackendKind, SimulationBackend};
