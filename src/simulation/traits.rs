//! Backend contract shared by the serial and parallel engines
//!
//! Both engines implement the same stepping rule over the same toroidal grid;
//! callers pick one at construction and may hot-swap through
//! [`BackendSwitcher`](super::switcher::BackendSwitcher).

use super::grid::GridShape;
use crate::error::BackendError;
use std::fmt;

/// Execution strategy of a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Serial,
    Parallel,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Serial => "serial",
            BackendKind::Parallel => "parallel",
        }
    }

    /// The other strategy
    pub fn toggled(&self) -> Self {
        match self {
            BackendKind::Serial => BackendKind::Parallel,
            BackendKind::Parallel => BackendKind::Serial,
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Core trait implemented by every simulation backend
///
/// Cell coordinates are `(i, j)` = (column, row). Every mutating call leaves
/// the authoritative grid fully updated when it returns.
pub trait SimulationBackend {
    /// Strategy this backend implements
    fn kind(&self) -> BackendKind;

    /// Grid dimensions fixed at construction
    fn shape(&self) -> GridShape;

    /// Fill the grid with dead cells
    fn initialize(&mut self) -> Result<(), BackendError>;

    /// Overwrite the grid with a seeded 50/50 random state
    ///
    /// The same seed yields the same grid on every backend.
    fn initialize_random(&mut self, seed: u64) -> Result<(), BackendError>;

    /// Set one cell alive (`state != 0`) or dead
    ///
    /// Out-of-range coordinates are ignored and leave the grid unchanged.
    fn set_cell(&mut self, i: u32, j: u32, state: u8) -> Result<(), BackendError>;

    /// Advance exactly one generation
    fn step(&mut self) -> Result<(), BackendError>;

    /// Read-only view of the authoritative grid, `rows * cols` bytes
    fn grid(&mut self) -> Result<&[u8], BackendError>;

    /// Replace the whole grid from a flat `rows * cols` buffer
    fn set_grid(&mut self, cells: &[u8]) -> Result<(), BackendError>;

    /// Synchronise device state into host memory without changing it
    fn copy_grid_to_host(&mut self) -> Result<(), BackendError> {
        Ok(())
    }
}

/// Reject buffers that don't match the grid size
pub(crate) fn check_len(shape: GridShape, cells: &[u8]) -> Result<(), BackendError> {
    let expected = shape.cell_count();
    if cells.len() != expected {
        return Err(BackendError::SizeMismatch {
            expected,
            actual: cells.len(),
        });
    }
    Ok(())
}
