//! Serial backend
//!
//! Single-threaded double-buffered stepping on the host. Neighbour indices
//! are wrapped once per row and column, so a step allocates nothing.

use super::grid::{self, GridShape, GridState};
use super::traits::{check_len, BackendKind, SimulationBackend};
use crate::error::BackendError;

pub struct SerialBackend {
    current: GridState,
    next: GridState,
}

impl SerialBackend {
    /// Allocate both buffers, all cells dead
    pub fn new(rows: u32, cols: u32) -> Self {
        let shape = GridShape::new(rows, cols);
        Self {
            current: GridState::new(shape),
            next: GridState::new(shape),
        }
    }

    /// Authoritative grid without going through the fallible contract
    pub fn state(&self) -> &GridState {
        &self.current
    }

    /// Compute `next` from `current`, then swap the pair
    fn advance(&mut self) {
        let GridShape { rows, cols } = self.current.shape();
        let (rows, cols) = (rows as usize, cols as usize);
        let src = self.current.cells();
        let dst = self.next.cells_mut();

        for y in 0..rows {
            let up = (y + rows - 1) % rows * cols;
            let mid = y * cols;
            let down = (y + 1) % rows * cols;
            for x in 0..cols {
                let left = (x + cols - 1) % cols;
                let right = (x + 1) % cols;
                let alive = src[up + left]
                    + src[up + x]
                    + src[up + right]
                    + src[mid + left]
                    + src[mid + right]
                    + src[down + left]
                    + src[down + x]
                    + src[down + right];
                dst[mid + x] = u8::from(alive == 3 || (alive == 2 && src[mid + x] != 0));
            }
        }

        std::mem::swap(&mut self.current, &mut self.next);
    }
}

impl SimulationBackend for SerialBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Serial
    }

    fn shape(&self) -> GridShape {
        self.current.shape()
    }

    fn initialize(&mut self) -> Result<(), BackendError> {
        self.current.cells_mut().fill(0);
        self.next.cells_mut().fill(0);
        Ok(())
    }

    fn initialize_random(&mut self, seed: u64) -> Result<(), BackendError> {
        grid::fill_random(self.current.cells_mut(), seed);
        Ok(())
    }

    fn set_cell(&mut self, i: u32, j: u32, state: u8) -> Result<(), BackendError> {
        if let Some(idx) = self.current.shape().index(i, j) {
            self.current.cells_mut()[idx] = u8::from(state != 0);
        }
        Ok(())
    }

    fn step(&mut self) -> Result<(), BackendError> {
        self.advance();
        Ok(())
    }

    fn grid(&mut self) -> Result<&[u8], BackendError> {
        Ok(self.current.cells())
    }

    fn set_grid(&mut self, cells: &[u8]) -> Result<(), BackendError> {
        check_len(self.current.shape(), cells)?;
        grid::copy_normalized(self.current.cells_mut(), cells);
        Ok(())
    }
}
