//! Simulation configuration
//!
//! Builder-style settings for grid dimensions, step rate and the initial
//! execution strategy.

use crate::simulation::BackendKind;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("grid must have at least one row and one column (got {rows}x{cols})")]
    EmptyGrid { rows: u32, cols: u32 },

    #[error("grid of {rows}x{cols} cells overflows the address space")]
    Overflow { rows: u32, cols: u32 },
}

/// Target stepping speed of the frame loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepRate {
    /// At most `n` generations per second. Zero never steps.
    PerSecond(u32),
    /// One generation every frame
    Unbounded,
}

impl StepRate {
    /// Time between generations, `None` when the rate never steps
    pub fn period(&self) -> Option<Duration> {
        match self {
            StepRate::PerSecond(0) => None,
            StepRate::PerSecond(n) => Some(Duration::from_nanos(1_000_000_000 / *n as u64)),
            StepRate::Unbounded => Some(Duration::ZERO),
        }
    }
}

impl Default for StepRate {
    fn default() -> Self {
        StepRate::PerSecond(5)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub rows: u32,
    pub cols: u32,
    pub step_rate: StepRate,
    pub backend: BackendKind,
    pub seed: u64,
    pub auto_run: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            rows: 108,
            cols: 192,
            step_rate: StepRate::default(),
            backend: BackendKind::Parallel,
            seed: 123,
            auto_run: false,
        }
    }
}

impl SimulationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_size(mut self, rows: u32, cols: u32) -> Self {
        self.rows = rows;
        self.cols = cols;
        self
    }

    pub fn with_step_rate(mut self, rate: StepRate) -> Self {
        self.step_rate = rate;
        self
    }

    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_auto_run(mut self, auto_run: bool) -> Self {
        self.auto_run = auto_run;
        self
    }

    /// Check the dimensions before any backend is allocated
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (rows, cols) = (self.rows, self.cols);
        if rows == 0 || cols == 0 {
            return Err(ConfigError::EmptyGrid { rows, cols });
        }
        (rows as usize)
            .checked_mul(cols as usize)
            .filter(|cells| *cells <= isize::MAX as usize)
            .map(|_| ())
            .ok_or(ConfigError::Overflow { rows, cols })
    }
}
