//! # Toroid Prelude
//!
//! Commonly used types and traits in one import.
//!
//! ```no_run
//! use toroid::prelude::*;
//! use std::time::Duration;
//!
//! fn main() -> Result<(), BackendError> {
//!     let config = SimulationConfig::new()
//!         .with_size(64, 64)
//!         .with_step_rate(StepRate::Unbounded)
//!         .with_auto_run(true);
//!     let mut manager = SimulationManager::new(config)?;
//!
//!     manager.load_pattern(LifePattern::Glider)?;
//!     manager.frame(Duration::from_millis(16))?;
//!     manager.toggle_backend()?;
//!     Ok(())
//! }
//! ```

// Configuration and errors
pub use crate::config::{ConfigError, SimulationConfig, StepRate};
pub use crate::error::{BackendError, Holder, SyncError};

// Backends and session
pub use crate::simulation::{
    BackendKind, BackendSwitcher, CellEdit, GridShape, GridState, LifePattern, ParallelBackend,
    SerialBackend, SimulationBackend, SimulationManager,
};

// Publication to the renderer
pub use crate::simulation::{PublicationBuffer, PublicationHandle, RenderAccess};

// GPU context
pub use crate::compute::ComputeContext;
