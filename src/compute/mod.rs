//! GPU compute plumbing for the parallel backend
//!
//! Device context, the stepping kernel and its work distribution.

pub mod context;
pub mod kernel;
pub mod work;

pub use context::ComputeContext;
pub use kernel::{LifeKernel, LifeParams};
pub use work::WorkSizes;
