//! Host backends for the blur passes.
//!
//! # Architecture
//!
//! ```text
//! DualBlur<H: BlitPrimitives>
//!     +-- CpuBackend (rayon, ScratchPool)
//!     +-- any host renderer implementing BlitPrimitives
//! ```

mod cpu_backend;
mod pool;
mod primitives;

pub use cpu_backend::{CpuBackend, CpuFilter};
pub use pool::{PoolStats, ScratchPool, DEFAULT_MAX_IDLE};
pub use primitives::{BlitPrimitives, FilterParam, FilterPass, ImageHandle};
