//! Continuous-radius dual filtering blur.
//!
//! Dual filtering (dual Kawase) only produces a handful of discrete blur
//! strengths, one per halving of resolution. This crate drives a fixed
//! downsample/upsample chain and approximates a *linear* radius on top of
//! it by pre-scaling the source resolution for large radii and alpha-fading
//! the result for small ones.
//!
//! # Architecture
//!
//! ```text
//! DualBlur (radius -> pass plan, scratch discipline)
//!     ├── resolution::plan (halving chain geometry)
//!     └── BlitPrimitives trait (host: acquire / release / blit / params)
//!             └── CpuBackend (rayon reference implementation)
//! ```
//!
//! # Example
//!
//! ```rust
//! use dualblur::{CpuBackend, CpuFilter, CpuImage, DualBlur};
//!
//! let mut backend = CpuBackend::new();
//! let mut filter = CpuFilter::default();
//! let source = CpuImage::filled(64, 64, [1.0, 0.5, 0.25, 1.0]);
//! let mut destination = source.clone();
//!
//! let mut blur = DualBlur::default();
//! blur.configure(2, 64);
//! blur.blur(&mut backend, Some(&mut filter), &source, &mut destination, 0.5)?;
//!
//! assert_eq!(backend.pool_stats().outstanding, 0);
//! # Ok::<(), dualblur::BlurError>(())
//! ```

#![warn(missing_docs)]

pub mod backend;
pub mod config;
pub mod image;
pub mod orchestrator;
pub mod resolution;

pub use backend::{
    BlitPrimitives, CpuBackend, CpuFilter, FilterParam, FilterPass, ImageHandle, PoolStats,
    ScratchPool,
};
pub use config::BlurConfig;
pub use image::CpuImage;
pub use orchestrator::{BlurPath, BlurPreview, DualBlur};
pub use resolution::{plan, PassPlan, Resolution};

use thiserror::Error;

/// Blur operation errors.
///
/// Invalid blur requests never produce an error; they are clamped or
/// skipped. Errors only come from the host primitives or from loading
/// configuration.
#[derive(Error, Debug)]
pub enum BlurError {
    /// Image dimensions are unusable.
    #[error("Invalid dimensions: {0}x{1}")]
    InvalidDimensions(u32, u32),

    /// Pixel buffer does not match the declared dimensions.
    #[error("Buffer size mismatch: expected {expected}, got {actual}")]
    BufferSizeMismatch {
        /// Expected number of floats.
        expected: usize,
        /// Actual number of floats.
        actual: usize,
    },

    /// Host could not provide a temporary image.
    #[error("Failed to allocate {width}x{height} temporary image: {reason}")]
    AllocationFailed {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
        /// Host-provided reason.
        reason: String,
    },

    /// Released scratch image matches no size the pool handed out.
    #[error("Image was not acquired from this pool")]
    ForeignImage,

    /// Configuration could not be parsed.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// I/O failure while loading configuration.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result alias used throughout the crate.
pub type BlurResult<T> = Result<T, BlurError>;
