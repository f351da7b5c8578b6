//! Pass-resolution planning.
//!
//! A dual filtering chain shrinks the image by at most 2x per pass. Given a
//! start size and a total reduction factor, [`plan`] produces every
//! intermediate size the chain passes through. Fractional residual factors
//! (e.g. the trailing 1.5 of a 3x reduction) become a single final step.
//!
//! # Example
//!
//! ```rust
//! use dualblur::resolution::plan;
//!
//! let steps = plan(1920, 1080, 3.0);
//! assert_eq!(steps.len(), 2);
//! assert_eq!((steps[0].width, steps[0].height), (960, 540));
//! assert_eq!((steps[1].width, steps[1].height), (640, 360));
//! ```

use std::fmt;

/// Largest reduction a single pass may apply.
pub const MAX_STEP: f64 = 2.0;

/// Integer image size, rounded up from a fractional size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Resolution {
    /// Create from exact integer dimensions.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Create from fractional dimensions, rounding each up.
    ///
    /// Negative and NaN inputs collapse to zero.
    pub fn from_f64(width: f64, height: f64) -> Self {
        Self {
            width: ceil_to_u32(width),
            height: ceil_to_u32(height),
        }
    }

    /// Horizontal texel size, `1 / width` or 0 for a degenerate width.
    #[inline]
    pub fn texel_width(&self) -> f32 {
        if self.width > 0 { 1.0 / self.width as f32 } else { 0.0 }
    }

    /// Vertical texel size, `1 / height` or 0 for a degenerate height.
    #[inline]
    pub fn texel_height(&self) -> f32 {
        if self.height > 0 { 1.0 / self.height as f32 } else { 0.0 }
    }

    /// Texel-size shader vector: `[1/w, 1/h, w, h]`.
    pub fn texel_size(&self) -> [f32; 4] {
        [
            self.texel_width(),
            self.texel_height(),
            self.width as f32,
            self.height as f32,
        ]
    }

    /// Pixel count.
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[inline]
fn ceil_to_u32(v: f64) -> u32 {
    // `as` saturates, NaN becomes 0
    v.ceil().max(0.0) as u32
}

/// Ordered sequence of resolutions for one halving chain.
pub type PassPlan = Vec<Resolution>;

/// Plan the halving chain that reduces `width`x`height` by `scale`.
///
/// Each step divides the running (fractional) size by
/// `min(remaining, 2.0)` and records the size rounded up. A `scale` of 1 or
/// less, or a non-finite one, yields an empty plan.
pub fn plan(width: u32, height: u32, scale: f32) -> PassPlan {
    let mut passes = PassPlan::new();
    if !scale.is_finite() {
        return passes;
    }

    let mut remaining = scale as f64;
    let mut w = width as f64;
    let mut h = height as f64;

    while remaining > 1.0 {
        let step = remaining.min(MAX_STEP);
        let inv = 1.0 / step;
        w *= inv;
        h *= inv;
        passes.push(Resolution::from_f64(w, h));
        remaining /= step;
    }

    passes
}

/// Number of passes [`plan`] would produce for `scale`, without computing sizes.
pub fn pass_count(scale: f32) -> usize {
    if !scale.is_finite() {
        return 0;
    }
    let mut remaining = scale as f64;
    let mut count = 0;
    while remaining > 1.0 {
        remaining /= remaining.min(MAX_STEP);
        count += 1;
    }
    count
}
