//! Blur orchestration.
//!
//! [`DualBlur`] turns a continuous blur radius into a sequence of blits.
//!
//! # Strategy
//!
//! The radius is first normalized against the configured reference height:
//!
//! ```text
//! scale = radius * source_height / reference_height
//! ```
//!
//! - **Fade** (`scale <= 1`): the fixed dual filtering chain runs once at
//!   full resolution and its final upsample is alpha-blended over the
//!   destination with `opacity = scale`. Only an approximation of a smaller
//!   radius; it holds up best with few iterations.
//! - **Pre-scale** (`scale > 1`): the source is shrunk by `scale` with plain
//!   copies, filtered by the fixed chain at that working size, then grown
//!   back with plain copies and written into the destination.
//!
//! # Scratch discipline
//!
//! Each step acquires the next scratch image, blits into it, then releases
//! the previous one, so at most two scratch images exist at any instant.
//! The pre-scale path acquires its working-size output only after the fixed
//! chain has already freed the shrunk source.

use tracing::{debug, trace, warn};

use crate::backend::{BlitPrimitives, FilterParam, FilterPass, ImageHandle};
use crate::config::BlurConfig;
use crate::resolution::{plan, PassPlan, Resolution};
use crate::BlurResult;

/// Strategy taken by one [`DualBlur::blur`] call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BlurPath {
    /// Nothing was drawn.
    Skipped,
    /// Full-resolution fixed chain, final pass faded by `opacity`.
    Fade {
        /// Final-pass opacity (equal to the normalized scale).
        opacity: f32,
    },
    /// Resolution pre-scaling around the fixed chain.
    PreScale {
        /// Total size reduction.
        scale: f32,
        /// Number of pre-scale passes.
        passes: usize,
    },
}

/// Pass plans a blur request would execute, without drawing anything.
#[derive(Debug, Clone, PartialEq)]
pub struct BlurPreview {
    /// Strategy.
    pub path: BlurPath,
    /// Normalized scale (0 when skipped).
    pub scale: f32,
    /// Plain-copy shrink chain (pre-scale path only).
    pub prescale: PassPlan,
    /// Fixed dual filtering chain, from the working resolution.
    pub fixed: PassPlan,
}

/// Image currently feeding the next pass.
///
/// Either the caller's source (never released) or a scratch image owned by
/// this blur call.
enum Current<'a, I> {
    Borrowed(&'a I),
    Scratch(I),
}

impl<I> Current<'_, I> {
    fn image(&self) -> &I {
        match self {
            Current::Borrowed(img) => img,
            Current::Scratch(img) => img,
        }
    }
}

/// Continuous-radius dual filtering blur.
#[derive(Debug, Clone)]
pub struct DualBlur {
    config: BlurConfig,
    fixed_blur_scale: f32,
    reference_height_reciprocal: f32,
}

impl Default for DualBlur {
    fn default() -> Self {
        Self::new(BlurConfig::default())
    }
}

impl DualBlur {
    /// Create from a configuration.
    pub fn new(config: BlurConfig) -> Self {
        let mut blur = Self {
            config,
            fixed_blur_scale: 0.0,
            reference_height_reciprocal: 0.0,
        };
        blur.apply(config);
        blur
    }

    /// Change the configuration for subsequent blurs.
    ///
    /// `iterations < 1` and `reference_height <= 0` fall back to the
    /// defaults (2 and 1024).
    pub fn configure(&mut self, iterations: i32, reference_height: i32) {
        self.apply(BlurConfig::new(iterations, reference_height));
    }

    fn apply(&mut self, config: BlurConfig) {
        let config = config.sanitized();
        self.config = config;
        self.fixed_blur_scale = config.fixed_blur_scale();
        self.reference_height_reciprocal = config.reference_height_reciprocal();
        debug!(
            iterations = config.iterations,
            reference_height = config.reference_height,
            fixed_blur_scale = self.fixed_blur_scale,
            "blur configured"
        );
    }

    /// Active configuration.
    pub fn config(&self) -> BlurConfig {
        self.config
    }

    /// `2^iterations`.
    pub fn fixed_blur_scale(&self) -> f32 {
        self.fixed_blur_scale
    }

    /// `1 / reference_height`.
    pub fn reference_height_reciprocal(&self) -> f32 {
        self.reference_height_reciprocal
    }

    /// Normalized scale for a radius applied to an image `source_height` tall.
    pub fn scale_for(&self, source_height: u32, radius: f32) -> f32 {
        radius * (source_height as f32 * self.reference_height_reciprocal)
    }

    /// Strategy for a request, or `None` when the request is a no-op.
    fn choose(&self, source: Resolution, radius: f32) -> Option<(BlurPath, f32)> {
        if !radius.is_finite() {
            warn!(radius, "ignoring non-finite blur radius");
            return None;
        }
        let radius = radius.max(0.0);
        if radius == 0.0 || source.area() == 0 {
            return None;
        }

        let mut scale = self.scale_for(source.height, radius);
        if !scale.is_finite() {
            // Huge finite radii overflow; saturate so the plan still reaches 1x1
            debug!(radius, "blur scale overflowed, saturating");
            scale = f32::MAX;
        }
        if scale <= 1.0 {
            Some((BlurPath::Fade { opacity: scale }, scale))
        } else {
            let passes = crate::resolution::pass_count(scale);
            Some((BlurPath::PreScale { scale, passes }, scale))
        }
    }

    /// Describe the passes a blur of a `width`x`height` image would run.
    pub fn preview(&self, width: u32, height: u32, radius: f32) -> BlurPreview {
        let source = Resolution::new(width, height);
        match self.choose(source, radius) {
            None => BlurPreview {
                path: BlurPath::Skipped,
                scale: 0.0,
                prescale: PassPlan::new(),
                fixed: PassPlan::new(),
            },
            Some((path @ BlurPath::PreScale { .. }, scale)) => {
                let prescale = plan(width, height, scale);
                let working = prescale.last().copied().unwrap_or(source);
                BlurPreview {
                    path,
                    scale,
                    fixed: plan(working.width, working.height, self.fixed_blur_scale),
                    prescale,
                }
            }
            Some((path, scale)) => BlurPreview {
                path,
                scale,
                prescale: PassPlan::new(),
                fixed: plan(width, height, self.fixed_blur_scale),
            },
        }
    }

    /// Blur `source` into `destination` with a continuous `radius`.
    ///
    /// A missing `filter`, a radius that clamps to 0, or a non-finite radius
    /// leaves `destination` untouched. On the fade path the final pass
    /// blends over whatever `destination` already holds, so callers
    /// normally copy the source into it first.
    ///
    /// Every scratch image acquired from `host` is released before
    /// returning, including on error.
    pub fn blur<H: BlitPrimitives>(
        &self,
        host: &mut H,
        filter: Option<&mut H::Filter>,
        source: &H::Image,
        destination: &mut H::Image,
        radius: f32,
    ) -> BlurResult<BlurPath> {
        let src_res = source.resolution();
        trace!(radius, src = %src_res, dst = %destination.resolution(), backend = host.name(), "DualBlur::blur");

        let Some(filter) = filter else {
            debug!("no filter, skipping blur");
            return Ok(BlurPath::Skipped);
        };
        let Some((path, scale)) = self.choose(src_res, radius) else {
            return Ok(BlurPath::Skipped);
        };

        match path {
            BlurPath::Fade { opacity } => {
                debug!(scale, opacity, "fade path");
                let filtered = filter_chain(host, filter, Current::Borrowed(source), self.fixed_blur_scale)?;
                final_pass(host, filter, filtered, destination, opacity)?;
            }
            BlurPath::PreScale { .. } => {
                let prescale = plan(src_res.width, src_res.height, scale);
                let working = prescale.last().copied().unwrap_or(src_res);
                debug!(scale, passes = prescale.len(), working = %working, "pre-scale path");

                // Shrink to the working size
                let shrunk = sweep(host, Current::Borrowed(source), prescale.iter().copied(), None)?;
                let filtered = filter_chain(host, filter, shrunk, self.fixed_blur_scale)?;

                let mut output = match host.acquire_temporary(working.width, working.height) {
                    Ok(img) => img,
                    Err(e) => {
                        discard(host, filtered);
                        return Err(e);
                    }
                };
                if let Err(e) = final_pass(host, filter, filtered, &mut output, 1.0) {
                    discard(host, Current::Scratch(output));
                    return Err(e);
                }

                // Grow back, skipping the working size itself
                let grown = sweep(host, Current::Scratch(output), prescale.iter().rev().skip(1).copied(), None)?;
                let copied = host.blit(grown.image(), destination, None);
                release(host, grown)?;
                copied?;
            }
            BlurPath::Skipped => {}
        }

        Ok(path)
    }
}

// =============================================================================
// Pass helpers
// =============================================================================

/// Fixed dual filtering chain: downsample sweep then upsample sweep.
///
/// Stops one level short of the input size; [`final_pass`] draws the last
/// upsample into its real target.
fn filter_chain<'a, H: BlitPrimitives>(
    host: &mut H,
    filter: &mut H::Filter,
    source: Current<'a, H::Image>,
    fixed_blur_scale: f32,
) -> BlurResult<Current<'a, H::Image>> {
    let start = source.image().resolution();
    let steps = plan(start.width, start.height, fixed_blur_scale);
    trace!(start = %start, passes = steps.len(), "filter chain");

    let down = sweep(host, source, steps.iter().copied(), Some((&mut *filter, FilterPass::Downsample)))?;
    sweep(host, down, steps.iter().rev().skip(1).copied(), Some((filter, FilterPass::Upsample)))
}

/// Last upsample into `target`, faded when `opacity < 1`.
///
/// Consumes and releases `current`.
fn final_pass<H: BlitPrimitives>(
    host: &mut H,
    filter: &mut H::Filter,
    current: Current<'_, H::Image>,
    target: &mut H::Image,
    opacity: f32,
) -> BlurResult<()> {
    host.set_filter_vector(filter, FilterParam::TexelSize, target.resolution().texel_size());
    let pass = if opacity < 1.0 {
        host.set_filter_scalar(filter, FilterParam::Opacity, opacity);
        FilterPass::UpsampleWithOpacity
    } else {
        FilterPass::Upsample
    };

    let drawn = host.blit(current.image(), target, Some((&*filter, pass)));
    release(host, current)?;
    drawn
}

/// Render through `steps`, swapping scratch images at each one.
///
/// With a filter the texel size of each target is set before its blit;
/// without one every step is a plain copy.
fn sweep<'a, H, I>(
    host: &mut H,
    mut current: Current<'a, H::Image>,
    steps: I,
    mut filter: Option<(&mut H::Filter, FilterPass)>,
) -> BlurResult<Current<'a, H::Image>>
where
    H: BlitPrimitives,
    I: Iterator<Item = Resolution>,
{
    for target in steps {
        let pass = match filter.as_mut() {
            Some((f, pass)) => {
                host.set_filter_vector(&mut **f, FilterParam::TexelSize, target.texel_size());
                Some((&**f, *pass))
            }
            None => None,
        };
        current = render_swap(host, current, target, pass)?;
    }
    Ok(current)
}

/// Acquire `target`, blit `current` into it, release `current`.
///
/// On failure both images are returned to the host before the error
/// propagates.
fn render_swap<'a, H: BlitPrimitives>(
    host: &mut H,
    current: Current<'a, H::Image>,
    target: Resolution,
    filter: Option<(&H::Filter, FilterPass)>,
) -> BlurResult<Current<'a, H::Image>> {
    let mut next = match host.acquire_temporary(target.width, target.height) {
        Ok(img) => img,
        Err(e) => {
            discard(host, current);
            return Err(e);
        }
    };

    if let Err(e) = host.blit(current.image(), &mut next, filter) {
        discard(host, current);
        discard(host, Current::Scratch(next));
        return Err(e);
    }

    if let Err(e) = release(host, current) {
        discard(host, Current::Scratch(next));
        return Err(e);
    }
    Ok(Current::Scratch(next))
}

fn release<H: BlitPrimitives>(host: &mut H, current: Current<'_, H::Image>) -> BlurResult<()> {
    match current {
        Current::Scratch(img) => host.release_temporary(img),
        Current::Borrowed(_) => Ok(()),
    }
}

/// Release on an error path, where a second failure is only logged.
fn discard<H: BlitPrimitives>(host: &mut H, current: Current<'_, H::Image>) {
    if let Err(e) = release(host, current) {
        warn!(error = %e, "failed to release scratch image");
    }
}
