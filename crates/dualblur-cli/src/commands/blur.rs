//! Blur command
//!
//! Loads an image, runs the dual filtering blur on the CPU backend and
//! writes the result.

use crate::BlurArgs;
use anyhow::Result;
use dualblur::{BlurPath, CpuBackend, CpuFilter, DualBlur};
use std::time::Instant;
use tracing::{info, trace};

pub fn run(args: BlurArgs, verbose: u8) -> Result<()> {
    trace!(input = %args.input.display(), radius = args.radius, "blur::run");

    let config = super::resolve_config(&args.config)?;
    let source = super::load_image(&args.input)?;
    let blur = DualBlur::new(config);

    // The fade path blends over the destination, so start from the source
    let mut destination = source.clone();
    let mut backend = CpuBackend::new();
    let mut filter = CpuFilter::default();

    let started = Instant::now();
    let path = blur.blur(&mut backend, Some(&mut filter), &source, &mut destination, args.radius)?;
    let elapsed = started.elapsed();

    info!(?path, w = source.width, h = source.height, ms = elapsed.as_millis() as u64, "blur done");

    if verbose > 0 {
        println!(
            "{}: {}x{} radius={} -> {}",
            args.input.display(),
            source.width,
            source.height,
            args.radius,
            describe(path)
        );
        println!("Took {:.1} ms", elapsed.as_secs_f64() * 1000.0);
    }
    if args.stats {
        println!("Pool: {}", backend.pool_stats());
    }

    super::save_image(&args.output, destination)?;

    if verbose > 0 {
        println!("Wrote {}", args.output.display());
    }
    Ok(())
}

fn describe(path: BlurPath) -> String {
    match path {
        BlurPath::Skipped => "skipped (nothing to blur)".to_string(),
        BlurPath::Fade { opacity } => format!("fade, opacity {:.3}", opacity),
        BlurPath::PreScale { scale, passes } => {
            format!("pre-scale x{:.3} over {} pass(es)", scale, passes)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe() {
        assert!(describe(BlurPath::Skipped).starts_with("skipped"));
        assert_eq!(describe(BlurPath::Fade { opacity: 0.5 }), "fade, opacity 0.500");
        assert_eq!(
            describe(BlurPath::PreScale { scale: 4.0, passes: 2 }),
            "pre-scale x4.000 over 2 pass(es)"
        );
    }
}
