//! Plan command
//!
//! Prints the resolution chains a blur request would run, without loading
//! any image.

use crate::PlanArgs;
use anyhow::Result;
use dualblur::{plan, BlurPath, DualBlur, Resolution};
use tracing::trace;

pub fn run(args: PlanArgs, verbose: u8) -> Result<()> {
    trace!(width = args.width, height = args.height, radius = ?args.radius, scale = ?args.scale, "plan::run");

    let config = super::resolve_config(&args.config)?;
    let blur = DualBlur::new(config);

    if verbose > 0 {
        println!(
            "iterations={} reference_height={} fixed_scale={}",
            config.iterations,
            config.reference_height,
            blur.fixed_blur_scale()
        );
    }

    if let Some(scale) = args.scale {
        let steps = plan(args.width, args.height, scale);
        println!("plan {}x{} / {}:", args.width, args.height, scale);
        print_chain(&steps);
        return Ok(());
    }

    let radius = args.radius.unwrap_or(0.0);
    let preview = blur.preview(args.width, args.height, radius);

    match preview.path {
        BlurPath::Skipped => println!("path: skipped"),
        BlurPath::Fade { opacity } => println!("path: fade (scale {:.4}, opacity {:.4})", preview.scale, opacity),
        BlurPath::PreScale { scale, passes } => println!("path: pre-scale (scale {:.4}, {} pass(es))", scale, passes),
    }
    if !preview.prescale.is_empty() {
        println!("pre-scale:");
        print_chain(&preview.prescale);
    }
    if !preview.fixed.is_empty() {
        println!("fixed:");
        print_chain(&preview.fixed);
    }
    Ok(())
}

fn print_chain(steps: &[Resolution]) {
    if steps.is_empty() {
        println!("  (no passes)");
    }
    for (i, r) in steps.iter().enumerate() {
        let [tx, ty, _, _] = r.texel_size();
        println!("  {:>2}: {:>6} texel=({:.6}, {:.6})", i, r.to_string(), tx, ty);
    }
}
