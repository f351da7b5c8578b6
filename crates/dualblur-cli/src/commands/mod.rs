//! CLI command implementations

pub mod blur;
pub mod plan;

use crate::ConfigArgs;
use anyhow::{Context, Result};
use dualblur::{BlurConfig, CpuImage};
use std::path::Path;
use tracing::debug;

/// Resolve blur settings: defaults < config file < environment < flags.
pub fn resolve_config(args: &ConfigArgs) -> Result<BlurConfig> {
    let mut config = match &args.config {
        Some(path) => BlurConfig::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => BlurConfig::default(),
    };
    config = config.with_env_overrides();

    if let Some(iterations) = args.iterations {
        config.iterations = iterations;
    }
    if let Some(reference_height) = args.reference_height {
        config.reference_height = reference_height;
    }
    let config = config.sanitized();
    debug!(iterations = config.iterations, reference_height = config.reference_height, "resolved config");
    Ok(config)
}

/// Load image from path as RGBA f32
pub fn load_image(path: &Path) -> Result<CpuImage> {
    let decoded = image::open(path)
        .with_context(|| format!("Failed to load: {}", path.display()))?;
    let rgba = decoded.to_rgba32f();
    let (width, height) = rgba.dimensions();
    CpuImage::from_f32(rgba.into_raw(), width, height)
        .with_context(|| format!("Unusable image: {}", path.display()))
}

/// Save image to path, format chosen by extension
pub fn save_image(path: &Path, img: CpuImage) -> Result<()> {
    let (width, height) = (img.width, img.height);
    let buffer = image::Rgba32FImage::from_raw(width, height, img.into_data())
        .context("Pixel buffer does not match image size")?;
    let out = image::DynamicImage::ImageRgba32F(buffer);
    let is_float = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("exr"));

    let result = if is_float {
        out.save(path)
    } else {
        out.to_rgba8().save(path)
    };
    result.with_context(|| format!("Failed to save: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args(config: Option<std::path::PathBuf>) -> ConfigArgs {
        ConfigArgs { iterations: None, reference_height: None, config }
    }

    #[test]
    fn test_flags_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "iterations: 4\nreference_height: 720").unwrap();

        let from_file = resolve_config(&args(Some(file.path().to_path_buf()))).unwrap();
        assert_eq!(from_file.reference_height, 720);

        let mut with_flags = args(Some(file.path().to_path_buf()));
        with_flags.reference_height = Some(480);
        let resolved = resolve_config(&with_flags).unwrap();
        assert_eq!(resolved.reference_height, 480);
    }

    #[test]
    fn test_bad_flags_are_sanitized() {
        let mut bad = args(None);
        bad.iterations = Some(0);
        bad.reference_height = Some(-5);
        let resolved = resolve_config(&bad).unwrap();
        assert_eq!(resolved, BlurConfig::default());
    }

    #[test]
    fn test_missing_config_file() {
        let missing = args(Some("/nonexistent/dualblur.yaml".into()));
        assert!(resolve_config(&missing).is_err());
    }

    #[test]
    fn test_png_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let img = CpuImage::filled(8, 4, [1.0, 0.0, 0.0, 1.0]);

        save_image(&path, img.clone()).unwrap();
        let loaded = load_image(&path).unwrap();
        assert_eq!(loaded, img);
        assert_eq!((loaded.width, loaded.height), (8, 4));
        assert_eq!(loaded.pixel(3, 2).unwrap(), [1.0, 0.0, 0.0, 1.0]);
    }
}
