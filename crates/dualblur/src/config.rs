//! Blur configuration.
//!
//! Two knobs control the blur: the number of fixed dual filtering
//! `iterations` and the `reference_height`, the image height at which a
//! radius of 1 produces the full fixed-strength blur. Out-of-range values
//! fall back to the defaults instead of failing.
//!
//! # Sources
//!
//! Configuration can come from YAML, from the environment, or from code:
//!
//! ```yaml
//! iterations: 3
//! reference_height: 1080
//! ```
//!
//! # Environment Variables
//!
//! - `DUALBLUR_ITERATIONS` - fixed pass count
//! - `DUALBLUR_REFERENCE_HEIGHT` - reference height in pixels

use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{BlurError, BlurResult};

/// Default fixed pass count.
pub const DEFAULT_ITERATIONS: i32 = 2;

/// Default reference height in pixels.
pub const DEFAULT_REFERENCE_HEIGHT: i32 = 1024;

/// Environment variable overriding [`BlurConfig::iterations`].
pub const ENV_ITERATIONS: &str = "DUALBLUR_ITERATIONS";

/// Environment variable overriding [`BlurConfig::reference_height`].
pub const ENV_REFERENCE_HEIGHT: &str = "DUALBLUR_REFERENCE_HEIGHT";

/// Iteration count beyond which `2^iterations` stops being representable.
const MAX_ITERATIONS: i32 = 126;

/// Blur parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlurConfig {
    /// Number of fixed dual filtering passes (>= 1).
    pub iterations: i32,
    /// Height in pixels at which radius 1 equals the fixed blur strength (> 0).
    pub reference_height: i32,
}

impl Default for BlurConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            reference_height: DEFAULT_REFERENCE_HEIGHT,
        }
    }
}

impl BlurConfig {
    /// Create a configuration, replacing invalid values with defaults.
    pub fn new(iterations: i32, reference_height: i32) -> Self {
        Self { iterations, reference_height }.sanitized()
    }

    /// Copy with non-positive values replaced by their defaults.
    pub fn sanitized(self) -> Self {
        let iterations = if self.iterations >= 1 {
            self.iterations.min(MAX_ITERATIONS)
        } else {
            warn!(iterations = self.iterations, "iterations must be >= 1, using default");
            DEFAULT_ITERATIONS
        };
        let reference_height = if self.reference_height > 0 {
            self.reference_height
        } else {
            warn!(reference_height = self.reference_height, "reference height must be > 0, using default");
            DEFAULT_REFERENCE_HEIGHT
        };
        Self { iterations, reference_height }
    }

    /// Total reduction of the fixed chain, `2^iterations`.
    pub fn fixed_blur_scale(&self) -> f32 {
        2f32.powi(self.iterations)
    }

    /// `1 / reference_height`.
    pub fn reference_height_reciprocal(&self) -> f32 {
        1.0 / self.reference_height as f32
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Parse from YAML. Missing keys take their defaults.
    pub fn from_yaml_str(text: &str) -> BlurResult<Self> {
        let config: Self = serde_yaml::from_str(text)
            .map_err(|e| BlurError::Config(e.to_string()))?;
        Ok(config.sanitized())
    }

    /// Load a YAML file.
    pub fn load(path: impl AsRef<Path>) -> BlurResult<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading blur config");
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Serialize to YAML.
    pub fn to_yaml_string(&self) -> BlurResult<String> {
        serde_yaml::to_string(self).map_err(|e| BlurError::Config(e.to_string()))
    }

    /// Apply `DUALBLUR_*` environment overrides.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// Values that fail to parse are ignored.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = parse_override(&lookup, ENV_ITERATIONS) {
            self.iterations = v;
        }
        if let Some(v) = parse_override(&lookup, ENV_REFERENCE_HEIGHT) {
            self.reference_height = v;
        }
        self.sanitized()
    }
}

fn parse_override<F>(lookup: &F, key: &str) -> Option<i32>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparsable override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let c = BlurConfig::default();
        assert_eq!(c.iterations, 2);
        assert_eq!(c.reference_height, 1024);
        assert_relative_eq!(c.fixed_blur_scale(), 4.0);
        assert_relative_eq!(c.reference_height_reciprocal(), 1.0 / 1024.0);
    }

    #[test]
    fn test_invalid_falls_back() {
        assert_eq!(BlurConfig::new(0, 0), BlurConfig::default());
        assert_eq!(BlurConfig::new(-3, -1), BlurConfig::default());
        assert_eq!(BlurConfig::new(5, -1), BlurConfig { iterations: 5, reference_height: 1024 });
    }

    #[test]
    fn test_huge_iterations_clamped() {
        let c = BlurConfig::new(i32::MAX, 1080);
        assert!(c.fixed_blur_scale().is_finite());
    }

    #[test]
    fn test_yaml_partial() {
        let c = BlurConfig::from_yaml_str("iterations: 3\n").unwrap();
        assert_eq!(c.iterations, 3);
        assert_eq!(c.reference_height, 1024);
        assert_relative_eq!(c.fixed_blur_scale(), 8.0);
    }

    #[test]
    fn test_yaml_invalid_values_sanitized() {
        let c = BlurConfig::from_yaml_str("iterations: 0\nreference_height: -5\n").unwrap();
        assert_eq!(c, BlurConfig::default());
    }

    #[test]
    fn test_yaml_garbage() {
        assert!(matches!(
            BlurConfig::from_yaml_str("iterations: [1, 2"),
            Err(BlurError::Config(_))
        ));
    }

    #[test]
    fn test_yaml_roundtrip_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blur.yaml");
        let c = BlurConfig::new(4, 720);
        std::fs::write(&path, c.to_yaml_string().unwrap()).unwrap();
        assert_eq!(BlurConfig::load(&path).unwrap(), c);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            BlurConfig::load(dir.path().join("nope.yaml")),
            Err(BlurError::Io(_))
        ));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_ITERATIONS, "5"),
            (ENV_REFERENCE_HEIGHT, "not-a-number"),
        ]
        .into_iter()
        .collect();
        let c = BlurConfig::default().with_overrides(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(c.iterations, 5);
        assert_eq!(c.reference_height, 1024);
    }
}
