//! Shape engine configuration.
//!
//! Settings come from code or from the environment:
//!
//! - `TILENORM_ZERO_THRESHOLD`: zero threshold for scaled tile norms
//!   (default: `f32::EPSILON`)

use crate::error::{ShapeError, ShapeResult};
use crate::norm_tensor::NormScalar;
use crate::threshold::Threshold;

/// Environment variable holding the zero threshold.
pub const ZERO_THRESHOLD_ENV: &str = "TILENORM_ZERO_THRESHOLD";

/// Configuration for building shapes
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShapeConfig {
    /// Scaled norms strictly below this value are treated as zero
    pub zero_threshold: f64,
}

impl Default for ShapeConfig {
    fn default() -> Self {
        Self {
            zero_threshold: f32::EPSILON as f64,
        }
    }
}

impl ShapeConfig {
    /// Read the configuration from the environment, falling back to defaults
    /// for unset variables.
    ///
    /// # Errors
    ///
    /// Returns [`ShapeError::InvalidThreshold`] when the variable is set but
    /// does not parse as a finite, nonnegative number.
    pub fn from_env() -> ShapeResult<Self> {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var(ZERO_THRESHOLD_ENV) {
            config.zero_threshold = parse_threshold(&raw)?;
        }
        Ok(config)
    }

    pub fn with_zero_threshold(mut self, zero_threshold: f64) -> Self {
        self.zero_threshold = zero_threshold;
        self
    }

    /// Threshold policy for norms of type `T`.
    pub fn threshold<T: NormScalar>(&self) -> ShapeResult<Threshold<T>> {
        let value = T::from_f64(self.zero_threshold)
            .ok_or(ShapeError::InvalidThreshold(self.zero_threshold))?;
        Threshold::new(value)
    }
}

fn parse_threshold(raw: &str) -> ShapeResult<f64> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| ShapeError::InvalidThreshold(f64::NAN))?;
    if !value.is_finite() || value < 0.0 {
        return Err(ShapeError::InvalidThreshold(value));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_threshold() {
        let config = ShapeConfig::default();
        let t: Threshold<f32> = config.threshold().unwrap();
        assert_eq!(t.value(), f32::EPSILON);
    }

    #[test]
    fn test_builder() {
        let t: Threshold<f64> = ShapeConfig::default()
            .with_zero_threshold(1e-6)
            .threshold()
            .unwrap();
        assert_eq!(t.value(), 1e-6);
    }

    #[test]
    fn test_parse_threshold() {
        assert_eq!(parse_threshold(" 1e-8 ").unwrap(), 1e-8);
        assert!(parse_threshold("abc").is_err());
        assert!(parse_threshold("-1").is_err());
        assert!(parse_threshold("inf").is_err());
    }

    #[test]
    fn test_negative_config_rejected() {
        let config = ShapeConfig::default().with_zero_threshold(-0.5);
        assert!(config.threshold::<f64>().is_err());
    }
}
