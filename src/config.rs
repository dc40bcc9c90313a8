use std::time::Duration;
use thiserror::Error;

/// Tunables for the lane detection pipeline.
///
/// Built once at startup and shared read-only by every frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Minimum per-channel intensity, as a fraction of 255, for a pixel to count as white
    pub white_thres: f64,
    /// Sobel aperture used by the edge detector (3, 5 or 7)
    pub kernel_size: u32,
    /// Upper Canny threshold is `low_canny * canny_ratio`
    pub canny_ratio: f64,
    /// Lower Canny threshold
    pub low_canny: f64,
    /// Horizontal inset of the region of interest, as a fraction of the width
    pub w_perc: f64,
    /// Top of the region of interest, as a fraction of the height
    pub h_perc: f64,
    /// Minimum accepted segment extent in pixels
    pub min_line_dist: f64,
    /// Maximum gap in pixels bridged while walking a line
    pub max_line_dist: f64,
    /// Pause after each frame while the sink refreshes and polls for cancellation
    pub pause_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            white_thres: 0.9,
            kernel_size: 3,
            canny_ratio: 3.0,
            low_canny: 50.0,
            w_perc: 0.20,
            h_perc: 0.6,
            min_line_dist: 100.0,
            max_line_dist: 200.0,
            pause_ms: 1,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be within [0, 1], got {value}")]
    OutOfUnitRange { name: &'static str, value: f64 },

    #[error("{name} must be a finite non-negative number, got {value}")]
    Negative { name: &'static str, value: f64 },

    #[error("kernel_size must be 3, 5 or 7, got {0}")]
    KernelSize(u32),
}

impl PipelineConfig {
    /// Upper hysteresis threshold for the edge detector.
    pub fn high_canny(&self) -> f64 {
        self.low_canny * self.canny_ratio
    }

    pub fn pause(&self) -> Duration {
        Duration::from_millis(self.pause_ms)
    }

    /// Check every tunable is within the range the stages assume.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("white_thres", self.white_thres),
            ("w_perc", self.w_perc),
            ("h_perc", self.h_perc),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfUnitRange { name, value });
            }
        }

        for (name, value) in [
            ("low_canny", self.low_canny),
            ("canny_ratio", self.canny_ratio),
            ("min_line_dist", self.min_line_dist),
            ("max_line_dist", self.max_line_dist),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Negative { name, value });
            }
        }

        if !matches!(self.kernel_size, 3 | 5 | 7) {
            return Err(ConfigError::KernelSize(self.kernel_size));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.high_canny(), 150.0);
        assert_eq!(config.pause(), Duration::from_millis(1));
    }

    #[test]
    fn test_rejects_out_of_range_percentages() {
        let config = PipelineConfig {
            h_perc: 1.2,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::OutOfUnitRange {
                name: "h_perc",
                value: 1.2
            })
        );

        let config = PipelineConfig {
            w_perc: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_negative_thresholds() {
        let config = PipelineConfig {
            low_canny: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Negative { name: "low_canny", .. })
        ));
    }

    #[test]
    fn test_rejects_even_kernel() {
        let config = PipelineConfig {
            kernel_size: 4,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::KernelSize(4)));
    }

    #[test]
    fn test_boundary_percentages_are_accepted() {
        let config = PipelineConfig {
            w_perc: 0.0,
            h_perc: 1.0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
