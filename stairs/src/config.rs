use crate::ConfigError;

/// Thresholds of the stair step detector.
///
/// Accelerations are in m/s², angles in degrees, times in milliseconds.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DetectorConfig {
    /// Number of samples in the moving average
    pub window_size: usize,
    /// Average above which a rising edge is latched
    pub peak_threshold: f64,
    /// Average below which the latch is released
    pub valley_threshold: f64,
    /// Minimum time between two counted steps
    pub min_cycle_time_ms: u64,
    pub tilt_min_degrees: f64,
    pub tilt_max_degrees: f64,
    /// Time without steps after which the detector stops being active
    pub idle_timeout_ms: u64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            window_size: 10,
            peak_threshold: 1.2,
            valley_threshold: 0.8,
            min_cycle_time_ms: 500,
            tilt_min_degrees: 20.0,
            tilt_max_degrees: 60.0,
            idle_timeout_ms: 2000,
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size == 0 {
            return Err(ConfigError::ZeroWindow);
        }

        for (field, value) in [
            ("peak_threshold", self.peak_threshold),
            ("valley_threshold", self.valley_threshold),
            ("tilt_min_degrees", self.tilt_min_degrees),
            ("tilt_max_degrees", self.tilt_max_degrees),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::NonFinite { field });
            }
        }

        if self.valley_threshold >= self.peak_threshold {
            return Err(ConfigError::InvertedThresholds {
                valley: self.valley_threshold,
                peak: self.peak_threshold,
            });
        }

        if self.tilt_min_degrees >= self.tilt_max_degrees {
            return Err(ConfigError::InvertedTiltBand {
                min: self.tilt_min_degrees,
                max: self.tilt_max_degrees,
            });
        }

        Ok(())
    }

    /// Apply `patch` on top of `self` and validate the result.
    pub fn merged(&self, patch: &ConfigPatch) -> Result<Self, ConfigError> {
        let merged = Self {
            window_size: patch.window_size.unwrap_or(self.window_size),
            peak_threshold: patch.peak_threshold.unwrap_or(self.peak_threshold),
            valley_threshold: patch.valley_threshold.unwrap_or(self.valley_threshold),
            min_cycle_time_ms: patch.min_cycle_time_ms.unwrap_or(self.min_cycle_time_ms),
            tilt_min_degrees: patch.tilt_min_degrees.unwrap_or(self.tilt_min_degrees),
            tilt_max_degrees: patch.tilt_max_degrees.unwrap_or(self.tilt_max_degrees),
            idle_timeout_ms: patch.idle_timeout_ms.unwrap_or(self.idle_timeout_ms),
        };

        merged.validate()?;

        Ok(merged)
    }

    /// Strict tilt band check. Absent tilt never passes.
    pub fn tilt_in_band(&self, tilt_degrees: Option<f64>) -> bool {
        tilt_degrees
            .is_some_and(|tilt| self.tilt_min_degrees < tilt && tilt < self.tilt_max_degrees)
    }
}

/// Partial update of [`DetectorConfig`], `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct ConfigPatch {
    pub window_size: Option<usize>,
    pub peak_threshold: Option<f64>,
    pub valley_threshold: Option<f64>,
    pub min_cycle_time_ms: Option<u64>,
    pub tilt_min_degrees: Option<f64>,
    pub tilt_max_degrees: Option<f64>,
    pub idle_timeout_ms: Option<u64>,
}

impl ConfigPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Values set in `other` win.
    pub fn and(self, other: Self) -> Self {
        Self {
            window_size: other.window_size.or(self.window_size),
            peak_threshold: other.peak_threshold.or(self.peak_threshold),
            valley_threshold: other.valley_threshold.or(self.valley_threshold),
            min_cycle_time_ms: other.min_cycle_time_ms.or(self.min_cycle_time_ms),
            tilt_min_degrees: other.tilt_min_degrees.or(self.tilt_min_degrees),
            tilt_max_degrees: other.tilt_max_degrees.or(self.tilt_max_degrees),
            idle_timeout_ms: other.idle_timeout_ms.or(self.idle_timeout_ms),
        }
    }
}

impl From<DetectorConfig> for ConfigPatch {
    fn from(config: DetectorConfig) -> Self {
        Self {
            window_size: Some(config.window_size),
            peak_threshold: Some(config.peak_threshold),
            valley_threshold: Some(config.valley_threshold),
            min_cycle_time_ms: Some(config.min_cycle_time_ms),
            tilt_min_degrees: Some(config.tilt_min_degrees),
            tilt_max_degrees: Some(config.tilt_max_degrees),
            idle_timeout_ms: Some(config.idle_timeout_ms),
        }
    }
}
