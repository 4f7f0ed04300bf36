use thiserror::Error;

/// Rejected configuration. The previous configuration stays in effect.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("window size must be at least 1")]
    ZeroWindow,
    #[error("`{field}` must be a finite number")]
    NonFinite { field: &'static str },
    #[error("valley threshold {valley} must be below peak threshold {peak}")]
    InvertedThresholds { valley: f64, peak: f64 },
    #[error("minimum tilt {min}° must be below maximum tilt {max}°")]
    InvertedTiltBand { min: f64, max: f64 },
}

/// Failure reported by a sensor source instead of feeding zeros.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("motion sensors are not supported on this platform")]
    Unsupported,
    #[error("permission to read motion sensors was denied")]
    PermissionDenied,
    #[error("sensor source failed: {0}")]
    Other(String),
}
