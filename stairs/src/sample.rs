/// One coherent reading handed to the detector.
///
/// `None` means the sensor had nothing for this tick, it is never read as zero.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MotionSample {
    pub timestamp_ms: u64,
    /// Vertical acceleration without gravity, m/s²
    pub vertical_acceleration: Option<f64>,
    /// Forward tilt in degrees
    pub tilt_degrees: Option<f64>,
}

impl MotionSample {
    pub const fn new(timestamp_ms: u64, vertical_acceleration: f64, tilt_degrees: f64) -> Self {
        Self {
            timestamp_ms,
            vertical_acceleration: Some(vertical_acceleration),
            tilt_degrees: Some(tilt_degrees),
        }
    }

    /// Sample carrying only time, used to drive idle decay.
    pub const fn tick(timestamp_ms: u64) -> Self {
        Self {
            timestamp_ms,
            vertical_acceleration: None,
            tilt_degrees: None,
        }
    }
}

/// Device acceleration excluding gravity, m/s².
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Acceleration {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
}

/// Device orientation in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rotation {
    /// Rotation around z, `0..360`
    pub alpha: Option<f64>,
    /// Front to back tilt, `-180..180`
    pub beta: Option<f64>,
    /// Left to right tilt, `-90..90`
    pub gamma: Option<f64>,
}

/// Raw motion and orientation readings as reported by the platform.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MotionReading {
    pub acceleration: Acceleration,
    pub rotation: Rotation,
}

impl MotionReading {
    /// Vertical acceleration is `z`, tilt is `beta`.
    pub const fn at(self, timestamp_ms: u64) -> MotionSample {
        MotionSample {
            timestamp_ms,
            vertical_acceleration: self.acceleration.z,
            tilt_degrees: self.rotation.beta,
        }
    }
}
