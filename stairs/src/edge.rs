use crate::DetectorConfig;

/// Outcome of classifying one averaged sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Edge {
    /// Nothing changed
    Quiet,
    /// Rising edge with tilt in band, counts as a step
    Step,
    /// Rising edge latched but tilt was absent or out of band
    TiltRejected,
    /// Average above peak but the last step is too recent
    Refractory,
    /// Average fell below valley, latch released
    Released,
}

impl Edge {
    pub const fn is_step(self) -> bool {
        matches!(self, Self::Step)
    }
}

/// Peak/valley hysteresis latch.
///
/// A rising edge is consumed by the latch whether or not the tilt gate passes,
/// so a plateau that only becomes tilted later never counts until the average
/// has dropped below the valley again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeDetector {
    armed: bool,
}

impl EdgeDetector {
    pub const fn new() -> Self {
        Self { armed: false }
    }

    pub const fn armed(&self) -> bool {
        self.armed
    }

    pub fn reset(&mut self) {
        self.armed = false;
    }

    /// # Params
    /// - `average` - current rolling average of vertical acceleration
    /// - `tilt_degrees` - tilt reported with the same sample
    /// - `timestamp_ms` - time of the sample
    /// - `last_step_ms` - time of the last counted step, `None` if there was none
    pub fn classify(
        &mut self,
        average: f64,
        tilt_degrees: Option<f64>,
        timestamp_ms: u64,
        last_step_ms: Option<u64>,
        config: &DetectorConfig,
    ) -> Edge {
        if self.armed {
            if average < config.valley_threshold {
                self.armed = false;
                return Edge::Released;
            }

            return Edge::Quiet;
        }

        if average <= config.peak_threshold {
            return Edge::Quiet;
        }

        let cooled_down = match last_step_ms {
            // earlier timestamps than the last step count as no time elapsed
            Some(last) => timestamp_ms.saturating_sub(last) > config.min_cycle_time_ms,
            None => true,
        };

        if !cooled_down {
            return Edge::Refractory;
        }

        self.armed = true;

        match config.tilt_in_band(tilt_degrees) {
            true => Edge::Step,
            false => Edge::TiltRejected,
        }
    }
}
