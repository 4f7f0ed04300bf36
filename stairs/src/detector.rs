use tracing::{debug, info, trace, warn};

use crate::{
    ConfigError, ConfigPatch, DetectorConfig, Edge, EdgeDetector, MotionSample, RollingWindow,
    STAIR_RISE_METERS,
};

/// A counted stair step.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StepEvent {
    pub timestamp_ms: u64,
    /// Total steps including this one
    pub step_count: u64,
    pub total_elevation_meters: f64,
    pub average_acceleration: f64,
    pub tilt_degrees: Option<f64>,
}

/// Everything a host needs to display the detector.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StairReport {
    pub step_count: u64,
    pub total_elevation_meters: f64,
    pub is_active: bool,
    pub last_event_timestamp_ms: Option<u64>,
    pub current_acceleration: Option<f64>,
    pub average_acceleration: f64,
    pub armed: bool,
    pub tilt_degrees: Option<f64>,
}

/// Stair step counter over a stream of [`MotionSample`].
///
/// All state is owned by the detector and mutated through `&mut self`, so a
/// host cannot reset it in the middle of classifying a sample.
#[derive(Debug, Clone)]
pub struct StairDetector {
    config: DetectorConfig,
    window: RollingWindow,
    edge: EdgeDetector,
    last_event_timestamp_ms: Option<u64>,
    step_count: u64,
    is_active: bool,
    current_acceleration: Option<f64>,
    tilt_degrees: Option<f64>,
}

impl Default for StairDetector {
    fn default() -> Self {
        Self::from_valid(DetectorConfig::default())
    }
}

impl StairDetector {
    pub fn new(config: DetectorConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self::from_valid(config))
    }

    fn from_valid(config: DetectorConfig) -> Self {
        Self {
            window: RollingWindow::new(config.window_size),
            config,
            edge: EdgeDetector::new(),
            last_event_timestamp_ms: None,
            step_count: 0,
            is_active: false,
            current_acceleration: None,
            tilt_degrees: None,
        }
    }

    /// Feed one sample. Returns the step it completed, if any.
    ///
    /// Samples without vertical acceleration skip classification but still
    /// advance idle decay. NaN or infinite accelerations count as absent.
    pub fn ingest(&mut self, sample: &MotionSample) -> Option<StepEvent> {
        let acceleration = sample.vertical_acceleration.filter(|&acceleration| {
            if acceleration.is_finite() {
                return true;
            }

            trace!(
                timestamp_ms = sample.timestamp_ms,
                acceleration,
                "non-finite acceleration skipped"
            );
            false
        });

        let event = acceleration.and_then(|acceleration| self.classify(sample, acceleration));

        self.decay(sample.timestamp_ms);

        event
    }

    /// Advance time without a reading.
    ///
    /// Idle decay only happens on calls to [`Self::ingest`] or this method. A
    /// host that stops calling both will see [`Self::is_active`] keep its last
    /// value indefinitely.
    pub fn tick(&mut self, now_ms: u64) {
        self.decay(now_ms);
    }

    pub fn ingest_all<'a>(
        &mut self,
        samples: impl IntoIterator<Item = &'a MotionSample>,
    ) -> Vec<StepEvent> {
        samples
            .into_iter()
            .filter_map(|sample| self.ingest(sample))
            .collect()
    }

    fn classify(&mut self, sample: &MotionSample, acceleration: f64) -> Option<StepEvent> {
        self.current_acceleration = Some(acceleration);
        self.tilt_degrees = sample.tilt_degrees;
        self.window.push(acceleration);

        let average = self.window.average();

        let edge = self.edge.classify(
            average,
            sample.tilt_degrees,
            sample.timestamp_ms,
            self.last_event_timestamp_ms,
            &self.config,
        );

        match edge {
            Edge::Step => {}
            Edge::TiltRejected => {
                trace!(
                    timestamp_ms = sample.timestamp_ms,
                    average,
                    tilt = ?sample.tilt_degrees,
                    "peak outside tilt band"
                );
                return None;
            }
            Edge::Refractory => {
                trace!(
                    timestamp_ms = sample.timestamp_ms,
                    average,
                    "peak within minimum cycle time"
                );
                return None;
            }
            Edge::Quiet | Edge::Released => return None,
        }

        self.step_count += 1;
        self.last_event_timestamp_ms = Some(sample.timestamp_ms);
        self.is_active = true;

        let event = StepEvent {
            timestamp_ms: sample.timestamp_ms,
            step_count: self.step_count,
            total_elevation_meters: self.total_elevation_meters(),
            average_acceleration: average,
            tilt_degrees: sample.tilt_degrees,
        };

        debug!(
            timestamp_ms = event.timestamp_ms,
            step_count = event.step_count,
            elevation = event.total_elevation_meters,
            "stair step"
        );

        Some(event)
    }

    fn decay(&mut self, now_ms: u64) {
        let Some(last) = self.last_event_timestamp_ms else {
            return;
        };

        if self.is_active && now_ms.saturating_sub(last) > self.config.idle_timeout_ms {
            self.is_active = false;
            debug!(now_ms, last_event_ms = last, "stair climbing idle");
        }
    }

    /// Merge `patch` into the current configuration.
    ///
    /// Invalid results are rejected and the previous configuration stays. The
    /// latch state is kept, so an excursion in progress is not restarted.
    pub fn update_config(&mut self, patch: &ConfigPatch) -> Result<&DetectorConfig, ConfigError> {
        let merged = self.config.merged(patch).inspect_err(|e| {
            warn!(error = %e, "rejected detector config");
        })?;

        self.apply(merged);

        Ok(&self.config)
    }

    pub fn replace_config(&mut self, config: DetectorConfig) -> Result<&DetectorConfig, ConfigError> {
        config.validate().inspect_err(|e| {
            warn!(error = %e, "rejected detector config");
        })?;

        self.apply(config);

        Ok(&self.config)
    }

    fn apply(&mut self, config: DetectorConfig) {
        if config.window_size != self.window.capacity() {
            self.window.resize(config.window_size);
        }

        info!(?config, "detector config updated");
        self.config = config;
    }

    /// Back to the freshly constructed state, configuration is kept.
    pub fn reset(&mut self) {
        self.window.clear();
        self.edge.reset();
        self.last_event_timestamp_ms = None;
        self.step_count = 0;
        self.is_active = false;
        self.current_acceleration = None;
        self.tilt_degrees = None;

        info!("stair detector reset");
    }

    pub fn snapshot(&self) -> StairReport {
        StairReport {
            step_count: self.step_count,
            total_elevation_meters: self.total_elevation_meters(),
            is_active: self.is_active,
            last_event_timestamp_ms: self.last_event_timestamp_ms,
            current_acceleration: self.current_acceleration,
            average_acceleration: self.window.average(),
            armed: self.edge.armed(),
            tilt_degrees: self.tilt_degrees,
        }
    }

    pub const fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub const fn step_count(&self) -> u64 {
        self.step_count
    }

    pub fn total_elevation_meters(&self) -> f64 {
        self.step_count as f64 * STAIR_RISE_METERS
    }

    pub const fn is_active(&self) -> bool {
        self.is_active
    }

    pub const fn armed(&self) -> bool {
        self.edge.armed()
    }

    pub const fn last_event_timestamp_ms(&self) -> Option<u64> {
        self.last_event_timestamp_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TILT: f64 = 40.0;

    fn config() -> DetectorConfig {
        DetectorConfig {
            window_size: 3,
            peak_threshold: 1.2,
            valley_threshold: 0.8,
            min_cycle_time_ms: 300,
            tilt_min_degrees: 20.0,
            tilt_max_degrees: 60.0,
            idle_timeout_ms: 2000,
        }
    }

    /// Window of one makes the average equal to the last sample.
    fn instant() -> StairDetector {
        StairDetector::new(DetectorConfig {
            window_size: 1,
            ..config()
        })
        .unwrap()
    }

    fn samples(start_ms: u64, step_ms: u64, values: &[f64], tilt: Option<f64>) -> Vec<MotionSample> {
        values
            .iter()
            .enumerate()
            .map(|(i, value)| MotionSample {
                timestamp_ms: start_ms + i as u64 * step_ms,
                vertical_acceleration: Some(*value),
                tilt_degrees: tilt,
            })
            .collect()
    }

    fn feed(detector: &mut StairDetector, samples: &[MotionSample]) -> usize {
        detector.ingest_all(samples).len()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let result = StairDetector::new(DetectorConfig {
            valley_threshold: 2.0,
            ..config()
        });
        assert!(matches!(
            result,
            Err(ConfigError::InvertedThresholds { .. })
        ));
    }

    #[test]
    fn test_below_valley_never_counts() {
        let mut detector = StairDetector::new(config()).unwrap();
        let values = (0..500).map(|i| (i % 7) as f64 * 0.1).collect::<Vec<_>>();
        assert_eq!(feed(&mut detector, &samples(0, 20, &values, Some(TILT))), 0);
        assert_eq!(detector.step_count(), 0);
        assert_eq!(detector.total_elevation_meters(), 0.0);
    }

    #[test]
    fn test_single_excursion_counts_once() {
        for plateau in [1, 2, 5, 40] {
            let mut detector = StairDetector::new(config()).unwrap();
            let mut values = vec![0.0; 3];
            values.extend(std::iter::repeat_n(2.0, plateau + 2));
            values.extend([0.0; 4]);

            assert_eq!(
                feed(&mut detector, &samples(0, 20, &values, Some(TILT))),
                1,
                "plateau of {plateau}"
            );
            assert!(!detector.armed());
            assert!((detector.total_elevation_meters() - STAIR_RISE_METERS).abs() < 1e-12);
        }
    }

    #[test]
    fn test_worked_example_needs_average_above_peak() {
        // arithmetic mean tops out at (0.5 + 1.5 + 1.5) / 3 = 3.5 / 3 ≈ 1.167, below the
        // 1.2 peak, so this sequence alone never latches a rising edge
        let mut detector = StairDetector::new(config()).unwrap();
        let events = detector.ingest_all(&samples(0, 50, &[0.5, 1.5, 1.5, 0.5], Some(TILT)));
        assert!(events.is_empty());

        // one more sample on the plateau pushes the average to 1.5
        let mut detector = StairDetector::new(config()).unwrap();
        let events =
            detector.ingest_all(&samples(0, 50, &[0.5, 1.5, 1.5, 1.5, 0.5], Some(TILT)));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].timestamp_ms, 150);
        assert_eq!(events[0].step_count, 1);
        assert_eq!(detector.total_elevation_meters(), 0.17);
        assert!(detector.is_active());
    }

    #[test]
    fn test_min_cycle_time() {
        // second excursion 200ms after the first step
        let mut detector = instant();
        let values = [2.0, 0.0, 2.0, 0.0];
        assert_eq!(feed(&mut detector, &samples(0, 100, &values, Some(TILT))), 1);

        // second excursion 400ms after the first step
        let mut detector = instant();
        assert_eq!(feed(&mut detector, &samples(0, 200, &values, Some(TILT))), 2);
    }

    #[test]
    fn test_refractory_peak_can_count_later_in_plateau() {
        let mut detector = instant();
        let values = [2.0, 0.0, 2.0, 2.0, 2.0, 0.0];
        let events = detector.ingest_all(&samples(0, 100, &values, Some(TILT)));
        // peak at 200 is refractory, still unlatched at 400
        assert_eq!(
            events.iter().map(|e| e.timestamp_ms).collect::<Vec<_>>(),
            vec![0, 400]
        );
    }

    #[test]
    fn test_tilt_rejected_excursion_needs_valley() {
        let mut detector = instant();
        let mut trace = samples(0, 100, &[2.0, 2.0], Some(5.0));
        // tilt becomes valid on the same plateau
        trace.extend(samples(200, 100, &[2.0, 2.0, 1.0], Some(TILT)));
        assert_eq!(feed(&mut detector, &trace), 0);
        assert!(detector.armed());

        // fresh valley then peak counts
        let trace = samples(500, 100, &[0.0, 2.0], Some(TILT));
        assert_eq!(feed(&mut detector, &trace), 1);
    }

    #[test]
    fn test_tilt_never_in_band() {
        let mut detector = instant();
        let values = [0.0, 2.0, 0.0, 2.0, 0.0, 2.0, 0.0];
        assert_eq!(feed(&mut detector, &samples(0, 500, &values, Some(75.0))), 0);
        assert_eq!(feed(&mut detector, &samples(5000, 500, &values, None)), 0);
    }

    #[test]
    fn test_missing_acceleration_changes_nothing() {
        let mut detector = instant();
        detector.ingest(&MotionSample::new(0, 2.0, 5.0));
        let before = detector.snapshot();

        detector.ingest(&MotionSample {
            timestamp_ms: 100,
            vertical_acceleration: None,
            tilt_degrees: Some(TILT),
        });
        assert_eq!(detector.snapshot(), before);
        assert!(detector.armed());
    }

    #[test]
    fn test_non_finite_acceleration_is_skipped() {
        let excursions = (0..5)
            .flat_map(|i| samples(1000 + i * 1000, 100, &[0.0, 2.0, 2.0, 2.0, 0.0, 0.0], Some(TILT)))
            .collect::<Vec<_>>();

        let mut clean = StairDetector::new(config()).unwrap();
        assert_eq!(feed(&mut clean, &excursions), 5);

        for bad in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
            let mut detector = StairDetector::new(config()).unwrap();
            assert!(detector.ingest(&MotionSample::new(0, bad, 5.0)).is_none());
            assert_eq!(detector.snapshot(), clean_start());
            feed(&mut detector, &samples(10, 10, &[0.0; 10], Some(5.0)));
            assert!(detector.snapshot().average_acceleration.is_finite());

            assert_eq!(feed(&mut detector, &excursions), 5, "after {bad}");
        }

        // mid excursion as well
        let mut trace = samples(0, 100, &[0.0, 2.0], Some(TILT));
        trace.push(MotionSample::new(200, f64::NAN, TILT));
        trace.extend(samples(300, 100, &[2.0, 0.0, 0.0, 0.0], Some(TILT)));
        let mut detector = StairDetector::new(config()).unwrap();
        assert_eq!(feed(&mut detector, &trace), 1);
        assert!(!detector.armed());
    }

    fn clean_start() -> StairReport {
        StairDetector::new(config()).unwrap().snapshot()
    }

    #[test]
    fn test_absent_acceleration_is_not_zero() {
        let mut detector = StairDetector::new(config()).unwrap();
        for sample in samples(0, 50, &[2.0, 2.0], Some(5.0)) {
            detector.ingest(&sample);
        }
        // zeros would drag the average below valley and release the latch
        for t in [100, 150, 200] {
            detector.ingest(&MotionSample::tick(t));
        }
        assert!(detector.armed());
        assert_eq!(detector.snapshot().average_acceleration, 2.0);
    }

    #[test]
    fn test_idle_decay_with_ticks() {
        let mut detector = instant();
        let event = detector.ingest(&MotionSample::new(1000, 2.0, TILT));
        assert!(event.is_some());
        assert!(detector.is_active());

        detector.tick(3000);
        assert!(detector.is_active(), "exactly the timeout is still active");

        detector.tick(3001);
        assert!(!detector.is_active());
    }

    #[test]
    fn test_idle_decay_on_samples_without_acceleration() {
        let mut detector = instant();
        detector.ingest(&MotionSample::new(0, 2.0, TILT));
        detector.ingest(&MotionSample {
            timestamp_ms: 2500,
            vertical_acceleration: None,
            tilt_degrees: Some(TILT),
        });
        assert!(!detector.is_active());
    }

    #[test]
    fn test_activity_freezes_without_ticks() {
        let mut detector = instant();
        detector.ingest(&MotionSample::new(0, 2.0, TILT));
        // host stopped delivering ticks, nothing can decay
        assert!(detector.is_active());
        assert!(detector.snapshot().is_active);

        // the next tick catches up regardless of how late it is
        detector.tick(1_000_000);
        assert!(!detector.is_active());
    }

    #[test]
    fn test_new_step_reactivates() {
        let mut detector = instant();
        let trace = samples(0, 3000, &[2.0, 0.0, 2.0], Some(TILT));
        let mut activity = Vec::new();
        for sample in &trace {
            detector.ingest(sample);
            activity.push(detector.is_active());
        }
        assert_eq!(activity, vec![true, false, true]);
        assert_eq!(detector.step_count(), 2);
    }

    #[test]
    fn test_reset_matches_fresh_detector() {
        let mut trace = samples(0, 40, &[0.0, 2.0, 2.0, 2.0, 0.0, 0.0, 0.0], Some(TILT));
        trace.extend(samples(1000, 40, &[2.0, 2.0, 2.0, 2.0], Some(TILT)));

        let mut used = StairDetector::new(config()).unwrap();
        used.ingest_all(&trace);
        assert!(used.step_count() > 0);
        used.reset();

        let report = used.snapshot();
        assert_eq!(report.step_count, 0);
        assert_eq!(report.total_elevation_meters, 0.0);
        assert!(!report.armed);
        assert!(!report.is_active);
        assert_eq!(report.last_event_timestamp_ms, None);
        assert_eq!(report.average_acceleration, 0.0);

        let mut fresh = StairDetector::new(config()).unwrap();
        assert_eq!(used.snapshot(), fresh.snapshot());

        let events_used = used.ingest_all(&trace);
        let events_fresh = fresh.ingest_all(&trace);
        assert_eq!(events_used, events_fresh);
        assert_eq!(used.snapshot(), fresh.snapshot());
    }

    #[test]
    fn test_update_config_preserves_latch() {
        let mut detector = instant();
        detector.ingest(&MotionSample::new(0, 2.0, TILT));
        assert!(detector.armed());

        let patch = ConfigPatch {
            peak_threshold: Some(3.0),
            valley_threshold: Some(1.5),
            ..Default::default()
        };
        let config = detector.update_config(&patch).unwrap();
        assert_eq!(config.peak_threshold, 3.0);
        assert!(detector.armed());

        // the new valley applies to the next sample
        detector.ingest(&MotionSample::new(100, 1.0, TILT));
        assert!(!detector.armed());
    }

    #[test]
    fn test_rejected_update_keeps_config() {
        let mut detector = StairDetector::new(config()).unwrap();
        let patch = ConfigPatch {
            tilt_max_degrees: Some(10.0),
            ..Default::default()
        };
        assert!(matches!(
            detector.update_config(&patch),
            Err(ConfigError::InvertedTiltBand { .. })
        ));
        assert_eq!(detector.config(), &config());

        assert_eq!(
            detector.replace_config(DetectorConfig {
                window_size: 0,
                ..config()
            }),
            Err(ConfigError::ZeroWindow)
        );
        assert_eq!(detector.config(), &config());
    }

    #[test]
    fn test_window_resize_keeps_newest() {
        let mut detector = StairDetector::new(config()).unwrap();
        detector.ingest_all(&samples(0, 10, &[0.0, 1.0, 1.0], None));

        let patch = ConfigPatch {
            window_size: Some(2),
            ..Default::default()
        };
        detector.update_config(&patch).unwrap();
        assert_eq!(detector.snapshot().average_acceleration, 1.0);

        let event = detector.ingest(&MotionSample::new(40, 2.0, TILT));
        assert!(event.is_some());
    }

    #[test]
    fn test_snapshot_debug_fields() {
        let mut detector = StairDetector::new(config()).unwrap();
        detector.ingest(&MotionSample::new(0, 0.3, 12.0));
        detector.ingest(&MotionSample::new(20, 0.9, 15.0));

        let report = detector.snapshot();
        assert_eq!(report.current_acceleration, Some(0.9));
        assert!((report.average_acceleration - 0.6).abs() < 1e-12);
        assert_eq!(report.tilt_degrees, Some(15.0));
        assert!(!report.armed);
    }
}
