//! Boundary with the platform sensors.
//!
//! Motion and orientation usually arrive as two independent event streams.
//! [`LatestReadings`] keeps the latest value of each field so the host can hand
//! one coherent [`MotionSample`] to the detector per tick.

use crate::{
    Acceleration, Clock, MotionReading, MotionSample, Rotation, SourceError, StairDetector,
    StepEvent,
};

/// Pull based stream of samples.
///
/// `Ok(None)` ends the stream. Platforms without motion sensors must return
/// [`SourceError::Unsupported`] instead of producing empty readings.
pub trait SampleSource {
    fn next_sample(&mut self) -> Result<Option<MotionSample>, SourceError>;
}

/// Source backed by recorded samples.
#[derive(Debug, Clone)]
pub struct IterSource<I> {
    inner: I,
}

impl<I: Iterator<Item = MotionSample>> IterSource<I> {
    pub fn new(inner: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            inner: inner.into_iter(),
        }
    }
}

impl<I: Iterator<Item = MotionSample>> SampleSource for IterSource<I> {
    fn next_sample(&mut self) -> Result<Option<MotionSample>, SourceError> {
        Ok(self.inner.next())
    }
}

/// Feed every sample of `source` to `detector`.
pub fn drive(
    source: &mut impl SampleSource,
    detector: &mut StairDetector,
) -> Result<Vec<StepEvent>, SourceError> {
    let mut events = Vec::new();

    while let Some(sample) = source.next_sample()? {
        events.extend(detector.ingest(&sample));
    }

    Ok(events)
}

/// Latest-value-wins merge of motion and orientation callbacks.
#[derive(Debug, Clone)]
pub struct LatestReadings<C> {
    clock: C,
    reading: MotionReading,
}

impl<C: Clock> LatestReadings<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            reading: MotionReading::default(),
        }
    }

    /// Replaces the whole acceleration, axes missing from the event become absent.
    pub fn on_motion(&mut self, acceleration: Acceleration) {
        self.reading.acceleration = acceleration;
    }

    pub fn on_orientation(&mut self, rotation: Rotation) {
        self.reading.rotation = rotation;
    }

    pub const fn reading(&self) -> &MotionReading {
        &self.reading
    }

    /// Merged reading stamped with the current time.
    pub fn sample(&self) -> MotionSample {
        self.reading.at(self.clock.now_ms())
    }

    pub fn clear(&mut self) {
        self.reading = MotionReading::default();
    }
}
