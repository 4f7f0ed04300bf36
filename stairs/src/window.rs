use std::collections::VecDeque;

/// Fixed capacity FIFO of recent vertical accelerations.
///
/// The average of an empty window is defined as `0.0`. Non-finite values are
/// never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct RollingWindow {
    values: VecDeque<f64>,
    capacity: usize,
}

impl RollingWindow {
    /// Capacity is raised to 1 if zero is passed.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);

        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Returns `false` and leaves the window untouched for NaN or infinite values.
    pub fn push(&mut self, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }

        self.values.push_back(value);

        while self.values.len() > self.capacity {
            self.values.pop_front();
        }

        true
    }

    /// Summed over the stored values on every call, the window is small.
    pub fn average(&self) -> f64 {
        match self.values.len() {
            0 => 0.0,
            len => self.values.iter().sum::<f64>() / len as f64,
        }
    }

    /// Change capacity keeping the newest values.
    pub fn resize(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);

        while self.values.len() > self.capacity {
            self.values.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().copied()
    }
}
