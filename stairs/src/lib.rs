//! # Stair climbing
//!
//! Streaming detector that counts stair steps from vertical acceleration and
//! forward tilt of a hand-held device.
//!
//! Every sample pushes the vertical acceleration into a short rolling window.
//! The window average drives a hysteresis latch:
//!
//! ```notrust
//! rising edge:  !armed && avg > peak && elapsed > min_cycle  => armed, step if tilt in band
//! falling edge:  armed && avg < valley                       => disarmed
//! ```
//!
//! Where:
//!
//! - `avg` - moving average of the last `window_size` vertical accelerations (m/s²)
//! - `elapsed` - time since the last counted step
//! - tilt band - `tilt_min < beta < tilt_max`, typical forward tilt while climbing
//!
//! Each counted step adds [`STAIR_RISE_METERS`] of elevation. The detector is
//! considered active until `idle_timeout_ms` passes without a step, which is
//! evaluated on every call to [`StairDetector::ingest`] or [`StairDetector::tick`].

mod clock;
mod config;
mod detector;
mod edge;
mod error;
mod sample;
mod source;
mod window;

pub use self::clock::*;
pub use self::config::*;
pub use self::detector::*;
pub use self::edge::*;
pub use self::error::*;
pub use self::sample::*;
pub use self::source::*;
pub use self::window::*;

/// Typical rise of a single stair in meters.
pub const STAIR_RISE_METERS: f64 = 0.17;
