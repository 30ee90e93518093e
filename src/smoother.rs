//! Parameter smoothing for click-free value changes.
//!
//! Control-thread writes land between audio blocks, so a gain that jumps by
//! 20 dB from one block to the next produces an audible step ("zipper noise").
//! [`SmoothedParam`] interpolates toward the most recent target with a one-pole
//! exponential ramp, advanced once per output frame on the audio thread.
//!
//! # Example
//!
//! ```
//! use foldkit::SmoothedParam;
//!
//! let mut gain = SmoothedParam::with_config(1.0, 48000.0, 5.0);
//! gain.set_target(2.0);
//!
//! // Each call moves a little closer to 2.0
//! let a = gain.next();
//! let b = gain.next();
//! assert!(a < b && b < 2.0);
//! ```

#[cfg(not(feature = "std"))]
use libm::{expf, fabsf};

#[cfg(feature = "std")]
fn expf(x: f32) -> f32 {
    x.exp()
}
#[cfg(feature = "std")]
fn fabsf(x: f32) -> f32 {
    x.abs()
}

/// Default smoothing time in milliseconds.
pub const DEFAULT_SMOOTH_MS: f32 = 5.0;

/// When |current - target| falls below this, the ramp snaps and settles.
const SETTLE_EPSILON: f32 = 1e-6;

/// One-pole exponentially smoothed parameter.
///
/// The audio thread calls [`next`](Self::next) once per frame; any thread that
/// owns a `&mut` may retarget it. Settled parameters short-circuit to a plain
/// load, so a static mix costs one comparison per frame.
#[derive(Debug, Clone)]
pub struct SmoothedParam {
    /// Current smoothed value.
    current: f32,
    /// Value the ramp is heading toward.
    target: f32,
    /// Per-sample ramp coefficient in (0, 1].
    coeff: f32,
    /// Smoothing time, kept for sample-rate changes.
    smooth_ms: f32,
    /// True once current has reached target.
    settled: bool,
}

impl SmoothedParam {
    /// Creates a smoothed parameter with the default ramp time.
    pub fn new(initial: f32, sample_rate: f32) -> Self {
        Self::with_config(initial, sample_rate, DEFAULT_SMOOTH_MS)
    }

    /// Creates a smoothed parameter with an explicit ramp time.
    ///
    /// # Arguments
    ///
    /// * `initial` - Starting value, also the initial target
    /// * `sample_rate` - Audio sample rate in Hz
    /// * `smooth_ms` - Ramp time constant in milliseconds (0 = no smoothing)
    pub fn with_config(initial: f32, sample_rate: f32, smooth_ms: f32) -> Self {
        Self {
            current: initial,
            target: initial,
            coeff: ramp_coeff(sample_rate, smooth_ms),
            smooth_ms,
            settled: true,
        }
    }

    /// Sets a new target value. The ramp starts on the next [`next`](Self::next) call.
    pub fn set_target(&mut self, target: f32) {
        if target != self.target {
            self.target = target;
            self.settled = false;
        }
    }

    /// Returns the target value (where the ramp will end up).
    pub fn target(&self) -> f32 {
        self.target
    }

    /// Returns the current smoothed value without advancing the ramp.
    pub fn current(&self) -> f32 {
        self.current
    }

    /// Advances the ramp by one frame and returns the new value.
    #[inline]
    pub fn next(&mut self) -> f32 {
        if self.settled {
            return self.current;
        }
        self.current += self.coeff * (self.target - self.current);
        if fabsf(self.target - self.current) < SETTLE_EPSILON {
            self.current = self.target;
            self.settled = true;
        }
        self.current
    }

    /// Jumps straight to the target, abandoning any ramp in progress.
    ///
    /// Call from `reset` paths where a ramp would smear stale state into the
    /// first block after a transport restart.
    pub fn snap_to_target(&mut self) {
        self.current = self.target;
        self.settled = true;
    }

    /// Updates the sample rate, preserving the configured ramp time.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.coeff = ramp_coeff(sample_rate, self.smooth_ms);
    }
}

/// One-pole coefficient for a given time constant.
///
/// coeff = 1 - e^(-1 / (t * fs)); a `smooth_ms` of 0 disables smoothing.
fn ramp_coeff(sample_rate: f32, smooth_ms: f32) -> f32 {
    if smooth_ms <= 0.0 || sample_rate <= 0.0 {
        return 1.0;
    }
    let samples = smooth_ms * 1e-3 * sample_rate;
    1.0 - expf(-1.0 / samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 48000.0;

    #[test]
    fn starts_settled_at_initial() {
        let mut p = SmoothedParam::new(0.5, SAMPLE_RATE);
        assert_eq!(p.next(), 0.5);
        assert_eq!(p.target(), 0.5);
    }

    #[test]
    fn ramps_monotonically_toward_target() {
        let mut p = SmoothedParam::with_config(0.0, SAMPLE_RATE, 5.0);
        p.set_target(1.0);

        let mut prev = 0.0;
        for _ in 0..100 {
            let v = p.next();
            assert!(v >= prev, "ramp went backwards: {} -> {}", prev, v);
            assert!(v <= 1.0, "ramp overshot: {}", v);
            prev = v;
        }
        assert!(prev > 0.0, "ramp never moved");
    }

    #[test]
    fn settles_exactly_on_target() {
        let mut p = SmoothedParam::with_config(0.0, SAMPLE_RATE, 1.0);
        p.set_target(1.0);
        // 1ms ramp at 48kHz settles well within half a second
        for _ in 0..24000 {
            p.next();
        }
        assert_eq!(p.next(), 1.0);
    }

    #[test]
    fn snap_skips_the_ramp() {
        let mut p = SmoothedParam::with_config(0.0, SAMPLE_RATE, 50.0);
        p.set_target(1.0);
        p.next();
        p.snap_to_target();
        assert_eq!(p.next(), 1.0);
    }

    #[test]
    fn zero_smooth_time_is_instant() {
        let mut p = SmoothedParam::with_config(0.0, SAMPLE_RATE, 0.0);
        p.set_target(0.7);
        assert_eq!(p.next(), 0.7);
    }
}
