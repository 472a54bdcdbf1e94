/// Largest delta handed to simulation code in one tick. Stalls (window drag,
/// suspended laptop) otherwise produce catch-up bursts that fling particles
/// through the floor.
pub const MAX_DELTA: f32 = 0.1;

/// Per-tick timing snapshot handed to every animated component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTime {
    /// Seconds since the clock started, monotonically non-decreasing.
    pub elapsed: f32,
    /// Seconds since the previous tick, clamped to [`MAX_DELTA`].
    pub delta: f32,
}

/// Single per-frame clock driving all animation.
///
/// The clock is fed raw elapsed time from an external source (the window
/// loop's `Instant`, or a test); it owns the delta derivation and clamping so
/// no component sees time move backwards or jump.
#[derive(Debug, Default)]
pub struct FrameClock {
    previous: f32,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the clock to `elapsed` seconds and returns the frame timing.
    ///
    /// A time source that moves backwards is treated as stalled: elapsed
    /// holds at the previous value and delta is zero.
    pub fn tick(&mut self, elapsed: f32) -> FrameTime {
        let elapsed = elapsed.max(self.previous);
        let delta = (elapsed - self.previous).min(MAX_DELTA);
        self.previous = elapsed;
        FrameTime { elapsed, delta }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_is_difference_of_ticks() {
        let mut clock = FrameClock::new();
        clock.tick(1.0);
        let frame = clock.tick(1.016);
        assert!((frame.delta - 0.016).abs() < 1e-6);
        assert_eq!(frame.elapsed, 1.016);
    }

    #[test]
    fn delta_is_clamped_after_stall() {
        let mut clock = FrameClock::new();
        clock.tick(1.0);
        let frame = clock.tick(9.0);
        assert_eq!(frame.delta, MAX_DELTA);
        assert_eq!(frame.elapsed, 9.0);
        // Clamping is idempotent: the next normal tick is unaffected.
        let frame = clock.tick(9.016);
        assert!((frame.delta - 0.016).abs() < 1e-6);
    }

    #[test]
    fn backwards_time_holds_and_yields_zero_delta() {
        let mut clock = FrameClock::new();
        clock.tick(5.0);
        let frame = clock.tick(4.0);
        assert_eq!(frame.delta, 0.0);
        assert_eq!(frame.elapsed, 5.0);
    }
}
