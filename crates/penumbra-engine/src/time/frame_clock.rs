use std::time::{Duration, Instant};

/// One tick of a [`FrameClock`].
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Seconds since the previous tick, clamped.
    pub dt: f32,
    pub now: Instant,
    pub frame_index: u64,
}

/// Per-loop clock producing clamped frame deltas.
///
/// The lower bound keeps movement integration away from zero dt on platforms
/// that return frames back to back; the upper bound keeps a stall (debugger,
/// window drag) from teleporting the camera.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,
}

impl FrameClock {
    pub const DT_MIN: Duration = Duration::from_micros(100);
    pub const DT_MAX: Duration = Duration::from_millis(250);

    pub fn new() -> Self {
        Self::with_clamps(Self::DT_MIN, Self::DT_MAX)
    }

    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        Self {
            last: Instant::now(),
            frame_index: 0,
            dt_min,
            dt_max,
        }
    }

    /// Restarts the baseline, e.g. after the window was minimized.
    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> FrameTime {
        let dt = now
            .saturating_duration_since(self.last)
            .clamp(self.dt_min, self.dt_max);
        self.last = now;

        let ft = FrameTime {
            dt: dt.as_secs_f32(),
            now,
            frame_index: self.frame_index,
        };
        self.frame_index = self.frame_index.wrapping_add(1);
        ft
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dt_is_clamped_both_ways() {
        let start = Instant::now();
        let mut clock = FrameClock::with_clamps(FrameClock::DT_MIN, FrameClock::DT_MAX);
        clock.last = start;

        let fast = clock.tick_at(start);
        assert!((fast.dt - 0.0001).abs() < 1e-7);

        let stall = clock.tick_at(start + Duration::from_secs(3));
        assert_eq!(stall.dt, 0.25);

        let normal = clock.tick_at(start + Duration::from_secs(3) + Duration::from_millis(16));
        assert!((normal.dt - 0.016).abs() < 1e-6);
    }

    #[test]
    fn frame_index_counts_ticks() {
        let mut clock = FrameClock::new();
        let a = clock.tick();
        let b = clock.tick();
        assert_eq!(a.frame_index, 0);
        assert_eq!(b.frame_index, 1);
    }
}
