use std::time::Duration;

/// Averages frame times over windows of at least one second.
///
/// A window is closed only once it is longer than [`FpsCounter::WINDOW`] and
/// holds more than [`FpsCounter::MIN_FRAMES`] frames; very slow frames
/// therefore stretch the window instead of producing a noisy estimate.
#[derive(Debug, Clone, Default)]
pub struct FpsCounter {
    elapsed: Duration,
    frames: u32,
}

/// Result of one closed averaging window.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FpsSample {
    pub fps: f32,
    /// Mean seconds per frame.
    pub avg_dt: f32,
}

impl FpsCounter {
    pub const WINDOW: Duration = Duration::from_secs(1);
    pub const MIN_FRAMES: u32 = 10;

    pub fn new() -> Self {
        Self::default()
    }

    /// Records one frame of `dt` seconds; returns a sample when a window closes.
    pub fn frame(&mut self, dt: f32) -> Option<FpsSample> {
        self.elapsed += Duration::from_secs_f32(dt.max(0.0));
        self.frames += 1;

        if self.elapsed <= Self::WINDOW || self.frames <= Self::MIN_FRAMES {
            return None;
        }

        let secs = self.elapsed.as_secs_f32();
        let sample = FpsSample {
            fps: self.frames as f32 / secs,
            avg_dt: secs / self.frames as f32,
        };
        self.elapsed = Duration::ZERO;
        self.frames = 0;
        Some(sample)
    }
}
