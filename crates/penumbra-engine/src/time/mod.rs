//! Frame timing: clamped per-frame deltas and a windowed FPS average.

mod fps;
mod frame_clock;

pub use fps::{FpsCounter, FpsSample};
pub use frame_clock::{FrameClock, FrameTime};
