//! Contract between the runtime loop and the application.
//!
//! The app owns its state; the runtime hands it the window, device and input
//! for the duration of each callback.

mod app;
mod ctx;

pub use app::{App, AppControl};
pub use ctx::{FrameCtx, FrameOutcome, WindowCtx, WindowedBounds};
