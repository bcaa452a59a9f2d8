use anyhow::Result;

use crate::device::Gpu;
use crate::input::InputEvent;

use super::ctx::{FrameCtx, WindowCtx};

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application state driven by the runtime.
///
/// Every callback receives the state it may touch by reference; the runtime
/// keeps nothing the app can observe between calls.
pub trait App {
    /// Called once after the window and device exist, before the first frame.
    fn on_start(&mut self, gpu: &Gpu<'_>, window: &mut WindowCtx<'_>) -> Result<()> {
        let _ = (gpu, window);
        Ok(())
    }

    /// Called for every translated input event, after it was applied to the
    /// window's `InputState`.
    fn on_input(&mut self, event: &InputEvent, window: &mut WindowCtx<'_>) {
        let _ = (event, window);
    }

    /// The surface was reconfigured to `size` physical pixels (never zero).
    fn on_resize(&mut self, gpu: &Gpu<'_>, size: (u32, u32)) {
        let _ = (gpu, size);
    }

    /// Called once per redraw. An error ends the loop.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> Result<AppControl>;
}
