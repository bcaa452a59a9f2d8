use anyhow::{Result, anyhow};
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::window::{Fullscreen, Window};

use crate::device::{Gpu, SurfaceErrorAction};
use crate::input::{InputFrame, InputState};
use crate::render::{RenderCtx, RenderTarget};
use crate::time::FrameTime;

/// Position and size to restore when leaving fullscreen.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct WindowedBounds {
    /// `None` on platforms that do not report window positions.
    pub position: Option<PhysicalPosition<i32>>,
    pub size: PhysicalSize<u32>,
}

/// Window operations available to app callbacks.
pub struct WindowCtx<'a> {
    window: &'a Window,
    windowed: &'a mut Option<WindowedBounds>,
    exit: &'a mut bool,
}

impl<'a> WindowCtx<'a> {
    pub(crate) fn new(
        window: &'a Window,
        windowed: &'a mut Option<WindowedBounds>,
        exit: &'a mut bool,
    ) -> Self {
        Self { window, windowed, exit }
    }

    pub fn window(&self) -> &Window {
        self.window
    }

    /// Drawable size in physical pixels.
    pub fn inner_size(&self) -> (u32, u32) {
        let s = self.window.inner_size();
        (s.width, s.height)
    }

    pub fn set_cursor_visible(&self, visible: bool) {
        self.window.set_cursor_visible(visible);
    }

    pub fn is_fullscreen(&self) -> bool {
        self.window.fullscreen().is_some()
    }

    /// Enters borderless fullscreen on the current monitor, or leaves it and
    /// restores the bounds saved on entry.
    pub fn set_fullscreen(&mut self, on: bool) {
        if on == self.is_fullscreen() {
            return;
        }
        if on {
            *self.windowed = Some(WindowedBounds {
                position: self.window.outer_position().ok(),
                size: self.window.inner_size(),
            });
            self.window
                .set_fullscreen(Some(Fullscreen::Borderless(self.window.current_monitor())));
            log::debug!("entered fullscreen");
            return;
        }

        self.window.set_fullscreen(None);
        if let Some(bounds) = self.windowed.take() {
            let _ = self.window.request_inner_size(bounds.size);
            if let Some(pos) = bounds.position {
                self.window.set_outer_position(pos);
            }
            log::debug!("left fullscreen, restored {}x{}", bounds.size.width, bounds.size.height);
        }
    }

    pub fn toggle_fullscreen(&mut self) {
        let on = !self.is_fullscreen();
        self.set_fullscreen(on);
    }

    /// Asks the runtime to close the window and leave the loop after the
    /// current callback.
    pub fn exit(&mut self) {
        *self.exit = true;
    }
}

/// Per-frame context passed to [`super::App::on_frame`].
///
/// `'a` is the callback invocation; `'w` is the window borrow carried by
/// `Gpu<'w>`.
pub struct FrameCtx<'a, 'w> {
    pub window: WindowCtx<'a>,
    pub gpu: &'a mut Gpu<'w>,
    pub input: &'a InputState,
    pub input_frame: &'a InputFrame,
    pub time: FrameTime,
}

/// Whether [`FrameCtx::render`] reached the presentation step.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameOutcome {
    Presented,
    /// The surface was unavailable this frame; nothing was recorded.
    Skipped,
}

impl FrameCtx<'_, '_> {
    /// Acquires the surface image, lets `draw` record into it, then submits
    /// and presents.
    ///
    /// Lost or outdated surfaces are reconfigured and the frame is skipped.
    /// An out-of-memory surface is an error.
    pub fn render<F>(&mut self, draw: F) -> Result<FrameOutcome>
    where
        F: FnOnce(&RenderCtx<'_>, RenderTarget<'_>) -> Result<()>,
    {
        let mut frame = match self.gpu.begin_frame() {
            Ok(frame) => frame,
            Err(err) => {
                return match self.gpu.handle_surface_error(err) {
                    SurfaceErrorAction::Fatal => Err(anyhow!("surface is out of memory")),
                    _ => Ok(FrameOutcome::Skipped),
                };
            }
        };

        let ctx = RenderCtx::new(
            self.gpu.device(),
            self.gpu.queue(),
            self.gpu.surface_format(),
            frame.size(),
        );
        draw(&ctx, RenderTarget::new(&mut frame.encoder, &frame.view))?;

        self.window.window.pre_present_notify();
        self.gpu.submit(frame);
        Ok(FrameOutcome::Presented)
    }
}
