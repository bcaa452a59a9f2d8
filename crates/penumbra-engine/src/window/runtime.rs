use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::core::{App, AppControl, FrameCtx, WindowCtx, WindowedBounds};
use crate::device::{Gpu, GpuInit};
use crate::input::platform::translate_window_event;
use crate::input::{InputFrame, InputState};
use crate::time::FrameClock;

/// Window configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    /// Enter borderless fullscreen right after creation. The initial size is
    /// then the one restored when leaving fullscreen.
    pub start_fullscreen: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "penumbra".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
            start_fullscreen: false,
        }
    }
}

/// Runs one window until the app or the platform closes it.
pub struct Runtime;

impl Runtime {
    /// Opens one window and drives `app` until it exits or fails.
    pub fn run<A>(config: RuntimeConfig, gpu_init: GpuInit, app: A) -> Result<()>
    where
        A: App + 'static,
    {
        let event_loop = EventLoop::new().context("cannot create the event loop")?;
        let mut state = AppState::new(config, gpu_init, app);

        event_loop
            .run_app(&mut state)
            .context("event loop exited with an error")?;

        match state.fatal.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[self_referencing]
struct WindowEntry {
    input_state: InputState,
    input_frame: InputFrame,
    clock: FrameClock,

    window: Window,

    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

struct AppState<A>
where
    A: App + 'static,
{
    config: RuntimeConfig,
    gpu_init: GpuInit,
    app: A,

    entry: Option<WindowEntry>,
    windowed: Option<WindowedBounds>,
    exit_requested: bool,
    fatal: Option<anyhow::Error>,
}

impl<A> AppState<A>
where
    A: App + 'static,
{
    fn new(config: RuntimeConfig, gpu_init: GpuInit, app: A) -> Self {
        Self {
            config,
            gpu_init,
            app,
            entry: None,
            windowed: None,
            exit_requested: false,
            fatal: None,
        }
    }

    /// Stops the loop; `Runtime::run` returns `err`.
    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        self.fatal = Some(err);
        self.exit_requested = true;
        event_loop.exit();
    }

    fn create_entry(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = event_loop
            .create_window(attrs)
            .context("window creation failed")?;

        let gpu_init = self.gpu_init.clone();
        let entry = WindowEntryTryBuilder {
            input_state: InputState::default(),
            input_frame: InputFrame::default(),
            clock: FrameClock::default(),
            window,
            gpu_builder: |w| pollster::block_on(Gpu::new(w, gpu_init)),
        }
        .try_build()
        .context("GPU initialization failed")?;

        let (app, windowed, exit) = (&mut self.app, &mut self.windowed, &mut self.exit_requested);
        let start_fullscreen = self.config.start_fullscreen;
        entry.with(|fields| {
            let mut window = WindowCtx::new(fields.window, windowed, exit);
            if start_fullscreen {
                window.set_fullscreen(true);
            }
            app.on_start(fields.gpu, &mut window)
        })?;

        self.entry = Some(entry);
        Ok(())
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let (app, windowed, exit) = (&mut self.app, &mut self.windowed, &mut self.exit_requested);
        let Some(entry) = self.entry.as_mut() else { return };

        let result = entry.with_mut(|fields| {
            let time = fields.clock.tick();
            let result = {
                let mut ctx = FrameCtx {
                    window: WindowCtx::new(fields.window, windowed, exit),
                    gpu: fields.gpu,
                    input: fields.input_state,
                    input_frame: fields.input_frame,
                    time,
                };
                app.on_frame(&mut ctx)
            };
            fields.input_frame.clear();
            result
        });

        match result {
            Ok(AppControl::Continue) => {}
            Ok(AppControl::Exit) => self.exit_requested = true,
            Err(err) => self.fail(event_loop, err.context("frame failed")),
        }
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        let app = &mut self.app;
        let Some(entry) = self.entry.as_mut() else { return };
        entry.with_gpu_mut(|gpu| gpu.resize(size));
        if size.width == 0 || size.height == 0 {
            return;
        }
        entry.with(|fields| app.on_resize(fields.gpu, (size.width, size.height)));
        entry.with_window(|w| w.request_redraw());
    }
}

impl<A> ApplicationHandler for AppState<A>
where
    A: App + 'static,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.entry.is_some() {
            return;
        }
        if let Err(err) = self.create_entry(event_loop) {
            self.fail(event_loop, err);
            return;
        }
        if let Some(entry) = &self.entry {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        // Continuous redraw: the camera integrates held keys every frame.
        event_loop.set_control_flow(ControlFlow::Poll);
        if let Some(entry) = &self.entry {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        let (app, windowed, exit) = (&mut self.app, &mut self.windowed, &mut self.exit_requested);
        let Some(entry) = self.entry.as_mut() else { return };

        entry.with_mut(|fields| {
            if let Some(ev) = translate_window_event(fields.window, &event) {
                fields.input_state.apply_event(fields.input_frame, ev.clone());
                let mut window = WindowCtx::new(fields.window, windowed, exit);
                app.on_input(&ev, &mut window);
            }
        });

        match event {
            WindowEvent::CloseRequested => {
                self.entry = None;
                self.exit_requested = true;
            }
            WindowEvent::Resized(size) => self.resize(size),
            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(size) = self.entry.as_ref().map(|e| e.with_window(|w| w.inner_size())) {
                    self.resize(size);
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }

        if self.exit_requested {
            event_loop.exit();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        // Device and surface go before the window they borrow.
        self.entry = None;
    }
}
