use std::path::PathBuf;

use anyhow::{Context, Result};
use glam::Mat4;

use penumbra_engine::assets::{AssetLoader, GltfLoader};
use penumbra_engine::camera::{Camera, CameraConfig, FlyController};
use penumbra_engine::core::{App, AppControl, FrameCtx, FrameOutcome, WindowCtx};
use penumbra_engine::device::Gpu;
use penumbra_engine::input::{InputEvent, Key};
use penumbra_engine::render::{PassKind, RenderCtx, RenderEngine, RendererConfig};
use penumbra_engine::scene::{stage_primitives, LightDesc, Scene, ShadowConfig};
use penumbra_engine::time::FpsCounter;

/// Scene and renderer, created once the device exists.
struct Loaded {
    scene: Scene,
    engine: RenderEngine,
}

/// Fly-through viewer for one glTF scene.
pub struct ViewerApp {
    scene_path: PathBuf,
    camera: Camera,
    controller: FlyController,
    loaded: Option<Loaded>,
    /// Set by the F11 handler, applied at the start of the next frame.
    fullscreen_pending: bool,
    fps: FpsCounter,
}

impl ViewerApp {
    pub fn new(scene_path: PathBuf) -> Self {
        Self {
            scene_path,
            camera: Camera::new(&CameraConfig::default()),
            controller: FlyController::default(),
            loaded: None,
            fullscreen_pending: false,
            fps: FpsCounter::new(),
        }
    }

    fn load(&mut self, gpu: &Gpu<'_>) -> Result<Loaded> {
        let raw = GltfLoader
            .load_file(&self.scene_path)
            .with_context(|| format!("failed to load {}", self.scene_path.display()))?;
        let (staged, report) = stage_primitives(raw);

        let mut scene = Scene::new(ShadowConfig::default());
        scene.upload(gpu.device(), gpu.queue(), &staged, Mat4::IDENTITY);
        for desc in LightDesc::default_pair() {
            scene
                .add_light(gpu.device(), &desc)
                .context("default light rejected")?;
        }
        log::info!(
            "scene ready: {} drawables, {} lights, {} of {} primitives skipped",
            scene.drawables().len(),
            scene.lights().len(),
            report.skipped.len(),
            report.total
        );

        let size = gpu.size();
        let (w, h) = (size.width.max(1), size.height.max(1));
        self.camera.set_aspect_ratio(w as f32 / h as f32);

        let ctx = RenderCtx::new(gpu.device(), gpu.queue(), gpu.surface_format(), (w, h));
        let engine = RenderEngine::new(&ctx, RendererConfig::default())?;
        Ok(Loaded { scene, engine })
    }
}

impl App for ViewerApp {
    fn on_start(&mut self, gpu: &Gpu<'_>, window: &mut WindowCtx<'_>) -> Result<()> {
        window.set_cursor_visible(false);
        self.loaded = Some(self.load(gpu)?);
        Ok(())
    }

    fn on_input(&mut self, event: &InputEvent, window: &mut WindowCtx<'_>) {
        if event.is_press(Key::Escape) {
            window.exit();
            return;
        }
        if event.is_press(Key::F11) {
            self.fullscreen_pending = true;
            return;
        }

        match *event {
            InputEvent::PointerMoved { x, y } => self.controller.pointer_moved(&mut self.camera, x, y),
            InputEvent::PointerLeft | InputEvent::Focused(false) => self.controller.reset_pointer(),
            InputEvent::MouseWheel(delta) => self.controller.scrolled(&mut self.camera, delta.lines_y()),
            _ => {}
        }
    }

    fn on_resize(&mut self, gpu: &Gpu<'_>, (w, h): (u32, u32)) {
        match &mut self.loaded {
            Some(loaded) => loaded.engine.resize(gpu.device(), w, h, &mut self.camera),
            None => self.camera.set_aspect_ratio(w as f32 / h as f32),
        }
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> Result<AppControl> {
        if std::mem::take(&mut self.fullscreen_pending) {
            ctx.window.toggle_fullscreen();
            // The pointer jumps with the window.
            self.controller.reset_pointer();
        }

        self.controller.update(&mut self.camera, ctx.input, ctx.time.dt);

        let Some(Loaded { scene, engine }) = self.loaded.as_mut() else {
            return Ok(AppControl::Continue);
        };

        let camera = &self.camera;
        let outcome = ctx.render(|rctx, target| {
            engine.render(rctx, target, scene, camera)?;
            Ok(())
        })?;
        if outcome == FrameOutcome::Presented {
            engine.after_submit(ctx.gpu.device());
        }

        if let Some(sample) = self.fps.frame(ctx.time.dt) {
            let t = engine.timings();
            log::debug!(
                "{:.1} fps ({:.2} ms) | gpu shadow {:.2} lit {:.2} volumetric {:.2} composite {:.2} total {:.2} ms",
                sample.fps,
                sample.avg_dt * 1000.0,
                t.pass(PassKind::Shadow),
                t.pass(PassKind::Lit),
                t.pass(PassKind::Volumetric),
                t.pass(PassKind::Composite),
                t.total_ms(),
            );
        }

        Ok(AppControl::Continue)
    }
}
