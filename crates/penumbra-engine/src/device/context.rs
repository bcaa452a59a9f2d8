use anyhow::{Context, Result};
use winit::dpi::PhysicalSize;
use winit::window::Window;

use super::surface;
use super::{GpuFrame, GpuInit, SurfaceErrorAction};

/// Device and queue plus the window surface they present to.
///
/// Borrows the window for `'w`; the runtime keeps both in one
/// self-referencing entry.
pub struct Gpu<'w> {
    surface: wgpu::Surface<'w>,
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_config: wgpu::SurfaceConfiguration,
    /// Last size reported by the window; may be zero while minimized, in
    /// which case `surface_config` keeps the previous extent.
    size: PhysicalSize<u32>,
}

impl<'w> Gpu<'w> {
    pub async fn new(window: &'w Window, init: GpuInit) -> Result<Self> {
        let size = window.inner_size();
        anyhow::ensure!(
            size.width > 0 && size.height > 0,
            "cannot create a surface for a {}x{} window",
            size.width,
            size.height
        );

        let instance = GpuInit::instance();
        let surface = instance
            .create_surface(window)
            .context("failed to create a surface for the window")?;
        let adapter = init.request_adapter(&instance, Some(&surface)).await?;
        let (device, queue) = init.request_device(&adapter, "penumbra device").await?;

        let caps = surface.get_capabilities(&adapter);
        let surface_config = surface::configuration(&caps, &init, (size.width, size.height))
            .context("adapter cannot present to this window")?;
        surface.configure(&device, &surface_config);
        log::info!(
            "surface: {:?} {}x{}, {:?}",
            surface_config.format,
            surface_config.width,
            surface_config.height,
            surface_config.present_mode
        );

        Ok(Self {
            surface,
            adapter,
            device,
            queue,
            surface_config,
            size,
        })
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_config.format
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn adapter(&self) -> &wgpu::Adapter {
        &self.adapter
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    fn has_area(&self) -> bool {
        self.size.width > 0 && self.size.height > 0
    }

    /// Applies a new window size to the surface. Zero sizes are only
    /// recorded.
    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        self.size = size;
        if !self.has_area() {
            return;
        }
        self.surface_config.width = size.width;
        self.surface_config.height = size.height;
        self.surface.configure(&self.device, &self.surface_config);
    }

    /// Acquires the next surface image and opens an encoder for it.
    pub fn begin_frame(&self) -> Result<GpuFrame, wgpu::SurfaceError> {
        let surface_texture = self.surface.get_current_texture()?;
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("penumbra frame"),
            });
        Ok(GpuFrame {
            surface_texture,
            view,
            encoder,
        })
    }

    /// Submits the frame's commands, then presents its image.
    pub fn submit(&self, frame: GpuFrame) {
        let GpuFrame {
            surface_texture,
            view,
            encoder,
        } = frame;
        self.queue.submit(std::iter::once(encoder.finish()));
        drop(view);
        surface_texture.present();
    }

    pub fn handle_surface_error(&mut self, err: wgpu::SurfaceError) -> SurfaceErrorAction {
        let action = SurfaceErrorAction::for_error(&err);
        if action == SurfaceErrorAction::Reconfigured && self.has_area() {
            self.surface.configure(&self.device, &self.surface_config);
        }
        log::debug!("surface error {err:?}: {action:?}");
        action
    }
}
