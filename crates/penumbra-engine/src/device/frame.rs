/// One acquired swapchain image plus the encoder recording into it.
///
/// Dropping the surface texture after submit presents it, so the frame must
/// not be held across iterations.
pub struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
    pub encoder: wgpu::CommandEncoder,
}

impl GpuFrame {
    /// Pixel size of the acquired image.
    pub fn size(&self) -> (u32, u32) {
        let t = &self.surface_texture.texture;
        (t.width(), t.height())
    }
}
