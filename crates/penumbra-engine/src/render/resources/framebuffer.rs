pub const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Offscreen color + depth target that can also be sampled.
///
/// Resizing replaces the attachments in place and bumps
/// [`FrameBuffer::generation`], so callers holding bind groups over the old
/// views know to rebuild them.
#[derive(Debug)]
pub struct FrameBuffer {
    label: String,
    color: Option<Attachment>,
    depth: Option<Attachment>,
    color_format: wgpu::TextureFormat,
    width: u32,
    height: u32,
    generation: u64,
}

#[derive(Debug)]
struct Attachment {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl FrameBuffer {
    /// HDR color plus depth.
    pub fn new(device: &wgpu::Device, label: &str, width: u32, height: u32) -> Self {
        Self::build(device, label, HDR_FORMAT, true, true, width, height)
    }

    /// Depth-only target (shadow maps).
    pub fn depth_only(device: &wgpu::Device, label: &str, width: u32, height: u32) -> Self {
        Self::build(device, label, HDR_FORMAT, false, true, width, height)
    }

    /// Color-only target in `format`.
    pub fn color_only(
        device: &wgpu::Device,
        label: &str,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        Self::build(device, label, format, true, false, width, height)
    }

    fn build(
        device: &wgpu::Device,
        label: &str,
        color_format: wgpu::TextureFormat,
        with_color: bool,
        with_depth: bool,
        width: u32,
        height: u32,
    ) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        let color = with_color
            .then(|| Attachment::new(device, &format!("{label} color"), color_format, width, height));
        let depth = with_depth
            .then(|| Attachment::new(device, &format!("{label} depth"), DEPTH_FORMAT, width, height));
        Self {
            label: label.to_string(),
            color,
            depth,
            color_format,
            width,
            height,
            generation: 0,
        }
    }

    /// Reallocates the attachments at the new size. Returns false when the
    /// size did not change.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) -> bool {
        let (width, height) = (width.max(1), height.max(1));
        if (width, height) == (self.width, self.height) {
            return false;
        }
        if self.color.is_some() {
            self.color = Some(Attachment::new(
                device,
                &format!("{} color", self.label),
                self.color_format,
                width,
                height,
            ));
        }
        if self.depth.is_some() {
            self.depth = Some(Attachment::new(
                device,
                &format!("{} depth", self.label),
                DEPTH_FORMAT,
                width,
                height,
            ));
        }
        self.width = width;
        self.height = height;
        self.generation += 1;
        log::debug!("framebuffer '{}' resized to {width}x{height}", self.label);
        true
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn color_format(&self) -> Option<wgpu::TextureFormat> {
        self.color.as_ref().map(|_| self.color_format)
    }

    pub fn color_view(&self) -> Option<&wgpu::TextureView> {
        self.color.as_ref().map(|a| &a.view)
    }

    pub fn depth_view(&self) -> Option<&wgpu::TextureView> {
        self.depth.as_ref().map(|a| &a.view)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Attachment {
    fn new(
        device: &wgpu::Device,
        label: &str,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}
