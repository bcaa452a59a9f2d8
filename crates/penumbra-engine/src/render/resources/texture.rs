use image::imageops::FilterType;

/// Decoded 8-bit RGBA pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum TextureError {
    #[error("unsupported channel count {0} (expected 3 or 4)")]
    UnsupportedChannels(u8),

    #[error("unsupported sample format {0:?} (expected 8 bits per channel)")]
    UnsupportedSampleFormat(image::ColorType),

    #[error("image has zero size")]
    Empty,

    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

impl ImageData {
    /// Decodes an encoded image (PNG or JPEG).
    ///
    /// Only 8-bit RGB and RGBA sources are accepted; RGB is expanded to RGBA.
    pub fn decode(bytes: &[u8]) -> Result<Self, TextureError> {
        let img = image::load_from_memory(bytes)?;
        let color = img.color();
        match color.channel_count() {
            3 | 4 => {}
            n => return Err(TextureError::UnsupportedChannels(n)),
        }
        if !matches!(color, image::ColorType::Rgb8 | image::ColorType::Rgba8) {
            return Err(TextureError::UnsupportedSampleFormat(color));
        }
        if img.width() == 0 || img.height() == 0 {
            return Err(TextureError::Empty);
        }
        let rgba = img.to_rgba8();
        Ok(Self {
            width: rgba.width(),
            height: rgba.height(),
            rgba: rgba.into_raw(),
        })
    }

    pub fn solid(rgba: [u8; 4]) -> Self {
        Self {
            width: 1,
            height: 1,
            rgba: rgba.to_vec(),
        }
    }

    /// Number of levels in a full mip chain down to 1x1.
    pub fn mip_level_count(&self) -> u32 {
        32 - self.width.max(self.height).max(1).leading_zeros()
    }

    /// Box-filtered mip levels below level 0, largest first.
    fn mip_chain(&self) -> Vec<ImageData> {
        let Some(mut prev) =
            image::RgbaImage::from_raw(self.width, self.height, self.rgba.clone())
        else {
            return Vec::new();
        };

        let mut levels = Vec::new();
        for _ in 1..self.mip_level_count() {
            let w = (prev.width() / 2).max(1);
            let h = (prev.height() / 2).max(1);
            let next = image::imageops::resize(&prev, w, h, FilterType::Triangle);
            levels.push(ImageData {
                width: w,
                height: h,
                rgba: next.as_raw().clone(),
            });
            prev = next;
        }
        levels
    }
}

/// Sampled 2D texture with a default view.
#[derive(Debug)]
pub struct GpuTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl GpuTexture {
    /// Uploads `image` with a full mip chain.
    ///
    /// Use an sRGB `format` for color data and a linear one for packed
    /// material parameters.
    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        image: &ImageData,
        format: wgpu::TextureFormat,
    ) -> Self {
        let mip_level_count = image.mip_level_count();
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: image.width,
                height: image.height,
                depth_or_array_layers: 1,
            },
            mip_level_count,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        write_level(queue, &texture, 0, image);
        for (level, mip) in image.mip_chain().iter().enumerate() {
            write_level(queue, &texture, level as u32 + 1, mip);
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    /// 1x1 depth texture bound to shadow slots that have no light.
    pub fn depth_placeholder(device: &wgpu::Device) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("shadow placeholder"),
            size: wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: super::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn size(&self) -> (u32, u32) {
        (self.texture.width(), self.texture.height())
    }
}

fn write_level(queue: &wgpu::Queue, texture: &wgpu::Texture, mip_level: u32, image: &ImageData) {
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &image.rgba,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * image.width),
            rows_per_image: Some(image.height),
        },
        wgpu::Extent3d {
            width: image.width,
            height: image.height,
            depth_or_array_layers: 1,
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encode(img: image::DynamicImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn rgb_is_expanded_to_rgba() {
        let rgb = image::RgbImage::from_pixel(2, 3, image::Rgb([10, 20, 30]));
        let data = ImageData::decode(&encode(rgb.into())).unwrap();
        assert_eq!((data.width, data.height), (2, 3));
        assert_eq!(&data.rgba[0..4], &[10, 20, 30, 255]);
        assert_eq!(data.rgba.len(), 2 * 3 * 4);
    }

    #[test]
    fn rgba_is_kept() {
        let rgba = image::RgbaImage::from_pixel(1, 1, image::Rgba([1, 2, 3, 4]));
        let data = ImageData::decode(&encode(rgba.into())).unwrap();
        assert_eq!(data.rgba, vec![1, 2, 3, 4]);
    }

    #[test]
    fn grayscale_is_rejected() {
        let gray = image::GrayImage::from_pixel(4, 4, image::Luma([7]));
        let err = ImageData::decode(&encode(gray.into())).unwrap_err();
        assert!(matches!(err, TextureError::UnsupportedChannels(1)));

        let gray_alpha = image::GrayAlphaImage::from_pixel(4, 4, image::LumaA([7, 255]));
        let err = ImageData::decode(&encode(gray_alpha.into())).unwrap_err();
        assert!(matches!(err, TextureError::UnsupportedChannels(2)));
    }

    #[test]
    fn sixteen_bit_sources_are_rejected() {
        let rgb16 = image::ImageBuffer::<image::Rgb<u16>, Vec<u16>>::from_pixel(
            2,
            2,
            image::Rgb([1000, 2000, 3000]),
        );
        let err = ImageData::decode(&encode(rgb16.into())).unwrap_err();
        assert!(matches!(
            err,
            TextureError::UnsupportedSampleFormat(image::ColorType::Rgb16)
        ));

        let rgba16 = image::ImageBuffer::<image::Rgba<u16>, Vec<u16>>::from_pixel(
            1,
            1,
            image::Rgba([1, 2, 3, 4]),
        );
        let err = ImageData::decode(&encode(rgba16.into())).unwrap_err();
        assert!(matches!(
            err,
            TextureError::UnsupportedSampleFormat(image::ColorType::Rgba16)
        ));
    }

    #[test]
    fn garbage_fails_to_decode() {
        let err = ImageData::decode(b"definitely not a png").unwrap_err();
        assert!(matches!(err, TextureError::Decode(_)));
    }

    #[test]
    fn mip_chain_reaches_one_pixel() {
        let img = ImageData {
            width: 8,
            height: 2,
            rgba: vec![255; 8 * 2 * 4],
        };
        assert_eq!(img.mip_level_count(), 4);
        let chain = img.mip_chain();
        let sizes: Vec<(u32, u32)> = chain.iter().map(|m| (m.width, m.height)).collect();
        assert_eq!(sizes, vec![(4, 1), (2, 1), (1, 1)]);
    }
}
