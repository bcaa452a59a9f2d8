//! CPU staging of loader output and upload into a [`Scene`].
//!
//! Staging is pure: it validates geometry and decodes images, and turns every
//! failure into a logged skip. Upload then only touches the device.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use glam::Mat4;

use crate::render::resources::{GeometryError, GpuMesh, GpuTexture, ImageData, MeshGeometry};

use super::{Drawable, Scene, TextureId};

/// Encoded image plus a key identifying its source (URI or buffer view), so
/// shared images decode and upload once.
#[derive(Debug, Clone)]
pub struct RawImage {
    pub key: String,
    pub bytes: Arc<[u8]>,
}

/// One primitive as produced by an asset loader. Any field may be missing.
#[derive(Debug, Clone, Default)]
pub struct RawPrimitive {
    pub label: String,
    pub positions: Option<Vec<[f32; 3]>>,
    pub normals: Option<Vec<[f32; 3]>>,
    pub uvs: Option<Vec<[f32; 2]>>,
    pub indices: Option<Vec<u32>>,
    pub base_color: Option<RawImage>,
    pub metallic_roughness: Option<RawImage>,
    /// Set by the loader for primitives that are not triangle lists, e.g.
    /// `"Lines"`. Such primitives carry no data and are always skipped.
    pub unsupported_mode: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StagedImage {
    pub key: String,
    pub image: Arc<ImageData>,
}

/// A primitive that passed every check and is ready for upload.
#[derive(Debug, Clone)]
pub struct StagedPrimitive {
    pub label: String,
    pub geometry: MeshGeometry,
    pub base_color: StagedImage,
    pub metallic_roughness: StagedImage,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    UnsupportedMode(String),
    MissingAttribute(&'static str),
    MissingTexture(&'static str),
    UndecodableTexture { which: &'static str, error: String },
    InvalidGeometry(GeometryError),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnsupportedMode(mode) => write!(f, "{mode} primitives are not supported"),
            SkipReason::MissingAttribute(name) => write!(f, "missing {name} attribute"),
            SkipReason::MissingTexture(which) => write!(f, "missing {which} texture"),
            SkipReason::UndecodableTexture { which, error } => {
                write!(f, "{which} texture not decodable: {error}")
            }
            SkipReason::InvalidGeometry(err) => write!(f, "invalid geometry: {err}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedPrimitive {
    pub index: usize,
    pub label: String,
    pub reason: SkipReason,
}

/// Outcome of staging a primitive sequence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub total: usize,
    pub skipped: Vec<SkippedPrimitive>,
}

impl LoadReport {
    pub fn accepted(&self) -> usize {
        self.total - self.skipped.len()
    }
}

const BASE_COLOR: &str = "base color";
const METALLIC_ROUGHNESS: &str = "metallic-roughness";

/// Validates and decodes `raw`, keeping primitive order. Each rejected
/// primitive is logged at `warn` and recorded in the report.
pub fn stage_primitives(
    raw: impl IntoIterator<Item = RawPrimitive>,
) -> (Vec<StagedPrimitive>, LoadReport) {
    let mut decoded: HashMap<String, Result<Arc<ImageData>, String>> = HashMap::new();
    let mut staged = Vec::new();
    let mut report = LoadReport::default();

    for (index, prim) in raw.into_iter().enumerate() {
        report.total += 1;
        let label = prim.label.clone();
        match stage_one(prim, &mut decoded) {
            Ok(s) => staged.push(s),
            Err(reason) => {
                log::warn!("skipping primitive #{index} '{label}': {reason}");
                report.skipped.push(SkippedPrimitive { index, label, reason });
            }
        }
    }

    (staged, report)
}

fn stage_one(
    prim: RawPrimitive,
    decoded: &mut HashMap<String, Result<Arc<ImageData>, String>>,
) -> Result<StagedPrimitive, SkipReason> {
    if let Some(mode) = prim.unsupported_mode {
        return Err(SkipReason::UnsupportedMode(mode));
    }
    let positions = prim.positions.ok_or(SkipReason::MissingAttribute("POSITION"))?;
    let normals = prim.normals.ok_or(SkipReason::MissingAttribute("NORMAL"))?;
    let uvs = prim.uvs.ok_or(SkipReason::MissingAttribute("TEXCOORD_0"))?;
    let indices = prim.indices.ok_or(SkipReason::MissingAttribute("indices"))?;

    let geometry = MeshGeometry {
        positions,
        normals,
        uvs,
        indices,
    };
    geometry.validate().map_err(SkipReason::InvalidGeometry)?;

    let base_color = prim
        .base_color
        .ok_or(SkipReason::MissingTexture(BASE_COLOR))?;
    let metallic_roughness = prim
        .metallic_roughness
        .ok_or(SkipReason::MissingTexture(METALLIC_ROUGHNESS))?;

    Ok(StagedPrimitive {
        label: prim.label,
        geometry,
        base_color: decode_cached(BASE_COLOR, base_color, decoded)?,
        metallic_roughness: decode_cached(METALLIC_ROUGHNESS, metallic_roughness, decoded)?,
    })
}

fn decode_cached(
    which: &'static str,
    raw: RawImage,
    decoded: &mut HashMap<String, Result<Arc<ImageData>, String>>,
) -> Result<StagedImage, SkipReason> {
    let result = decoded
        .entry(raw.key.clone())
        .or_insert_with(|| {
            ImageData::decode(&raw.bytes)
                .map(Arc::new)
                .map_err(|e| e.to_string())
        })
        .clone();

    match result {
        Ok(image) => Ok(StagedImage { key: raw.key, image }),
        Err(error) => Err(SkipReason::UndecodableTexture { which, error }),
    }
}

impl Scene {
    /// Uploads staged primitives, one drawable each, all sharing `transform`.
    /// Images referenced by several primitives are uploaded once.
    pub fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        staged: &[StagedPrimitive],
        transform: Mat4,
    ) {
        let mut uploaded: HashMap<(String, wgpu::TextureFormat), TextureId> = HashMap::new();
        let mut texture = |scene: &mut Scene, img: &StagedImage, format: wgpu::TextureFormat| {
            *uploaded.entry((img.key.clone(), format)).or_insert_with(|| {
                scene.add_texture(GpuTexture::from_image(device, queue, &img.key, &img.image, format))
            })
        };

        for prim in staged {
            let mesh = self.add_mesh(GpuMesh::upload(device, &prim.label, &prim.geometry));
            let base_color = texture(self, &prim.base_color, wgpu::TextureFormat::Rgba8UnormSrgb);
            let metallic_roughness =
                texture(self, &prim.metallic_roughness, wgpu::TextureFormat::Rgba8Unorm);
            self.push_drawable(Drawable {
                mesh,
                transform,
                base_color,
                metallic_roughness,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png(channels: u8) -> Arc<[u8]> {
        let img: image::DynamicImage = match channels {
            1 => image::GrayImage::from_pixel(2, 2, image::Luma([9])).into(),
            3 => image::RgbImage::from_pixel(2, 2, image::Rgb([9, 9, 9])).into(),
            _ => image::RgbaImage::from_pixel(2, 2, image::Rgba([9, 9, 9, 9])).into(),
        };
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes.into()
    }

    fn complete(label: &str) -> RawPrimitive {
        RawPrimitive {
            label: label.to_string(),
            positions: Some(vec![[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]),
            normals: Some(vec![[0.0, 0.0, 1.0]; 3]),
            uvs: Some(vec![[0.0; 2]; 3]),
            indices: Some(vec![0, 1, 2]),
            base_color: Some(RawImage {
                key: "albedo.png".into(),
                bytes: png(3),
            }),
            metallic_roughness: Some(RawImage {
                key: "mr.png".into(),
                bytes: png(4),
            }),
            unsupported_mode: None,
        }
    }

    // ── staging ───────────────────────────────────────────────────────────

    #[test]
    fn k_of_m_primitives_survive() {
        let mut no_mr = complete("no mr");
        no_mr.metallic_roughness = None;
        let mut gray = complete("gray");
        gray.base_color = Some(RawImage {
            key: "gray.png".into(),
            bytes: png(1),
        });
        let mut no_uv = complete("no uv");
        no_uv.uvs = None;

        let raw = vec![complete("a"), no_mr, complete("b"), gray, no_uv];
        let (staged, report) = stage_primitives(raw);

        assert_eq!(staged.len(), 2);
        assert_eq!(report.total, 5);
        assert_eq!(report.accepted(), 2);
        assert_eq!(report.skipped.len(), 3);

        let labels: Vec<&str> = staged.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, ["a", "b"]);

        let reasons: Vec<&SkipReason> = report.skipped.iter().map(|s| &s.reason).collect();
        assert_eq!(reasons[0], &SkipReason::MissingTexture(METALLIC_ROUGHNESS));
        assert!(matches!(
            reasons[1],
            SkipReason::UndecodableTexture { which: BASE_COLOR, .. }
        ));
        assert_eq!(reasons[2], &SkipReason::MissingAttribute("TEXCOORD_0"));
        assert_eq!(report.skipped[1].index, 3);
    }

    #[test]
    fn shared_images_decode_once() {
        let (staged, _) = stage_primitives(vec![complete("a"), complete("b")]);
        assert!(Arc::ptr_eq(&staged[0].base_color.image, &staged[1].base_color.image));
    }

    #[test]
    fn bad_geometry_is_skipped() {
        let mut bad = complete("bad");
        bad.indices = Some(vec![0, 1]);
        let (staged, report) = stage_primitives(vec![bad]);
        assert!(staged.is_empty());
        assert_eq!(
            report.skipped[0].reason,
            SkipReason::InvalidGeometry(GeometryError::PartialTriangle(2))
        );
    }

    #[test]
    fn non_triangle_primitives_count_as_skips() {
        let lines = RawPrimitive {
            label: "wire/0".into(),
            unsupported_mode: Some("Lines".into()),
            ..RawPrimitive::default()
        };
        let (staged, report) = stage_primitives(vec![complete("a"), lines, complete("b")]);
        assert_eq!(staged.len(), 2);
        assert_eq!(report.total, 3);
        assert_eq!(report.accepted(), 2);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].index, 1);
        assert_eq!(report.skipped[0].reason, SkipReason::UnsupportedMode("Lines".into()));
        assert!(report.skipped[0].reason.to_string().contains("Lines"));
    }

    #[test]
    fn skip_reason_names_the_missing_piece() {
        let text = SkipReason::MissingTexture(METALLIC_ROUGHNESS).to_string();
        assert!(text.contains("metallic-roughness"));
    }

    // ── upload ────────────────────────────────────────────────────────────

    #[test]
    fn upload_shares_textures_between_drawables() {
        let Some(gpu) = crate::device::HeadlessGpu::for_tests() else {
            return;
        };
        let (staged, _) = stage_primitives(vec![complete("a"), complete("b")]);
        let mut scene = Scene::default();
        scene.upload(gpu.device(), gpu.queue(), &staged, Mat4::IDENTITY);

        assert_eq!(scene.drawables().len(), 2);
        assert_eq!(scene.texture_count(), 2);
        assert_eq!(scene.drawables()[0].base_color, scene.drawables()[1].base_color);
        assert_ne!(scene.drawables()[0].mesh, scene.drawables()[1].mesh);
    }
}
