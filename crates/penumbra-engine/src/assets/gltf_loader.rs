use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::scene::{RawImage, RawPrimitive};

use super::{AssetError, AssetLoader};

/// glTF 2.0 loader (`.gltf` with external or embedded buffers, or `.glb`).
///
/// Every primitive of every mesh is emitted in document order. Node
/// transforms are ignored; the scene places all primitives with one shared
/// transform.
#[derive(Debug, Default, Clone, Copy)]
pub struct GltfLoader;

impl AssetLoader for GltfLoader {
    fn load(&self, scene_file: &Path, resource_dir: &Path) -> Result<Vec<RawPrimitive>, AssetError> {
        let gltf::Gltf { document, blob } = gltf::Gltf::open(scene_file)?;
        let buffers = gltf::import_buffers(&document, Some(resource_dir), blob)?;

        let mut images = ImageCache::new(resource_dir);
        let mut out = Vec::new();

        for mesh in document.meshes() {
            let mesh_name = mesh.name().unwrap_or("mesh");
            for primitive in mesh.primitives() {
                let label = format!("{mesh_name}/{}", primitive.index());
                if primitive.mode() != gltf::mesh::Mode::Triangles {
                    out.push(RawPrimitive {
                        label,
                        unsupported_mode: Some(format!("{:?}", primitive.mode())),
                        ..RawPrimitive::default()
                    });
                    continue;
                }

                let reader = primitive.reader(|b| buffers.get(b.index()).map(|d| d.0.as_slice()));
                let pbr = primitive.material().pbr_metallic_roughness();

                let base_color = match pbr.base_color_texture() {
                    Some(info) => images.get(&info.texture(), &buffers)?,
                    None => None,
                };
                let metallic_roughness = match pbr.metallic_roughness_texture() {
                    Some(info) => images.get(&info.texture(), &buffers)?,
                    None => None,
                };

                out.push(RawPrimitive {
                    label,
                    positions: reader.read_positions().map(|p| p.collect()),
                    normals: reader.read_normals().map(|n| n.collect()),
                    uvs: reader.read_tex_coords(0).map(|t| t.into_f32().collect()),
                    indices: reader.read_indices().map(|i| i.into_u32().collect()),
                    base_color,
                    metallic_roughness,
                    unsupported_mode: None,
                });
            }
        }

        log::info!(
            "loaded {} primitives and {} images from {}",
            out.len(),
            images.len(),
            scene_file.display()
        );
        Ok(out)
    }
}

/// Reads each referenced image once.
struct ImageCache<'a> {
    dir: &'a Path,
    by_index: HashMap<usize, Option<RawImage>>,
}

impl<'a> ImageCache<'a> {
    fn new(dir: &'a Path) -> Self {
        Self {
            dir,
            by_index: HashMap::new(),
        }
    }

    fn len(&self) -> usize {
        self.by_index.values().filter(|i| i.is_some()).count()
    }

    /// `Ok(None)` when the image exists in the document but cannot be read
    /// from disk.
    fn get(
        &mut self,
        texture: &gltf::Texture<'_>,
        buffers: &[gltf::buffer::Data],
    ) -> Result<Option<RawImage>, AssetError> {
        let image = texture.source();
        if let Some(cached) = self.by_index.get(&image.index()) {
            return Ok(cached.clone());
        }

        let raw = match image.source() {
            gltf::image::Source::Uri { uri, .. } => {
                if uri.starts_with("data:") {
                    log::warn!("image {}: data URIs are not supported", image.index());
                    None
                } else {
                    let path = self.dir.join(uri);
                    match std::fs::read(&path) {
                        Ok(bytes) => Some(RawImage {
                            key: uri.to_string(),
                            bytes: bytes.into(),
                        }),
                        Err(err) => {
                            log::warn!("image {}: cannot read {}: {err}", image.index(), path.display());
                            None
                        }
                    }
                }
            }
            gltf::image::Source::View { view, .. } => {
                let data = buffers
                    .get(view.buffer().index())
                    .ok_or(AssetError::MissingBuffer {
                        index: view.buffer().index(),
                    })?;
                let (offset, length) = (view.offset(), view.length());
                let bytes = data
                    .0
                    .get(offset..offset + length)
                    .ok_or(AssetError::ViewOutOfBounds {
                        view: view.index(),
                        offset,
                        length,
                        available: data.0.len(),
                    })?;
                Some(RawImage {
                    key: format!("#view{}", view.index()),
                    bytes: Arc::from(bytes),
                })
            }
        };

        self.by_index.insert(image.index(), raw.clone());
        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{stage_primitives, SkipReason};
    use std::io::Cursor;
    use std::path::PathBuf;

    const DOC: &str = r#"{
        "asset": { "version": "2.0" },
        "buffers": [{ "uri": "tri.bin", "byteLength": 108 }],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
            { "buffer": 0, "byteOffset": 36, "byteLength": 36 },
            { "buffer": 0, "byteOffset": 72, "byteLength": 24 },
            { "buffer": 0, "byteOffset": 96, "byteLength": 12 }
        ],
        "accessors": [
            { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
              "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] },
            { "bufferView": 1, "componentType": 5126, "count": 3, "type": "VEC3" },
            { "bufferView": 2, "componentType": 5126, "count": 3, "type": "VEC2" },
            { "bufferView": 3, "componentType": 5125, "count": 3, "type": "SCALAR" }
        ],
        "images": [{ "uri": "albedo.png" }],
        "textures": [{ "source": 0 }],
        "materials": [{
            "pbrMetallicRoughness": {
                "baseColorTexture": { "index": 0 },
                "metallicRoughnessTexture": { "index": 0 }
            }
        }],
        "meshes": [{
            "name": "tri",
            "primitives": [
                { "attributes": { "POSITION": 0, "NORMAL": 1, "TEXCOORD_0": 2 },
                  "indices": 3, "material": 0 },
                { "attributes": { "POSITION": 0 }, "indices": 3 },
                { "attributes": { "POSITION": 0 }, "mode": 1 }
            ]
        }]
    }"#;

    fn fixture_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("penumbra-gltf-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let mut bin: Vec<u8> = Vec::new();
        let floats: [f32; 24] = [
            0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, // positions
            0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, // normals
            0.0, 0.0, 1.0, 0.0, 0.0, 1.0, // uvs
        ];
        bin.extend_from_slice(bytemuck::cast_slice(&floats));
        bin.extend_from_slice(bytemuck::cast_slice(&[0u32, 1, 2]));
        std::fs::write(dir.join("tri.bin"), &bin).unwrap();

        let mut png = Vec::new();
        image::RgbImage::from_pixel(2, 2, image::Rgb([200, 100, 50]))
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        std::fs::write(dir.join("albedo.png"), &png).unwrap();

        std::fs::write(dir.join("scene.gltf"), DOC).unwrap();
        dir
    }

    #[test]
    fn reads_primitives_and_external_images() {
        let dir = fixture_dir();
        let raw = GltfLoader.load_file(&dir.join("scene.gltf")).unwrap();

        assert_eq!(raw.len(), 3);
        let tri = &raw[0];
        assert_eq!(tri.label, "tri/0");
        assert_eq!(tri.positions.as_ref().map(Vec::len), Some(3));
        assert_eq!(tri.uvs.as_ref().map(|u| u[1]), Some([1.0, 0.0]));
        assert_eq!(tri.indices.as_deref(), Some(&[0, 1, 2][..]));
        assert_eq!(tri.base_color.as_ref().map(|i| i.key.as_str()), Some("albedo.png"));

        let bare = &raw[1];
        assert!(bare.normals.is_none());
        assert!(bare.base_color.is_none());

        let lines = &raw[2];
        assert_eq!(lines.label, "tri/2");
        assert_eq!(lines.unsupported_mode.as_deref(), Some("Lines"));
        assert!(lines.positions.is_none());

        let (staged, report) = stage_primitives(raw);
        assert_eq!(staged.len(), 1);
        assert_eq!(report.total, 3);
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(report.skipped[1].reason, SkipReason::UnsupportedMode("Lines".into()));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = GltfLoader
            .load_file(Path::new("/definitely/not/here.gltf"))
            .unwrap_err();
        assert!(matches!(err, AssetError::Gltf(_)));
    }
}
