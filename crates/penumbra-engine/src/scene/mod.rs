//! Scene model: mesh and texture arenas, drawable instances and lights.
//!
//! Drawables refer to meshes and textures by arena index, so any number of
//! instances can share one upload. The scene is built once and then only read
//! by the render loop, apart from the per-frame light matrix refresh.

mod light;
mod load;

use glam::Mat4;

use crate::render::resources::{GpuMesh, GpuTexture};

pub use light::{validate_light, Light, LightDesc, SceneError, ShadowConfig, ShadowTarget};
pub use load::{
    stage_primitives, LoadReport, RawImage, RawPrimitive, SkipReason, SkippedPrimitive,
    StagedImage, StagedPrimitive,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(usize);

/// One mesh placed in the world with its two material textures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Drawable {
    pub mesh: MeshId,
    pub transform: Mat4,
    pub base_color: TextureId,
    pub metallic_roughness: TextureId,
}

#[derive(Debug, Default)]
pub struct Scene {
    meshes: Vec<GpuMesh>,
    textures: Vec<GpuTexture>,
    drawables: Vec<Drawable>,
    lights: Vec<Light>,
    shadow: ShadowConfig,
    revision: u64,
}

impl Scene {
    pub fn new(shadow: ShadowConfig) -> Self {
        Self {
            shadow,
            ..Self::default()
        }
    }

    pub fn add_mesh(&mut self, mesh: GpuMesh) -> MeshId {
        self.meshes.push(mesh);
        self.revision += 1;
        MeshId(self.meshes.len() - 1)
    }

    pub fn add_texture(&mut self, texture: GpuTexture) -> TextureId {
        self.textures.push(texture);
        self.revision += 1;
        TextureId(self.textures.len() - 1)
    }

    /// Adds an instance; every handle must come from this scene.
    pub fn add_drawable(&mut self, drawable: Drawable) -> Result<(), SceneError> {
        if drawable.mesh.0 >= self.meshes.len() {
            return Err(SceneError::DanglingHandle {
                kind: "mesh",
                index: drawable.mesh.0,
            });
        }
        for id in [drawable.base_color, drawable.metallic_roughness] {
            if id.0 >= self.textures.len() {
                return Err(SceneError::DanglingHandle {
                    kind: "texture",
                    index: id.0,
                });
            }
        }
        self.push_drawable(drawable);
        Ok(())
    }

    fn push_drawable(&mut self, drawable: Drawable) {
        self.drawables.push(drawable);
        self.revision += 1;
    }

    /// Adds a light in the next free slot, allocating its shadow target.
    pub fn add_light(&mut self, device: &wgpu::Device, desc: &LightDesc) -> Result<usize, SceneError> {
        let slot = self.lights.len();
        validate_light(desc, slot, &self.shadow)?;
        self.lights.push(Light::new(device, slot, desc, &self.shadow));
        self.revision += 1;
        log::debug!(
            "light {slot}: dir {:?}, shadow map {}px",
            desc.direction,
            desc.shadow_resolution
        );
        Ok(slot)
    }

    /// Re-derives every light's shadow transform from its current direction.
    pub fn update_light_matrices(&mut self) {
        for light in &mut self.lights {
            light.refresh_proj_view(&self.shadow);
        }
    }

    pub fn mesh(&self, id: MeshId) -> &GpuMesh {
        &self.meshes[id.0]
    }

    pub fn texture(&self, id: TextureId) -> &GpuTexture {
        &self.textures[id.0]
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn drawables(&self) -> &[Drawable] {
        &self.drawables
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn shadow_config(&self) -> &ShadowConfig {
        &self.shadow
    }

    /// Bumped on every structural change; cached bind groups key off it.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}
