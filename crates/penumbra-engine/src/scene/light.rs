use glam::{Mat4, Vec3};

use crate::render::resources::FrameBuffer;
use crate::render::units::{self, MAX_LIGHTS};

/// Orthographic frustum and look-at frame shared by every directional light's
/// shadow pass.
///
/// Only the light direction matters for shading; `eye` is just a concrete
/// point to build the look-at from. `up` must not be collinear with any light
/// direction.
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowConfig {
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
    pub near: f32,
    pub far: f32,
    pub eye: Vec3,
    pub up: Vec3,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            left: -20.0,
            right: 20.0,
            bottom: -15.0,
            top: 15.0,
            near: 0.0,
            far: 100.0,
            eye: Vec3::new(-4.0, 2.0, 5.0),
            up: Vec3::new(1.0, 0.0, 1.0),
        }
    }
}

impl ShadowConfig {
    pub fn projection(&self) -> Mat4 {
        Mat4::orthographic_rh(self.left, self.right, self.bottom, self.top, self.near, self.far)
    }

    /// World-to-shadow-clip transform for a light shining along `dir`.
    pub fn light_proj_view(&self, dir: Vec3) -> Mat4 {
        self.projection() * Mat4::look_at_rh(self.eye, self.eye + dir, self.up)
    }
}

/// User-facing light parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct LightDesc {
    /// Direction the light travels. Need not be normalized.
    pub direction: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    /// Square shadow map edge in texels.
    pub shadow_resolution: u32,
}

impl Default for LightDesc {
    fn default() -> Self {
        Self {
            direction: Vec3::new(1.0, -0.5, -0.5),
            color: Vec3::new(2.0, 1.6, 1.2),
            intensity: 900.0,
            shadow_resolution: 4096,
        }
    }
}

impl LightDesc {
    /// The two warm key lights the viewer starts with.
    pub fn default_pair() -> [LightDesc; 2] {
        [
            LightDesc::default(),
            LightDesc {
                direction: Vec3::new(1.0, -0.25, -0.25),
                ..LightDesc::default()
            },
        ]
    }
}

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum SceneError {
    #[error("scene already holds the maximum of {max} lights")]
    TooManyLights { max: usize },

    #[error("light direction has zero length")]
    ZeroDirection,

    #[error("light direction {dir} is collinear with shadow up vector {up}")]
    CollinearWithUp { dir: Vec3, up: Vec3 },

    #[error("shadow resolution must be non-zero")]
    ZeroShadowResolution,

    #[error("{kind} handle {index} does not belong to this scene")]
    DanglingHandle { kind: &'static str, index: usize },
}

/// Checks that a light can take slot `existing` under `shadow`.
pub fn validate_light(
    desc: &LightDesc,
    existing: usize,
    shadow: &ShadowConfig,
) -> Result<(), SceneError> {
    if existing >= MAX_LIGHTS {
        return Err(SceneError::TooManyLights { max: MAX_LIGHTS });
    }
    if desc.shadow_resolution == 0 {
        return Err(SceneError::ZeroShadowResolution);
    }
    let dir = desc.direction.normalize_or_zero();
    if dir == Vec3::ZERO || !dir.is_finite() {
        return Err(SceneError::ZeroDirection);
    }
    let up = shadow.up.normalize_or_zero();
    if dir.cross(up).length_squared() < 1e-8 {
        return Err(SceneError::CollinearWithUp {
            dir: desc.direction,
            up: shadow.up,
        });
    }
    Ok(())
}

/// Depth-only render target owned by one light.
///
/// Its size is fixed at creation; surface resizes never touch it.
#[derive(Debug)]
pub struct ShadowTarget {
    target: FrameBuffer,
    unit: u32,
}

impl ShadowTarget {
    fn new(device: &wgpu::Device, slot: usize, unit: u32, resolution: u32) -> Self {
        let target = FrameBuffer::depth_only(
            device,
            &format!("shadow map {slot}"),
            resolution,
            resolution,
        );
        Self { target, unit }
    }

    pub fn resolution(&self) -> u32 {
        self.target.size().0
    }

    /// Texture unit reserved for this map.
    pub fn unit(&self) -> u32 {
        self.unit
    }

    pub fn depth_view(&self) -> Option<&wgpu::TextureView> {
        self.target.depth_view()
    }
}

/// Directional light with its shadow target and cached shadow transform.
#[derive(Debug)]
pub struct Light {
    pub direction: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    slot: usize,
    proj_view: Mat4,
    shadow: ShadowTarget,
}

impl Light {
    /// Caller has already run [`validate_light`] for `slot`.
    pub(super) fn new(device: &wgpu::Device, slot: usize, desc: &LightDesc, shadow: &ShadowConfig) -> Self {
        let unit = units::shadow_unit(slot).unwrap_or(units::SHADOW_MAP_BASE);
        Self {
            direction: desc.direction,
            color: desc.color,
            intensity: desc.intensity,
            slot,
            proj_view: shadow.light_proj_view(desc.direction),
            shadow: ShadowTarget::new(device, slot, unit, desc.shadow_resolution),
        }
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn proj_view(&self) -> Mat4 {
        self.proj_view
    }

    pub fn shadow(&self) -> &ShadowTarget {
        &self.shadow
    }

    pub(super) fn refresh_proj_view(&mut self, shadow: &ShadowConfig) {
        self.proj_view = shadow.light_proj_view(self.direction);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pair_is_valid() {
        let cfg = ShadowConfig::default();
        for (i, desc) in LightDesc::default_pair().iter().enumerate() {
            assert_eq!(validate_light(desc, i, &cfg), Ok(()));
        }
    }

    #[test]
    fn distinct_directions_give_distinct_finite_matrices() {
        let cfg = ShadowConfig::default();
        let [a, b] = LightDesc::default_pair();
        let ma = cfg.light_proj_view(a.direction);
        let mb = cfg.light_proj_view(b.direction);
        assert!(ma.is_finite());
        assert!(mb.is_finite());
        assert_ne!(ma, mb);
    }

    #[test]
    fn ninth_light_is_rejected() {
        let err = validate_light(&LightDesc::default(), MAX_LIGHTS, &ShadowConfig::default());
        assert_eq!(err, Err(SceneError::TooManyLights { max: MAX_LIGHTS }));
    }

    #[test]
    fn collinear_direction_is_rejected() {
        let cfg = ShadowConfig::default();
        let desc = LightDesc {
            direction: -cfg.up * 3.0,
            ..LightDesc::default()
        };
        assert!(matches!(
            validate_light(&desc, 0, &cfg),
            Err(SceneError::CollinearWithUp { .. })
        ));
    }

    #[test]
    fn zero_direction_is_rejected() {
        let desc = LightDesc {
            direction: Vec3::ZERO,
            ..LightDesc::default()
        };
        assert_eq!(
            validate_light(&desc, 0, &ShadowConfig::default()),
            Err(SceneError::ZeroDirection)
        );
    }

    #[test]
    fn shadow_projection_maps_depth_to_unit_range() {
        let cfg = ShadowConfig::default();
        let p = cfg.projection();
        let near = p.project_point3(Vec3::new(0.0, 0.0, -cfg.near));
        let far = p.project_point3(Vec3::new(0.0, 0.0, -cfg.far));
        assert!(near.z.abs() < 1e-6);
        assert!((far.z - 1.0).abs() < 1e-6);
    }
}
