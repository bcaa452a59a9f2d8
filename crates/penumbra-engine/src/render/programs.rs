//! The four programs of the frame pipeline: uniform tables, texture units and
//! WGSL bodies.
//!
//! Bodies under `shaders/` only contain entry points and helpers; everything
//! they reference from the host (`u`, `draw`, `VertexInput`, texture names,
//! `sample_shadow`) is declared by the generated preamble.

use std::sync::Arc;

use super::program::{ProgramLayout, SamplerKind, SamplerSlot, TextureKind, TextureSlot, VertexAttr};
use super::uniforms::{StructLayout, UniformKind, UniformLayout};
use super::units;

pub const SHADOW_WGSL: &str = include_str!("shaders/shadow.wgsl");
pub const LIT_WGSL: &str = include_str!("shaders/lit.wgsl");
pub const VOLUMETRIC_WGSL: &str = include_str!("shaders/volumetric.wgsl");
pub const COMPOSITE_WGSL: &str = include_str!("shaders/composite.wgsl");

const MESH_INPUTS: &[VertexAttr] = &[VertexAttr::Position, VertexAttr::Normal, VertexAttr::TexCoord];
const DEPTH_INPUTS: &[VertexAttr] = &[VertexAttr::Position];
const SCREEN_INPUTS: &[VertexAttr] = &[VertexAttr::Position, VertexAttr::TexCoord];

// ── uniform tables ────────────────────────────────────────────────────────

/// One directional light as seen by the shaders.
pub fn dir_light_struct() -> Arc<StructLayout> {
    StructLayout::builder("DirLight")
        .field("dir", UniformKind::Vec3)
        .field("color", UniformKind::Vec3)
        .field("intensity", UniformKind::Float)
        .field("shadow_unit", UniformKind::Int)
        .field("world_to_proj", UniformKind::Mat4)
        .build()
}

pub fn lit_uniforms() -> Arc<UniformLayout> {
    Arc::new(UniformLayout::new(
        StructLayout::builder("LitUniforms")
            .field("cam_pos", UniformKind::Vec3)
            .field("num_dir_lights", UniformKind::Int)
            .array("dirlights", &dir_light_struct(), units::MAX_LIGHTS)
            .build(),
    ))
}

pub fn volumetric_uniforms() -> Arc<UniformLayout> {
    Arc::new(UniformLayout::new(
        StructLayout::builder("VolumetricUniforms")
            .field("inv_proj_view", UniformKind::Mat4)
            .field("cam_pos", UniformKind::Vec3)
            .field("num_dir_lights", UniformKind::Int)
            .field("screen_size", UniformKind::Vec2)
            .field("volumetric_algo", UniformKind::Int)
            .field("scattering_z_far", UniformKind::Float)
            .field("scattering_samples", UniformKind::Int)
            .array("dirlights", &dir_light_struct(), units::MAX_LIGHTS)
            .build(),
    ))
}

pub fn composite_uniforms() -> Arc<UniformLayout> {
    Arc::new(UniformLayout::new(
        StructLayout::builder("CompositeUniforms")
            .field("hdr_vol_mix_type", UniformKind::Int)
            .field("clamp_power", UniformKind::Float)
            .field("gamma", UniformKind::Float)
            .field("exposure", UniformKind::Float)
            .build(),
    ))
}

pub fn shadow_uniforms() -> Arc<UniformLayout> {
    Arc::new(UniformLayout::new(
        StructLayout::builder("ShadowUniforms")
            .field("proj_view", UniformKind::Mat4)
            .build(),
    ))
}

pub fn draw_uniforms() -> Arc<UniformLayout> {
    Arc::new(UniformLayout::new(
        StructLayout::builder("DrawUniforms")
            .field("model", UniformKind::Mat4)
            .field("proj_view_model", UniformKind::Mat4)
            .build(),
    ))
}

/// Shadow draws only need the model matrix; the light transform is per pass.
pub fn shadow_draw_uniforms() -> Arc<UniformLayout> {
    Arc::new(UniformLayout::new(
        StructLayout::builder("ShadowDrawUniforms")
            .field("model", UniformKind::Mat4)
            .build(),
    ))
}

// ── program layouts ───────────────────────────────────────────────────────

fn color_slot(unit: u32, name: &str) -> TextureSlot {
    TextureSlot {
        unit,
        name: name.to_string(),
        kind: TextureKind::Color,
    }
}

const MATERIAL_SAMPLER: SamplerSlot = SamplerSlot {
    unit: units::MATERIAL_SAMPLER,
    name: "material_sampler",
    kind: SamplerKind::Filtering,
};

const SHADOW_SAMPLER: SamplerSlot = SamplerSlot {
    unit: units::SHADOW_SAMPLER,
    name: "shadow_sampler",
    kind: SamplerKind::Comparison,
};

pub fn shadow_program() -> ProgramLayout {
    ProgramLayout {
        label: "shadow",
        uniforms: shadow_uniforms(),
        per_draw: Some(shadow_draw_uniforms()),
        vertex_inputs: DEPTH_INPUTS,
        textures: Vec::new(),
        samplers: Vec::new(),
    }
}

pub fn lit_program() -> ProgramLayout {
    ProgramLayout {
        label: "lit",
        uniforms: lit_uniforms(),
        per_draw: Some(draw_uniforms()),
        vertex_inputs: MESH_INPUTS,
        textures: vec![
            color_slot(units::BASE_COLOR, "base_color_map"),
            color_slot(units::METALLIC_ROUGHNESS, "metallic_roughness_map"),
        ],
        samplers: vec![MATERIAL_SAMPLER, SHADOW_SAMPLER],
    }
    .with_shadow_maps()
}

pub fn volumetric_program() -> ProgramLayout {
    ProgramLayout {
        label: "volumetric",
        uniforms: volumetric_uniforms(),
        per_draw: None,
        vertex_inputs: SCREEN_INPUTS,
        textures: vec![TextureSlot {
            unit: units::HDR_DEPTH,
            name: "hdr_depth_map".to_string(),
            kind: TextureKind::Depth,
        }],
        samplers: vec![SHADOW_SAMPLER],
    }
    .with_shadow_maps()
}

pub fn composite_program() -> ProgramLayout {
    ProgramLayout {
        label: "composite",
        uniforms: composite_uniforms(),
        per_draw: None,
        vertex_inputs: SCREEN_INPUTS,
        textures: vec![
            color_slot(units::HDR_COLOR, "hdr_color_map"),
            color_slot(units::VOLUMETRIC, "volumetric_map"),
        ],
        samplers: vec![MATERIAL_SAMPLER],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bodies_reference_generated_names() {
        assert!(LIT_WGSL.contains("sample_shadow("));
        assert!(LIT_WGSL.contains("base_color_map"));
        assert!(VOLUMETRIC_WGSL.contains("hdr_depth_map"));
        assert!(COMPOSITE_WGSL.contains("volumetric_map"));
        assert!(SHADOW_WGSL.contains("draw.model"));
    }

    #[test]
    fn block_sizes_are_multiples_of_sixteen() {
        for layout in [
            lit_uniforms(),
            volumetric_uniforms(),
            composite_uniforms(),
            shadow_uniforms(),
            draw_uniforms(),
            shadow_draw_uniforms(),
        ] {
            assert_eq!(layout.size() % 16, 0, "{}", layout.type_name());
        }
    }

    #[test]
    fn volumetric_offsets() {
        let v = volumetric_uniforms();
        assert_eq!(v.field("cam_pos").map(|f| f.offset), Some(64));
        assert_eq!(v.field("screen_size").map(|f| f.offset), Some(80));
        assert_eq!(v.field("scattering_samples").map(|f| f.offset), Some(96));
        assert_eq!(v.field("dirlights[0].dir").map(|f| f.offset), Some(112));
    }

    #[test]
    fn shadow_draws_carry_only_the_model() {
        let per_draw = shadow_program().per_draw.unwrap();
        assert!(per_draw.field("model").is_some());
        assert!(per_draw.field("proj_view_model").is_none());
        assert_eq!(per_draw.size(), 64);
    }
}
