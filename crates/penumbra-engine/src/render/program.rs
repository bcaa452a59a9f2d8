use std::fmt::Write as _;
use std::sync::Arc;

use glam::{Mat4, Vec2, Vec3};

use super::uniforms::{DynamicUniformBlock, UniformBlock, UniformError, UniformLayout, UniformWriter};
use super::units;

/// Vertex attributes a program may consume.
///
/// Each attribute lives in its own vertex buffer; the shader location is the
/// attribute's index in [`ProgramLayout::vertex_inputs`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum VertexAttr {
    Position,
    Normal,
    TexCoord,
}

impl VertexAttr {
    pub const fn wgsl_name(self) -> &'static str {
        match self {
            Self::Position => "position",
            Self::Normal => "normal",
            Self::TexCoord => "uv",
        }
    }

    const fn wgsl_type(self) -> &'static str {
        match self {
            Self::Position | Self::Normal => "vec3<f32>",
            Self::TexCoord => "vec2<f32>",
        }
    }

    const fn format(self) -> wgpu::VertexFormat {
        match self {
            Self::Position | Self::Normal => wgpu::VertexFormat::Float32x3,
            Self::TexCoord => wgpu::VertexFormat::Float32x2,
        }
    }

    pub const fn stride(self) -> u64 {
        match self {
            Self::Position | Self::Normal => 12,
            Self::TexCoord => 8,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TextureKind {
    /// Filterable `texture_2d<f32>`.
    Color,
    /// `texture_depth_2d`, read with `textureLoad` or a comparison sampler.
    Depth,
}

#[derive(Debug, Clone)]
pub struct TextureSlot {
    pub unit: u32,
    pub name: String,
    pub kind: TextureKind,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SamplerKind {
    Filtering,
    Comparison,
}

#[derive(Debug, Clone)]
pub struct SamplerSlot {
    pub unit: u32,
    pub name: &'static str,
    pub kind: SamplerKind,
}

/// Everything a program declares to the outside world.
///
/// Bind groups are numbered in a fixed order: program uniforms at 0, then
/// the texture group when any texture or sampler is declared, then the
/// per-draw group.
#[derive(Debug, Clone)]
pub struct ProgramLayout {
    pub label: &'static str,
    pub uniforms: Arc<UniformLayout>,
    pub per_draw: Option<Arc<UniformLayout>>,
    pub vertex_inputs: &'static [VertexAttr],
    pub textures: Vec<TextureSlot>,
    pub samplers: Vec<SamplerSlot>,
}

impl ProgramLayout {
    pub fn texture_group(&self) -> Option<u32> {
        (!self.textures.is_empty() || !self.samplers.is_empty()).then_some(1)
    }

    pub fn draw_group(&self) -> Option<u32> {
        self.per_draw
            .as_ref()
            .map(|_| 1 + self.texture_group().map_or(0, |_| 1))
    }

    /// Adds one depth slot per light, named `shadow_map_{slot}`.
    pub fn with_shadow_maps(mut self) -> Self {
        for (slot, unit) in units::shadow_units() {
            self.textures.push(TextureSlot {
                unit,
                name: format!("shadow_map_{slot}"),
                kind: TextureKind::Depth,
            });
        }
        self
    }

    fn shadow_sampler(&self) -> Option<&SamplerSlot> {
        self.samplers.iter().find(|s| s.kind == SamplerKind::Comparison)
    }

    fn shadow_slots(&self) -> impl Iterator<Item = &TextureSlot> {
        self.textures
            .iter()
            .filter(|t| t.kind == TextureKind::Depth && t.unit >= units::SHADOW_MAP_BASE)
    }

    /// Declarations shared by host and shader, generated from the same tables
    /// the host uses at bind time.
    pub fn wgsl_preamble(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "// generated: {} program interface\n", self.label);
        let _ = writeln!(out, "const MAX_LIGHTS: i32 = {};", units::MAX_LIGHTS);
        let _ = writeln!(out, "const SHADOW_MAP_BASE: i32 = {};\n", units::SHADOW_MAP_BASE);

        out.push_str(&self.uniforms.wgsl_declarations());
        if let Some(draw) = &self.per_draw {
            out.push_str(&draw.wgsl_declarations());
        }

        if !self.vertex_inputs.is_empty() {
            out.push_str("struct VertexInput {\n");
            for (location, attr) in self.vertex_inputs.iter().enumerate() {
                let _ = writeln!(
                    out,
                    "    @location({location}) {}: {},",
                    attr.wgsl_name(),
                    attr.wgsl_type()
                );
            }
            out.push_str("}\n\n");
        }

        let _ = writeln!(
            out,
            "@group(0) @binding(0) var<uniform> u: {};",
            self.uniforms.type_name()
        );

        if let Some(group) = self.texture_group() {
            for t in &self.textures {
                let ty = match t.kind {
                    TextureKind::Color => "texture_2d<f32>",
                    TextureKind::Depth => "texture_depth_2d",
                };
                let _ = writeln!(out, "@group({group}) @binding({}) var {}: {ty};", t.unit, t.name);
            }
            for s in &self.samplers {
                let ty = match s.kind {
                    SamplerKind::Filtering => "sampler",
                    SamplerKind::Comparison => "sampler_comparison",
                };
                let _ = writeln!(out, "@group({group}) @binding({}) var {}: {ty};", s.unit, s.name);
            }
        }

        if let (Some(group), Some(draw)) = (self.draw_group(), &self.per_draw) {
            let _ = writeln!(
                out,
                "@group({group}) @binding(0) var<uniform> draw: {};",
                draw.type_name()
            );
        }
        out.push('\n');

        if let Some(sampler) = self.shadow_sampler() {
            let slots: Vec<&TextureSlot> = self.shadow_slots().collect();
            if !slots.is_empty() {
                out.push_str(
                    "fn sample_shadow(unit: i32, uv: vec2<f32>, depth_ref: f32) -> f32 {\n    var lit = 1.0;\n    switch unit {\n",
                );
                for t in slots {
                    let _ = writeln!(
                        out,
                        "        case {}: {{ lit = textureSampleCompareLevel({}, {}, uv, depth_ref); }}",
                        t.unit, t.name, sampler.name
                    );
                }
                out.push_str("        default: {}\n    }\n    return lit;\n}\n\n");
            }
        }

        out
    }

    pub fn source(&self, body: &str) -> String {
        let mut src = self.wgsl_preamble();
        src.push_str(body);
        src
    }

    fn uniform_bgl(&self, device: &wgpu::Device) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(self.label),
            entries: &[buffer_entry(&self.uniforms, false)],
        })
    }

    fn texture_bgl(&self, device: &wgpu::Device) -> Option<wgpu::BindGroupLayout> {
        self.texture_group()?;

        let mut entries = Vec::with_capacity(self.textures.len() + self.samplers.len());
        for t in &self.textures {
            let sample_type = match t.kind {
                TextureKind::Color => wgpu::TextureSampleType::Float { filterable: true },
                TextureKind::Depth => wgpu::TextureSampleType::Depth,
            };
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: t.unit,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            });
        }
        for s in &self.samplers {
            let ty = match s.kind {
                SamplerKind::Filtering => wgpu::SamplerBindingType::Filtering,
                SamplerKind::Comparison => wgpu::SamplerBindingType::Comparison,
            };
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: s.unit,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(ty),
                count: None,
            });
        }

        Some(device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(self.label),
            entries: &entries,
        }))
    }

    fn draw_bgl(&self, device: &wgpu::Device) -> Option<wgpu::BindGroupLayout> {
        let draw = self.per_draw.as_ref()?;
        Some(device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(self.label),
            entries: &[buffer_entry(draw, true)],
        }))
    }
}

fn buffer_entry(layout: &UniformLayout, dynamic: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding: 0,
        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: dynamic,
            min_binding_size: layout.min_binding_size(),
        },
        count: None,
    }
}

/// Fixed-function state of a program's pipeline.
#[derive(Debug, Clone)]
pub struct PipelineState {
    /// `None` builds a depth-only pipeline without a fragment stage.
    pub color_format: Option<wgpu::TextureFormat>,
    pub depth: Option<wgpu::DepthStencilState>,
    pub cull_mode: Option<wgpu::Face>,
}

/// A compiled pipeline plus its uniform block.
///
/// `bind` is the equivalent of activating a GL program: it sets the pipeline
/// and the program-wide uniform group on a pass. Uniform setters stage values
/// by name; [`ShaderProgram::flush`] uploads them.
pub struct ShaderProgram {
    layout: ProgramLayout,
    pipeline: wgpu::RenderPipeline,
    uniform_bgl: wgpu::BindGroupLayout,
    texture_bgl: Option<wgpu::BindGroupLayout>,
    draw_bgl: Option<wgpu::BindGroupLayout>,
    uniforms: UniformBlock,
    draw: Option<DynamicUniformBlock>,
}

impl ShaderProgram {
    pub fn new(
        device: &wgpu::Device,
        layout: ProgramLayout,
        body: &str,
        state: PipelineState,
    ) -> Self {
        let source = layout.source(body);
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(layout.label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let uniform_bgl = layout.uniform_bgl(device);
        let texture_bgl = layout.texture_bgl(device);
        let draw_bgl = layout.draw_bgl(device);

        let mut groups: Vec<&wgpu::BindGroupLayout> = vec![&uniform_bgl];
        groups.extend(texture_bgl.as_ref());
        groups.extend(draw_bgl.as_ref());

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(layout.label),
            bind_group_layouts: &groups,
            immediate_size: 0,
        });

        let attributes: Vec<[wgpu::VertexAttribute; 1]> = layout
            .vertex_inputs
            .iter()
            .enumerate()
            .map(|(location, attr)| {
                [wgpu::VertexAttribute {
                    format: attr.format(),
                    offset: 0,
                    shader_location: location as u32,
                }]
            })
            .collect();
        let buffers: Vec<wgpu::VertexBufferLayout<'_>> = layout
            .vertex_inputs
            .iter()
            .zip(&attributes)
            .map(|(attr, attributes)| wgpu::VertexBufferLayout {
                array_stride: attr.stride(),
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes,
            })
            .collect();

        let targets = [state.color_format.map(|format| wgpu::ColorTargetState {
            format,
            blend: None,
            write_mask: wgpu::ColorWrites::ALL,
        })];

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(layout.label),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &buffers,
            },
            fragment: state.color_format.map(|_| wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &targets,
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: state.cull_mode,
                ..Default::default()
            },
            depth_stencil: state.depth.clone(),
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        let uniforms = UniformBlock::new(device, layout.label, layout.uniforms.clone(), &uniform_bgl);
        let draw = layout
            .per_draw
            .as_ref()
            .map(|l| DynamicUniformBlock::new(device, layout.label, l.clone()));

        Self {
            layout,
            pipeline,
            uniform_bgl,
            texture_bgl,
            draw_bgl,
            uniforms,
            draw,
        }
    }

    pub fn layout(&self) -> &ProgramLayout {
        &self.layout
    }

    pub fn texture_bind_group_layout(&self) -> Option<&wgpu::BindGroupLayout> {
        self.texture_bgl.as_ref()
    }

    /// Sets the pipeline and program uniforms on `pass`.
    pub fn bind(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, self.uniforms.bind_group(), &[]);
    }

    /// Extra block with this program's uniform layout, for passes that run
    /// the program several times per frame with different values.
    pub fn create_uniform_block(&self, device: &wgpu::Device, label: &str) -> UniformBlock {
        UniformBlock::new(device, label, self.layout.uniforms.clone(), &self.uniform_bgl)
    }

    /// Like [`ShaderProgram::bind`] but with uniforms from `block`.
    pub fn bind_with(&self, pass: &mut wgpu::RenderPass<'_>, block: &UniformBlock) {
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, block.bind_group(), &[]);
    }

    /// Selects per-draw slot `index` on `pass`.
    pub fn bind_draw(&self, pass: &mut wgpu::RenderPass<'_>, index: usize) {
        let (Some(group), Some(draw)) = (self.layout.draw_group(), self.draw.as_ref()) else {
            return;
        };
        if let Some(bg) = draw.bind_group() {
            pass.set_bind_group(group, bg, &[draw.offset(index)]);
        }
    }

    pub fn uniforms(&mut self) -> UniformWriter<'_> {
        self.uniforms.writer()
    }

    pub fn set_bool(&mut self, name: &str, v: bool) -> Result<(), UniformError> {
        self.uniforms.writer().set_bool(name, v)
    }

    pub fn set_int(&mut self, name: &str, v: i32) -> Result<(), UniformError> {
        self.uniforms.writer().set_int(name, v)
    }

    pub fn set_float(&mut self, name: &str, v: f32) -> Result<(), UniformError> {
        self.uniforms.writer().set_float(name, v)
    }

    pub fn set_vec2(&mut self, name: &str, v: Vec2) -> Result<(), UniformError> {
        self.uniforms.writer().set_vec2(name, v)
    }

    pub fn set_vec3(&mut self, name: &str, v: Vec3) -> Result<(), UniformError> {
        self.uniforms.writer().set_vec3(name, v)
    }

    pub fn set_mat4(&mut self, name: &str, m: &Mat4) -> Result<(), UniformError> {
        self.uniforms.writer().set_mat4(name, m)
    }

    /// Sizes the per-draw block for `count` draws.
    pub fn ensure_draw_capacity(&mut self, device: &wgpu::Device, count: usize) {
        if let (Some(draw), Some(bgl)) = (self.draw.as_mut(), self.draw_bgl.as_ref()) {
            draw.ensure_capacity(device, bgl, count);
        }
    }

    pub fn draw_slot(&mut self, index: usize) -> Result<UniformWriter<'_>, UniformError> {
        match self.draw.as_mut() {
            Some(draw) => draw.slot(index),
            None => Err(UniformError::SlotOutOfRange { slot: index, capacity: 0 }),
        }
    }

    /// Uploads staged program and per-draw uniforms.
    pub fn flush(&mut self, queue: &wgpu::Queue) {
        self.uniforms.flush(queue);
        if let Some(draw) = &self.draw {
            draw.flush(queue);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::programs;

    #[test]
    fn lit_groups_are_numbered_in_order() {
        let lit = programs::lit_program();
        assert_eq!(lit.texture_group(), Some(1));
        assert_eq!(lit.draw_group(), Some(2));

        let shadow = programs::shadow_program();
        assert_eq!(shadow.texture_group(), None);
        assert_eq!(shadow.draw_group(), Some(1));
    }

    #[test]
    fn preamble_declares_every_shadow_slot() {
        let src = programs::lit_program().wgsl_preamble();
        for (slot, unit) in units::shadow_units() {
            assert!(src.contains(&format!(
                "@group(1) @binding({unit}) var shadow_map_{slot}: texture_depth_2d;"
            )));
            assert!(src.contains(&format!("case {unit}:")));
        }
        assert!(src.contains("fn sample_shadow"));
    }

    #[test]
    fn preamble_locations_follow_vertex_inputs() {
        let src = programs::lit_program().wgsl_preamble();
        assert!(src.contains("@location(0) position: vec3<f32>,"));
        assert!(src.contains("@location(1) normal: vec3<f32>,"));
        assert!(src.contains("@location(2) uv: vec2<f32>,"));
    }

    // ── setters ───────────────────────────────────────────────────────────

    #[test]
    fn typed_setters_stage_named_fields() {
        let Some(gpu) = crate::device::HeadlessGpu::for_tests() else { return };
        let mut program = ShaderProgram::new(
            gpu.device(),
            programs::volumetric_program(),
            programs::VOLUMETRIC_WGSL,
            PipelineState {
                color_format: Some(crate::render::resources::HDR_FORMAT),
                depth: None,
                cull_mode: None,
            },
        );
        let layout = programs::volumetric_uniforms();
        let offset = |name: &str| layout.field(name).map(|f| f.offset as usize).unwrap();

        program.set_int("scattering_samples", 32).unwrap();
        program.set_float("scattering_z_far", 50.0).unwrap();
        program.set_vec2("screen_size", Vec2::new(640.0, 480.0)).unwrap();
        program.set_vec3("cam_pos", Vec3::new(1.0, 2.0, 3.0)).unwrap();
        program.set_mat4("inv_proj_view", &Mat4::from_scale(Vec3::splat(2.0))).unwrap();

        let bytes = program.uniforms.staged();
        let f32_at = |at: usize| f32::from_le_bytes(bytes[at..at + 4].try_into().unwrap());
        let i32_at = |at: usize| i32::from_le_bytes(bytes[at..at + 4].try_into().unwrap());
        assert_eq!(i32_at(offset("scattering_samples")), 32);
        assert_eq!(f32_at(offset("scattering_z_far")), 50.0);
        assert_eq!(f32_at(offset("screen_size") + 4), 480.0);
        assert_eq!(f32_at(offset("cam_pos") + 8), 3.0);
        assert_eq!(f32_at(offset("inv_proj_view")), 2.0);

        assert!(matches!(
            program.set_float("no_such_uniform", 1.0),
            Err(UniformError::Unknown { .. })
        ));
        assert!(matches!(
            program.set_bool("scattering_samples", true),
            Err(UniformError::KindMismatch { .. })
        ));
        program.flush(gpu.queue());
    }

    #[test]
    fn composite_has_no_shadow_dispatch() {
        let src = programs::composite_program().wgsl_preamble();
        assert!(!src.contains("sample_shadow"));
        assert!(src.contains(&format!("@binding({}) var volumetric_map", units::VOLUMETRIC)));
    }
}
