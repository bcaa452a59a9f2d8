use glam::{Mat4, Vec2, Vec3};

use crate::camera::Camera;
use crate::scene::Scene;

use super::program::{PipelineState, ShaderProgram};
use super::programs;
use super::resources::{FrameBuffer, GpuMesh, GpuTexture, DEPTH_FORMAT, HDR_FORMAT};
use super::timer::{FrameTimings, GpuTimer, PassKind};
use super::uniforms::{UniformBlock, UniformError, UniformWriter};
use super::units::{self, MAX_LIGHTS};
use super::{RenderCtx, RenderTarget};

/// Screen-space scattering parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ScatteringConfig {
    /// Ray-march steps per pixel.
    pub samples: i32,
    /// Marching stops this far from the camera.
    pub z_far: f32,
    /// 0 = isotropic phase, 1 = Henyey-Greenstein.
    pub algorithm: i32,
}

impl Default for ScatteringConfig {
    fn default() -> Self {
        Self {
            samples: 64,
            z_far: 100.0,
            algorithm: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToneMapping {
    /// 0 = add, 1 = add clamped scatter raised to `clamp_power`, 2 = max.
    pub mix_type: i32,
    pub clamp_power: f32,
    pub gamma: f32,
    pub exposure: f32,
}

impl Default for ToneMapping {
    fn default() -> Self {
        Self {
            mix_type: 0,
            clamp_power: 0.8,
            gamma: 2.2,
            exposure: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    pub scattering: ScatteringConfig,
    pub tone_mapping: ToneMapping,
    /// Clear color of the HDR target.
    pub background: wgpu::Color,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            scattering: ScatteringConfig::default(),
            tone_mapping: ToneMapping::default(),
            background: wgpu::Color {
                r: 0.0,
                g: 0.0,
                b: 1.0,
                a: 1.0,
            },
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Uniform(#[from] UniformError),
}

/// What one call to [`RenderEngine::render`] did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameStats {
    /// Passes executed, in order.
    pub passes: Vec<PassKind>,
    pub shadow_maps: usize,
    pub draws: usize,
    /// Drawables left out of the lit pass for lacking vertex attributes.
    pub skipped_draws: usize,
    /// Latest completed GPU measurement; may trail this frame.
    pub timings: FrameTimings,
}

/// How many times each cached bind group set has been built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BindingRebuilds {
    pub lit: u64,
    pub volumetric: u64,
    pub composite: u64,
}

#[derive(Default)]
struct BindingCache {
    rebuilds: BindingRebuilds,
    scene_revision: Option<u64>,
    framebuffer_generation: Option<(u64, u64)>,
    composite_format: Option<wgpu::TextureFormat>,
    lit: Vec<wgpu::BindGroup>,
    volumetric: Option<wgpu::BindGroup>,
    composite: Option<wgpu::BindGroup>,
}

/// Owns the offscreen targets, the four programs and the screen quad, and
/// records the frame pipeline.
pub struct RenderEngine {
    config: RendererConfig,
    size: (u32, u32),
    surface_format: wgpu::TextureFormat,

    hdr: FrameBuffer,
    scatter: FrameBuffer,
    quad: GpuMesh,

    shadow: ShaderProgram,
    /// One uniform block per light slot; every shadow pass is recorded before
    /// submit, so they cannot share one buffer.
    shadow_blocks: Vec<UniformBlock>,
    lit: ShaderProgram,
    volumetric: ShaderProgram,
    composite: ShaderProgram,

    material_sampler: wgpu::Sampler,
    shadow_sampler: wgpu::Sampler,
    placeholder_shadow: GpuTexture,

    timer: GpuTimer,
    bindings: BindingCache,
    warned_missing_attributes: bool,
}

impl RenderEngine {
    pub fn new(ctx: &RenderCtx<'_>, config: RendererConfig) -> Result<Self, RenderError> {
        let device = ctx.device;
        let (width, height) = (ctx.size.0.max(1), ctx.size.1.max(1));

        let shadow = ShaderProgram::new(
            device,
            programs::shadow_program(),
            programs::SHADOW_WGSL,
            PipelineState {
                color_format: None,
                depth: Some(depth_state(true, wgpu::CompareFunction::Less, shadow_bias())),
                cull_mode: Some(wgpu::Face::Back),
            },
        );
        let shadow_blocks = (0..MAX_LIGHTS)
            .map(|slot| shadow.create_uniform_block(device, &format!("shadow light {slot}")))
            .collect();

        let lit = ShaderProgram::new(
            device,
            programs::lit_program(),
            programs::LIT_WGSL,
            PipelineState {
                color_format: Some(HDR_FORMAT),
                depth: Some(depth_state(
                    true,
                    wgpu::CompareFunction::Less,
                    wgpu::DepthBiasState::default(),
                )),
                cull_mode: Some(wgpu::Face::Back),
            },
        );
        let volumetric = ShaderProgram::new(
            device,
            programs::volumetric_program(),
            programs::VOLUMETRIC_WGSL,
            PipelineState {
                color_format: Some(HDR_FORMAT),
                depth: None,
                cull_mode: None,
            },
        );
        let composite = composite_program(device, ctx.surface_format);

        let material_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("material sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Linear,
            ..Default::default()
        });
        let shadow_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("shadow sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });

        let mut engine = Self {
            config,
            size: (width, height),
            surface_format: ctx.surface_format,
            hdr: FrameBuffer::new(device, "hdr", width, height),
            scatter: FrameBuffer::color_only(device, "volumetric", HDR_FORMAT, width, height),
            quad: GpuMesh::screen_quad(device),
            shadow,
            shadow_blocks,
            lit,
            volumetric,
            composite,
            material_sampler,
            shadow_sampler,
            placeholder_shadow: GpuTexture::depth_placeholder(device),
            timer: GpuTimer::new(device, ctx.queue),
            bindings: BindingCache::default(),
            warned_missing_attributes: false,
        };

        // Some drivers misbehave on partially initialized uniform arrays, so
        // every light slot gets its unit and a finite matrix up front.
        init_light_slots(&mut engine.lit.uniforms())?;
        init_light_slots(&mut engine.volumetric.uniforms())?;
        engine.write_static_uniforms()?;

        log::debug!("render engine ready at {width}x{height}, output {:?}", ctx.surface_format);
        Ok(engine)
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Replaces tunables; takes effect on the next frame.
    pub fn set_config(&mut self, config: RendererConfig) -> Result<(), RenderError> {
        self.config = config;
        self.write_static_uniforms()
    }

    /// Size of the offscreen targets in pixels.
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn hdr_target(&self) -> &FrameBuffer {
        &self.hdr
    }

    pub fn volumetric_target(&self) -> &FrameBuffer {
        &self.scatter
    }

    /// Follows a surface resize: reallocates both offscreen targets and
    /// updates the camera aspect ratio. Shadow maps keep their size.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32, camera: &mut Camera) {
        if width == 0 || height == 0 {
            return;
        }
        self.size = (width, height);
        self.hdr.resize(device, width, height);
        self.scatter.resize(device, width, height);
        camera.set_aspect_ratio(width as f32 / height as f32);
    }

    pub fn timings(&self) -> FrameTimings {
        self.timer.latest()
    }

    /// Records all four passes into `target.encoder`.
    ///
    /// The caller submits the encoder, then calls
    /// [`RenderEngine::after_submit`] to advance timestamp readback.
    pub fn render(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: RenderTarget<'_>,
        scene: &mut Scene,
        camera: &Camera,
    ) -> Result<FrameStats, RenderError> {
        let device = ctx.device;
        if ctx.surface_format != self.surface_format {
            log::info!("output format changed to {:?}", ctx.surface_format);
            self.composite = composite_program(device, ctx.surface_format);
            self.surface_format = ctx.surface_format;
            self.write_static_uniforms()?;
        }

        self.timer.begin_frame();
        scene.update_light_matrices();
        let scene: &Scene = scene;

        self.refresh_bindings(device, scene);
        self.write_frame_uniforms(device, scene, camera)?;
        for program in [&mut self.shadow, &mut self.lit, &mut self.volumetric, &mut self.composite] {
            program.flush(ctx.queue);
        }
        for block in &mut self.shadow_blocks[..scene.lights().len()] {
            block.flush(ctx.queue);
        }

        let encoder = target.encoder;
        let mut stats = FrameStats::default();

        self.shadow_pass(encoder, scene, &mut stats);
        self.lit_pass(encoder, scene, &mut stats);
        self.volumetric_pass(encoder, &mut stats);
        self.composite_pass(encoder, target.color_view, &mut stats);

        self.timer.resolve(encoder);
        stats.timings = self.timer.latest();
        Ok(stats)
    }

    pub fn binding_rebuilds(&self) -> BindingRebuilds {
        self.bindings.rebuilds
    }

    /// Maps finished timestamp readbacks. Never blocks.
    pub fn after_submit(&mut self, device: &wgpu::Device) {
        self.timer.after_submit(device);
    }

    // ── uniforms ──────────────────────────────────────────────────────────

    fn write_static_uniforms(&mut self) -> Result<(), RenderError> {
        let s = &self.config.scattering;
        self.volumetric.set_int("volumetric_algo", s.algorithm)?;
        self.volumetric.set_float("scattering_z_far", s.z_far)?;
        self.volumetric.set_int("scattering_samples", s.samples)?;

        let t = &self.config.tone_mapping;
        self.composite.set_int("hdr_vol_mix_type", t.mix_type)?;
        self.composite.set_float("clamp_power", t.clamp_power)?;
        self.composite.set_float("gamma", t.gamma)?;
        self.composite.set_float("exposure", t.exposure)?;
        Ok(())
    }

    fn write_frame_uniforms(
        &mut self,
        device: &wgpu::Device,
        scene: &Scene,
        camera: &Camera,
    ) -> Result<(), RenderError> {
        let drawables = scene.drawables();
        self.shadow.ensure_draw_capacity(device, drawables.len());
        self.lit.ensure_draw_capacity(device, drawables.len());

        for (i, d) in drawables.iter().enumerate() {
            let proj_view_model = camera.proj_view() * d.transform;

            let mut w = self.lit.draw_slot(i)?;
            w.set_mat4("model", &d.transform)?;
            w.set_mat4("proj_view_model", &proj_view_model)?;

            self.shadow.draw_slot(i)?.set_mat4("model", &d.transform)?;
        }

        for (light, block) in scene.lights().iter().zip(&mut self.shadow_blocks) {
            block.writer().set_mat4("proj_view", &light.proj_view())?;
        }

        let count = scene.lights().len() as i32;
        {
            let mut u = self.lit.uniforms();
            u.set_vec3("cam_pos", camera.position())?;
            u.set_int("num_dir_lights", count)?;
            write_lights(&mut u, scene)?;
        }
        {
            let (w, h) = self.size;
            let mut u = self.volumetric.uniforms();
            u.set_mat4("inv_proj_view", &camera.inv_proj_view())?;
            u.set_vec3("cam_pos", camera.position())?;
            u.set_int("num_dir_lights", count)?;
            u.set_vec2("screen_size", Vec2::new(w as f32, h as f32))?;
            write_lights(&mut u, scene)?;
        }
        Ok(())
    }

    // ── bindings ──────────────────────────────────────────────────────────

    fn refresh_bindings(&mut self, device: &wgpu::Device, scene: &Scene) {
        let generations = (self.hdr.generation(), self.scatter.generation());
        let scene_changed = self.bindings.scene_revision != Some(scene.revision());
        let targets_changed = self.bindings.framebuffer_generation != Some(generations);
        let format_changed = self.bindings.composite_format != Some(self.surface_format);

        if scene_changed {
            self.bindings.lit = self.lit_groups(device, scene);
            self.bindings.rebuilds.lit += 1;
        }
        if scene_changed || targets_changed {
            self.bindings.volumetric = self.volumetric_group(device, scene);
            self.bindings.rebuilds.volumetric += 1;
        }
        if targets_changed || format_changed {
            self.bindings.composite = self.composite_group(device);
            self.bindings.rebuilds.composite += 1;
        }

        self.bindings.scene_revision = Some(scene.revision());
        self.bindings.framebuffer_generation = Some(generations);
        self.bindings.composite_format = Some(self.surface_format);
    }

    /// Shadow map views for every slot, placeholder where no light exists.
    fn shadow_entries<'a>(&'a self, scene: &'a Scene) -> Vec<wgpu::BindGroupEntry<'a>> {
        units::shadow_units()
            .map(|(slot, unit)| {
                let view = scene
                    .lights()
                    .get(slot)
                    .and_then(|l| l.shadow().depth_view())
                    .unwrap_or(self.placeholder_shadow.view());
                wgpu::BindGroupEntry {
                    binding: unit,
                    resource: wgpu::BindingResource::TextureView(view),
                }
            })
            .collect()
    }

    fn lit_groups(&self, device: &wgpu::Device, scene: &Scene) -> Vec<wgpu::BindGroup> {
        let Some(bgl) = self.lit.texture_bind_group_layout() else {
            return Vec::new();
        };
        scene
            .drawables()
            .iter()
            .enumerate()
            .map(|(i, d)| {
                let mut entries = vec![
                    view_entry(units::BASE_COLOR, scene.texture(d.base_color).view()),
                    view_entry(units::METALLIC_ROUGHNESS, scene.texture(d.metallic_roughness).view()),
                    sampler_entry(units::MATERIAL_SAMPLER, &self.material_sampler),
                    sampler_entry(units::SHADOW_SAMPLER, &self.shadow_sampler),
                ];
                entries.extend(self.shadow_entries(scene));
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(&format!("lit drawable {i}")),
                    layout: bgl,
                    entries: &entries,
                })
            })
            .collect()
    }

    fn volumetric_group(&self, device: &wgpu::Device, scene: &Scene) -> Option<wgpu::BindGroup> {
        let bgl = self.volumetric.texture_bind_group_layout()?;
        let depth = self.hdr.depth_view()?;
        let mut entries = vec![
            view_entry(units::HDR_DEPTH, depth),
            sampler_entry(units::SHADOW_SAMPLER, &self.shadow_sampler),
        ];
        entries.extend(self.shadow_entries(scene));
        Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("volumetric inputs"),
            layout: bgl,
            entries: &entries,
        }))
    }

    fn composite_group(&self, device: &wgpu::Device) -> Option<wgpu::BindGroup> {
        let bgl = self.composite.texture_bind_group_layout()?;
        let entries = [
            view_entry(units::HDR_COLOR, self.hdr.color_view()?),
            view_entry(units::VOLUMETRIC, self.scatter.color_view()?),
            sampler_entry(units::MATERIAL_SAMPLER, &self.material_sampler),
        ];
        Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("composite inputs"),
            layout: bgl,
            entries: &entries,
        }))
    }

    // ── passes ────────────────────────────────────────────────────────────

    fn shadow_pass(&mut self, encoder: &mut wgpu::CommandEncoder, scene: &Scene, stats: &mut FrameStats) {
        let lights = scene.lights();
        let inputs = self.shadow.layout().vertex_inputs;

        for (i, light) in lights.iter().enumerate() {
            let Some(depth) = light.shadow().depth_view() else { continue };
            let first = i == 0;
            let last = i + 1 == lights.len();

            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("shadow pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: depth,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: self.timer.writes(PassKind::Shadow, first, last),
                occlusion_query_set: None,
                multiview_mask: None,
            });

            let res = light.shadow().resolution() as f32;
            pass.set_viewport(0.0, 0.0, res, res, 0.0, 1.0);
            self.shadow.bind_with(&mut pass, &self.shadow_blocks[light.slot()]);
            for (j, d) in scene.drawables().iter().enumerate() {
                self.shadow.bind_draw(&mut pass, j);
                scene.mesh(d.mesh).draw(&mut pass, inputs);
            }
            stats.shadow_maps += 1;
        }
        stats.passes.push(PassKind::Shadow);
    }

    fn lit_pass(&mut self, encoder: &mut wgpu::CommandEncoder, scene: &Scene, stats: &mut FrameStats) {
        let (Some(color), Some(depth)) = (self.hdr.color_view(), self.hdr.depth_view()) else {
            return;
        };
        let inputs = self.lit.layout().vertex_inputs;
        let texture_group = self.lit.layout().texture_group().unwrap_or(1);

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("lit pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.config.background),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: self.timer.writes(PassKind::Lit, true, true),
            occlusion_query_set: None,
            multiview_mask: None,
        });

        let (w, h) = self.size;
        pass.set_viewport(0.0, 0.0, w as f32, h as f32, 0.0, 1.0);
        self.lit.bind(&mut pass);

        for (j, d) in scene.drawables().iter().enumerate() {
            let mesh = scene.mesh(d.mesh);
            let Some(group) = self.bindings.lit.get(j) else { continue };
            if !mesh.has_attributes(inputs) {
                if !self.warned_missing_attributes {
                    log::warn!("drawable {j} lacks normals or UVs; skipped in the lit pass");
                    self.warned_missing_attributes = true;
                }
                stats.skipped_draws += 1;
                continue;
            }
            pass.set_bind_group(texture_group, group, &[]);
            self.lit.bind_draw(&mut pass, j);
            if mesh.draw(&mut pass, inputs) {
                stats.draws += 1;
            }
        }
        stats.passes.push(PassKind::Lit);
    }

    fn volumetric_pass(&mut self, encoder: &mut wgpu::CommandEncoder, stats: &mut FrameStats) {
        let Some(color) = self.scatter.color_view() else { return };
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("volumetric pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: self.timer.writes(PassKind::Volumetric, true, true),
            occlusion_query_set: None,
            multiview_mask: None,
        });

        self.volumetric.bind(&mut pass);
        if let (Some(group), Some(index)) =
            (&self.bindings.volumetric, self.volumetric.layout().texture_group())
        {
            pass.set_bind_group(index, group, &[]);
            self.quad.draw(&mut pass, self.volumetric.layout().vertex_inputs);
        }
        stats.passes.push(PassKind::Volumetric);
    }

    fn composite_pass(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        output: &wgpu::TextureView,
        stats: &mut FrameStats,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("composite pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: output,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: self.timer.writes(PassKind::Composite, true, true),
            occlusion_query_set: None,
            multiview_mask: None,
        });

        self.composite.bind(&mut pass);
        if let (Some(group), Some(index)) =
            (&self.bindings.composite, self.composite.layout().texture_group())
        {
            pass.set_bind_group(index, group, &[]);
            self.quad.draw(&mut pass, self.composite.layout().vertex_inputs);
        }
        stats.passes.push(PassKind::Composite);
    }
}

fn composite_program(device: &wgpu::Device, format: wgpu::TextureFormat) -> ShaderProgram {
    ShaderProgram::new(
        device,
        programs::composite_program(),
        programs::COMPOSITE_WGSL,
        PipelineState {
            color_format: Some(format),
            depth: None,
            cull_mode: None,
        },
    )
}

fn depth_state(
    write: bool,
    compare: wgpu::CompareFunction,
    bias: wgpu::DepthBiasState,
) -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format: DEPTH_FORMAT,
        depth_write_enabled: write,
        depth_compare: compare,
        stencil: wgpu::StencilState::default(),
        bias,
    }
}

fn shadow_bias() -> wgpu::DepthBiasState {
    wgpu::DepthBiasState {
        constant: 2,
        slope_scale: 2.0,
        clamp: 0.0,
    }
}

fn view_entry(binding: u32, view: &wgpu::TextureView) -> wgpu::BindGroupEntry<'_> {
    wgpu::BindGroupEntry {
        binding,
        resource: wgpu::BindingResource::TextureView(view),
    }
}

fn sampler_entry(binding: u32, sampler: &wgpu::Sampler) -> wgpu::BindGroupEntry<'_> {
    wgpu::BindGroupEntry {
        binding,
        resource: wgpu::BindingResource::Sampler(sampler),
    }
}

/// Writes a unit and neutral values into every `dirlights` slot.
fn init_light_slots(u: &mut UniformWriter<'_>) -> Result<(), UniformError> {
    for (slot, unit) in units::shadow_units() {
        u.set_int(&format!("dirlights[{slot}].shadow_unit"), unit as i32)?;
        u.set_vec3(&format!("dirlights[{slot}].dir"), Vec3::NEG_Z)?;
        u.set_vec3(&format!("dirlights[{slot}].color"), Vec3::ZERO)?;
        u.set_float(&format!("dirlights[{slot}].intensity"), 0.0)?;
        u.set_mat4(&format!("dirlights[{slot}].world_to_proj"), &Mat4::IDENTITY)?;
    }
    Ok(())
}

fn write_lights(u: &mut UniformWriter<'_>, scene: &Scene) -> Result<(), UniformError> {
    for light in scene.lights() {
        let i = light.slot();
        u.set_vec3(&format!("dirlights[{i}].dir"), light.direction)?;
        u.set_vec3(&format!("dirlights[{i}].color"), light.color)?;
        u.set_float(&format!("dirlights[{i}].intensity"), light.intensity)?;
        u.set_int(&format!("dirlights[{i}].shadow_unit"), light.shadow().unit() as i32)?;
        u.set_mat4(&format!("dirlights[{i}].world_to_proj"), &light.proj_view())?;
    }
    Ok(())
}
