//! Named uniform blocks.
//!
//! A [`StructLayout`] describes a WGSL struct using the uniform address-space
//! layout rules. The same table is used to:
//! - emit the WGSL `struct` declarations prepended to every shader body
//! - resolve host-side setter names (`"dirlights[2].color"`) to byte offsets
//!
//! Host and shader therefore cannot disagree about offsets or array sizes.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::num::NonZeroU64;
use std::sync::Arc;

use glam::{Mat4, Vec2, Vec3};

/// Value kind of a leaf uniform field.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum UniformKind {
    /// Stored as `u32` (WGSL `bool` is not host-shareable).
    Bool,
    Int,
    Float,
    Vec2,
    Vec3,
    Mat4,
}

impl UniformKind {
    pub const fn align(self) -> u32 {
        match self {
            Self::Bool | Self::Int | Self::Float => 4,
            Self::Vec2 => 8,
            Self::Vec3 | Self::Mat4 => 16,
        }
    }

    pub const fn size(self) -> u32 {
        match self {
            Self::Bool | Self::Int | Self::Float => 4,
            Self::Vec2 => 8,
            Self::Vec3 => 12,
            Self::Mat4 => 64,
        }
    }

    pub const fn wgsl(self) -> &'static str {
        match self {
            Self::Bool => "u32",
            Self::Int => "i32",
            Self::Float => "f32",
            Self::Vec2 => "vec2<f32>",
            Self::Vec3 => "vec3<f32>",
            Self::Mat4 => "mat4x4<f32>",
        }
    }
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum UniformError {
    #[error("uniform `{name}` is not declared in block `{block}`")]
    Unknown { block: String, name: String },

    #[error("uniform `{name}` is declared as {declared:?} but was set as {given:?}")]
    KindMismatch {
        name: String,
        declared: UniformKind,
        given: UniformKind,
    },

    #[error("draw slot {slot} is out of range (capacity {capacity})")]
    SlotOutOfRange { slot: usize, capacity: usize },
}

// ── struct layout ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum MemberTy {
    Leaf(UniformKind),
    Struct(Arc<StructLayout>),
    Array(Arc<StructLayout>, usize),
}

#[derive(Debug, Clone)]
struct Member {
    name: String,
    ty: MemberTy,
    offset: u32,
}

/// A WGSL struct with resolved member offsets.
#[derive(Debug)]
pub struct StructLayout {
    name: String,
    members: Vec<Member>,
    size: u32,
    align: u32,
}

impl StructLayout {
    pub fn builder(name: impl Into<String>) -> StructBuilder {
        StructBuilder {
            name: name.into(),
            members: Vec::new(),
            cursor: 0,
            align: 4,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn align(&self) -> u32 {
        self.align
    }
}

/// Builds a [`StructLayout`] member by member, in declaration order.
///
/// Offsets follow WGSL's natural layout (`roundUp(align, previous_end)`).
/// Uniform address-space constraints are asserted here so a bad table fails
/// at startup with a clear message instead of as a shader validation error.
pub struct StructBuilder {
    name: String,
    members: Vec<Member>,
    cursor: u32,
    align: u32,
}

impl StructBuilder {
    pub fn field(self, name: &str, kind: UniformKind) -> Self {
        self.push(name, MemberTy::Leaf(kind), kind.align(), kind.size())
    }

    pub fn struct_field(self, name: &str, ty: &Arc<StructLayout>) -> Self {
        assert!(
            ty.align % 16 == 0,
            "struct `{}` used in a uniform block must be 16-byte aligned",
            ty.name
        );
        self.push(name, MemberTy::Struct(ty.clone()), ty.align, ty.size)
    }

    pub fn array(self, name: &str, elem: &Arc<StructLayout>, len: usize) -> Self {
        let stride = round_up(elem.align, elem.size);
        assert!(
            stride % 16 == 0,
            "array `{name}` stride {stride} is not a multiple of 16"
        );
        assert!(len > 0, "array `{name}` must not be empty");
        let size = stride * len as u32;
        self.push(name, MemberTy::Array(elem.clone(), len), elem.align, size)
    }

    fn push(mut self, name: &str, ty: MemberTy, align: u32, size: u32) -> Self {
        let offset = round_up(align, self.cursor);
        self.members.push(Member {
            name: name.to_string(),
            ty,
            offset,
        });
        self.cursor = offset + size;
        self.align = self.align.max(align);
        self
    }

    pub fn build(self) -> Arc<StructLayout> {
        let size = round_up(self.align, self.cursor.max(self.align));
        Arc::new(StructLayout {
            name: self.name,
            members: self.members,
            size,
            align: self.align,
        })
    }
}

#[inline]
fn round_up(align: u32, n: u32) -> u32 {
    n.div_ceil(align) * align
}

// ── flattened layout ──────────────────────────────────────────────────────

/// Offset and kind of one leaf field in a flattened uniform layout.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct FieldSlot {
    pub offset: u32,
    pub kind: UniformKind,
}

/// Top-level uniform block layout with name lookup.
#[derive(Debug)]
pub struct UniformLayout {
    root: Arc<StructLayout>,
    fields: HashMap<String, FieldSlot>,
}

impl UniformLayout {
    pub fn new(root: Arc<StructLayout>) -> Self {
        let mut fields = HashMap::new();
        flatten(&root, "", 0, &mut fields);
        Self { root, fields }
    }

    pub fn type_name(&self) -> &str {
        &self.root.name
    }

    pub fn size(&self) -> u64 {
        self.root.size as u64
    }

    pub fn min_binding_size(&self) -> Option<NonZeroU64> {
        NonZeroU64::new(self.size())
    }

    pub fn field(&self, name: &str) -> Option<FieldSlot> {
        self.fields.get(name).copied()
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// WGSL declarations for the root struct and every struct it references,
    /// dependencies first.
    pub fn wgsl_declarations(&self) -> String {
        let mut order: Vec<&StructLayout> = Vec::new();
        collect_structs(&self.root, &mut order);

        let mut out = String::new();
        for s in order {
            let _ = writeln!(out, "struct {} {{", s.name);
            for m in &s.members {
                let ty = match &m.ty {
                    MemberTy::Leaf(k) => k.wgsl().to_string(),
                    MemberTy::Struct(t) => t.name.clone(),
                    MemberTy::Array(t, n) => format!("array<{}, {n}>", t.name),
                };
                let _ = writeln!(out, "    {}: {},", m.name, ty);
            }
            out.push_str("}\n\n");
        }
        out
    }

    /// Returns a writer over `bytes`, which must be at least [`Self::size`] long.
    pub fn writer<'a>(&'a self, bytes: &'a mut [u8]) -> UniformWriter<'a> {
        debug_assert!(bytes.len() as u64 >= self.size());
        UniformWriter { layout: self, bytes }
    }
}

fn flatten(s: &StructLayout, prefix: &str, base: u32, out: &mut HashMap<String, FieldSlot>) {
    for m in &s.members {
        let name = format!("{prefix}{}", m.name);
        let offset = base + m.offset;
        match &m.ty {
            MemberTy::Leaf(kind) => {
                out.insert(name, FieldSlot { offset, kind: *kind });
            }
            MemberTy::Struct(t) => flatten(t, &format!("{name}."), offset, out),
            MemberTy::Array(t, len) => {
                let stride = round_up(t.align, t.size);
                for i in 0..*len {
                    flatten(t, &format!("{name}[{i}]."), offset + stride * i as u32, out);
                }
            }
        }
    }
}

fn collect_structs<'a>(s: &'a StructLayout, out: &mut Vec<&'a StructLayout>) {
    for m in &s.members {
        match &m.ty {
            MemberTy::Struct(t) | MemberTy::Array(t, _) => collect_structs(t, out),
            MemberTy::Leaf(_) => {}
        }
    }
    if !out.iter().any(|o| o.name == s.name) {
        out.push(s);
    }
}

// ── typed writer ──────────────────────────────────────────────────────────

/// Typed setters over a byte region laid out by a [`UniformLayout`].
pub struct UniformWriter<'a> {
    layout: &'a UniformLayout,
    bytes: &'a mut [u8],
}

impl UniformWriter<'_> {
    pub fn set_bool(&mut self, name: &str, v: bool) -> Result<(), UniformError> {
        self.write(name, UniformKind::Bool, bytemuck::bytes_of(&(v as u32)))
    }

    pub fn set_int(&mut self, name: &str, v: i32) -> Result<(), UniformError> {
        self.write(name, UniformKind::Int, bytemuck::bytes_of(&v))
    }

    pub fn set_float(&mut self, name: &str, v: f32) -> Result<(), UniformError> {
        self.write(name, UniformKind::Float, bytemuck::bytes_of(&v))
    }

    pub fn set_vec2(&mut self, name: &str, v: Vec2) -> Result<(), UniformError> {
        self.write(name, UniformKind::Vec2, bytemuck::bytes_of(&v))
    }

    pub fn set_vec3(&mut self, name: &str, v: Vec3) -> Result<(), UniformError> {
        self.write(name, UniformKind::Vec3, bytemuck::bytes_of(&v))
    }

    pub fn set_mat4(&mut self, name: &str, m: &Mat4) -> Result<(), UniformError> {
        self.write(name, UniformKind::Mat4, bytemuck::bytes_of(m))
    }

    fn write(&mut self, name: &str, kind: UniformKind, src: &[u8]) -> Result<(), UniformError> {
        let slot = self.layout.field(name).ok_or_else(|| UniformError::Unknown {
            block: self.layout.type_name().to_string(),
            name: name.to_string(),
        })?;
        if slot.kind != kind {
            return Err(UniformError::KindMismatch {
                name: name.to_string(),
                declared: slot.kind,
                given: kind,
            });
        }
        let start = slot.offset as usize;
        self.bytes[start..start + src.len()].copy_from_slice(src);
        Ok(())
    }
}

// ── GPU-backed blocks ─────────────────────────────────────────────────────

/// One program-wide uniform block: CPU staging bytes + GPU buffer + bind group.
pub struct UniformBlock {
    layout: Arc<UniformLayout>,
    data: Vec<u8>,
    dirty: bool,
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl UniformBlock {
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        layout: Arc<UniformLayout>,
        bgl: &wgpu::BindGroupLayout,
    ) -> Self {
        let size = layout.size();
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });

        Self {
            data: vec![0; size as usize],
            layout,
            dirty: true,
            buffer,
            bind_group,
        }
    }

    pub fn layout(&self) -> &UniformLayout {
        &self.layout
    }

    /// Staged writes become visible to the GPU on the next [`Self::flush`].
    pub fn writer(&mut self) -> UniformWriter<'_> {
        self.dirty = true;
        self.layout.writer(&mut self.data)
    }

    /// CPU copy of the block as last written.
    pub fn staged(&self) -> &[u8] {
        &self.data
    }

    pub fn flush(&mut self, queue: &wgpu::Queue) {
        if self.dirty {
            queue.write_buffer(&self.buffer, 0, &self.data);
            self.dirty = false;
        }
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}

/// Per-draw uniforms: one slot per draw, selected with a dynamic offset.
pub struct DynamicUniformBlock {
    label: String,
    layout: Arc<UniformLayout>,
    stride: u64,
    data: Vec<u8>,
    capacity: usize,
    buffer: Option<wgpu::Buffer>,
    bind_group: Option<wgpu::BindGroup>,
}

impl DynamicUniformBlock {
    pub fn new(device: &wgpu::Device, label: &str, layout: Arc<UniformLayout>) -> Self {
        let align = device.limits().min_uniform_buffer_offset_alignment as u64;
        let stride = layout.size().div_ceil(align) * align;
        Self {
            label: label.to_string(),
            layout,
            stride,
            data: Vec::new(),
            capacity: 0,
            buffer: None,
            bind_group: None,
        }
    }

    pub fn stride(&self) -> u64 {
        self.stride
    }

    /// Grows the GPU buffer to hold at least `count` slots.
    pub fn ensure_capacity(
        &mut self,
        device: &wgpu::Device,
        bgl: &wgpu::BindGroupLayout,
        count: usize,
    ) {
        let count = count.max(1);
        self.data.resize(count * self.stride as usize, 0);

        if count <= self.capacity && self.buffer.is_some() {
            return;
        }

        let capacity = count.next_power_of_two();
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&self.label),
            size: capacity as u64 * self.stride,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&self.label),
            layout: bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: self.layout.min_binding_size(),
                }),
            }],
        });

        self.capacity = capacity;
        self.buffer = Some(buffer);
        self.bind_group = Some(bind_group);
    }

    pub fn slot(&mut self, index: usize) -> Result<UniformWriter<'_>, UniformError> {
        let stride = self.stride as usize;
        let start = index * stride;
        if start + stride > self.data.len() {
            return Err(UniformError::SlotOutOfRange {
                slot: index,
                capacity: self.data.len() / stride,
            });
        }
        Ok(self.layout.writer(&mut self.data[start..start + stride]))
    }

    pub fn offset(&self, index: usize) -> u32 {
        (index as u64 * self.stride) as u32
    }

    pub fn flush(&self, queue: &wgpu::Queue) {
        if let Some(buffer) = &self.buffer {
            queue.write_buffer(buffer, 0, &self.data);
        }
    }

    pub fn bind_group(&self) -> Option<&wgpu::BindGroup> {
        self.bind_group.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::programs;

    // ── layout ────────────────────────────────────────────────────────────

    #[test]
    fn dir_light_members_use_wgsl_offsets() {
        let light = programs::dir_light_struct();
        let layout = UniformLayout::new(
            StructLayout::builder("Wrap")
                .array("l", &light, 1)
                .build(),
        );
        assert_eq!(layout.field("l[0].dir").map(|f| f.offset), Some(0));
        assert_eq!(layout.field("l[0].color").map(|f| f.offset), Some(16));
        assert_eq!(layout.field("l[0].intensity").map(|f| f.offset), Some(28));
        assert_eq!(layout.field("l[0].shadow_unit").map(|f| f.offset), Some(32));
        assert_eq!(layout.field("l[0].world_to_proj").map(|f| f.offset), Some(48));
        assert_eq!(light.size(), 112);
    }

    #[test]
    fn lit_block_places_light_array_after_camera() {
        let layout = programs::lit_uniforms();
        assert_eq!(layout.field("cam_pos").map(|f| f.offset), Some(0));
        assert_eq!(layout.field("num_dir_lights").map(|f| f.offset), Some(12));
        assert_eq!(layout.field("dirlights[0].dir").map(|f| f.offset), Some(16));
        assert_eq!(layout.field("dirlights[1].dir").map(|f| f.offset), Some(16 + 112));
        assert_eq!(layout.size(), 16 + 112 * crate::render::units::MAX_LIGHTS as u64);
    }

    #[test]
    fn scalar_block_rounds_to_struct_alignment() {
        let layout = UniformLayout::new(
            StructLayout::builder("S")
                .field("a", UniformKind::Float)
                .field("b", UniformKind::Vec3)
                .build(),
        );
        assert_eq!(layout.field("b").map(|f| f.offset), Some(16));
        assert_eq!(layout.size(), 32);
    }

    #[test]
    fn declarations_list_dependencies_first() {
        let wgsl = programs::lit_uniforms().wgsl_declarations();
        let light = wgsl.find("struct DirLight").unwrap();
        let lit = wgsl.find("struct LitUniforms").unwrap();
        assert!(light < lit);
        assert!(wgsl.contains("dirlights: array<DirLight, 8>,"));
        assert_eq!(wgsl.matches("struct DirLight").count(), 1);
    }

    #[test]
    #[should_panic(expected = "stride")]
    fn array_of_small_struct_is_rejected() {
        let small = StructLayout::builder("Small")
            .field("x", UniformKind::Float)
            .build();
        let _ = StructLayout::builder("Bad").array("xs", &small, 4);
    }

    // ── writer ────────────────────────────────────────────────────────────

    #[test]
    fn setters_write_at_field_offsets() {
        let layout = programs::lit_uniforms();
        let mut bytes = vec![0u8; layout.size() as usize];
        {
            let mut w = layout.writer(&mut bytes);
            w.set_int("num_dir_lights", 3).unwrap();
            w.set_vec3("dirlights[1].color", Vec3::new(1.0, 2.0, 3.0)).unwrap();
        }
        assert_eq!(&bytes[12..16], &3i32.to_le_bytes());
        let color_at = 16 + 112 + 16;
        let color: &[f32] = bytemuck::cast_slice(&bytes[color_at..color_at + 12]);
        assert_eq!(color, &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn bool_is_stored_as_u32() {
        let layout = UniformLayout::new(
            StructLayout::builder("Flags")
                .field("enabled", UniformKind::Bool)
                .build(),
        );
        let mut bytes = vec![0u8; layout.size() as usize];
        layout.writer(&mut bytes).set_bool("enabled", true).unwrap();
        assert_eq!(&bytes[0..4], &1u32.to_le_bytes());
    }

    #[test]
    fn unknown_name_is_an_error() {
        let layout = programs::composite_uniforms();
        let mut bytes = vec![0u8; layout.size() as usize];
        let err = layout
            .writer(&mut bytes)
            .set_float("gama", 2.2)
            .unwrap_err();
        assert!(matches!(err, UniformError::Unknown { ref name, .. } if name == "gama"));
    }

    #[test]
    fn wrong_kind_is_an_error() {
        let layout = programs::composite_uniforms();
        let mut bytes = vec![0u8; layout.size() as usize];
        let err = layout
            .writer(&mut bytes)
            .set_int("gamma", 2)
            .unwrap_err();
        assert_eq!(
            err,
            UniformError::KindMismatch {
                name: "gamma".into(),
                declared: UniformKind::Float,
                given: UniformKind::Int,
            }
        );
    }

    #[test]
    fn every_light_slot_is_addressable() {
        let layout = programs::volumetric_uniforms();
        for i in 0..crate::render::units::MAX_LIGHTS {
            assert!(layout.field(&format!("dirlights[{i}].shadow_unit")).is_some());
        }
        assert!(layout.field("dirlights[8].dir").is_none());
    }
}
