use wgpu::util::DeviceExt;

use crate::render::program::VertexAttr;

/// CPU-side geometry for one primitive.
///
/// `uvs` and `normals` are optional: empty means absent, otherwise their
/// length must match `positions`.
#[derive(Debug, Clone, Default)]
pub struct MeshGeometry {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum GeometryError {
    #[error("geometry has no positions")]
    NoPositions,

    #[error("{attribute} count {len} does not match position count {positions}")]
    LengthMismatch {
        attribute: &'static str,
        len: usize,
        positions: usize,
    },

    #[error("index count {0} is not a multiple of 3")]
    PartialTriangle(usize),

    #[error("index {index} is out of range for {positions} positions")]
    IndexOutOfRange { index: u32, positions: usize },
}

impl MeshGeometry {
    pub fn validate(&self) -> Result<(), GeometryError> {
        let n = self.positions.len();
        if n == 0 {
            return Err(GeometryError::NoPositions);
        }
        if !self.normals.is_empty() && self.normals.len() != n {
            return Err(GeometryError::LengthMismatch {
                attribute: "normal",
                len: self.normals.len(),
                positions: n,
            });
        }
        if !self.uvs.is_empty() && self.uvs.len() != n {
            return Err(GeometryError::LengthMismatch {
                attribute: "uv",
                len: self.uvs.len(),
                positions: n,
            });
        }
        if self.indices.len() % 3 != 0 {
            return Err(GeometryError::PartialTriangle(self.indices.len()));
        }
        if let Some(&index) = self.indices.iter().find(|&&i| i as usize >= n) {
            return Err(GeometryError::IndexOutOfRange { index, positions: n });
        }
        Ok(())
    }
}

/// Device-resident mesh: one vertex buffer per present attribute plus a
/// `u32` index buffer.
#[derive(Debug)]
pub struct GpuMesh {
    positions: wgpu::Buffer,
    normals: Option<wgpu::Buffer>,
    uvs: Option<wgpu::Buffer>,
    indices: wgpu::Buffer,
    index_count: u32,
}

impl GpuMesh {
    /// Uploads `geometry`.
    ///
    /// Precondition: the index count is a multiple of 3
    /// ([`MeshGeometry::validate`] checks it).
    pub fn upload(device: &wgpu::Device, label: &str, geometry: &MeshGeometry) -> Self {
        debug_assert!(geometry.indices.len() % 3 == 0, "partial triangle in `{label}`");

        let vertex_buffer = |name: &str, contents: &[u8]| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} {name}")),
                contents,
                usage: wgpu::BufferUsages::VERTEX,
            })
        };

        let positions = vertex_buffer("positions", bytemuck::cast_slice(&geometry.positions));
        let normals = (!geometry.normals.is_empty())
            .then(|| vertex_buffer("normals", bytemuck::cast_slice(&geometry.normals)));
        let uvs = (!geometry.uvs.is_empty())
            .then(|| vertex_buffer("uvs", bytemuck::cast_slice(&geometry.uvs)));

        // Zero-sized buffers are not valid bindings; keep one padding triangle.
        let index_data: &[u32] = if geometry.indices.is_empty() {
            &[0, 0, 0]
        } else {
            &geometry.indices
        };
        let indices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} indices")),
            contents: bytemuck::cast_slice(index_data),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            positions,
            normals,
            uvs,
            indices,
            index_count: geometry.indices.len() as u32,
        }
    }

    /// Full-screen quad in NDC, UV origin top-left.
    pub fn screen_quad(device: &wgpu::Device) -> Self {
        let geometry = MeshGeometry {
            positions: vec![
                [-1.0, -1.0, 0.0],
                [1.0, -1.0, 0.0],
                [-1.0, 1.0, 0.0],
                [1.0, 1.0, 0.0],
            ],
            normals: Vec::new(),
            uvs: vec![[0.0, 1.0], [1.0, 1.0], [0.0, 0.0], [1.0, 0.0]],
            indices: vec![0, 1, 2, 1, 3, 2],
        };
        Self::upload(device, "screen quad", &geometry)
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn attribute(&self, attr: VertexAttr) -> Option<&wgpu::Buffer> {
        match attr {
            VertexAttr::Position => Some(&self.positions),
            VertexAttr::Normal => self.normals.as_ref(),
            VertexAttr::TexCoord => self.uvs.as_ref(),
        }
    }

    pub fn has_attributes(&self, attrs: &[VertexAttr]) -> bool {
        attrs.iter().all(|a| self.attribute(*a).is_some())
    }

    /// Binds the buffers for `attrs` (slot = position in `attrs`) and issues
    /// the indexed draw. Returns `false` without drawing if an attribute is
    /// missing.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, attrs: &[VertexAttr]) -> bool {
        if !self.has_attributes(attrs) || self.index_count == 0 {
            return false;
        }
        for (slot, attr) in attrs.iter().enumerate() {
            if let Some(buffer) = self.attribute(*attr) {
                pass.set_vertex_buffer(slot as u32, buffer.slice(..));
            }
        }
        pass.set_index_buffer(self.indices.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
        true
    }
}
