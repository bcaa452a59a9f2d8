//! Owned GPU resources: meshes, textures and off-screen framebuffers.

mod framebuffer;
mod mesh;
mod texture;

pub use framebuffer::{FrameBuffer, HDR_FORMAT, DEPTH_FORMAT};
pub use mesh::{GeometryError, GpuMesh, MeshGeometry};
pub use texture::{GpuTexture, ImageData, TextureError};
