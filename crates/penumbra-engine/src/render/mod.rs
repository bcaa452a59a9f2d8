//! Frame rendering: programs, GPU resources and the four-pass pipeline.
//!
//! Per frame the [`RenderEngine`] runs, in order:
//! 1. one depth-only shadow pass per light,
//! 2. the lit HDR opaque pass,
//! 3. screen-space volumetric scattering,
//! 4. tone-mapped composite into the presented surface.

mod ctx;
mod engine;
pub mod program;
pub mod programs;
pub mod resources;
mod timer;
pub mod uniforms;
pub mod units;

pub use ctx::{RenderCtx, RenderTarget};
pub use engine::{BindingRebuilds, FrameStats, RenderEngine, RenderError, RendererConfig, ScatteringConfig, ToneMapping};
pub use timer::{FrameTimings, GpuTimer, PassKind};
