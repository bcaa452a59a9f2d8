//! Device acquisition: the windowed [`Gpu`] that owns the surface, and
//! [`HeadlessGpu`] for offscreen use and tests.

mod context;
mod error;
mod frame;
mod headless;
mod init;
mod surface;

pub use context::Gpu;
pub use error::SurfaceErrorAction;
pub use frame::GpuFrame;
pub use headless::HeadlessGpu;
pub use init::GpuInit;
