//! Penumbra engine crate.
//!
//! Real-time renderer for glTF scenes lit by shadow-casting directional
//! lights: shadow maps, an HDR lit pass, screen-space light scattering and a
//! tone-mapped composite. Also carries the window runtime, input and camera
//! control used by the viewer binary.

pub mod assets;
pub mod camera;
pub mod core;
pub mod device;
pub mod input;
pub mod logging;
pub mod render;
pub mod scene;
pub mod time;
pub mod window;
