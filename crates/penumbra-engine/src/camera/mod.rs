//! First-person camera.
//!
//! `Camera` owns the view/projection state and keeps every derived matrix in
//! sync. `FlyController` turns held keys, pointer motion and scroll into
//! camera mutations.

mod perspective;
mod controller;

pub use perspective::{Camera, CameraConfig, PITCH_LIMIT_DEG, Z_AXIS};
pub use controller::{ControllerConfig, FlyController, KeyBindings};
