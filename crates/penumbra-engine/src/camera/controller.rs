use glam::Vec3;

use crate::input::{InputState, Key};

use super::perspective::{Camera, Z_AXIS};

/// Key assignment for the fly controller.
#[derive(Debug, Clone)]
pub struct KeyBindings {
    pub forward: Key,
    pub back: Key,
    pub strafe_left: Key,
    pub strafe_right: Key,
    pub rise: Key,
    pub sink: Key,
    pub look_up: Key,
    pub look_down: Key,
    pub look_left: Key,
    pub look_right: Key,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            forward: Key::W,
            back: Key::S,
            strafe_left: Key::A,
            strafe_right: Key::D,
            rise: Key::E,
            sink: Key::C,
            look_up: Key::ArrowUp,
            look_down: Key::ArrowDown,
            look_left: Key::ArrowLeft,
            look_right: Key::ArrowRight,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Movement speed in world units per second.
    pub shift_speed: f32,
    /// Keyboard look speed in degrees per second.
    pub rot_speed: f32,
    /// Degrees per logical pixel of pointer motion.
    pub mouse_speed: f32,
    pub keys: KeyBindings,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            shift_speed: 1.5,
            rot_speed: 40.0,
            mouse_speed: 0.1,
            keys: KeyBindings::default(),
        }
    }
}

/// First-person fly controller.
///
/// Each held key contributes its own step, so holding forward and strafe
/// together moves `sqrt(2)` times faster than either alone.
#[derive(Debug, Clone)]
pub struct FlyController {
    config: ControllerConfig,
    last_pointer: Option<(f32, f32)>,
}

impl FlyController {
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            config,
            last_pointer: None,
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Integrates held keys over `dt` seconds.
    pub fn update(&mut self, cam: &mut Camera, input: &InputState, dt: f32) {
        let keys = &self.config.keys;
        let step = self.config.shift_speed * dt;
        let turn = self.config.rot_speed * dt;

        let dir = cam.direction();
        let horizontal = Vec3::new(dir.x, dir.y, 0.0).normalize_or_zero();
        let strafe = dir.cross(Z_AXIS).normalize_or_zero();

        if input.key_down(keys.forward) {
            cam.translate(horizontal * step);
        }
        if input.key_down(keys.back) {
            cam.translate(-horizontal * step);
        }
        if input.key_down(keys.strafe_right) {
            cam.translate(strafe * step);
        }
        if input.key_down(keys.strafe_left) {
            cam.translate(-strafe * step);
        }
        if input.key_down(keys.rise) {
            cam.translate(Z_AXIS * step);
        }
        if input.key_down(keys.sink) {
            cam.translate(-Z_AXIS * step);
        }

        if input.key_down(keys.look_up) {
            cam.rotate(turn, 0.0);
        }
        if input.key_down(keys.look_down) {
            cam.rotate(-turn, 0.0);
        }
        if input.key_down(keys.look_left) {
            cam.rotate(0.0, turn);
        }
        if input.key_down(keys.look_right) {
            cam.rotate(0.0, -turn);
        }
    }

    /// Rotates by the pointer delta since the previous sample.
    ///
    /// The first sample after construction or [`FlyController::reset_pointer`]
    /// only records the baseline.
    pub fn pointer_moved(&mut self, cam: &mut Camera, x: f32, y: f32) {
        let Some((last_x, last_y)) = self.last_pointer.replace((x, y)) else {
            return;
        };

        // Screen y grows downward; pitch grows upward. Yaw follows x as is.
        let dx = x - last_x;
        let dy = last_y - y;
        let sens = self.config.mouse_speed;
        cam.rotate(dy * sens, dx * sens);
    }

    /// Widens the field of view by the scroll delta in lines.
    pub fn scrolled(&mut self, cam: &mut Camera, lines: f32) {
        if lines != 0.0 {
            cam.zoom(lines);
        }
    }

    /// Makes the next pointer sample a fresh baseline.
    pub fn reset_pointer(&mut self) {
        self.last_pointer = None;
    }
}

impl Default for FlyController {
    fn default() -> Self {
        Self::new(ControllerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CameraConfig;

    fn level_camera() -> Camera {
        Camera::new(&CameraConfig {
            position: Vec3::ZERO,
            direction: Vec3::X,
            ..CameraConfig::default()
        })
    }

    fn holding(keys: &[Key]) -> InputState {
        let mut input = InputState::default();
        input.keys_down.extend(keys.iter().copied());
        input
    }

    // ── keyboard ──────────────────────────────────────────────────────────

    #[test]
    fn forward_moves_along_horizontal_direction() {
        let mut cam = level_camera();
        cam.rotate(30.0, 0.0);
        let mut ctl = FlyController::default();
        ctl.update(&mut cam, &holding(&[Key::W]), 2.0);
        assert!(cam.position().abs_diff_eq(Vec3::new(3.0, 0.0, 0.0), 1e-5));
    }

    #[test]
    fn strafe_right_is_dir_cross_up() {
        let mut cam = level_camera();
        let mut ctl = FlyController::default();
        ctl.update(&mut cam, &holding(&[Key::D]), 1.0);
        assert!(cam.position().abs_diff_eq(Vec3::new(0.0, -1.5, 0.0), 1e-5));
    }

    #[test]
    fn diagonal_movement_is_not_normalized() {
        let mut cam = level_camera();
        let mut ctl = FlyController::default();
        ctl.update(&mut cam, &holding(&[Key::W, Key::D]), 1.0);
        let travelled = cam.position().length();
        assert!((travelled - 1.5 * 2f32.sqrt()).abs() < 1e-4);
    }

    #[test]
    fn vertical_keys_move_along_z() {
        let mut cam = level_camera();
        let mut ctl = FlyController::default();
        ctl.update(&mut cam, &holding(&[Key::E]), 1.0);
        assert!(cam.position().abs_diff_eq(Vec3::new(0.0, 0.0, 1.5), 1e-5));
        ctl.update(&mut cam, &holding(&[Key::C]), 2.0);
        assert!(cam.position().abs_diff_eq(Vec3::new(0.0, 0.0, -1.5), 1e-5));
    }

    #[test]
    fn look_left_increases_yaw() {
        let mut cam = level_camera();
        let mut ctl = FlyController::default();
        ctl.update(&mut cam, &holding(&[Key::ArrowLeft]), 0.5);
        assert!((cam.yaw() - 20.0).abs() < 1e-4);
        ctl.update(&mut cam, &holding(&[Key::ArrowUp]), 0.25);
        assert!((cam.pitch() - 10.0).abs() < 1e-4);
    }

    // ── pointer ───────────────────────────────────────────────────────────

    #[test]
    fn first_pointer_sample_is_baseline_only() {
        let mut cam = level_camera();
        let mut ctl = FlyController::default();
        ctl.pointer_moved(&mut cam, 500.0, 300.0);
        assert_eq!(cam.direction(), Vec3::X);
        assert_eq!(cam.pitch(), 0.0);
    }

    #[test]
    fn pointer_up_raises_pitch() {
        let mut cam = level_camera();
        let mut ctl = FlyController::default();
        ctl.pointer_moved(&mut cam, 100.0, 100.0);
        ctl.pointer_moved(&mut cam, 100.0, 50.0);
        assert!((cam.pitch() - 5.0).abs() < 1e-4);

        ctl.reset_pointer();
        ctl.pointer_moved(&mut cam, 0.0, 0.0);
        assert!((cam.pitch() - 5.0).abs() < 1e-4);
    }

    #[test]
    fn scroll_zooms_within_bounds() {
        let mut cam = level_camera();
        let mut ctl = FlyController::default();
        ctl.scrolled(&mut cam, 1.0);
        assert_eq!(cam.fov_deg(), 45.0);
        ctl.scrolled(&mut cam, -10.0);
        assert_eq!(cam.fov_deg(), 35.0);
        ctl.scrolled(&mut cam, 2.0);
        assert_eq!(cam.fov_deg(), 37.0);
        ctl.scrolled(&mut cam, -100.0);
        assert_eq!(cam.fov_deg(), 1.0);
    }

    #[test]
    fn pointer_right_increases_yaw() {
        let mut cam = level_camera();
        let mut ctl = FlyController::default();
        let yaw = cam.yaw();
        ctl.pointer_moved(&mut cam, 100.0, 100.0);
        ctl.pointer_moved(&mut cam, 110.0, 100.0);
        assert!((cam.yaw() - (yaw + 1.0)).abs() < 1e-4);
        assert!(cam.pitch().abs() < 1e-4);
    }
}
