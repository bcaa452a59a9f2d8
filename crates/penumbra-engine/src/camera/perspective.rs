use glam::{Mat4, Vec3};

/// World up axis. The scene is Z-up.
pub const Z_AXIS: Vec3 = Vec3::Z;

/// Pitch is clamped to `±PITCH_LIMIT_DEG` so the look-at never degenerates.
pub const PITCH_LIMIT_DEG: f32 = 89.5;

const FOV_MIN_DEG: f32 = 1.0;
const FOV_MAX_DEG: f32 = 45.0;

/// Initial camera placement and lens.
#[derive(Debug, Clone)]
pub struct CameraConfig {
    pub position: Vec3,
    pub direction: Vec3,
    pub up: Vec3,
    /// Vertical field of view in degrees.
    pub fov_deg: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: Vec3::new(10.0, -4.5, 4.0),
            direction: Vec3::new(-1.0, 0.8, 0.0),
            up: Z_AXIS,
            fov_deg: 45.0,
            z_near: 0.1,
            z_far: 100.0,
        }
    }
}

/// Perspective camera with cached derived matrices.
///
/// Direction is kept both as a unit vector and as pitch/yaw (degrees).
/// Every mutating call rebuilds `view`, `proj_view` and `inv_proj_view`, so
/// none of them can be observed stale.
#[derive(Debug, Clone)]
pub struct Camera {
    pos: Vec3,
    dir: Vec3,
    up: Vec3,
    pitch: f32,
    yaw: f32,

    fov_deg: f32,
    aspect: f32,
    z_near: f32,
    z_far: f32,

    view: Mat4,
    proj: Mat4,
    proj_view: Mat4,
    inv_proj_view: Mat4,
}

impl Camera {
    pub fn new(config: &CameraConfig) -> Self {
        let mut cam = Self {
            pos: Vec3::ZERO,
            dir: Vec3::X,
            up: Z_AXIS,
            pitch: 0.0,
            yaw: 0.0,
            fov_deg: config.fov_deg,
            aspect: 1.0,
            z_near: config.z_near,
            z_far: config.z_far,
            view: Mat4::IDENTITY,
            proj: Mat4::IDENTITY,
            proj_view: Mat4::IDENTITY,
            inv_proj_view: Mat4::IDENTITY,
        };
        cam.set_projection(config.fov_deg, config.z_near, config.z_far);
        cam.set_orientation(config.position, config.direction, config.up);
        cam
    }

    /// Places the camera. `dir` must not be zero length.
    ///
    /// Pitch and yaw are derived from `dir`; pitch is clamped like in
    /// [`Camera::rotate`], the stored direction is not.
    pub fn set_orientation(&mut self, pos: Vec3, dir: Vec3, up: Vec3) {
        debug_assert!(dir.length_squared() > 0.0, "camera direction must be non-zero");
        self.pos = pos;
        self.dir = dir.normalize();
        self.up = up;

        let horizontal = (self.dir.x * self.dir.x + self.dir.y * self.dir.y).sqrt();
        self.pitch = self
            .dir
            .z
            .atan2(horizontal)
            .to_degrees()
            .clamp(-PITCH_LIMIT_DEG, PITCH_LIMIT_DEG);
        self.yaw = self.dir.y.atan2(self.dir.x).to_degrees();

        self.rebuild_view();
    }

    pub fn set_projection(&mut self, fov_deg: f32, z_near: f32, z_far: f32) {
        self.fov_deg = fov_deg;
        self.z_near = z_near;
        self.z_far = z_far;
        self.rebuild_projection();
    }

    /// Ignores non-positive or non-finite ratios (minimized windows).
    pub fn set_aspect_ratio(&mut self, ratio: f32) {
        if !(ratio.is_finite() && ratio > 0.0) {
            log::debug!("camera: ignoring aspect ratio {ratio}");
            return;
        }
        self.aspect = ratio;
        self.rebuild_projection();
    }

    pub fn translate(&mut self, delta: Vec3) {
        self.pos += delta;
        self.rebuild_view();
    }

    /// Adds to pitch (clamped) and yaw (unbounded), in degrees.
    pub fn rotate(&mut self, delta_pitch_deg: f32, delta_yaw_deg: f32) {
        self.pitch = (self.pitch + delta_pitch_deg).clamp(-PITCH_LIMIT_DEG, PITCH_LIMIT_DEG);
        self.yaw += delta_yaw_deg;

        let (sp, cp) = self.pitch.to_radians().sin_cos();
        let (sy, cy) = self.yaw.to_radians().sin_cos();
        self.dir = Vec3::new(cp * cy, cp * sy, sp).normalize();

        self.rebuild_view();
    }

    /// Adds `delta` degrees to the field of view, clamped to [1, 45].
    pub fn zoom(&mut self, delta: f32) {
        self.fov_deg = (self.fov_deg + delta).clamp(FOV_MIN_DEG, FOV_MAX_DEG);
        self.rebuild_projection();
    }

    fn rebuild_projection(&mut self) {
        self.proj = Mat4::perspective_rh(
            self.fov_deg.to_radians(),
            self.aspect,
            self.z_near,
            self.z_far,
        );
        self.rebuild_products();
    }

    fn rebuild_view(&mut self) {
        self.view = Mat4::look_at_rh(self.pos, self.pos + self.dir, self.up);
        self.rebuild_products();
    }

    fn rebuild_products(&mut self) {
        self.proj_view = self.proj * self.view;
        self.inv_proj_view = self.proj_view.inverse();
    }

    // ── accessors ─────────────────────────────────────────────────────────

    pub fn position(&self) -> Vec3 {
        self.pos
    }

    pub fn direction(&self) -> Vec3 {
        self.dir
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn fov_deg(&self) -> f32 {
        self.fov_deg
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    pub fn proj(&self) -> Mat4 {
        self.proj
    }

    pub fn proj_view(&self) -> Mat4 {
        self.proj_view
    }

    pub fn inv_proj_view(&self) -> Mat4 {
        self.inv_proj_view
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(&CameraConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_products_fresh(cam: &Camera) {
        assert_eq!(cam.proj_view(), cam.proj() * cam.view());
        let product = cam.inv_proj_view() * cam.proj_view();
        assert!(
            product.abs_diff_eq(Mat4::IDENTITY, 1e-3),
            "inverse is stale: {product:?}"
        );
    }

    // ── orientation ───────────────────────────────────────────────────────

    #[test]
    fn orientation_derives_pitch_and_yaw() {
        let mut cam = Camera::default();
        cam.set_orientation(Vec3::ZERO, Vec3::new(1.0, 1.0, 0.0), Z_AXIS);
        assert!((cam.yaw() - 45.0).abs() < 1e-4);
        assert!(cam.pitch().abs() < 1e-4);

        cam.set_orientation(Vec3::ZERO, Vec3::new(1.0, 0.0, 1.0), Z_AXIS);
        assert!((cam.pitch() - 45.0).abs() < 1e-4);
        assert!((cam.direction().length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn pitch_stays_clamped_for_any_rotation_sequence() {
        let mut cam = Camera::default();
        // Deterministic pseudo-random walk.
        let mut seed = 0x2545_f491_u32;
        for _ in 0..500 {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            let dp = (seed % 400) as f32 - 200.0;
            let dy = ((seed >> 8) % 720) as f32 - 360.0;
            cam.rotate(dp, dy);
            assert!(cam.pitch() >= -PITCH_LIMIT_DEG && cam.pitch() <= PITCH_LIMIT_DEG);
            assert!((cam.direction().length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn rotate_follows_spherical_formula() {
        let mut cam = Camera::default();
        cam.set_orientation(Vec3::ZERO, Vec3::X, Z_AXIS);
        cam.rotate(30.0, 90.0);
        let expected = Vec3::new(0.0, 30f32.to_radians().cos(), 30f32.to_radians().sin());
        assert!(cam.direction().abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn extreme_pitch_saturates() {
        let mut cam = Camera::default();
        cam.rotate(1000.0, 0.0);
        assert_eq!(cam.pitch(), PITCH_LIMIT_DEG);
        cam.rotate(-5000.0, 0.0);
        assert_eq!(cam.pitch(), -PITCH_LIMIT_DEG);
    }

    // ── derived matrices ──────────────────────────────────────────────────

    #[test]
    fn products_are_rebuilt_after_every_mutation() {
        let mut cam = Camera::default();
        assert_products_fresh(&cam);
        cam.translate(Vec3::new(1.0, 2.0, 0.5));
        assert_products_fresh(&cam);
        cam.rotate(10.0, -25.0);
        assert_products_fresh(&cam);
        cam.set_aspect_ratio(16.0 / 9.0);
        assert_products_fresh(&cam);
        cam.set_projection(60.0, 0.5, 50.0);
        assert_products_fresh(&cam);
        cam.zoom(3.0);
        assert_products_fresh(&cam);
        cam.set_orientation(Vec3::new(0.0, 0.0, 2.0), Vec3::new(0.3, -1.0, 0.1), Z_AXIS);
        assert_products_fresh(&cam);
    }

    #[test]
    fn aspect_ratio_is_idempotent() {
        let mut cam = Camera::default();
        cam.set_aspect_ratio(1.6);
        let first = cam.proj();
        cam.set_aspect_ratio(1.6);
        assert_eq!(first, cam.proj());
        cam.set_aspect_ratio(0.75);
        cam.set_aspect_ratio(1.6);
        assert_eq!(first, cam.proj());
    }

    #[test]
    fn degenerate_aspect_is_ignored() {
        let mut cam = Camera::default();
        cam.set_aspect_ratio(2.0);
        let before = cam.proj();
        cam.set_aspect_ratio(0.0);
        cam.set_aspect_ratio(f32::NAN);
        assert_eq!(cam.aspect_ratio(), 2.0);
        assert_eq!(before, cam.proj());
    }

    #[test]
    fn zoom_clamps_fov() {
        let mut cam = Camera::default();
        cam.zoom(100.0);
        assert_eq!(cam.fov_deg(), 45.0);
        cam.zoom(-100.0);
        assert_eq!(cam.fov_deg(), 1.0);
        cam.zoom(29.0);
        assert_eq!(cam.fov_deg(), 30.0);
    }
}
