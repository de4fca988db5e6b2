//! The 3D view camera.
//!
//! Exposes exactly what the post-process pipeline needs: a view matrix, a
//! projection matrix and the aspect ratio. Orientation is pitch/yaw Euler
//! with an optional look-at constructor; projection is right-handed with
//! the 0..1 depth range the GPU expects.

use glam::{Mat4, Vec3};

#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pub position: Vec3,
    /// Pitch in radians (positive looks down).
    pub pitch: f32,
    /// Yaw in radians around world Y.
    pub yaw: f32,
    pub fov_deg: f32,
    pub near: f32,
    pub far: f32,
    aspect: f32,
}

impl Camera {
    pub fn new(position: Vec3, pitch: f32, yaw: f32) -> Self {
        Self {
            position,
            pitch,
            yaw,
            fov_deg: 45.0,
            near: 0.5,
            far: 10_000.0,
            aspect: 1.0,
        }
    }

    /// A camera at `position` oriented toward `target`.
    pub fn look_at(position: Vec3, target: Vec3) -> Self {
        let dir = (target - position).normalize_or_zero();
        let pitch = (-dir.y).asin();
        let yaw = dir.x.atan2(-dir.z);
        Self::new(position, pitch, yaw)
    }

    pub fn set_clip_planes(&mut self, near: f32, far: f32) {
        self.near = near;
        self.far = far;
    }

    /// Update the aspect ratio; called whenever the viewport resizes.
    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Forward direction derived from pitch/yaw. Yaw 0 looks down -Z.
    pub fn forward(&self) -> Vec3 {
        Vec3::new(
            self.yaw.sin() * self.pitch.cos(),
            -self.pitch.sin(),
            -self.yaw.cos() * self.pitch.cos(),
        )
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.forward(), Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_deg.to_radians(), self.aspect, self.near, self.far)
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_defaults_to_negative_z() {
        let camera = Camera::new(Vec3::ZERO, 0.0, 0.0);
        let f = camera.forward();
        assert!((f - Vec3::NEG_Z).length() < 1e-6);
    }

    #[test]
    fn test_look_at_points_at_target() {
        let camera = Camera::look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO);
        let f = camera.forward();
        assert!((f - Vec3::NEG_Z).length() < 1e-5);
    }

    #[test]
    fn test_view_matrix_moves_target_in_front() {
        let camera = Camera::look_at(Vec3::new(3.0, 2.0, 8.0), Vec3::ZERO);
        let in_view = camera.view_matrix().transform_point3(Vec3::ZERO);
        // View space looks down -Z.
        assert!(in_view.z < 0.0);
    }

    #[test]
    fn test_projected_point_in_front_has_positive_w() {
        let mut camera = Camera::new(Vec3::ZERO, 0.0, 0.0);
        camera.set_aspect(16.0 / 9.0);
        let clip = camera.view_projection_matrix() * Vec3::new(0.0, 0.0, -10.0).extend(1.0);
        assert!(clip.w > 0.0);
    }
}
