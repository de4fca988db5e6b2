//! Projection of a 3D-space rectangle onto the post-process viewport.
//!
//! Area-restricted effects shade only a camera-facing rectangular region of
//! the scene. The region is given as a world-space centre plus width and
//! height; this module turns it into the normalised UV rectangle (and depth
//! value) the post-process vertex stage consumes. Computed fresh each
//! invocation — it depends on the current camera and target transform.

use glam::{Vec2, Vec3, Vec4Swizzles};

use crate::camera::Camera;

/// A viewport-space rectangle in UV coordinates ((0,0) top-left,
/// (1,1) bottom-right) plus the depth-buffer value the quad is drawn at.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AreaRect {
    pub top_left: Vec2,
    pub bottom_right: Vec2,
    pub depth: f32,
}

impl AreaRect {
    /// The whole viewport, at depth 0 (in front of everything).
    pub fn full_screen() -> Self {
        Self {
            top_left: Vec2::ZERO,
            bottom_right: Vec2::ONE,
            depth: 0.0,
        }
    }

    pub fn centre(&self) -> Vec2 {
        (self.top_left + self.bottom_right) / 2.0
    }
}

/// Project a camera-facing world-space rectangle into viewport UV space.
///
/// `depth_bias` offsets the rectangle's apparent depth: positive values push
/// the effect into the scene, negative values pull it out. The bias is added
/// to both z and w before the depth divide, an approximation that behaves
/// well for moderate offsets.
///
/// A degenerate (near-zero) on-screen rectangle is not an error; the effect
/// still executes and it is the caller's job to pick a visible area.
pub fn project_area(
    camera: &Camera,
    centre: Vec3,
    width: f32,
    height: f32,
    depth_bias: f32,
) -> AreaRect {
    let view = camera.view_matrix();
    let proj = camera.projection_matrix();

    // Area centre in camera space. The camera-space vertical axis points up,
    // opposite the UV convention, so the top edge is +y here.
    let centre_cam = view * centre.extend(1.0);
    let top_left_cam = centre_cam + glam::Vec4::new(-width / 2.0, height / 2.0, 0.0, 0.0);
    let bottom_right_cam = centre_cam + glam::Vec4::new(width / 2.0, -height / 2.0, 0.0, 0.0);

    let top_left_clip = proj * top_left_cam;
    let bottom_right_clip = proj * bottom_right_cam;

    // Perspective divide into normalised device coordinates.
    let tl_ndc = top_left_clip.xy() / top_left_clip.w;
    let br_ndc = bottom_right_clip.xy() / bottom_right_clip.w;

    // Depth divide with the bias applied to z and w first.
    let depth = (top_left_clip.z + depth_bias) / (top_left_clip.w + depth_bias);

    // Remap [-1,1] device space to [0,1] UV space; device-space up is
    // UV-space down.
    let to_uv = |ndc: Vec2| Vec2::new(ndc.x / 2.0 + 0.5, -ndc.y / 2.0 + 0.5);

    AreaRect {
        top_left: to_uv(tl_ndc),
        bottom_right: to_uv(br_ndc),
        depth,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forward_camera(aspect: f32) -> Camera {
        let mut camera = Camera::new(Vec3::ZERO, 0.0, 0.0);
        camera.set_clip_planes(0.5, 1000.0);
        camera.set_aspect(aspect);
        camera
    }

    #[test]
    fn test_centred_rect_maps_to_viewport_centre() {
        let camera = forward_camera(16.0 / 9.0);
        // Small rectangle far along the forward axis.
        let rect = project_area(&camera, Vec3::new(0.0, 0.0, -50.0), 1.0, 1.0, 0.0);
        let centre = rect.centre();
        assert!((centre.x - 0.5).abs() < 1e-4, "centre {:?}", centre);
        assert!((centre.y - 0.5).abs() < 1e-4, "centre {:?}", centre);
    }

    #[test]
    fn test_uv_rect_is_well_ordered() {
        let camera = forward_camera(1.0);
        let rect = project_area(&camera, Vec3::new(0.0, 0.0, -20.0), 4.0, 4.0, 0.0);
        assert!(rect.top_left.x < rect.bottom_right.x);
        assert!(rect.top_left.y < rect.bottom_right.y);
    }

    #[test]
    fn test_world_up_maps_to_smaller_v() {
        let camera = forward_camera(1.0);
        let above = project_area(&camera, Vec3::new(0.0, 3.0, -20.0), 1.0, 1.0, 0.0);
        let below = project_area(&camera, Vec3::new(0.0, -3.0, -20.0), 1.0, 1.0, 0.0);
        // Higher in the world means closer to the top of the screen (lower v).
        assert!(above.centre().y < below.centre().y);
    }

    #[test]
    fn test_offset_left_maps_left_of_centre() {
        let camera = forward_camera(1.0);
        let rect = project_area(&camera, Vec3::new(-5.0, 0.0, -20.0), 1.0, 1.0, 0.0);
        assert!(rect.centre().x < 0.5);
    }

    #[test]
    fn test_positive_bias_pushes_depth_deeper() {
        let camera = forward_camera(1.0);
        let unbiased = project_area(&camera, Vec3::new(0.0, 0.0, -20.0), 2.0, 2.0, 0.0);
        let biased = project_area(&camera, Vec3::new(0.0, 0.0, -20.0), 2.0, 2.0, 5.0);
        assert!(biased.depth > unbiased.depth);
        assert!(biased.depth <= 1.0);
    }

    #[test]
    fn test_degenerate_rect_still_projects() {
        let camera = forward_camera(1.0);
        let rect = project_area(&camera, Vec3::new(0.0, 0.0, -500.0), 1e-4, 1e-4, 0.0);
        let size = rect.bottom_right - rect.top_left;
        assert!(size.x.abs() < 1e-3 && size.y.abs() < 1e-3);
    }

    #[test]
    fn test_full_screen_rect() {
        let rect = AreaRect::full_screen();
        assert_eq!(rect.top_left, Vec2::ZERO);
        assert_eq!(rect.bottom_right, Vec2::ONE);
        assert_eq!(rect.depth, 0.0);
    }
}
