//! Perspective and orthographic camera
//!
//! The camera caches its projection, view, and combined matrices. All of
//! them are recomputed together by [`Camera::update`], the single mutator,
//! so the cached set can never mix matrices from different frames.

use crate::math::{Mat4, Vec3, mat, vec};

/// Homogeneous w below this magnitude means the point is in the camera
/// plane and cannot be projected.
const W_EPSILON: f32 = 1e-10;

/// Half the vertical extent of the orthographic view volume, world units.
const ORTHO_HALF_HEIGHT: f32 = 5.0;

/// Orbit-style 3D camera with cached derived matrices
#[derive(Debug, Clone)]
pub struct Camera {
    /// Camera position in world space
    pub position: Vec3,
    /// Point the camera looks at
    pub target: Vec3,
    /// Up vector (usually Y-up)
    pub up: Vec3,
    /// Vertical field of view in radians (perspective only)
    pub fov: f32,
    /// Near clipping plane
    pub near: f32,
    /// Far clipping plane
    pub far: f32,
    /// Use an orthographic projection instead of perspective
    pub orthographic: bool,

    aspect: f32,
    viewport: [f32; 2],
    projection: Mat4,
    view: Mat4,
    proj_view: Mat4,
    inv_proj_view: Option<Mat4>,
}

impl Camera {
    /// Create a camera with default framing for the given viewport
    pub fn new(width: f32, height: f32) -> Self {
        let mut cam = Self {
            position: [0.0, 0.0, 10.0],
            target: [0.0, 0.0, 0.0],
            up: [0.0, 1.0, 0.0],
            fov: std::f32::consts::FRAC_PI_4,
            near: 0.1,
            far: 1000.0,
            orthographic: false,
            aspect: 1.0,
            viewport: [1.0, 1.0],
            projection: mat::identity(),
            view: mat::identity(),
            proj_view: mat::identity(),
            inv_proj_view: Some(mat::identity()),
        };
        cam.update(width, height);
        cam
    }

    /// Recompute every derived matrix for the given viewport size
    ///
    /// Ignores non-positive dimensions so a collapsed canvas cannot poison
    /// the cached matrices with NaN aspect ratios.
    pub fn update(&mut self, width: f32, height: f32) {
        if width <= 0.0 || height <= 0.0 {
            return;
        }
        self.viewport = [width, height];
        self.aspect = width / height;

        self.projection = if self.orthographic {
            let half_h = ORTHO_HALF_HEIGHT;
            let half_w = half_h * self.aspect;
            mat::ortho(-half_w, half_w, -half_h, half_h, self.near, self.far)
        } else {
            mat::perspective(self.fov, self.aspect, self.near, self.far)
        };
        self.view = mat::look_at(self.position, self.target, self.up);
        self.proj_view = mat::multiply(self.projection, self.view);
        self.inv_proj_view = mat::invert(self.proj_view);
    }

    /// Current aspect ratio (width / height)
    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Viewport size the matrices were computed for
    pub fn viewport(&self) -> [f32; 2] {
        self.viewport
    }

    /// Cached projection matrix
    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    /// Cached view matrix
    pub fn view(&self) -> Mat4 {
        self.view
    }

    /// Cached projection x view matrix
    pub fn proj_view(&self) -> Mat4 {
        self.proj_view
    }

    /// Project a world-space point to screen pixels using the cached state
    pub fn world_to_screen(&self, world: Vec3) -> Option<[f32; 2]> {
        project_to_screen(world, self.proj_view, self.viewport[0], self.viewport[1])
    }

    /// Map a screen pixel back to world space at the given NDC depth
    pub fn unproject(&self, x: f32, y: f32, ndc_depth: f32) -> Option<Vec3> {
        let inv = self.inv_proj_view?;
        let ndc_x = (x / self.viewport[0]) * 2.0 - 1.0;
        let ndc_y = 1.0 - (y / self.viewport[1]) * 2.0;
        let world = vec::transform_vec4([ndc_x, ndc_y, ndc_depth, 1.0], inv);
        if world[3].abs() < W_EPSILON {
            return None;
        }
        Some([
            world[0] / world[3],
            world[1] / world[3],
            world[2] / world[3],
        ])
    }

    /// Distance at which a sphere of `radius` fills the vertical fov
    pub fn fit_distance(&self, radius: f32) -> f32 {
        radius / (self.fov / 2.0).tan()
    }
}

/// Project a world-space point through `proj_view` to screen pixels
///
/// Returns `None` when the point sits in the camera plane (|w| below
/// epsilon). Screen Y grows downward, so NDC Y is flipped.
pub fn project_to_screen(world: Vec3, proj_view: Mat4, width: f32, height: f32) -> Option<[f32; 2]> {
    let clip = vec::transform_vec4([world[0], world[1], world[2], 1.0], proj_view);
    if clip[3].abs() < W_EPSILON {
        return None;
    }
    let ndc_x = clip[0] / clip[3];
    let ndc_y = clip[1] / clip[3];
    Some([(ndc_x + 1.0) * 0.5 * width, (1.0 - ndc_y) * 0.5 * height])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_creates_with_defaults() {
        let cam = Camera::new(800.0, 600.0);
        assert!((cam.aspect() - 800.0 / 600.0).abs() < 1e-6);
        assert!(!cam.orthographic);
        assert_eq!(cam.up, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn update_keeps_proj_view_consistent() {
        let mut cam = Camera::new(800.0, 600.0);
        cam.position = [3.0, 4.0, 5.0];
        cam.update(1024.0, 768.0);

        let expected = mat::multiply(cam.projection(), cam.view());
        for i in 0..16 {
            assert!((cam.proj_view()[i] - expected[i]).abs() < 1e-6);
        }
    }

    #[test]
    fn update_ignores_zero_viewport() {
        let mut cam = Camera::new(800.0, 600.0);
        let before = cam.proj_view();
        cam.update(0.0, 600.0);
        cam.update(800.0, 0.0);
        assert_eq!(cam.proj_view(), before);
        assert_eq!(cam.viewport(), [800.0, 600.0]);
    }

    #[test]
    fn target_projects_to_viewport_center() {
        // Camera at (5,5,5) looking at the origin, 45 degree fov, 800x600.
        let mut cam = Camera::new(800.0, 600.0);
        cam.position = [5.0, 5.0, 5.0];
        cam.target = [0.0, 0.0, 0.0];
        cam.update(800.0, 600.0);

        let screen = cam.world_to_screen(cam.target).unwrap();
        assert!((screen[0] - 400.0).abs() < 2.0, "x was {}", screen[0]);
        assert!((screen[1] - 300.0).abs() < 2.0, "y was {}", screen[1]);
    }

    #[test]
    fn screen_y_grows_downward() {
        let mut cam = Camera::new(800.0, 600.0);
        cam.position = [0.0, 0.0, 10.0];
        cam.update(800.0, 600.0);

        // A point above the target must land above the viewport center.
        let above = cam.world_to_screen([0.0, 1.0, 0.0]).unwrap();
        assert!(above[1] < 300.0);
    }

    #[test]
    fn point_in_camera_plane_does_not_project() {
        let mut cam = Camera::new(800.0, 600.0);
        cam.position = [0.0, 0.0, 10.0];
        cam.update(800.0, 600.0);

        // The camera position itself has w = 0 in clip space.
        assert!(cam.world_to_screen(cam.position).is_none());
    }

    #[test]
    fn orthographic_uses_fixed_half_height() {
        let mut cam = Camera::new(800.0, 600.0);
        cam.position = [0.0, 0.0, 10.0];
        cam.orthographic = true;
        cam.update(800.0, 600.0);

        // (0, 5, 0) sits exactly on the top edge of the ortho volume.
        let top = cam.world_to_screen([0.0, 5.0, 0.0]).unwrap();
        assert!(top[1].abs() < 1e-3);

        // Horizontal extent scales with aspect: x = 5 * aspect is the right edge.
        let right = cam.world_to_screen([5.0 * cam.aspect(), 0.0, 0.0]).unwrap();
        assert!((right[0] - 800.0).abs() < 1e-2);
    }

    #[test]
    fn unproject_round_trips_through_project() {
        let mut cam = Camera::new(800.0, 600.0);
        cam.position = [5.0, 5.0, 5.0];
        cam.update(800.0, 600.0);

        let world = cam.unproject(200.0, 150.0, 0.5).unwrap();
        let screen = cam.world_to_screen(world).unwrap();
        assert!((screen[0] - 200.0).abs() < 0.1);
        assert!((screen[1] - 150.0).abs() < 0.1);
    }

    #[test]
    fn fit_distance_matches_fov_geometry() {
        let mut cam = Camera::new(100.0, 100.0);
        cam.fov = std::f32::consts::FRAC_PI_2;
        // tan(45 deg) = 1, so a sphere of radius 5 fits at distance 5.
        assert!((cam.fit_distance(5.0) - 5.0).abs() < 1e-5);
    }
}
