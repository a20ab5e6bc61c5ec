//! Orbit interaction controller
//!
//! Translates pointer, touch, and wheel input into spherical camera motion
//! around a target point. Rotation gestures leave a residual angular
//! velocity that decays over the following frames, so a released drag
//! coasts to a stop instead of freezing.

use crate::camera::Camera;
use crate::math::{Vec3, vec};

/// Velocity magnitudes below this snap to exactly zero.
const VELOCITY_SNAP: f32 = 1e-4;

/// Wheel zoom step per notch (>1 moves the camera away).
const ZOOM_STEP_OUT: f32 = 1.1;
const ZOOM_STEP_IN: f32 = 0.9;

/// Pinch distances below this are treated as a degenerate gesture.
const PINCH_EPSILON: f32 = 1e-3;

const WORLD_UP: Vec3 = [0.0, 1.0, 0.0];

/// Which pointer button started a drag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
}

/// Active gesture, if any
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragState {
    Idle,
    Rotating,
    Panning,
    /// Two-finger zoom, anchored at the gesture's starting geometry
    Pinching {
        start_distance: f32,
        start_radius: f32,
    },
}

/// Tunable limits and speeds for the controller
#[derive(Debug, Clone)]
pub struct OrbitOptions {
    /// Enable rotate / pan / zoom gestures
    pub rotate: bool,
    pub pan: bool,
    pub zoom: bool,
    /// Spin the camera when no gesture is active
    pub auto_rotate: bool,
    /// Auto-rotate step in radians per frame
    pub auto_rotate_speed: f32,
    /// Damping factor in (0, 1); higher stops the coast sooner
    pub damping: f32,
    /// Radians of rotation per pixel of pointer movement
    pub rotate_sensitivity: f32,
    /// Pan distance per pixel, scaled by the current radius
    pub pan_speed: f32,
    /// Radius clamp
    pub min_distance: f32,
    pub max_distance: f32,
    /// Polar angle clamp, keeps the camera off the poles
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
}

impl Default for OrbitOptions {
    fn default() -> Self {
        Self {
            rotate: true,
            pan: true,
            zoom: true,
            auto_rotate: false,
            auto_rotate_speed: 0.01,
            damping: 0.1,
            rotate_sensitivity: 0.005,
            pan_speed: 0.002,
            min_distance: 0.5,
            max_distance: 200.0,
            min_polar_angle: 0.1,
            max_polar_angle: std::f32::consts::PI - 0.1,
        }
    }
}

/// Orbit controller state: spherical coordinates plus gesture tracking
#[derive(Debug, Clone)]
pub struct OrbitControls {
    /// Horizontal angle (azimuth) in radians
    pub theta: f32,
    /// Vertical angle (polar) in radians, clamped away from the poles
    pub phi: f32,
    /// Distance from the target
    pub radius: f32,
    /// Point the camera orbits around
    pub target: Vec3,
    pub options: OrbitOptions,

    velocity_theta: f32,
    velocity_phi: f32,
    state: DragState,
    last_pointer: [f32; 2],
    needs_sync: bool,
}

impl OrbitControls {
    /// Create a controller looking down +Z from the default radius
    pub fn new(options: OrbitOptions) -> Self {
        Self {
            theta: 0.0,
            phi: std::f32::consts::FRAC_PI_2,
            radius: 10.0,
            target: [0.0, 0.0, 0.0],
            options,
            velocity_theta: 0.0,
            velocity_phi: 0.0,
            state: DragState::Idle,
            last_pointer: [0.0, 0.0],
            needs_sync: true,
        }
    }

    /// Current gesture state
    pub fn state(&self) -> DragState {
        self.state
    }

    /// Residual angular velocity (theta, phi)
    pub fn velocity(&self) -> (f32, f32) {
        (self.velocity_theta, self.velocity_phi)
    }

    /// Derive spherical coordinates from an explicit camera position
    pub fn set_position(&mut self, position: Vec3) {
        let offset = vec::sub(position, self.target);
        self.set_spherical_from_offset(offset);
    }

    /// Move the orbit target, keeping the camera where it is in world space
    pub fn set_target(&mut self, target: Vec3) {
        let position = self.cartesian_position();
        self.target = target;
        self.set_spherical_from_offset(vec::sub(position, target));
    }

    fn set_spherical_from_offset(&mut self, offset: Vec3) {
        let radius = vec::length(offset).max(PINCH_EPSILON);
        self.radius = radius.clamp(self.options.min_distance, self.options.max_distance);
        self.phi = (offset[1] / radius).clamp(-1.0, 1.0).acos().clamp(
            self.options.min_polar_angle,
            self.options.max_polar_angle,
        );
        self.theta = offset[0].atan2(offset[2]);
        self.needs_sync = true;
    }

    /// Begin a drag. Primary button rotates, secondary pans.
    pub fn pointer_down(&mut self, x: f32, y: f32, button: PointerButton) {
        self.last_pointer = [x, y];
        self.state = match button {
            PointerButton::Primary if self.options.rotate => DragState::Rotating,
            PointerButton::Secondary if self.options.pan => DragState::Panning,
            _ => DragState::Idle,
        };
        if matches!(self.state, DragState::Rotating) {
            // A fresh grab stops any residual coast.
            self.velocity_theta = 0.0;
            self.velocity_phi = 0.0;
        }
        tracing::debug!(state = ?self.state, "pointer down");
    }

    /// Continue the active drag
    pub fn pointer_move(&mut self, x: f32, y: f32) {
        let dx = x - self.last_pointer[0];
        let dy = y - self.last_pointer[1];
        self.last_pointer = [x, y];

        match self.state {
            DragState::Rotating => self.rotate_by(dx, dy),
            DragState::Panning => self.pan_by(dx, dy),
            _ => {}
        }
    }

    /// End the active drag; residual velocity keeps coasting
    pub fn pointer_up(&mut self) {
        self.state = DragState::Idle;
        tracing::debug!("pointer up");
    }

    /// Wheel zoom: positive delta moves the camera away from the target
    pub fn wheel(&mut self, delta: f32) {
        if !self.options.zoom || delta == 0.0 {
            return;
        }
        let factor = if delta > 0.0 {
            ZOOM_STEP_OUT
        } else {
            ZOOM_STEP_IN
        };
        self.zoom(factor);
    }

    /// Scale the orbit radius by `factor`, clamped to the distance limits
    pub fn zoom(&mut self, factor: f32) {
        if factor <= 0.0 {
            return;
        }
        self.radius = (self.radius * factor)
            .clamp(self.options.min_distance, self.options.max_distance);
        self.needs_sync = true;
    }

    /// Begin a touch gesture; one finger rotates, two pinch-zoom
    pub fn touch_start(&mut self, touches: &[[f32; 2]]) {
        self.state = match touches {
            [t] if self.options.rotate => {
                self.last_pointer = *t;
                self.velocity_theta = 0.0;
                self.velocity_phi = 0.0;
                DragState::Rotating
            }
            [a, b, ..] if self.options.zoom => DragState::Pinching {
                start_distance: touch_distance(*a, *b),
                start_radius: self.radius,
            },
            _ => DragState::Idle,
        };
    }

    /// Continue a touch gesture. A changed touch count re-anchors.
    pub fn touch_move(&mut self, touches: &[[f32; 2]]) {
        match (self.state, touches) {
            (DragState::Rotating, [t]) => {
                let dx = t[0] - self.last_pointer[0];
                let dy = t[1] - self.last_pointer[1];
                self.last_pointer = *t;
                self.rotate_by(dx, dy);
            }
            (
                DragState::Pinching {
                    start_distance,
                    start_radius,
                },
                [a, b, ..],
            ) => {
                let dist = touch_distance(*a, *b).max(PINCH_EPSILON);
                self.radius = (start_radius * start_distance / dist)
                    .clamp(self.options.min_distance, self.options.max_distance);
                self.needs_sync = true;
            }
            _ => self.touch_start(touches),
        }
    }

    /// Lift fingers; any remaining touch re-anchors the gesture
    pub fn touch_end(&mut self, touches: &[[f32; 2]]) {
        self.touch_start(touches);
    }

    /// Advance one frame: auto-rotate, velocity damping, camera sync
    ///
    /// Returns true when the camera moved this frame, which keeps the
    /// render loop scheduled.
    pub fn update(&mut self, camera: &mut Camera) -> bool {
        let mut changed = std::mem::take(&mut self.needs_sync);
        let dragging = matches!(self.state, DragState::Rotating | DragState::Panning);

        if self.options.auto_rotate && !dragging {
            self.theta += self.options.auto_rotate_speed;
            changed = true;
        }

        if !dragging && (self.velocity_theta != 0.0 || self.velocity_phi != 0.0) {
            let damping = self.options.damping;
            self.theta += self.velocity_theta * damping;
            self.phi = (self.phi + self.velocity_phi * damping).clamp(
                self.options.min_polar_angle,
                self.options.max_polar_angle,
            );
            self.velocity_theta *= 1.0 - damping;
            self.velocity_phi *= 1.0 - damping;
            let speed = (self.velocity_theta * self.velocity_theta
                + self.velocity_phi * self.velocity_phi)
                .sqrt();
            if speed < VELOCITY_SNAP {
                self.velocity_theta = 0.0;
                self.velocity_phi = 0.0;
            }
            changed = true;
        }

        if changed {
            let [w, h] = camera.viewport();
            camera.position = self.cartesian_position();
            camera.target = self.target;
            camera.update(w, h);
        }
        changed
    }

    /// Whether any motion is pending (drives the frame loop)
    pub fn is_moving(&self) -> bool {
        !matches!(self.state, DragState::Idle)
            || self.velocity_theta != 0.0
            || self.velocity_phi != 0.0
            || self.options.auto_rotate
    }

    /// Camera position implied by the current spherical coordinates
    pub fn cartesian_position(&self) -> Vec3 {
        let sin_phi = self.phi.sin();
        let cos_phi = self.phi.cos();
        let sin_theta = self.theta.sin();
        let cos_theta = self.theta.cos();

        [
            self.target[0] + self.radius * sin_phi * sin_theta,
            self.target[1] + self.radius * cos_phi,
            self.target[2] + self.radius * sin_phi * cos_theta,
        ]
    }

    fn rotate_by(&mut self, dx: f32, dy: f32) {
        let k = self.options.rotate_sensitivity;
        self.velocity_theta = -dx * k;
        self.velocity_phi = -dy * k;
        self.theta += self.velocity_theta;
        self.phi = (self.phi + self.velocity_phi).clamp(
            self.options.min_polar_angle,
            self.options.max_polar_angle,
        );
        self.needs_sync = true;
    }

    fn pan_by(&mut self, dx: f32, dy: f32) {
        let forward = vec::normalize(vec::sub(self.target, self.cartesian_position()));
        let right = vec::normalize(vec::cross(forward, WORLD_UP));
        let up = vec::cross(right, forward);

        // Content follows the pointer, so the target moves the other way.
        let scale = self.radius * self.options.pan_speed;
        self.target = vec::add(
            self.target,
            vec::add(
                vec::scale(right, -dx * scale),
                vec::scale(up, dy * scale),
            ),
        );
        self.needs_sync = true;
    }
}

fn touch_distance(a: [f32; 2], b: [f32; 2]) -> f32 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    (dx * dx + dy * dy).sqrt()
}
